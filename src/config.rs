/// The limits reflection and layout creation are checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Limits {
    /// Bind groups a pipeline layout may have. Shader bind group indices must be below this.
    pub max_bind_groups: u32,
    /// Vertex input locations must be below this.
    pub max_vertex_attributes: u32,
    /// Fragment output locations must be below this.
    pub max_color_attachments: u32,
}

impl Limits {
    pub const DEFAULT_MAX_COLOR_ATTACHMENTS: u32 = 8;
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&wgpu::Limits::default())
    }
}

impl From<&wgpu::Limits> for Limits {
    fn from(limits: &wgpu::Limits) -> Self {
        Self {
            max_bind_groups: limits.max_bind_groups,
            max_vertex_attributes: limits.max_vertex_attributes,
            max_color_attachments: Self::DEFAULT_MAX_COLOR_ATTACHMENTS,
        }
    }
}

/// Which reflection strategy extracts entry point metadata from modules.
///
/// Both produce the same metadata for valid modules. They differ in how they walk the module:
/// `Resources` gathers every resource into categorized lists first, `Queries` asks for
/// pre-resolved binding and location records one category at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReflectionBackend {
    #[default]
    Resources,
    Queries,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_bind_groups, 4);
        assert_eq!(limits.max_vertex_attributes, 16);
        assert_eq!(limits.max_color_attachments, 8);
    }
}
