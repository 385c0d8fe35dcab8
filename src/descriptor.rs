use std::sync::Arc;

use crate::module::ModuleContent;
use crate::spirv_iter::SpirvIterator;
use crate::ShaderError;

/// One link of a shader module descriptor's chain.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShaderModuleSource {
    SpirV(Arc<[u32]>),
    /// WGSL text. Anything after the first NUL is ignored.
    Wgsl(Arc<str>),
    /// A link whose structure type this crate doesn't know.
    Unrecognized { stype: u32 },
}

impl ShaderModuleSource {
    pub fn spirv<I: SpirvIterator>(iter: I) -> Self {
        Self::SpirV(iter.into_words())
    }

    pub fn wgsl(source: impl Into<Arc<str>>) -> Self {
        Self::Wgsl(source.into())
    }
}

/// What a shader module is created from. Exactly one source link is accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderModuleDescriptor<'a> {
    pub label: Option<&'a str>,
    pub chain: Vec<ShaderModuleSource>,
}

impl<'a> ShaderModuleDescriptor<'a> {
    pub fn new(source: ShaderModuleSource) -> Self {
        Self {
            label: None,
            chain: vec![source],
        }
    }

    pub fn spirv<I: SpirvIterator>(iter: I) -> Self {
        Self::new(ShaderModuleSource::spirv(iter))
    }

    pub fn wgsl(source: impl Into<Arc<str>>) -> Self {
        Self::new(ShaderModuleSource::wgsl(source))
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Append another link to the chain.
    pub fn chain(mut self, source: ShaderModuleSource) -> Self {
        self.chain.push(source);
        self
    }
}

/// Resolve the descriptor's single source link into module content.
pub(crate) fn validate_descriptor(
    descriptor: &ShaderModuleDescriptor,
) -> Result<ModuleContent, ShaderError> {
    let source = match &descriptor.chain[..] {
        [source] => source,
        [] => {
            return Err(ShaderError::InvalidDescriptor(
                "the descriptor chain has no shader source".to_string(),
            ))
        }
        chain => {
            return Err(ShaderError::InvalidDescriptor(format!(
                "the descriptor chain must have exactly one link, found {}",
                chain.len()
            )))
        }
    };

    match source {
        ShaderModuleSource::SpirV(words) => Ok(ModuleContent::SpirV(words.clone())),
        ShaderModuleSource::Wgsl(text) => {
            let text = match text.find('\0') {
                Some(end) => Arc::from(&text[..end]),
                None => text.clone(),
            };
            Ok(ModuleContent::Wgsl(text))
        }
        ShaderModuleSource::Unrecognized { stype } => Err(ShaderError::InvalidDescriptor(
            format!("unsupported structure type {stype:#x} in the descriptor chain"),
        )),
    }
}
