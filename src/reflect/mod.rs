//! Extraction of [`EntryPointMetadata`] from validated SPIR-V.
//!
//! Two strategies implement [`Reflect`]. They walk the module differently but register what they
//! find through the same [`MetadataBuilder`], which holds the checks both must apply.

use bindcheck_spirv::{tables, ImageType, ScalarKind, SpirvModule};
use spirv::ImageFormat;
use wgpu::TextureFormat;

use crate::config::{Limits, ReflectionBackend};
use crate::formats::FormatTable;
use crate::metadata::{EntryPointMetadata, ShaderBindingInfo, SingleShaderStage};
use crate::{FormatType, ShaderError};

mod query;
mod resources;

pub(crate) use query::QueryReflector;
pub(crate) use resources::ResourceReflector;

/// What reflection checks a module against.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReflectContext<'a> {
    pub limits: &'a Limits,
    pub formats: &'a dyn FormatTable,
}

pub(crate) trait Reflect {
    fn reflect(
        &self,
        module: &SpirvModule,
        ctx: &ReflectContext,
    ) -> Result<EntryPointMetadata, ShaderError>;
}

/// Reflect `module` with the strategy `backend` selects.
pub(crate) fn reflect(
    module: &SpirvModule,
    backend: ReflectionBackend,
    ctx: &ReflectContext,
) -> Result<EntryPointMetadata, ShaderError> {
    log::trace!(
        "reflecting entry point `{}` with {backend:?}",
        module.entry_point().name
    );
    match backend {
        ReflectionBackend::Resources => ResourceReflector.reflect(module, ctx),
        ReflectionBackend::Queries => QueryReflector.reflect(module, ctx),
    }
}

/// The component type sampling `image` returns.
///
/// # Panics
///
/// If the sampled type isn't an int or float, which validation rejects.
pub(crate) fn texture_component_type(module: &SpirvModule, image: &ImageType) -> FormatType {
    match module.scalar_kind(image.sampled_type) {
        Some(kind @ (ScalarKind::Float | ScalarKind::Sint | ScalarKind::Uint)) => {
            tables::format_type(kind)
        }
        kind => unreachable!("texture component kind {kind:?} is rejected by validation"),
    }
}

/// Accumulates metadata, enforcing the limits and uniqueness rules as it goes.
pub(crate) struct MetadataBuilder<'a> {
    metadata: EntryPointMetadata,
    ctx: &'a ReflectContext<'a>,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(stage: SingleShaderStage, ctx: &'a ReflectContext<'a>) -> Self {
        Self {
            metadata: EntryPointMetadata::new(stage, ctx.limits),
            ctx,
        }
    }

    pub fn stage(&self) -> SingleShaderStage {
        self.metadata.stage
    }

    /// Claim `(group, binding)`. The binding's kind is resolved afterwards, so a duplicate is
    /// reported before anything wrong with the binding itself.
    pub fn reserve_binding(&self, group: u32, binding: u32) -> Result<(), ShaderError> {
        let limit = self.ctx.limits.max_bind_groups;
        let Some(bindings) = self.metadata.group(group) else {
            return Err(ShaderError::BindGroupIndexOverLimit { group, limit });
        };
        if bindings.contains_key(&binding) {
            return Err(ShaderError::DuplicateBinding { group, binding });
        }
        Ok(())
    }

    pub fn add_binding(&mut self, group: u32, binding: u32, info: ShaderBindingInfo) {
        log::trace!(
            "set {group} binding {binding}: {} (id {})",
            info.ty,
            info.id
        );
        self.metadata.bindings[group as usize].insert(binding, info);
    }

    /// Resolve a storage image's declared format and check the device can use it for storage.
    pub fn storage_texture_format(
        &self,
        group: u32,
        binding: u32,
        format: ImageFormat,
    ) -> Result<TextureFormat, ShaderError> {
        let format = tables::storage_texture_format(format)
            .ok_or(ShaderError::InvalidStorageImageFormat { group, binding })?;
        if !self.ctx.formats.supports_storage_usage(format) {
            return Err(ShaderError::UnsupportedStorageFormat(format));
        }
        Ok(format)
    }

    pub fn add_vertex_attribute(&mut self, location: u32) -> Result<(), ShaderError> {
        let limit = self.ctx.limits.max_vertex_attributes;
        if location >= limit {
            return Err(ShaderError::AttributeLocationOverLimit { location, limit });
        }
        self.metadata
            .used_vertex_attributes
            .insert(location as usize);
        Ok(())
    }

    pub fn check_color_attachment(&self, location: u32) -> Result<(), ShaderError> {
        let limit = self.ctx.limits.max_color_attachments;
        if location >= limit {
            return Err(ShaderError::ColorAttachmentLocationOverLimit { location, limit });
        }
        Ok(())
    }

    /// Record the base type written to the color attachment at `location`, which must already
    /// have passed [`check_color_attachment`](Self::check_color_attachment).
    pub fn add_fragment_output(
        &mut self,
        location: u32,
        ty: FormatType,
    ) -> Result<(), ShaderError> {
        if ty == FormatType::Other {
            return Err(ShaderError::UnsupportedFragmentOutputType { location });
        }
        self.metadata.fragment_output_format_base_types[location as usize] = ty;
        Ok(())
    }

    pub fn finish(self) -> EntryPointMetadata {
        self.metadata
    }
}
