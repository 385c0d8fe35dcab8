//! Checking a shader's bindings against the layout a pipeline will use.

use crate::layout::{BindGroupLayout, PipelineLayout};
use crate::metadata::{BindingDetails, EntryPointMetadata};
use crate::ShaderError;

/// Check every binding the shader declares against `layout`. Returns the first incompatibility.
pub(crate) fn validate_compatibility_with_pipeline_layout(
    metadata: &EntryPointMetadata,
    layout: &PipelineLayout,
) -> Result<(), ShaderError> {
    let mask = layout.bind_group_layouts_mask();

    for group in mask.iter() {
        let group = group as u32;
        if let Some(bind_group_layout) = layout.bind_group_layout(group) {
            validate_compatibility_with_bind_group_layout(group, metadata, bind_group_layout)?;
        }
    }

    for (group, bindings) in metadata.bindings.iter().enumerate() {
        if mask.contains(group).unwrap_or(false) {
            continue;
        }
        if !bindings.is_empty() {
            return Err(ShaderError::UnmatchedShaderBindGroup {
                group: group as u32,
            });
        }
    }

    Ok(())
}

fn validate_compatibility_with_bind_group_layout(
    group: u32,
    metadata: &EntryPointMetadata,
    layout: &BindGroupLayout,
) -> Result<(), ShaderError> {
    let Some(bindings) = metadata.group(group) else {
        return Ok(());
    };
    let stage_bit = metadata.stage.stage_bit();

    for (&binding, info) in bindings {
        let index = layout
            .binding_index(binding)
            .ok_or(ShaderError::MissingLayoutEntry { group, binding })?;
        let entry = layout.entry(index);

        if !info.ty.is_compatible_with(entry.ty) {
            return Err(ShaderError::BindingTypeConflict {
                group,
                binding,
                shader: info.ty,
                layout: entry.ty,
            });
        }

        if !entry.visibility.contains(stage_bit) {
            return Err(ShaderError::BindingNotVisibleForStage {
                group,
                binding,
                stage: metadata.stage,
            });
        }

        match info.details {
            BindingDetails::SampledTexture {
                view_dimension,
                component_type,
                ..
            } => {
                if component_type != entry.texture_component_type {
                    return Err(ShaderError::ComponentTypeMismatch {
                        group,
                        binding,
                        shader: component_type,
                        layout: entry.texture_component_type,
                    });
                }
                if view_dimension != entry.view_dimension {
                    return Err(ShaderError::ViewDimensionMismatch {
                        group,
                        binding,
                        shader: view_dimension,
                        layout: entry.view_dimension,
                    });
                }
            }
            BindingDetails::StorageTexture {
                format,
                view_dimension,
                ..
            } => {
                if entry.storage_texture_format != Some(format) {
                    return Err(ShaderError::StorageTextureFormatMismatch {
                        group,
                        binding,
                        shader: format,
                        layout: entry.storage_texture_format,
                    });
                }
                if view_dimension != entry.view_dimension {
                    return Err(ShaderError::ViewDimensionMismatch {
                        group,
                        binding,
                        shader: view_dimension,
                        layout: entry.view_dimension,
                    });
                }
            }
            BindingDetails::Buffer { min_binding_size } => {
                if entry.min_buffer_binding_size != 0
                    && min_binding_size > entry.min_buffer_binding_size
                {
                    return Err(ShaderError::BufferTooSmall {
                        group,
                        binding,
                        required: min_binding_size,
                        layout: entry.min_buffer_binding_size,
                    });
                }
            }
            BindingDetails::Sampler => {}
        }
    }

    Ok(())
}
