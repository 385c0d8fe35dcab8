use bindcheck_spirv::{tables, DecorationFlags, SpirvModule, Type};
use spirv::{Decoration, StorageClass, Word};

use super::{texture_component_type, MetadataBuilder, Reflect, ReflectContext};
use crate::metadata::{
    BindingDetails, BindingType, EntryPointMetadata, ShaderBindingInfo, SingleShaderStage,
};
use crate::{FormatType, ShaderError};

/// A resource variable and the type that describes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Resource {
    pub id: Word,
    pub base_type_id: Word,
}

/// Every resource and stage interface variable of a module, by category.
#[derive(Clone, Debug, Default)]
pub(crate) struct ShaderResources {
    pub uniform_buffers: Vec<Resource>,
    pub storage_buffers: Vec<Resource>,
    pub separate_images: Vec<Resource>,
    pub separate_samplers: Vec<Resource>,
    pub storage_images: Vec<Resource>,
    /// Combined image-samplers.
    pub sampled_images: Vec<Resource>,
    pub push_constant_buffers: Vec<Resource>,
    pub stage_inputs: Vec<Resource>,
    pub stage_outputs: Vec<Resource>,
}

impl ShaderResources {
    pub fn gather(module: &SpirvModule) -> Self {
        let mut resources = Self::default();
        let interface = &module.entry_point().interface;

        for variable in module.variables() {
            let resource = Resource {
                id: variable.id,
                base_type_id: module.resource_base_type(variable),
            };
            let ty = module.ty(resource.base_type_id);

            let list = match variable.storage_class {
                StorageClass::UniformConstant => match ty {
                    Some(Type::Image(image)) if image.is_storage() => {
                        &mut resources.storage_images
                    }
                    Some(Type::Image(_)) => &mut resources.separate_images,
                    Some(Type::Sampler) => &mut resources.separate_samplers,
                    Some(Type::SampledImage { .. }) => &mut resources.sampled_images,
                    _ => continue,
                },
                StorageClass::Uniform
                    if module
                        .decorations(resource.base_type_id)
                        .flags
                        .contains(DecorationFlags::BUFFER_BLOCK) =>
                {
                    &mut resources.storage_buffers
                }
                StorageClass::Uniform => &mut resources.uniform_buffers,
                StorageClass::StorageBuffer => &mut resources.storage_buffers,
                StorageClass::PushConstant => &mut resources.push_constant_buffers,
                StorageClass::Input | StorageClass::Output
                    if !interface.contains(&variable.id) || module.is_builtin(variable) =>
                {
                    continue
                }
                StorageClass::Input => &mut resources.stage_inputs,
                StorageClass::Output => &mut resources.stage_outputs,
                _ => continue,
            };
            list.push(resource);
        }

        resources
    }
}

/// Decorations that apply to a whole buffer block: those on the variable, plus those every
/// member of its block carries.
fn buffer_block_flags(module: &SpirvModule, resource: &Resource) -> DecorationFlags {
    let mut flags = module.decorations(resource.id).flags;
    if let Some(Type::Struct { members }) = module.ty(resource.base_type_id) {
        if !members.is_empty() {
            flags |= (0..members.len() as u32)
                .map(|member| {
                    module
                        .member_decorations(resource.base_type_id, member)
                        .flags
                })
                .fold(DecorationFlags::all(), |all, member| all & member);
        }
    }
    flags
}

/// Reflection over categorized resource lists.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ResourceReflector;

impl ResourceReflector {
    fn extract_bindings(
        module: &SpirvModule,
        builder: &mut MetadataBuilder,
        resources: &[Resource],
        kind: BindingType,
    ) -> Result<(), ShaderError> {
        for resource in resources {
            let decorations = module.decorations(resource.id);
            let binding = decorations
                .binding
                .ok_or(ShaderError::MissingBindingDecoration {
                    id: resource.id,
                    decoration: Decoration::Binding,
                })?;
            let group = decorations
                .descriptor_set
                .ok_or(ShaderError::MissingBindingDecoration {
                    id: resource.id,
                    decoration: Decoration::DescriptorSet,
                })?;

            builder.reserve_binding(group, binding)?;

            let (ty, details) = match kind {
                BindingType::UniformBuffer | BindingType::StorageBuffer => {
                    let ty = if kind == BindingType::StorageBuffer
                        && buffer_block_flags(module, resource)
                            .contains(DecorationFlags::NON_WRITABLE)
                    {
                        BindingType::ReadonlyStorageBuffer
                    } else {
                        kind
                    };
                    let min_binding_size =
                        module.declared_struct_size_runtime_array(resource.base_type_id);
                    (ty, BindingDetails::Buffer { min_binding_size })
                }
                BindingType::SampledTexture => {
                    let image = image(module, resource);
                    (
                        kind,
                        BindingDetails::SampledTexture {
                            multisampled: image.multisampled,
                            view_dimension: tables::view_dimension(image.dim, image.arrayed),
                            component_type: texture_component_type(module, image),
                        },
                    )
                }
                BindingType::StorageTexture => {
                    let flags = decorations.flags;
                    let ty = if flags.contains(DecorationFlags::NON_READABLE) {
                        BindingType::WriteonlyStorageTexture
                    } else if flags.contains(DecorationFlags::NON_WRITABLE) {
                        BindingType::ReadonlyStorageTexture
                    } else {
                        BindingType::StorageTexture
                    };

                    let image = image(module, resource);
                    let format = builder.storage_texture_format(group, binding, image.format)?;
                    (
                        ty,
                        BindingDetails::StorageTexture {
                            multisampled: image.multisampled,
                            format,
                            view_dimension: tables::view_dimension(image.dim, image.arrayed),
                        },
                    )
                }
                _ => (kind, BindingDetails::Sampler),
            };

            builder.add_binding(
                group,
                binding,
                ShaderBindingInfo {
                    id: resource.id,
                    base_type_id: resource.base_type_id,
                    ty,
                    details,
                },
            );
        }
        Ok(())
    }

    fn extract_vertex_io(
        module: &SpirvModule,
        builder: &mut MetadataBuilder,
        resources: &ShaderResources,
    ) -> Result<(), ShaderError> {
        for input in &resources.stage_inputs {
            let location = module
                .decorations(input.id)
                .location
                .ok_or(ShaderError::MissingVertexInputLocation { id: input.id })?;
            builder.add_vertex_attribute(location)?;
        }

        // Some backends put every unlocated output at location 0.
        for output in &resources.stage_outputs {
            if module.decorations(output.id).location.is_none() {
                return Err(ShaderError::MissingVertexOutputLocation { id: output.id });
            }
        }
        Ok(())
    }

    fn extract_fragment_io(
        module: &SpirvModule,
        builder: &mut MetadataBuilder,
        resources: &ShaderResources,
    ) -> Result<(), ShaderError> {
        for input in &resources.stage_inputs {
            if module.decorations(input.id).location.is_none() {
                return Err(ShaderError::MissingFragmentInputLocation { id: input.id });
            }
        }

        for output in &resources.stage_outputs {
            let location = module
                .decorations(output.id)
                .location
                .ok_or(ShaderError::MissingFragmentOutputLocation { id: output.id })?;
            builder.check_color_attachment(location)?;

            let ty = module
                .scalar_kind(output.base_type_id)
                .map_or(FormatType::Other, tables::format_type);
            builder.add_fragment_output(location, ty)?;
        }
        Ok(())
    }
}

impl Reflect for ResourceReflector {
    fn reflect(
        &self,
        module: &SpirvModule,
        ctx: &ReflectContext,
    ) -> Result<EntryPointMetadata, ShaderError> {
        let stage = SingleShaderStage::from_execution_model(module.entry_point().execution_model);
        let resources = ShaderResources::gather(module);

        if !resources.push_constant_buffers.is_empty() {
            return Err(ShaderError::PushConstantsUnsupported);
        }
        if !resources.sampled_images.is_empty() {
            return Err(ShaderError::CombinedImageSamplerUnsupported);
        }

        let mut builder = MetadataBuilder::new(stage, ctx);
        for (list, kind) in [
            (&resources.uniform_buffers, BindingType::UniformBuffer),
            (&resources.separate_images, BindingType::SampledTexture),
            (&resources.separate_samplers, BindingType::Sampler),
            (&resources.storage_buffers, BindingType::StorageBuffer),
            (&resources.storage_images, BindingType::StorageTexture),
        ] {
            Self::extract_bindings(module, &mut builder, list, kind)?;
        }

        match builder.stage() {
            SingleShaderStage::Vertex => Self::extract_vertex_io(module, &mut builder, &resources)?,
            SingleShaderStage::Fragment => {
                Self::extract_fragment_io(module, &mut builder, &resources)?
            }
            SingleShaderStage::Compute => {}
        }

        Ok(builder.finish())
    }
}

fn image<'m>(module: &'m SpirvModule, resource: &Resource) -> &'m bindcheck_spirv::ImageType {
    module
        .image(resource.base_type_id)
        .unwrap_or_else(|| unreachable!("image resources are gathered by their image type"))
}
