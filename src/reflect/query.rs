use bindcheck_spirv::{tables, DecorationFlags, SpirvModule, Type, Variable};
use spirv::{Decoration, ExecutionModel, ImageFormat, StorageClass, Word};
use wgpu::TextureViewDimension;

use super::{texture_component_type, MetadataBuilder, Reflect, ReflectContext};
use crate::metadata::{
    BindingDetails, BindingType, EntryPointMetadata, ShaderBindingInfo, SingleShaderStage,
};
use crate::{FormatType, ShaderError};

/// The resource categories bindings can be queried for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResourceQuery {
    UniformBuffers,
    SeparateImages,
    SeparateSamplers,
    StorageBuffers,
    StorageImages,
}

impl ResourceQuery {
    const ALL: [ResourceQuery; 5] = [
        ResourceQuery::UniformBuffers,
        ResourceQuery::SeparateImages,
        ResourceQuery::SeparateSamplers,
        ResourceQuery::StorageBuffers,
        ResourceQuery::StorageImages,
    ];
}

/// A binding with its kind and kind-specific fields already resolved. Fields that don't apply to
/// the kind keep their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BindingRecord {
    pub id: Word,
    pub base_type_id: Word,
    pub set: Option<u32>,
    pub binding: Option<u32>,
    pub binding_type: BindingType,
    pub multisampled: bool,
    pub view_dimension: TextureViewDimension,
    pub component_type: FormatType,
    pub storage_format: ImageFormat,
    pub min_buffer_size: u64,
}

impl BindingRecord {
    fn new(id: Word, base_type_id: Word, binding_type: BindingType) -> Self {
        Self {
            id,
            base_type_id,
            set: None,
            binding: None,
            binding_type,
            multisampled: false,
            view_dimension: TextureViewDimension::D2,
            component_type: FormatType::Other,
            storage_format: ImageFormat::Unknown,
            min_buffer_size: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LocationRecord {
    pub id: Word,
    pub has_location: bool,
    pub location: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OutputTypeRecord {
    pub location: u32,
    pub ty: FormatType,
}

/// Answers per-category questions about a module's entry point.
pub(crate) struct QueryContext<'m> {
    module: &'m SpirvModule,
}

impl<'m> QueryContext<'m> {
    pub fn new(module: &'m SpirvModule) -> Self {
        Self { module }
    }

    pub fn execution_model(&self) -> ExecutionModel {
        self.module.entry_point().execution_model
    }

    pub fn push_constant_buffer_count(&self) -> usize {
        self.module
            .variables()
            .iter()
            .filter(|variable| variable.storage_class == StorageClass::PushConstant)
            .count()
    }

    /// Bindings of one category, in declaration order.
    ///
    /// Combined image-samplers can't be described as separate images, so asking for those fails
    /// if the module has any.
    pub fn binding_info(&self, query: ResourceQuery) -> Result<Vec<BindingRecord>, ShaderError> {
        let module = self.module;
        let mut records = Vec::new();

        for variable in module.variables() {
            let base = module.resource_base_type(variable);
            let ty = module.ty(base);

            let record = match (query, variable.storage_class, ty) {
                (ResourceQuery::UniformBuffers, StorageClass::Uniform, _)
                    if !self.is_buffer_block(base) =>
                {
                    self.buffer_record(variable, base, BindingType::UniformBuffer)
                }
                (ResourceQuery::StorageBuffers, StorageClass::StorageBuffer, _) => {
                    self.storage_buffer_record(variable, base)
                }
                (ResourceQuery::StorageBuffers, StorageClass::Uniform, _)
                    if self.is_buffer_block(base) =>
                {
                    self.storage_buffer_record(variable, base)
                }
                (
                    ResourceQuery::SeparateImages,
                    StorageClass::UniformConstant,
                    Some(Type::SampledImage { .. }),
                ) => return Err(ShaderError::CombinedImageSamplerUnsupported),
                (
                    ResourceQuery::SeparateImages,
                    StorageClass::UniformConstant,
                    Some(Type::Image(image)),
                ) if !image.is_storage() => {
                    let mut record =
                        BindingRecord::new(variable.id, base, BindingType::SampledTexture);
                    record.multisampled = image.multisampled;
                    record.view_dimension = tables::view_dimension(image.dim, image.arrayed);
                    record.component_type = texture_component_type(module, image);
                    record
                }
                (
                    ResourceQuery::SeparateSamplers,
                    StorageClass::UniformConstant,
                    Some(Type::Sampler),
                ) => BindingRecord::new(variable.id, base, BindingType::Sampler),
                (
                    ResourceQuery::StorageImages,
                    StorageClass::UniformConstant,
                    Some(Type::Image(image)),
                ) if image.is_storage() => {
                    let flags = module.decorations(variable.id).flags;
                    let binding_type = if flags.contains(DecorationFlags::NON_READABLE) {
                        BindingType::WriteonlyStorageTexture
                    } else if flags.contains(DecorationFlags::NON_WRITABLE) {
                        BindingType::ReadonlyStorageTexture
                    } else {
                        BindingType::StorageTexture
                    };
                    let mut record = BindingRecord::new(variable.id, base, binding_type);
                    record.multisampled = image.multisampled;
                    record.view_dimension = tables::view_dimension(image.dim, image.arrayed);
                    record.storage_format = image.format;
                    record
                }
                _ => continue,
            };

            let decorations = module.decorations(variable.id);
            records.push(BindingRecord {
                set: decorations.descriptor_set,
                binding: decorations.binding,
                ..record
            });
        }

        Ok(records)
    }

    fn is_buffer_block(&self, ty: Word) -> bool {
        self.module
            .decorations(ty)
            .flags
            .contains(DecorationFlags::BUFFER_BLOCK)
    }

    fn buffer_record(&self, variable: &Variable, base: Word, ty: BindingType) -> BindingRecord {
        let mut record = BindingRecord::new(variable.id, base, ty);
        record.min_buffer_size = self.module.declared_struct_size_runtime_array(base);
        record
    }

    fn storage_buffer_record(&self, variable: &Variable, base: Word) -> BindingRecord {
        let module = self.module;
        let members = match module.ty(base) {
            Some(Type::Struct { members }) => members.len() as u32,
            _ => 0,
        };
        let non_writable = |flags: DecorationFlags| flags.contains(DecorationFlags::NON_WRITABLE);

        let read_only = non_writable(module.decorations(variable.id).flags)
            || (members > 0
                && (0..members)
                    .all(|member| non_writable(module.member_decorations(base, member).flags)));

        let ty = if read_only {
            BindingType::ReadonlyStorageBuffer
        } else {
            BindingType::StorageBuffer
        };
        self.buffer_record(variable, base, ty)
    }

    /// Non-built-in interface variables of the entry point in `storage_class`.
    fn stage_variables(&self, storage_class: StorageClass) -> impl Iterator<Item = &'m Variable> {
        let module = self.module;
        let interface = &module.entry_point().interface;
        module.variables().iter().filter(move |variable| {
            variable.storage_class == storage_class
                && interface.contains(&variable.id)
                && !module.is_builtin(variable)
        })
    }

    fn locations(&self, storage_class: StorageClass) -> Vec<LocationRecord> {
        self.stage_variables(storage_class)
            .map(|variable| {
                let location = self.module.decorations(variable.id).location;
                LocationRecord {
                    id: variable.id,
                    has_location: location.is_some(),
                    location: location.unwrap_or(0),
                }
            })
            .collect()
    }

    pub fn input_locations(&self) -> Vec<LocationRecord> {
        self.locations(StorageClass::Input)
    }

    pub fn output_locations(&self) -> Vec<LocationRecord> {
        self.locations(StorageClass::Output)
    }

    /// The base type of every located output.
    pub fn output_types(&self) -> Vec<OutputTypeRecord> {
        let module = self.module;
        self.stage_variables(StorageClass::Output)
            .filter_map(|variable| {
                let location = module.decorations(variable.id).location?;
                let ty = module
                    .scalar_kind(module.pointee(variable))
                    .map_or(FormatType::Other, tables::format_type);
                Some(OutputTypeRecord { location, ty })
            })
            .collect()
    }
}

/// Reflection through binding and location queries.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct QueryReflector;

impl QueryReflector {
    fn register(builder: &mut MetadataBuilder, record: BindingRecord) -> Result<(), ShaderError> {
        let binding = record
            .binding
            .ok_or(ShaderError::MissingBindingDecoration {
                id: record.id,
                decoration: Decoration::Binding,
            })?;
        let group = record.set.ok_or(ShaderError::MissingBindingDecoration {
            id: record.id,
            decoration: Decoration::DescriptorSet,
        })?;

        builder.reserve_binding(group, binding)?;

        let details = match record.binding_type {
            BindingType::UniformBuffer
            | BindingType::StorageBuffer
            | BindingType::ReadonlyStorageBuffer => BindingDetails::Buffer {
                min_binding_size: record.min_buffer_size,
            },
            BindingType::SampledTexture => BindingDetails::SampledTexture {
                multisampled: record.multisampled,
                view_dimension: record.view_dimension,
                component_type: record.component_type,
            },
            BindingType::StorageTexture
            | BindingType::ReadonlyStorageTexture
            | BindingType::WriteonlyStorageTexture => BindingDetails::StorageTexture {
                multisampled: record.multisampled,
                format: builder.storage_texture_format(group, binding, record.storage_format)?,
                view_dimension: record.view_dimension,
            },
            BindingType::Sampler | BindingType::ComparisonSampler => BindingDetails::Sampler,
        };

        builder.add_binding(
            group,
            binding,
            ShaderBindingInfo {
                id: record.id,
                base_type_id: record.base_type_id,
                ty: record.binding_type,
                details,
            },
        );
        Ok(())
    }
}

impl Reflect for QueryReflector {
    fn reflect(
        &self,
        module: &SpirvModule,
        ctx: &ReflectContext,
    ) -> Result<EntryPointMetadata, ShaderError> {
        let query = QueryContext::new(module);
        let stage = SingleShaderStage::from_execution_model(query.execution_model());

        if query.push_constant_buffer_count() > 0 {
            return Err(ShaderError::PushConstantsUnsupported);
        }

        let mut builder = MetadataBuilder::new(stage, ctx);
        for category in ResourceQuery::ALL {
            for record in query.binding_info(category)? {
                Self::register(&mut builder, record)?;
            }
        }

        for input in query.input_locations() {
            match stage {
                SingleShaderStage::Vertex if !input.has_location => {
                    return Err(ShaderError::MissingVertexInputLocation { id: input.id })
                }
                SingleShaderStage::Vertex => builder.add_vertex_attribute(input.location)?,
                SingleShaderStage::Fragment if !input.has_location => {
                    return Err(ShaderError::MissingFragmentInputLocation { id: input.id })
                }
                _ => {}
            }
        }

        for output in query.output_locations() {
            match stage {
                SingleShaderStage::Vertex if !output.has_location => {
                    return Err(ShaderError::MissingVertexOutputLocation { id: output.id })
                }
                SingleShaderStage::Fragment if !output.has_location => {
                    return Err(ShaderError::MissingFragmentOutputLocation { id: output.id })
                }
                SingleShaderStage::Fragment => builder.check_color_attachment(output.location)?,
                _ => {}
            }
        }

        if stage == SingleShaderStage::Fragment {
            for output in query.output_types() {
                builder.add_fragment_output(output.location, output.ty)?;
            }
        }

        Ok(builder.finish())
    }
}
