use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;
use spirv::{ExecutionModel, Word};
use wgpu::{ShaderStages, TextureFormat, TextureViewDimension};

use crate::bitset::Bitset;
use crate::config::Limits;
use crate::FormatType;

/// The pipeline stage an entry point runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SingleShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl SingleShaderStage {
    /// # Panics
    ///
    /// On execution models other than Vertex, Fragment and GLCompute, which validation rejects.
    pub(crate) fn from_execution_model(model: ExecutionModel) -> Self {
        match model {
            ExecutionModel::Vertex => SingleShaderStage::Vertex,
            ExecutionModel::Fragment => SingleShaderStage::Fragment,
            ExecutionModel::GLCompute => SingleShaderStage::Compute,
            model => unreachable!("execution model {model:?} is rejected by validation"),
        }
    }

    /// The visibility bit of this stage.
    pub fn stage_bit(self) -> ShaderStages {
        match self {
            SingleShaderStage::Vertex => ShaderStages::VERTEX,
            SingleShaderStage::Fragment => ShaderStages::FRAGMENT,
            SingleShaderStage::Compute => ShaderStages::COMPUTE,
        }
    }
}

/// The kind of resource a binding is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingType {
    UniformBuffer,
    StorageBuffer,
    ReadonlyStorageBuffer,
    Sampler,
    ComparisonSampler,
    SampledTexture,
    ReadonlyStorageTexture,
    WriteonlyStorageTexture,
    StorageTexture,
}

impl BindingType {
    pub fn is_buffer(self) -> bool {
        matches!(
            self,
            BindingType::UniformBuffer
                | BindingType::StorageBuffer
                | BindingType::ReadonlyStorageBuffer
        )
    }

    /// Whether a shader binding of this kind may be bound through a layout entry of kind
    /// `layout`.
    ///
    /// Besides exact matches, read-only storage buffers may use writable storage buffer entries,
    /// and samplers match comparison samplers in both directions since reflection can't tell
    /// them apart.
    pub fn is_compatible_with(self, layout: BindingType) -> bool {
        use BindingType::*;

        self == layout
            || matches!(
                (self, layout),
                (ReadonlyStorageBuffer, StorageBuffer)
                    | (Sampler, ComparisonSampler)
                    | (ComparisonSampler, Sampler)
            )
    }
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingType::UniformBuffer => "uniform buffer",
            BindingType::StorageBuffer => "storage buffer",
            BindingType::ReadonlyStorageBuffer => "read-only storage buffer",
            BindingType::Sampler => "sampler",
            BindingType::ComparisonSampler => "comparison sampler",
            BindingType::SampledTexture => "sampled texture",
            BindingType::ReadonlyStorageTexture => "read-only storage texture",
            BindingType::WriteonlyStorageTexture => "write-only storage texture",
            BindingType::StorageTexture => "storage texture",
        })
    }
}

/// The fields of a binding that only matter for its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingDetails {
    Buffer {
        /// The buffer block's size with any trailing runtime array holding one element.
        min_binding_size: u64,
    },
    Sampler,
    SampledTexture {
        multisampled: bool,
        view_dimension: TextureViewDimension,
        component_type: FormatType,
    },
    StorageTexture {
        multisampled: bool,
        format: TextureFormat,
        view_dimension: TextureViewDimension,
    },
}

/// A resource binding a shader declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderBindingInfo {
    /// The resource variable's id.
    pub id: Word,
    /// The variable's type with pointers and arrays stripped, used for size computation.
    pub base_type_id: Word,
    pub ty: BindingType,
    pub details: BindingDetails,
}

impl ShaderBindingInfo {
    /// The buffer size this binding requires, or zero for non-buffer bindings.
    pub fn min_buffer_binding_size(&self) -> u64 {
        match self.details {
            BindingDetails::Buffer { min_binding_size } => min_binding_size,
            _ => 0,
        }
    }
}

/// Bindings of one bind group, by binding number.
pub type BindingInfoMap = BTreeMap<u32, ShaderBindingInfo>;

/// Bindings of every bind group below the bind group limit, by group index.
pub type BindingInfoArray = SmallVec<[BindingInfoMap; 4]>;

/// What a module's entry point uses: its resource bindings, vertex inputs and fragment outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPointMetadata {
    pub stage: SingleShaderStage,
    pub bindings: BindingInfoArray,
    /// Vertex input locations consumed. Always empty outside vertex shaders.
    pub used_vertex_attributes: Bitset,
    /// Base type written to each color attachment. `Other` where nothing is written, and always
    /// outside fragment shaders.
    pub fragment_output_format_base_types: SmallVec<[FormatType; 8]>,
}

impl EntryPointMetadata {
    pub(crate) fn new(stage: SingleShaderStage, limits: &Limits) -> Self {
        Self {
            stage,
            bindings: (0..limits.max_bind_groups)
                .map(|_| BindingInfoMap::new())
                .collect(),
            used_vertex_attributes: Bitset::new(limits.max_vertex_attributes as usize),
            fragment_output_format_base_types: SmallVec::from_elem(
                FormatType::Other,
                limits.max_color_attachments as usize,
            ),
        }
    }

    /// Bindings the shader declares in `group`.
    pub fn group(&self, group: u32) -> Option<&BindingInfoMap> {
        self.bindings.get(group as usize)
    }
}
