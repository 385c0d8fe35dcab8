use spirv::Word;
use thiserror::Error;
use wgpu::{TextureFormat, TextureViewDimension};

use crate::metadata::{BindingType, SingleShaderStage};
use crate::FormatType;

/// The error that occurs when creating a shader module, reflecting it, or checking it against a
/// pipeline layout.
///
/// Every check is fail-fast: the first violation found is the one reported.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ShaderError {
    #[error("invalid shader module descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("{0} shader modules are not supported by this build")]
    UnsupportedPath(&'static str),
    /// The binary validator's full report.
    #[error("{0}")]
    SpirvValidation(String),
    /// The source front-end's first diagnostic.
    #[error("{0}")]
    Frontend(String),

    #[error("push constants aren't supported")]
    PushConstantsUnsupported,
    #[error("combined images and samplers aren't supported")]
    CombinedImageSamplerUnsupported,
    #[error("no {decoration:?} decoration set for resource {id}")]
    MissingBindingDecoration { id: Word, decoration: spirv::Decoration },
    #[error("bind group index {group} over the limit of {limit} bind groups")]
    BindGroupIndexOverLimit { group: u32, limit: u32 },
    #[error("shader has duplicate bindings at set {group} binding {binding}")]
    DuplicateBinding { group: u32, binding: u32 },
    #[error("invalid image format declaration on storage image at set {group} binding {binding}")]
    InvalidStorageImageFormat { group: u32, binding: u32 },
    #[error("the storage texture format {0:?} is not supported")]
    UnsupportedStorageFormat(TextureFormat),

    #[error("unable to find location decoration for vertex input {id}")]
    MissingVertexInputLocation { id: Word },
    #[error("attribute location {location} over the limit of {limit} vertex attributes")]
    AttributeLocationOverLimit { location: u32, limit: u32 },
    #[error("need location qualifier on vertex output {id}")]
    MissingVertexOutputLocation { id: Word },
    #[error("need location qualifier on fragment input {id}")]
    MissingFragmentInputLocation { id: Word },
    #[error("unable to find location decoration for fragment output {id}")]
    MissingFragmentOutputLocation { id: Word },
    #[error("fragment output location {location} over the limit of {limit} color attachments")]
    ColorAttachmentLocationOverLimit { location: u32, limit: u32 },
    #[error("unexpected fragment output type at location {location}")]
    UnsupportedFragmentOutputType { location: u32 },

    #[error("missing bind group layout entry for the shader module declaration at set {group} binding {binding}")]
    MissingLayoutEntry { group: u32, binding: u32 },
    #[error("the binding type of the bind group layout entry ({layout}) conflicts with the shader module declaration at set {group} binding {binding} ({shader})")]
    BindingTypeConflict {
        group: u32,
        binding: u32,
        shader: BindingType,
        layout: BindingType,
    },
    #[error("the bind group layout entry for the shader module declaration at set {group} binding {binding} is not visible for the {stage:?} stage")]
    BindingNotVisibleForStage {
        group: u32,
        binding: u32,
        stage: SingleShaderStage,
    },
    #[error("the texture component type of the bind group layout entry ({layout:?}) is different from the shader module declaration at set {group} binding {binding} ({shader:?})")]
    ComponentTypeMismatch {
        group: u32,
        binding: u32,
        shader: FormatType,
        layout: FormatType,
    },
    #[error("the view dimension of the bind group layout entry ({layout:?}) is different from the shader module declaration at set {group} binding {binding} ({shader:?})")]
    ViewDimensionMismatch {
        group: u32,
        binding: u32,
        shader: TextureViewDimension,
        layout: TextureViewDimension,
    },
    #[error("the storage texture format of the bind group layout entry ({layout:?}) is different from the shader module declaration at set {group} binding {binding} ({shader:?})")]
    StorageTextureFormatMismatch {
        group: u32,
        binding: u32,
        shader: TextureFormat,
        layout: Option<TextureFormat>,
    },
    #[error("the minimum buffer size of the bind group layout entry ({layout}) is smaller than the {required} bytes required by the shader module declaration at set {group} binding {binding}")]
    BufferTooSmall {
        group: u32,
        binding: u32,
        required: u64,
        layout: u64,
    },
    #[error("the shader module declares bindings in group {group} which the pipeline layout doesn't have")]
    UnmatchedShaderBindGroup { group: u32 },

    #[error("the shader module is an error module")]
    ErrorModule,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// The error that occurs when a bind group or pipeline layout description is invalid.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("binding {0} is declared more than once in the bind group layout")]
    DuplicateBinding(u32),
    #[error("{count} bind group layouts exceed the limit of {limit}")]
    TooManyBindGroups { count: usize, limit: u32 },
}
