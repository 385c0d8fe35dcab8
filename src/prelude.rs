pub use bindcheck_spirv::{FormatType, TargetEnv};

pub use crate::bitset::Bitset;
pub use crate::buffer_sizes::RequiredBufferSizes;
pub use crate::cache::ModuleCache;
pub use crate::config::{Limits, ReflectionBackend};
pub use crate::descriptor::{ShaderModuleDescriptor, ShaderModuleSource};
pub use crate::device::{Device, DeviceBuilder, DeviceDescriptor};
pub use crate::error::{LayoutError, ShaderError};
pub use crate::formats::{FormatTable, GuaranteedFormats};
pub use crate::layout::{BindGroupLayout, BindGroupLayoutEntry, PipelineLayout};
pub use crate::metadata::{
    BindingDetails, BindingInfoArray, BindingInfoMap, BindingType, EntryPointMetadata,
    ShaderBindingInfo, SingleShaderStage,
};
pub use crate::module::{CompilationMessage, CompilationMessageType, ModuleContent, ShaderModule};
pub use crate::spirv_iter::{InnerSpirvIterator, SpirvIterator};
