//! Shader module validation and reflection for a WebGPU-style device.
//!
//! A [`Device`] turns SPIR-V or WGSL into [`ShaderModule`]s carrying the entry point's
//! [`EntryPointMetadata`], checks modules against [`PipelineLayout`]s, and computes the buffer
//! sizes that are left to draw or dispatch time.

pub use prelude::*;

mod bitset;
mod buffer_sizes;
mod cache;
mod compat;
mod config;
mod descriptor;
mod device;
mod error;
mod formats;
mod frontend;
mod layout;
mod metadata;
mod module;
mod prelude;
mod reflect;
mod spirv_iter;
mod util;
