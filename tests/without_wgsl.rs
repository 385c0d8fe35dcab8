//! Builds without the `wgsl` feature still accept the descriptor but can't lower the source.

#![cfg(not(feature = "wgsl"))]

mod common;

use bindcheck::{ShaderError, ShaderModuleDescriptor};
use common::*;

#[test]
fn wgsl_is_an_unsupported_path() {
    for backend in BACKENDS {
        let device = device(backend);
        let err = device
            .create_shader_module(&ShaderModuleDescriptor::wgsl(
                "@compute @workgroup_size(1) fn main() {}",
            ))
            .unwrap_err();
        assert_eq!(err, ShaderError::UnsupportedPath("WGSL"));
        assert!(device.module_cache().is_empty());
    }
}

#[test]
fn spirv_still_works() {
    for module in create_with_each_backend(&fragment_with_uniform()) {
        assert!(module.is_ok());
    }
}
