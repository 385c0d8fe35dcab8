//! WGSL modules, lowered to SPIR-V and reflected like binary input.

#![cfg(feature = "wgsl")]

mod common;

use std::sync::Arc;

use bindcheck::{
    BindingDetails, BindingType, FormatType, ModuleContent, ReflectionBackend, ShaderError,
    ShaderModule, ShaderModuleDescriptor, SingleShaderStage,
};
use common::*;
use wgpu::{TextureFormat, TextureViewDimension};

const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> shift: vec4<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec4<f32>, @location(2) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = position + shift;
    out.uv = uv;
    return out;
}
"#;

const FRAGMENT: &str = r#"
@group(0) @binding(0) var color: texture_2d<f32>;
@group(0) @binding(1) var color_sampler: sampler;
@group(1) @binding(0) var<uniform> tint: vec4<f32>;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(color, color_sampler, uv) * tint;
}
"#;

const COMPUTE: &str = r#"
@group(0) @binding(0) var<storage, read> source_data: array<u32>;
@group(0) @binding(1) var<storage, read_write> results: array<u32>;
@group(1) @binding(0) var target_image: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(64)
fn cs_main(@builtin(global_invocation_id) id: vec3<u32>) {
    results[id.x] = source_data[id.x] * 2u;
    textureStore(target_image, vec2<i32>(i32(id.x), 0), vec4<f32>(1.0));
}
"#;

fn create(backend: ReflectionBackend, source: &str) -> Result<Arc<ShaderModule>, ShaderError> {
    device(backend).create_shader_module(&ShaderModuleDescriptor::wgsl(source))
}

#[test]
fn strategies_agree_on_lowered_modules() {
    for source in [VERTEX, FRAGMENT, COMPUTE] {
        let resources = create(ReflectionBackend::Resources, source).unwrap();
        let queries = create(ReflectionBackend::Queries, source).unwrap();
        assert_eq!(resources.metadata().unwrap(), queries.metadata().unwrap());
        assert_eq!(resources.spirv(), queries.spirv());
    }
}

#[test]
fn vertex_module() {
    for backend in BACKENDS {
        let module = create(backend, VERTEX).unwrap();
        assert_eq!(module.execution_model().unwrap(), SingleShaderStage::Vertex);
        assert_eq!(
            module
                .used_vertex_attributes()
                .unwrap()
                .iter()
                .collect::<Vec<_>>(),
            [0, 2]
        );

        let shift = &module.binding_info().unwrap()[0][&0];
        assert_eq!(shift.ty, BindingType::UniformBuffer);
        assert_eq!(shift.min_buffer_binding_size(), 16);
        assert!(matches!(module.content(), ModuleContent::Wgsl(_)));
        assert_eq!(module.spirv()[0], spirv::MAGIC_NUMBER);
    }
}

#[test]
fn fragment_module() {
    for backend in BACKENDS {
        let module = create(backend, FRAGMENT).unwrap();
        let bindings = module.binding_info().unwrap();

        assert_eq!(
            bindings[0][&0].details,
            BindingDetails::SampledTexture {
                multisampled: false,
                view_dimension: TextureViewDimension::D2,
                component_type: FormatType::Float,
            }
        );
        assert_eq!(bindings[0][&1].ty, BindingType::Sampler);
        assert_eq!(bindings[1][&0].min_buffer_binding_size(), 16);
        assert_eq!(
            module.fragment_output_base_types().unwrap()[0],
            FormatType::Float
        );
    }
}

#[test]
fn compute_module() {
    for backend in BACKENDS {
        let module = create(backend, COMPUTE).unwrap();
        let bindings = module.binding_info().unwrap();

        assert_eq!(bindings[0][&0].ty, BindingType::ReadonlyStorageBuffer);
        assert_eq!(bindings[0][&0].min_buffer_binding_size(), 4);
        assert_eq!(bindings[0][&1].ty, BindingType::StorageBuffer);
        assert_eq!(bindings[1][&0].ty, BindingType::WriteonlyStorageTexture);
        assert!(matches!(
            bindings[1][&0].details,
            BindingDetails::StorageTexture {
                format: TextureFormat::Rgba8Unorm,
                ..
            }
        ));
    }
}

#[test]
fn front_end_errors() {
    let err = create(ReflectionBackend::Resources, "fn broken( {").unwrap_err();
    assert!(matches!(err, ShaderError::Frontend(_)));

    let err = create(
        ReflectionBackend::Resources,
        "@compute @workgroup_size(1) fn a() {}\n@compute @workgroup_size(1) fn b() {}",
    )
    .unwrap_err();
    assert!(matches!(err, ShaderError::Frontend(message) if message.contains("found 2")));
}

#[test]
fn source_ends_at_nul() {
    let mut source = String::from(FRAGMENT);
    source.push('\0');
    source.push_str("this is not WGSL");

    let device = device(ReflectionBackend::Resources);
    let truncated = device
        .create_shader_module(&ShaderModuleDescriptor::wgsl(source))
        .unwrap();
    let plain = device
        .create_shader_module(&ShaderModuleDescriptor::wgsl(FRAGMENT))
        .unwrap();
    assert!(Arc::ptr_eq(&truncated, &plain));
}

#[test]
fn reflection_errors_surface_for_wgsl() {
    let source = r#"
@group(7) @binding(0) var<uniform> distant: vec4<f32>;

@compute @workgroup_size(1)
fn main() {
    let value = distant;
}
"#;
    for backend in BACKENDS {
        assert_eq!(
            create(backend, source).unwrap_err(),
            ShaderError::BindGroupIndexOverLimit { group: 7, limit: 4 }
        );
    }
}
