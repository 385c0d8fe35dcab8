//! Content-addressed module sharing.

mod common;

use std::sync::Arc;
use std::thread;

use bindcheck::{ModuleContent, ReflectionBackend, ShaderModuleDescriptor};
use common::*;

#[test]
fn equal_content_shares_a_module() {
    let device = device(ReflectionBackend::Resources);
    let words = fragment_with_uniform();

    let first = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&words).label("first"))
        .unwrap();
    let second = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&words).label("second"))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.label(), Some("first"));
    assert_eq!(device.module_cache().len(), 1);
    assert_eq!(first.spirv(), &words[..]);
    assert_eq!(first.content(), &ModuleContent::SpirV(words.clone().into()));
}

#[test]
fn byte_input_matches_word_input() {
    let device = device(ReflectionBackend::Queries);
    let words = vertex_with_attributes();
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();

    let from_words = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&words))
        .unwrap();
    let from_bytes = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&bytes))
        .unwrap();
    assert!(Arc::ptr_eq(&from_words, &from_bytes));
}

#[test]
fn one_word_difference() {
    let device = device(ReflectionBackend::Resources);
    let words = compute_with_everything();
    let mut other = words.clone();
    // The generator magic doesn't affect reflection.
    other[2] = 0x0008_0001;

    let first = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&words))
        .unwrap();
    let second = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&other))
        .unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(*first, *second);
    assert_eq!(first.metadata().unwrap(), second.metadata().unwrap());
    assert_eq!(device.module_cache().len(), 2);
}

#[test]
fn dropping_the_last_reference_empties_the_entry() {
    let device = device(ReflectionBackend::Resources);
    let words = fragment_with_uniform();
    let content = ModuleContent::SpirV(words.clone().into());

    let module = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&words))
        .unwrap();
    let clone = module.clone();
    drop(module);
    assert!(device.module_cache().contains(&content));

    drop(clone);
    assert!(!device.module_cache().contains(&content));
    assert!(device.module_cache().is_empty());

    let fresh = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(&words))
        .unwrap();
    assert_eq!(device.module_cache().len(), 1);
    assert!(Arc::ptr_eq(
        &fresh,
        &device.module_cache().get(&content).unwrap()
    ));
}

#[test]
fn failures_are_not_cached() {
    let device = device(ReflectionBackend::Resources);
    let mut module = ModuleBuilder::compute();
    module.separate_sampler(9, 0);
    let words = module.build();

    for _ in 0..2 {
        assert!(device
            .create_shader_module(&ShaderModuleDescriptor::spirv(&words))
            .is_err());
        assert!(device.module_cache().is_empty());
    }
}

#[test]
fn modules_outlive_their_device() {
    let device = device(ReflectionBackend::Resources);
    let module = device
        .create_shader_module(&ShaderModuleDescriptor::spirv(fragment_with_uniform()))
        .unwrap();
    drop(device);
    assert!(module.binding_info().is_ok());
}

#[test]
fn concurrent_creation() {
    for backend in BACKENDS {
        let device = device(backend);
        let fixtures = [
            fragment_with_uniform(),
            vertex_with_attributes(),
            compute_with_everything(),
        ];

        let modules: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..12)
                .map(|i| {
                    let device = &device;
                    let words = &fixtures[i % fixtures.len()];
                    scope.spawn(move || {
                        device
                            .create_shader_module(&ShaderModuleDescriptor::spirv(words))
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(device.module_cache().len(), fixtures.len());
        for (i, module) in modules.iter().enumerate() {
            let canonical = &modules[i % fixtures.len()];
            assert!(Arc::ptr_eq(module, canonical));
        }

        drop(modules);
        assert!(device.module_cache().is_empty());
    }
}
