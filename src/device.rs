use std::sync::Arc;

use bindcheck_spirv::TargetEnv;
use wgpu::Features;

use crate::cache::ModuleCache;
use crate::config::{Limits, ReflectionBackend};
use crate::descriptor::{validate_descriptor, ShaderModuleDescriptor};
use crate::formats::{FormatTable, GuaranteedFormats};
use crate::layout::{BindGroupLayout, BindGroupLayoutEntry, PipelineLayout};
use crate::module::ShaderModule;
use crate::reflect::ReflectContext;
use crate::{LayoutError, ShaderError};

/// Configuration a [`Device`] checks shader modules and layouts against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub limits: Limits,
    pub reflection: ReflectionBackend,
    /// Enabled features. They decide which formats can back storage textures.
    pub features: Features,
    /// The environment SPIR-V is validated for.
    pub target: TargetEnv,
}

/// Creates shader modules and layouts, and shares modules with equal content.
#[derive(Debug)]
pub struct Device {
    descriptor: DeviceDescriptor,
    formats: Box<dyn FormatTable>,
    modules: Arc<ModuleCache>,
}

impl Device {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        let formats = GuaranteedFormats::new(descriptor.features);
        Self::with_format_table(descriptor, formats)
    }

    pub fn with_format_table(
        descriptor: DeviceDescriptor,
        formats: impl FormatTable + 'static,
    ) -> Self {
        Self::from_parts(descriptor, Box::new(formats))
    }

    fn from_parts(descriptor: DeviceDescriptor, formats: Box<dyn FormatTable>) -> Self {
        log::debug!(
            "creating device: {:?}, {:?} reflection, {}",
            descriptor.limits,
            descriptor.reflection,
            descriptor.target
        );
        Self {
            descriptor,
            formats,
            modules: Arc::new(ModuleCache::new()),
        }
    }

    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn limits(&self) -> &Limits {
        &self.descriptor.limits
    }

    pub fn reflection_backend(&self) -> ReflectionBackend {
        self.descriptor.reflection
    }

    pub fn format_table(&self) -> &dyn FormatTable {
        &*self.formats
    }

    pub fn module_cache(&self) -> &ModuleCache {
        &self.modules
    }

    /// Validate, reflect, and cache a shader module.
    ///
    /// If a live module with the same content exists it is returned instead, whatever the label.
    pub fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<Arc<ShaderModule>, ShaderError> {
        let content = validate_descriptor(descriptor)?;
        let ctx = ReflectContext {
            limits: &self.descriptor.limits,
            formats: &*self.formats,
        };

        self.modules.get_or_create(content, |content| {
            ShaderModule::new(
                descriptor.label,
                content,
                self.descriptor.target,
                self.descriptor.reflection,
                &ctx,
            )
        })
    }

    /// Like [`create_shader_module()`](Self::create_shader_module), but a failure produces an
    /// error module instead. Error modules aren't cached.
    pub fn create_shader_module_or_error(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Arc<ShaderModule> {
        self.create_shader_module(descriptor).unwrap_or_else(|err| {
            log::warn!(
                "shader module {:?} creation failed: {err}",
                descriptor.label.unwrap_or("")
            );
            Arc::new(ShaderModule::error(descriptor.label, &err))
        })
    }

    pub fn create_bind_group_layout(
        &self,
        entries: impl IntoIterator<Item = BindGroupLayoutEntry>,
    ) -> Result<Arc<BindGroupLayout>, LayoutError> {
        BindGroupLayout::new(entries).map(Arc::new)
    }

    pub fn create_pipeline_layout(
        &self,
        bind_group_layouts: impl IntoIterator<Item = Arc<BindGroupLayout>>,
    ) -> Result<PipelineLayout, LayoutError> {
        PipelineLayout::new(bind_group_layouts, &self.descriptor.limits)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new(DeviceDescriptor::default())
    }
}

#[derive(Debug, Default)]
pub struct DeviceBuilder {
    descriptor: DeviceDescriptor,
    formats: Option<Box<dyn FormatTable>>,
}

impl DeviceBuilder {
    pub fn limits(mut self, limits: Limits) -> Self {
        self.descriptor.limits = limits;
        self
    }

    pub fn max_bind_groups(mut self, max: u32) -> Self {
        self.descriptor.limits.max_bind_groups = max;
        self
    }

    pub fn max_vertex_attributes(mut self, max: u32) -> Self {
        self.descriptor.limits.max_vertex_attributes = max;
        self
    }

    pub fn max_color_attachments(mut self, max: u32) -> Self {
        self.descriptor.limits.max_color_attachments = max;
        self
    }

    pub fn reflection(mut self, backend: ReflectionBackend) -> Self {
        self.descriptor.reflection = backend;
        self
    }

    pub fn features(mut self, features: Features) -> Self {
        self.descriptor.features = features;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.descriptor.target = target;
        self
    }

    /// Use `formats` instead of the formats guaranteed for the enabled features.
    pub fn format_table(mut self, formats: impl FormatTable + 'static) -> Self {
        self.formats = Some(Box::new(formats));
        self
    }

    pub fn build(self) -> Device {
        match self.formats {
            Some(formats) => Device::from_parts(self.descriptor, formats),
            None => Device::new(self.descriptor),
        }
    }
}
