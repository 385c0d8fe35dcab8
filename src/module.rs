use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use bindcheck_spirv::{validate, MessageLevel, TargetEnv};

use crate::bitset::Bitset;
use crate::buffer_sizes::RequiredBufferSizes;
use crate::cache::{ModuleCache, ModuleKey};
use crate::compat::validate_compatibility_with_pipeline_layout;
use crate::config::ReflectionBackend;
use crate::layout::PipelineLayout;
use crate::metadata::{BindingInfoArray, EntryPointMetadata, SingleShaderStage};
use crate::reflect::{reflect, ReflectContext};
use crate::{FormatType, ShaderError};

/// The source a shader module was created from. Modules with equal content are interchangeable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModuleContent {
    SpirV(Arc<[u32]>),
    Wgsl(Arc<str>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompilationMessageType {
    Error,
    Warning,
    Info,
}

/// A diagnostic produced while creating a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationMessage {
    pub ty: CompilationMessageType,
    pub message: String,
    /// Word index into the module's SPIR-V, when the message concerns an instruction.
    pub position: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub cache: Weak<ModuleCache>,
    pub key: ModuleKey,
}

/// A validated and reflected shader module.
///
/// A module that failed creation can still exist as an error module (see
/// [`ShaderModule::error()`]): it has no metadata and every query on it fails with
/// [`ShaderError::ErrorModule`].
#[derive(Debug)]
pub struct ShaderModule {
    label: Option<String>,
    content: ModuleContent,
    spirv: Arc<[u32]>,
    metadata: Option<EntryPointMetadata>,
    messages: Vec<CompilationMessage>,
    cache: Option<CacheEntry>,
}

impl ShaderModule {
    pub(crate) fn new(
        label: Option<&str>,
        content: ModuleContent,
        target: TargetEnv,
        backend: ReflectionBackend,
        ctx: &ReflectContext,
    ) -> Result<Self, ShaderError> {
        let spirv: Arc<[u32]> = match &content {
            ModuleContent::SpirV(words) => words.clone(),
            ModuleContent::Wgsl(source) => crate::frontend::wgsl_to_spirv(source)?.into(),
        };

        let validated = validate(&spirv, target)
            .map_err(|report| ShaderError::SpirvValidation(report.to_string()))?;
        let metadata = reflect(&validated.module, backend, ctx)?;

        let messages = validated
            .messages
            .into_iter()
            .map(|message| CompilationMessage {
                ty: match message.level {
                    MessageLevel::Info => CompilationMessageType::Info,
                    MessageLevel::Warning => CompilationMessageType::Warning,
                    MessageLevel::Fatal | MessageLevel::Error => CompilationMessageType::Error,
                },
                message: message.text,
                position: Some(message.position),
            })
            .collect();

        log::debug!(
            "created {:?} shader module {:?} ({} words)",
            metadata.stage,
            label.unwrap_or(""),
            spirv.len()
        );

        Ok(Self {
            label: label.map(str::to_string),
            content,
            spirv,
            metadata: Some(metadata),
            messages,
            cache: None,
        })
    }

    /// An error-tagged module standing in for one whose creation failed with `err`.
    pub fn error(label: Option<&str>, err: &ShaderError) -> Self {
        Self {
            label: label.map(str::to_string),
            content: ModuleContent::SpirV(Arc::from([])),
            spirv: Arc::from([]),
            metadata: None,
            messages: vec![CompilationMessage {
                ty: CompilationMessageType::Error,
                message: err.to_string(),
                position: None,
            }],
            cache: None,
        }
    }

    pub(crate) fn attach(mut self, entry: CacheEntry) -> Self {
        self.cache = Some(entry);
        self
    }

    pub fn is_error(&self) -> bool {
        self.metadata.is_none()
    }

    pub fn metadata(&self) -> Result<&EntryPointMetadata, ShaderError> {
        self.metadata.as_ref().ok_or(ShaderError::ErrorModule)
    }

    pub fn binding_info(&self) -> Result<&BindingInfoArray, ShaderError> {
        Ok(&self.metadata()?.bindings)
    }

    pub fn used_vertex_attributes(&self) -> Result<&Bitset, ShaderError> {
        Ok(&self.metadata()?.used_vertex_attributes)
    }

    pub fn fragment_output_base_types(&self) -> Result<&[FormatType], ShaderError> {
        Ok(&self.metadata()?.fragment_output_format_base_types)
    }

    pub fn execution_model(&self) -> Result<SingleShaderStage, ShaderError> {
        Ok(self.metadata()?.stage)
    }

    /// The sizes that must be checked at draw or dispatch time for the buffers `layout` leaves
    /// unverified.
    pub fn compute_required_buffer_sizes_for_layout(
        &self,
        layout: &PipelineLayout,
    ) -> Result<RequiredBufferSizes, ShaderError> {
        Ok(RequiredBufferSizes::compute(self.metadata()?, layout))
    }

    pub fn validate_compatibility_with_pipeline_layout(
        &self,
        layout: &PipelineLayout,
    ) -> Result<(), ShaderError> {
        validate_compatibility_with_pipeline_layout(self.metadata()?, layout)
    }

    /// Diagnostics produced while creating the module.
    pub fn compilation_info(&self) -> &[CompilationMessage] {
        &self.messages
    }

    /// The SPIR-V the module was reflected from. For WGSL modules this is the front-end's output.
    pub fn spirv(&self) -> &[u32] {
        &self.spirv
    }

    pub fn content(&self) -> &ModuleContent {
        &self.content
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Modules compare by content. Error modules have no content of their own, so each one is only
/// equal to itself.
impl PartialEq for ShaderModule {
    fn eq(&self, other: &Self) -> bool {
        if self.is_error() || other.is_error() {
            return std::ptr::eq(self, other);
        }
        self.content == other.content
    }
}

impl Eq for ShaderModule {}

impl Hash for ShaderModule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content.hash(state);
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        if let Some(entry) = &self.cache {
            if let Some(cache) = entry.cache.upgrade() {
                cache.remove(entry.key, &self.content);
            }
        }
    }
}
