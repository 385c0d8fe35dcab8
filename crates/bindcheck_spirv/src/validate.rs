//! Validation of SPIR-V modules against a Vulkan target environment.
//!
//! `rspirv` loads the instruction stream. The checks here cover what the environment requires
//! of a well-formed stream, and every module that passes them is also run through naga's SPIR-V
//! front-end and IR validator, whose verdict is reported as a warning.

use std::fmt;

use naga::front::spv::Options as SpvOptions;
use naga::valid::{Capabilities, ValidationFlags};
use naga::FastHashMap;
use rspirv::binary::{Consumer, ParseAction};
use rspirv::dr;
use spirv::{Capability, Dim, ExecutionModel, Op, StorageClass, Word};
use thiserror::Error;

use crate::module::{SpirvModule, Type};

/// The environment a module must be valid for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TargetEnv {
    /// Vulkan 1.0, accepting SPIR-V 1.0.
    Vulkan1_0,
    /// Vulkan 1.1, accepting SPIR-V up to 1.3.
    #[default]
    Vulkan1_1,
}

impl TargetEnv {
    /// The newest SPIR-V version the environment accepts.
    pub fn max_version(self) -> (u8, u8) {
        match self {
            TargetEnv::Vulkan1_0 => (1, 0),
            TargetEnv::Vulkan1_1 => (1, 3),
        }
    }
}

impl fmt::Display for TargetEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEnv::Vulkan1_0 => f.write_str("Vulkan 1.0"),
            TargetEnv::Vulkan1_1 => f.write_str("Vulkan 1.1"),
        }
    }
}

/// Severity of a validation message. Fatal and error messages fail validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageLevel {
    /// The module couldn't be decoded any further.
    Fatal,
    /// The module is invalid.
    Error,
    /// Suspicious but valid.
    Warning,
    /// Informational.
    Info,
}

impl MessageLevel {
    /// Whether a message at this level fails validation.
    pub fn is_failure(self) -> bool {
        matches!(self, MessageLevel::Fatal | MessageLevel::Error)
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            // Fatal and error messages print the same way.
            MessageLevel::Fatal | MessageLevel::Error => "error",
            MessageLevel::Warning => "warning",
            MessageLevel::Info => "info",
        })
    }
}

/// A single diagnostic, anchored to the instruction it concerns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// The message's severity.
    pub level: MessageLevel,
    /// Index of the instruction the message is about, counting from 1. Messages about the
    /// module as a whole, or its header, are at 0.
    pub position: usize,
    /// The diagnostic itself.
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: line {}: {}", self.level, self.position, self.text)
    }
}

/// Everything the validator reported for a module that failed validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub struct ValidationReport {
    messages: Vec<Message>,
}

impl ValidationReport {
    /// Every message, in the order it was reported.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SPIRV Validation failure:")?;
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

/// A module that passed validation, with any warnings or info produced along the way.
#[derive(Clone, Debug)]
pub struct Validated {
    /// The decoded module.
    pub module: SpirvModule,
    /// Non-failing messages, in the order they were reported.
    pub messages: Vec<Message>,
}

/// Validate `words` for `target` and decode it.
pub fn validate(words: &[Word], target: TargetEnv) -> Result<Validated, ValidationReport> {
    let mut recorder = Recorder::default();
    if let Err(err) = rspirv::binary::parse_words(words, &mut recorder) {
        let position = recorder.count;
        recorder.validator.push(MessageLevel::Fatal, position, err.to_string());
        return Err(recorder.validator.into_report());
    }

    let Recorder {
        loader,
        mut validator,
        ..
    } = recorder;

    let module = match SpirvModule::from_dr(&loader.module()) {
        Ok(module) => module,
        Err(text) => {
            validator.push(MessageLevel::Fatal, 0, text);
            return Err(validator.into_report());
        }
    };

    if module.version > target.max_version() {
        let (major, minor) = module.version;
        validator.push(
            MessageLevel::Error,
            0,
            format!("invalid SPIR-V version {major}.{minor} for target environment {target}"),
        );
    }

    validator.check_module(&module, target);

    // Size checks and naga walk the type graph, which is only sound once it's known to be acyclic.
    if !validator.failed() {
        validator.check_block_sizes(&module);
    }
    if !validator.failed() {
        validator.check_with_naga(words);
    }

    if validator.failed() {
        return Err(validator.into_report());
    }

    for message in &validator.messages {
        log::warn!("{message}");
    }

    Ok(Validated {
        module,
        messages: validator.messages,
    })
}

/// Feeds the `rspirv` loader, numbering instructions and checking result ids on the way.
struct Recorder {
    loader: dr::Loader,
    bound: Word,
    count: usize,
    validator: Validator,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            loader: dr::Loader::new(),
            bound: 0,
            count: 0,
            validator: Validator::default(),
        }
    }
}

impl Consumer for Recorder {
    fn initialize(&mut self) -> ParseAction {
        self.loader.initialize()
    }

    fn finalize(&mut self) -> ParseAction {
        self.loader.finalize()
    }

    fn consume_header(&mut self, header: dr::ModuleHeader) -> ParseAction {
        self.bound = header.bound;
        self.loader.consume_header(header)
    }

    fn consume_instruction(&mut self, inst: dr::Instruction) -> ParseAction {
        self.count += 1;
        if inst.class.opcode == Op::EntryPoint {
            self.validator.entry_point = self.count;
        }
        if let Some(id) = inst.result_id {
            self.validator.define(self.count, id, self.bound);
        }
        self.loader.consume_instruction(inst)
    }
}

#[derive(Default)]
struct Validator {
    messages: Vec<Message>,
    /// Result id -> position of the defining instruction.
    defined: FastHashMap<Word, usize>,
    entry_point: usize,
}

impl Validator {
    fn push(&mut self, level: MessageLevel, position: usize, text: String) {
        self.messages.push(Message {
            level,
            position,
            text,
        });
    }

    fn failed(&self) -> bool {
        self.messages.iter().any(|m| m.level.is_failure())
    }

    fn define(&mut self, position: usize, id: Word, bound: Word) {
        if id == 0 || id >= bound {
            self.push(
                MessageLevel::Error,
                position,
                format!("result id {id} is outside the module's id bound {bound}"),
            );
        } else if self.defined.insert(id, position).is_some() {
            self.push(
                MessageLevel::Error,
                position,
                format!("id {id} has already been defined"),
            );
        }
    }

    fn position(&self, id: Word) -> usize {
        self.defined.get(&id).copied().unwrap_or(0)
    }

    fn into_report(self) -> ValidationReport {
        ValidationReport {
            messages: self.messages,
        }
    }

    fn check_module(&mut self, module: &SpirvModule, target: TargetEnv) {
        if !module.memory_model {
            self.push(
                MessageLevel::Error,
                0,
                "missing required OpMemoryModel instruction".to_string(),
            );
        }

        for &capability in &module.capabilities {
            if !capability_allowed(capability) {
                self.push(
                    MessageLevel::Error,
                    0,
                    format!("capability {capability:?} is not allowed by the {target} environment"),
                );
            }
        }

        self.check_types(module);
        self.check_variables(module);

        let entry_position = self.entry_point;
        if module.entry_points.len() != 1 {
            self.push(
                MessageLevel::Error,
                entry_position,
                format!(
                    "expected exactly one entry point, found {}",
                    module.entry_points.len()
                ),
            );
            return;
        }

        let entry = &module.entry_points[0];
        if !matches!(
            entry.execution_model,
            ExecutionModel::Vertex | ExecutionModel::Fragment | ExecutionModel::GLCompute
        ) {
            self.push(
                MessageLevel::Error,
                entry_position,
                format!(
                    "execution model {:?} is not supported by the {target} environment",
                    entry.execution_model
                ),
            );
        }
        if !module.functions.contains(&entry.function) {
            self.push(
                MessageLevel::Error,
                entry_position,
                format!(
                    "entry point '{}' names id {} which is not an OpFunction",
                    entry.name, entry.function
                ),
            );
        }

        for variable in &module.variables {
            let interface = matches!(
                variable.storage_class,
                StorageClass::Input | StorageClass::Output
            );
            if interface && !entry.interface.contains(&variable.id) {
                self.push(
                    MessageLevel::Warning,
                    self.position(variable.id),
                    format!(
                        "{:?} variable {} is not listed in the interface of entry point '{}'",
                        variable.storage_class, variable.id, entry.name
                    ),
                );
            }
        }
    }

    /// Every type operand must name a type declared before it. Pointers named by an
    /// `OpTypeForwardPointer` are the one exception, and may be referenced early.
    fn check_types(&mut self, module: &SpirvModule) {
        let mut types: Vec<_> = module.types.iter().collect();
        // Hash map order isn't stable, report in module order.
        types.sort_by_key(|(&id, _)| self.position(id));

        for (&id, ty) in types {
            let position = self.position(id);
            let mut refs: Vec<Word> = Vec::new();
            match ty {
                &Type::Vector { component, .. } => refs.push(component),
                &Type::Matrix { column, .. } => refs.push(column),
                &Type::Array { element, length } => {
                    refs.push(element);
                    if module.constant(length).is_none() {
                        self.push(
                            MessageLevel::Error,
                            position,
                            format!("array length {length} of type {id} is not an integer constant"),
                        );
                    }
                }
                &Type::RuntimeArray { element } => refs.push(element),
                Type::Struct { members } => refs.extend(members),
                &Type::Pointer { pointee, .. } => {
                    if module.forward_pointers.contains(&id) {
                        if module.ty(pointee).is_none() {
                            self.push(
                                MessageLevel::Error,
                                position,
                                format!("type {id} references id {pointee} which is not a type"),
                            );
                        }
                    } else {
                        refs.push(pointee);
                    }
                }
                &Type::SampledImage { image } => {
                    refs.push(image);
                    if !matches!(module.ty(image), None | Some(Type::Image(_))) {
                        self.push(
                            MessageLevel::Error,
                            position,
                            format!("sampled image type {id} does not wrap an image type"),
                        );
                    }
                }
                Type::Image(image) => {
                    refs.push(image.sampled_type);
                    if !matches!(
                        module.ty(image.sampled_type),
                        None | Some(Type::Int { width: 32, .. } | Type::Float { width: 32 })
                    ) {
                        self.push(
                            MessageLevel::Error,
                            position,
                            format!(
                                "sampled type of image {id} must be a 32-bit int or float scalar"
                            ),
                        );
                    }
                    if !matches!(
                        image.dim,
                        Dim::Dim1D | Dim::Dim2D | Dim::Dim3D | Dim::DimCube
                    ) {
                        self.push(
                            MessageLevel::Error,
                            position,
                            format!("image {id} has unsupported dimension {:?}", image.dim),
                        );
                    }
                }
                _ => {}
            }

            for referenced in refs {
                if module.ty(referenced).is_none() {
                    self.push(
                        MessageLevel::Error,
                        position,
                        format!("type {id} references id {referenced} which is not a type"),
                    );
                } else if self.position(referenced) >= position
                    && !module.forward_pointers.contains(&referenced)
                {
                    self.push(
                        MessageLevel::Error,
                        position,
                        format!("type {id} references type {referenced} before its declaration"),
                    );
                }
            }
        }
    }

    fn check_variables(&mut self, module: &SpirvModule) {
        for variable in &module.variables {
            let position = self.position(variable.id);
            match module.ty(variable.pointer_type) {
                Some(&Type::Pointer { storage_class, .. }) => {
                    if storage_class != variable.storage_class {
                        self.push(
                            MessageLevel::Error,
                            position,
                            format!(
                                "variable {} has storage class {:?} but its pointer type uses {:?}",
                                variable.id, variable.storage_class, storage_class
                            ),
                        );
                    }
                }
                _ => self.push(
                    MessageLevel::Error,
                    position,
                    format!(
                        "variable {} has type {} which is not a pointer type",
                        variable.id, variable.pointer_type
                    ),
                ),
            }
        }
    }

    /// Buffer blocks must have a size that fits in 64 bits.
    fn check_block_sizes(&mut self, module: &SpirvModule) {
        for variable in &module.variables {
            if !matches!(
                variable.storage_class,
                StorageClass::Uniform | StorageClass::StorageBuffer | StorageClass::PushConstant
            ) {
                continue;
            }

            let ty = module.resource_base_type(variable);
            let is_struct = matches!(module.ty(ty), Some(Type::Struct { .. }));
            if is_struct && module.struct_size(ty).is_none() {
                self.push(
                    MessageLevel::Error,
                    self.position(variable.id),
                    format!(
                        "size of block type {ty} used by variable {} does not fit in 64 bits",
                        variable.id
                    ),
                );
            }
        }
    }

    fn check_with_naga(&mut self, words: &[Word]) {
        let verdict = naga::front::spv::Frontend::new(words.iter().copied(), &SpvOptions::default())
            .parse()
            .map_err(|err| err.to_string())
            .and_then(|module| {
                naga::valid::Validator::new(ValidationFlags::all(), Capabilities::all())
                    .validate(&module)
                    .map(|_info| ())
                    .map_err(|err| err.into_inner().to_string())
            });

        if let Err(text) = verdict {
            self.push(
                MessageLevel::Warning,
                0,
                format!("module can't be represented in naga IR: {text}"),
            );
        }
    }
}

fn capability_allowed(capability: Capability) -> bool {
    !matches!(
        capability,
        Capability::Addresses
            | Capability::Linkage
            | Capability::Kernel
            | Capability::Vector16
            | Capability::Float16Buffer
            | Capability::Int64Atomics
            | Capability::ImageBasic
            | Capability::ImageReadWrite
            | Capability::ImageMipmap
            | Capability::Pipes
            | Capability::Groups
            | Capability::DeviceEnqueue
            | Capability::LiteralSampler
            | Capability::GenericPointer
    )
}
