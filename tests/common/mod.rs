//! A small SPIR-V assembler for building test modules, plus fixtures shared between test files.

#![allow(dead_code)]

use std::sync::Arc;

use bindcheck::{Device, ReflectionBackend, ShaderError, ShaderModule, ShaderModuleDescriptor};
use spirv::{
    BuiltIn, Capability, Decoration, Dim, ExecutionMode, ExecutionModel, ImageFormat, Op,
    StorageClass, Word,
};

pub const BACKENDS: [ReflectionBackend; 2] =
    [ReflectionBackend::Resources, ReflectionBackend::Queries];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn device(backend: ReflectionBackend) -> Device {
    init_logger();
    Device::builder().reflection(backend).build()
}

/// Create a module from `words` with each reflection strategy.
pub fn create_with_each_backend(words: &[Word]) -> Vec<Result<Arc<ShaderModule>, ShaderError>> {
    BACKENDS
        .iter()
        .map(|&backend| device(backend).create_shader_module(&ShaderModuleDescriptor::spirv(words)))
        .collect()
}

/// The error both strategies fail `words` with. Panics if they disagree or either succeeds.
pub fn reflection_error(words: &[Word]) -> ShaderError {
    let mut errors = create_with_each_backend(words)
        .into_iter()
        .map(|result| result.expect_err("module creation should fail"));
    let first = errors.next().unwrap();
    for other in errors {
        assert_eq!(first, other, "reflection strategies disagree");
    }
    first
}

pub struct ModuleBuilder {
    model: ExecutionModel,
    version: Word,
    next_id: Word,
    capabilities: Vec<Capability>,
    interface: Vec<Word>,
    annotations: Vec<Word>,
    globals: Vec<Word>,
    float: Option<Word>,
    int: Option<Word>,
    uint: Option<Word>,
}

fn push_inst(out: &mut Vec<Word>, op: Op, operands: &[Word]) {
    out.push(((operands.len() as Word + 1) << 16) | op as Word);
    out.extend_from_slice(operands);
}

impl ModuleBuilder {
    pub fn new(model: ExecutionModel) -> Self {
        Self {
            model,
            version: 0x0001_0000,
            next_id: 1,
            capabilities: vec![Capability::Shader],
            interface: Vec::new(),
            annotations: Vec::new(),
            globals: Vec::new(),
            float: None,
            int: None,
            uint: None,
        }
    }

    pub fn vertex() -> Self {
        Self::new(ExecutionModel::Vertex)
    }

    pub fn fragment() -> Self {
        Self::new(ExecutionModel::Fragment)
    }

    pub fn compute() -> Self {
        Self::new(ExecutionModel::GLCompute)
    }

    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major as Word) << 16 | (minor as Word) << 8;
        self
    }

    pub fn capability(&mut self, capability: Capability) {
        self.capabilities.push(capability);
    }

    pub fn id(&mut self) -> Word {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Emit an arbitrary instruction among the global declarations.
    pub fn raw(&mut self, op: Op, operands: &[Word]) {
        push_inst(&mut self.globals, op, operands);
    }

    pub fn decorate(&mut self, target: Word, decoration: Decoration, extra: &[Word]) {
        let mut operands = vec![target, decoration as Word];
        operands.extend_from_slice(extra);
        push_inst(&mut self.annotations, Op::Decorate, &operands);
    }

    pub fn member_decorate(
        &mut self,
        ty: Word,
        member: u32,
        decoration: Decoration,
        extra: &[Word],
    ) {
        let mut operands = vec![ty, member, decoration as Word];
        operands.extend_from_slice(extra);
        push_inst(&mut self.annotations, Op::MemberDecorate, &operands);
    }

    fn declare(&mut self, op: Op, operands: &[Word]) -> Word {
        let id = self.id();
        let mut all = vec![id];
        all.extend_from_slice(operands);
        self.raw(op, &all);
        id
    }

    pub fn float(&mut self) -> Word {
        if let Some(id) = self.float {
            return id;
        }
        let id = self.declare(Op::TypeFloat, &[32]);
        self.float = Some(id);
        id
    }

    pub fn int(&mut self) -> Word {
        if let Some(id) = self.int {
            return id;
        }
        let id = self.declare(Op::TypeInt, &[32, 1]);
        self.int = Some(id);
        id
    }

    pub fn uint(&mut self) -> Word {
        if let Some(id) = self.uint {
            return id;
        }
        let id = self.declare(Op::TypeInt, &[32, 0]);
        self.uint = Some(id);
        id
    }

    pub fn bool(&mut self) -> Word {
        self.declare(Op::TypeBool, &[])
    }

    pub fn vector(&mut self, component: Word, count: u32) -> Word {
        self.declare(Op::TypeVector, &[component, count])
    }

    pub fn vec4(&mut self) -> Word {
        let float = self.float();
        self.vector(float, 4)
    }

    pub fn matrix(&mut self, column: Word, count: u32) -> Word {
        self.declare(Op::TypeMatrix, &[column, count])
    }

    pub fn constant(&mut self, value: u32) -> Word {
        let uint = self.uint();
        let id = self.id();
        self.raw(Op::Constant, &[uint, id, value]);
        id
    }

    pub fn array(&mut self, element: Word, length: u32) -> Word {
        let length = self.constant(length);
        self.declare(Op::TypeArray, &[element, length])
    }

    pub fn runtime_array(&mut self, element: Word) -> Word {
        self.declare(Op::TypeRuntimeArray, &[element])
    }

    pub fn structure(&mut self, members: &[Word]) -> Word {
        self.declare(Op::TypeStruct, members)
    }

    /// A `Block` struct whose members sit at the given offsets.
    pub fn block(&mut self, members: &[(Word, u32)]) -> Word {
        let types: Vec<_> = members.iter().map(|&(ty, _)| ty).collect();
        let id = self.structure(&types);
        self.decorate(id, Decoration::Block, &[]);
        for (member, &(_, offset)) in members.iter().enumerate() {
            self.member_decorate(id, member as u32, Decoration::Offset, &[offset]);
        }
        id
    }

    pub fn pointer(&mut self, class: StorageClass, pointee: Word) -> Word {
        self.declare(Op::TypePointer, &[class as Word, pointee])
    }

    pub fn image(
        &mut self,
        sampled_type: Word,
        dim: Dim,
        arrayed: bool,
        multisampled: bool,
        sampled: u32,
        format: ImageFormat,
    ) -> Word {
        self.declare(
            Op::TypeImage,
            &[
                sampled_type,
                dim as Word,
                0,
                arrayed as Word,
                multisampled as Word,
                sampled,
                format as Word,
            ],
        )
    }

    pub fn sampler(&mut self) -> Word {
        self.declare(Op::TypeSampler, &[])
    }

    pub fn sampled_image(&mut self, image: Word) -> Word {
        self.declare(Op::TypeSampledImage, &[image])
    }

    /// A module-scope variable of type `pointee` in `class`.
    pub fn variable(&mut self, pointee: Word, class: StorageClass) -> Word {
        let pointer = self.pointer(class, pointee);
        let id = self.id();
        self.raw(Op::Variable, &[pointer, id, class as Word]);
        id
    }

    pub fn bind(&mut self, variable: Word, group: u32, binding: u32) {
        self.decorate(variable, Decoration::DescriptorSet, &[group]);
        self.decorate(variable, Decoration::Binding, &[binding]);
    }

    pub fn uniform_buffer(&mut self, group: u32, binding: u32, members: &[(Word, u32)]) -> Word {
        let block = self.block(members);
        let variable = self.variable(block, StorageClass::Uniform);
        self.bind(variable, group, binding);
        variable
    }

    pub fn storage_buffer(
        &mut self,
        group: u32,
        binding: u32,
        members: &[(Word, u32)],
        read_only: bool,
    ) -> Word {
        let block = self.block(members);
        let variable = self.variable(block, StorageClass::StorageBuffer);
        if read_only {
            self.decorate(variable, Decoration::NonWritable, &[]);
        }
        self.bind(variable, group, binding);
        variable
    }

    pub fn texture(
        &mut self,
        group: u32,
        binding: u32,
        sampled_type: Word,
        dim: Dim,
        arrayed: bool,
    ) -> Word {
        let image = self.image(sampled_type, dim, arrayed, false, 1, ImageFormat::Unknown);
        let variable = self.variable(image, StorageClass::UniformConstant);
        self.bind(variable, group, binding);
        variable
    }

    pub fn texture_2d(&mut self, group: u32, binding: u32) -> Word {
        let float = self.float();
        self.texture(group, binding, float, Dim::Dim2D, false)
    }

    pub fn separate_sampler(&mut self, group: u32, binding: u32) -> Word {
        let sampler = self.sampler();
        let variable = self.variable(sampler, StorageClass::UniformConstant);
        self.bind(variable, group, binding);
        variable
    }

    /// A 2D storage image; `access` is `NonReadable`, `NonWritable` or nothing.
    pub fn storage_texture(
        &mut self,
        group: u32,
        binding: u32,
        format: ImageFormat,
        access: Option<Decoration>,
    ) -> Word {
        let float = self.float();
        let image = self.image(float, Dim::Dim2D, false, false, 2, format);
        let variable = self.variable(image, StorageClass::UniformConstant);
        if let Some(access) = access {
            self.decorate(variable, access, &[]);
        }
        self.bind(variable, group, binding);
        variable
    }

    /// An entry point input, optionally at `location`.
    pub fn input(&mut self, ty: Word, location: Option<u32>) -> Word {
        self.stage_variable(ty, StorageClass::Input, location)
    }

    pub fn output(&mut self, ty: Word, location: Option<u32>) -> Word {
        self.stage_variable(ty, StorageClass::Output, location)
    }

    fn stage_variable(&mut self, ty: Word, class: StorageClass, location: Option<u32>) -> Word {
        let variable = self.variable(ty, class);
        if let Some(location) = location {
            self.decorate(variable, Decoration::Location, &[location]);
        }
        self.interface.push(variable);
        variable
    }

    pub fn builtin(&mut self, ty: Word, class: StorageClass, builtin: BuiltIn) -> Word {
        let variable = self.variable(ty, class);
        self.decorate(variable, Decoration::BuiltIn, &[builtin as Word]);
        self.interface.push(variable);
        variable
    }

    pub fn build(mut self) -> Vec<Word> {
        let void = self.id();
        let function_type = self.id();
        let main = self.id();
        let label = self.id();

        let mut words = vec![spirv::MAGIC_NUMBER, self.version, 0, self.next_id, 0];
        for &capability in &self.capabilities {
            push_inst(&mut words, Op::Capability, &[capability as Word]);
        }
        // Logical addressing, GLSL450 memory model.
        push_inst(&mut words, Op::MemoryModel, &[0, 1]);

        let mut entry = vec![
            self.model as Word,
            main,
            u32::from_le_bytes(*b"main"),
            0,
        ];
        entry.extend_from_slice(&self.interface);
        push_inst(&mut words, Op::EntryPoint, &entry);

        match self.model {
            ExecutionModel::Fragment => push_inst(
                &mut words,
                Op::ExecutionMode,
                &[main, ExecutionMode::OriginUpperLeft as Word],
            ),
            ExecutionModel::GLCompute => push_inst(
                &mut words,
                Op::ExecutionMode,
                &[main, ExecutionMode::LocalSize as Word, 1, 1, 1],
            ),
            _ => {}
        }

        words.extend_from_slice(&self.annotations);
        words.extend_from_slice(&self.globals);

        push_inst(&mut words, Op::TypeVoid, &[void]);
        push_inst(&mut words, Op::TypeFunction, &[function_type, void]);
        push_inst(&mut words, Op::Function, &[void, main, 0, function_type]);
        push_inst(&mut words, Op::Label, &[label]);
        push_inst(&mut words, Op::Return, &[]);
        push_inst(&mut words, Op::FunctionEnd, &[]);
        words
    }
}

/// Fragment shader with a 16-byte uniform buffer at set 0 binding 2 and one vec4 output.
pub fn fragment_with_uniform() -> Vec<Word> {
    let mut module = ModuleBuilder::fragment();
    let vec4 = module.vec4();
    module.uniform_buffer(0, 2, &[(vec4, 0)]);
    module.output(vec4, Some(0));
    module.build()
}

/// Vertex shader with two attributes and a located output next to the position built-in.
pub fn vertex_with_attributes() -> Vec<Word> {
    let mut module = ModuleBuilder::vertex();
    let vec4 = module.vec4();
    let float = module.float();
    let vec2 = module.vector(float, 2);
    module.input(vec4, Some(0));
    module.input(vec2, Some(3));
    module.output(vec2, Some(0));
    module.builtin(vec4, StorageClass::Output, BuiltIn::Position);
    let mat4 = module.matrix(vec4, 4);
    module.uniform_buffer(0, 0, &[(mat4, 0)]);
    module.build()
}

/// Compute shader touching every binding kind that compute can use.
pub fn compute_with_everything() -> Vec<Word> {
    let mut module = ModuleBuilder::compute();
    let vec4 = module.vec4();
    let uint = module.uint();
    let int = module.int();

    module.uniform_buffer(0, 0, &[(vec4, 0), (uint, 16)]);
    let items = module.runtime_array(vec4);
    module.decorate(items, Decoration::ArrayStride, &[16]);
    module.storage_buffer(0, 1, &[(uint, 0), (items, 16)], false);
    module.storage_buffer(1, 0, &[(vec4, 0)], true);
    module.texture(1, 1, int, Dim::Dim2D, true);
    module.texture(1, 2, uint, Dim::DimCube, false);
    module.separate_sampler(1, 3);
    module.storage_texture(2, 0, ImageFormat::Rgba8, Some(Decoration::NonReadable));
    module.storage_texture(2, 1, ImageFormat::R32f, Some(Decoration::NonWritable));
    module.storage_texture(2, 2, ImageFormat::R32ui, None);
    module.build()
}
