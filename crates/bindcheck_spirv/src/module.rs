//! The declarations of a decoded module: types, decorations, module-scope variables and the
//! entry point, with the queries reflection needs over them.

use naga::FastHashMap;
use rspirv::dr::{self, Instruction, Operand};
use spirv::{BuiltIn, Decoration, Dim, ExecutionModel, ImageFormat, Op, StorageClass, Word};

/// A type declared by an `OpType*` instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// `OpTypeVoid`.
    Void,
    /// `OpTypeBool`.
    Bool,
    /// `OpTypeInt`.
    Int {
        /// Width in bits.
        width: u32,
        /// Signedness as declared.
        signed: bool,
    },
    /// `OpTypeFloat`.
    Float {
        /// Width in bits.
        width: u32,
    },
    /// `OpTypeVector`.
    Vector {
        /// The scalar component type.
        component: Word,
        /// Number of components.
        count: u32,
    },
    /// `OpTypeMatrix`.
    Matrix {
        /// The column vector type.
        column: Word,
        /// Number of columns.
        count: u32,
    },
    /// `OpTypeArray`.
    Array {
        /// Element type.
        element: Word,
        /// Id of the constant holding the length.
        length: Word,
    },
    /// `OpTypeRuntimeArray`.
    RuntimeArray {
        /// Element type.
        element: Word,
    },
    /// `OpTypeStruct`.
    Struct {
        /// Member types in declaration order.
        members: Vec<Word>,
    },
    /// `OpTypeImage`.
    Image(ImageType),
    /// `OpTypeSampler`.
    Sampler,
    /// `OpTypeSampledImage`, a combined image and sampler.
    SampledImage {
        /// The image type being sampled.
        image: Word,
    },
    /// `OpTypePointer`.
    Pointer {
        /// Storage class of the pointee.
        storage_class: StorageClass,
        /// The pointee type.
        pointee: Word,
    },
    /// `OpTypeFunction`.
    Function,
    /// Any other type instruction. These never carry resources.
    Opaque(Op),
}

/// The operands of an `OpTypeImage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageType {
    /// Scalar type of the texels returned by sampling or reading.
    pub sampled_type: Word,
    /// Dimensionality.
    pub dim: Dim,
    /// `0` no depth, `1` depth, `2` unknown.
    pub depth: u32,
    /// Whether the image is arrayed.
    pub arrayed: bool,
    /// Whether the image is multisampled.
    pub multisampled: bool,
    /// `1` used with a sampler, `2` used for reads and writes without one, `0` unknown.
    pub sampled: u32,
    /// The declared texel format. `Unknown` for sampled images.
    pub format: ImageFormat,
}

impl ImageType {
    /// Whether this image is accessed without a sampler, i.e. a storage image.
    pub fn is_storage(&self) -> bool {
        self.sampled == 2
    }
}

bitflags::bitflags! {
    /// Decorations that carry no literal operands.
    #[derive(Default)]
    pub struct DecorationFlags: u16 {
        /// `Block`
        const BLOCK = 1 << 0;
        /// `BufferBlock`
        const BUFFER_BLOCK = 1 << 1;
        /// `NonWritable`
        const NON_WRITABLE = 1 << 2;
        /// `NonReadable`
        const NON_READABLE = 1 << 3;
        /// `RowMajor`
        const ROW_MAJOR = 1 << 4;
        /// `ColMajor`
        const COL_MAJOR = 1 << 5;
        /// `Flat`
        const FLAT = 1 << 6;
    }
}

/// All the decorations applied to one id or one struct member.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decorations {
    /// `Binding`
    pub binding: Option<u32>,
    /// `DescriptorSet`
    pub descriptor_set: Option<u32>,
    /// `Location`
    pub location: Option<u32>,
    /// `BuiltIn`
    pub built_in: Option<BuiltIn>,
    /// `Offset`
    pub offset: Option<u32>,
    /// `ArrayStride`
    pub array_stride: Option<u32>,
    /// `MatrixStride`
    pub matrix_stride: Option<u32>,
    /// Literal-free decorations.
    pub flags: DecorationFlags,
}

impl Decorations {
    fn apply(&mut self, decoration: Decoration, extra: Option<&Operand>) {
        let literal = match extra {
            Some(&Operand::LiteralInt32(value)) => Some(value),
            _ => None,
        };
        match decoration {
            Decoration::Binding => self.binding = literal,
            Decoration::DescriptorSet => self.descriptor_set = literal,
            Decoration::Location => self.location = literal,
            Decoration::BuiltIn => {
                if let Some(&Operand::BuiltIn(built_in)) = extra {
                    self.built_in = Some(built_in);
                }
            }
            Decoration::Offset => self.offset = literal,
            Decoration::ArrayStride => self.array_stride = literal,
            Decoration::MatrixStride => self.matrix_stride = literal,
            Decoration::Block => self.flags |= DecorationFlags::BLOCK,
            Decoration::BufferBlock => self.flags |= DecorationFlags::BUFFER_BLOCK,
            Decoration::NonWritable => self.flags |= DecorationFlags::NON_WRITABLE,
            Decoration::NonReadable => self.flags |= DecorationFlags::NON_READABLE,
            Decoration::RowMajor => self.flags |= DecorationFlags::ROW_MAJOR,
            Decoration::ColMajor => self.flags |= DecorationFlags::COL_MAJOR,
            Decoration::Flat => self.flags |= DecorationFlags::FLAT,
            _ => {}
        }
    }
}

/// A module-scope `OpVariable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Variable {
    /// The variable's result id.
    pub id: Word,
    /// The declared pointer type.
    pub pointer_type: Word,
    /// The variable's storage class.
    pub storage_class: StorageClass,
}

/// The module's `OpEntryPoint`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    /// The stage the entry point runs in.
    pub execution_model: ExecutionModel,
    /// Id of the entry point's `OpFunction`.
    pub function: Word,
    /// The entry point's name.
    pub name: String,
    /// The `Input`/`Output` variables listed in the entry point's interface.
    pub interface: Vec<Word>,
}

/// The numeric class of a scalar, vector, matrix or array of those.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Signed integer.
    Sint,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
    /// Boolean.
    Bool,
}

/// A validated SPIR-V module, decoded into lookup tables.
///
/// Only [`validate`](crate::validate()) creates these, so every accessor may assume the module
/// passed structural validation: there is exactly one entry point, every type operand names a
/// type declared before it, and image types are well formed.
#[derive(Clone, Debug, Default)]
pub struct SpirvModule {
    pub(crate) version: (u8, u8),
    pub(crate) entry_points: Vec<EntryPoint>,
    pub(crate) memory_model: bool,
    pub(crate) capabilities: Vec<spirv::Capability>,
    pub(crate) types: FastHashMap<Word, Type>,
    pub(crate) forward_pointers: Vec<Word>,
    pub(crate) decorations: FastHashMap<Word, Decorations>,
    pub(crate) member_decorations: FastHashMap<(Word, u32), Decorations>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) constants: FastHashMap<Word, u64>,
    pub(crate) functions: Vec<Word>,
    empty: Decorations,
}

impl SpirvModule {
    /// Build the lookup tables from a module loaded by `rspirv`.
    pub(crate) fn from_dr(module: &dr::Module) -> Result<Self, String> {
        let mut decoded = Self {
            version: module.header.as_ref().map_or((0, 0), |header| header.version()),
            memory_model: module.memory_model.is_some(),
            ..Self::default()
        };

        for inst in &module.capabilities {
            if let Some(&Operand::Capability(capability)) = inst.operands.first() {
                decoded.capabilities.push(capability);
            }
        }

        for inst in &module.entry_points {
            let execution_model = match inst.operands.first() {
                Some(&Operand::ExecutionModel(model)) => model,
                other => return Err(unexpected(inst, 0, "an execution model", other)),
            };
            let name = match inst.operands.get(2) {
                Some(Operand::LiteralString(name)) => name.clone(),
                other => return Err(unexpected(inst, 2, "a name", other)),
            };
            decoded.entry_points.push(EntryPoint {
                execution_model,
                function: id(inst, 1)?,
                name,
                interface: inst.operands[3..]
                    .iter()
                    .filter_map(|operand| match *operand {
                        Operand::IdRef(id) => Some(id),
                        _ => None,
                    })
                    .collect(),
            });
        }

        for inst in &module.annotations {
            match inst.class.opcode {
                Op::Decorate => {
                    let target = id(inst, 0)?;
                    let decoration = decoration(inst, 1)?;
                    decoded
                        .decorations
                        .entry(target)
                        .or_default()
                        .apply(decoration, inst.operands.get(2));
                }
                Op::MemberDecorate => {
                    let target = id(inst, 0)?;
                    let member = literal(inst, 1)?;
                    let decoration = decoration(inst, 2)?;
                    decoded
                        .member_decorations
                        .entry((target, member))
                        .or_default()
                        .apply(decoration, inst.operands.get(3));
                }
                _ => {}
            }
        }

        for inst in &module.types_global_values {
            decoded.record(inst)?;
        }

        decoded.functions = module
            .functions
            .iter()
            .filter_map(|function| function.def.as_ref()?.result_id)
            .collect();

        Ok(decoded)
    }

    fn record(&mut self, inst: &Instruction) -> Result<(), String> {
        let ty = match inst.class.opcode {
            Op::TypeVoid => Type::Void,
            Op::TypeBool => Type::Bool,
            Op::TypeInt => Type::Int {
                width: literal(inst, 0)?,
                signed: literal(inst, 1)? != 0,
            },
            Op::TypeFloat => Type::Float {
                width: literal(inst, 0)?,
            },
            Op::TypeVector => Type::Vector {
                component: id(inst, 0)?,
                count: literal(inst, 1)?,
            },
            Op::TypeMatrix => Type::Matrix {
                column: id(inst, 0)?,
                count: literal(inst, 1)?,
            },
            Op::TypeImage => {
                let dim = match inst.operands.get(1) {
                    Some(&Operand::Dim(dim)) => dim,
                    other => return Err(unexpected(inst, 1, "a dimension", other)),
                };
                let format = match inst.operands.get(6) {
                    Some(&Operand::ImageFormat(format)) => format,
                    other => return Err(unexpected(inst, 6, "an image format", other)),
                };
                Type::Image(ImageType {
                    sampled_type: id(inst, 0)?,
                    dim,
                    depth: literal(inst, 2)?,
                    arrayed: literal(inst, 3)? != 0,
                    multisampled: literal(inst, 4)? != 0,
                    sampled: literal(inst, 5)?,
                    format,
                })
            }
            Op::TypeSampler => Type::Sampler,
            Op::TypeSampledImage => Type::SampledImage {
                image: id(inst, 0)?,
            },
            Op::TypeArray => Type::Array {
                element: id(inst, 0)?,
                length: id(inst, 1)?,
            },
            Op::TypeRuntimeArray => Type::RuntimeArray {
                element: id(inst, 0)?,
            },
            Op::TypeStruct => Type::Struct {
                members: (0..inst.operands.len())
                    .map(|index| id(inst, index))
                    .collect::<Result<_, _>>()?,
            },
            Op::TypePointer => Type::Pointer {
                storage_class: storage_class(inst, 0)?,
                pointee: id(inst, 1)?,
            },
            Op::TypeForwardPointer => {
                self.forward_pointers.push(id(inst, 0)?);
                return Ok(());
            }
            Op::TypeFunction => Type::Function,
            Op::TypeEvent
            | Op::TypeDeviceEvent
            | Op::TypeReserveId
            | Op::TypeQueue
            | Op::TypePipe
            | Op::TypeOpaque => Type::Opaque(inst.class.opcode),
            Op::Constant | Op::SpecConstant => {
                let value = match inst.operands.first() {
                    Some(&Operand::LiteralInt32(value)) => Some(value as u64),
                    Some(&Operand::LiteralInt64(value)) => Some(value),
                    _ => None,
                };
                if let (Some(id), Some(value)) = (inst.result_id, value) {
                    self.constants.insert(id, value);
                }
                return Ok(());
            }
            Op::Variable => {
                let (Some(id), Some(pointer_type)) = (inst.result_id, inst.result_type) else {
                    return Err(format!("Op{:?} is missing its result", inst.class.opcode));
                };
                self.variables.push(Variable {
                    id,
                    pointer_type,
                    storage_class: storage_class(inst, 0)?,
                });
                return Ok(());
            }
            _ => return Ok(()),
        };

        let id = inst
            .result_id
            .ok_or_else(|| format!("Op{:?} is missing its result id", inst.class.opcode))?;
        self.types.insert(id, ty);
        Ok(())
    }

    /// The `(major, minor)` SPIR-V version the module was written against.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The module's only entry point.
    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry_points[0]
    }

    /// The capabilities the module declares.
    pub fn capabilities(&self) -> &[spirv::Capability] {
        &self.capabilities
    }

    /// Look up a declared type.
    pub fn ty(&self, id: Word) -> Option<&Type> {
        self.types.get(&id)
    }

    /// Decorations applied to `id`. Undecorated ids get an empty set.
    pub fn decorations(&self, id: Word) -> &Decorations {
        self.decorations.get(&id).unwrap_or(&self.empty)
    }

    /// Decorations applied to member `member` of struct `id`.
    pub fn member_decorations(&self, id: Word, member: u32) -> &Decorations {
        self.member_decorations
            .get(&(id, member))
            .unwrap_or(&self.empty)
    }

    /// All module-scope variables, in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The value of an integer constant.
    pub fn constant(&self, id: Word) -> Option<u64> {
        self.constants.get(&id).copied()
    }

    /// The type a variable points to.
    pub fn pointee(&self, variable: &Variable) -> Word {
        match self.types.get(&variable.pointer_type) {
            Some(&Type::Pointer { pointee, .. }) => pointee,
            _ => unreachable!("validation guarantees variables have pointer types"),
        }
    }

    /// Strip any (runtime) array layers off `ty`.
    pub fn strip_arrays(&self, mut ty: Word) -> Word {
        loop {
            match self.types.get(&ty) {
                Some(&Type::Array { element, .. }) | Some(&Type::RuntimeArray { element }) => {
                    ty = element
                }
                _ => return ty,
            }
        }
    }

    /// The type describing a resource variable: its pointee with array layers stripped.
    pub fn resource_base_type(&self, variable: &Variable) -> Word {
        self.strip_arrays(self.pointee(variable))
    }

    /// Whether a variable is a built-in, either decorated `BuiltIn` itself or a block whose
    /// members are (such as `gl_PerVertex`).
    pub fn is_builtin(&self, variable: &Variable) -> bool {
        if self.decorations(variable.id).built_in.is_some() {
            return true;
        }

        let ty = self.resource_base_type(variable);
        match self.types.get(&ty) {
            Some(Type::Struct { members }) => (0..members.len() as u32)
                .any(|member| self.member_decorations(ty, member).built_in.is_some()),
            _ => false,
        }
    }

    /// The base numeric kind of a scalar, or of the components of a vector, matrix or array.
    pub fn scalar_kind(&self, ty: Word) -> Option<ScalarKind> {
        match self.types.get(&self.strip_arrays(ty))? {
            Type::Bool => Some(ScalarKind::Bool),
            Type::Int { signed: true, .. } => Some(ScalarKind::Sint),
            Type::Int { signed: false, .. } => Some(ScalarKind::Uint),
            Type::Float { .. } => Some(ScalarKind::Float),
            &Type::Vector { component, .. } => self.scalar_kind(component),
            &Type::Matrix { column, .. } => self.scalar_kind(column),
            _ => None,
        }
    }

    /// The image type behind a resource, looking through combined image-samplers.
    pub fn image(&self, ty: Word) -> Option<&ImageType> {
        match self.types.get(&ty)? {
            Type::Image(image) => Some(image),
            &Type::SampledImage { image } => self.image(image),
            _ => None,
        }
    }
}

fn unexpected(inst: &Instruction, index: usize, what: &str, found: Option<&Operand>) -> String {
    match found {
        Some(operand) => format!(
            "Op{:?} expects {what} at operand {index}, found {operand:?}",
            inst.class.opcode
        ),
        None => format!(
            "Op{:?} expects {what} at operand {index}, found nothing",
            inst.class.opcode
        ),
    }
}

fn id(inst: &Instruction, index: usize) -> Result<Word, String> {
    match inst.operands.get(index) {
        Some(&Operand::IdRef(id)) => Ok(id),
        other => Err(unexpected(inst, index, "an id", other)),
    }
}

fn literal(inst: &Instruction, index: usize) -> Result<u32, String> {
    match inst.operands.get(index) {
        Some(&Operand::LiteralInt32(value)) => Ok(value),
        other => Err(unexpected(inst, index, "a literal", other)),
    }
}

fn decoration(inst: &Instruction, index: usize) -> Result<Decoration, String> {
    match inst.operands.get(index) {
        Some(&Operand::Decoration(decoration)) => Ok(decoration),
        other => Err(unexpected(inst, index, "a decoration", other)),
    }
}

fn storage_class(inst: &Instruction, index: usize) -> Result<StorageClass, String> {
    match inst.operands.get(index) {
        Some(&Operand::StorageClass(class)) => Ok(class),
        other => Err(unexpected(inst, index, "a storage class", other)),
    }
}
