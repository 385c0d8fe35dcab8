//! Byte sizes of buffer blocks, following their explicit layout decorations.

use spirv::Word;

use crate::module::{Decorations, DecorationFlags, SpirvModule, Type};

impl SpirvModule {
    /// The declared size of struct `ty`, counting a trailing runtime-sized array as one element.
    ///
    /// This is a lower bound on the size of any buffer bound to a block of this type: the offset
    /// of the last member plus that member's size. Saturates at `u64::MAX`, which validated
    /// modules never reach since their buffer blocks must have a representable size.
    pub fn declared_struct_size_runtime_array(&self, ty: Word) -> u64 {
        self.struct_size(ty).unwrap_or(u64::MAX)
    }

    /// Like [`declared_struct_size_runtime_array`](Self::declared_struct_size_runtime_array),
    /// but `None` on overflow.
    pub(crate) fn struct_size(&self, ty: Word) -> Option<u64> {
        let members = match self.ty(ty) {
            Some(Type::Struct { members }) => members,
            _ => return Some(0),
        };
        let Some((last, &last_ty)) = members.iter().enumerate().last() else {
            return Some(0);
        };

        let decorations = self.member_decorations(ty, last as u32);
        let offset = decorations.offset.unwrap_or(0) as u64;
        offset.checked_add(self.declared_size(last_ty, decorations)?)
    }

    /// Size of `ty` as a struct member decorated with `member`.
    fn declared_size(&self, ty: Word, member: &Decorations) -> Option<u64> {
        match self.ty(ty) {
            Some(Type::Bool) => Some(4),
            Some(&Type::Int { width, .. }) | Some(&Type::Float { width }) => Some(width as u64 / 8),
            Some(&Type::Vector { component, count }) => self
                .declared_size(component, member)?
                .checked_mul(count as u64),
            Some(&Type::Matrix { column, count }) => {
                let rows = match self.ty(column) {
                    Some(&Type::Vector { count, .. }) => count as u64,
                    _ => 1,
                };
                match member.matrix_stride {
                    Some(stride) if member.flags.contains(DecorationFlags::ROW_MAJOR) => {
                        Some(stride as u64 * rows)
                    }
                    Some(stride) => Some(stride as u64 * count as u64),
                    None => self
                        .declared_size(column, member)?
                        .checked_mul(count as u64),
                }
            }
            Some(&Type::Array { element, length }) => self
                .array_stride(ty, element, member)?
                .checked_mul(self.constant(length).unwrap_or(0)),
            Some(&Type::RuntimeArray { element }) => self.array_stride(ty, element, member),
            Some(Type::Struct { .. }) => self.struct_size(ty),
            _ => Some(0),
        }
    }

    fn array_stride(&self, array: Word, element: Word, member: &Decorations) -> Option<u64> {
        match self.decorations(array).array_stride {
            Some(stride) => Some(stride as u64),
            None => self.declared_size(element, member),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::module::{DecorationFlags, SpirvModule, Type};

    const FLOAT: u32 = 1;
    const VEC4: u32 = 2;
    const MAT4: u32 = 3;
    const UINT: u32 = 4;
    const FOUR: u32 = 5;

    fn module() -> SpirvModule {
        let mut module = SpirvModule::default();
        module.types.insert(FLOAT, Type::Float { width: 32 });
        module.types.insert(
            VEC4,
            Type::Vector {
                component: FLOAT,
                count: 4,
            },
        );
        module.types.insert(
            MAT4,
            Type::Matrix {
                column: VEC4,
                count: 4,
            },
        );
        module.types.insert(
            UINT,
            Type::Int {
                width: 32,
                signed: false,
            },
        );
        module.constants.insert(FOUR, 4);
        module
    }

    fn add_struct(module: &mut SpirvModule, id: u32, members: &[(u32, u32)]) {
        module.types.insert(
            id,
            Type::Struct {
                members: members.iter().map(|&(ty, _)| ty).collect(),
            },
        );
        for (index, &(_, offset)) in members.iter().enumerate() {
            module
                .member_decorations
                .entry((id, index as u32))
                .or_default()
                .offset = Some(offset);
        }
    }

    #[test]
    fn vec4_block() {
        let mut module = module();
        add_struct(&mut module, 10, &[(VEC4, 0)]);
        assert_eq!(module.declared_struct_size_runtime_array(10), 16);
    }

    #[test]
    fn last_member_offset_counts() {
        let mut module = module();
        add_struct(&mut module, 10, &[(VEC4, 0), (UINT, 16), (FLOAT, 20)]);
        assert_eq!(module.declared_struct_size_runtime_array(10), 24);
    }

    #[test]
    fn runtime_array_counts_one_element() {
        let mut module = module();
        module.types.insert(11, Type::RuntimeArray { element: VEC4 });
        module.decorations.entry(11).or_default().array_stride = Some(32);
        add_struct(&mut module, 10, &[(UINT, 0), (11, 16)]);
        assert_eq!(module.declared_struct_size_runtime_array(10), 48);
    }

    #[test]
    fn sized_arrays_use_stride() {
        let mut module = module();
        module.types.insert(
            11,
            Type::Array {
                element: FLOAT,
                length: FOUR,
            },
        );
        module.decorations.entry(11).or_default().array_stride = Some(16);
        add_struct(&mut module, 10, &[(11, 0)]);
        assert_eq!(module.declared_struct_size_runtime_array(10), 64);
    }

    #[test]
    fn matrices_use_matrix_stride() {
        let mut module = module();
        add_struct(&mut module, 10, &[(MAT4, 0)]);
        let member = module.member_decorations.entry((10, 0)).or_default();
        member.matrix_stride = Some(16);
        member.flags |= DecorationFlags::COL_MAJOR;
        assert_eq!(module.declared_struct_size_runtime_array(10), 64);
    }

    #[test]
    fn nested_structs() {
        let mut module = module();
        add_struct(&mut module, 10, &[(FLOAT, 0), (UINT, 4)]);
        add_struct(&mut module, 11, &[(VEC4, 0), (10, 16)]);
        assert_eq!(module.declared_struct_size_runtime_array(11), 24);
    }

    #[test]
    fn undecorated_nested_arrays_overflow() {
        let mut module = module();
        module.constants.insert(20, u32::MAX as u64);
        module.types.insert(
            11,
            Type::Array {
                element: FLOAT,
                length: 20,
            },
        );
        module.types.insert(
            12,
            Type::Array {
                element: 11,
                length: 20,
            },
        );
        add_struct(&mut module, 10, &[(12, 0)]);
        assert_eq!(module.struct_size(10), None);
        assert_eq!(module.declared_struct_size_runtime_array(10), u64::MAX);
    }

    #[test]
    fn wide_length_constants_overflow() {
        let mut module = module();
        module.constants.insert(20, u64::MAX / 2);
        module.types.insert(
            11,
            Type::Array {
                element: VEC4,
                length: 20,
            },
        );
        add_struct(&mut module, 10, &[(UINT, 0), (11, 16)]);
        assert_eq!(module.struct_size(10), None);
    }
}
