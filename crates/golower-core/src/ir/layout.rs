use super::{Type, TypeCache, TypeId};
use crate::error::{internal, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub size: u64,
    pub align: u64,
    pub field_offsets: Vec<u64>,
}

/// Sizes and alignments of IR types on the target.
pub trait MemoryModel {
    fn pointer_size(&self) -> u64;

    fn size_of(&self, types: &TypeCache, id: TypeId) -> Result<u64>;

    fn align_of(&self, types: &TypeCache, id: TypeId) -> Result<u64>;

    /// Rounding applied to every allocation handed out by the runtime.
    fn malloc_align(&self) -> u64 {
        2 * self.pointer_size()
    }

    fn big_endian(&self) -> bool {
        false
    }
}

/// Natural-alignment model of the host: LP64 unless told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostModel {
    pub pointer_size: u64,
}

impl HostModel {
    pub fn new(pointer_size: u64) -> Self {
        Self { pointer_size }
    }
}

impl Default for HostModel {
    fn default() -> Self {
        Self::new(std::mem::size_of::<usize>() as u64)
    }
}

impl MemoryModel for HostModel {
    fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    fn size_of(&self, types: &TypeCache, id: TypeId) -> Result<u64> {
        Ok(match types.get(id)? {
            Type::Int8 | Type::Uint8 => 1,
            Type::Int16 | Type::Uint16 => 2,
            Type::Int32 | Type::Uint32 | Type::Float32 => 4,
            Type::Int64 | Type::Uint64 | Type::Float64 | Type::Complex64 => 8,
            Type::Complex128 => 16,
            Type::Pointer(_) | Type::Function { .. } => self.pointer_size,
            Type::Array { item, items } => self
                .size_of(types, *item)?
                .checked_mul(*items)
                .ok_or_else(|| internal(format!("array type {id} overflows")))?,
            Type::Struct { fields } => struct_layout(self, types, fields)?.size,
            Type::Union { fields } => {
                let mut size = 0;
                for field in fields {
                    size = size.max(self.size_of(types, *field)?);
                }
                align_to(size, self.align_of(types, id)?)
            }
        })
    }

    fn align_of(&self, types: &TypeCache, id: TypeId) -> Result<u64> {
        Ok(match types.get(id)? {
            Type::Int8 | Type::Uint8 => 1,
            Type::Int16 | Type::Uint16 => 2,
            Type::Int32 | Type::Uint32 | Type::Float32 | Type::Complex64 => 4,
            Type::Int64 | Type::Uint64 | Type::Float64 | Type::Complex128 => 8,
            Type::Pointer(_) | Type::Function { .. } => self.pointer_size,
            Type::Array { item, .. } => self.align_of(types, *item)?,
            Type::Struct { fields } => struct_layout(self, types, fields)?.align,
            Type::Union { fields } => {
                let mut align = 1;
                for field in fields {
                    align = align.max(self.align_of(types, *field)?);
                }
                align
            }
        })
    }
}

pub fn struct_layout<M: MemoryModel + ?Sized>(
    model: &M,
    types: &TypeCache,
    fields: &[TypeId],
) -> Result<StructLayout> {
    if fields.is_empty() {
        return Ok(StructLayout {
            size: 0,
            align: 1,
            field_offsets: Vec::new(),
        });
    }

    let mut offsets = Vec::with_capacity(fields.len());
    let mut offset = 0u64;
    let mut max_align = 1u64;

    for field in fields {
        let field_align = model.align_of(types, *field)?;
        max_align = max_align.max(field_align);
        offset = align_to(offset, field_align);
        offsets.push(offset);
        offset = offset.saturating_add(model.size_of(types, *field)?);
    }

    Ok(StructLayout {
        size: align_to(offset, max_align),
        align: max_align,
        field_offsets: offsets,
    })
}

pub fn align_to(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    let rem = value % alignment;
    if rem == 0 {
        value
    } else {
        value + (alignment - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_fields_are_naturally_aligned() {
        let mut types = TypeCache::new();
        let s = types.struct_of(vec![types.int8(), types.int64(), types.int8()]);
        let model = HostModel::new(8);
        let Type::Struct { fields } = types.get(s).unwrap().clone() else {
            unreachable!()
        };
        let layout = struct_layout(&model, &types, &fields).unwrap();
        assert_eq!(layout.field_offsets, vec![0, 8, 16]);
        assert_eq!(layout.size, 24);
        assert_eq!(model.size_of(&types, s).unwrap(), 24);
    }

    #[test]
    fn union_is_largest_member_rounded_to_alignment() {
        let mut types = TypeCache::new();
        let bytes = types.array_of(types.int8(), 5);
        let u = types.union_of(vec![types.int32(), bytes]);
        let model = HostModel::new(8);
        assert_eq!(model.size_of(&types, u).unwrap(), 8);
        assert_eq!(model.align_of(&types, u).unwrap(), 4);
    }

    #[test]
    fn pointer_width_follows_the_model() {
        let mut types = TypeCache::new();
        let p = types.pointer_to(types.int32());
        assert_eq!(HostModel::new(4).size_of(&types, p).unwrap(), 4);
        assert_eq!(HostModel::new(8).malloc_align(), 16);
        assert_eq!(align_to(17, 16), 32);
    }
}
