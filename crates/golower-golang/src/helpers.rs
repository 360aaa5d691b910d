//! Runtime helpers emitted once per (operation, type) pair.

use std::collections::BTreeSet;

use itertools::Itertools;

use golower_core::error::Result;
use golower_core::ir::{TypeId, TypeKind};

use crate::types::TypeLowering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HelperKind {
    Copy,
    PostIncrement,
    PreIncrement,
    StoreBits,
    Store,
}

impl HelperKind {
    pub const ALL: [HelperKind; 5] = [
        HelperKind::Copy,
        HelperKind::PostIncrement,
        HelperKind::PreIncrement,
        HelperKind::StoreBits,
        HelperKind::Store,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            HelperKind::Copy => "copy",
            HelperKind::PostIncrement => "postInc",
            HelperKind::PreIncrement => "preInc",
            HelperKind::StoreBits => "storebits",
            HelperKind::Store => "store",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

pub fn helper_name(kind: HelperKind, id: TypeId) -> String {
    format!("{}_{}", kind.prefix(), id.0)
}

pub const BOOL2INT: &str = "func bool2int(b bool) int32 { if b { return 1 }; return 0 }";

/// Types each helper family has been requested for. Only grows.
#[derive(Debug, Default)]
pub struct HelperSet {
    needs: [BTreeSet<TypeId>; 5],
}

impl HelperSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a need and return the helper's name.
    pub fn require(&mut self, kind: HelperKind, id: TypeId) -> String {
        self.needs[kind.index()].insert(id);
        helper_name(kind, id)
    }

    pub fn needs(&self, kind: HelperKind) -> &BTreeSet<TypeId> {
        &self.needs[kind.index()]
    }

    pub fn len(&self) -> usize {
        self.needs.iter().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Helper definitions, family by family, each family sorted by the Go
    /// text of its type.
    pub fn render(&self, lowering: &mut TypeLowering<'_>) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(self.len());
        for kind in HelperKind::ALL {
            let mut entries = Vec::with_capacity(self.needs(kind).len());
            for id in self.needs(kind) {
                entries.push((lowering.signature(*id)?, *id));
            }
            for (signature, id) in entries.into_iter().sorted() {
                let pointer = lowering.kind(id)? == TypeKind::Pointer
                    && !lowering.types().is_void_pointer(id);
                out.push(definition(kind, id, &signature, pointer));
            }
        }
        Ok(out)
    }
}

fn definition(kind: HelperKind, id: TypeId, t: &str, pointer: bool) -> String {
    let name = helper_name(kind, id);
    match (kind, pointer) {
        (HelperKind::Copy, _) => {
            format!("func {name}(d, s *{t}) *{t} {{ *d = *s; return d }}")
        }
        (HelperKind::PostIncrement, true) => format!(
            "func {name}(p *{t}, d int) {t} {{ q := (*uintptr)(unsafe.Pointer(p)); v := *q; *q += uintptr(d); return ({t})(unsafe.Pointer(v)) }}"
        ),
        (HelperKind::PostIncrement, false) => {
            format!("func {name}(p *{t}, d {t}) {t} {{ v := *p; *p += d; return v }}")
        }
        (HelperKind::PreIncrement, true) => format!(
            "func {name}(p *{t}, d int) {t} {{ q := (*uintptr)(unsafe.Pointer(p)); v := *q + uintptr(d); *q = v; return ({t})(unsafe.Pointer(v)) }}"
        ),
        (HelperKind::PreIncrement, false) => {
            format!("func {name}(p *{t}, d {t}) {t} {{ v := *p + d; *p = v; return v }}")
        }
        (HelperKind::StoreBits, _) => format!(
            "func {name}(p *{t}, v, m {t}, l, r uint) {t} {{ *p = *p&^m | v&m; return (v & m) << l >> r }}"
        ),
        (HelperKind::Store, _) => {
            format!("func {name}(p *{t}, v {t}) {t} {{ *p = v; return v }}")
        }
    }
}

/// Mask selecting `bits` bits at `offset`, as a Go constant of the field's
/// integer kind.
pub fn bitfield_mask(kind: TypeKind, bits: u32, offset: u32) -> Option<i128> {
    let width = kind.integer_bits()?;
    if bits == 0 || bits + offset > width {
        return None;
    }
    let field = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let mask = field << offset;
    wrap_integer(kind, mask as i64)
}

/// Shift counts `(l, r)` that move a field to the top of its word and back,
/// extending the sign for signed kinds.
pub fn bitfield_shifts(kind: TypeKind, bits: u32, offset: u32) -> Option<(u32, u32)> {
    let width = kind.integer_bits()?;
    if bits == 0 || bits + offset > width {
        return None;
    }
    Some((width - offset - bits, width - bits))
}

/// `value` truncated to the width of an integer kind and reinterpreted with
/// its signedness.
pub fn wrap_integer(kind: TypeKind, value: i64) -> Option<i128> {
    Some(match kind {
        TypeKind::Int8 => value as i8 as i128,
        TypeKind::Uint8 => value as u8 as i128,
        TypeKind::Int16 => value as i16 as i128,
        TypeKind::Uint16 => value as u16 as i128,
        TypeKind::Int32 => value as i32 as i128,
        TypeKind::Uint32 => value as u32 as i128,
        TypeKind::Int64 => value as i128,
        TypeKind::Uint64 => value as u64 as i128,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use golower_core::ir::{HostModel, TypeCache};
    use pretty_assertions::assert_eq;

    #[test]
    fn one_definition_per_kind_and_type() {
        let mut types = TypeCache::new();
        let p = types.pointer_to(types.int8());
        let model = HostModel::new(8);
        let mut lowering = TypeLowering::new(&types, &model);
        let mut helpers = HelperSet::new();
        for _ in 0..3 {
            helpers.require(HelperKind::Store, types.int32());
        }
        helpers.require(HelperKind::PostIncrement, p);
        helpers.require(HelperKind::PostIncrement, types.uint8());
        assert_eq!(helpers.len(), 3);

        let rendered = helpers.render(&mut lowering).unwrap();
        assert_eq!(rendered.len(), 3);
        let p_name = helper_name(HelperKind::PostIncrement, p);
        assert!(rendered[0].starts_with(&format!("func {p_name}(p **int8, d int) *int8")));
        assert_eq!(
            rendered[1],
            "func postInc_1(p *uint8, d uint8) uint8 { v := *p; *p += d; return v }"
        );
        assert_eq!(
            rendered[2],
            "func store_4(p *int32, v int32) int32 { *p = v; return v }"
        );
    }

    #[test]
    fn families_are_sorted_by_go_type() {
        let types = TypeCache::new();
        let model = HostModel::new(8);
        let mut lowering = TypeLowering::new(&types, &model);
        let mut helpers = HelperSet::new();
        helpers.require(HelperKind::Copy, types.uint64());
        helpers.require(HelperKind::Copy, types.float32());
        helpers.require(HelperKind::Copy, types.int8());
        let rendered = helpers.render(&mut lowering).unwrap();
        let order: Vec<&str> = rendered
            .iter()
            .map(|line| line.split('(').next().unwrap_or_default())
            .collect();
        assert_eq!(
            order,
            vec!["func copy_8", "func copy_0", "func copy_7"],
            "float32 < int8 < uint64"
        );
    }

    #[test]
    fn masks_wrap_to_the_field_type() {
        assert_eq!(bitfield_mask(TypeKind::Uint32, 3, 4), Some(0x70));
        assert_eq!(bitfield_mask(TypeKind::Int32, 16, 16), Some(-65536));
        assert_eq!(bitfield_mask(TypeKind::Uint8, 8, 0), Some(255));
        assert_eq!(bitfield_mask(TypeKind::Int8, 4, 6), None);
        assert_eq!(bitfield_mask(TypeKind::Float32, 1, 0), None);
    }

    /// Evaluates the emitted read-modify-write on a 32-bit word.
    fn store_bits(word: u32, value: u32, bits: u32, offset: u32) -> u32 {
        let mask = bitfield_mask(TypeKind::Uint32, bits, offset).unwrap() as u32;
        let shifted = value.wrapping_shl(offset);
        (word & !mask) | (shifted & mask)
    }

    #[test]
    fn storebits_returns_the_field_in_its_own_signedness() {
        let types = TypeCache::new();
        let model = HostModel::new(8);
        let mut lowering = TypeLowering::new(&types, &model);
        let mut helpers = HelperSet::new();
        helpers.require(HelperKind::StoreBits, types.int32());
        assert_eq!(
            helpers.render(&mut lowering).unwrap(),
            vec![
                "func storebits_4(p *int32, v, m int32, l, r uint) int32 { *p = *p&^m | v&m; return (v & m) << l >> r }"
            ]
        );

        // -1 into a signed 3-bit field at bit 0 reads back as -1.
        let (l, r) = bitfield_shifts(TypeKind::Int32, 3, 0).unwrap();
        let m = bitfield_mask(TypeKind::Int32, 3, 0).unwrap() as i32;
        assert_eq!((l, r), (29, 29));
        assert_eq!(((-1i32 & m) << l) >> r, -1);

        // 5 into a signed 3-bit field at bit 4 reads back as -3.
        let (l, r) = bitfield_shifts(TypeKind::Int32, 3, 4).unwrap();
        let m = bitfield_mask(TypeKind::Int32, 3, 4).unwrap() as i32;
        assert_eq!((((5i32 << 4) & m) << l) >> r, -3);

        // The same bits in an unsigned field read back as 5.
        let (l, r) = bitfield_shifts(TypeKind::Uint32, 3, 4).unwrap();
        let m = bitfield_mask(TypeKind::Uint32, 3, 4).unwrap() as u32;
        assert_eq!((l, r), (25, 29));
        assert_eq!((((5u32 << 4) & m) << l) >> r, 5);

        assert_eq!(bitfield_shifts(TypeKind::Uint8, 8, 0), Some((0, 0)));
        assert_eq!(bitfield_shifts(TypeKind::Int8, 4, 6), None);
    }

    #[test]
    fn bitfield_store_preserves_neighbouring_bits() {
        let samples = [0u32, 0xffff_ffff, 0xdead_beef, 0x1234_5678];
        for word in samples {
            for (bits, offset) in [(1, 0), (3, 4), (7, 25), (16, 16), (32, 0)] {
                for value in [0u32, 1, 5, 0xffff_ffff, 0x0bad_cafe] {
                    let stored = store_bits(word, value, bits, offset);
                    let field = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
                    let outside = !(field << offset);
                    assert_eq!(stored & outside, word & outside);
                    assert_eq!((stored >> offset) & field, value & field);
                }
            }
        }
    }
}
