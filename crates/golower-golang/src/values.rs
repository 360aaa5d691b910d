//! Initializer values -> Go expression text.

use golower_core::error::{unsupported, Result};
use golower_core::ir::{
    is_zero_value, NameId, Object, Position, StringId, Type, TypeId, TypeKind, Value,
};
use golower_core::{bail_internal, bail_unsupported};

use crate::expr::{float32_text, float64_text};
use crate::generator::Generator;
use crate::helpers::wrap_integer;

impl Generator<'_, '_> {
    /// Pointer into the string pool, typed as `ty`.
    pub(crate) fn string_pointer(
        &mut self,
        ty: TypeId,
        id: StringId,
        offset: i64,
        pos: &Position,
    ) -> Result<String> {
        let base = self.strings.offset(self.dict, id)? as i64;
        let text = format!("str({})", base + offset);
        if self.is_void_pointer(ty) {
            return Ok(format!("uintptr(unsafe.Pointer({text}))"));
        }
        let types = self.types;
        match types.get(ty)? {
            Type::Pointer(element) if *element == types.int8() => Ok(text),
            Type::Pointer(_) if !types.is_function_pointer(ty)? => {
                Ok(format!("({})(unsafe.Pointer({text}))", self.signature(ty)?))
            }
            _ => Err(unsupported(
                pos,
                format!("string literal as {}", self.signature(ty)?),
            )),
        }
    }

    /// Go expression of type `ty` holding `value`.
    pub(crate) fn value(&mut self, ty: TypeId, value: &Value, pos: &Position) -> Result<String> {
        let types = self.types;
        let kind = types.kind(ty)?;
        match value {
            Value::Int32(v) => self.scalar(ty, kind, *v as i64, pos),
            Value::Int64(v) => self.scalar(ty, kind, *v, pos),
            Value::Float32(v) => self.float(ty, kind, *v as f64, Some(*v), pos),
            Value::Float64(v) => self.float(ty, kind, *v, None, pos),
            Value::Complex64 { re, im } if kind == TypeKind::Complex64 => Ok(format!(
                "complex({}, {})",
                float32_text(*re),
                float32_text(*im)
            )),
            Value::Complex128 { re, im } if kind == TypeKind::Complex128 => Ok(format!(
                "complex({}, {})",
                float64_text(*re),
                float64_text(*im)
            )),
            Value::Complex64 { .. } | Value::Complex128 { .. } => {
                bail_unsupported!(pos, "complex value as {}", self.signature(ty)?)
            }
            Value::String { id, offset } => match types.get(ty)? {
                Type::Array { item, items } if is_narrow(types.kind(*item)?) => {
                    let (item, items) = (*item, *items);
                    let bytes = self.dict.string_bytes(*id)?;
                    let skip = match usize::try_from(*offset) {
                        Ok(skip) => skip,
                        Err(_) => bail_unsupported!(pos, "string initializer at offset {offset}"),
                    };
                    let item_kind = types.kind(item)?;
                    let elements: Vec<String> = bytes
                        .iter()
                        .skip(skip)
                        .take(items as usize)
                        .filter_map(|byte| wrap_integer(item_kind, *byte as i64))
                        .map(|byte| byte.to_string())
                        .collect();
                    Ok(format!("{}{{{}}}", self.signature(ty)?, elements.join(", ")))
                }
                _ => self.string_pointer(ty, *id, *offset, pos),
            },
            Value::Address {
                index,
                name,
                linkage,
                offset,
            } => self.address(ty, *index, *name, linkage.is_external(), *offset, pos),
            Value::Composite(values) => self.composite(ty, values, pos),
        }
    }

    fn scalar(&mut self, ty: TypeId, kind: TypeKind, value: i64, pos: &Position) -> Result<String> {
        match kind {
            TypeKind::Pointer => self.integer_pointer(ty, value, pos),
            TypeKind::Float32 => Ok(float32_text(value as f32)),
            TypeKind::Float64 => Ok(float64_text(value as f64)),
            TypeKind::Complex64 => Ok(format!("complex({}, 0)", float32_text(value as f32))),
            TypeKind::Complex128 => Ok(format!("complex({}, 0)", float64_text(value as f64))),
            kind => self.integer(ty, kind, value, pos),
        }
    }

    fn float(
        &mut self,
        ty: TypeId,
        kind: TypeKind,
        value: f64,
        narrow: Option<f32>,
        pos: &Position,
    ) -> Result<String> {
        let as_f32 = narrow.unwrap_or(value as f32);
        match kind {
            TypeKind::Float32 => Ok(float32_text(as_f32)),
            TypeKind::Float64 => Ok(float64_text(value)),
            TypeKind::Complex64 => Ok(format!("complex({}, 0)", float32_text(as_f32))),
            TypeKind::Complex128 => Ok(format!("complex({}, 0)", float64_text(value))),
            kind if kind.is_integer() && value.is_finite() => {
                self.integer(ty, kind, value.trunc() as i64, pos)
            }
            _ => bail_unsupported!(pos, "float value as {}", self.signature(ty)?),
        }
    }

    fn address(
        &mut self,
        ty: TypeId,
        index: usize,
        name: NameId,
        exported: bool,
        offset: i64,
        pos: &Position,
    ) -> Result<String> {
        let object = self.object(index)?;
        let mut nm = self.mangler.mangle(self.dict, name, exported, None)?;
        if let Some(qualifier) = self.builtin(index)? {
            if !qualifier.is_empty() {
                nm = format!("{qualifier}.{nm}");
            }
        }

        if let Object::Function(_) = object {
            if offset != 0 || !self.types.is_function_pointer(ty)? {
                bail_unsupported!(pos, "function address as {}", self.signature(ty)?);
            }
            return Ok(nm);
        }

        let reference = format!("&{nm}");
        let shifted = |reference: &str| match offset {
            0 => format!("uintptr(unsafe.Pointer({reference}))"),
            o if o < 0 => format!("uintptr(unsafe.Pointer({reference})) - {}", -(o as i128)),
            o => format!("uintptr(unsafe.Pointer({reference})) + {o}"),
        };
        if self.is_void_pointer(ty) {
            return Ok(shifted(&reference));
        }
        if !self.is_data_pointer(ty)? {
            bail_unsupported!(pos, "address value as {}", self.signature(ty)?);
        }
        let t = self.signature(ty)?;
        if offset != 0 {
            return Ok(format!("({t})(unsafe.Pointer({}))", shifted(&reference)));
        }
        let natural = self.types.lookup(&Type::Pointer(object.type_id()));
        if natural == Some(ty) {
            Ok(reference)
        } else {
            Ok(format!("({t})(unsafe.Pointer({reference}))"))
        }
    }

    fn composite(&mut self, ty: TypeId, values: &[Option<Value>], pos: &Position) -> Result<String> {
        let types = self.types;
        let t = self.signature(ty)?;
        let mut parts = Vec::new();
        match types.get(ty)? {
            Type::Array { item, items } => {
                if values.len() as u64 > *items {
                    bail_internal!("{} initializers for {t}", values.len());
                }
                for (i, value) in values.iter().enumerate() {
                    if let Some(value) = value.as_ref().filter(|v| !v.is_zero()) {
                        parts.push(format!("{i}: {}", self.value(*item, value, pos)?));
                    }
                }
            }
            Type::Struct { fields } => {
                if values.len() > fields.len() {
                    bail_internal!("{} initializers for {t}", values.len());
                }
                for (i, value) in values.iter().enumerate() {
                    if let Some(value) = value.as_ref().filter(|v| !v.is_zero()) {
                        parts.push(format!("X{i}: {}", self.value(fields[i], value, pos)?));
                    }
                }
            }
            Type::Union { fields } => {
                if values.iter().all(|v| is_zero_value(v.as_ref())) {
                    return Ok(format!("{t}{{}}"));
                }
                let member = values.iter().position(|v| !is_zero_value(v.as_ref()));
                let (member, value) = match member.and_then(|i| Some((i, values[i].as_ref()?))) {
                    Some(found) => found,
                    None => bail_internal!("union initializer without a member"),
                };
                let field = match fields.get(member) {
                    Some(field) => *field,
                    None => bail_internal!("union {t} has no member {member}"),
                };
                let size = self.lowering.size_of(ty)? as usize;
                let bytes = self.union_bytes(field, value, size, pos)?;
                let bytes: Vec<String> = bytes.iter().map(u8::to_string).collect();
                return Ok(format!("{t}{{U: [{size}]byte{{{}}}}}", bytes.join(", ")));
            }
            _ => bail_unsupported!(pos, "aggregate initializer for {t}"),
        }
        Ok(format!("{t}{{{}}}", parts.join(", ")))
    }

    /// Raw bytes of a scalar union member, in target byte order.
    fn union_bytes(
        &mut self,
        field: TypeId,
        value: &Value,
        size: usize,
        pos: &Position,
    ) -> Result<Vec<u8>> {
        let kind = self.kind(field)?;
        let width = self.lowering.size_of(field)? as usize;
        let raw: u64 = match (kind, value) {
            (TypeKind::Float32, Value::Float32(v)) => v.to_bits() as u64,
            (TypeKind::Float32, Value::Float64(v)) => (*v as f32).to_bits() as u64,
            (TypeKind::Float64, Value::Float64(v)) => v.to_bits(),
            (TypeKind::Float64, Value::Float32(v)) => (*v as f64).to_bits(),
            (k, Value::Int32(v)) if k.is_integer() => *v as i64 as u64,
            (k, Value::Int64(v)) if k.is_integer() => *v as u64,
            (TypeKind::Pointer, Value::Int32(0) | Value::Int64(0)) => 0,
            _ => bail_unsupported!(pos, "union initializer through a {kind:?} member"),
        };
        if width > 8 || width > size {
            bail_unsupported!(pos, "union member of {width} bytes");
        }
        let mut bytes = vec![0u8; size];
        if self.lowering.model().big_endian() {
            bytes[..width].copy_from_slice(&raw.to_be_bytes()[8 - width..]);
        } else {
            bytes[..width].copy_from_slice(&raw.to_le_bytes()[..width]);
        }
        Ok(bytes)
    }
}

fn is_narrow(kind: TypeKind) -> bool {
    matches!(kind, TypeKind::Int8 | TypeKind::Uint8)
}
