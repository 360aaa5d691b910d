//! IR type -> Go type text.

use std::collections::{HashMap, HashSet};

use golower_core::error::{unsupported, Result};
use golower_core::ir::{MemoryModel, Position, Type, TypeCache, TypeId, TypeKind};

/// Renders IR types as Go type expressions and sizes them through the
/// memory model. Both answers are cached per type id so every reference to a
/// type reuses byte-identical text.
pub struct TypeLowering<'a> {
    types: &'a TypeCache,
    model: &'a dyn MemoryModel,
    signatures: HashMap<TypeId, String>,
    sizes: HashMap<TypeId, u64>,
    in_progress: HashSet<TypeId>,
}

impl<'a> TypeLowering<'a> {
    pub fn new(types: &'a TypeCache, model: &'a dyn MemoryModel) -> Self {
        Self {
            types,
            model,
            signatures: HashMap::new(),
            sizes: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn types(&self) -> &'a TypeCache {
        self.types
    }

    pub fn model(&self) -> &'a dyn MemoryModel {
        self.model
    }

    pub fn kind(&self, id: TypeId) -> Result<TypeKind> {
        self.types.kind(id)
    }

    pub fn signature(&mut self, id: TypeId) -> Result<String> {
        if let Some(text) = self.signatures.get(&id) {
            return Ok(text.clone());
        }
        if !self.in_progress.insert(id) {
            return Err(unsupported(
                &Position::default(),
                format!("recursive type {id}"),
            ));
        }
        let rendered = self.render(id);
        self.in_progress.remove(&id);
        let text = rendered?;
        self.signatures.insert(id, text.clone());
        Ok(text)
    }

    pub fn size_of(&mut self, id: TypeId) -> Result<u64> {
        if let Some(size) = self.sizes.get(&id) {
            return Ok(*size);
        }
        let size = self.model.size_of(self.types, id)?;
        self.sizes.insert(id, size);
        Ok(size)
    }

    fn render(&mut self, id: TypeId) -> Result<String> {
        let types = self.types;
        Ok(match types.get(id)? {
            Type::Int8 => "int8".into(),
            Type::Uint8 => "uint8".into(),
            Type::Int16 => "int16".into(),
            Type::Uint16 => "uint16".into(),
            Type::Int32 => "int32".into(),
            Type::Uint32 => "uint32".into(),
            Type::Int64 => "int64".into(),
            Type::Uint64 => "uint64".into(),
            Type::Float32 => "float32".into(),
            Type::Float64 => "float64".into(),
            Type::Complex64 => "complex64".into(),
            Type::Complex128 => "complex128".into(),
            Type::Pointer(_) if types.is_void_pointer(id) => "uintptr".into(),
            Type::Pointer(element) => {
                let element = *element;
                let text = self.signature(element)?;
                if types.kind(element)? == TypeKind::Function {
                    text
                } else {
                    format!("*{text}")
                }
            }
            Type::Array { item, items } => {
                let (item, items) = (*item, *items);
                format!("[{items}]{}", self.signature(item)?)
            }
            Type::Struct { fields } => format!("struct{{{}}}", self.fields(fields)?),
            Type::Union { fields } => {
                let shadow = self.fields(fields)?;
                let size = self.size_of(id)?;
                format!("struct{{_ [0]struct{{{shadow}}}; U [{size}]byte}}")
            }
            Type::Function {
                arguments,
                results,
                variadic,
            } => {
                let mut params = Vec::with_capacity(arguments.len() + 1);
                for argument in arguments {
                    params.push(self.signature(*argument)?);
                }
                if *variadic {
                    params.push("...interface{}".to_string());
                }
                let mut text = format!("func({})", params.join(", "));
                match results.as_slice() {
                    [] => {}
                    [result] => {
                        text.push(' ');
                        text.push_str(&self.signature(*result)?);
                    }
                    _ => {
                        return Err(unsupported(
                            &Position::default(),
                            format!("function type {id} declares {} results", results.len()),
                        ))
                    }
                }
                text
            }
        })
    }

    fn fields(&mut self, fields: &[TypeId]) -> Result<String> {
        let mut parts = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            parts.push(format!("X{index} {}", self.signature(*field)?));
        }
        Ok(parts.join("; "))
    }
}
