use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{internal, Result};

#[derive(
    Debug, Display, From, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Pointer(TypeId),
    Array {
        item: TypeId,
        items: u64,
    },
    Struct {
        fields: Vec<TypeId>,
    },
    Union {
        fields: Vec<TypeId>,
    },
    Function {
        arguments: Vec<TypeId>,
        results: Vec<TypeId>,
        variadic: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Pointer,
    Array,
    Struct,
    Union,
    Function,
}

impl Type {
    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Int8 => TypeKind::Int8,
            Type::Uint8 => TypeKind::Uint8,
            Type::Int16 => TypeKind::Int16,
            Type::Uint16 => TypeKind::Uint16,
            Type::Int32 => TypeKind::Int32,
            Type::Uint32 => TypeKind::Uint32,
            Type::Int64 => TypeKind::Int64,
            Type::Uint64 => TypeKind::Uint64,
            Type::Float32 => TypeKind::Float32,
            Type::Float64 => TypeKind::Float64,
            Type::Complex64 => TypeKind::Complex64,
            Type::Complex128 => TypeKind::Complex128,
            Type::Pointer(_) => TypeKind::Pointer,
            Type::Array { .. } => TypeKind::Array,
            Type::Struct { .. } => TypeKind::Struct,
            Type::Union { .. } => TypeKind::Union,
            Type::Function { .. } => TypeKind::Function,
        }
    }
}

impl TypeKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeKind::Int8
                | TypeKind::Uint8
                | TypeKind::Int16
                | TypeKind::Uint16
                | TypeKind::Int32
                | TypeKind::Uint32
                | TypeKind::Int64
                | TypeKind::Uint64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 | TypeKind::Int64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeKind::Float32 | TypeKind::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, TypeKind::Complex64 | TypeKind::Complex128)
    }

    pub fn is_scalar(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    /// Width in bits of integer kinds.
    pub fn integer_bits(self) -> Option<u32> {
        match self {
            TypeKind::Int8 | TypeKind::Uint8 => Some(8),
            TypeKind::Int16 | TypeKind::Uint16 => Some(16),
            TypeKind::Int32 | TypeKind::Uint32 => Some(32),
            TypeKind::Int64 | TypeKind::Uint64 => Some(64),
            _ => None,
        }
    }
}

const PREDEFINED: [Type; 12] = [
    Type::Int8,
    Type::Uint8,
    Type::Int16,
    Type::Uint16,
    Type::Int32,
    Type::Uint32,
    Type::Int64,
    Type::Uint64,
    Type::Float32,
    Type::Float64,
    Type::Complex64,
    Type::Complex128,
];

/// Index of `struct{}` and of the void pointer `*struct{}`, interned right
/// after the scalars.
const EMPTY_STRUCT: u32 = PREDEFINED.len() as u32;
const VOID_POINTER: u32 = EMPTY_STRUCT + 1;

/// Interning arena for IR types. Structurally equal types always share one id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Type>", into = "Vec<Type>")]
pub struct TypeCache {
    types: Vec<Type>,
    index: HashMap<Type, TypeId>,
}

impl TypeCache {
    pub fn new() -> Self {
        let mut cache = Self {
            types: Vec::new(),
            index: HashMap::new(),
        };
        for ty in PREDEFINED {
            cache.intern(ty);
        }
        cache.intern(Type::Struct { fields: Vec::new() });
        cache.intern(Type::Pointer(TypeId(EMPTY_STRUCT)));
        cache
    }

    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(id) = self.index.get(&ty) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.index.insert(ty, id);
        id
    }

    pub fn get(&self, id: TypeId) -> Result<&Type> {
        self.types
            .get(id.0 as usize)
            .ok_or_else(|| internal(format!("unknown type id {id}")))
    }

    pub fn kind(&self, id: TypeId) -> Result<TypeKind> {
        self.get(id).map(Type::kind)
    }

    pub fn lookup(&self, ty: &Type) -> Option<TypeId> {
        self.index.get(ty).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn int8(&self) -> TypeId {
        TypeId(0)
    }

    pub fn uint8(&self) -> TypeId {
        TypeId(1)
    }

    pub fn int32(&self) -> TypeId {
        TypeId(4)
    }

    pub fn uint32(&self) -> TypeId {
        TypeId(5)
    }

    pub fn int64(&self) -> TypeId {
        TypeId(6)
    }

    pub fn uint64(&self) -> TypeId {
        TypeId(7)
    }

    pub fn float32(&self) -> TypeId {
        TypeId(8)
    }

    pub fn float64(&self) -> TypeId {
        TypeId(9)
    }

    pub fn complex64(&self) -> TypeId {
        TypeId(10)
    }

    pub fn complex128(&self) -> TypeId {
        TypeId(11)
    }

    pub fn void_pointer(&self) -> TypeId {
        TypeId(VOID_POINTER)
    }

    pub fn is_void_pointer(&self, id: TypeId) -> bool {
        id.0 == VOID_POINTER
    }

    pub fn pointer_to(&mut self, element: TypeId) -> TypeId {
        self.intern(Type::Pointer(element))
    }

    pub fn array_of(&mut self, item: TypeId, items: u64) -> TypeId {
        self.intern(Type::Array { item, items })
    }

    pub fn struct_of(&mut self, fields: Vec<TypeId>) -> TypeId {
        self.intern(Type::Struct { fields })
    }

    pub fn union_of(&mut self, fields: Vec<TypeId>) -> TypeId {
        self.intern(Type::Union { fields })
    }

    pub fn function(&mut self, arguments: Vec<TypeId>, results: Vec<TypeId>, variadic: bool) -> TypeId {
        self.intern(Type::Function {
            arguments,
            results,
            variadic,
        })
    }

    /// Pointee of a pointer type.
    pub fn element(&self, id: TypeId) -> Result<TypeId> {
        match self.get(id)? {
            Type::Pointer(element) => Ok(*element),
            other => Err(internal(format!(
                "type {id} is not a pointer: {other:?}"
            ))),
        }
    }

    pub fn is_pointer(&self, id: TypeId) -> Result<bool> {
        Ok(self.kind(id)? == TypeKind::Pointer)
    }

    /// True for pointers whose pointee is a function type.
    pub fn is_function_pointer(&self, id: TypeId) -> Result<bool> {
        match self.get(id)? {
            Type::Pointer(element) => Ok(self.kind(*element)? == TypeKind::Function),
            _ => Ok(false),
        }
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Type>> for TypeCache {
    type Error = String;

    fn try_from(types: Vec<Type>) -> std::result::Result<Self, Self::Error> {
        let mut cache = TypeCache::new();
        for (position, ty) in types.into_iter().enumerate() {
            let id = cache.intern(ty);
            if id.0 as usize != position {
                return Err(format!(
                    "type list entry {position} duplicates type {id} or breaks the predefined prefix"
                ));
            }
        }
        for ty in &cache.types {
            let refs: Vec<TypeId> = match ty {
                Type::Pointer(element) => vec![*element],
                Type::Array { item, .. } => vec![*item],
                Type::Struct { fields } | Type::Union { fields } => fields.clone(),
                Type::Function {
                    arguments, results, ..
                } => arguments.iter().chain(results).copied().collect(),
                _ => Vec::new(),
            };
            if let Some(bad) = refs.iter().find(|id| id.0 as usize >= cache.types.len()) {
                return Err(format!("type {ty:?} references unknown type {bad}"));
            }
        }
        Ok(cache)
    }
}

impl From<TypeCache> for Vec<Type> {
    fn from(cache: TypeCache) -> Self {
        cache.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structurally_equal_types_share_an_id() {
        let mut types = TypeCache::new();
        let a = types.struct_of(vec![types.int32(), types.float64()]);
        let b = types.struct_of(vec![types.int32(), types.float64()]);
        let c = types.union_of(vec![types.int32(), types.float64()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn predefined_ids_are_fixed() {
        let types = TypeCache::new();
        assert_eq!(types.get(types.int32()).unwrap(), &Type::Int32);
        assert_eq!(types.get(types.complex128()).unwrap(), &Type::Complex128);
        assert!(types.is_void_pointer(types.void_pointer()));
        let element = types.element(types.void_pointer()).unwrap();
        assert_eq!(types.get(element).unwrap(), &Type::Struct { fields: vec![] });
    }

    #[test]
    fn serde_round_trip_rebuilds_the_index() {
        let mut types = TypeCache::new();
        let ptr = types.pointer_to(types.int8());
        let json = serde_json::to_string(&types).unwrap();
        let loaded: TypeCache = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.lookup(&Type::Pointer(loaded.int8())), Some(ptr));
    }

    #[test]
    fn loading_rejects_dangling_references() {
        let mut list: Vec<Type> = TypeCache::new().into();
        list.push(Type::Pointer(TypeId(999)));
        assert!(TypeCache::try_from(list).is_err());
    }
}
