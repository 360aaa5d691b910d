//! The architecture-neutral IR consumed by the backends.
//!
//! A translation unit is a dense list of [`Object`]s plus the [`TypeCache`]
//! their type ids point into. Objects reference each other only by index into
//! that list. Function bodies are stack-machine op lists: operand ops push one
//! value, operators pop their operands and push their result, and control
//! transfers require an empty evaluation stack except for the expression-level
//! jumps that implement `&&`, `||` and `?:`.

pub mod dict;
pub mod layout;
pub mod ty;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use dict::{Dict, NameId, StringId};
pub use layout::{HostModel, MemoryModel, StructLayout};
pub use ty::{Type, TypeCache, TypeId, TypeKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(filename: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }

    /// Same position with the directory part of the file name stripped.
    pub fn short(&self) -> Position {
        let filename = Path::new(&self.filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone());
        Position {
            filename,
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.filename, self.line, self.column)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    #[default]
    Internal,
    External,
}

impl Linkage {
    pub fn is_external(self) -> bool {
        self == Linkage::External
    }
}

/// Jump target: compiler-generated labels are numbered, source labels named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Number(i32),
    Named(NameId),
}

/// What a `Label` op terminates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelKind {
    /// A statement-level jump target.
    #[default]
    Plain,
    /// End of `a && b`; opened by a logical `Jz`.
    LogicalAnd,
    /// End of `a || b`; opened by a logical `Jnz`.
    LogicalOr,
    /// Start of the `else` arm of `c ? a : b`.
    CondElse,
    /// End of `c ? a : b`.
    Cond,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Address of the object at `index`, plus a byte offset.
    Address {
        index: usize,
        name: NameId,
        linkage: Linkage,
        offset: i64,
    },
    /// Aggregate initializer; `None` entries are zero.
    Composite(Vec<Option<Value>>),
    Complex64 { re: f32, im: f32 },
    Complex128 { re: f64, im: f64 },
    Float32(f32),
    Float64(f64),
    Int32(i32),
    Int64(i64),
    String { id: StringId, offset: i64 },
}

impl Value {
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Address { .. } | Value::String { .. } => false,
            Value::Composite(values) => values.iter().all(|v| is_zero_value(v.as_ref())),
            Value::Complex64 { re, im } => re.to_bits() == 0 && im.to_bits() == 0,
            Value::Complex128 { re, im } => re.to_bits() == 0 && im.to_bits() == 0,
            Value::Float32(v) => v.to_bits() == 0,
            Value::Float64(v) => v.to_bits() == 0,
            Value::Int32(v) => *v == 0,
            Value::Int64(v) => *v == 0,
        }
    }
}

/// Absent initializers are zero too.
pub fn is_zero_value(value: Option<&Value>) -> bool {
    value.map_or(true, Value::is_zero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Lsh,
    Rsh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Cpl,
    /// Logical not; yields int32 0/1.
    Not,
    /// Truth value of the operand; yields int32 0/1.
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub index: usize,
    pub name: NameId,
    pub type_id: TypeId,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    BeginScope,
    EndScope,
    VariableDeclaration(VariableDeclaration),
    /// Pushes the result slot of the call that follows.
    AllocResult {
        type_id: TypeId,
    },
    /// Marks the start of a call's operands.
    Arguments,
    Argument {
        index: usize,
        type_id: TypeId,
        address: bool,
    },
    Variable {
        index: usize,
        type_id: TypeId,
        address: bool,
    },
    Result {
        index: usize,
        type_id: TypeId,
        address: bool,
    },
    Global {
        index: usize,
        name: NameId,
        linkage: Linkage,
        type_id: TypeId,
        address: bool,
    },
    Const32 {
        type_id: TypeId,
        value: i32,
    },
    Const64 {
        type_id: TypeId,
        value: i64,
    },
    StringConst {
        type_id: TypeId,
        value: StringId,
    },
    Nil {
        type_id: TypeId,
    },
    Binary {
        op: BinaryOp,
        type_id: TypeId,
    },
    Compare {
        op: CompareOp,
        type_id: TypeId,
    },
    Unary {
        op: UnaryOp,
        type_id: TypeId,
    },
    Convert {
        type_id: TypeId,
        result: TypeId,
    },
    /// `type_id` is the pointer being loaded through.
    Load {
        type_id: TypeId,
    },
    /// `type_id` is the stored value's type; `bits != 0` marks a bit-field.
    Store {
        type_id: TypeId,
        bits: u32,
        bit_offset: u32,
    },
    Dup {
        type_id: TypeId,
    },
    Drop {
        type_id: TypeId,
    },
    /// Pops source and destination pointers, pushes the destination.
    Copy {
        type_id: TypeId,
    },
    /// `type_id` is the resulting element pointer type.
    Element {
        type_id: TypeId,
        index_type: TypeId,
        address: bool,
        neg: bool,
    },
    /// `type_id` is the resulting field pointer type.
    Field {
        type_id: TypeId,
        index: usize,
        address: bool,
    },
    PostIncrement {
        type_id: TypeId,
        delta: i64,
        bits: u32,
        bit_offset: u32,
    },
    PreIncrement {
        type_id: TypeId,
        delta: i64,
        bits: u32,
        bit_offset: u32,
    },
    PtrDiff {
        type_id: TypeId,
        ptr_type: TypeId,
    },
    /// `type_id` is the callee's function type.
    Call {
        index: usize,
        arguments: usize,
        type_id: TypeId,
    },
    /// `type_id` is the pointer-to-function type of the callee value.
    CallFp {
        arguments: usize,
        type_id: TypeId,
    },
    Jmp {
        label: Label,
        cond: bool,
    },
    Jz {
        label: Label,
        logical: bool,
    },
    Jnz {
        label: Label,
        logical: bool,
    },
    Label {
        label: Label,
        kind: LabelKind,
    },
    Switch {
        type_id: TypeId,
        cases: Vec<(Value, Label)>,
        default: Label,
    },
    Return,
    Panic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    pub kind: OpKind,
    #[serde(default)]
    pub position: Position,
}

impl Op {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            position: Position::default(),
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

impl From<OpKind> for Op {
    fn from(kind: OpKind) -> Self {
        Op::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: NameId,
    pub linkage: Linkage,
    pub type_id: TypeId,
    #[serde(default)]
    pub position: Position,
    pub arguments: Vec<NameId>,
    pub body: Vec<Op>,
}

impl FunctionDefinition {
    /// Functions implemented by the runtime are marked by a body holding a
    /// single `Panic`.
    pub fn is_builtin_stub(&self) -> bool {
        matches!(self.body.as_slice(), [op] if op.kind == OpKind::Panic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDefinition {
    pub name: NameId,
    pub linkage: Linkage,
    pub type_id: TypeId,
    #[serde(default)]
    pub position: Position,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    Function(FunctionDefinition),
    Data(DataDefinition),
}

impl Object {
    pub fn name(&self) -> NameId {
        match self {
            Object::Function(f) => f.name,
            Object::Data(d) => d.name,
        }
    }

    pub fn linkage(&self) -> Linkage {
        match self {
            Object::Function(f) => f.linkage,
            Object::Data(d) => d.linkage,
        }
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            Object::Function(f) => f.type_id,
            Object::Data(d) => d.type_id,
        }
    }

    pub fn position(&self) -> &Position {
        match self {
            Object::Function(f) => &f.position,
            Object::Data(d) => &d.position,
        }
    }
}

/// One unit of work for a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub types: TypeCache,
    pub objects: Vec<Object>,
}
