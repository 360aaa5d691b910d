//! Reconstruction of expression trees and labeled blocks from the flat op
//! stream of a function body.
//!
//! The lowering is goto based: every plain label starts a new block and every
//! transfer names its target symbolically, so forward references need no
//! second pass. Expression-level jumps (`&&`, `||`, `?:`) never leave the
//! evaluation stack and are folded back into expression nodes.

use golower_core::bail_unsupported;
use golower_core::error::{internal, unsupported, Result};
use golower_core::ir::{
    BinaryOp, CompareOp, Label, LabelKind, Linkage, NameId, Op, OpKind, Position, StringId, Type,
    TypeCache, TypeId, UnaryOp, Value,
};
use golower_core::tracing::trace;

const LOG_AREA: &str = "[golang-graph]";

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Type of the produced value; `None` for calls without a result.
    pub ty: Option<TypeId>,
    pub position: Position,
    /// Side effects evaluated, in program order, before this expression.
    pub comma: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Argument {
        index: usize,
        address: bool,
    },
    Variable {
        index: usize,
        address: bool,
    },
    Result {
        index: usize,
        address: bool,
    },
    Global {
        index: usize,
        name: NameId,
        linkage: Linkage,
        address: bool,
    },
    Const32(i32),
    Const64(i64),
    StringConst(StringId),
    Nil,
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        operand_type: TypeId,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand_type: TypeId,
        operand: Box<Expr>,
    },
    Convert {
        from: TypeId,
        operand: Box<Expr>,
    },
    Load {
        pointer_type: TypeId,
        pointer: Box<Expr>,
    },
    Store {
        bits: u32,
        bit_offset: u32,
        address: Box<Expr>,
        value: Box<Expr>,
    },
    Copy {
        type_id: TypeId,
        dst: Box<Expr>,
        src: Box<Expr>,
    },
    Element {
        address: bool,
        neg: bool,
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        index: usize,
        address: bool,
        base: Box<Expr>,
    },
    Increment {
        pre: bool,
        delta: i64,
        bits: u32,
        operand: Box<Expr>,
    },
    PtrDiff {
        ptr_type: TypeId,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        index: usize,
        function_type: TypeId,
        arguments: Vec<Expr>,
    },
    CallFp {
        pointer_type: TypeId,
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Logical {
        and: bool,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// An address evaluated once and reused by the store that consumes it.
    Dup(Box<Expr>),
    /// The reused address inside the stored value.
    DupRef,
}

impl Expr {
    fn new(kind: ExprKind, ty: Option<TypeId>, position: &Position) -> Self {
        Self {
            kind,
            ty,
            position: position.clone(),
            comma: Vec::new(),
        }
    }

    /// Type of a value-producing expression.
    pub fn value_type(&self) -> Result<TypeId> {
        self.ty
            .ok_or_else(|| unsupported(&self.position, "use of a call without a result"))
    }

    pub fn is_constant(&self) -> Option<i64> {
        if !self.comma.is_empty() {
            return None;
        }
        match self.kind {
            ExprKind::Const32(value) => Some(value as i64),
            ExprKind::Const64(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expr(Expr),
    /// Initializer of the local with this declaration index.
    Init { index: usize, position: Position },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exit {
    Fallthrough,
    Jump(Label),
    Branch {
        cond: Expr,
        target: Label,
        on_zero: bool,
    },
    Switch {
        value: Expr,
        type_id: TypeId,
        cases: Vec<(Value, Label)>,
        default: Label,
    },
    Return,
    Panic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: Option<Label>,
    pub statements: Vec<Statement>,
    pub exit: Exit,
}

impl Node {
    fn new(label: Option<Label>) -> Self {
        Self {
            label,
            statements: Vec::new(),
            exit: Exit::Fallthrough,
        }
    }

    fn is_empty(&self) -> bool {
        self.label.is_none() && self.statements.is_empty()
    }
}

enum Slot {
    Value(Expr),
    ResultSlot(TypeId),
    Arguments,
    /// Left operand of `&&`/`||`, or condition of `?:`, waiting for its label.
    Guard {
        cond: Expr,
        label: Label,
        on_zero: bool,
    },
    /// Condition and first arm of `?:`, waiting for the second arm.
    Then {
        cond: Expr,
        then: Expr,
        on_zero: bool,
        else_label: Label,
        end_label: Label,
    },
}

/// Splits `body` into blocks holding expression trees.
pub fn build(types: &TypeCache, body: &[Op]) -> Result<Vec<Node>> {
    let mut builder = GraphBuilder {
        types,
        stack: Vec::new(),
        pending: Vec::new(),
        nodes: Vec::new(),
        current: Node::new(None),
    };
    for op in body {
        builder.op(op)?;
    }
    builder.finish()
}

struct GraphBuilder<'a> {
    types: &'a TypeCache,
    stack: Vec<Slot>,
    pending: Vec<Expr>,
    nodes: Vec<Node>,
    current: Node,
}

impl<'a> GraphBuilder<'a> {
    fn op(&mut self, op: &Op) -> Result<()> {
        let pos = &op.position;
        match &op.kind {
            OpKind::BeginScope | OpKind::EndScope => {}
            OpKind::VariableDeclaration(declaration) => {
                if declaration.value.is_some() {
                    self.expect_statement_boundary(pos, "initialized declaration")?;
                    self.current.statements.push(Statement::Init {
                        index: declaration.index,
                        position: pos.clone(),
                    });
                }
            }
            OpKind::AllocResult { type_id } => self.stack.push(Slot::ResultSlot(*type_id)),
            OpKind::Arguments => self.stack.push(Slot::Arguments),
            OpKind::Argument {
                index,
                type_id,
                address,
            } => self.push_leaf(
                ExprKind::Argument {
                    index: *index,
                    address: *address,
                },
                *type_id,
                pos,
            ),
            OpKind::Variable {
                index,
                type_id,
                address,
            } => self.push_leaf(
                ExprKind::Variable {
                    index: *index,
                    address: *address,
                },
                *type_id,
                pos,
            ),
            OpKind::Result {
                index,
                type_id,
                address,
            } => self.push_leaf(
                ExprKind::Result {
                    index: *index,
                    address: *address,
                },
                *type_id,
                pos,
            ),
            OpKind::Global {
                index,
                name,
                linkage,
                type_id,
                address,
            } => self.push_leaf(
                ExprKind::Global {
                    index: *index,
                    name: *name,
                    linkage: *linkage,
                    address: *address,
                },
                *type_id,
                pos,
            ),
            OpKind::Const32 { type_id, value } => {
                self.push_leaf(ExprKind::Const32(*value), *type_id, pos)
            }
            OpKind::Const64 { type_id, value } => {
                self.push_leaf(ExprKind::Const64(*value), *type_id, pos)
            }
            OpKind::StringConst { type_id, value } => {
                self.push_leaf(ExprKind::StringConst(*value), *type_id, pos)
            }
            OpKind::Nil { type_id } => self.push_leaf(ExprKind::Nil, *type_id, pos),
            OpKind::Binary { op, type_id } => {
                let rhs = self.pop_value(pos)?;
                let lhs = self.pop_value(pos)?;
                self.push_leaf(
                    ExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    *type_id,
                    pos,
                );
            }
            OpKind::Compare { op, type_id } => {
                let rhs = self.pop_value(pos)?;
                let lhs = self.pop_value(pos)?;
                let int32 = self.types.int32();
                self.push_leaf(
                    ExprKind::Compare {
                        op: *op,
                        operand_type: *type_id,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    int32,
                    pos,
                );
            }
            OpKind::Unary { op, type_id } => {
                let operand = self.pop_value(pos)?;
                let ty = match op {
                    UnaryOp::Neg | UnaryOp::Cpl => *type_id,
                    UnaryOp::Not | UnaryOp::Bool => self.types.int32(),
                };
                self.push_leaf(
                    ExprKind::Unary {
                        op: *op,
                        operand_type: *type_id,
                        operand: Box::new(operand),
                    },
                    ty,
                    pos,
                );
            }
            OpKind::Convert { type_id, result } => {
                let operand = self.pop_value(pos)?;
                self.push_leaf(
                    ExprKind::Convert {
                        from: *type_id,
                        operand: Box::new(operand),
                    },
                    *result,
                    pos,
                );
            }
            OpKind::Load { type_id } => {
                let pointer = self.pop_value(pos)?;
                let ty = self.types.element(*type_id)?;
                self.push_leaf(
                    ExprKind::Load {
                        pointer_type: *type_id,
                        pointer: Box::new(pointer),
                    },
                    ty,
                    pos,
                );
            }
            OpKind::Store {
                type_id,
                bits,
                bit_offset,
            } => {
                let value = self.pop_value(pos)?;
                let address = self.pop_value(pos)?;
                self.push_leaf(
                    ExprKind::Store {
                        bits: *bits,
                        bit_offset: *bit_offset,
                        address: Box::new(address),
                        value: Box::new(value),
                    },
                    *type_id,
                    pos,
                );
            }
            OpKind::Dup { .. } => {
                let value = self.pop_value(pos)?;
                let ty = value.ty;
                self.push_value(Expr::new(ExprKind::Dup(Box::new(value)), ty, pos));
                self.push_value(Expr::new(ExprKind::DupRef, ty, pos));
            }
            OpKind::Drop { .. } => self.drop_value(pos)?,
            OpKind::Copy { type_id } => {
                let src = self.pop_value(pos)?;
                let dst = self.pop_value(pos)?;
                let ty = dst.ty;
                self.push_value(Expr::new(
                    ExprKind::Copy {
                        type_id: *type_id,
                        dst: Box::new(dst),
                        src: Box::new(src),
                    },
                    ty,
                    pos,
                ));
            }
            OpKind::Element {
                type_id,
                address,
                neg,
                ..
            } => {
                let index = self.pop_value(pos)?;
                let base = self.pop_value(pos)?;
                let ty = self.addressed_type(*type_id, *address)?;
                self.push_leaf(
                    ExprKind::Element {
                        address: *address,
                        neg: *neg,
                        base: Box::new(base),
                        index: Box::new(index),
                    },
                    ty,
                    pos,
                );
            }
            OpKind::Field {
                type_id,
                index,
                address,
            } => {
                let base = self.pop_value(pos)?;
                let ty = self.addressed_type(*type_id, *address)?;
                self.push_leaf(
                    ExprKind::Field {
                        index: *index,
                        address: *address,
                        base: Box::new(base),
                    },
                    ty,
                    pos,
                );
            }
            OpKind::PostIncrement {
                type_id,
                delta,
                bits,
                ..
            } => self.increment(false, *type_id, *delta, *bits, pos)?,
            OpKind::PreIncrement {
                type_id,
                delta,
                bits,
                ..
            } => self.increment(true, *type_id, *delta, *bits, pos)?,
            OpKind::PtrDiff { type_id, ptr_type } => {
                let rhs = self.pop_value(pos)?;
                let lhs = self.pop_value(pos)?;
                self.push_leaf(
                    ExprKind::PtrDiff {
                        ptr_type: *ptr_type,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    *type_id,
                    pos,
                );
            }
            OpKind::Call {
                index,
                arguments,
                type_id,
            } => {
                let args = self.pop_arguments(*arguments, pos)?;
                let result = self.function_result(*type_id)?;
                let call = ExprKind::Call {
                    index: *index,
                    function_type: *type_id,
                    arguments: args,
                };
                self.finish_call(call, result, pos)?;
            }
            OpKind::CallFp {
                arguments,
                type_id,
            } => {
                let mut args = self.pop_arguments(*arguments + 1, pos)?;
                let callee = args.remove(0);
                let function = self.types.element(*type_id)?;
                let result = self.function_result(function)?;
                let call = ExprKind::CallFp {
                    pointer_type: *type_id,
                    callee: Box::new(callee),
                    arguments: args,
                };
                self.finish_call(call, result, pos)?;
            }
            OpKind::Jmp { label, cond: true } => {
                let then = self.pop_value(pos)?;
                match self.stack.pop() {
                    Some(Slot::Guard {
                        cond,
                        label: else_label,
                        on_zero,
                    }) => self.stack.push(Slot::Then {
                        cond,
                        then,
                        on_zero,
                        else_label,
                        end_label: *label,
                    }),
                    _ => bail_unsupported!(pos, "conditional arm without a condition"),
                }
            }
            OpKind::Jmp { label, cond: false } => {
                self.expect_statement_boundary(pos, "jump")?;
                self.end_node(Exit::Jump(*label));
            }
            OpKind::Jz {
                label,
                logical: true,
            } => self.guard(*label, true, pos)?,
            OpKind::Jnz {
                label,
                logical: true,
            } => self.guard(*label, false, pos)?,
            OpKind::Jz {
                label,
                logical: false,
            } => self.branch(*label, true, pos)?,
            OpKind::Jnz {
                label,
                logical: false,
            } => self.branch(*label, false, pos)?,
            OpKind::Label { label, kind } => self.label(*label, *kind, pos)?,
            OpKind::Switch {
                type_id,
                cases,
                default,
            } => {
                let value = self.pop_value(pos)?;
                self.expect_statement_boundary(pos, "switch")?;
                self.end_node(Exit::Switch {
                    value,
                    type_id: *type_id,
                    cases: cases.clone(),
                    default: *default,
                });
            }
            OpKind::Return => {
                self.expect_statement_boundary(pos, "return")?;
                self.end_node(Exit::Return);
            }
            OpKind::Panic => {
                self.expect_statement_boundary(pos, "panic")?;
                self.end_node(Exit::Panic);
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Node>> {
        if !self.stack.is_empty() || !self.pending.is_empty() {
            let position = Position::default();
            bail_unsupported!(&position, "function body ends with a non-empty evaluation stack");
        }

        let previous_terminates = self
            .nodes
            .last()
            .map_or(false, |node| !falls_through(&node.exit));
        if !(self.current.is_empty() && previous_terminates) {
            let mut last = std::mem::replace(&mut self.current, Node::new(None));
            last.exit = Exit::Return;
            self.nodes.push(last);
        }
        trace!("{} reconstructed {} blocks", LOG_AREA, self.nodes.len());
        Ok(self.nodes)
    }

    fn end_node(&mut self, exit: Exit) {
        let mut node = std::mem::replace(&mut self.current, Node::new(None));
        node.exit = exit;
        self.nodes.push(node);
    }

    fn expect_statement_boundary(&self, pos: &Position, what: &str) -> Result<()> {
        if !self.stack.is_empty() || !self.pending.is_empty() {
            bail_unsupported!(pos, "{what} with a non-empty evaluation stack");
        }
        Ok(())
    }

    fn push_leaf(&mut self, kind: ExprKind, ty: TypeId, pos: &Position) {
        self.push_value(Expr::new(kind, Some(ty), pos));
    }

    fn push_value(&mut self, mut expr: Expr) {
        if !self.pending.is_empty() {
            let mut comma = std::mem::take(&mut self.pending);
            comma.append(&mut expr.comma);
            expr.comma = comma;
        }
        self.stack.push(Slot::Value(expr));
    }

    fn pop_value(&mut self, pos: &Position) -> Result<Expr> {
        if !self.pending.is_empty() {
            bail_unsupported!(pos, "side effect between an operand and its consumer");
        }
        match self.stack.pop() {
            Some(Slot::Value(expr)) => Ok(expr),
            Some(_) => bail_unsupported!(pos, "operand expected on the evaluation stack"),
            None => bail_unsupported!(pos, "evaluation stack underflow"),
        }
    }

    /// `Drop` turns the top value into a statement, or into a comma side
    /// effect of the next value when the stack is still in use.
    fn drop_value(&mut self, pos: &Position) -> Result<()> {
        let expr = match self.stack.pop() {
            Some(Slot::Value(expr)) => expr,
            _ => bail_unsupported!(pos, "drop without a value"),
        };
        if matches!(expr.kind, ExprKind::Dup(_) | ExprKind::DupRef) {
            bail_unsupported!(pos, "dropping a duplicated address");
        }

        // Everything pending was produced after `expr` was pushed.
        self.pending.insert(0, expr);
        if self.stack.is_empty() {
            for expr in std::mem::take(&mut self.pending) {
                self.current.statements.push(Statement::Expr(expr));
            }
        }
        Ok(())
    }

    fn addressed_type(&self, pointer: TypeId, address: bool) -> Result<TypeId> {
        if address {
            Ok(pointer)
        } else {
            self.types.element(pointer)
        }
    }

    fn increment(
        &mut self,
        pre: bool,
        type_id: TypeId,
        delta: i64,
        bits: u32,
        pos: &Position,
    ) -> Result<()> {
        let operand = self.pop_value(pos)?;
        self.push_leaf(
            ExprKind::Increment {
                pre,
                delta,
                bits,
                operand: Box::new(operand),
            },
            type_id,
            pos,
        );
        Ok(())
    }

    fn function_result(&self, function: TypeId) -> Result<Option<TypeId>> {
        match self.types.get(function)? {
            Type::Function { results, .. } => Ok(results.first().copied()),
            other => Err(internal(format!("call through non-function type {other:?}"))),
        }
    }

    fn pop_arguments(&mut self, count: usize, pos: &Position) -> Result<Vec<Expr>> {
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.pop_value(pos)?);
        }
        args.reverse();
        match self.stack.pop() {
            Some(Slot::Arguments) => Ok(args),
            _ => bail_unsupported!(pos, "call arguments do not start at an argument marker"),
        }
    }

    fn finish_call(&mut self, call: ExprKind, result: Option<TypeId>, pos: &Position) -> Result<()> {
        match result {
            Some(ty) => {
                match self.stack.pop() {
                    Some(Slot::ResultSlot(slot)) if slot == ty => {}
                    Some(Slot::ResultSlot(slot)) => bail_unsupported!(
                        pos,
                        "call result of type {} in a slot allocated for type {}",
                        ty.0,
                        slot.0
                    ),
                    _ => bail_unsupported!(pos, "call result without an allocated result slot"),
                }
                self.push_leaf(call, ty, pos);
            }
            None => {
                let expr = Expr::new(call, None, pos);
                if self.stack.is_empty() {
                    self.current.statements.push(Statement::Expr(expr));
                } else {
                    self.pending.push(expr);
                }
            }
        }
        Ok(())
    }

    fn guard(&mut self, label: Label, on_zero: bool, pos: &Position) -> Result<()> {
        let cond = self.pop_value(pos)?;
        self.stack.push(Slot::Guard {
            cond,
            label,
            on_zero,
        });
        Ok(())
    }

    fn branch(&mut self, target: Label, on_zero: bool, pos: &Position) -> Result<()> {
        let cond = self.pop_value(pos)?;
        self.expect_statement_boundary(pos, "conditional jump")?;
        self.end_node(Exit::Branch {
            cond,
            target,
            on_zero,
        });
        Ok(())
    }

    fn label(&mut self, label: Label, kind: LabelKind, pos: &Position) -> Result<()> {
        match kind {
            LabelKind::Plain => {
                self.expect_statement_boundary(pos, "label")?;
                if self.current.is_empty() {
                    self.current.label = Some(label);
                } else {
                    self.end_node(Exit::Jump(label));
                    self.current.label = Some(label);
                }
            }
            LabelKind::LogicalAnd | LabelKind::LogicalOr => {
                let and = kind == LabelKind::LogicalAnd;
                let rhs = self.pop_value(pos)?;
                let lhs = match self.stack.pop() {
                    Some(Slot::Guard {
                        cond,
                        label: guard_label,
                        on_zero,
                    }) if guard_label == label && on_zero == and => cond,
                    _ => bail_unsupported!(pos, "logical operator label without its guard"),
                };
                let int32 = self.types.int32();
                self.push_leaf(
                    ExprKind::Logical {
                        and,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    int32,
                    pos,
                );
            }
            LabelKind::CondElse => match self.stack.last() {
                Some(Slot::Then { else_label, .. }) if *else_label == label => {}
                _ => bail_unsupported!(pos, "conditional else label without a first arm"),
            },
            LabelKind::Cond => {
                let otherwise = self.pop_value(pos)?;
                let (cond, then, on_zero) = match self.stack.pop() {
                    Some(Slot::Then {
                        cond,
                        then,
                        on_zero,
                        end_label,
                        ..
                    }) if end_label == label => (cond, then, on_zero),
                    _ => bail_unsupported!(pos, "conditional end label without a first arm"),
                };
                // A guard that jumps on non-zero runs the first arm for zero.
                let (then, otherwise) = if on_zero {
                    (then, otherwise)
                } else {
                    (otherwise, then)
                };
                let ty = then.ty;
                self.push_value(Expr::new(
                    ExprKind::Conditional {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    },
                    ty,
                    pos,
                ));
            }
        }
        Ok(())
    }
}

pub fn falls_through(exit: &Exit) -> bool {
    matches!(exit, Exit::Fallthrough | Exit::Branch { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i32) -> Op {
        Op::new(OpKind::Const32 {
            type_id: TypeId(4),
            value,
        })
    }

    fn var(index: usize, address: bool, types: &mut TypeCache) -> Op {
        let ty = if address {
            types.pointer_to(types.int32())
        } else {
            types.int32()
        };
        Op::new(OpKind::Variable {
            index,
            type_id: ty,
            address,
        })
    }

    fn store() -> Op {
        Op::new(OpKind::Store {
            type_id: TypeId(4),
            bits: 0,
            bit_offset: 0,
        })
    }

    fn drop() -> Op {
        Op::new(OpKind::Drop { type_id: TypeId(4) })
    }

    #[test]
    fn forward_branch_targets_a_later_block() {
        let mut types = TypeCache::new();
        let body = vec![
            var(0, false, &mut types),
            Op::new(OpKind::Jz {
                label: Label::Number(7),
                logical: false,
            }),
            var(0, true, &mut types),
            int(1),
            store(),
            drop(),
            Op::new(OpKind::Label {
                label: Label::Number(7),
                kind: LabelKind::Plain,
            }),
            Op::new(OpKind::Return),
        ];
        let nodes = build(&types, &body).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(
            nodes[0].exit,
            Exit::Branch {
                target: Label::Number(7),
                on_zero: true,
                ..
            }
        ));
        assert_eq!(nodes[1].statements.len(), 1);
        assert_eq!(nodes[1].exit, Exit::Jump(Label::Number(7)));
        assert_eq!(nodes[2].label, Some(Label::Number(7)));
        assert_eq!(nodes[2].exit, Exit::Return);
    }

    #[test]
    fn logical_and_folds_into_one_expression() {
        let mut types = TypeCache::new();
        let body = vec![
            var(0, true, &mut types),
            var(1, false, &mut types),
            Op::new(OpKind::Jz {
                label: Label::Number(1),
                logical: true,
            }),
            var(2, false, &mut types),
            Op::new(OpKind::Label {
                label: Label::Number(1),
                kind: LabelKind::LogicalAnd,
            }),
            store(),
            drop(),
        ];
        let nodes = build(&types, &body).unwrap();
        assert_eq!(nodes.len(), 1);
        let Statement::Expr(expr) = &nodes[0].statements[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Store { value, .. } = &expr.kind else {
            panic!("expected a store");
        };
        assert!(matches!(value.kind, ExprKind::Logical { and: true, .. }));
    }

    #[test]
    fn comma_side_effects_attach_to_the_next_value() {
        let mut types = TypeCache::new();
        let body = vec![
            var(0, true, &mut types),
            var(1, true, &mut types),
            int(5),
            store(),
            drop(),
            int(6),
            store(),
            drop(),
        ];
        let nodes = build(&types, &body).unwrap();
        let Statement::Expr(expr) = &nodes[0].statements[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Store { value, .. } = &expr.kind else {
            panic!("expected a store");
        };
        assert_eq!(value.comma.len(), 1);
        assert_eq!(value.kind, ExprKind::Const32(6));
    }

    #[test]
    fn conditional_expression_keeps_both_arms() {
        let mut types = TypeCache::new();
        let body = vec![
            var(0, true, &mut types),
            var(1, false, &mut types),
            Op::new(OpKind::Jz {
                label: Label::Number(2),
                logical: true,
            }),
            int(10),
            Op::new(OpKind::Jmp {
                label: Label::Number(3),
                cond: true,
            }),
            Op::new(OpKind::Label {
                label: Label::Number(2),
                kind: LabelKind::CondElse,
            }),
            int(20),
            Op::new(OpKind::Label {
                label: Label::Number(3),
                kind: LabelKind::Cond,
            }),
            store(),
            drop(),
        ];
        let nodes = build(&types, &body).unwrap();
        let Statement::Expr(expr) = &nodes[0].statements[0] else {
            panic!("expected an expression statement");
        };
        let ExprKind::Store { value, .. } = &expr.kind else {
            panic!("expected a store");
        };
        let ExprKind::Conditional {
            then, otherwise, ..
        } = &value.kind
        else {
            panic!("expected a conditional");
        };
        assert_eq!(then.kind, ExprKind::Const32(10));
        assert_eq!(otherwise.kind, ExprKind::Const32(20));
    }

    #[test]
    fn plain_label_with_pending_value_is_unsupported() {
        let mut types = TypeCache::new();
        let body = vec![
            var(0, false, &mut types),
            Op::new(OpKind::Label {
                label: Label::Number(1),
                kind: LabelKind::Plain,
            }),
        ];
        assert!(build(&types, &body).unwrap_err().is_unsupported());
    }

    #[test]
    fn call_result_must_match_its_slot() {
        let mut types = TypeCache::new();
        let (int32, int64) = (types.int32(), types.int64());
        let answer = types.function(vec![], vec![int32], false);
        let call = |slot| {
            vec![
                Op::new(OpKind::AllocResult { type_id: slot }),
                Op::new(OpKind::Arguments),
                Op::new(OpKind::Call {
                    index: 0,
                    arguments: 0,
                    type_id: answer,
                }),
                Op::new(OpKind::Drop { type_id: int32 }),
                Op::new(OpKind::Return),
            ]
        };

        let nodes = build(&types, &call(int32)).unwrap();
        assert_eq!(nodes[0].statements.len(), 1);

        let err = build(&types, &call(int64)).unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("slot allocated for type 6"), "{err}");
    }

    #[test]
    fn trailing_unreachable_block_is_not_materialized() {
        let body = vec![Op::new(OpKind::Return)];
        let nodes = build(&TypeCache::new(), &body).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].exit, Exit::Return);
    }
}
