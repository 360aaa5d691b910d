//! Expression trees -> Go expression text.
//!
//! Every composite result is parenthesized or is a call, so a rendered
//! operand can be spliced into any other expression unchanged.

use golower_core::error::{internal, unsupported, Result};
use golower_core::ir::{BinaryOp, CompareOp, Object, Position, Type, TypeId, TypeKind, UnaryOp};
use golower_core::{bail_internal, bail_unsupported};

use crate::function::FunctionContext;
use crate::generator::Generator;
use crate::graph::{Expr, ExprKind};
use crate::helpers::{bitfield_mask, bitfield_shifts, wrap_integer, HelperKind};

/// How the consumer of an expression uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Use {
    Value,
    /// Call operand: local and global arrays decay to their first element.
    CallArgument,
    /// Comparison or store operand: global arrays decay.
    Operand,
}

type Ctx<'f, 'a> = &'f FunctionContext<'a>;

impl Generator<'_, '_> {
    /// `expr` evaluated for its side effects only.
    pub(crate) fn statement(&mut self, f: Ctx<'_, '_>, expr: &Expr) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(expr.comma.len() + 1);
        for side in &expr.comma {
            out.extend(self.statement(f, side)?);
        }
        let core = self.core(f, expr, Use::Value)?;
        match &expr.kind {
            ExprKind::Nil => {}
            kind if is_call(kind) => out.push(core),
            _ => out.push(format!("_ = {core}")),
        }
        Ok(out)
    }

    pub(crate) fn expr(&mut self, f: Ctx<'_, '_>, expr: &Expr, usage: Use) -> Result<String> {
        if expr.comma.is_empty() {
            return self.core(f, expr, usage);
        }

        let mut body = Vec::with_capacity(expr.comma.len());
        for side in &expr.comma {
            body.extend(self.statement(f, side)?);
        }
        match expr.ty {
            Some(ty) => {
                if usage != Use::Value && self.kind(ty)? == TypeKind::Array {
                    bail_unsupported!(&expr.position, "array operand with side effects");
                }
                let t = self.signature(ty)?;
                let core = self.core(f, expr, usage)?;
                Ok(format!(
                    "func() {t} {{ {}; return {core} }}()",
                    body.join("; ")
                ))
            }
            None => {
                let core = self.core(f, expr, usage)?;
                Ok(format!("func() {{ {}; {core} }}()", body.join("; ")))
            }
        }
    }

    /// `X != 0`, or `X != nil` for pointers Go keeps typed.
    pub(crate) fn truth(&mut self, f: Ctx<'_, '_>, expr: &Expr, zero: bool) -> Result<String> {
        let ty = expr.value_type()?;
        let x = self.expr(f, expr, Use::Value)?;
        let nil = self.zero_of(ty, &expr.position)?;
        Ok(format!("{x} {} {nil}", if zero { "==" } else { "!=" }))
    }

    fn core(&mut self, f: Ctx<'_, '_>, e: &Expr, usage: Use) -> Result<String> {
        let pos = &e.position;
        match &e.kind {
            ExprKind::Argument { index, address } => {
                let name = match f.definition.arguments.get(*index) {
                    Some(name) if !name.is_none() => *name,
                    Some(_) => bail_unsupported!(pos, "reference to unnamed argument {index}"),
                    None if *index < f.arguments.len() => {
                        bail_unsupported!(pos, "reference to unnamed argument {index}")
                    }
                    None => bail_internal!("argument {index} out of range"),
                };
                let nm = self.mangler.mangle(self.dict, name, false, None)?;
                Ok(address_of(*address, nm))
            }
            ExprKind::Variable { index, address } => {
                let var = f.var(*index)?;
                let nm = self.local_name(var)?;
                if usage == Use::CallArgument
                    && self.kind(var.declaration.type_id)? == TypeKind::Array
                {
                    return Ok(format!("&{nm}[0]"));
                }
                Ok(address_of(*address, nm))
            }
            ExprKind::Result { index, address } => {
                if *index >= f.results.len() {
                    bail_internal!("result {index} out of range");
                }
                Ok(address_of(*address, format!("r{index}")))
            }
            ExprKind::Global {
                index,
                name,
                linkage,
                address,
            } => {
                let object = self.object(*index)?;
                let mut nm = self
                    .mangler
                    .mangle(self.dict, *name, linkage.is_external(), None)?;
                if let Some(qualifier) = self.builtin(*index)? {
                    if !qualifier.is_empty() {
                        nm = format!("{qualifier}.{nm}");
                    }
                }
                let object_kind = self.kind(object.type_id())?;
                if usage != Use::Value && object_kind == TypeKind::Array {
                    return Ok(format!("&{nm}[0]"));
                }
                if *address && object_kind != TypeKind::Function {
                    return Ok(format!("&{nm}"));
                }
                Ok(nm)
            }
            ExprKind::Const32(value) => {
                let ty = e.value_type()?;
                self.constant(ty, *value as i64, false, pos)
            }
            ExprKind::Const64(value) => {
                let ty = e.value_type()?;
                self.constant(ty, *value, true, pos)
            }
            ExprKind::StringConst(id) => {
                let ty = e.value_type()?;
                self.string_pointer(ty, *id, 0, pos)
            }
            ExprKind::Nil => {
                let ty = e.value_type()?;
                Ok(if self.is_void_pointer(ty) {
                    "uintptr(0)".to_string()
                } else {
                    "nil".to_string()
                })
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let ty = e.value_type()?;
                self.binary(f, *op, ty, lhs, rhs, pos)
            }
            ExprKind::Compare {
                op,
                operand_type,
                lhs,
                rhs,
            } => self.compare(f, *op, *operand_type, lhs, rhs, pos),
            ExprKind::Unary {
                op,
                operand_type,
                operand,
            } => self.unary(f, *op, *operand_type, operand, pos),
            ExprKind::Convert { from, operand } => {
                if let ExprKind::Global { name, .. } = &operand.kind {
                    if self.is_main(*name)? {
                        return self.expr(f, operand, Use::Value);
                    }
                }
                let to = e.value_type()?;
                let x = self.expr(f, operand, Use::Value)?;
                self.convert(*from, to, x, pos)
            }
            ExprKind::Load {
                pointer_type,
                pointer,
            } => {
                if self.is_void_pointer(*pointer_type)
                    || self.types.is_function_pointer(*pointer_type)?
                {
                    bail_unsupported!(pos, "load through a pointer without a value type");
                }
                let p = self.expr(f, pointer, Use::Value)?;
                Ok(format!("(*{p})"))
            }
            ExprKind::Store {
                bits,
                bit_offset,
                address,
                value,
            } => self.store(f, e, *bits, *bit_offset, address, value),
            ExprKind::Copy { type_id, dst, src } => {
                let name = self.helpers.require(HelperKind::Copy, *type_id);
                let d = self.expr(f, dst, Use::Value)?;
                let s = self.expr(f, src, Use::Value)?;
                Ok(format!("{name}({d}, {s})"))
            }
            ExprKind::Element {
                address,
                neg,
                base,
                index,
            } => self.element(f, *address, *neg, base, index, pos),
            ExprKind::Field {
                index,
                address,
                base,
            } => self.field(f, *index, *address, base, pos),
            ExprKind::Increment {
                pre,
                delta,
                bits,
                operand,
            } => {
                if *bits != 0 {
                    bail_unsupported!(pos, "increment of a bit-field");
                }
                let ty = e.value_type()?;
                let kind = if *pre {
                    HelperKind::PreIncrement
                } else {
                    HelperKind::PostIncrement
                };
                let d = if self.is_data_pointer(ty)? {
                    delta.to_string()
                } else {
                    self.increment_delta(ty, *delta, pos)?
                };
                let name = self.helpers.require(kind, ty);
                let a = self.expr(f, operand, Use::Value)?;
                Ok(format!("{name}({a}, {d})"))
            }
            ExprKind::PtrDiff {
                ptr_type,
                lhs,
                rhs,
            } => {
                let t = self.signature(e.value_type()?)?;
                let pointee = self.types.element(*ptr_type)?;
                let size = self.lowering.size_of(pointee)?;
                if size == 0 {
                    bail_unsupported!(pos, "difference of pointers to a zero-sized type");
                }
                let l = self.expr(f, lhs, Use::Value)?;
                let l = self.address_bits(*ptr_type, l, pos)?;
                let r = self.expr(f, rhs, Use::Value)?;
                let r = self.address_bits(*ptr_type, r, pos)?;
                let wide = if self.lowering.model().pointer_size() == 4 {
                    "int32"
                } else {
                    "int64"
                };
                Ok(format!("{t}({wide}({l} - {r}) / {size})"))
            }
            ExprKind::Call {
                index,
                function_type,
                arguments,
            } => {
                if !matches!(self.object(*index)?, Object::Function(_)) {
                    bail_internal!("call of data object {index}");
                }
                let callee = self.object_name(*index)?;
                let args = self.call_arguments(f, *function_type, arguments)?;
                Ok(format!("{callee}({})", args.join(", ")))
            }
            ExprKind::CallFp {
                pointer_type,
                callee,
                arguments,
            } => {
                let function = self.types.element(*pointer_type)?;
                let c = self.expr(f, callee, Use::Value)?;
                let args = self.call_arguments(f, function, arguments)?;
                Ok(format!("({c})({})", args.join(", ")))
            }
            ExprKind::Logical { and, lhs, rhs } => {
                let l = self.truth(f, lhs, false)?;
                let r = self.truth(f, rhs, false)?;
                let op = if *and { "&&" } else { "||" };
                Ok(format!("bool2int({l} {op} {r})"))
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let t = self.signature(e.value_type()?)?;
                let c = self.truth(f, cond, false)?;
                let a = self.expr(f, then, Use::Value)?;
                let b = self.expr(f, otherwise, Use::Value)?;
                Ok(format!(
                    "func() {t} {{ if {c} {{ return {a} }}; return {b} }}()"
                ))
            }
            ExprKind::Dup(_) => {
                bail_unsupported!(pos, "duplicated value outside a compound assignment")
            }
            ExprKind::DupRef => {
                if self.dup_depth == 0 {
                    bail_unsupported!(pos, "duplicated value outside a compound assignment");
                }
                Ok("p".to_string())
            }
        }
    }

    /// Integer-valued constant of any scalar or pointer type. Float and
    /// complex constants carry their bit pattern in `value`.
    pub(crate) fn constant(
        &mut self,
        ty: TypeId,
        value: i64,
        wide: bool,
        pos: &Position,
    ) -> Result<String> {
        let kind = self.kind(ty)?;
        let float = || {
            if wide {
                f64::from_bits(value as u64)
            } else {
                f32::from_bits(value as u32) as f64
            }
        };
        match kind {
            TypeKind::Pointer => self.integer_pointer(ty, value, pos),
            TypeKind::Float32 if !wide => Ok(float32_text(f32::from_bits(value as u32))),
            TypeKind::Float32 => Ok(float32_text(float() as f32)),
            TypeKind::Float64 => Ok(float64_text(float())),
            TypeKind::Complex64 => Ok(format!("complex({}, 0)", float32_text(float() as f32))),
            TypeKind::Complex128 => Ok(format!("complex({}, 0)", float64_text(float()))),
            kind => self.integer(ty, kind, value, pos),
        }
    }

    /// `T(v)` for an integer type, `v` wrapped to the type's width.
    pub(crate) fn integer(
        &mut self,
        ty: TypeId,
        kind: TypeKind,
        value: i64,
        pos: &Position,
    ) -> Result<String> {
        let wrapped = match wrap_integer(kind, value) {
            Some(wrapped) => wrapped,
            None => bail_unsupported!(pos, "integer constant of type {}", self.signature(ty)?),
        };
        Ok(format!("{}({wrapped})", self.signature(ty)?))
    }

    /// An integer reinterpreted as a pointer: 0 is the null pointer.
    pub(crate) fn integer_pointer(&mut self, ty: TypeId, value: i64, pos: &Position) -> Result<String> {
        let bits = self.pointer_bits(value);
        if self.is_void_pointer(ty) {
            return Ok(format!("uintptr({bits})"));
        }
        if value == 0 {
            return Ok("nil".to_string());
        }
        if self.types.is_function_pointer(ty)? {
            bail_unsupported!(pos, "non-null integer used as a function pointer");
        }
        Ok(format!(
            "({})(unsafe.Pointer(uintptr({bits})))",
            self.signature(ty)?
        ))
    }

    fn pointer_bits(&self, value: i64) -> u64 {
        if self.lowering.model().pointer_size() == 4 {
            value as u32 as u64
        } else {
            value as u64
        }
    }

    fn increment_delta(&mut self, ty: TypeId, delta: i64, pos: &Position) -> Result<String> {
        match self.kind(ty)? {
            TypeKind::Pointer if self.is_void_pointer(ty) => {
                Ok(format!("uintptr({})", self.pointer_bits(delta)))
            }
            kind if kind.is_integer() => self.integer(ty, kind, delta, pos),
            kind if kind.is_float() || kind.is_complex() => {
                Ok(format!("{}({delta})", self.signature(ty)?))
            }
            _ => bail_unsupported!(pos, "increment of {}", self.signature(ty)?),
        }
    }

    /// The zero a value of `ty` is compared against.
    pub(crate) fn zero_of(&self, ty: TypeId, pos: &Position) -> Result<&'static str> {
        match self.kind(ty)? {
            TypeKind::Pointer if self.is_void_pointer(ty) => Ok("0"),
            TypeKind::Pointer => Ok("nil"),
            kind if kind.is_scalar() => Ok("0"),
            kind => bail_unsupported!(pos, "truth value of a {kind:?}"),
        }
    }

    /// A pointer as an address-sized integer.
    fn address_bits(&self, ty: TypeId, text: String, pos: &Position) -> Result<String> {
        if self.is_void_pointer(ty) {
            return Ok(text);
        }
        if self.types.is_function_pointer(ty)? {
            bail_unsupported!(pos, "address arithmetic on a function pointer");
        }
        Ok(format!("uintptr(unsafe.Pointer({text}))"))
    }

    fn binary(
        &mut self,
        f: Ctx<'_, '_>,
        op: BinaryOp,
        ty: TypeId,
        lhs: &Expr,
        rhs: &Expr,
        pos: &Position,
    ) -> Result<String> {
        let kind = self.kind(ty)?;
        let integral = kind.is_integer() || self.is_void_pointer(ty);
        let numeric = integral || kind.is_float() || kind.is_complex();
        let symbol = match op {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Lsh => "<<",
            BinaryOp::Rsh => ">>",
        };
        let supported = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => numeric,
            _ => integral,
        };
        if !supported {
            bail_unsupported!(pos, "operator {symbol} on {}", self.signature(ty)?);
        }

        let l = self.expr(f, lhs, Use::Value)?;
        let r = self.expr(f, rhs, Use::Value)?;
        Ok(match op {
            BinaryOp::Lsh | BinaryOp::Rsh => format!("({l} {symbol} uint({r}))"),
            _ => format!("({l} {symbol} {r})"),
        })
    }

    fn compare(
        &mut self,
        f: Ctx<'_, '_>,
        op: CompareOp,
        operand_type: TypeId,
        lhs: &Expr,
        rhs: &Expr,
        pos: &Position,
    ) -> Result<String> {
        let symbol = match op {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Leq => "<=",
            CompareOp::Gt => ">",
            CompareOp::Geq => ">=",
        };
        let equality = matches!(op, CompareOp::Eq | CompareOp::Neq);
        let l = self.expr(f, lhs, Use::Operand)?;
        let r = self.expr(f, rhs, Use::Operand)?;

        if self.types.is_function_pointer(operand_type)? {
            // Go compares function values with nil only.
            return match (equality, l.as_str(), r.as_str()) {
                (true, _, "nil") => Ok(format!("bool2int({l} {symbol} nil)")),
                (true, "nil", _) => Ok(format!("bool2int({r} {symbol} nil)")),
                _ => bail_unsupported!(pos, "comparison of two function pointers"),
            };
        }
        if self.is_data_pointer(operand_type)? {
            return Ok(format!(
                "bool2int(uintptr(unsafe.Pointer({l})) {symbol} uintptr(unsafe.Pointer({r})))"
            ));
        }
        let kind = self.kind(operand_type)?;
        if !(kind.is_integer() || kind.is_float() || self.is_void_pointer(operand_type))
            && !(kind.is_complex() && equality)
        {
            bail_unsupported!(pos, "comparison {symbol} of {kind:?} values");
        }
        Ok(format!("bool2int({l} {symbol} {r})"))
    }

    fn unary(
        &mut self,
        f: Ctx<'_, '_>,
        op: UnaryOp,
        operand_type: TypeId,
        operand: &Expr,
        pos: &Position,
    ) -> Result<String> {
        let kind = self.kind(operand_type)?;
        let integral = kind.is_integer() || self.is_void_pointer(operand_type);
        match op {
            UnaryOp::Neg if integral || kind.is_float() || kind.is_complex() => {
                Ok(format!("(-{})", self.expr(f, operand, Use::Value)?))
            }
            UnaryOp::Cpl if integral => Ok(format!("(^{})", self.expr(f, operand, Use::Value)?)),
            UnaryOp::Neg | UnaryOp::Cpl => {
                bail_unsupported!(pos, "{op:?} of {}", self.signature(operand_type)?)
            }
            UnaryOp::Not => Ok(format!("bool2int({})", self.truth(f, operand, true)?)),
            UnaryOp::Bool => Ok(format!("bool2int({})", self.truth(f, operand, false)?)),
        }
    }

    /// Go text of `x`, a value of type `from`, as a value of type `to`.
    pub(crate) fn convert(
        &mut self,
        from: TypeId,
        to: TypeId,
        x: String,
        pos: &Position,
    ) -> Result<String> {
        if from == to {
            return Ok(x);
        }
        let types = self.types;
        let (fk, tk) = (types.kind(from)?, types.kind(to)?);
        let from_void = types.is_void_pointer(from);
        let from_function = types.is_function_pointer(from)?;
        let t = self.signature(to)?;
        let unsupported_conversion = |generator: &mut Self| -> Result<String> {
            let s = generator.signature(from)?;
            Err(unsupported(pos, format!("conversion from {s} to {t}")))
        };

        if tk == TypeKind::Pointer {
            if types.is_void_pointer(to) {
                return match fk {
                    TypeKind::Pointer if from_void => Ok(x),
                    TypeKind::Pointer if !from_function => {
                        Ok(format!("uintptr(unsafe.Pointer({x}))"))
                    }
                    k if k.is_integer() => Ok(format!("uintptr({x})")),
                    _ => unsupported_conversion(self),
                };
            }
            if types.is_function_pointer(to)? {
                return unsupported_conversion(self);
            }
            return match fk {
                TypeKind::Pointer if from_void => Ok(format!("({t})(unsafe.Pointer({x}))")),
                TypeKind::Pointer if !from_function => Ok(format!("({t})(unsafe.Pointer({x}))")),
                k if k.is_integer() => Ok(format!("({t})(unsafe.Pointer(uintptr({x})))")),
                _ => unsupported_conversion(self),
            };
        }

        if tk.is_integer() {
            return match fk {
                TypeKind::Pointer if from_void => Ok(format!("{t}({x})")),
                TypeKind::Pointer if !from_function => {
                    Ok(format!("{t}(uintptr(unsafe.Pointer({x})))"))
                }
                k if k.is_integer() || k.is_float() => Ok(format!("{t}({x})")),
                k if k.is_complex() => Ok(format!("{t}(real({x}))")),
                _ => unsupported_conversion(self),
            };
        }

        if tk.is_float() {
            return match fk {
                k if k.is_integer() || k.is_float() => Ok(format!("{t}({x})")),
                k if k.is_complex() => Ok(format!("{t}(real({x}))")),
                _ => unsupported_conversion(self),
            };
        }

        if tk.is_complex() {
            let part = if tk == TypeKind::Complex64 {
                "float32"
            } else {
                "float64"
            };
            return match fk {
                k if k.is_integer() || k.is_float() => Ok(format!("complex({part}({x}), 0)")),
                k if k.is_complex() => Ok(format!("{t}({x})")),
                _ => unsupported_conversion(self),
            };
        }

        unsupported_conversion(self)
    }

    fn store(
        &mut self,
        f: Ctx<'_, '_>,
        e: &Expr,
        bits: u32,
        bit_offset: u32,
        address: &Expr,
        value: &Expr,
    ) -> Result<String> {
        let pos = &e.position;
        let ty = e.value_type()?;
        let t = self.signature(ty)?;

        if let ExprKind::Dup(target) = &address.kind {
            if bits != 0 {
                bail_unsupported!(pos, "compound assignment to a bit-field");
            }
            if self.dup_depth != 0 || !address.comma.is_empty() {
                bail_unsupported!(pos, "nested compound assignment");
            }
            let name = self.helpers.require(HelperKind::Store, ty);
            let p = self.expr(f, target, Use::Operand)?;
            self.dup_depth += 1;
            let v = self.expr(f, value, Use::Operand);
            self.dup_depth -= 1;
            let v = v?;
            return Ok(format!(
                "{name}(func() (*{t}, {t}) {{ p := {p}; return p, {v} }}())"
            ));
        }

        if bits != 0 {
            let kind = self.kind(ty)?;
            let (mask, (l, r)) = match (
                bitfield_mask(kind, bits, bit_offset),
                bitfield_shifts(kind, bits, bit_offset),
            ) {
                (Some(mask), Some(shifts)) => (mask, shifts),
                _ => bail_unsupported!(pos, "bit-field of {bits} bits at {bit_offset} in {t}"),
            };
            let name = self.helpers.require(HelperKind::StoreBits, ty);
            let a = self.expr(f, address, Use::Operand)?;
            let v = self.expr(f, value, Use::Operand)?;
            return Ok(format!(
                "{name}({a}, ({v} << {bit_offset}), {t}({mask}), {l}, {r})"
            ));
        }

        let name = self.helpers.require(HelperKind::Store, ty);
        let a = self.expr(f, address, Use::Operand)?;
        let v = self.expr(f, value, Use::Operand)?;
        Ok(format!("{name}({a}, {v})"))
    }

    fn element(
        &mut self,
        f: Ctx<'_, '_>,
        address: bool,
        neg: bool,
        base: &Expr,
        index: &Expr,
        pos: &Position,
    ) -> Result<String> {
        let types = self.types;
        let base_type = base.value_type()?;
        if types.is_void_pointer(base_type) {
            bail_unsupported!(pos, "indexing through a void pointer");
        }
        let pointee = types.element(base_type)?;
        let item = match types.get(pointee)? {
            Type::Array { item, .. } => *item,
            _ => pointee,
        };
        let size = self.lowering.size_of(item)?;
        let item_type = self.signature(item)?;

        let b = self.expr(f, base, Use::Value)?;
        let b = self.address_bits(base_type, b, pos)?;
        let sum = match index.is_constant() {
            Some(i) => {
                let offset = i as i128 * size as i128 * if neg { -1 } else { 1 };
                match offset {
                    0 => b,
                    o if o < 0 => format!("{b} - {}", -o),
                    o => format!("{b} + {o}"),
                }
            }
            None => {
                let i = self.expr(f, index, Use::Value)?;
                let sign = if neg { "-" } else { "+" };
                format!("{b} {sign} {size}*uintptr({i})")
            }
        };
        let pointer = format!("(*{item_type})(unsafe.Pointer({sum}))");
        Ok(if address {
            pointer
        } else {
            format!("(*{pointer})")
        })
    }

    fn field(
        &mut self,
        f: Ctx<'_, '_>,
        index: usize,
        address: bool,
        base: &Expr,
        pos: &Position,
    ) -> Result<String> {
        let types = self.types;
        let aggregate = types.element(base.value_type()?)?;
        match types.get(aggregate)? {
            Type::Union { fields } => {
                let field = match fields.get(index) {
                    Some(field) => *field,
                    None => bail_internal!("union {aggregate} has no field {index}"),
                };
                let field_type = self.signature(field)?;
                let b = self.expr(f, base, Use::Value)?;
                let pointer = format!("(*{field_type})(unsafe.Pointer({b}))");
                Ok(if address {
                    pointer
                } else {
                    format!("(*{pointer})")
                })
            }
            Type::Struct { fields } => {
                if index >= fields.len() {
                    bail_internal!("struct {aggregate} has no field {index}");
                }
                let b = self.expr(f, base, Use::Value)?;
                Ok(if address {
                    format!("&({b}).X{index}")
                } else {
                    format!("({b}).X{index}")
                })
            }
            other => Err(unsupported(pos, format!("field {index} of {other:?}"))),
        }
    }

    fn call_arguments(
        &mut self,
        f: Ctx<'_, '_>,
        function_type: TypeId,
        arguments: &[Expr],
    ) -> Result<Vec<String>> {
        let (params, variadic) = match self.types.get(function_type)? {
            Type::Function {
                arguments,
                variadic,
                ..
            } => (arguments.clone(), *variadic),
            other => return Err(internal(format!("call through {other:?}"))),
        };

        let mut out = Vec::with_capacity(arguments.len());
        for (i, argument) in arguments.iter().enumerate() {
            let text = self.expr(f, argument, Use::CallArgument)?;
            let at = argument.value_type()?;
            let text = match params.get(i) {
                None if variadic
                    && self.types.is_pointer(at)?
                    && !self.types.is_function_pointer(at)? =>
                {
                    format!("unsafe.Pointer({text})")
                }
                Some(&param) if self.is_data_pointer(param)? && self.is_void_pointer(at) => {
                    format!("({})(unsafe.Pointer({text}))", self.signature(param)?)
                }
                Some(&param) if self.is_void_pointer(param) && self.is_data_pointer(at)? => {
                    format!("uintptr(unsafe.Pointer({text}))")
                }
                _ => text,
            };
            out.push(text);
        }
        Ok(out)
    }
}

fn address_of(address: bool, name: String) -> String {
    if address {
        format!("&{name}")
    } else {
        name
    }
}

/// Kinds that render as a Go call and may stand alone as a statement.
fn is_call(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Call { .. }
            | ExprKind::CallFp { .. }
            | ExprKind::Store { .. }
            | ExprKind::Copy { .. }
            | ExprKind::Increment { .. }
            | ExprKind::Compare { .. }
            | ExprKind::Logical { .. }
            | ExprKind::Conditional { .. }
            | ExprKind::Unary {
                op: UnaryOp::Not | UnaryOp::Bool,
                ..
            }
    )
}

pub(crate) fn float32_text(value: f32) -> String {
    if value.is_finite() && !(value == 0.0 && value.is_sign_negative()) {
        format!("float32({value:?})")
    } else {
        format!("math.Float32frombits(0x{:08x})", value.to_bits())
    }
}

pub(crate) fn float64_text(value: f64) -> String {
    if value.is_finite() && !(value == 0.0 && value.is_sign_negative()) {
        format!("float64({value:?})")
    } else {
        format!("math.Float64frombits(0x{:016x})", value.to_bits())
    }
}
