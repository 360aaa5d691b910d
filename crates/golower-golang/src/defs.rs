//! Function and data definitions.

use golower_core::error::Result;
use golower_core::ir::{
    is_zero_value, DataDefinition, FunctionDefinition, Label, Position, Type, TypeId, TypeKind,
    Value,
};
use golower_core::tracing::trace;
use golower_core::{bail_internal, bail_unsupported};

use crate::expr::Use;
use crate::function::{FunctionContext, VarInfo};
use crate::generator::{Generator, LOG_AREA};
use crate::graph::{self, Exit, Node, Statement};
use crate::helpers::wrap_integer;
use crate::unit::{GoBlock, GoExit, GoFunction, GoItem};

impl Generator<'_, '_> {
    pub(crate) fn function_definition(
        &mut self,
        index: usize,
        definition: &FunctionDefinition,
    ) -> Result<()> {
        if self.builtin(index)?.is_some() {
            trace!("{} skipping builtin stub {}", LOG_AREA, index);
            return Ok(());
        }

        let f = FunctionContext::new(self.types, index, definition)?;
        let nodes = graph::build(self.types, &definition.body)?;
        let name = self.mangler.mangle(
            self.dict,
            definition.name,
            definition.linkage.is_external(),
            None,
        )?;
        let header = self.function_header(&f, &name)?;
        let comment = self.position_comment(&definition.position);

        let mut prologue = Vec::with_capacity(2 * f.vars.len());
        for var in &f.vars {
            let nm = self.local_name(var)?;
            let t = self.signature(var.declaration.type_id)?;
            prologue.push(match self.position_comment(&var.position) {
                Some(position) => format!("var {nm} {t} // {position}"),
                None => format!("var {nm} {t}"),
            });
            prologue.push(format!("_ = {nm}"));
        }

        let mut blocks = Vec::with_capacity(nodes.len());
        for node in &nodes {
            blocks.push(self.block(&f, node)?);
        }

        self.unit.items.push(GoItem::Function(GoFunction {
            name,
            header,
            comment,
            prologue,
            blocks,
        }));
        Ok(())
    }

    /// `func name(params) (r0 T)`. The entry point keeps the C `main`
    /// shape whatever its declared arity.
    fn function_header(&mut self, f: &FunctionContext<'_>, name: &str) -> Result<String> {
        let results = match f.results.as_slice() {
            [] => String::new(),
            [result] => format!(" (r0 {})", self.signature(*result)?),
            _ => bail_unsupported!(
                &f.definition.position,
                "function with {} results",
                f.results.len()
            ),
        };

        if self.is_main(f.definition.name)? && f.arguments.len() != 2 {
            let int32 = self.types.int32();
            let results = match f.results.as_slice() {
                [] => format!(" (r0 {})", self.signature(int32)?),
                _ => results,
            };
            return Ok(format!("func {name}(int32, **int8){results}"));
        }

        let mut params = Vec::with_capacity(f.arguments.len() + 1);
        for (i, ty) in f.arguments.iter().enumerate() {
            let t = self.signature(*ty)?;
            let nm = match f.definition.arguments.get(i) {
                Some(arg) if !arg.is_none() => self.mangler.mangle(self.dict, *arg, false, None)?,
                _ => "_".to_string(),
            };
            params.push(format!("{nm} {t}"));
        }
        if f.variadic {
            params.push("args ...interface{}".to_string());
        }
        Ok(format!("func {name}({}){results}", params.join(", ")))
    }

    /// Mangled name of a local; unnamed temporaries are numbered.
    pub(crate) fn local_name(&mut self, var: &VarInfo) -> Result<String> {
        let declaration = &var.declaration;
        if declaration.name.is_none() {
            return Ok(format!("_{}", declaration.index));
        }
        // Scope 0 is never handed to a nested block, so it keeps a top-level
        // local apart from an unexported object of the same name.
        let scope = match var.scope {
            None if self.object_names.contains(&declaration.name) => Some(0),
            scope => scope,
        };
        self.mangler.mangle(self.dict, declaration.name, false, scope)
    }

    fn label(&mut self, label: Label) -> Result<String> {
        match label {
            Label::Number(n) if n < 0 => bail_internal!("negative label number {n}"),
            Label::Number(n) => Ok(format!("_{n}")),
            Label::Named(name) => self.mangler.mangle(self.dict, name, false, None),
        }
    }

    fn block(&mut self, f: &FunctionContext<'_>, node: &Node) -> Result<GoBlock> {
        let label = match node.label {
            Some(label) => Some(self.label(label)?),
            None => None,
        };

        let mut statements = Vec::with_capacity(node.statements.len());
        for statement in &node.statements {
            match statement {
                Statement::Expr(expr) => statements.extend(self.statement(f, expr)?),
                Statement::Init { index, position } => {
                    let var = f.var(*index)?;
                    if let Some(value) = &var.declaration.value {
                        let nm = self.local_name(var)?;
                        statements.push(self.initializer(
                            &nm,
                            var.declaration.type_id,
                            value,
                            position,
                        )?);
                    }
                }
            }
        }

        let exit = match &node.exit {
            Exit::Fallthrough => GoExit::Fallthrough,
            Exit::Jump(target) => GoExit::Goto(self.label(*target)?),
            Exit::Branch {
                cond,
                target,
                on_zero,
            } => GoExit::Branch {
                condition: self.truth(f, cond, *on_zero)?,
                target: self.label(*target)?,
            },
            Exit::Switch {
                value,
                type_id,
                cases,
                default,
            } => self.switch(f, value, *type_id, cases, *default)?,
            Exit::Return => GoExit::Return,
            Exit::Panic => GoExit::Panic,
        };

        Ok(GoBlock {
            label,
            statements,
            exit,
        })
    }

    fn switch(
        &mut self,
        f: &FunctionContext<'_>,
        value: &graph::Expr,
        type_id: TypeId,
        cases: &[(Value, Label)],
        default: Label,
    ) -> Result<GoExit> {
        let kind = self.kind(type_id)?;
        let mut keyed = Vec::with_capacity(cases.len());
        for (case, target) in cases {
            let raw = match case {
                Value::Int32(v) => *v as i64,
                Value::Int64(v) => *v,
                other => bail_unsupported!(&value.position, "switch case {other:?}"),
            };
            let key = match wrap_integer(kind, raw) {
                Some(key) => key,
                None => bail_unsupported!(&value.position, "switch over {kind:?}"),
            };
            keyed.push((key, *target));
        }
        keyed.sort_by_key(|(key, _)| *key);

        let scrutinee = self.expr(f, value, Use::Value)?;
        let mut rendered = Vec::with_capacity(keyed.len());
        for (key, target) in keyed {
            rendered.push((key.to_string(), self.label(target)?));
        }
        Ok(GoExit::Switch {
            scrutinee,
            cases: rendered,
            default: self.label(default)?,
        })
    }

    /// Assignment of an initializer to `nm`.
    fn initializer(
        &mut self,
        nm: &str,
        ty: TypeId,
        value: &Value,
        position: &Position,
    ) -> Result<String> {
        let types = self.types;
        if let (Type::Array { item, items }, Value::String { id, offset }) = (types.get(ty)?, value)
        {
            let item_kind = types.kind(*item)?;
            if matches!(item_kind, TypeKind::Int8 | TypeKind::Uint8) {
                if *offset < 0 {
                    bail_unsupported!(position, "string initializer at offset {offset}");
                }
                let source = format!("str({})", self.strings.offset(self.dict, *id)? as i64 + offset);
                let destination = if item_kind == TypeKind::Int8 {
                    format!("&{nm}[0]")
                } else {
                    format!("(*int8)(unsafe.Pointer(&{nm}[0]))")
                };
                return Ok(format!(
                    "{}.Xstrncpy({destination}, {source}, {items})",
                    self.options.runtime_qualifier
                ));
            }
        }
        Ok(format!("{nm} = {}", self.value(ty, value, position)?))
    }

    pub(crate) fn data_definition(&mut self, definition: &DataDefinition) -> Result<()> {
        let nm = self.mangler.mangle(
            self.dict,
            definition.name,
            definition.linkage.is_external(),
            None,
        )?;
        let t = self.signature(definition.type_id)?;
        self.unit.push_text(match self.position_comment(&definition.position) {
            Some(position) => format!("var {nm} {t} // {position}"),
            None => format!("var {nm} {t}"),
        });

        let value = match &definition.value {
            Some(value) if !is_zero_value(Some(value)) => value,
            _ => return Ok(()),
        };
        let assignment = self.initializer(&nm, definition.type_id, value, &definition.position)?;
        self.unit
            .push_text(format!("func init() {{\n\t{assignment}\n}}"));
        Ok(())
    }
}
