use golower_core::bail_internal;
use golower_core::error::Result;
use golower_core::ir::{
    FunctionDefinition, Op, OpKind, Position, Type, TypeCache, TypeId, VariableDeclaration,
};

use crate::mangle::Scope;

#[derive(Debug, Clone)]
pub struct VarInfo {
    pub declaration: VariableDeclaration,
    pub position: Position,
    pub scope: Scope,
}

/// Per-function state that lives while one body is emitted.
#[derive(Debug)]
pub struct FunctionContext<'a> {
    pub index: usize,
    pub definition: &'a FunctionDefinition,
    pub arguments: Vec<TypeId>,
    pub results: Vec<TypeId>,
    pub variadic: bool,
    pub vars: Vec<VarInfo>,
}

impl<'a> FunctionContext<'a> {
    pub fn new(
        types: &TypeCache,
        index: usize,
        definition: &'a FunctionDefinition,
    ) -> Result<Self> {
        let (arguments, results, variadic) = match types.get(definition.type_id)? {
            Type::Function {
                arguments,
                results,
                variadic,
            } => (arguments.clone(), results.clone(), *variadic),
            other => bail_internal!(
                "function definition {index} has non-function type {other:?}"
            ),
        };

        Ok(Self {
            index,
            definition,
            arguments,
            results,
            variadic,
            vars: variable_table(&definition.body)?,
        })
    }

    pub fn var(&self, index: usize) -> Result<&VarInfo> {
        match self.vars.get(index) {
            Some(var) => Ok(var),
            None => bail_internal!("reference to undeclared local {index}"),
        }
    }
}

/// Every local declared in `body`, indexed by declaration index.
///
/// The outermost `BeginScope` is the function scope; its locals and any
/// declared outside a scope are unscoped. Deeper locals carry the ordinal of
/// the innermost enclosing scope, counted in order of appearance.
pub fn variable_table(body: &[Op]) -> Result<Vec<VarInfo>> {
    let mut vars = Vec::new();
    let mut open: Vec<u32> = Vec::new();
    let mut next_scope = 0u32;

    for op in body {
        match &op.kind {
            OpKind::BeginScope => {
                open.push(next_scope);
                next_scope += 1;
            }
            OpKind::EndScope => {
                if open.pop().is_none() {
                    bail_internal!("{}: unbalanced end of scope", op.position);
                }
            }
            OpKind::VariableDeclaration(declaration) => {
                if declaration.index != vars.len() {
                    bail_internal!(
                        "{}: local {} declared out of order, expected {}",
                        op.position,
                        declaration.index,
                        vars.len()
                    );
                }
                let scope = match open.as_slice() {
                    [] | [_] => None,
                    [.., innermost] => Some(*innermost),
                };
                vars.push(VarInfo {
                    declaration: declaration.clone(),
                    position: op.position.clone(),
                    scope,
                });
            }
            _ => {}
        }
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use golower_core::ir::NameId;

    fn decl(index: usize, name: u32) -> Op {
        Op::new(OpKind::VariableDeclaration(VariableDeclaration {
            index,
            name: NameId(name),
            type_id: TypeId(4),
            value: None,
        }))
    }

    #[test]
    fn nested_blocks_get_their_own_scope() {
        let body = vec![
            Op::new(OpKind::BeginScope),
            decl(0, 1),
            Op::new(OpKind::BeginScope),
            decl(1, 2),
            Op::new(OpKind::EndScope),
            Op::new(OpKind::BeginScope),
            decl(2, 2),
            Op::new(OpKind::BeginScope),
            decl(3, 3),
            Op::new(OpKind::EndScope),
            Op::new(OpKind::EndScope),
            Op::new(OpKind::EndScope),
        ];
        let scopes: Vec<Scope> = variable_table(&body)
            .unwrap()
            .into_iter()
            .map(|var| var.scope)
            .collect();
        assert_eq!(scopes, vec![None, Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(variable_table(&[Op::new(OpKind::EndScope)]).is_err());
        assert!(variable_table(&[decl(1, 1)]).is_err());
    }
}
