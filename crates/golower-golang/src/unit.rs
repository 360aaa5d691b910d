//! Emitted Go text, kept as labeled blocks until the structural optimizer has
//! run over every function.

use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoExit {
    Fallthrough,
    Goto(String),
    /// `if <condition> { goto <target> }`, then fall through.
    Branch {
        condition: String,
        target: String,
    },
    Switch {
        scrutinee: String,
        cases: Vec<(String, String)>,
        default: String,
    },
    Return,
    Panic,
}

impl GoExit {
    pub fn falls_through(&self) -> bool {
        matches!(self, GoExit::Fallthrough | GoExit::Branch { .. })
    }

    pub fn targets(&self) -> Vec<&str> {
        match self {
            GoExit::Goto(target) | GoExit::Branch { target, .. } => vec![target.as_str()],
            GoExit::Switch { cases, default, .. } => cases
                .iter()
                .map(|(_, target)| target.as_str())
                .chain(std::iter::once(default.as_str()))
                .collect(),
            GoExit::Fallthrough | GoExit::Return | GoExit::Panic => Vec::new(),
        }
    }

    /// Point every reference to `from` at `to`; returns how many changed.
    pub fn retarget(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        let mut swap = |target: &mut String| {
            if target == from {
                *target = to.to_string();
                changed += 1;
            }
        };
        match self {
            GoExit::Goto(target) | GoExit::Branch { target, .. } => swap(target),
            GoExit::Switch { cases, default, .. } => {
                for (_, target) in cases.iter_mut() {
                    swap(target);
                }
                swap(default);
            }
            GoExit::Fallthrough | GoExit::Return | GoExit::Panic => {}
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoBlock {
    pub label: Option<String>,
    pub statements: Vec<String>,
    pub exit: GoExit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoFunction {
    pub name: String,
    /// `func name(params) results`
    pub header: String,
    pub comment: Option<String>,
    /// Local declarations emitted ahead of the first block.
    pub prologue: Vec<String>,
    pub blocks: Vec<GoBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoItem {
    Function(GoFunction),
    /// Any other top-level text: declarations, `init` bodies, helpers.
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoUnit {
    pub items: Vec<GoItem>,
}

impl GoUnit {
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.items.push(GoItem::Text(text.into()));
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut GoFunction> {
        self.items.iter_mut().filter_map(|item| match item {
            GoItem::Function(function) => Some(function),
            GoItem::Text(_) => None,
        })
    }

    pub fn render_into(&self, out: &mut BytesMut) {
        for item in &self.items {
            match item {
                GoItem::Function(function) => function.render_into(out),
                GoItem::Text(text) => {
                    out.put_slice(text.as_bytes());
                    out.put_u8(b'\n');
                }
            }
        }
    }
}

impl GoFunction {
    pub fn render_into(&self, out: &mut BytesMut) {
        let mut line = |text: &str| {
            out.put_slice(text.as_bytes());
            out.put_u8(b'\n');
        };
        match &self.comment {
            Some(comment) => line(&format!("{} {{ // {comment}", self.header)),
            None => line(&format!("{} {{", self.header)),
        }
        for declaration in &self.prologue {
            line(&format!("\t{declaration}"));
        }
        for block in &self.blocks {
            if let Some(label) = &block.label {
                line(&format!("{label}:"));
            }
            for statement in &block.statements {
                line(&format!("\t{statement}"));
            }
            match &block.exit {
                GoExit::Fallthrough => {}
                GoExit::Goto(target) => line(&format!("\tgoto {target}")),
                GoExit::Branch { condition, target } => {
                    line(&format!("\tif {condition} {{ goto {target} }}"))
                }
                GoExit::Switch {
                    scrutinee,
                    cases,
                    default,
                } => {
                    line(&format!("\tswitch {scrutinee} {{"));
                    for (value, target) in cases {
                        line(&format!("\tcase {value}: goto {target}"));
                    }
                    line(&format!("\tdefault: goto {default}"));
                    line("\t}");
                }
                GoExit::Return => line("\treturn"),
                GoExit::Panic => line("\tpanic(\"abort\")"),
            }
        }
        line("}");
        line("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_labels_and_exits() {
        let function = GoFunction {
            name: "_f".into(),
            header: "func _f() (r0 int32)".into(),
            comment: Some("f.c:1:1".into()),
            prologue: vec!["var _i int32".into(), "_ = _i".into()],
            blocks: vec![
                GoBlock {
                    label: None,
                    statements: vec!["store_4(&_i, int32(1))".into()],
                    exit: GoExit::Branch {
                        condition: "_i == 0".into(),
                        target: "_1".into(),
                    },
                },
                GoBlock {
                    label: Some("_1".into()),
                    statements: vec![],
                    exit: GoExit::Switch {
                        scrutinee: "_i".into(),
                        cases: vec![("1".into(), "_1".into())],
                        default: "_1".into(),
                    },
                },
            ],
        };
        let mut out = BytesMut::new();
        function.render_into(&mut out);
        let expected = "func _f() (r0 int32) { // f.c:1:1
\tvar _i int32
\t_ = _i
\tstore_4(&_i, int32(1))
\tif _i == 0 { goto _1 }
_1:
\tswitch _i {
\tcase 1: goto _1
\tdefault: goto _1
\t}
}

";
        assert_eq!(String::from_utf8(out.to_vec()).unwrap(), expected);
    }

    #[test]
    fn retargeting_counts_every_reference() {
        let mut exit = GoExit::Switch {
            scrutinee: "x".into(),
            cases: vec![("1".into(), "_a".into()), ("2".into(), "_b".into())],
            default: "_a".into(),
        };
        assert_eq!(exit.retarget("_a", "_c"), 2);
        assert_eq!(exit.targets(), vec!["_c", "_b", "_c"]);
        assert!(!exit.falls_through());
    }
}
