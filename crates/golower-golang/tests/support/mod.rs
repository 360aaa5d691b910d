#![allow(dead_code)]

use golower_core::ir::{
    DataDefinition, Dict, FunctionDefinition, HostModel, Linkage, Object, Op, OpKind, Position,
    TranslationUnit, TypeId, Value,
};
use golower_golang::{GenerateOptions, GoBackend, RuntimePackage};
use tracing_subscriber::EnvFilter;

/// Route backend logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn function(
    dict: &Dict,
    name: &str,
    linkage: Linkage,
    type_id: TypeId,
    arguments: &[&str],
    body: Vec<OpKind>,
) -> Object {
    Object::Function(FunctionDefinition {
        name: dict.name(name),
        linkage,
        type_id,
        position: Position::default(),
        arguments: arguments.iter().map(|arg| dict.name(arg)).collect(),
        body: body.into_iter().map(Op::new).collect(),
    })
}

pub fn data(dict: &Dict, name: &str, type_id: TypeId, value: Option<Value>) -> Object {
    Object::Data(DataDefinition {
        name: dict.name(name),
        linkage: Linkage::Internal,
        type_id,
        position: Position::default(),
        value,
    })
}

pub fn store(type_id: TypeId) -> [OpKind; 2] {
    [
        OpKind::Store {
            type_id,
            bits: 0,
            bit_offset: 0,
        },
        OpKind::Drop { type_id },
    ]
}

/// Go text for `unit` on a 64-bit little-endian target, builtins in `crt`.
pub fn lower(dict: &Dict, unit: &TranslationUnit) -> String {
    init_tracing();
    let options = GenerateOptions {
        panic_on_error: false,
        ..GenerateOptions::default()
    };
    let text = GoBackend::new(dict)
        .with_model(HostModel::new(8))
        .with_options(options)
        .generate(unit, &mut RuntimePackage("crt".to_string()))
        .expect("unit lowers");
    String::from_utf8(text).expect("output is UTF-8")
}
