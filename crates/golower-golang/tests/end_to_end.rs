mod support;

use golower_core::error::Result;
use golower_core::ir::{
    Dict, HostModel, Label, LabelKind, Linkage, MemoryModel, OpKind, TranslationUnit, TypeCache,
    TypeId, Value,
};
use golower_golang::{GenerateOptions, GoBackend, RuntimePackage};
use pretty_assertions::assert_eq;

use support::{data, function, lower, store};

const BOOL2INT_LINE: &str = "func bool2int(b bool) int32 { if b { return 1 }; return 0 }";
const STR_LINE: &str = "func str(n int) *int8 { return (*int8)(unsafe.Pointer(&strTab[n])) }";

/// `if a == 0 { goto L1 }; r = 1; L1: return`
fn guarded_store(dict: &Dict, types: &mut TypeCache, name: &str) -> golower_core::ir::Object {
    let int32 = types.int32();
    let int32_ptr = types.pointer_to(int32);
    let ty = types.function(vec![int32], vec![int32], false);
    let mut body = vec![
        OpKind::Argument {
            index: 0,
            type_id: int32,
            address: false,
        },
        OpKind::Jz {
            label: Label::Number(1),
            logical: false,
        },
        OpKind::Result {
            index: 0,
            type_id: int32_ptr,
            address: true,
        },
        OpKind::Const32 {
            type_id: int32,
            value: 1,
        },
    ];
    body.extend(store(int32));
    body.extend([
        OpKind::Label {
            label: Label::Number(1),
            kind: LabelKind::Plain,
        },
        OpKind::Return,
    ]);
    function(dict, name, Linkage::External, ty, &["a"], body)
}

#[test]
fn forward_jump_targets_a_later_label() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let f = guarded_store(&dict, &mut types, "f");
    let unit = TranslationUnit {
        types,
        objects: vec![f],
    };
    let expected = format!(
        "func Xf(_a int32) (r0 int32) {{
\tif _a == 0 {{ goto _1 }}
\tstore_4(&r0, int32(1))
_1:
\treturn
}}

{BOOL2INT_LINE}
func store_4(p *int32, v int32) int32 {{ *p = v; return v }}
"
    );
    assert_eq!(lower(&dict, &unit), expected);
}

#[test]
fn output_is_deterministic() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let int8 = types.int8();
    let buf = types.array_of(int8, 8);
    let greeting = dict.string(b"hello");
    let f = guarded_store(&dict, &mut types, "f");
    let g = guarded_store(&dict, &mut types, "g");
    let unit = TranslationUnit {
        types,
        objects: vec![
            data(
                &dict,
                "buf",
                buf,
                Some(Value::String {
                    id: greeting,
                    offset: 0,
                }),
            ),
            f,
            g,
        ],
    };
    assert_eq!(lower(&dict, &unit), lower(&dict, &unit));
}

#[test]
fn helpers_are_emitted_once_per_type() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let f = guarded_store(&dict, &mut types, "f");
    let g = guarded_store(&dict, &mut types, "g");
    let unit = TranslationUnit {
        types,
        objects: vec![f, g],
    };
    let text = lower(&dict, &unit);
    assert_eq!(text.matches("func store_4(").count(), 1);
    assert_eq!(text.matches("\tstore_4(&r0, int32(1))").count(), 2);
    assert_eq!(text.matches(BOOL2INT_LINE).count(), 1);
}

#[test]
fn zero_global_has_no_initializer() {
    let dict = Dict::new();
    let types = TypeCache::new();
    let int32 = types.int32();
    let unit = TranslationUnit {
        objects: vec![data(&dict, "z", int32, Some(Value::Int32(0)))],
        types,
    };
    assert_eq!(lower(&dict, &unit), format!("var _z int32\n{BOOL2INT_LINE}\n"));
}

#[test]
fn string_buffers_are_filled_by_strncpy() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let signed = types.array_of(types.int8(), 16);
    let unsigned = types.array_of(types.uint8(), 4);
    let hello = dict.string(b"hello");
    let value = Some(Value::String {
        id: hello,
        offset: 0,
    });
    let unit = TranslationUnit {
        objects: vec![
            data(&dict, "buf", signed, value.clone()),
            data(&dict, "raw", unsigned, value),
        ],
        types,
    };
    let expected = format!(
        "var _buf [16]int8
func init() {{
\tcrt.Xstrncpy(&_buf[0], str(0), 16)
}}
var _raw [4]uint8
func init() {{
\tcrt.Xstrncpy((*int8)(unsafe.Pointer(&_raw[0])), str(0), 4)
}}
{BOOL2INT_LINE}
{STR_LINE}
var strTab = []byte(\"hello\\x00\")
"
    );
    assert_eq!(lower(&dict, &unit), expected);
}

#[test]
fn logical_and_yields_an_int() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let int32 = types.int32();
    let int32_ptr = types.pointer_to(int32);
    let ty = types.function(vec![int32, int32], vec![int32], false);
    let argument = |index| OpKind::Argument {
        index,
        type_id: int32,
        address: false,
    };
    let mut body = vec![
        OpKind::Result {
            index: 0,
            type_id: int32_ptr,
            address: true,
        },
        argument(0),
        OpKind::Jz {
            label: Label::Number(1),
            logical: true,
        },
        argument(1),
        OpKind::Label {
            label: Label::Number(1),
            kind: LabelKind::LogicalAnd,
        },
    ];
    body.extend(store(int32));
    body.push(OpKind::Return);
    let unit = TranslationUnit {
        objects: vec![function(&dict, "both", Linkage::Internal, ty, &["a", "b"], body)],
        types,
    };
    let text = lower(&dict, &unit);
    assert!(
        text.contains("\tstore_4(&r0, bool2int(_a != 0 && _b != 0))\n"),
        "{text}"
    );
}

#[test]
fn aggregate_and_pointer_initializers() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let int32 = types.int32();
    let pair = types.struct_of(vec![int32, types.float64()]);
    let int32_ptr = types.pointer_to(int32);
    let x = dict.name("x");
    let address = |offset| Value::Address {
        index: 0,
        name: x,
        linkage: Linkage::Internal,
        offset,
    };
    let unit = TranslationUnit {
        objects: vec![
            data(&dict, "x", int32, None),
            data(&dict, "p", int32_ptr, Some(address(0))),
            data(&dict, "q", int32_ptr, Some(address(4))),
            data(
                &dict,
                "s",
                pair,
                Some(Value::Composite(vec![Some(Value::Int32(1)), None])),
            ),
        ],
        types,
    };
    let text = lower(&dict, &unit);
    for line in [
        "\t_p = &_x",
        "\t_q = (*int32)(unsafe.Pointer(uintptr(unsafe.Pointer(&_x)) + 4))",
        "var _s struct{X0 int32; X1 float64}",
        "\t_s = struct{X0 int32; X1 float64}{X0: int32(1)}",
    ] {
        assert!(text.lines().any(|l| l == line), "missing {line:?} in\n{text}");
    }
}

/// Host layout with the bytes of every scalar reversed.
struct BigEndian(HostModel);

impl MemoryModel for BigEndian {
    fn pointer_size(&self) -> u64 {
        self.0.pointer_size()
    }

    fn size_of(&self, types: &TypeCache, id: TypeId) -> Result<u64> {
        self.0.size_of(types, id)
    }

    fn align_of(&self, types: &TypeCache, id: TypeId) -> Result<u64> {
        self.0.align_of(types, id)
    }

    fn big_endian(&self) -> bool {
        true
    }
}

#[test]
fn union_initializers_follow_target_byte_order() {
    let dict = Dict::new();
    let mut types = TypeCache::new();
    let u = types.union_of(vec![types.int32(), types.float32()]);
    let unit = TranslationUnit {
        objects: vec![data(
            &dict,
            "u",
            u,
            Some(Value::Composite(vec![Some(Value::Int32(0x0102_0304))])),
        )],
        types,
    };
    let t = "struct{_ [0]struct{X0 int32; X1 float32}; U [4]byte}";

    let little = lower(&dict, &unit);
    assert!(little.contains(&format!("\t_u = {t}{{U: [4]byte{{4, 3, 2, 1}}}}\n")), "{little}");

    let options = GenerateOptions {
        panic_on_error: false,
        ..GenerateOptions::default()
    };
    let big = GoBackend::new(&dict)
        .with_model(BigEndian(HostModel::new(8)))
        .with_options(options)
        .generate(&unit, &mut RuntimePackage("crt".into()))
        .unwrap();
    let big = String::from_utf8(big).unwrap();
    assert!(big.contains(&format!("\t_u = {t}{{U: [4]byte{{1, 2, 3, 4}}}}\n")), "{big}");
}
