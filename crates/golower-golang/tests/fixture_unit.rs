mod support;

use golower_core::ir::{Dict, TranslationUnit};
use pretty_assertions::assert_eq;

fn load(json: &str) -> (Dict, TranslationUnit) {
    let mut document: serde_json::Value = serde_json::from_str(json).expect("fixture parses");
    let dict = Dict::new();
    for name in document["names"].as_array().expect("names list") {
        dict.name(name.as_str().expect("name is a string"));
    }
    let unit = serde_json::from_value(document["unit"].take()).expect("unit deserializes");
    (dict, unit)
}

#[test]
fn counter_fixture_lowers() {
    let (dict, unit) = load(include_str!("fixtures/counter.json"));
    let expected = "var Xcounter int32 // counter.c:1:5
func init() {
\tXcounter = int32(7)
}
func Xbump() { // counter.c:3:6
\tpostInc_4(&Xcounter, int32(1))
\treturn
}

func bool2int(b bool) int32 { if b { return 1 }; return 0 }
func postInc_4(p *int32, d int32) int32 { v := *p; *p += d; return v }
";
    assert_eq!(support::lower(&dict, &unit), expected);
}

#[test]
fn fixture_survives_a_serde_round_trip() {
    let (dict, unit) = load(include_str!("fixtures/counter.json"));
    let json = serde_json::to_string(&unit).unwrap();
    let reloaded: TranslationUnit = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded, unit);
    assert_eq!(support::lower(&dict, &reloaded), support::lower(&dict, &unit));
}
