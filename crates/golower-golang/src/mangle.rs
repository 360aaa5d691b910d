//! Go identifiers for IR names.
//!
//! Exported names become `X<name>`, unexported ones `_<name>` and block-local
//! ones `_<scope>_<name>`. Bytes that may not appear in a Go identifier, and a
//! leading digit, are written as `Ø` followed by two hex digits. `Ø` is itself
//! outside the kept set, so an escape can never be produced by a raw byte.

use std::collections::HashMap;

use golower_core::bail_internal;
use golower_core::error::Result;
use golower_core::ir::{Dict, NameId};

/// Ordinal of the lexical block a local was declared in. `None` for
/// function-scope locals, arguments and globals.
pub type Scope = Option<u32>;

#[derive(Debug, Default)]
pub struct Mangler {
    cache: HashMap<(NameId, bool, Scope), String>,
}

impl Mangler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mangle(
        &mut self,
        dict: &Dict,
        name: NameId,
        exported: bool,
        scope: Scope,
    ) -> Result<String> {
        let key = (name, exported, scope);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let mangled = mangle_bytes(&dict.name_bytes(name)?, exported, scope)?;
        self.cache.insert(key, mangled.clone());
        Ok(mangled)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

pub fn mangle_bytes(raw: &[u8], exported: bool, scope: Scope) -> Result<String> {
    if raw.is_empty() {
        bail_internal!("cannot mangle an empty name");
    }

    let mut out = String::with_capacity(raw.len() + 4);
    match (exported, scope) {
        (true, Some(scope)) => bail_internal!(
            "exported name {:?} cannot belong to block scope {scope}",
            String::from_utf8_lossy(raw)
        ),
        (true, None) => out.push('X'),
        (false, Some(scope)) => out.push_str(&format!("_{scope}_")),
        (false, None) => out.push('_'),
    }

    for (i, &byte) in raw.iter().enumerate() {
        let keep = byte.is_ascii_alphabetic() || byte == b'_' || (i != 0 && byte.is_ascii_digit());
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("Ø{byte:02x}"));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefixes() {
        assert_eq!(mangle_bytes(b"printf", true, None).unwrap(), "Xprintf");
        assert_eq!(mangle_bytes(b"count", false, None).unwrap(), "_count");
        assert_eq!(mangle_bytes(b"i", false, Some(3)).unwrap(), "_3_i");
    }

    #[test]
    fn odd_bytes_are_escaped() {
        assert_eq!(mangle_bytes(b"a.b", false, None).unwrap(), "_aØ2eb");
        assert_eq!(mangle_bytes(b"3_i", false, None).unwrap(), "_Ø33_i");
        assert_eq!(mangle_bytes(b"x\x7f", true, None).unwrap(), "XxØ7f");
    }

    #[test]
    fn contract_violations_are_internal_errors() {
        assert!(mangle_bytes(b"", false, None).unwrap_err().is_internal());
        assert!(mangle_bytes(b"f", true, Some(0)).unwrap_err().is_internal());
    }

    #[test]
    fn distinct_keys_never_collide() {
        let names: [&[u8]; 8] = [b"a", b"_a", b"0", b"3_a", b"a_3", b"X", b"\xc3\x98", b"a b"];
        let scopes = [None, Some(0), Some(3), Some(30)];
        let mut seen = HashSet::new();
        for name in names {
            for scope in scopes {
                for exported in [false, true] {
                    if exported && scope.is_some() {
                        continue;
                    }
                    let mangled = mangle_bytes(name, exported, scope).unwrap();
                    assert!(seen.insert(mangled.clone()), "collision on {mangled}");
                }
            }
        }
    }

    #[test]
    fn cache_returns_identical_text() {
        let dict = Dict::new();
        let name = dict.name("total");
        let mut mangler = Mangler::new();
        let first = mangler.mangle(&dict, name, false, Some(2)).unwrap();
        let second = mangler.mangle(&dict, name, false, Some(2)).unwrap();
        assert_eq!(first, second);
        assert_eq!(mangler.len(), 1);
        assert_ne!(first, mangler.mangle(&dict, name, false, None).unwrap());
    }
}
