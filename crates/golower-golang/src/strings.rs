//! The per-unit string literal pool.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use golower_core::error::Result;
use golower_core::ir::{Dict, StringId};

/// Accessor turning a pool offset into a C string pointer.
pub const STR_ACCESSOR: &str =
    "func str(n int) *int8 { return (*int8)(unsafe.Pointer(&strTab[n])) }";

/// All string literals of a unit, NUL terminated, each starting at a
/// multiple of `align`.
#[derive(Debug)]
pub struct StringPool {
    offsets: HashMap<StringId, usize>,
    data: BytesMut,
    align: usize,
}

impl StringPool {
    pub fn new(align: u64) -> Self {
        Self {
            offsets: HashMap::new(),
            data: BytesMut::new(),
            align: align.max(1) as usize,
        }
    }

    /// Offset of `id` in the pool, appending it on first use.
    pub fn offset(&mut self, dict: &Dict, id: StringId) -> Result<usize> {
        if let Some(offset) = self.offsets.get(&id) {
            return Ok(*offset);
        }

        let offset = self.data.len().div_ceil(self.align) * self.align;
        self.data.put_bytes(0, offset - self.data.len());
        self.data.put_slice(&dict.string_bytes(id)?);
        self.data.put_u8(0);
        self.offsets.insert(id, offset);
        Ok(offset)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// `str` accessor and `strTab` table, or nothing for an empty pool.
    pub fn render(&self) -> Option<[String; 2]> {
        if self.is_empty() {
            return None;
        }
        Some([
            STR_ACCESSOR.to_string(),
            format!("var strTab = []byte(\"{}\")", escape_go_bytes(&self.data)),
        ])
    }
}

/// Body of a Go interpreted string literal holding exactly `bytes`.
pub fn escape_go_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b if b < b' ' || b >= 0x7f => out.push_str(&format!("\\x{b:02x}")),
            b => out.push(b as char),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn offsets_are_stable_and_aligned() {
        let dict = Dict::new();
        let hello = dict.string(b"hello");
        let world = dict.string(b"wide world!!!!!!!");
        let empty = dict.string(b"");
        let mut pool = StringPool::new(16);

        let a = pool.offset(&dict, hello).unwrap();
        let b = pool.offset(&dict, world).unwrap();
        let c = pool.offset(&dict, empty).unwrap();
        assert_eq!((a, b, c), (0, 16, 48));
        assert_eq!(pool.offset(&dict, hello).unwrap(), a);
        assert_eq!(pool.len(), 3);

        for (id, offset) in [(hello, a), (world, b), (empty, c)] {
            assert_eq!(offset % 16, 0);
            let tail = &pool.bytes()[offset..];
            let end = tail.iter().position(|b| *b == 0).unwrap();
            assert_eq!(&tail[..end], &*dict.string_bytes(id).unwrap());
        }
    }

    #[test]
    fn escaping_keeps_every_byte() {
        assert_eq!(escape_go_bytes(b"a\"b\\c\n\0\xff"), "a\\\"b\\\\c\\x0a\\x00\\xff");
    }

    #[test]
    fn empty_pool_renders_nothing() {
        assert!(StringPool::new(16).render().is_none());
    }
}
