//! Name interning shared by the front end and the backends.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::error::{internal, Result};

/// Interned identifier. Id 0 is the empty name and means "no name".
#[derive(
    Debug, Display, From, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct NameId(pub u32);

/// Interned string literal content.
#[derive(
    Debug, Display, From, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct StringId(pub u32);

impl NameId {
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Bidirectional id <-> bytes mapping. Safe to share between threads; ids are
/// handed out densely in interning order.
#[derive(Debug)]
pub struct Dict {
    ids: DashMap<Arc<[u8]>, u32>,
    strings: RwLock<Vec<Arc<[u8]>>>,
}

impl Dict {
    pub fn new() -> Self {
        let empty: Arc<[u8]> = Arc::from(&b""[..]);
        let ids = DashMap::new();
        ids.insert(empty.clone(), 0);
        Self {
            ids,
            strings: RwLock::new(vec![empty]),
        }
    }

    pub fn intern(&self, bytes: &[u8]) -> u32 {
        if let Some(id) = self.ids.get(bytes) {
            return *id;
        }

        let key: Arc<[u8]> = Arc::from(bytes);
        match self.ids.entry(key.clone()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut strings = match self.strings.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let id = strings.len() as u32;
                strings.push(key);
                entry.insert(id);
                id
            }
        }
    }

    pub fn name(&self, text: &str) -> NameId {
        NameId(self.intern(text.as_bytes()))
    }

    pub fn string(&self, bytes: &[u8]) -> StringId {
        StringId(self.intern(bytes))
    }

    pub fn bytes(&self, id: u32) -> Result<Arc<[u8]>> {
        let strings = match self.strings.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        strings
            .get(id as usize)
            .cloned()
            .ok_or_else(|| internal(format!("unknown dictionary id {id}")))
    }

    pub fn name_bytes(&self, id: NameId) -> Result<Arc<[u8]>> {
        self.bytes(id.0)
    }

    pub fn string_bytes(&self, id: StringId) -> Result<Arc<[u8]>> {
        self.bytes(id.0)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_dense() {
        let dict = Dict::new();
        let a = dict.name("alpha");
        let b = dict.name("beta");
        assert_eq!(a, NameId(1));
        assert_eq!(b, NameId(2));
        assert_eq!(dict.name("alpha"), a);
        assert_eq!(&*dict.name_bytes(b).unwrap(), b"beta");
        assert!(dict.name("").is_none());
    }

    #[test]
    fn names_and_strings_share_the_id_space() {
        let dict = Dict::new();
        let name = dict.name("hello");
        let string = dict.string(b"hello");
        assert_eq!(name.0, string.0);
        assert!(dict.bytes(99).is_err());
    }
}
