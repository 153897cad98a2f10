use crate::table::SymbolTable;
use crate::wrap::UnitShape;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub hash: String,
    pub code: String,
    /// `(name, id)` pairs the unit interned when it was compiled.
    pub interned: Vec<(String, String)>,
}

/// Wrapped output of previously compiled units, keyed by file id.
///
/// An entry is reusable only while the unit's source is unchanged and every
/// id it baked in still maps the same way in the persistent table. Holds no
/// file handles; the build tool decides where the JSON form lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl UnitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(shape: UnitShape, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(match shape {
            UnitShape::Ordinary => b"ordinary\0".as_slice(),
            UnitShape::Core => b"core\0".as_slice(),
        });
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, file_id: &str, hash: &str, table: &SymbolTable) -> Option<&CacheEntry> {
        let entry = self.entries.get(file_id)?;
        if entry.hash != hash {
            return None;
        }
        let stale = entry
            .interned
            .iter()
            .find(|(name, id)| table.get(name) != Some(id.as_str()));
        if let Some((name, _)) = stale {
            tracing::warn!(file = file_id, name = %name, "cached unit refers to a remapped name");
            return None;
        }
        Some(entry)
    }

    /// Cheap pre-check: the source is unchanged, ids not yet verified.
    pub fn has_hash(&self, file_id: &str, hash: &str) -> bool {
        self.entries
            .get(file_id)
            .is_some_and(|entry| entry.hash == hash)
    }

    pub fn set(&mut self, file_id: &str, entry: CacheEntry) {
        self.entries.insert(file_id.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hash: &str, interned: &[(&str, &str)]) -> CacheEntry {
        CacheEntry {
            hash: hash.to_string(),
            code: "function($rt) {\n}".to_string(),
            interned: interned
                .iter()
                .map(|(n, i)| (n.to_string(), i.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_hash_depends_on_shape() {
        let a = UnitCache::compute_hash(UnitShape::Ordinary, "x");
        let b = UnitCache::compute_hash(UnitShape::Core, "x");
        assert_ne!(a, b);
        assert_eq!(a, UnitCache::compute_hash(UnitShape::Ordinary, "x"));
    }

    #[test]
    fn test_hit_requires_matching_hash_and_ids() {
        let mut table = SymbolTable::new();
        table.intern("foo");

        let mut cache = UnitCache::new();
        cache.set("a.src", entry("h1", &[("foo", "a")]));

        assert!(cache.get("a.src", "h1", &table).is_some());
        assert!(cache.get("a.src", "h2", &table).is_none());
        assert!(cache.get("b.src", "h1", &table).is_none());

        // A fresh table no longer knows "foo".
        assert!(cache.get("a.src", "h1", &SymbolTable::new()).is_none());
    }

    #[test]
    fn test_json_round_trip_is_ordered() {
        let mut cache = UnitCache::new();
        cache.set("z.src", entry("h1", &[]));
        cache.set("a.src", entry("h2", &[("foo", "a")]));

        let json = cache.to_json().unwrap();
        assert!(json.find("a.src").unwrap() < json.find("z.src").unwrap());

        let restored = UnitCache::from_json(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(UnitCache::from_json("{\"entries\": 3}").is_err());
    }
}
