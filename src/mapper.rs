//! Mapping construction: canonical match value -> geometry identifier.
//!
//! Built once per run from the geometry source and held in memory for the
//! duration of the load. The mapping is injective by construction: two
//! geometry rows canonicalizing to the same value abort the build before any
//! CSV row is read.

use std::collections::{HashMap, hash_map::Entry};

use log::debug;

use crate::{error::LoadError, matcher::MatchMethod};

#[derive(Debug, Default)]
pub struct GidMapping {
    entries: HashMap<String, i64>,
}

impl GidMapping {
    /// Builds the mapping from `(identifier, raw match value)` pairs.
    ///
    /// Fails fast with [`LoadError::DuplicateMappingKey`] on the first
    /// duplicate canonical value; no partial mapping is returned.
    pub fn build<I>(pairs: I, method: MatchMethod) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let mut entries = HashMap::new();
        for (gid, raw) in pairs {
            let canonical = method.canonicalize(&raw);
            match entries.entry(canonical) {
                Entry::Occupied(existing) => {
                    return Err(LoadError::DuplicateMappingKey {
                        value: existing.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(gid);
                }
            }
        }
        debug!("Built gid mapping with {} entry(ies)", entries.len());
        Ok(GidMapping { entries })
    }

    /// Looks up the identifier for an already-canonicalized value.
    pub fn gid_for(&self, canonical: &str) -> Option<i64> {
        self.entries.get(canonical).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_distinct_value() {
        let pairs = vec![(100, "Alice".to_string()), (101, "Bob".to_string())];
        let mapping = GidMapping::build(pairs, MatchMethod::Str).expect("build mapping");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.gid_for("Alice"), Some(100));
        assert_eq!(mapping.gid_for("Bob"), Some(101));
        assert_eq!(mapping.gid_for("Carol"), None);
    }

    #[test]
    fn duplicate_raw_value_fails_fast() {
        let pairs = vec![(100, "Alice".to_string()), (101, "Alice".to_string())];
        let err = GidMapping::build(pairs, MatchMethod::Str).expect_err("duplicate");
        assert!(matches!(
            err,
            LoadError::DuplicateMappingKey { value } if value == "Alice"
        ));
    }

    #[test]
    fn canonicalization_can_introduce_duplicates() {
        // Distinct raw values that collide after case folding.
        let pairs = vec![(100, "Alice".to_string()), (101, "ALICE".to_string())];
        assert!(GidMapping::build(pairs.clone(), MatchMethod::Str).is_ok());
        let err = GidMapping::build(pairs, MatchMethod::StrLower).expect_err("collision");
        assert!(matches!(
            err,
            LoadError::DuplicateMappingKey { value } if value == "alice"
        ));
    }

    #[test]
    fn empty_source_builds_an_empty_mapping() {
        let mapping = GidMapping::build(Vec::new(), MatchMethod::Str).expect("build mapping");
        assert!(mapping.is_empty());
    }
}
