//! Label space and cross-space mapping types.
//!
//! A [`LabelSpace`] is an ordered, deduplicated set of label identifiers
//! with a dense index assignment; it is built once from dataset metadata and
//! never mutated. A [`ClassMapping`] translates indices of one label space
//! into a different target space; a missing entry means "unmapped" and is
//! never conflated with "mapped to class 0".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Ordered, deduplicated label universe with a bidirectional index mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSpace {
    ids: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelSpace {
    /// Builds a label space from an ordered list of identifiers.
    ///
    /// Index = first position of each id; later duplicates are dropped.
    pub fn from_ordered(ids: impl IntoIterator<Item = String>) -> Self {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for id in ids {
            if !index.contains_key(&id) {
                index.insert(id.clone(), ordered.len());
                ordered.push(id);
            }
        }
        Self {
            ids: ordered,
            index,
        }
    }

    /// Dense index of a label id, if present
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Label id at a dense index, if in range
    pub fn id_of(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the space is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All ids in index order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// Sparse mapping from a local label index to an index in a different,
/// larger target label space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMapping {
    map: HashMap<usize, usize>,
}

impl ClassMapping {
    /// Builds a mapping from (local, target) index pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// Target-space index for a local index. `None` means unmapped, which
    /// is distinct from `Some(0)`.
    pub fn map(&self, local_index: usize) -> Option<usize> {
        self.map.get(&local_index).copied()
    }

    /// Number of mapped entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no entries are mapped
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_space_ordering() {
        let space = LabelSpace::from_ordered(vec![
            "n01629819".to_string(),
            "n01443537".to_string(),
        ]);
        assert_eq!(space.index_of("n01629819"), Some(0));
        assert_eq!(space.index_of("n01443537"), Some(1));
        assert_eq!(space.id_of(1), Some("n01443537"));
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn test_label_space_dedup_keeps_first() {
        let space = LabelSpace::from_ordered(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            "c".to_string(),
        ]);
        assert_eq!(space.len(), 3);
        assert_eq!(space.index_of("a"), Some(0));
        assert_eq!(space.index_of("c"), Some(2));
    }

    #[test]
    fn test_label_space_unknown_id() {
        let space = LabelSpace::from_ordered(vec!["a".to_string()]);
        assert_eq!(space.index_of("missing"), None);
        assert_eq!(space.id_of(5), None);
    }

    #[test]
    fn test_mapping_missing_is_not_zero() {
        let mapping = ClassMapping::from_pairs(vec![(3, 0), (7, 421)]);
        // 3 maps to target class 0; 4 has no mapping at all.
        assert_eq!(mapping.map(3), Some(0));
        assert_eq!(mapping.map(4), None);
        assert_eq!(mapping.map(7), Some(421));
    }
}
