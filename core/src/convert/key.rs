//! Deduplication keys for vertex conversion.

use std::cell::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::source::AccessorId;

/// The source accessors feeding each layout attribute of one primitive,
/// in layout declaration order.
///
/// Two primitives with equal keys read exactly the same source data, so the
/// second one reuses the first one's converted range. Equality compares the
/// accessor ids; the hash is computed once and cached.
#[derive(Debug, Clone)]
pub struct ConversionKey {
    accessor_ids: Vec<Option<AccessorId>>,
    hash: OnceCell<u64>,
}

impl ConversionKey {
    pub fn new(accessor_ids: Vec<Option<AccessorId>>) -> Self {
        Self {
            accessor_ids,
            hash: OnceCell::new(),
        }
    }

    /// Accessor per attribute; `None` where the primitive lacks it.
    pub fn accessor_ids(&self) -> &[Option<AccessorId>] {
        &self.accessor_ids
    }

    fn cached_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.accessor_ids.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for ConversionKey {
    fn eq(&self, other: &Self) -> bool {
        self.accessor_ids == other.accessor_ids
    }
}

impl Eq for ConversionKey {}

impl Hash for ConversionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash());
    }
}

/// Where a converted vertex set starts in each destination buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Byte offset per destination buffer.
    pub offsets: Vec<usize>,
    /// Number of vertices converted.
    pub vertex_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_equal_ids_are_equal_keys() {
        let a = ConversionKey::new(vec![Some(0), Some(1), None]);
        let b = ConversionKey::new(vec![Some(0), Some(1), None]);
        let c = ConversionKey::new(vec![Some(0), Some(2), None]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.cached_hash(), b.cached_hash());
    }

    #[test]
    fn test_absent_attribute_differs_from_present() {
        let a = ConversionKey::new(vec![Some(0), None]);
        let b = ConversionKey::new(vec![Some(0), Some(0)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_map_lookup() {
        let mut map = HashMap::new();
        map.insert(
            ConversionKey::new(vec![Some(3), Some(4)]),
            ConversionResult {
                offsets: vec![96],
                vertex_count: 4,
            },
        );
        let hit = map.get(&ConversionKey::new(vec![Some(3), Some(4)]));
        assert_eq!(hit.map(|r| r.offsets[0]), Some(96));
        assert!(map.get(&ConversionKey::new(vec![Some(3)])).is_none());
    }
}
