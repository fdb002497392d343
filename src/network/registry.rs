//! Canonical id ↔ index mapping over one network instance.
//!
//! Callers address reaches by their external id. Internally every per-reach
//! vector is laid out in input order, and the registry converts between the
//! two. It is immutable once built.

use std::collections::HashMap;

use super::NetworkError;
use crate::types::{ReachId, ReachIndex};

/// Immutable bidirectional map between reach ids and reach indices.
///
/// # Example
///
/// ```
/// use rivnet_rs::network::ReachRegistry;
/// use rivnet_rs::types::ReachIndex;
///
/// let registry = ReachRegistry::build(&[30, 10, 20]).unwrap();
/// assert_eq!(registry.index_of(10).unwrap(), ReachIndex::new(1));
/// assert_eq!(registry.id_of(ReachIndex::new(2)), 20);
/// ```
#[derive(Clone, Debug)]
pub struct ReachRegistry {
    ids: Vec<ReachId>,
    index: HashMap<ReachId, ReachIndex>,
}

impl ReachRegistry {
    /// Build a registry from ids in input order.
    ///
    /// Fails on id `0` (the outlet sentinel) and on any repeated id.
    pub fn build(ids: &[ReachId]) -> Result<Self, NetworkError> {
        let mut index = HashMap::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            if id == 0 {
                return Err(NetworkError::ReservedId);
            }
            if index.insert(id, ReachIndex::new(i)).is_some() {
                return Err(NetworkError::DuplicateId(id));
            }
        }
        Ok(Self {
            ids: ids.to_vec(),
            index,
        })
    }

    /// Index of a reach id.
    pub fn index_of(&self, id: ReachId) -> Result<ReachIndex, NetworkError> {
        self.get(id).ok_or(NetworkError::UnknownId(id))
    }

    /// Index of a reach id, or `None` if absent.
    #[inline]
    pub fn get(&self, id: ReachId) -> Option<ReachIndex> {
        self.index.get(&id).copied()
    }

    /// Id at a reach index.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    pub fn id_of(&self, index: ReachIndex) -> ReachId {
        self.ids[index]
    }

    /// Whether the registry contains `id`.
    pub fn contains(&self, id: ReachId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of reaches.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All ids in index order.
    pub fn ids(&self) -> &[ReachId] {
        &self.ids
    }

    /// Iterate over `(index, id)` pairs in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (ReachIndex, ReachId)> + '_ {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (ReachIndex::new(i), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_lookup() {
        let registry = ReachRegistry::build(&[101, 205, 33]).unwrap();
        for (idx, id) in registry.iter() {
            assert_eq!(registry.index_of(id).unwrap(), idx);
            assert_eq!(registry.id_of(idx), id);
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = ReachRegistry::build(&[1, 2, 1]).unwrap_err();
        assert_eq!(err, NetworkError::DuplicateId(1));
    }

    #[test]
    fn test_zero_id_rejected() {
        let err = ReachRegistry::build(&[3, 0]).unwrap_err();
        assert_eq!(err, NetworkError::ReservedId);
    }

    #[test]
    fn test_unknown_id() {
        let registry = ReachRegistry::build(&[1, 2]).unwrap();
        assert_eq!(registry.index_of(9), Err(NetworkError::UnknownId(9)));
        assert!(!registry.contains(9));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ReachRegistry::build(&[]).unwrap();
        assert!(registry.is_empty());
    }
}
