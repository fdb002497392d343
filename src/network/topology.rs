//! Topological levels and the deterministic reach ordering.
//!
//! Levels count hops from the nearest outlet (outlet = 1). They are assigned
//! by a breadth-first worklist seeded with all outlets; since every reach has
//! at most one downstream neighbour, each reach is relaxed at most once.
//! Reaches the worklist never reaches sit on a cycle and make the network
//! invalid.
//!
//! The sort places every reach before its downstream neighbour:
//!
//! ```text
//! rank order = (level descending, id descending)
//! ```
//!
//! The id tie-break has no hydrological meaning. It is fixed so that sort
//! tables written by different runs are byte-identical.

use std::cmp::Reverse;
use std::collections::VecDeque;

use super::{NetworkError, ReachRegistry};
use crate::types::ReachIndex;

/// Invert a downstream relation into per-reach upstream lists.
///
/// Upstream lists are in ascending reach-index order, i.e. input order.
pub fn invert_downstream(downstream: &[Option<ReachIndex>]) -> Vec<Vec<ReachIndex>> {
    let mut upstream = vec![Vec::new(); downstream.len()];
    for (j, down) in downstream.iter().enumerate() {
        if let Some(i) = down {
            upstream[*i].push(ReachIndex::new(j));
        }
    }
    upstream
}

/// Assign topological levels (outlet = 1).
///
/// Fails with [`NetworkError::Disconnected`] if any reach cannot be levelled.
pub fn assign_levels(
    downstream: &[Option<ReachIndex>],
    upstream: &[Vec<ReachIndex>],
    registry: &ReachRegistry,
) -> Result<Vec<u32>, NetworkError> {
    let n = downstream.len();
    let mut levels = vec![0u32; n];
    let mut worklist: VecDeque<ReachIndex> = ReachIndex::iter(n)
        .filter(|&r| downstream[r].is_none())
        .collect();
    for &outlet in &worklist {
        levels[outlet] = 1;
    }

    while let Some(reach) = worklist.pop_front() {
        let next = levels[reach] + 1;
        for &up in &upstream[reach] {
            if levels[up] == 0 {
                levels[up] = next;
                worklist.push_back(up);
            }
        }
    }

    let mut unlevelled: Vec<_> = ReachIndex::iter(n)
        .filter(|&r| levels[r] == 0)
        .map(|r| registry.id_of(r))
        .collect();
    if !unlevelled.is_empty() {
        unlevelled.sort_unstable();
        return Err(NetworkError::Disconnected { ids: unlevelled });
    }
    Ok(levels)
}

/// Reach indices in rank order: `(level descending, id descending)`.
pub fn sort_by_level(levels: &[u32], registry: &ReachRegistry) -> Vec<ReachIndex> {
    let mut order: Vec<ReachIndex> = ReachIndex::iter(levels.len()).collect();
    order.sort_unstable_by_key(|&r| Reverse((levels[r], registry.id_of(r))));
    order
}

/// Invert an order (`rank -> index`) into ranks (`index -> rank`).
pub fn ranks_from_order(order: &[ReachIndex]) -> Vec<usize> {
    let mut ranks = vec![0; order.len()];
    for (rank, &reach) in order.iter().enumerate() {
        ranks[reach] = rank;
    }
    ranks
}
