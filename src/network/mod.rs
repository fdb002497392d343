//! River network topology.
//!
//! This module provides:
//! - **Registry**: canonical id ↔ index mapping ([`ReachRegistry`])
//! - **Geometry**: endpoint storage and exact-match linking ([`EndpointArena`])
//! - **Builder**: network construction from geometry or a connectivity table
//! - **Topology**: levels (hops to the outlet) and the deterministic sort
//!
//! A [`RiverNetwork`] is immutable once built. Construction either succeeds
//! completely or fails with a [`NetworkError`].
//!
//! # Example
//!
//! ```
//! use rivnet_rs::network::{ConnectivityRow, NetworkBuilder};
//!
//! // Y-shaped network: 1 and 2 join into 3, which drains to outlet 4
//! let rows = vec![
//!     ConnectivityRow::new(1, 3),
//!     ConnectivityRow::new(2, 3),
//!     ConnectivityRow::new(3, 4),
//!     ConnectivityRow::new(4, 0),
//! ];
//! let network = NetworkBuilder::new().from_connectivity(&rows).unwrap();
//!
//! assert_eq!(network.upstream_of(3).unwrap(), vec![1, 2]);
//! assert_eq!(network.sort_order(), vec![2, 1, 3, 4]);
//! ```

mod builder;
mod connectivity;
mod error;
mod geometry;
mod registry;
pub mod topology;

pub use builder::{NetworkBuilder, NetworkConfig};
pub use connectivity::ConnectivityRow;
pub use error::NetworkError;
pub use geometry::{EndpointArena, EndpointConvention, Point2, ReachGeometry};
pub use registry::ReachRegistry;

use serde::{Deserialize, Serialize};

use crate::types::{OUTLET_SENTINEL, ReachId, ReachIndex};

/// A single reach with its derived topology.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reach {
    /// Reach id
    pub id: ReachId,
    /// Downstream reach id (`None` for an outlet)
    pub downstream: Option<ReachId>,
    /// Directly upstream reach ids, in input order
    pub upstream: Vec<ReachId>,
    /// Reach length (feeds the travel-time parameter)
    pub length: f64,
    /// Hops from the outlet, outlet = 1
    pub topo_level: u32,
    /// Position in the deterministic sort
    pub sort_rank: usize,
}

/// A validated, immutable river network.
#[derive(Clone, Debug)]
pub struct RiverNetwork {
    registry: ReachRegistry,
    reaches: Vec<Reach>,
    downstream: Vec<Option<ReachIndex>>,
    upstream: Vec<Vec<ReachIndex>>,
    /// Reach indices by rank
    order: Vec<ReachIndex>,
    max_upstream: usize,
}

impl RiverNetwork {
    /// Derive upstream lists, levels and sort from a downstream relation.
    pub(crate) fn assemble(
        registry: ReachRegistry,
        downstream: Vec<Option<ReachIndex>>,
        lengths: Vec<f64>,
        max_upstream: usize,
    ) -> Result<Self, NetworkError> {
        let upstream = topology::invert_downstream(&downstream);
        let levels = topology::assign_levels(&downstream, &upstream, &registry)?;
        let order = topology::sort_by_level(&levels, &registry);
        let ranks = topology::ranks_from_order(&order);

        let in_degree = upstream.iter().map(Vec::len).max().unwrap_or(0);
        let max_upstream = if in_degree > max_upstream {
            tracing::debug!(
                configured = max_upstream,
                observed = in_degree,
                "raising max_upstream to observed in-degree"
            );
            in_degree
        } else {
            max_upstream
        };

        let reaches = registry
            .iter()
            .map(|(r, id)| Reach {
                id,
                downstream: downstream[r].map(|d| registry.id_of(d)),
                upstream: upstream[r].iter().map(|&u| registry.id_of(u)).collect(),
                length: lengths[r],
                topo_level: levels[r],
                sort_rank: ranks[r],
            })
            .collect();

        let network = Self {
            registry,
            reaches,
            downstream,
            upstream,
            order,
            max_upstream,
        };
        tracing::info!(
            reaches = network.len(),
            outlets = network.outlets().len(),
            max_level = network.max_level(),
            "river network assembled"
        );
        Ok(network)
    }

    /// Number of reaches.
    pub fn len(&self) -> usize {
        self.reaches.len()
    }

    /// Whether the network has no reaches.
    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }

    /// The id ↔ index registry.
    pub fn registry(&self) -> &ReachRegistry {
        &self.registry
    }

    /// All reaches in registry (input) order.
    pub fn reaches(&self) -> &[Reach] {
        &self.reaches
    }

    /// Reach by id.
    pub fn reach(&self, id: ReachId) -> Result<&Reach, NetworkError> {
        Ok(&self.reaches[self.registry.index_of(id)?])
    }

    /// Reach by index.
    pub fn reach_at(&self, index: ReachIndex) -> &Reach {
        &self.reaches[index]
    }

    /// Downstream neighbour of a reach index.
    #[inline]
    pub fn downstream_index(&self, index: ReachIndex) -> Option<ReachIndex> {
        self.downstream[index]
    }

    /// Direct upstream neighbours of a reach index.
    #[inline]
    pub fn upstream_indices(&self, index: ReachIndex) -> &[ReachIndex] {
        &self.upstream[index]
    }

    /// Reach indices in rank order (every reach before its downstream).
    pub fn order(&self) -> &[ReachIndex] {
        &self.order
    }

    /// Downstream id of a reach.
    pub fn downstream_of(&self, id: ReachId) -> Result<Option<ReachId>, NetworkError> {
        Ok(self.reach(id)?.downstream)
    }

    /// Direct upstream ids of a reach.
    pub fn upstream_of(&self, id: ReachId) -> Result<Vec<ReachId>, NetworkError> {
        Ok(self.reach(id)?.upstream.clone())
    }

    /// Outlet ids in registry order.
    pub fn outlets(&self) -> Vec<ReachId> {
        self.reaches
            .iter()
            .filter(|r| r.downstream.is_none())
            .map(|r| r.id)
            .collect()
    }

    /// Highest topological level (0 for an empty network).
    pub fn max_level(&self) -> u32 {
        self.reaches.iter().map(|r| r.topo_level).max().unwrap_or(0)
    }

    /// Upstream-column width of the connectivity table.
    pub fn max_upstream(&self) -> usize {
        self.max_upstream
    }

    /// Reach ids in rank order.
    pub fn sort_order(&self) -> Vec<ReachId> {
        self.order.iter().map(|&r| self.registry.id_of(r)).collect()
    }

    /// Sort table: `sort_rank` per reach, row-aligned with [`Self::connectivity_rows`].
    pub fn sort_table(&self) -> Vec<usize> {
        self.reaches.iter().map(|r| r.sort_rank).collect()
    }

    /// Connectivity table rows in registry order.
    pub fn connectivity_rows(&self) -> Vec<ConnectivityRow> {
        self.reaches
            .iter()
            .map(|r| {
                ConnectivityRow::new(r.id, r.downstream.unwrap_or(OUTLET_SENTINEL))
                    .with_upstream(r.upstream.clone())
            })
            .collect()
    }

    /// Every reach draining through `id` (including `id`), in rank order.
    pub fn upstream_basin(&self, id: ReachId) -> Result<Vec<ReachId>, NetworkError> {
        let root = self.registry.index_of(id)?;
        let mut members = Vec::new();
        let mut stack = vec![root];
        while let Some(reach) = stack.pop() {
            members.push(reach);
            stack.extend_from_slice(&self.upstream[reach]);
        }
        members.sort_unstable_by_key(|&r| self.reaches[r].sort_rank);
        Ok(members.into_iter().map(|r| self.registry.id_of(r)).collect())
    }

    /// Replace reach lengths (registry order).
    pub fn with_lengths(mut self, lengths: &[f64]) -> Result<Self, NetworkError> {
        if lengths.len() != self.len() {
            return Err(NetworkError::LengthMismatch {
                expected: self.len(),
                actual: lengths.len(),
            });
        }
        for (reach, &length) in self.reaches.iter_mut().zip(lengths) {
            reach.length = length;
        }
        Ok(self)
    }
}
