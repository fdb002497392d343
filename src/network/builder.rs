//! Network construction from endpoint geometry or a connectivity table.
//!
//! # Example
//!
//! ```
//! use rivnet_rs::network::{EndpointConvention, NetworkBuilder, Point2, ReachGeometry};
//!
//! // Chain digitized in flow direction: 1 -> 2 -> 3
//! let geometries = vec![
//!     ReachGeometry::from_endpoints(1, Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
//!     ReachGeometry::from_endpoints(2, Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)),
//!     ReachGeometry::from_endpoints(3, Point2::new(2.0, 0.0), Point2::new(3.0, 0.0)),
//! ];
//!
//! let network = NetworkBuilder::new()
//!     .with_convention(EndpointConvention::UpstreamAtStart)
//!     .with_max_upstream(2)
//!     .from_geometry(&geometries)
//!     .unwrap();
//!
//! assert_eq!(network.downstream_of(1).unwrap(), Some(2));
//! assert_eq!(network.outlets(), vec![3]);
//! ```

use serde::{Deserialize, Serialize};

use super::{
    ConnectivityRow, EndpointArena, EndpointConvention, NetworkError, ReachGeometry,
    ReachRegistry, RiverNetwork,
};
use crate::types::{ReachId, ReachIndex};

/// Configuration for network construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Upstream-column width of the connectivity table.
    ///
    /// Raised silently to the observed maximum in-degree if exceeded.
    pub max_upstream: usize,
    /// Which polyline endpoint faces upstream.
    pub convention: EndpointConvention,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_upstream: 4,
            convention: EndpointConvention::UpstreamAtStart,
        }
    }
}

/// Builder for [`RiverNetwork`].
#[derive(Clone, Debug, Default)]
pub struct NetworkBuilder {
    config: NetworkConfig,
}

impl NetworkBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: NetworkConfig) -> Self {
        Self { config }
    }

    /// Set the connectivity table width.
    pub fn with_max_upstream(mut self, max_upstream: usize) -> Self {
        self.config.max_upstream = max_upstream;
        self
    }

    /// Set the endpoint convention.
    pub fn with_convention(mut self, convention: EndpointConvention) -> Self {
        self.config.convention = convention;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Infer connectivity from endpoint geometry.
    ///
    /// Reaches are registered in input order; lengths come from the geometry.
    pub fn from_geometry(&self, geometries: &[ReachGeometry]) -> Result<RiverNetwork, NetworkError> {
        let ids: Vec<ReachId> = geometries.iter().map(|g| g.id).collect();
        let registry = ReachRegistry::build(&ids)?;
        let arena = EndpointArena::new(geometries, self.config.convention);
        let downstream = arena.link(&registry)?;
        tracing::debug!(
            reaches = geometries.len(),
            linked = downstream.iter().filter(|d| d.is_some()).count(),
            "linked reach endpoints"
        );
        let lengths = geometries.iter().map(|g| g.length).collect();
        RiverNetwork::assemble(registry, downstream, lengths, self.config.max_upstream)
    }

    /// Build from connectivity rows.
    ///
    /// A downstream id that is neither `0` nor a listed reach makes the
    /// network disconnected. Rows with a stated upstream list (every row read
    /// from a table, or built with [`ConnectivityRow::with_upstream`]) must
    /// agree with the downstream column, including stated-empty headwaters.
    /// Rows built with [`ConnectivityRow::new`] are not checked.
    /// Lengths default to `0.0` (see [`RiverNetwork::with_lengths`]).
    pub fn from_connectivity(&self, rows: &[ConnectivityRow]) -> Result<RiverNetwork, NetworkError> {
        let ids: Vec<ReachId> = rows.iter().map(|row| row.id).collect();
        let registry = ReachRegistry::build(&ids)?;

        let mut dangling = Vec::new();
        let downstream: Vec<_> = rows
            .iter()
            .map(|row| {
                let down = row.downstream()?;
                let index = registry.get(down);
                if index.is_none() {
                    dangling.push(row.id);
                }
                index
            })
            .collect();
        if !dangling.is_empty() {
            dangling.sort_unstable();
            return Err(NetworkError::Disconnected { ids: dangling });
        }

        check_listed_upstream(rows, &downstream, &registry)?;

        let lengths = vec![0.0; rows.len()];
        RiverNetwork::assemble(registry, downstream, lengths, self.config.max_upstream)
    }
}

fn check_listed_upstream(
    rows: &[ConnectivityRow],
    downstream: &[Option<ReachIndex>],
    registry: &ReachRegistry,
) -> Result<(), NetworkError> {
    let upstream = super::topology::invert_downstream(downstream);
    for (row, derived) in rows.iter().zip(&upstream) {
        if !row.upstream_listed {
            continue;
        }
        let mut listed = row.upstream_ids.clone();
        listed.sort_unstable();
        let mut derived: Vec<ReachId> = derived.iter().map(|&u| registry.id_of(u)).collect();
        derived.sort_unstable();
        if listed != derived {
            return Err(NetworkError::InconsistentUpstream {
                id: row.id,
                listed,
                derived,
            });
        }
    }
    Ok(())
}
