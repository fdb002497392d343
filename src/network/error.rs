//! Error type for network construction and lookup.

use thiserror::Error;

use crate::types::ReachId;

/// Maximum number of ids listed in an error message.
const MAX_LISTED_IDS: usize = 10;

/// Error type for registry and network operations.
///
/// Every variant is fatal: no partially built network is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// The same reach id appears more than once in the input.
    #[error("Duplicate reach id: {0}")]
    DuplicateId(ReachId),

    /// Reach id 0 is the outlet sentinel and cannot name a reach.
    #[error("Reach id 0 is reserved for the outlet sentinel")]
    ReservedId,

    /// A lookup by id found no such reach.
    #[error("Unknown reach id: {0}")]
    UnknownId(ReachId),

    /// Reaches that never drain to an outlet (cycle or dangling downstream id).
    #[error("Disconnected network: {} reach(es) do not drain to an outlet: {}", .ids.len(), preview(.ids))]
    Disconnected {
        /// Offending reach ids, ascending
        ids: Vec<ReachId>,
    },

    /// Two reaches start at the same upstream-facing coordinate.
    #[error("Reaches {first} and {second} share the upstream endpoint ({x}, {y})")]
    SharedUpstreamEndpoint {
        /// Reach registered first at the coordinate
        first: ReachId,
        /// Reach that collided with it
        second: ReachId,
        /// Endpoint x-coordinate
        x: f64,
        /// Endpoint y-coordinate
        y: f64,
    },

    /// A connectivity row lists upstream ids that disagree with the downstream relation.
    #[error("Reach {id}: listed upstream ids {listed:?} differ from derived {derived:?}")]
    InconsistentUpstream {
        /// Reach whose row is inconsistent
        id: ReachId,
        /// Upstream ids as listed in the table (sorted)
        listed: Vec<ReachId>,
        /// Upstream ids implied by the downstream column (sorted)
        derived: Vec<ReachId>,
    },

    /// A polyline has fewer than two vertices.
    #[error("Reach {id}: polyline needs at least 2 vertices, got {vertices}")]
    DegenerateGeometry {
        /// Reach id
        id: ReachId,
        /// Number of vertices supplied
        vertices: usize,
    },

    /// A vertex has a NaN or infinite coordinate.
    #[error("Reach {id}: non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate {
        /// Reach id
        id: ReachId,
        /// Vertex x-coordinate
        x: f64,
        /// Vertex y-coordinate
        y: f64,
    },

    /// A per-reach attribute vector does not match the network size.
    #[error("Expected {expected} per-reach values, got {actual}")]
    LengthMismatch {
        /// Number of reaches
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },
}

fn preview(ids: &[ReachId]) -> String {
    if ids.len() <= MAX_LISTED_IDS {
        format!("{ids:?}")
    } else {
        format!("{:?} and {} more", &ids[..MAX_LISTED_IDS], ids.len() - MAX_LISTED_IDS)
    }
}
