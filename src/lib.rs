//! # rivnet-rs
//!
//! River-network topology, flow accumulation and subbasin bias correction
//! for river-routing models.
//!
//! This crate provides the building blocks that prepare and post-process
//! data for a routing model:
//! - Reach registry (id ↔ dense index)
//! - Network construction from polyline endpoints or connectivity tables
//! - Topological levels and a deterministic sort
//! - Flow-accumulation operator solving `(I - N) Q = q`
//! - Subbasin bias correction of lateral inflow against gauge observations
//! - Muskingum routing parameters from reach lengths
//! - Table I/O (connectivity, sort, observations, corrections)

pub mod correction;
pub mod io;
pub mod network;
pub mod operator;
pub mod routing;
pub mod types;

// Re-export main types for convenience
pub use correction::{
    BiasCorrection, BiasCorrectionConfig, BiasCorrector, CorrectionError, CorrectionWarning,
    GaugeCorrection, GaugeObservation, GaugeSelection, Subbasin, SubbasinPartition,
};
pub use network::{
    ConnectivityRow, EndpointConvention, NetworkBuilder, NetworkConfig, NetworkError, Point2,
    Reach, ReachGeometry, ReachRegistry, RiverNetwork,
};
pub use operator::{NetworkOperator, OperatorError, ReachSeries};
pub use routing::{MuskingumCoefficients, MuskingumConfig, MuskingumParameters, RoutingError};
pub use types::{GaugeIndex, OUTLET_SENTINEL, ReachId, ReachIndex};

// I/O types
pub use io::{
    TableError, read_connectivity_table, read_correction_table, read_geometry_table,
    read_inflow_series, read_observations, read_sort_table, write_connectivity_table,
    write_correction_table, write_geometry_table, write_inflow_series, write_observations,
    write_sort_table,
};
#[cfg(feature = "shapefile")]
pub use io::{PolylineError, read_reach_polylines};
