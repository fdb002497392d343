//! I/O utilities for the tables exchanged with the routing model.
//!
//! This module provides:
//! - **Connectivity tables**: `id, downstream_id, upstream_count, up_1 … up_max`
//! - **Sort tables**: `sort_rank` per connectivity row
//! - **Geometry tables**: `id, x, y` polyline vertices per reach
//! - **Inflow series**: lateral inflow per time step and reach
//! - **Observation tables**: mean discharge per gauge
//! - **Correction tables**: correction factor per reach
//! - **Shapefile polylines**: reach geometry from ESRI shapefiles (requires `shapefile` feature)
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use rivnet_rs::correction::BiasCorrector;
//! use rivnet_rs::io::{read_connectivity_table, read_observations, write_correction_table};
//! use rivnet_rs::network::NetworkBuilder;
//!
//! let rows = read_connectivity_table(Path::new("connectivity.csv"))?;
//! let network = NetworkBuilder::new().from_connectivity(&rows)?;
//! let obs = read_observations(Path::new("gauges.csv"))?;
//! let correction = BiasCorrector::new(&network).correct(&obs, &runoff_mean)?;
//! write_correction_table(Path::new("correction.csv"), &correction)?;
//! ```

mod tables;

#[cfg(feature = "shapefile")]
mod polylines;

pub use tables::{
    TableError, read_connectivity_table, read_correction_table, read_geometry_table,
    read_inflow_series, read_observations, read_sort_table, write_connectivity_table,
    write_correction_table, write_geometry_table, write_inflow_series, write_observations,
    write_sort_table,
};

#[cfg(feature = "shapefile")]
pub use polylines::{PolylineError, read_reach_polylines};
