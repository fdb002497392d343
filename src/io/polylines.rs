//! Reach polylines from ESRI shapefiles.
//!
//! Each polyline record becomes one [`ReachGeometry`]; multi-part lines are
//! joined in part order. The reach id is taken from a numeric attribute.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use rivnet_rs::io::read_reach_polylines;
//! use rivnet_rs::network::NetworkBuilder;
//!
//! let geometries = read_reach_polylines(Path::new("riv_pfaf_7.shp"), "COMID")?;
//! let network = NetworkBuilder::new().from_geometry(&geometries)?;
//! ```

use std::path::Path;

use shapefile::dbase::{FieldValue, Record};
use shapefile::{Reader, Shape};
use thiserror::Error;
use tracing::{debug, warn};

use crate::network::{NetworkError, Point2, ReachGeometry};
use crate::types::ReachId;

/// Error type for shapefile reach input.
#[derive(Debug, Error)]
pub enum PolylineError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shapefile parsing error
    #[error("Shapefile error: {0}")]
    Shapefile(String),

    /// Missing or non-integer id attribute
    #[error("Record {record}: field '{field}' is missing or not a positive integer")]
    InvalidId { record: usize, field: String },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl From<shapefile::Error> for PolylineError {
    fn from(e: shapefile::Error) -> Self {
        PolylineError::Shapefile(e.to_string())
    }
}

/// Read every polyline of a shapefile as a reach.
///
/// Non-polyline shapes are skipped with a warning.
///
/// # Arguments
/// * `path` - Path to the shapefile (.shp, with its .dbf alongside)
/// * `id_field` - Attribute holding the reach id
pub fn read_reach_polylines<P: AsRef<Path>>(
    path: P,
    id_field: &str,
) -> Result<Vec<ReachGeometry>, PolylineError> {
    let mut reader = Reader::from_path(path)?;
    let mut geometries = Vec::new();

    for (record_num, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let vertices: Vec<Point2> = match shape {
            Shape::Polyline(line) => line
                .parts()
                .iter()
                .flatten()
                .map(|p| Point2::new(p.x, p.y))
                .collect(),
            Shape::PolylineZ(line) => line
                .parts()
                .iter()
                .flatten()
                .map(|p| Point2::new(p.x, p.y))
                .collect(),
            Shape::PolylineM(line) => line
                .parts()
                .iter()
                .flatten()
                .map(|p| Point2::new(p.x, p.y))
                .collect(),
            other => {
                warn!(record = record_num, shape = ?other.shapetype(), "skipping non-polyline shape");
                continue;
            }
        };
        let id = record_id(&record, id_field).ok_or_else(|| PolylineError::InvalidId {
            record: record_num,
            field: id_field.to_string(),
        })?;
        geometries.push(ReachGeometry::from_polyline(id, &vertices)?);
    }

    debug!(reaches = geometries.len(), "read reach polylines");
    Ok(geometries)
}

fn record_id(record: &Record, field: &str) -> Option<ReachId> {
    let value = match record.get(field)? {
        FieldValue::Numeric(Some(v)) => *v,
        FieldValue::Double(v) => *v,
        FieldValue::Float(Some(v)) => f64::from(*v),
        FieldValue::Integer(v) => f64::from(*v),
        FieldValue::Character(Some(s)) => return s.trim().parse().ok(),
        _ => return None,
    };
    (value.fract() == 0.0 && value >= 1.0 && value <= ReachId::MAX as f64)
        .then_some(value as ReachId)
}
