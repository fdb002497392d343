//! Comma-separated tables exchanged with the routing model.
//!
//! All tables are plain text, one record per line, fields separated by
//! commas. Lines starting with `#` and blank lines are ignored.
//!
//! ## Connectivity
//!
//! ```text
//! # columns: id,downstream_id,upstream_count,up_1,...,up_max
//! 1,3,0,0,0
//! 2,3,0,0,0
//! 3,4,2,1,2
//! 4,0,1,3,0
//! ```
//!
//! ## Sort
//!
//! One `sort_rank` per line, row-aligned with the connectivity table.
//!
//! ## Geometry
//!
//! ```text
//! # columns: id,x,y
//! 2,2.0,3.0
//! 2,2.0,2.0
//! 2,1.0,1.0
//! 3,1.0,1.0
//! 3,1.0,0.0
//! ```
//!
//! Consecutive rows sharing an id are the vertices of that reach, in
//! digitization order.
//!
//! [`ReachGeometry`] keeps only the two endpoints and the polyline length,
//! so [`write_geometry_table`] writes two rows per reach and reading them
//! back yields the straight-line length. Set true lengths with
//! [`RiverNetwork::with_lengths`](crate::network::RiverNetwork::with_lengths)
//! when they matter, e.g. for routing parameters.
//!
//! ## Lateral inflow
//!
//! One time step per line, one value per reach in registry order.
//!
//! ## Observations
//!
//! ```text
//! # columns: gauge_id,reach_id,discharge
//! 08158000,3,18.0
//! ```
//!
//! ## Correction
//!
//! ```text
//! # columns: reach_id,factor
//! 1,1.5
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::correction::{BiasCorrection, GaugeObservation};
use crate::network::{ConnectivityRow, Point2, ReachGeometry};
use crate::operator::ReachSeries;
use crate::types::ReachId;

/// Error type for table files.
#[derive(Debug, Error)]
pub enum TableError {
    /// IO error reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A field could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A record has the wrong shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Non-comment lines with their 1-based line numbers.
fn data_lines(path: &Path) -> Result<Vec<(usize, String)>, TableError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        lines.push((line_num + 1, line.to_string()));
    }
    Ok(lines)
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn parse_field<T>(field: &str, line_num: usize, name: &str) -> Result<T, TableError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    field.parse().map_err(|e| {
        TableError::Parse(format!("Line {}: {} '{}': {}", line_num, name, field, e))
    })
}

fn expect_columns(fields: &[&str], count: usize, line_num: usize) -> Result<(), TableError> {
    if fields.len() != count {
        return Err(TableError::InvalidFormat(format!(
            "Line {}: expected {} columns, got {}",
            line_num,
            count,
            fields.len()
        )));
    }
    Ok(())
}

/// Read a connectivity table.
///
/// Every row carries an explicit `upstream_count`, so the builder checks
/// each row's upstream ids against the downstream column, headwaters
/// (`upstream_count = 0`) included.
pub fn read_connectivity_table(path: &Path) -> Result<Vec<ConnectivityRow>, TableError> {
    let mut rows = Vec::new();
    for (line_num, line) in data_lines(path)? {
        let fields = split_fields(&line)
            .into_iter()
            .map(|f| parse_field::<ReachId>(f, line_num, "reach id"))
            .collect::<Result<Vec<_>, _>>()?;
        let row = ConnectivityRow::from_fields(&fields).ok_or_else(|| {
            TableError::InvalidFormat(format!(
                "Line {}: upstream count does not match the row width",
                line_num
            ))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write a connectivity table, zero-padding upstream lists to `width` columns.
pub fn write_connectivity_table(
    path: &Path,
    rows: &[ConnectivityRow],
    width: usize,
) -> Result<(), TableError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# columns: id,downstream_id,upstream_count,up_1,...,up_{}", width)?;
    for row in rows {
        let fields: Vec<String> = row.to_fields(width).iter().map(|v| v.to_string()).collect();
        writeln!(file, "{}", fields.join(","))?;
    }
    file.flush()?;
    Ok(())
}

/// Read a sort table (one rank per line).
pub fn read_sort_table(path: &Path) -> Result<Vec<usize>, TableError> {
    data_lines(path)?
        .into_iter()
        .map(|(line_num, line)| parse_field(&line, line_num, "sort rank"))
        .collect()
}

/// Write a sort table (one rank per line).
pub fn write_sort_table(path: &Path, ranks: &[usize]) -> Result<(), TableError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# columns: sort_rank")?;
    for rank in ranks {
        writeln!(file, "{}", rank)?;
    }
    file.flush()?;
    Ok(())
}

/// Read reach polylines from an `id,x,y` vertex table.
///
/// An id may only appear in one run of consecutive rows; each run needs at
/// least two vertices.
pub fn read_geometry_table(path: &Path) -> Result<Vec<ReachGeometry>, TableError> {
    let mut runs: Vec<(ReachId, usize, Vec<Point2>)> = Vec::new();
    let mut seen: HashSet<ReachId> = HashSet::new();
    for (line_num, line) in data_lines(path)? {
        let fields = split_fields(&line);
        expect_columns(&fields, 3, line_num)?;
        let id: ReachId = parse_field(fields[0], line_num, "reach id")?;
        let point = Point2::new(
            parse_field(fields[1], line_num, "x")?,
            parse_field(fields[2], line_num, "y")?,
        );
        match runs.last_mut() {
            Some((last, _, vertices)) if *last == id => vertices.push(point),
            _ => {
                if !seen.insert(id) {
                    return Err(TableError::InvalidFormat(format!(
                        "Line {}: vertices of reach {} are not contiguous",
                        line_num, id
                    )));
                }
                runs.push((id, line_num, vec![point]));
            }
        }
    }

    runs.into_iter()
        .map(|(id, line_num, vertices)| {
            ReachGeometry::from_polyline(id, &vertices).map_err(|e| {
                TableError::InvalidFormat(format!("Line {}: {}", line_num, e))
            })
        })
        .collect()
}

/// Write reach polylines as an `id,x,y` table.
///
/// Only the start and end vertex are written; the stored length is not
/// preserved (see the module docs).
pub fn write_geometry_table(path: &Path, geometries: &[ReachGeometry]) -> Result<(), TableError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# columns: id,x,y")?;
    for g in geometries {
        writeln!(file, "{},{},{}", g.id, g.start.x, g.start.y)?;
        writeln!(file, "{},{},{}", g.id, g.end.x, g.end.y)?;
    }
    file.flush()?;
    Ok(())
}

/// Read a lateral inflow series for `n_reaches` reaches.
pub fn read_inflow_series(path: &Path, n_reaches: usize) -> Result<ReachSeries, TableError> {
    let mut steps = Vec::new();
    for (line_num, line) in data_lines(path)? {
        let fields = split_fields(&line);
        expect_columns(&fields, n_reaches, line_num)?;
        let step = fields
            .into_iter()
            .map(|f| parse_field::<f64>(f, line_num, "inflow"))
            .collect::<Result<Vec<_>, _>>()?;
        steps.push(step);
    }
    ReachSeries::from_steps(n_reaches, &steps)
        .map_err(|e| TableError::InvalidFormat(e.to_string()))
}

/// Write a lateral inflow series, one time step per line.
pub fn write_inflow_series(path: &Path, series: &ReachSeries) -> Result<(), TableError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# {} steps x {} reaches", series.n_steps(), series.n_reaches())?;
    for step in series.steps() {
        let fields: Vec<String> = step.iter().map(|v| v.to_string()).collect();
        writeln!(file, "{}", fields.join(","))?;
    }
    file.flush()?;
    Ok(())
}

/// Read gauge observations.
pub fn read_observations(path: &Path) -> Result<Vec<GaugeObservation>, TableError> {
    let mut observations = Vec::new();
    for (line_num, line) in data_lines(path)? {
        let fields = split_fields(&line);
        expect_columns(&fields, 3, line_num)?;
        if fields[0].is_empty() {
            return Err(TableError::InvalidFormat(format!(
                "Line {}: empty gauge id",
                line_num
            )));
        }
        observations.push(GaugeObservation::new(
            fields[0],
            parse_field(fields[1], line_num, "reach id")?,
            parse_field(fields[2], line_num, "discharge")?,
        ));
    }
    Ok(observations)
}

/// Write gauge observations.
pub fn write_observations(path: &Path, observations: &[GaugeObservation]) -> Result<(), TableError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# columns: gauge_id,reach_id,discharge")?;
    for obs in observations {
        writeln!(file, "{},{},{}", obs.gauge_id, obs.reach_id, obs.discharge)?;
    }
    file.flush()?;
    Ok(())
}

/// Read a correction table as `(reach id, factor)` pairs.
pub fn read_correction_table(path: &Path) -> Result<Vec<(ReachId, f64)>, TableError> {
    let mut table = Vec::new();
    for (line_num, line) in data_lines(path)? {
        let fields = split_fields(&line);
        expect_columns(&fields, 2, line_num)?;
        table.push((
            parse_field(fields[0], line_num, "reach id")?,
            parse_field(fields[1], line_num, "factor")?,
        ));
    }
    Ok(table)
}

/// Write the per-reach factors of a correction.
pub fn write_correction_table(path: &Path, correction: &BiasCorrection) -> Result<(), TableError> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# columns: reach_id,factor")?;
    for (id, factor) in correction.factor_table() {
        writeln!(file, "{},{}", id, factor)?;
    }
    file.flush()?;
    Ok(())
}
