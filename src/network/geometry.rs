//! Reach geometry and endpoint-based connectivity inference.
//!
//! Connectivity is recovered from polyline endpoints: a reach drains into
//! the reach whose upstream-facing endpoint coincides with its own
//! downstream-facing endpoint. Coincidence is exact bit-pattern equality of
//! both coordinates (with `-0.0` folded onto `0.0`); there is no distance
//! tolerance. Endpoints that differ in the last bit (a common artefact of
//! reprojection or simplification in upstream GIS tools) are treated as
//! disconnected, which turns the reach into an outlet. NaN and infinite
//! coordinates are rejected before any matching.
//!
//! Which endpoint faces upstream depends on how the source data was
//! digitized and is supplied by the caller through [`EndpointConvention`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use super::{NetworkError, ReachRegistry};
use crate::types::{ReachId, ReachIndex};

/// A 2D coordinate in the projection of the source hydrography.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// Easting / longitude
    pub x: f64,
    /// Northing / latitude
    pub y: f64,
}

impl Point2 {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Hash key with exact-match semantics.
    fn key(&self) -> CoordKey {
        CoordKey(canonical_bits(self.x), canonical_bits(self.y))
    }
}

/// Bit-pattern key of a coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CoordKey(u64, u64);

#[inline]
fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// Which polyline endpoint faces upstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointConvention {
    /// Polylines are digitized in flow direction: first vertex is upstream.
    #[default]
    UpstreamAtStart,
    /// Polylines are digitized against flow: last vertex is upstream.
    UpstreamAtEnd,
}

impl EndpointConvention {
    /// Split `(start, end)` into `(upstream, downstream)` endpoints.
    #[inline]
    pub fn orient(self, start: Point2, end: Point2) -> (Point2, Point2) {
        match self {
            EndpointConvention::UpstreamAtStart => (start, end),
            EndpointConvention::UpstreamAtEnd => (end, start),
        }
    }
}

/// Endpoint geometry of one reach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReachGeometry {
    /// Reach id
    pub id: ReachId,
    /// First vertex of the polyline
    pub start: Point2,
    /// Last vertex of the polyline
    pub end: Point2,
    /// Reach length in coordinate units
    pub length: f64,
}

impl ReachGeometry {
    /// Geometry from two endpoints; length is the straight-line distance.
    pub fn from_endpoints(id: ReachId, start: Point2, end: Point2) -> Self {
        Self {
            id,
            start,
            end,
            length: start.distance(&end),
        }
    }

    /// Geometry from raw polyline vertices; length is the polyline length.
    ///
    /// Fails on fewer than two vertices or on any non-finite vertex.
    pub fn from_polyline(id: ReachId, vertices: &[Point2]) -> Result<Self, NetworkError> {
        let (Some(&start), Some(&end)) = (vertices.first(), vertices.last()) else {
            return Err(NetworkError::DegenerateGeometry { id, vertices: 0 });
        };
        if vertices.len() < 2 {
            return Err(NetworkError::DegenerateGeometry {
                id,
                vertices: vertices.len(),
            });
        }
        if let Some(bad) = vertices.iter().find(|p| !p.is_finite()) {
            return Err(NetworkError::NonFiniteCoordinate {
                id,
                x: bad.x,
                y: bad.y,
            });
        }
        let length = vertices.windows(2).map(|w| w[0].distance(&w[1])).sum();
        Ok(Self {
            id,
            start,
            end,
            length,
        })
    }

    /// Override the length (e.g. a geodesic length computed elsewhere).
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }
}

/// Upstream- and downstream-facing endpoints stored contiguously by reach index.
#[derive(Clone, Debug)]
pub struct EndpointArena {
    upstream: Vec<Point2>,
    downstream: Vec<Point2>,
}

impl EndpointArena {
    /// Orient every geometry with `convention`, in input order.
    pub fn new(geometries: &[ReachGeometry], convention: EndpointConvention) -> Self {
        let (upstream, downstream) = geometries
            .iter()
            .map(|g| convention.orient(g.start, g.end))
            .unzip();
        Self {
            upstream,
            downstream,
        }
    }

    /// Number of reaches.
    pub fn len(&self) -> usize {
        self.upstream.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty()
    }

    /// Upstream-facing endpoint of a reach.
    pub fn upstream_endpoint(&self, reach: ReachIndex) -> Point2 {
        self.upstream[reach]
    }

    /// Downstream-facing endpoint of a reach.
    pub fn downstream_endpoint(&self, reach: ReachIndex) -> Point2 {
        self.downstream[reach]
    }

    /// Resolve the downstream reach of every reach by exact endpoint match.
    ///
    /// Fails if two reaches share an upstream-facing endpoint, since a reach
    /// draining there would have two downstream neighbours, or if any
    /// endpoint is non-finite.
    pub fn link(
        &self,
        registry: &ReachRegistry,
    ) -> Result<Vec<Option<ReachIndex>>, NetworkError> {
        for reach in ReachIndex::iter(self.len()) {
            for point in [self.upstream[reach], self.downstream[reach]] {
                if !point.is_finite() {
                    return Err(NetworkError::NonFiniteCoordinate {
                        id: registry.id_of(reach),
                        x: point.x,
                        y: point.y,
                    });
                }
            }
        }

        let mut heads: HashMap<CoordKey, ReachIndex> = HashMap::with_capacity(self.len());
        for reach in ReachIndex::iter(self.len()) {
            let point = self.upstream[reach];
            match heads.entry(point.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(reach);
                }
                Entry::Occupied(slot) => {
                    return Err(NetworkError::SharedUpstreamEndpoint {
                        first: registry.id_of(*slot.get()),
                        second: registry.id_of(reach),
                        x: point.x,
                        y: point.y,
                    });
                }
            }
        }

        Ok(self
            .downstream
            .iter()
            .map(|point| heads.get(&point.key()).copied())
            .collect())
    }
}
