//! Gauge observations and the selection matrix `S`.
//!
//! `S` has one row per gauge and one column per reach, with a single 1 in
//! each row at the gauged reach. Rows are mutually exclusive: two gauges on
//! one reach are rejected.

use serde::{Deserialize, Serialize};

use super::CorrectionError;
use crate::network::ReachRegistry;
use crate::operator::{NetworkOperator, OperatorError};
use crate::types::{GaugeIndex, ReachId, ReachIndex};

/// Mean observed discharge at one gauge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaugeObservation {
    /// Gauge code in the observation network (e.g. "08158000")
    pub gauge_id: String,
    /// Reach the gauge sits on
    pub reach_id: ReachId,
    /// Mean observed discharge
    pub discharge: f64,
}

impl GaugeObservation {
    /// Create a new observation.
    pub fn new(gauge_id: impl Into<String>, reach_id: ReachId, discharge: f64) -> Self {
        Self {
            gauge_id: gauge_id.into(),
            reach_id,
            discharge,
        }
    }
}

/// Selection matrix `S` (gauges × reaches).
#[derive(Clone, Debug)]
pub struct GaugeSelection {
    reaches: Vec<ReachIndex>,
    gauge_of: Vec<Option<GaugeIndex>>,
    gauge_ids: Vec<String>,
}

impl GaugeSelection {
    /// Build `S` from observations, in observation order.
    ///
    /// Fails with [`CorrectionError::DuplicateGauge`] if two gauges select
    /// the same reach, and with an unknown-id error for reaches not in the
    /// registry.
    pub fn build(
        registry: &ReachRegistry,
        observations: &[GaugeObservation],
    ) -> Result<Self, CorrectionError> {
        let mut gauge_of: Vec<Option<GaugeIndex>> = vec![None; registry.len()];
        let mut reaches = Vec::with_capacity(observations.len());
        for (g, obs) in observations.iter().enumerate() {
            let reach = registry.index_of(obs.reach_id)?;
            if let Some(first) = gauge_of[reach] {
                return Err(CorrectionError::DuplicateGauge {
                    reach_id: obs.reach_id,
                    first: observations[first].gauge_id.clone(),
                    second: obs.gauge_id.clone(),
                });
            }
            gauge_of[reach] = Some(GaugeIndex::new(g));
            reaches.push(reach);
        }
        Ok(Self {
            reaches,
            gauge_of,
            gauge_ids: observations.iter().map(|o| o.gauge_id.clone()).collect(),
        })
    }

    /// Number of gauges (rows).
    pub fn n_gauges(&self) -> usize {
        self.reaches.len()
    }

    /// Number of reaches (columns).
    pub fn n_reaches(&self) -> usize {
        self.gauge_of.len()
    }

    /// Reach selected by gauge `g`.
    pub fn reach(&self, g: GaugeIndex) -> ReachIndex {
        self.reaches[g]
    }

    /// Gauge sitting on reach `r`, if any.
    pub fn gauge_at(&self, r: ReachIndex) -> Option<GaugeIndex> {
        self.gauge_of[r]
    }

    /// Gauge code of gauge `g`.
    pub fn gauge_id(&self, g: GaugeIndex) -> &str {
        &self.gauge_ids[g]
    }

    /// All gauged reaches, in gauge order.
    pub fn gauged_reaches(&self) -> &[ReachIndex] {
        &self.reaches
    }

    /// `S·x`: values at the gauged reaches.
    pub fn select(&self, x: &[f64]) -> Result<Vec<f64>, OperatorError> {
        if x.len() != self.n_reaches() {
            return Err(OperatorError::LengthMismatch {
                expected: self.n_reaches(),
                actual: x.len(),
            });
        }
        Ok(self.reaches.iter().map(|&r| x[r]).collect())
    }

    /// `Sᵗ·y`: gauge values placed on their reaches, zero elsewhere.
    pub fn scatter(&self, y: &[f64]) -> Result<Vec<f64>, OperatorError> {
        if y.len() != self.n_gauges() {
            return Err(OperatorError::LengthMismatch {
                expected: self.n_gauges(),
                actual: y.len(),
            });
        }
        let mut x = vec![0.0; self.n_reaches()];
        for (&r, &v) in self.reaches.iter().zip(y) {
            x[r] = v;
        }
        Ok(x)
    }

    /// Decomposed operator `N_d = N − N·Sᵗ·S`.
    ///
    /// `Sᵗ·S` is the diagonal indicator of gauged reaches, so the product
    /// removes exactly the outgoing edge of every gauged reach.
    pub fn decompose(&self, operator: &NetworkOperator) -> NetworkOperator {
        operator.without_outflow(&self.reaches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ReachRegistry {
        ReachRegistry::build(&[1, 2, 3, 4]).unwrap()
    }

    #[test]
    fn test_select_and_scatter() {
        let obs = vec![
            GaugeObservation::new("A", 3, 18.0),
            GaugeObservation::new("B", 1, 6.0),
        ];
        let s = GaugeSelection::build(&registry(), &obs).unwrap();
        assert_eq!(s.n_gauges(), 2);
        assert_eq!(s.select(&[1.0, 2.0, 3.0, 4.0]).unwrap(), vec![3.0, 1.0]);
        assert_eq!(s.scatter(&[5.0, 6.0]).unwrap(), vec![6.0, 0.0, 5.0, 0.0]);
        assert_eq!(s.gauge_at(ReachIndex::new(2)), Some(GaugeIndex::new(0)));
        assert_eq!(s.gauge_id(GaugeIndex::new(1)), "B");
    }

    #[test]
    fn test_duplicate_gauge() {
        let obs = vec![
            GaugeObservation::new("A", 3, 18.0),
            GaugeObservation::new("B", 3, 17.5),
        ];
        match GaugeSelection::build(&registry(), &obs) {
            Err(CorrectionError::DuplicateGauge { reach_id, first, second }) => {
                assert_eq!(reach_id, 3);
                assert_eq!(first, "A");
                assert_eq!(second, "B");
            }
            other => panic!("expected DuplicateGauge, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_reach() {
        let obs = vec![GaugeObservation::new("A", 42, 1.0)];
        assert!(matches!(
            GaugeSelection::build(&registry(), &obs),
            Err(CorrectionError::Network(_))
        ));
    }

    #[test]
    fn test_length_checks() {
        let s = GaugeSelection::build(&registry(), &[GaugeObservation::new("A", 2, 1.0)]).unwrap();
        assert!(s.select(&[1.0]).is_err());
        assert!(s.scatter(&[1.0, 2.0]).is_err());
    }
}
