//! Muskingum routing parameters derived from reach lengths.
//!
//! The downstream routing model moves water between reaches with the
//! Muskingum scheme. Each reach needs a storage constant `k` (travel time
//! through the reach) and a weighting factor `x`:
//!
//! ```text
//! k_i = k_factor · length_i / celerity
//! Q_i(t+dt) = C0·I(t+dt) + C1·I(t) + C2·Q_i(t)
//! ```
//!
//! with `C0`, `C1`, `C2` from [`MuskingumCoefficients::new`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::network::RiverNetwork;
use crate::types::{ReachId, ReachIndex};

/// Error type for routing parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("Invalid routing config: {0}")]
    InvalidConfig(String),

    #[error("Reach {id} has non-positive length {length}")]
    InvalidLength { id: ReachId, length: f64 },

    #[error("Invalid routing time step: {0}")]
    InvalidTimeStep(f64),
}

/// Uniform Muskingum configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuskingumConfig {
    /// Wave celerity (m/s)
    pub celerity: f64,
    /// Weighting factor, in `[0, 0.5]`
    pub x: f64,
    /// Multiplier applied to every `k`
    pub k_factor: f64,
}

impl Default for MuskingumConfig {
    /// - celerity: 1.0 m/s
    /// - x: 0.3
    /// - k_factor: 1.0
    fn default() -> Self {
        Self {
            celerity: 1.0,
            x: 0.3,
            k_factor: 1.0,
        }
    }
}

impl MuskingumConfig {
    /// Set the wave celerity.
    pub fn with_celerity(mut self, celerity: f64) -> Self {
        self.celerity = celerity;
        self
    }

    /// Set the weighting factor.
    pub fn with_x(mut self, x: f64) -> Self {
        self.x = x;
        self
    }

    /// Set the `k` multiplier.
    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.k_factor = k_factor;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if !(self.celerity.is_finite() && self.celerity > 0.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "celerity must be positive, got {}",
                self.celerity
            )));
        }
        if !(0.0..=0.5).contains(&self.x) {
            return Err(RoutingError::InvalidConfig(format!(
                "x must be in [0, 0.5], got {}",
                self.x
            )));
        }
        if !(self.k_factor.is_finite() && self.k_factor > 0.0) {
            return Err(RoutingError::InvalidConfig(format!(
                "k_factor must be positive, got {}",
                self.k_factor
            )));
        }
        Ok(())
    }
}

/// Per-reach Muskingum parameters, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct MuskingumParameters {
    /// Storage constant per reach (s)
    pub k: Vec<f64>,
    /// Weighting factor per reach
    pub x: Vec<f64>,
}

impl MuskingumParameters {
    /// Derive parameters from the reach lengths of a network.
    pub fn from_network(
        network: &RiverNetwork,
        config: &MuskingumConfig,
    ) -> Result<Self, RoutingError> {
        config.validate()?;
        let mut k = Vec::with_capacity(network.len());
        for reach in network.reaches() {
            if !(reach.length.is_finite() && reach.length > 0.0) {
                return Err(RoutingError::InvalidLength {
                    id: reach.id,
                    length: reach.length,
                });
            }
            k.push(config.k_factor * reach.length / config.celerity);
        }
        debug!(
            reaches = k.len(),
            k_max = k.iter().copied().fold(0.0, f64::max),
            "muskingum parameters"
        );
        Ok(Self {
            x: vec![config.x; k.len()],
            k,
        })
    }

    /// Number of reaches.
    pub fn len(&self) -> usize {
        self.k.len()
    }

    /// Check if there are no reaches.
    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    /// Routing coefficients of one reach for time step `dt` (s).
    pub fn coefficients(
        &self,
        reach: ReachIndex,
        dt: f64,
    ) -> Result<MuskingumCoefficients, RoutingError> {
        MuskingumCoefficients::new(self.k[reach], self.x[reach], dt)
    }

    /// Smallest time step keeping `C0` non-negative on every reach (`dt ≥ 2·k·x`).
    pub fn min_stable_dt(&self) -> f64 {
        self.k
            .iter()
            .zip(&self.x)
            .map(|(k, x)| 2.0 * k * x)
            .fold(0.0, f64::max)
    }
}

/// Muskingum routing coefficients (`C0 + C1 + C2 = 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuskingumCoefficients {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
}

impl MuskingumCoefficients {
    /// Coefficients for storage constant `k`, weighting `x` and step `dt`.
    pub fn new(k: f64, x: f64, dt: f64) -> Result<Self, RoutingError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(RoutingError::InvalidTimeStep(dt));
        }
        let denom = 2.0 * k * (1.0 - x) + dt;
        Ok(Self {
            c0: (dt - 2.0 * k * x) / denom,
            c1: (dt + 2.0 * k * x) / denom,
            c2: (2.0 * k * (1.0 - x) - dt) / denom,
        })
    }

    /// Check that all coefficients are non-negative.
    pub fn is_stable(&self) -> bool {
        self.c0 >= 0.0 && self.c1 >= 0.0 && self.c2 >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ConnectivityRow, NetworkBuilder};
    use approx::assert_relative_eq;

    fn network(lengths: &[f64]) -> RiverNetwork {
        let rows = vec![
            ConnectivityRow::new(1, 2),
            ConnectivityRow::new(2, 3),
            ConnectivityRow::new(3, 0),
        ];
        NetworkBuilder::new()
            .from_connectivity(&rows)
            .unwrap()
            .with_lengths(lengths)
            .unwrap()
    }

    #[test]
    fn test_k_from_length() {
        let config = MuskingumConfig::default().with_celerity(2.0);
        let params =
            MuskingumParameters::from_network(&network(&[1000.0, 3000.0, 500.0]), &config).unwrap();
        assert_eq!(params.k, vec![500.0, 1500.0, 250.0]);
        assert_eq!(params.x, vec![0.3; 3]);
        assert_eq!(params.min_stable_dt(), 900.0);
    }

    #[test]
    fn test_invalid_length() {
        let err = MuskingumParameters::from_network(
            &network(&[1000.0, 0.0, 500.0]),
            &MuskingumConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, RoutingError::InvalidLength { id: 2, length: 0.0 });
    }

    #[test]
    fn test_invalid_config() {
        assert!(MuskingumConfig::default().with_x(0.7).validate().is_err());
        assert!(MuskingumConfig::default().with_celerity(0.0).validate().is_err());
        assert!(MuskingumConfig::default().with_k_factor(-1.0).validate().is_err());
    }

    #[test]
    fn test_coefficients_sum_to_one() {
        let c = MuskingumCoefficients::new(3600.0, 0.2, 1800.0).unwrap();
        assert_relative_eq!(c.c0 + c.c1 + c.c2, 1.0, epsilon = 1e-12);
        assert!(c.is_stable());

        let unstable = MuskingumCoefficients::new(3600.0, 0.5, 600.0).unwrap();
        assert!(!unstable.is_stable());
        assert!(MuskingumCoefficients::new(3600.0, 0.2, 0.0).is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config: MuskingumConfig = serde_json::from_str(r#"{"x": 0.1}"#).unwrap();
        assert_eq!(config.x, 0.1);
        assert_eq!(config.celerity, 1.0);
    }
}
