//! Subbasin bias correction of lateral inflow.
//!
//! A first-guess lateral inflow field `q_ex` (typically a land-surface model
//! runoff mean) is rescaled so that accumulated discharge matches the mean
//! observed discharge at every gauge. Each gauge only corrects its own
//! drainage area: the network is cut below every gauge (`N_d = N − N·Sᵗ·S`),
//! and all reaches of a gauge's subbasin share one factor
//!
//! ```text
//! λ = Qobs_local / (S·Q_d),    Λ = (I − N_d)⁻ᵗ Sᵗ (λ − 1) + 1
//! ```
//!
//! where `Q_d` accumulates `q_ex` through `N_d` and `Qobs_local` is the
//! observation minus the observed inflow from gauges further upstream.
//! Reaches not drained by any gauge keep a factor of 1.
//!
//! The correction is verified by accumulating `Λ⊙q_ex` through the full
//! network; every verifiable gauge must match its observation within the
//! configured tolerance.
//!
//! # Example
//!
//! ```
//! use rivnet_rs::correction::{BiasCorrector, GaugeObservation};
//! use rivnet_rs::network::{ConnectivityRow, NetworkBuilder};
//!
//! // 1, 2 -> 3 -> 4, gauge on 3
//! let rows = vec![
//!     ConnectivityRow::new(1, 3),
//!     ConnectivityRow::new(2, 3),
//!     ConnectivityRow::new(3, 4),
//!     ConnectivityRow::new(4, 0),
//! ];
//! let network = NetworkBuilder::new().from_connectivity(&rows).unwrap();
//! let obs = vec![GaugeObservation::new("G1", 3, 18.0)];
//!
//! let correction = BiasCorrector::new(&network)
//!     .correct(&obs, &[5.0, 7.0, 0.0, 0.0])
//!     .unwrap();
//! assert_eq!(correction.factor(1).unwrap(), 1.5);
//! assert_eq!(correction.factor(4).unwrap(), 1.0);
//! ```

mod config;
mod engine;
mod selection;
mod subbasin;

pub use config::BiasCorrectionConfig;
pub use engine::{BiasCorrection, BiasCorrector, GaugeCorrection};
pub use selection::{GaugeObservation, GaugeSelection};
pub use subbasin::{Subbasin, SubbasinPartition};

use thiserror::Error;

use crate::network::NetworkError;
use crate::operator::OperatorError;
use crate::types::ReachId;

/// Error type for bias correction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionError {
    /// Two gauges select the same reach.
    #[error("Gauges {first} and {second} both sit on reach {reach_id}")]
    DuplicateGauge {
        reach_id: ReachId,
        first: String,
        second: String,
    },

    /// Corrected discharge misses an observation by more than the tolerance.
    #[error(
        "Correction diverged at gauge {gauge_id} (reach {reach_id}): corrected {corrected:.4} vs observed {observed:.4}, relative error {relative_error:.2e} > {tolerance:.2e}"
    )]
    Diverged {
        gauge_id: String,
        reach_id: ReachId,
        observed: f64,
        corrected: f64,
        relative_error: f64,
        tolerance: f64,
    },

    /// Observed discharge is NaN or infinite.
    #[error("Gauge {gauge_id}: observed discharge {value} is not finite")]
    InvalidObservation { gauge_id: String, value: f64 },

    /// Unusable configuration.
    #[error("Invalid correction config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Operator(#[from] OperatorError),
}

/// Non-fatal conditions found while computing a correction.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionWarning {
    /// The decomposed accumulation at a gauge is zero, so no factor can be
    /// derived; the subbasin keeps a factor of 1 and the gauge is not verified.
    ZeroAccumulation { gauge_id: String, reach_id: ReachId },
    /// A corrected lateral inflow is negative.
    NegativeInflow { reach_id: ReachId, value: f64 },
}

impl std::fmt::Display for CorrectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroAccumulation { gauge_id, reach_id } => write!(
                f,
                "Zero accumulation at gauge {} (reach {}): factor left at 1",
                gauge_id, reach_id
            ),
            Self::NegativeInflow { reach_id, value } => {
                write!(f, "Negative corrected inflow {:.4e} at reach {}", value, reach_id)
            }
        }
    }
}
