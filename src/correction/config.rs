//! Configuration for subbasin bias correction.

use serde::{Deserialize, Serialize};

use super::CorrectionError;

/// Thresholds for computing and verifying a bias correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasCorrectionConfig {
    /// Maximum relative error allowed at any verified gauge after correction.
    pub tolerance: f64,
    /// Decomposed accumulations with magnitude at or below this value count
    /// as zero; such gauges keep a factor of 1 and are not verified.
    pub zero_threshold: f64,
}

impl Default for BiasCorrectionConfig {
    /// - tolerance: 1 %
    /// - zero_threshold: 0.0 (only an exact zero is degenerate)
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            zero_threshold: 0.0,
        }
    }
}

impl BiasCorrectionConfig {
    /// Strict preset for regression runs.
    ///
    /// - tolerance: 0.1 %
    /// - zero_threshold: 1e-9 (near-empty subbasins are treated as empty)
    pub fn strict() -> Self {
        Self {
            tolerance: 1e-3,
            zero_threshold: 1e-9,
        }
    }

    /// Set the verification tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the zero-accumulation threshold.
    pub fn with_zero_threshold(mut self, zero_threshold: f64) -> Self {
        self.zero_threshold = zero_threshold;
        self
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<(), CorrectionError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(CorrectionError::InvalidConfig(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if !(self.zero_threshold.is_finite() && self.zero_threshold >= 0.0) {
            return Err(CorrectionError::InvalidConfig(format!(
                "zero_threshold must be non-negative and finite, got {}",
                self.zero_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(BiasCorrectionConfig::default().validate().is_ok());
        assert!(BiasCorrectionConfig::strict().validate().is_ok());
    }

    #[test]
    fn test_invalid_tolerance() {
        let config = BiasCorrectionConfig::default().with_tolerance(0.0);
        assert!(matches!(config.validate(), Err(CorrectionError::InvalidConfig(_))));
        let config = BiasCorrectionConfig::default().with_zero_threshold(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_partial_override() {
        let config: BiasCorrectionConfig = serde_json::from_str(r#"{"tolerance": 0.05}"#).unwrap();
        assert_eq!(config.tolerance, 0.05);
        assert_eq!(config.zero_threshold, 0.0);

        let json = serde_json::to_string(&BiasCorrectionConfig::strict()).unwrap();
        let back: BiasCorrectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BiasCorrectionConfig::strict());
    }
}
