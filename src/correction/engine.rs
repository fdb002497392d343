//! Bias-correction engine.

use tracing::{debug, info, warn};

use super::{
    BiasCorrectionConfig, CorrectionError, CorrectionWarning, GaugeObservation, GaugeSelection,
    Subbasin, SubbasinPartition,
};
use crate::network::{NetworkError, ReachRegistry, RiverNetwork};
use crate::operator::{NetworkOperator, OperatorError, ReachSeries};
use crate::types::{GaugeIndex, ReachId};

/// Per-gauge outcome of a correction.
#[derive(Clone, Debug, PartialEq)]
pub struct GaugeCorrection {
    /// Gauge code
    pub gauge_id: String,
    /// Gauged reach
    pub reach_id: ReachId,
    /// Observed mean discharge
    pub observed: f64,
    /// Discharge entering the subbasin from gauges upstream
    pub upstream_inflow: f64,
    /// Accumulated first-guess inflow over the gauge's own subbasin (`S·Q_d`)
    pub decomposed: f64,
    /// Subbasin factor `λ`
    pub factor: f64,
    /// Discharge at the gauge after correction
    pub corrected: f64,
    /// `|corrected - observed| / |observed|` (absolute error if observed is 0)
    pub relative_error: f64,
    /// False for gauges whose factor could not be derived
    pub verified: bool,
}

/// Result of a successful bias correction.
#[derive(Clone, Debug)]
pub struct BiasCorrection {
    registry: ReachRegistry,
    factors: Vec<f64>,
    gauges: Vec<GaugeCorrection>,
    warnings: Vec<CorrectionWarning>,
    partition: SubbasinPartition,
}

impl BiasCorrection {
    /// Correction factor `Λ` per reach, in registry order.
    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Correction factor of one reach.
    pub fn factor(&self, id: ReachId) -> Result<f64, NetworkError> {
        Ok(self.factors[self.registry.index_of(id)?])
    }

    /// Per-gauge results, in observation order.
    pub fn gauges(&self) -> &[GaugeCorrection] {
        &self.gauges
    }

    /// Non-fatal conditions found while correcting.
    pub fn warnings(&self) -> &[CorrectionWarning] {
        &self.warnings
    }

    /// Check if any warnings were generated.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Gauge subbasins, in observation order.
    pub fn subbasins(&self) -> &[Subbasin] {
        self.partition.subbasins()
    }

    /// Full subbasin partition, including the ungauged remainder.
    pub fn partition(&self) -> &SubbasinPartition {
        &self.partition
    }

    /// Largest relative error over verified gauges (0 if none).
    pub fn max_relative_error(&self) -> f64 {
        self.gauges
            .iter()
            .filter(|g| g.verified)
            .map(|g| g.relative_error)
            .fold(0.0, f64::max)
    }

    /// `(reach id, factor)` pairs in registry order.
    pub fn factor_table(&self) -> Vec<(ReachId, f64)> {
        self.registry
            .ids()
            .iter()
            .copied()
            .zip(self.factors.iter().copied())
            .collect()
    }

    /// Scale a lateral inflow field by the factors.
    pub fn apply(&self, q: &[f64]) -> Result<Vec<f64>, OperatorError> {
        if q.len() != self.factors.len() {
            return Err(OperatorError::LengthMismatch {
                expected: self.factors.len(),
                actual: q.len(),
            });
        }
        Ok(q.iter().zip(&self.factors).map(|(v, f)| v * f).collect())
    }

    /// Scale every step of a lateral inflow series by the factors.
    pub fn apply_series(&self, series: &ReachSeries) -> Result<ReachSeries, OperatorError> {
        series.scaled(&self.factors)
    }
}

/// Computes subbasin correction factors for one network.
#[derive(Clone, Debug)]
pub struct BiasCorrector<'a> {
    network: &'a RiverNetwork,
    operator: NetworkOperator,
    config: BiasCorrectionConfig,
}

impl<'a> BiasCorrector<'a> {
    /// Create a corrector with the default configuration.
    pub fn new(network: &'a RiverNetwork) -> Self {
        Self {
            network,
            operator: NetworkOperator::from_network(network),
            config: BiasCorrectionConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: BiasCorrectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &BiasCorrectionConfig {
        &self.config
    }

    /// Network operator `N` used for verification.
    pub fn operator(&self) -> &NetworkOperator {
        &self.operator
    }

    /// Correct the first-guess lateral inflow `q_ex` (registry order) against
    /// mean gauge observations.
    pub fn correct(
        &self,
        observations: &[GaugeObservation],
        q_ex: &[f64],
    ) -> Result<BiasCorrection, CorrectionError> {
        self.config.validate()?;
        if let Some(obs) = observations.iter().find(|o| !o.discharge.is_finite()) {
            return Err(CorrectionError::InvalidObservation {
                gauge_id: obs.gauge_id.clone(),
                value: obs.discharge,
            });
        }

        let registry = self.network.registry();
        let selection = GaugeSelection::build(registry, observations)?;
        let decomposed = selection.decompose(&self.operator);
        let partition = SubbasinPartition::new(&decomposed, &selection);

        #[cfg(feature = "parallel")]
        let q_d = partition.accumulate_parallel(&decomposed, q_ex)?;
        #[cfg(not(feature = "parallel"))]
        let q_d = partition.accumulate(&decomposed, q_ex)?;

        let n_gauges = selection.n_gauges();
        let mut lambda = vec![1.0; n_gauges];
        let mut inflow = vec![0.0; n_gauges];
        let mut verifiable = vec![true; n_gauges];
        let mut warnings = Vec::new();

        // Rank order visits every gauge after all gauges upstream of it
        for &r in self.operator.order() {
            let Some(g) = selection.gauge_at(r) else {
                continue;
            };
            let obs = &observations[g];
            let accumulated = q_d[r];
            let outflow = if accumulated.abs() <= self.config.zero_threshold {
                warn!(
                    gauge = %obs.gauge_id,
                    reach = obs.reach_id,
                    "zero accumulation in gauge subbasin, factor left at 1"
                );
                warnings.push(CorrectionWarning::ZeroAccumulation {
                    gauge_id: obs.gauge_id.clone(),
                    reach_id: obs.reach_id,
                });
                verifiable[g] = false;
                inflow[g] + accumulated
            } else {
                lambda[g] = (obs.discharge - inflow[g]) / accumulated;
                obs.discharge
            };
            debug!(
                gauge = %obs.gauge_id,
                observed = obs.discharge,
                upstream_inflow = inflow[g],
                decomposed = accumulated,
                factor = lambda[g],
                "gauge factor"
            );

            // Hand the gauge outflow to the next gauge downstream, if any
            let next = self
                .operator
                .downstream(r)
                .and_then(|d| partition.subbasin_of(d));
            if let Some(h) = next {
                inflow[h] += outflow;
            }
        }

        let excess: Vec<f64> = lambda.iter().map(|l| l - 1.0).collect();
        let mut factors = decomposed.accumulate_transpose(&selection.scatter(&excess)?)?;
        factors.iter_mut().for_each(|f| *f += 1.0);

        let corrected_inflow: Vec<f64> = q_ex.iter().zip(&factors).map(|(q, f)| q * f).collect();
        for (r, id) in registry.iter() {
            let value = corrected_inflow[r];
            if value < 0.0 {
                warn!(reach = id, value, "negative corrected inflow");
                warnings.push(CorrectionWarning::NegativeInflow { reach_id: id, value });
            }
        }

        let discharge = self.operator.accumulate(&corrected_inflow)?;
        let mut gauges = Vec::with_capacity(n_gauges);
        for g in GaugeIndex::iter(n_gauges) {
            let obs = &observations[g];
            let r = selection.reach(g);
            let corrected = discharge[r];
            let relative_error = relative_error(corrected, obs.discharge);
            if verifiable[g] && (relative_error.is_nan() || relative_error > self.config.tolerance)
            {
                return Err(CorrectionError::Diverged {
                    gauge_id: obs.gauge_id.clone(),
                    reach_id: obs.reach_id,
                    observed: obs.discharge,
                    corrected,
                    relative_error,
                    tolerance: self.config.tolerance,
                });
            }
            gauges.push(GaugeCorrection {
                gauge_id: obs.gauge_id.clone(),
                reach_id: obs.reach_id,
                observed: obs.discharge,
                upstream_inflow: inflow[g],
                decomposed: q_d[r],
                factor: lambda[g],
                corrected,
                relative_error,
                verified: verifiable[g],
            });
        }

        let correction = BiasCorrection {
            registry: registry.clone(),
            factors,
            gauges,
            warnings,
            partition,
        };
        info!(
            reaches = registry.len(),
            gauges = n_gauges,
            ungauged = correction.partition.ungauged().len(),
            max_relative_error = correction.max_relative_error(),
            warnings = correction.warnings.len(),
            "bias correction complete"
        );
        Ok(correction)
    }

    /// Correct a lateral inflow series against mean observations.
    ///
    /// Factors are derived from the time mean of the series; returns the
    /// correction together with the rescaled series.
    pub fn correct_series(
        &self,
        observations: &[GaugeObservation],
        inflow: &ReachSeries,
    ) -> Result<(BiasCorrection, ReachSeries), CorrectionError> {
        let correction = self.correct(observations, &inflow.mean())?;
        let corrected = correction.apply_series(inflow)?;
        Ok((correction, corrected))
    }
}

fn relative_error(corrected: f64, observed: f64) -> f64 {
    if observed == 0.0 {
        corrected.abs()
    } else {
        (corrected - observed).abs() / observed.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ConnectivityRow, NetworkBuilder};
    use approx::assert_relative_eq;

    fn build(rows: &[(ReachId, ReachId)]) -> RiverNetwork {
        let rows: Vec<_> = rows
            .iter()
            .map(|&(id, down)| ConnectivityRow::new(id, down))
            .collect();
        NetworkBuilder::new().from_connectivity(&rows).unwrap()
    }

    fn y_network() -> RiverNetwork {
        build(&[(1, 3), (2, 3), (3, 4), (4, 0)])
    }

    fn chain() -> RiverNetwork {
        build(&[(1, 2), (2, 3), (3, 4), (4, 0)])
    }

    #[test]
    fn test_single_gauge() {
        let network = y_network();
        let obs = vec![GaugeObservation::new("G1", 3, 18.0)];
        let correction = BiasCorrector::new(&network)
            .correct(&obs, &[5.0, 7.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(correction.factors(), &[1.5, 1.5, 1.5, 1.0]);
        let gauge = &correction.gauges()[0];
        assert_eq!(gauge.decomposed, 12.0);
        assert_eq!(gauge.factor, 1.5);
        assert_relative_eq!(gauge.corrected, 18.0);
        assert!(gauge.verified);
        assert!(!correction.has_warnings());
        assert_eq!(correction.partition().ungauged().len(), 1);
    }

    #[test]
    fn test_nested_gauges_subtract_upstream_observation() {
        let network = chain();
        let obs = vec![
            GaugeObservation::new("down", 4, 100.0),
            GaugeObservation::new("up", 2, 30.0),
        ];
        let correction = BiasCorrector::new(&network)
            .correct(&obs, &[10.0; 4])
            .unwrap();

        assert_eq!(correction.factors(), &[1.5, 1.5, 3.5, 3.5]);
        let down = &correction.gauges()[0];
        assert_eq!(down.upstream_inflow, 30.0);
        assert_eq!(down.decomposed, 20.0);
        assert_relative_eq!(down.corrected, 100.0);
        assert_relative_eq!(correction.gauges()[1].corrected, 30.0);
    }

    #[test]
    fn test_zero_accumulation_keeps_unit_factor() {
        let network = y_network();
        let obs = vec![
            GaugeObservation::new("dry", 1, 2.0),
            GaugeObservation::new("outlet", 4, 24.0),
        ];
        let correction = BiasCorrector::new(&network)
            .correct(&obs, &[0.0, 6.0, 6.0, 6.0])
            .unwrap();

        assert_eq!(correction.factor(1).unwrap(), 1.0);
        assert_eq!(
            correction.warnings(),
            &[CorrectionWarning::ZeroAccumulation {
                gauge_id: "dry".into(),
                reach_id: 1,
            }]
        );
        let dry = &correction.gauges()[0];
        assert!(!dry.verified);
        let outlet = &correction.gauges()[1];
        assert_eq!(outlet.upstream_inflow, 0.0);
        assert_relative_eq!(outlet.factor, 24.0 / 18.0);
        assert_relative_eq!(outlet.corrected, 24.0, max_relative = 1e-12);
        assert_relative_eq!(correction.factor(2).unwrap(), 24.0 / 18.0);
    }

    #[test]
    fn test_negative_local_observation_warns() {
        let network = chain();
        let obs = vec![
            GaugeObservation::new("up", 2, 30.0),
            GaugeObservation::new("down", 4, 20.0),
        ];
        let correction = BiasCorrector::new(&network)
            .correct(&obs, &[10.0; 4])
            .unwrap();

        assert_eq!(correction.factor(3).unwrap(), -0.5);
        let negative = correction
            .warnings()
            .iter()
            .filter(|w| matches!(w, CorrectionWarning::NegativeInflow { .. }))
            .count();
        assert_eq!(negative, 2);
        assert_relative_eq!(correction.gauges()[1].corrected, 20.0);
    }

    #[test]
    fn test_non_finite_inflow_diverges() {
        let network = y_network();
        let obs = vec![GaugeObservation::new("G1", 3, 18.0)];
        let result = BiasCorrector::new(&network).correct(&obs, &[f64::NAN, 7.0, 0.0, 0.0]);
        match result {
            Err(CorrectionError::Diverged { gauge_id, reach_id, .. }) => {
                assert_eq!(gauge_id, "G1");
                assert_eq!(reach_id, 3);
            }
            other => panic!("expected Diverged, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_observation() {
        let network = y_network();
        let obs = vec![GaugeObservation::new("G1", 3, f64::INFINITY)];
        assert!(matches!(
            BiasCorrector::new(&network).correct(&obs, &[1.0; 4]),
            Err(CorrectionError::InvalidObservation { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let network = y_network();
        let corrector = BiasCorrector::new(&network)
            .with_config(BiasCorrectionConfig::default().with_tolerance(-1.0));
        assert!(matches!(
            corrector.correct(&[], &[1.0; 4]),
            Err(CorrectionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let network = y_network();
        let obs = vec![GaugeObservation::new("G1", 3, 18.0)];
        assert!(matches!(
            BiasCorrector::new(&network).correct(&obs, &[1.0; 3]),
            Err(CorrectionError::Operator(OperatorError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_no_gauges_is_identity() {
        let network = y_network();
        let correction = BiasCorrector::new(&network).correct(&[], &[1.0; 4]).unwrap();
        assert_eq!(correction.factors(), &[1.0; 4]);
        assert!(correction.subbasins().is_empty());
        assert_eq!(correction.max_relative_error(), 0.0);
    }

    #[test]
    fn test_correct_series() {
        let network = y_network();
        let obs = vec![GaugeObservation::new("G1", 3, 18.0)];
        let inflow =
            ReachSeries::from_steps(4, &[vec![4.0, 6.0, 0.0, 0.0], vec![6.0, 8.0, 0.0, 0.0]])
                .unwrap();
        let (correction, corrected) = BiasCorrector::new(&network)
            .correct_series(&obs, &inflow)
            .unwrap();
        assert_eq!(correction.factor(2).unwrap(), 1.5);
        assert_eq!(corrected.step(0), &[6.0, 9.0, 0.0, 0.0]);
        assert_eq!(correction.factor_table()[3], (4, 1.0));
    }
}
