//! Per-reach, per-time-step fields (lateral inflow or discharge).

use super::OperatorError;

/// A field with one value per reach and time step, stored step-major.
///
/// Reach order is registry order.
#[derive(Clone, Debug, PartialEq)]
pub struct ReachSeries {
    n_steps: usize,
    n_reaches: usize,
    values: Vec<f64>,
}

impl ReachSeries {
    /// Wrap step-major values (`values[t * n_reaches + r]`).
    pub fn new(n_reaches: usize, values: Vec<f64>) -> Result<Self, OperatorError> {
        if n_reaches == 0 {
            if !values.is_empty() {
                return Err(OperatorError::LengthMismatch {
                    expected: 0,
                    actual: values.len(),
                });
            }
            return Ok(Self::zeros(0, 0));
        }
        if values.len() % n_reaches != 0 {
            return Err(OperatorError::LengthMismatch {
                expected: (values.len() / n_reaches + 1) * n_reaches,
                actual: values.len(),
            });
        }
        Ok(Self {
            n_steps: values.len() / n_reaches,
            n_reaches,
            values,
        })
    }

    /// Build from one vector per time step.
    pub fn from_steps(n_reaches: usize, steps: &[Vec<f64>]) -> Result<Self, OperatorError> {
        let mut values = Vec::with_capacity(steps.len() * n_reaches);
        for step in steps {
            if step.len() != n_reaches {
                return Err(OperatorError::LengthMismatch {
                    expected: n_reaches,
                    actual: step.len(),
                });
            }
            values.extend_from_slice(step);
        }
        Ok(Self {
            n_steps: steps.len(),
            n_reaches,
            values,
        })
    }

    /// All-zero series.
    pub fn zeros(n_steps: usize, n_reaches: usize) -> Self {
        Self {
            n_steps,
            n_reaches,
            values: vec![0.0; n_steps * n_reaches],
        }
    }

    /// Number of time steps.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Number of reaches.
    pub fn n_reaches(&self) -> usize {
        self.n_reaches
    }

    /// Values at time step `t`.
    ///
    /// # Panics
    /// Panics if `t >= n_steps`.
    pub fn step(&self, t: usize) -> &[f64] {
        &self.values[t * self.n_reaches..(t + 1) * self.n_reaches]
    }

    /// Mutable values at time step `t`.
    pub fn step_mut(&mut self, t: usize) -> &mut [f64] {
        &mut self.values[t * self.n_reaches..(t + 1) * self.n_reaches]
    }

    /// Iterate over time steps.
    pub fn steps(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_steps).map(move |t| self.step(t))
    }

    /// Raw step-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Time mean per reach (zeros for an empty series).
    pub fn mean(&self) -> Vec<f64> {
        let mut mean = vec![0.0; self.n_reaches];
        if self.n_steps == 0 {
            return mean;
        }
        for step in self.steps() {
            for (m, v) in mean.iter_mut().zip(step) {
                *m += v;
            }
        }
        let scale = 1.0 / self.n_steps as f64;
        mean.iter_mut().for_each(|m| *m *= scale);
        mean
    }

    /// Multiply every step element-wise by per-reach `factors`.
    pub fn scaled(&self, factors: &[f64]) -> Result<Self, OperatorError> {
        if factors.len() != self.n_reaches {
            return Err(OperatorError::LengthMismatch {
                expected: self.n_reaches,
                actual: factors.len(),
            });
        }
        let mut out = self.clone();
        for t in 0..out.n_steps {
            for (v, f) in out.step_mut(t).iter_mut().zip(factors) {
                *v *= f;
            }
        }
        Ok(out)
    }
}
