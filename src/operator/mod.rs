//! Flow-accumulation operator.
//!
//! The network is the sparse matrix `N` with `N[i,j] = 1` iff reach `j` is
//! immediately upstream of reach `i`. Accumulated discharge solves
//!
//! ```text
//! (I - N) Q = q_ex
//! ```
//!
//! Because the downstream relation is a forest, `N` is nilpotent and
//! `(I - N)^-1 = I + N + N² + …`, i.e. every reach sums lateral inflow over
//! its whole drainage area. The solve is a single sweep in rank order
//! (each reach precedes its downstream neighbour), pushing every finished
//! value one hop down. The transposed system runs the same sweep backwards.
//!
//! No factorization is ever formed; storage is one optional downstream index
//! per column plus the upstream adjacency per row.
//!
//! # Example
//!
//! ```
//! use rivnet_rs::network::{ConnectivityRow, NetworkBuilder};
//! use rivnet_rs::operator::NetworkOperator;
//!
//! let rows = vec![
//!     ConnectivityRow::new(1, 3),
//!     ConnectivityRow::new(2, 3),
//!     ConnectivityRow::new(3, 4),
//!     ConnectivityRow::new(4, 0),
//! ];
//! let network = NetworkBuilder::new().from_connectivity(&rows).unwrap();
//! let op = NetworkOperator::from_network(&network);
//!
//! let q = op.accumulate(&[5.0, 7.0, 0.0, 0.0]).unwrap();
//! assert_eq!(q, vec![5.0, 7.0, 12.0, 12.0]);
//! ```

mod series;

pub use series::ReachSeries;

use thiserror::Error;

use crate::network::RiverNetwork;
use crate::types::ReachIndex;

/// Error type for operator applications.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperatorError {
    /// Input vector length does not match the operator dimension.
    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch {
        /// Expected length
        expected: usize,
        /// Supplied length
        actual: usize,
    },
}

/// Sparse network operator `N` with a topological sweep order.
#[derive(Clone, Debug)]
pub struct NetworkOperator {
    /// Column structure: `downstream[j] = Some(i)` iff `N[i,j] = 1`
    downstream: Vec<Option<ReachIndex>>,
    /// Row structure: `upstream[i] = { j : N[i,j] = 1 }`
    upstream: Vec<Vec<ReachIndex>>,
    /// Every reach appears before its downstream neighbour
    order: Vec<ReachIndex>,
}

impl NetworkOperator {
    /// Assemble `N` from a validated network.
    pub fn from_network(network: &RiverNetwork) -> Self {
        let downstream: Vec<_> = ReachIndex::iter(network.len())
            .map(|r| network.downstream_index(r))
            .collect();
        let upstream = ReachIndex::iter(network.len())
            .map(|r| network.upstream_indices(r).to_vec())
            .collect();
        Self {
            downstream,
            upstream,
            order: network.order().to_vec(),
        }
    }

    /// Operator dimension (number of reaches).
    pub fn dim(&self) -> usize {
        self.downstream.len()
    }

    /// Number of non-zero entries (network edges).
    pub fn nnz(&self) -> usize {
        self.downstream.iter().filter(|d| d.is_some()).count()
    }

    /// Matrix entry `N[i,j]`.
    pub fn entry(&self, i: ReachIndex, j: ReachIndex) -> f64 {
        if self.downstream[j] == Some(i) { 1.0 } else { 0.0 }
    }

    /// Downstream neighbour of `j` under this operator.
    #[inline]
    pub fn downstream(&self, j: ReachIndex) -> Option<ReachIndex> {
        self.downstream[j]
    }

    /// Direct upstream neighbours of `i` under this operator.
    #[inline]
    pub fn upstream(&self, i: ReachIndex) -> &[ReachIndex] {
        &self.upstream[i]
    }

    /// Sweep order (upstream before downstream).
    pub fn order(&self) -> &[ReachIndex] {
        &self.order
    }

    /// Copy of this operator with the outgoing edge of each listed reach removed.
    ///
    /// The listed reaches become outlets of the new operator; the sweep order
    /// stays valid because removing edges cannot break a topological order.
    pub fn without_outflow(&self, reaches: &[ReachIndex]) -> Self {
        let mut cut = self.clone();
        for &j in reaches {
            if let Some(i) = cut.downstream[j].take() {
                cut.upstream[i].retain(|&u| u != j);
            }
        }
        cut
    }

    /// Matrix-vector product `N·x`.
    pub fn apply(&self, x: &[f64]) -> Result<Vec<f64>, OperatorError> {
        self.check_len(x.len())?;
        Ok(self
            .upstream
            .iter()
            .map(|ups| ups.iter().map(|&j| x[j]).sum::<f64>())
            .collect())
    }

    /// Transposed product `Nᵗ·y`.
    pub fn apply_transpose(&self, y: &[f64]) -> Result<Vec<f64>, OperatorError> {
        self.check_len(y.len())?;
        Ok(self
            .downstream
            .iter()
            .map(|down| down.map_or(0.0, |i| y[i]))
            .collect())
    }

    /// Solve `(I - N) Q = q_ex` by one sweep in rank order.
    pub fn accumulate(&self, q_ex: &[f64]) -> Result<Vec<f64>, OperatorError> {
        self.check_len(q_ex.len())?;
        let mut q = q_ex.to_vec();
        for &j in &self.order {
            if let Some(i) = self.downstream[j] {
                q[i] += q[j];
            }
        }
        Ok(q)
    }

    /// Solve `(I - N)ᵗ Λ = r` by one sweep in reverse rank order.
    ///
    /// Each reach receives its own right-hand side plus the solution at its
    /// downstream neighbour.
    pub fn accumulate_transpose(&self, r: &[f64]) -> Result<Vec<f64>, OperatorError> {
        self.check_len(r.len())?;
        let mut lambda = r.to_vec();
        for &j in self.order.iter().rev() {
            if let Some(i) = self.downstream[j] {
                lambda[j] += lambda[i];
            }
        }
        Ok(lambda)
    }

    /// Evaluate `(I + N + N² + …)·q_ex` by repeated products.
    ///
    /// Terminates after at most `dim` products since `N` is nilpotent.
    /// Gives the same result as [`Self::accumulate`] at `O(depth·nnz)` cost;
    /// used as an independent check.
    pub fn neumann_accumulate(&self, q_ex: &[f64]) -> Result<Vec<f64>, OperatorError> {
        self.check_len(q_ex.len())?;
        let mut total = q_ex.to_vec();
        let mut term = q_ex.to_vec();
        for _ in 0..self.dim() {
            term = self.apply(&term)?;
            if term.iter().all(|&v| v == 0.0) {
                break;
            }
            total.iter_mut().zip(&term).for_each(|(t, v)| *t += v);
        }
        Ok(total)
    }

    /// Accumulate every time step of a lateral inflow series.
    pub fn accumulate_series(&self, inflow: &ReachSeries) -> Result<ReachSeries, OperatorError> {
        self.check_len(inflow.n_reaches())?;
        let mut discharge = ReachSeries::zeros(inflow.n_steps(), inflow.n_reaches());
        for (t, step) in inflow.steps().enumerate() {
            let q = self.accumulate(step)?;
            discharge.step_mut(t).copy_from_slice(&q);
        }
        Ok(discharge)
    }

    fn check_len(&self, actual: usize) -> Result<(), OperatorError> {
        if actual != self.dim() {
            return Err(OperatorError::LengthMismatch {
                expected: self.dim(),
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{ConnectivityRow, NetworkBuilder};

    fn chain() -> NetworkOperator {
        // 1 -> 2 -> 3 -> 4
        let rows = vec![
            ConnectivityRow::new(1, 2),
            ConnectivityRow::new(2, 3),
            ConnectivityRow::new(3, 4),
            ConnectivityRow::new(4, 0),
        ];
        NetworkOperator::from_network(&NetworkBuilder::new().from_connectivity(&rows).unwrap())
    }

    fn y_network() -> NetworkOperator {
        let rows = vec![
            ConnectivityRow::new(1, 3),
            ConnectivityRow::new(2, 3),
            ConnectivityRow::new(3, 4),
            ConnectivityRow::new(4, 0),
        ];
        NetworkOperator::from_network(&NetworkBuilder::new().from_connectivity(&rows).unwrap())
    }

    #[test]
    fn test_chain_accumulation() {
        let op = chain();
        assert_eq!(op.nnz(), 3);
        let q = op.accumulate(&[10.0; 4]).unwrap();
        assert_eq!(q, vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_entries() {
        let op = y_network();
        let r = ReachIndex::new;
        assert_eq!(op.entry(r(2), r(0)), 1.0);
        assert_eq!(op.entry(r(0), r(2)), 0.0);
        assert_eq!(op.upstream(r(2)), &[r(0), r(1)]);
    }

    #[test]
    fn test_apply_and_transpose() {
        let op = y_network();
        assert_eq!(op.apply(&[1.0, 2.0, 3.0, 4.0]).unwrap(), vec![0.0, 0.0, 3.0, 3.0]);
        assert_eq!(
            op.apply_transpose(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
            vec![3.0, 3.0, 4.0, 0.0]
        );
    }

    #[test]
    fn test_transpose_solve() {
        let op = y_network();
        // Λ_j = r_j + Λ_down(j)
        let lambda = op.accumulate_transpose(&[1.0, 0.0, 0.5, 2.0]).unwrap();
        assert_eq!(lambda, vec![3.5, 2.5, 2.5, 2.0]);
        // (I - N)ᵗ Λ reproduces r
        let nt = op.apply_transpose(&lambda).unwrap();
        let r: Vec<f64> = lambda.iter().zip(&nt).map(|(l, n)| l - n).collect();
        assert_eq!(r, vec![1.0, 0.0, 0.5, 2.0]);
    }

    #[test]
    fn test_neumann_matches_sweep() {
        let op = y_network();
        let q_ex = [0.3, 1.7, -0.2, 4.0];
        let sweep = op.accumulate(&q_ex).unwrap();
        let series = op.neumann_accumulate(&q_ex).unwrap();
        for (a, b) in sweep.iter().zip(&series) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_without_outflow() {
        let op = y_network();
        let cut = op.without_outflow(&[ReachIndex::new(2)]);
        assert_eq!(cut.nnz(), 2);
        assert!(cut.upstream(ReachIndex::new(3)).is_empty());
        let q = cut.accumulate(&[5.0, 7.0, 1.0, 1.0]).unwrap();
        assert_eq!(q, vec![5.0, 7.0, 13.0, 1.0]);
        // Original untouched
        assert_eq!(op.nnz(), 3);
    }

    #[test]
    fn test_length_mismatch() {
        let op = chain();
        assert_eq!(
            op.accumulate(&[1.0]),
            Err(OperatorError::LengthMismatch { expected: 4, actual: 1 })
        );
    }

    #[test]
    fn test_series_accumulation() {
        let op = chain();
        let inflow = ReachSeries::from_steps(4, &[vec![1.0; 4], vec![0.0, 0.0, 0.0, 2.0]]).unwrap();
        let discharge = op.accumulate_series(&inflow).unwrap();
        assert_eq!(discharge.step(0), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(discharge.step(1), &[0.0, 0.0, 0.0, 2.0]);
    }
}
