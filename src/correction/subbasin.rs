//! Gauge-bounded subbasins of the decomposed network.
//!
//! Once the outgoing edge of every gauge is cut (`N_d`), each gauge is the
//! outlet of a private drainage area. Every reach belongs to the subbasin of
//! the first gauge downstream of it, or to the ungauged remainder if no gauge
//! lies downstream. Subbasins share no edges under `N_d`, so their
//! accumulations are independent; with the `parallel` feature they can run
//! on the rayon pool.

use super::GaugeSelection;
use crate::operator::{NetworkOperator, OperatorError};
use crate::types::{GaugeIndex, ReachIndex};

/// The private drainage area of one gauge.
#[derive(Clone, Debug, PartialEq)]
pub struct Subbasin {
    /// Gauge draining this subbasin
    pub gauge: GaugeIndex,
    /// Gauged reach (the subbasin outlet)
    pub outlet: ReachIndex,
    /// Member reaches in rank order; the outlet is last
    pub members: Vec<ReachIndex>,
}

/// Partition of all reaches into subbasins plus the ungauged remainder.
#[derive(Clone, Debug)]
pub struct SubbasinPartition {
    subbasins: Vec<Subbasin>,
    ungauged: Vec<ReachIndex>,
    label: Vec<Option<GaugeIndex>>,
    /// Position of each reach inside its group's member list
    slot: Vec<usize>,
}

impl SubbasinPartition {
    /// Partition the reaches of a decomposed operator.
    pub fn new(decomposed: &NetworkOperator, selection: &GaugeSelection) -> Self {
        let n = decomposed.dim();
        let mut label: Vec<Option<GaugeIndex>> = vec![None; n];
        // Downstream first, so a reach's downstream neighbour is labelled before it
        for &r in decomposed.order().iter().rev() {
            let inherited = decomposed.downstream(r).and_then(|d| label[d]);
            label[r] = selection.gauge_at(r).or(inherited);
        }

        let mut subbasins: Vec<Subbasin> = GaugeIndex::iter(selection.n_gauges())
            .map(|g| Subbasin {
                gauge: g,
                outlet: selection.reach(g),
                members: Vec::new(),
            })
            .collect();
        let mut ungauged = Vec::new();
        let mut slot = vec![0; n];
        for &r in decomposed.order() {
            let group = match label[r] {
                Some(g) => &mut subbasins[g].members,
                None => &mut ungauged,
            };
            slot[r] = group.len();
            group.push(r);
        }

        Self {
            subbasins,
            ungauged,
            label,
            slot,
        }
    }

    /// Subbasins in gauge order.
    pub fn subbasins(&self) -> &[Subbasin] {
        &self.subbasins
    }

    /// Reaches not drained by any gauge, in rank order.
    pub fn ungauged(&self) -> &[ReachIndex] {
        &self.ungauged
    }

    /// Gauge whose subbasin contains reach `r`.
    pub fn subbasin_of(&self, r: ReachIndex) -> Option<GaugeIndex> {
        self.label[r]
    }

    /// Accumulate `q_ex` through the decomposed operator, one group at a time.
    pub fn accumulate(
        &self,
        decomposed: &NetworkOperator,
        q_ex: &[f64],
    ) -> Result<Vec<f64>, OperatorError> {
        self.check_len(decomposed, q_ex)?;
        let groups = self.groups();
        let results: Vec<Vec<f64>> = groups
            .iter()
            .map(|members| self.accumulate_group(decomposed, members, q_ex))
            .collect();
        Ok(self.scatter(&groups, &results, q_ex.len()))
    }

    /// Parallel variant of [`Self::accumulate`]: one rayon task per group.
    #[cfg(feature = "parallel")]
    pub fn accumulate_parallel(
        &self,
        decomposed: &NetworkOperator,
        q_ex: &[f64],
    ) -> Result<Vec<f64>, OperatorError> {
        use rayon::prelude::*;

        self.check_len(decomposed, q_ex)?;
        let groups = self.groups();
        let results: Vec<Vec<f64>> = groups
            .par_iter()
            .map(|members| self.accumulate_group(decomposed, members, q_ex))
            .collect();
        Ok(self.scatter(&groups, &results, q_ex.len()))
    }

    fn groups(&self) -> Vec<&[ReachIndex]> {
        self.subbasins
            .iter()
            .map(|s| s.members.as_slice())
            .chain(std::iter::once(self.ungauged.as_slice()))
            .collect()
    }

    /// Sweep one group; under `N_d` every edge stays inside its group.
    fn accumulate_group(
        &self,
        decomposed: &NetworkOperator,
        members: &[ReachIndex],
        q_ex: &[f64],
    ) -> Vec<f64> {
        let mut values: Vec<f64> = members.iter().map(|&r| q_ex[r]).collect();
        for (k, &r) in members.iter().enumerate() {
            if let Some(d) = decomposed.downstream(r) {
                let v = values[k];
                values[self.slot[d]] += v;
            }
        }
        values
    }

    fn scatter(&self, groups: &[&[ReachIndex]], results: &[Vec<f64>], n: usize) -> Vec<f64> {
        let mut q = vec![0.0; n];
        for (members, values) in groups.iter().zip(results) {
            for (&r, &v) in members.iter().zip(values) {
                q[r] = v;
            }
        }
        q
    }

    fn check_len(&self, decomposed: &NetworkOperator, q_ex: &[f64]) -> Result<(), OperatorError> {
        if q_ex.len() != decomposed.dim() || q_ex.len() != self.label.len() {
            return Err(OperatorError::LengthMismatch {
                expected: self.label.len(),
                actual: q_ex.len(),
            });
        }
        Ok(())
    }
}
