//! Target function of the ply placement sub-problems.
//!
//! `T = sum(w_i * s_i * t_i)` over six terms. The user weights `w_i` keep
//! their meaning over the whole design run because the scaling factors
//! `s_i` are reset at the start of every sub-problem so that each active
//! term contributes one.

use std::fmt;

use crate::evaluate::{Criterion, FailureField};

pub const TERM_COUNT: usize = 6;

pub const DEFAULT_WEIGHTS: [f64; TERM_COUNT] = [1.0, 0.2, 0.2, 0.0, 1.0, 0.5];

pub const TERM_NAMES: [&str; TERM_COUNT] = [
    "max exposure",
    "exposure at critical element",
    "sum of element exposures",
    "added fibre mass",
    "max strain difference",
    "strain difference at bending element",
];

/// Elements found critical in the previous design iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriticalLocations {
    pub puck: usize,
    pub bend: usize,
}

impl CriticalLocations {
    pub fn of(field: &FailureField, criterion: Criterion) -> CriticalLocations {
        CriticalLocations {
            puck: field.peak(criterion).element,
            bend: field.bend_peak().0,
        }
    }
}

pub type Terms = [f64; TERM_COUNT];

/// Raw term values of a failure field.
pub fn compute_terms(
    field: &FailureField,
    criterion: Criterion,
    memory: &CriticalLocations,
    added_mass: f64,
) -> Terms {
    let element_max = field.element_max(criterion);
    [
        field.peak(criterion).value,
        element_max.get(memory.puck).cloned().unwrap_or(0.0),
        element_max.iter().sum(),
        added_mass,
        field.bend_peak().1,
        field.strain_diff_axial.get(memory.bend).cloned().unwrap_or(0.0),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetFunction {
    weights: Terms,
    scaling: Terms,
}

impl Default for TargetFunction {
    fn default() -> Self {
        TargetFunction::new(DEFAULT_WEIGHTS)
    }
}

impl TargetFunction {
    /// Target function with unit scaling.
    pub fn new(weights: Terms) -> TargetFunction {
        TargetFunction {
            weights,
            scaling: [1.0; TERM_COUNT],
        }
    }

    /// Rescale so each active term of `start` contributes one. The mass
    /// term is scaled with the mean fibre mass per existing layer. Terms
    /// that start at zero or are not finite keep unit scaling.
    pub fn rescaled(&self, start: &Terms, mean_layer_mass: f64) -> TargetFunction {
        let mut scaling = [1.0; TERM_COUNT];
        for (i, factor) in scaling.iter_mut().enumerate() {
            if self.weights[i] <= 0.0 {
                continue;
            }
            let reference = if i == 3 { mean_layer_mass } else { start[i] };
            if reference.is_finite() && reference > 0.0 {
                *factor = 1.0 / reference;
            }
        }
        TargetFunction {
            weights: self.weights,
            scaling,
        }
    }

    pub fn weights(&self) -> &Terms {
        &self.weights
    }

    pub fn scaling(&self) -> &Terms {
        &self.scaling
    }

    pub fn contributions(&self, terms: &Terms) -> Terms {
        let mut c = [0.0; TERM_COUNT];
        for i in 0..TERM_COUNT {
            if self.weights[i] != 0.0 {
                c[i] = self.weights[i] * self.scaling[i] * terms[i];
            }
        }
        c
    }

    pub fn value(&self, terms: &Terms) -> f64 {
        let total: f64 = self.contributions(terms).iter().sum();
        if total.is_nan() {
            f64::INFINITY
        } else {
            total
        }
    }
}

impl fmt::Display for TargetFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..TERM_COUNT {
            writeln!(
                f,
                "{:<40} weight {:8.3} scaling {:12.5e}",
                TERM_NAMES[i], self.weights[i], self.scaling[i]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_weights_contribute_one_at_start() {
        let start = [1.8, 1.5, 40.0, 0.7, 2e-3, 1e-3];
        let target = TargetFunction::new([1.0; TERM_COUNT]).rescaled(&start, 0.7);
        for c in target.contributions(&start).iter() {
            assert!((c - 1.0).abs() < 1e-12);
        }
        assert!((target.value(&start) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn mass_term_uses_mean_layer_mass() {
        let start = [1.0, 1.0, 1.0, 0.2, 1.0, 1.0];
        let target = TargetFunction::new([1.0; TERM_COUNT]).rescaled(&start, 0.4);
        assert!((target.contributions(&start)[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_or_infinite_start_keeps_unit_scaling() {
        let start = [2.0, 0.0, f64::INFINITY, 0.1, 1.0, 1.0];
        let target = TargetFunction::default().rescaled(&start, 0.0);
        assert_eq!(target.scaling()[1], 1.0);
        assert_eq!(target.scaling()[2], 1.0);
        assert_eq!(target.scaling()[3], 1.0);
        assert_eq!(target.scaling()[0], 0.5);
    }

    #[test]
    fn inactive_infinite_term_is_ignored() {
        let target = TargetFunction::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(target.value(&[0.5, f64::INFINITY, 0.0, 0.0, 0.0, 0.0]), 0.5);
        let active = TargetFunction::new([1.0; TERM_COUNT]);
        assert!(active.value(&[0.5, f64::INFINITY, 0.0, 0.0, 0.0, 0.0]).is_infinite());
    }
}
