//! Bounded minimisers used to place a ply.
//!
//! Objectives take the design variables and return the target value.
//! Infeasible designs return `f64::INFINITY`; every minimiser treats NaN
//! the same way.

use log::debug;

pub mod brent;
pub mod evolution;
pub mod nelder;

pub use self::brent::Brent;
pub use self::evolution::DifferentialEvolution;
pub use self::nelder::Nelder;

/// Objective shared by parallel workers.
pub type Objective<'a> = dyn Fn(&[f64]) -> f64 + Sync + 'a;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Bound {
        Bound { lower, upper }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.max(self.lower).min(self.upper)
    }

    /// Map `u` in [0, 1] onto the bound.
    pub fn scale(&self, u: f64) -> f64 {
        self.lower + u * self.width()
    }
}

pub fn clamp_all(x: &[f64], bounds: &[Bound]) -> Vec<f64> {
    x.iter().zip(bounds).map(|(&xi, b)| b.clamp(xi)).collect()
}

/// Guard an objective value so comparisons stay total.
pub fn finite_or_inf(value: f64) -> f64 {
    if value.is_nan() {
        f64::INFINITY
    } else {
        value
    }
}

/// Best point found by a minimiser.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub x: Vec<f64>,
    pub fun: f64,
    pub evaluations: usize,
}

pub trait Optimisation {
    fn minimise(&mut self, objective: &Objective, bounds: &[Bound]) -> Evaluation;

    fn name(&self) -> &str;
}

/// Run a local and a global minimiser side by side and keep the lower
/// result. Ties go to the local result.
pub fn minimise_both(
    local: &mut (dyn Optimisation + Send),
    global: &mut (dyn Optimisation + Send),
    objective: &Objective,
    bounds: &[Bound],
) -> Evaluation {
    let (a, b) = rayon::join(|| local.minimise(objective, bounds), || global.minimise(objective, bounds));
    debug!(
        "{} found {:?} ({}), {} found {:?} ({})",
        local.name(),
        a.x,
        a.fun,
        global.name(),
        b.x,
        b.fun
    );
    if b.fun < a.fun {
        b
    } else {
        a
    }
}
