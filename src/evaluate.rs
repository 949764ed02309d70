//! Structural evaluation of a wound vessel.
//!
//! Runs the shell solver on every distinct vessel half and applies the
//! Puck criterion to each (element, layer) cell. For unsymmetric vessels
//! the results of side one are reversed and prepended so the element
//! index runs from one polar opening to the other.

use std::fmt;

use log::debug;

use crate::contour::Side;
use crate::error::DesignResult;
use crate::material::Material;
use crate::numbers::argmax;
use crate::puck::Puck;
use crate::solver::{LayerwiseResults, ShellInput, ShellSolver};
use crate::winding::{sides, WindingEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    FibreFailure,
    InterFibreFailure,
}

impl Criterion {
    pub fn from_fibre_failure(use_fibre_failure: bool) -> Criterion {
        if use_fibre_failure {
            Criterion::FibreFailure
        } else {
            Criterion::InterFibreFailure
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Criterion::FibreFailure => write!(f, "FF"),
            Criterion::InterFibreFailure => write!(f, "IFF"),
        }
    }
}

/// Location and value of the largest entry of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub element: usize,
    pub layer: usize,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct FailureField {
    pub results: LayerwiseResults,
    /// fibre failure exposure `[element][layer]`
    pub ff: Vec<Vec<f64>>,
    /// inter fibre failure exposure `[element][layer]`
    pub iff: Vec<Vec<f64>>,
    /// |top - bottom| meridional strain
    pub strain_diff_axial: Vec<f64>,
    pub strain_diff_circ: Vec<f64>,
}

impl FailureField {
    pub fn element_count(&self) -> usize {
        self.ff.len()
    }

    pub fn exposure(&self, criterion: Criterion) -> &[Vec<f64>] {
        match criterion {
            Criterion::FibreFailure => &self.ff,
            Criterion::InterFibreFailure => &self.iff,
        }
    }

    /// Largest exposure over the layers of each element.
    pub fn element_max(&self, criterion: Criterion) -> Vec<f64> {
        self.exposure(criterion)
            .iter()
            .map(|layers| argmax(layers).map(|(_, v)| v).unwrap_or(0.0))
            .collect()
    }

    pub fn peak(&self, criterion: Criterion) -> Peak {
        let mut best = Peak { element: 0, layer: 0, value: 0.0 };
        for (element, layers) in self.exposure(criterion).iter().enumerate() {
            if let Some((layer, value)) = argmax(layers) {
                if value > best.value {
                    best = Peak { element, layer, value };
                }
            }
        }
        best
    }

    /// Element with the largest meridional strain difference.
    pub fn bend_peak(&self) -> (usize, f64) {
        argmax(&self.strain_diff_axial).unwrap_or((0, 0.0))
    }

    /// Zero every exposure outside `mask`.
    pub fn apply_mask(&mut self, mask: &[usize]) {
        for field in [&mut self.ff, &mut self.iff].iter_mut() {
            for (i, layers) in field.iter_mut().enumerate() {
                if !mask.contains(&i) {
                    layers.iter_mut().for_each(|v| *v = 0.0);
                }
            }
        }
    }
}

fn exposures(results: &LayerwiseResults, puck: &Puck) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let ff = results
        .s11
        .iter()
        .map(|row| row.iter().map(|&s| puck.fibre_failure(s)).collect())
        .collect();
    let iff = results
        .s22
        .iter()
        .zip(&results.s12)
        .map(|(s22, s12)| {
            s22.iter()
                .zip(s12)
                .map(|(&a, &b)| puck.inter_fibre_failure(a, b))
                .collect()
        })
        .collect();
    (ff, iff)
}

/// Solve all vessel halves and join them in element order.
pub fn solve_vessel(
    engine: &dyn WindingEngine,
    solver: &dyn ShellSolver,
    material: &Material,
    pressure: f64,
) -> DesignResult<LayerwiseResults> {
    let mut joined = LayerwiseResults::default();
    for side in sides(engine) {
        let input = ShellInput { engine, side, material, pressure };
        let result = solver.solve(&input)?;
        if side == Side::One && !engine.symmetric() {
            joined = result.reversed();
        } else {
            joined.extend(result);
        }
    }
    Ok(joined)
}

/// Failure field of the wound vessel at `pressure`. Exposures outside
/// `mask` are zero when a mask is given.
pub fn evaluate(
    engine: &dyn WindingEngine,
    solver: &dyn ShellSolver,
    material: &Material,
    pressure: f64,
    mask: Option<&[usize]>,
) -> DesignResult<FailureField> {
    let results = solve_vessel(engine, solver, material, pressure)?;
    let puck = Puck::new(&material.strength, &material.puck);
    let (ff, iff) = exposures(&results, &puck);
    let strain_diff_axial = results
        .eps_axial_top
        .iter()
        .zip(&results.eps_axial_bot)
        .map(|(t, b)| (t - b).abs())
        .collect();
    let strain_diff_circ = results
        .eps_circ_top
        .iter()
        .zip(&results.eps_circ_bot)
        .map(|(t, b)| (t - b).abs())
        .collect();
    let mut field = FailureField {
        results,
        ff,
        iff,
        strain_diff_axial,
        strain_diff_circ,
    };
    if let Some(mask) = mask {
        field.apply_mask(mask);
    }
    debug!("evaluated {} elements at {} MPa", field.element_count(), pressure);
    Ok(field)
}

/// Bare mandrel element radii in evaluation order.
pub fn element_radii(engine: &dyn WindingEngine) -> Vec<f64> {
    let mut radii = Vec::new();
    for side in sides(engine) {
        let r = engine.bare_mandrel(side).element_radii();
        if side == Side::One && !engine.symmetric() {
            radii.extend(r.into_iter().rev());
        } else {
            radii.extend(r);
        }
    }
    radii
}

/// Elements of the hoop region, `r >= rel_radius * r_cyl` on the bare liner.
pub fn hoop_indices(engine: &dyn WindingEngine, rel_radius: f64) -> Vec<usize> {
    let r_cyl = engine.bare_mandrel(Side::One).r_cyl();
    element_radii(engine)
        .iter()
        .enumerate()
        .filter(|(_, &r)| r >= rel_radius * r_cyl)
        .map(|(i, _)| i)
        .collect()
}

/// Dome elements below the hoop region.
pub fn helical_indices(engine: &dyn WindingEngine, rel_radius: f64) -> Vec<usize> {
    let r_cyl = engine.bare_mandrel(Side::One).r_cyl();
    element_radii(engine)
        .iter()
        .enumerate()
        .filter(|(_, &r)| r < rel_radius * r_cyl)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{Dome, Liner};
    use crate::laminate::PlyTemplate;
    use crate::solver::MembraneSolver;
    use crate::winding::ReferenceWinder;

    fn template() -> PlyTemplate {
        PlyTemplate {
            thickness: 0.125,
            roving_width: 8.0,
            rovings: 1,
            tex: 446.0,
            fibre_density: 1.78,
        }
    }

    fn winder(dome2: Option<Dome>) -> ReferenceWinder {
        let dome = Dome::isotensoid(200.0, 23.0, 60).unwrap();
        let liner = Liner::new(dome, 500.0, dome2).unwrap();
        let mut w = ReferenceWinder::new(&liner, 60, template(), template());
        w.add_layer(10.0, 0.0);
        w.add_layer(90.0, 0.0);
        w.run_winding_simulation(1).unwrap();
        w
    }

    #[test]
    fn unsymmetric_vessel_joins_both_halves() {
        let ellipse = Dome::ellipsoidal(200.0, 200.0, 23.0, 60).unwrap();
        let w = winder(Some(ellipse));
        let material = Material::default();
        let n1 = w.bare_mandrel(Side::One).element_count();
        let n2 = w.bare_mandrel(Side::Two).element_count();
        let first = evaluate(&w, &MembraneSolver, &material, 50.0, None).unwrap();
        let second = evaluate(&w, &MembraneSolver, &material, 50.0, None).unwrap();
        assert_eq!(first.element_count(), n1 + n2);
        assert_eq!(element_radii(&w).len(), n1 + n2);
        assert_eq!(
            first.peak(Criterion::FibreFailure),
            second.peak(Criterion::FibreFailure)
        );
    }

    #[test]
    fn mask_zeroes_other_elements() {
        let w = winder(None);
        let material = Material::default();
        let hoop = hoop_indices(&w, 0.95);
        let field = evaluate(&w, &MembraneSolver, &material, 50.0, Some(&hoop)).unwrap();
        let helical = helical_indices(&w, 0.95);
        assert!(!helical.is_empty());
        assert!(helical.iter().all(|&i| field.ff[i].iter().all(|&v| v == 0.0)));
        assert!(hoop.len() + helical.len() == field.element_count());
    }

    #[test]
    fn exposure_grows_with_pressure() {
        let w = winder(None);
        let material = Material::default();
        let low = evaluate(&w, &MembraneSolver, &material, 10.0, None).unwrap();
        let high = evaluate(&w, &MembraneSolver, &material, 20.0, None).unwrap();
        let (a, b) = (low.peak(Criterion::FibreFailure), high.peak(Criterion::FibreFailure));
        assert!((b.value - 2.0 * a.value).abs() < 1e-9 * b.value);
        assert_eq!(a.element, b.element);
    }

    #[test]
    fn empty_cells_have_no_exposure() {
        let w = winder(None);
        let material = Material::default();
        let field = evaluate(&w, &MembraneSolver, &material, 50.0, None).unwrap();
        let last = field.element_count() - 1;
        // the unshifted hoop layer does not reach the polar opening
        assert_eq!(field.ff[last][1], 0.0);
        assert_eq!(field.iff[last][1], 0.0);
    }
}
