//! Shell solver adapter.
//!
//! A solver turns the wound laminate of one vessel half and an internal
//! pressure into layerwise stresses in fibre axes and the strains of the
//! laminate surfaces. `MembraneSolver` is the shell of revolution solver
//! shipped with the crate.

use std::fmt;

use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::contour::Side;
use crate::error::{DesignError, DesignResult};
use crate::laminate::balanced_stiffness;
use crate::material::Material;
use crate::winding::WindingEngine;

/// Everything a solver reads for one vessel half.
pub struct ShellInput<'a> {
    pub engine: &'a dyn WindingEngine,
    pub side: Side,
    pub material: &'a Material,
    /// internal pressure (MPa)
    pub pressure: f64,
}

/// Per element results. Stress arrays are indexed `[element][layer]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerwiseResults {
    pub s11: Vec<Vec<f64>>,
    pub s22: Vec<Vec<f64>>,
    pub s12: Vec<Vec<f64>>,
    pub eps_axial_bot: Vec<f64>,
    pub eps_axial_top: Vec<f64>,
    pub eps_circ_bot: Vec<f64>,
    pub eps_circ_top: Vec<f64>,
}

impl LayerwiseResults {
    pub fn element_count(&self) -> usize {
        self.s11.len()
    }

    /// Reverse the element order.
    pub fn reversed(mut self) -> LayerwiseResults {
        self.s11.reverse();
        self.s22.reverse();
        self.s12.reverse();
        self.eps_axial_bot.reverse();
        self.eps_axial_top.reverse();
        self.eps_circ_bot.reverse();
        self.eps_circ_top.reverse();
        self
    }

    /// Append the elements of `other` after these.
    pub fn extend(&mut self, other: LayerwiseResults) {
        self.s11.extend(other.s11);
        self.s22.extend(other.s22);
        self.s12.extend(other.s12);
        self.eps_axial_bot.extend(other.eps_axial_bot);
        self.eps_axial_top.extend(other.eps_axial_top);
        self.eps_circ_bot.extend(other.eps_circ_bot);
        self.eps_circ_top.extend(other.eps_circ_top);
    }
}

pub trait ShellSolver: Send + Sync {
    fn solve(&self, input: &ShellInput) -> DesignResult<LayerwiseResults>;

    fn name(&self) -> &str;

    fn inner_clone(&self) -> Box<dyn ShellSolver>;
}

impl Clone for Box<dyn ShellSolver> {
    fn clone(&self) -> Self {
        self.inner_clone()
    }
}

impl fmt::Debug for dyn ShellSolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ShellSolver {}", self.name())
    }
}

/// Membrane shell of revolution.
///
/// The stress resultants follow from equilibrium of the pressurised shell
/// alone, `N1 = p r2 / 2` and `N2 = p r2 (1 - r2 / (2 r1))`, with `r2` the
/// circumferential and `r1` the meridional radius of curvature. The
/// mid-surface strains solve `A e = N` with the in-plane stiffness of the
/// local stack, so the shell does not curve under its own coupling and
/// every ply of an element sees the same strain.
///
/// Bending comes from compatibility along the meridian instead. The radial
/// displacement `w = r e2` jumps where the stack changes, for instance at
/// the end of a hoop ply, and the wall curves with `k1 = -w''` and
/// `k2 = -sin(b) w' / r`. The surface strains are `e -/+ k h / 2`.
#[derive(Debug, Clone, Default)]
pub struct MembraneSolver;

/// Curvature radii (r1, r2) at the element midpoints of a meridian.
pub fn curvature_radii(radii: &[f64], slopes: &[f64], positions: &[f64]) -> Vec<(f64, f64)> {
    let n = radii.len();
    (0..n)
        .map(|i| {
            let r2 = radii[i] / slopes[i].cos();
            let (a, b) = (i.saturating_sub(1), (i + 1).min(n - 1));
            let ds = positions[b] - positions[a];
            let dbeta = slopes[b] - slopes[a];
            let r1 = if ds > 0.0 && dbeta.abs() > 1e-12 * ds {
                -ds / dbeta
            } else {
                f64::INFINITY
            };
            (r1, r2)
        })
        .collect()
}

/// Second and first derivative of `w` along the meridian at element i.
/// Element 0 borders the symmetry plane of the cylinder and is closed by
/// its mirror image. A missing neighbour takes the value of element i.
/// The element at the polar opening is a free edge and yields nothing.
fn meridian_derivatives(w: &[Option<f64>], s: &[f64], i: usize) -> Option<(f64, f64)> {
    let here = w[i]?;
    if i + 1 >= w.len() {
        return None;
    }
    let (s_prev, w_prev) = if i == 0 {
        (-s[0], here)
    } else {
        (s[i - 1], w[i - 1].unwrap_or(here))
    };
    let (s_next, w_next) = (s[i + 1], w[i + 1].unwrap_or(here));
    let (h0, h1) = (s[i] - s_prev, s_next - s[i]);
    if !(h0 > 0.0 && h1 > 0.0) {
        return None;
    }
    let (d0, d1) = ((here - w_prev) / h0, (w_next - here) / h1);
    Some((2.0 * (d1 - d0) / (h0 + h1), (h0 * d1 + h1 * d0) / (h0 + h1)))
}

impl ShellSolver for MembraneSolver {
    fn solve(&self, input: &ShellInput) -> DesignResult<LayerwiseResults> {
        let engine = input.engine;
        let bare = engine.bare_mandrel(input.side);
        let layers = engine.layer_count();
        let q = input.material.reduced_stiffness();

        let radii = bare.element_radii();
        let slopes = bare.element_slopes();
        let positions = bare.element_positions();
        let curvature = curvature_radii(&radii, &slopes, &positions);

        let thickness: Vec<&[f64]> = (0..layers).map(|k| engine.layer_thickness(k, input.side)).collect();
        let angles: Vec<&[f64]> = (0..layers).map(|k| engine.layer_angles(k, input.side)).collect();

        let mut results = LayerwiseResults::default();
        // mid-surface strain and wall thickness of every wound element
        let mut membrane: Vec<Option<(Vector3<f64>, f64)>> = Vec::with_capacity(curvature.len());
        for (i, &(r1, r2)) in curvature.iter().enumerate() {
            let mut s11 = vec![0.0; layers];
            let mut s22 = vec![0.0; layers];
            let mut s12 = vec![0.0; layers];
            let plies: Vec<usize> = (0..layers).filter(|&k| thickness[k][i] > 0.0).collect();
            if plies.is_empty() {
                results.s11.push(s11);
                results.s22.push(s22);
                results.s12.push(s12);
                membrane.push(None);
                continue;
            }

            let n1 = 0.5 * input.pressure * r2;
            let n2 = if r1.is_finite() {
                input.pressure * r2 * (1.0 - r2 / (2.0 * r1))
            } else {
                input.pressure * r2
            };
            let a = plies
                .iter()
                .fold(Matrix3::zeros(), |a, &k| a + balanced_stiffness(&q, angles[k][i]) * thickness[k][i]);
            let h: f64 = plies.iter().map(|&k| thickness[k][i]).sum();
            let mid = a
                .lu()
                .solve(&Vector3::new(n1, n2, 0.0))
                .ok_or_else(|| DesignError::Structural(format!("singular laminate stiffness at element {}", i)))?;

            for &k in &plies {
                let (n, m) = angles[k][i].to_radians().sin_cos();
                let fibre = Vector3::new(
                    m * m * mid[0] + n * n * mid[1] + m * n * mid[2],
                    n * n * mid[0] + m * m * mid[1] - m * n * mid[2],
                    2.0 * m * n * (mid[1] - mid[0]) + (m * m - n * n) * mid[2],
                );
                let stress = q * fibre;
                s11[k] = stress[0];
                s22[k] = stress[1];
                s12[k] = stress[2];
            }

            let finite = mid.iter().all(|v| v.is_finite()) && s11.iter().chain(&s22).chain(&s12).all(|v| v.is_finite());
            if !finite {
                return Err(DesignError::Structural(format!(
                    "non finite stresses at element {} (r = {:.3})",
                    i, radii[i]
                )));
            }
            results.s11.push(s11);
            results.s22.push(s22);
            results.s12.push(s12);
            membrane.push(Some((mid, h)));
        }

        let w: Vec<Option<f64>> = membrane
            .iter()
            .zip(&radii)
            .map(|(state, r)| state.as_ref().map(|(mid, _)| r * mid[1]))
            .collect();
        for (i, state) in membrane.iter().enumerate() {
            let (mid, h) = match state {
                Some(state) => *state,
                None => (Vector3::zeros(), 0.0),
            };
            let (k1, k2) = match meridian_derivatives(&w, &positions, i) {
                Some((second, first)) => (-second, -slopes[i].sin() * first / radii[i]),
                None => (0.0, 0.0),
            };
            let surfaces = [
                mid[0] - 0.5 * h * k1,
                mid[0] + 0.5 * h * k1,
                mid[1] - 0.5 * h * k2,
                mid[1] + 0.5 * h * k2,
            ];
            if !surfaces.iter().all(|v| v.is_finite()) {
                return Err(DesignError::Structural(format!(
                    "non finite wall curvature at element {} (r = {:.3})",
                    i, radii[i]
                )));
            }
            results.eps_axial_bot.push(surfaces[0]);
            results.eps_axial_top.push(surfaces[1]);
            results.eps_circ_bot.push(surfaces[2]);
            results.eps_circ_top.push(surfaces[3]);
        }
        debug!("membrane solution with {} elements and {} layers", results.element_count(), layers);
        Ok(results)
    }

    fn name(&self) -> &str {
        "membrane"
    }

    fn inner_clone(&self) -> Box<dyn ShellSolver> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{Dome, Liner};
    use crate::laminate::PlyTemplate;
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

    fn wound(layers: &[(f64, f64)]) -> ReferenceWinder {
        let dome = Dome::isotensoid(200.0, 23.0, 80).unwrap();
        let liner = Liner::new(dome, 500.0, None).unwrap();
        let mut w = ReferenceWinder::new(&liner, 80, template(), template());
        for &(angle, shift) in layers {
            w.add_layer(angle, shift);
        }
        w.run_winding_simulation(layers.len() - 1).unwrap();
        w
    }

    #[test]
    fn cylinder_radii() {
        let c = curvature_radii(&[100.0, 100.0, 100.0], &[0.0, 0.0, 0.0], &[0.0, 1.0, 2.0]);
        assert!(c.iter().all(|&(r1, r2)| r1.is_infinite() && (r2 - 100.0).abs() < 1e-12));
    }

    #[test]
    fn sphere_radii() {
        let n = 200;
        let beta: Vec<f64> = (0..n).map(|i| -1.5 * (i as f64 + 0.5) / n as f64).collect();
        let radii: Vec<f64> = beta.iter().map(|b| 100.0 * b.cos()).collect();
        let s: Vec<f64> = beta.iter().map(|b| -100.0 * b).collect();
        for &(r1, r2) in &curvature_radii(&radii, &beta, &s) {
            assert!((r1 - 100.0).abs() < 1e-6);
            assert!((r2 - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn hoop_ply_carries_circumferential_load_on_cylinder() {
        let w = wound(&[(10.0, 0.0), (90.0, 0.0)]);
        let material = Material::default();
        let input = ShellInput { engine: &w, side: Side::One, material: &material, pressure: 10.0 };
        let res = MembraneSolver.solve(&input).unwrap();
        assert_eq!(res.element_count(), w.bare_mandrel(Side::One).element_count());
        // fibre direction stress of the hoop ply at the cylinder midpoint
        assert!(res.s11[0][1] > 0.0);
        assert!(res.eps_circ_bot[0] > 0.0 && res.eps_axial_bot[0] > 0.0);
        // the hoop ply ends on the cylinder
        let last = res.element_count() - 1;
        assert_eq!(res.s11[last][1], 0.0);
    }

    #[test]
    fn hoop_ply_end_bends_the_wall() {
        let w = wound(&[(10.0, 0.0), (90.0, 0.0)]);
        let material = Material::default();
        let input = ShellInput { engine: &w, side: Side::One, material: &material, pressure: 10.0 };
        let res = MembraneSolver.solve(&input).unwrap();
        let bend: Vec<f64> = res
            .eps_axial_top
            .iter()
            .zip(&res.eps_axial_bot)
            .map(|(top, bot)| (top - bot).abs())
            .collect();
        // uniform stack around the symmetry plane
        assert!(bend[0] < 1e-12);
        let (worst, value) = crate::numbers::argmax(&bend).unwrap();
        assert!(value > 0.0);
        let bare = w.bare_mandrel(Side::One);
        let distance = (bare.element_positions()[worst] - bare.cylinder_end_length()).abs();
        assert!(distance < 3.0 * template().band_width());
    }

    #[test]
    fn compatibility_stencil_on_a_parabola() {
        let s = [0.5, 1.5, 2.0, 3.5, 4.0];
        let w: Vec<Option<f64>> = s.iter().map(|x| Some(x * x)).collect();
        for i in 0..4 {
            let (second, first) = meridian_derivatives(&w, &s, i).unwrap();
            assert!((second - 2.0).abs() < 1e-9);
            assert!((first - 2.0 * s[i]).abs() < 1e-9);
        }
        assert!(meridian_derivatives(&w, &s, 4).is_none());
        let mut gap = w.clone();
        gap[2] = None;
        assert!(meridian_derivatives(&gap, &s, 2).is_none());
        // an empty neighbour counts as a flat continuation
        let (second, _) = meridian_derivatives(&gap, &s, 1).unwrap();
        assert!((second - 2.0 * (0.0 - (2.25 - 0.25)) / 1.5).abs() < 1e-9);
    }

    #[test]
    fn reversal_keeps_length() {
        let w = wound(&[(12.0, 0.0)]);
        let material = Material::default();
        let input = ShellInput { engine: &w, side: Side::One, material: &material, pressure: 1.0 };
        let res = MembraneSolver.solve(&input).unwrap();
        let first = res.s11[0].clone();
        let mut both = res.clone().reversed();
        both.extend(res);
        assert_eq!(both.element_count(), 2 * w.bare_mandrel(Side::One).element_count());
        assert_eq!(both.s11[both.element_count() - 1 - w.bare_mandrel(Side::One).element_count()], first);
    }
}
