//! Helical ply placement.

use log::{debug, warn};

use super::{LayerDesign, PlyChoice, TrialSetup};
use crate::contour::Side;
use crate::error::{DesignError, DesignResult};
use crate::optimise::{minimise_both, Bound, Brent, Optimisation};
use crate::winding::{effective_polar_opening, sides, thickness_peak_deviation, WindingEngine};

/// Smallest admissible winding angle (degrees).
const MIN_HELICAL_ANGLE: f64 = 1.0;

fn polar_opening_at(engine: &dyn WindingEngine, k: usize, angle: f64, side: Side) -> DesignResult<f64> {
    let mut engine = engine.inner_clone();
    engine.set_layer_angle(k, angle)?;
    engine.run_winding_simulation(k)?;
    effective_polar_opening(&*engine, k, side)
}

/// Angle in `[lower, upper]` where `residual` vanishes, and the residual
/// there. A residual above one after the plain search means Brent stalled
/// on a jump; the second search minimises `a + residual(a)` and so
/// approaches the fitting from small angles.
fn fitting_angle<F>(residual: F, lower: f64, upper: f64) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let brent = Brent::default();
    let (alpha, delta, _) = brent.fminbound(&residual, lower, upper);
    if delta > 1.0 {
        let (retry, _, _) = brent.fminbound(|a: f64| a + residual(a), lower, upper);
        let retry_delta = residual(retry);
        debug!(
            "polar opening residual {:.3} at {:.4}, retry from the fitting side gives {:.3} at {:.4}",
            delta, alpha, retry_delta, retry
        );
        if retry_delta < delta {
            return (retry, retry_delta);
        }
    }
    (alpha, delta)
}

impl LayerDesign {
    /// Smallest angle of helical layer k that keeps its band clear of the
    /// fitting. Unsymmetric vessels take the larger angle of both sides.
    pub(crate) fn min_angle(&self, k: usize) -> DesignResult<f64> {
        let upper = self.settings.max_helical_angle;
        let mut angle: f64 = MIN_HELICAL_ANGLE;
        for side in sides(&*self.engine) {
            let target = self.engine.bare_mandrel(side).polar_opening();
            let residual = |alpha: f64| -> f64 {
                match polar_opening_at(&*self.engine, k, alpha, side) {
                    Ok(po) => (target - po).abs(),
                    Err(e) => {
                        debug!("angle {:.4} on layer {} rejected: {}", alpha, k, e);
                        f64::INFINITY
                    }
                }
            };
            let (alpha, delta) = fitting_angle(residual, MIN_HELICAL_ANGLE, upper);
            if !delta.is_finite() {
                return Err(DesignError::Winding {
                    layer: k,
                    message: format!("no helical angle in [{}, {}] clears the polar opening", MIN_HELICAL_ANGLE, upper),
                });
            }
            if delta > 1.0 {
                warn!(
                    "polar opening of layer {} misses the fitting by {:.3} mm at angle {:.4}",
                    k, delta, alpha
                );
            }
            debug!("smallest angle of layer {} on side {:?}: {:.4} (residual {:.4})", k, side, alpha, delta);
            angle = angle.max(alpha);
        }
        Ok(angle)
    }

    /// Angle of helical layer k minimising the target function. An
    /// infinite value means no feasible angle was found; the caller decides.
    pub(crate) fn helical_subproblem(&self, k: usize, min_angle: f64, setup: &TrialSetup) -> DesignResult<PlyChoice> {
        let upper = self.settings.max_helical_angle;
        let objective = |x: &[f64]| self.trial_value(k, x[0], &[], setup, x[0]);
        let mut lower = min_angle;

        for retry in 0..=self.settings.thickness_retries {
            if lower >= upper {
                break;
            }
            let bound = Bound::new(lower, upper);
            let mut local = self.local_optimiser(lower);
            let best = if self.settings.use_global_search {
                let mut global = self.global_optimiser(Some(lower));
                minimise_both(&mut local, &mut global, &objective, &[bound])
            } else {
                local.minimise(&objective, &[bound])
            };
            let choice = PlyChoice {
                angle: best.x[0],
                shift: 0.0,
                value: best.fun,
                redistributed: vec![],
                min_angle: Some(min_angle),
            };
            if !best.fun.is_finite() {
                return Ok(choice);
            }

            let deviation = self.peak_deviation(k, choice.angle)?;
            if deviation <= self.settings.peak_tolerance {
                debug!(
                    "helical layer {}: angle {:.4} in [{:.4}, {}] after {} evaluations, target {:.5}",
                    k, choice.angle, lower, upper, best.evaluations, choice.value
                );
                return Ok(choice);
            }
            warn!(
                "thickness peak of layer {} at angle {:.4} lies {:.3} contour lengths off its turning zone, retry {}",
                k, choice.angle, deviation, retry + 1
            );
            lower += self.settings.angle_nudge;
        }
        Err(DesignError::ThicknessCorruption {
            layer: k,
            retries: self.settings.thickness_retries,
        })
    }

    /// Largest thickness peak deviation of layer k over the sides.
    fn peak_deviation(&self, k: usize, angle: f64) -> DesignResult<f64> {
        let mut engine: Box<dyn WindingEngine> = self.engine.clone();
        engine.set_layer_angle(k, angle)?;
        engine.run_winding_simulation(k)?;
        Ok(sides(&*engine)
            .into_iter()
            .map(|side| thickness_peak_deviation(&*engine, k, side))
            .fold(0.0, f64::max))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::small_design;
    use super::*;
    use crate::target::{CriticalLocations, TargetFunction};

    fn seeded(burst_pressure: f64) -> LayerDesign {
        let mut design = small_design(burst_pressure, 1);
        design.run().unwrap();
        design
    }

    #[test]
    fn min_angle_clears_the_fitting() {
        let mut design = small_design(140.0, 1);
        let k = design.append_ply(30.0, 0.0).unwrap();
        let angle = design.min_angle(k).unwrap();
        // band middle about half a band above the 23 mm fitting on a 200 mm cylinder
        assert!(angle > 6.0 && angle < 10.0);

        let mut engine = design.engine.clone();
        engine.set_layer_angle(k, angle).unwrap();
        engine.run_winding_simulation(k).unwrap();
        let po = effective_polar_opening(&*engine, k, Side::One).unwrap();
        assert!((po - 23.0).abs() < 1.0);
    }

    #[test]
    fn min_angle_on_a_wound_ply() {
        let mut design = seeded(140.0);
        let first = design.laminate().plies()[0].angle;
        let k = design.append_ply(30.0, 0.0).unwrap();
        let second = design.min_angle(k).unwrap();
        // the seed ply only thickens the turning zone slightly
        assert!((second - first).abs() < 1.0);
    }

    #[test]
    fn subproblem_beats_every_sampled_angle() {
        let mut design = seeded(140.0);
        design.settings.de_popsize = 15;
        design.settings.de_max_generations = 60;
        let field = design.evaluate(None).unwrap();
        let memory = CriticalLocations::of(&field, design.settings().criterion);
        let k = design.append_ply(90.0, 0.0).unwrap();
        let setup = TrialSetup {
            target: TargetFunction::default(),
            memory,
            mask: None,
        };
        let min_angle = design.min_angle(k).unwrap();
        let choice = design.helical_subproblem(k, min_angle, &setup).unwrap();
        assert_eq!(choice.min_angle, Some(min_angle));
        assert!(choice.angle >= min_angle - 1e-9);
        assert!(choice.angle <= design.settings().max_helical_angle);
        let upper = design.settings().max_helical_angle;
        for &eps in &[0.0, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0] {
            let alpha = min_angle + eps;
            if alpha > upper {
                continue;
            }
            let value = design.trial_value(k, alpha, &[], &setup, alpha);
            assert!(
                choice.value <= value * (1.0 + 1e-3),
                "angle {:.3} has target {} below the chosen {}",
                alpha,
                value,
                choice.value
            );
        }
    }

    #[test]
    fn smooth_residual_needs_no_retry() {
        let (alpha, delta) = fitting_angle(|a| (a - 20.0).abs(), 1.0, 70.0);
        assert!((alpha - 20.0).abs() < 1e-3);
        assert!(delta < 1e-3);
    }

    #[test]
    fn residual_jump_is_searched_from_the_fitting_side() {
        // below 9 degrees the band runs into the fitting; a shallow valley
        // further out misses the polar opening by 3 mm
        let residual = |a: f64| {
            if a < 9.0 {
                f64::INFINITY
            } else if a < 9.5 {
                2.0 * (a - 9.0)
            } else {
                3.0 + 0.1 * (a - 40.0).abs()
            }
        };
        let (alpha, delta) = fitting_angle(residual, 1.0, 70.0);
        assert!((alpha - 9.0).abs() < 0.01, "angle {}", alpha);
        assert!(delta < 1.0);
    }
}
