//! Hoop ply placement.
//!
//! A hoop ply is placed by its shift: the axial distance of its edge from
//! the cylinder end. Either the shift of the new ply is optimised, or all
//! hoop plies are spread evenly over the hoop region and the new ply picks
//! its slot.

use log::debug;

use super::{LayerDesign, PlyChoice, TrialSetup};
use crate::error::DesignResult;
use crate::numbers::linspace;
use crate::optimise::Bound;
use crate::winding::sides;

pub(crate) const HOOP_ANGLE: f64 = 90.0;

/// Equally spaced hoop shifts in `[-s_max / 2, s_max]`.
pub fn distribute_positions(n: usize, s_max: f64) -> Vec<f64> {
    linspace(-0.5 * s_max, s_max, n)
}

impl LayerDesign {
    /// Contour length from the cylinder end to the end of the hoop region
    /// on the bare mandrel, the smaller over both sides.
    pub(crate) fn hoop_shift_limit(&self) -> f64 {
        let rel = self.settings.rel_radius_hoop_layer_end;
        sides(&*self.engine)
            .into_iter()
            .map(|side| {
                let bare = self.engine.bare_mandrel(side);
                bare.length_at_radius(rel * bare.r_cyl()) - bare.cylinder_end_length()
            })
            .fold(f64::INFINITY, f64::min)
            .max(0.0)
    }

    pub(crate) fn hoop_subproblem(&self, k: usize, setup: &TrialSetup) -> DesignResult<PlyChoice> {
        let s_max = self.hoop_shift_limit();
        let choice = if self.settings.do_hoop_opt {
            self.optimise_hoop(k, s_max.min(self.settings.hoop_shift_cap), setup)
        } else {
            self.distribute_hoop(k, s_max, setup)
        };
        debug!(
            "hoop layer {}: shift {:.3} (limit {:.3}), target {:.5}, redistributed {:?}",
            k, choice.shift, s_max, choice.value, choice.redistributed
        );
        Ok(choice)
    }

    fn optimise_hoop(&self, k: usize, upper: f64, setup: &TrialSetup) -> PlyChoice {
        let (shift, value) = if upper > 0.0 {
            let objective = |x: &[f64]| self.trial_value(k, HOOP_ANGLE, &[(k, x[0])], setup, x[0]);
            let best = self.minimise_global(&objective, Bound::new(0.0, upper), Some(0.0));
            (best.x[0], best.fun)
        } else {
            (0.0, self.trial_value(k, HOOP_ANGLE, &[(k, 0.0)], setup, 0.0))
        };
        PlyChoice {
            angle: HOOP_ANGLE,
            shift,
            value,
            redistributed: vec![],
            min_angle: None,
        }
    }

    /// Try the new ply in every slot; the other hoop plies keep their order.
    fn distribute_hoop(&self, k: usize, s_max: f64, setup: &TrialSetup) -> PlyChoice {
        let existing: Vec<usize> = self
            .laminate
            .plies()
            .iter()
            .enumerate()
            .filter(|&(i, ply)| i != k && ply.is_hoop())
            .map(|(i, _)| i)
            .collect();
        let positions = distribute_positions(existing.len() + 1, s_max);

        let mut best = PlyChoice {
            angle: HOOP_ANGLE,
            shift: 0.0,
            value: f64::INFINITY,
            redistributed: vec![],
            min_angle: None,
        };
        for (slot, &shift) in positions.iter().enumerate() {
            let others: Vec<f64> = positions
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != slot)
                .map(|(_, &s)| s)
                .collect();
            let mut shifts: Vec<(usize, f64)> = existing.iter().cloned().zip(others).collect();
            let redistributed = shifts.clone();
            shifts.push((k, shift));
            let value = self.trial_value(k, HOOP_ANGLE, &shifts, setup, shift);
            if value < best.value || (slot == 0 && !value.is_finite()) {
                best = PlyChoice {
                    angle: HOOP_ANGLE,
                    shift,
                    value,
                    redistributed,
                    min_angle: None,
                };
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::small_design;
    use super::super::DesignSettings;
    use super::*;
    use crate::laminate::LayerKind;
    use crate::target::{CriticalLocations, TargetFunction};

    #[test]
    fn positions_span_the_hoop_region() {
        let positions = distribute_positions(5, 40.0);
        assert_eq!(positions, vec![-20.0, -5.0, 10.0, 25.0, 40.0]);
        assert_eq!(distribute_positions(1, 40.0), vec![-20.0]);
    }

    #[test]
    fn shift_limit_ends_at_the_hoop_region() {
        let design = small_design(140.0, 1);
        let s_max = design.hoop_shift_limit();
        assert!(s_max > 0.0);
        let bare = design.engine().bare_mandrel(crate::contour::Side::One);
        let radius = crate::numbers::interp(
            bare.cylinder_end_length() + s_max,
            &bare.l,
            &bare.r,
        );
        assert!((radius - 0.95 * bare.r_cyl()).abs() < 0.5);
    }

    #[test]
    fn optimised_shift_stays_in_bounds() {
        let mut design = small_design(140.0, 2);
        design.run().unwrap();
        let k = design.append_ply(90.0, 0.0).unwrap();
        let setup = TrialSetup {
            target: TargetFunction::default(),
            memory: CriticalLocations { puck: 0, bend: 0 },
            mask: Some(&[0usize, 1, 2][..]),
        };
        let choice = design.hoop_subproblem(k, &setup).unwrap();
        assert_eq!(choice.angle, 90.0);
        assert!(choice.shift >= 0.0);
        assert!(choice.shift <= design.hoop_shift_limit().min(design.settings().hoop_shift_cap));
        assert!(choice.value.is_finite());
        assert!(choice.redistributed.is_empty());
    }

    #[test]
    fn distributed_hoop_plies_are_equally_spaced() {
        let mut design = small_design(140.0, 6);
        design.settings = DesignSettings {
            do_hoop_opt: false,
            initial_stack: vec![(8.0, 0.0), (90.0, 0.0), (90.0, 0.0), (90.0, 0.0), (90.0, 0.0)],
            ..design.settings.clone()
        };
        design.start_stack().unwrap();
        let k = design.append_ply(90.0, 0.0).unwrap();
        let setup = TrialSetup {
            target: TargetFunction::default(),
            memory: CriticalLocations { puck: 0, bend: 0 },
            mask: None,
        };
        let choice = design.hoop_subproblem(k, &setup).unwrap();
        assert!(choice.value.is_finite());
        assert_eq!(choice.redistributed.len(), 4);
        design.apply_choice(k, LayerKind::Hoop, &choice).unwrap();

        let mut shifts: Vec<f64> = design
            .laminate()
            .plies()
            .iter()
            .filter(|ply| ply.is_hoop())
            .map(|ply| ply.hoop_shift)
            .collect();
        shifts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected = distribute_positions(5, design.hoop_shift_limit());
        for (s, e) in shifts.iter().zip(&expected) {
            assert!((s - e).abs() < 1e-9);
        }
        for pair in engine_shifts(&design).windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    fn engine_shifts(design: &LayerDesign) -> Vec<f64> {
        let engine = design.engine();
        let mut shifts: Vec<f64> = (0..engine.layer_count())
            .filter(|&k| engine.layer_angle(k) > 89.0)
            .map(|k| engine.layer_shift(k))
            .collect();
        shifts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        shifts
    }
}
