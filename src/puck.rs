//! Puck's 2D failure criterion for unidirectional plies.
//!
//! Exposures are stress exposures: every expression below is homogeneous
//! of degree one in the stress, so scaling the load by `f` scales the
//! exposure by `f`. A value of one means failure.

use crate::material::{PuckParameters, Strength};

/// Inter fibre failure mode that governs a stress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IffMode {
    A,
    B,
    C,
}

/// Strength parameters derived once per material.
#[derive(Debug, Clone, PartialEq)]
pub struct Puck {
    strength: Strength,
    p21_plus: f64,
    p21_minus: f64,
    /// fracture resistance of the action plane against transverse compression
    r22a: f64,
    p22_minus: f64,
    /// shear stress at the turning point between mode B and C
    tau21c: f64,
}

impl Puck {
    pub fn new(strength: &Strength, puck: &PuckParameters) -> Puck {
        let (r21, r2c) = (strength.r21, strength.r2c);
        let p = puck.p21_minus;
        let r22a = if p > 0.0 {
            r21 / (2.0 * p) * ((1.0 + 2.0 * p * r2c / r21).sqrt() - 1.0)
        } else {
            0.5 * r2c
        };
        let p22_minus = p * r22a / r21;
        let tau21c = r21 * (1.0 + 2.0 * p22_minus).sqrt();
        Puck {
            strength: strength.clone(),
            p21_plus: puck.p21_plus,
            p21_minus: p,
            r22a,
            p22_minus,
            tau21c,
        }
    }

    pub fn fibre_failure(&self, s11: f64) -> f64 {
        if s11 >= 0.0 {
            s11 / self.strength.r1t
        } else {
            -s11 / self.strength.r1c
        }
    }

    pub fn iff_mode(&self, s22: f64, s12: f64) -> IffMode {
        if s22 >= 0.0 {
            IffMode::A
        } else if s12 == 0.0 {
            IffMode::C
        } else if (s22 / s12).abs() <= self.r22a / self.tau21c {
            IffMode::B
        } else {
            IffMode::C
        }
    }

    pub fn inter_fibre_failure(&self, s22: f64, s12: f64) -> f64 {
        if s22 == 0.0 && s12 == 0.0 {
            return 0.0;
        }
        let Strength { r2t, r2c, r21, .. } = self.strength;
        let tau = s12.abs();
        match self.iff_mode(s22, s12) {
            IffMode::A => {
                let c = 1.0 - self.p21_plus * r2t / r21;
                ((tau / r21).powi(2) + (c * s22 / r2t).powi(2)).sqrt() + self.p21_plus * s22 / r21
            }
            IffMode::B => ((tau * tau + (self.p21_minus * s22).powi(2)).sqrt() + self.p21_minus * s22) / r21,
            IffMode::C => {
                let shear = tau / (2.0 * (1.0 + self.p22_minus) * r21);
                (shear * shear + (s22 / r2c).powi(2)) * r2c / -s22
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MATERIALS;

    fn puck() -> Puck {
        let m = &MATERIALS["CFRP_HyPo_T700"];
        Puck::new(&m.strength, &m.puck)
    }

    #[test]
    fn uniaxial_strengths_give_unit_exposure() {
        let p = puck();
        let s = &p.strength;
        assert!((p.fibre_failure(s.r1t) - 1.0).abs() < 1e-12);
        assert!((p.fibre_failure(-s.r1c) - 1.0).abs() < 1e-12);
        assert!((p.inter_fibre_failure(s.r2t, 0.0) - 1.0).abs() < 1e-12);
        assert!((p.inter_fibre_failure(-s.r2c, 0.0) - 1.0).abs() < 1e-12);
        assert!((p.inter_fibre_failure(0.0, s.r21) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exposure_scales_linearly() {
        let p = puck();
        for &(s22, s12) in &[(20.0, 30.0), (-20.0, 50.0), (-150.0, 10.0)] {
            let e1 = p.inter_fibre_failure(s22, s12);
            let e2 = p.inter_fibre_failure(2.0 * s22, 2.0 * s12);
            assert!((e2 - 2.0 * e1).abs() < 1e-9);
        }
    }

    #[test]
    fn modes() {
        let p = puck();
        assert_eq!(p.iff_mode(10.0, 5.0), IffMode::A);
        assert_eq!(p.iff_mode(-10.0, 60.0), IffMode::B);
        assert_eq!(p.iff_mode(-150.0, 5.0), IffMode::C);
        assert_eq!(p.inter_fibre_failure(0.0, 0.0), 0.0);
    }

    #[test]
    fn mode_b_and_c_meet_continuously() {
        let p = puck();
        let s12 = 40.0;
        let s22 = -s12 * p.r22a / p.tau21c;
        let below = p.inter_fibre_failure(s22 * (1.0 - 1e-9), s12);
        let above = p.inter_fibre_failure(s22 * (1.0 + 1e-9), s12);
        assert!((below - above).abs() < 1e-3);
    }
}
