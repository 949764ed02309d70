//! Bounded scalar minimisation by Brent's method.
//!
//! Golden section steps mixed with parabolic interpolation on a fixed
//! interval, as in the classic `fminbound` routine.

use super::{finite_or_inf, Bound, Evaluation, Objective, Optimisation};

const GOLDEN: f64 = 0.381_966_011_250_105_1;

#[derive(Debug, Clone, Copy)]
pub struct Brent {
    /// absolute tolerance on x
    pub xtol: f64,
    pub max_evaluations: usize,
}

impl Default for Brent {
    fn default() -> Brent {
        Brent {
            xtol: 1e-5,
            max_evaluations: 500,
        }
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl Brent {
    /// Minimise `f` on `[lower, upper]`. Returns `(x, f(x), evaluations)`.
    pub fn fminbound<F>(&self, f: F, lower: f64, upper: f64) -> (f64, f64, usize)
    where
        F: Fn(f64) -> f64,
    {
        let sqrt_eps = f64::EPSILON.sqrt();
        let (mut a, mut b) = (lower, upper);
        let mut fulc = a + GOLDEN * (b - a);
        let (mut nfc, mut xf) = (fulc, fulc);
        let (mut rat, mut e) = (0.0_f64, 0.0_f64);
        let mut fx = finite_or_inf(f(xf));
        let mut calls = 1;
        let (mut ffulc, mut fnfc) = (fx, fx);
        let mut xm = 0.5 * (a + b);
        let mut tol1 = sqrt_eps * xf.abs() + self.xtol / 3.0;
        let mut tol2 = 2.0 * tol1;

        while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
            let mut golden = true;
            if e.abs() > tol1 {
                // parabolic fit through the three best points
                let mut r = (xf - nfc) * (fx - ffulc);
                let mut q = (xf - fulc) * (fx - fnfc);
                let mut p = (xf - fulc) * q - (xf - nfc) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();
                r = e;
                e = rat;
                if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                    rat = p / q;
                    let x = xf + rat;
                    golden = false;
                    if (x - a) < tol2 || (b - x) < tol2 {
                        let si = sign(xm - xf) + if xm == xf { 1.0 } else { 0.0 };
                        rat = tol1 * si;
                    }
                }
            }
            if golden {
                e = if xf >= xm { a - xf } else { b - xf };
                rat = GOLDEN * e;
            }

            let si = sign(rat) + if rat == 0.0 { 1.0 } else { 0.0 };
            let x = xf + si * rat.abs().max(tol1);
            let fu = finite_or_inf(f(x));
            calls += 1;

            if fu <= fx {
                if x >= xf {
                    a = xf;
                } else {
                    b = xf;
                }
                fulc = nfc;
                ffulc = fnfc;
                nfc = xf;
                fnfc = fx;
                xf = x;
                fx = fu;
            } else {
                if x < xf {
                    a = x;
                } else {
                    b = x;
                }
                if fu <= fnfc || nfc == xf {
                    fulc = nfc;
                    ffulc = fnfc;
                    nfc = x;
                    fnfc = fu;
                } else if fu <= ffulc || fulc == xf || fulc == nfc {
                    fulc = x;
                    ffulc = fu;
                }
            }

            xm = 0.5 * (a + b);
            tol1 = sqrt_eps * xf.abs() + self.xtol / 3.0;
            tol2 = 2.0 * tol1;
            if calls >= self.max_evaluations {
                break;
            }
        }
        (xf, fx, calls)
    }
}

impl Optimisation for Brent {
    /// One dimensional objectives only; further variables stay at their
    /// lower bound.
    fn minimise(&mut self, objective: &Objective, bounds: &[Bound]) -> Evaluation {
        let rest: Vec<f64> = bounds.iter().skip(1).map(|b| b.lower).collect();
        let (x, fun, evaluations) = self.fminbound(
            |x0| {
                let mut x = vec![x0];
                x.extend(&rest);
                objective(&x)
            },
            bounds[0].lower,
            bounds[0].upper,
        );
        let mut x = vec![x];
        x.extend(rest);
        Evaluation { x, fun, evaluations }
    }

    fn name(&self) -> &str {
        "Brent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parabola() {
        let (x, fx, _) = Brent::default().fminbound(|x| (x - 2.0).powi(2) + 1.0, 0.0, 5.0);
        assert!((x - 2.0).abs() < 1e-4);
        assert!((fx - 1.0).abs() < 1e-8);
    }

    #[test]
    fn minimum_on_the_bound() {
        let (x, _, _) = Brent::default().fminbound(|x| x, 1.0, 70.0);
        assert!((x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn infinite_left_region() {
        // feasible only above 7.3, closest to 7.3 there
        let f = |x: f64| if x < 7.3 { f64::INFINITY } else { x - 7.3 };
        let (x, fx, _) = Brent::default().fminbound(f, 1.0, 70.0);
        assert!(fx < 1e-3);
        assert!(x >= 7.3);
    }

    #[test]
    fn cosine() {
        let (x, _, _) = Brent::default().fminbound(|x: f64| x.cos(), 3.0, 4.0);
        assert!((x - std::f64::consts::PI).abs() < 1e-4);
    }
}
