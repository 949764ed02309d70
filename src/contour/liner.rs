//! Liner made of a cylinder closed by one dome at each end.

use std::f64::consts::PI;

use super::dome::Dome;
use super::Side;
use crate::error::{DesignError, DesignResult};

#[derive(Debug, Clone)]
pub struct Liner {
    dome: Dome,
    dome2: Option<Dome>,
    lcyl: f64,
}

impl Liner {
    /// A liner with `dome` on both ends unless a second dome is given.
    pub fn new(dome: Dome, lcyl: f64, dome2: Option<Dome>) -> DesignResult<Liner> {
        if !(lcyl >= 0.0) {
            return Err(DesignError::Geometry(format!(
                "cylindrical length must not be negative, got {}",
                lcyl
            )));
        }
        if let Some(other) = &dome2 {
            if (other.r_cyl() - dome.r_cyl()).abs() > 1e-6 * dome.r_cyl() {
                return Err(DesignError::Geometry(format!(
                    "both domes need the same cylinder radius ({} and {})",
                    dome.r_cyl(),
                    other.r_cyl()
                )));
            }
        }
        Ok(Liner { dome, dome2, lcyl })
    }

    pub fn symmetric(&self) -> bool {
        self.dome2.is_none()
    }

    pub fn dome(&self, side: Side) -> &Dome {
        match (side, &self.dome2) {
            (Side::Two, Some(dome2)) => dome2,
            _ => &self.dome,
        }
    }

    pub fn r_cyl(&self) -> f64 {
        self.dome.r_cyl()
    }

    pub fn lcyl(&self) -> f64 {
        self.lcyl
    }

    pub fn length(&self) -> f64 {
        self.lcyl + self.dome(Side::One).length() + self.dome(Side::Two).length()
    }

    /// Volume enclosed by the contour.
    pub fn volume(&self) -> f64 {
        PI * self.r_cyl().powi(2) * self.lcyl
            + self.dome(Side::One).volume()
            + self.dome(Side::Two).volume()
    }

    pub fn area(&self) -> f64 {
        2.0 * PI * self.r_cyl() * self.lcyl + self.dome(Side::One).area() + self.dome(Side::Two).area()
    }

    /// Copy with both domes offset by `thickness`; the cylindrical length is kept.
    pub fn resized(&self, thickness: f64) -> DesignResult<Liner> {
        let dome = self.dome.resized(thickness)?;
        let dome2 = match &self.dome2 {
            Some(d) => Some(d.resized(thickness)?),
            None => None,
        };
        Liner::new(dome, self.lcyl, dome2)
    }

    /// Volume of a wall of `thickness` grown outward from this contour.
    pub fn wall_volume(&self, thickness: f64) -> DesignResult<f64> {
        Ok(self.resized(thickness)?.volume() - self.volume())
    }

    /// Meridian of one half of the liner, from the cylinder midpoint over
    /// the dome to the polar opening, with about `dome_points` points on
    /// the dome. Returns x, r and the index of the cylinder end node.
    pub fn meridian(&self, side: Side, dome_points: usize) -> (Vec<f64>, Vec<f64>, usize) {
        let dome = self.dome(side);
        let (dx, dr) = dome.get_contour(dome_points.max(3));
        let spacing = dome.contour_length() / (dome_points.max(3) - 1) as f64;
        let half = 0.5 * self.lcyl;
        let n_cyl = if half > 0.0 { (half / spacing).ceil().max(1.0) as usize } else { 0 };

        let mut x = Vec::with_capacity(n_cyl + dx.len());
        let mut r = Vec::with_capacity(n_cyl + dx.len());
        for i in 0..n_cyl {
            x.push(half * i as f64 / n_cyl as f64);
            r.push(dome.r_cyl());
        }
        let cylinder_end = x.len();
        for (xi, ri) in dx.iter().zip(dr) {
            x.push(half + xi);
            r.push(ri);
        }
        (x, r, cylinder_end)
    }

    /// Whole liner contour along the axis for plotting, from the second
    /// polar opening to the first.
    pub fn full_contour(&self) -> (Vec<f64>, Vec<f64>) {
        let half = 0.5 * self.lcyl;
        let d2 = self.dome(Side::Two);
        let d1 = self.dome(Side::One);
        let mut x: Vec<f64> = d2.x().iter().rev().map(|xi| -half - xi).collect();
        let mut r: Vec<f64> = d2.r().iter().rev().cloned().collect();
        x.extend(d1.x().iter().map(|xi| half + xi));
        r.extend(d1.r().iter().cloned());
        (x, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_with_cylinder_measures() {
        let dome = Dome::spherical(100.0, 0.0, 1000).unwrap();
        let liner = Liner::new(dome, 300.0, None).unwrap();
        let volume = PI * 100.0f64.powi(2) * 300.0 + 4.0 / 3.0 * PI * 100.0f64.powi(3);
        assert!((liner.volume() - volume).abs() / volume < 1e-5);
        assert!((liner.length() - 500.0).abs() < 1e-9);
        assert!(liner.symmetric());
    }

    #[test]
    fn unsymmetric_domes_need_same_radius() {
        let d1 = Dome::spherical(100.0, 10.0, 50).unwrap();
        let d2 = Dome::spherical(90.0, 10.0, 50).unwrap();
        assert!(Liner::new(d1, 100.0, Some(d2)).is_err());
    }

    #[test]
    fn meridian_starts_at_cylinder_midpoint() {
        let dome = Dome::isotensoid(200.0, 20.0, 100).unwrap();
        let liner = Liner::new(dome, 400.0, None).unwrap();
        let (x, r, cyl_end) = liner.meridian(Side::One, 100);
        assert!(x[0].abs() < 1e-12);
        assert!((x[cyl_end] - 200.0).abs() < 1e-9);
        assert!(x.windows(2).all(|w| w[1] > w[0]));
        assert!(r.windows(2).all(|w| w[1] <= w[0]));
        assert!((r[r.len() - 1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn meridian_without_cylinder() {
        let dome = Dome::isotensoid(200.0, 20.0, 80).unwrap();
        let liner = Liner::new(dome, 0.0, None).unwrap();
        let (x, _r, cyl_end) = liner.meridian(Side::One, 80);
        assert_eq!(cyl_end, 0);
        assert_eq!(x.len(), 80);
    }

    #[test]
    fn wall_volume_of_thin_wall() {
        let dome = Dome::spherical(100.0, 0.0, 1000).unwrap();
        let liner = Liner::new(dome, 200.0, None).unwrap();
        let wall = liner.wall_volume(1.0).unwrap();
        let approx = liner.area() * 1.0;
        assert!((wall - approx).abs() / approx < 0.02);
    }
}
