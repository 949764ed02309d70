//! Dome contours.
//!
//! Every dome starts at the cylinder (x = 0, r = r_cyl) and runs with
//! increasing x and non-increasing r down to the polar opening.

use std::fmt;
use std::str::FromStr;

use log::debug;

use super::elliptic::ellipse_arc_length;
use super::{contour_length, frustum_area, frustum_volume, make_monotone, offset_nodes, resample};
use crate::error::{DesignError, DesignResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomeType {
    Isotensoid,
    Circle,
    Ellipse,
    ConicalTorispherical,
    Generic,
}

impl DomeType {
    pub fn variants() -> [&'static str; 5] {
        ["isotensoid", "circle", "ellipse", "conicalTorispherical", "generic"]
    }
}

impl FromStr for DomeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "isotensoid" => Ok(DomeType::Isotensoid),
            "circle" | "sphere" | "spherical" => Ok(DomeType::Circle),
            "ellipse" | "ellipsoid" | "ellipsoidal" => Ok(DomeType::Ellipse),
            "conicaltorispherical" | "conical" => Ok(DomeType::ConicalTorispherical),
            "generic" => Ok(DomeType::Generic),
            _ => Err(format!(
                "unknown dome type '{}', expected one of {:?}",
                s,
                DomeType::variants()
            )),
        }
    }
}

impl fmt::Display for DomeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DomeType::Isotensoid => "isotensoid",
            DomeType::Circle => "circle",
            DomeType::Ellipse => "ellipse",
            DomeType::ConicalTorispherical => "conicalTorispherical",
            DomeType::Generic => "generic",
        };
        write!(f, "{}", name)
    }
}

/// Shape ratios of a conical dome with a torispherical fillet and an
/// elliptical cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicalShape {
    /// (r_cyl - r_small) / r_cyl
    pub alpha: f64,
    /// cone length / r_cyl
    pub beta: f64,
    /// fillet radius / r_cyl
    pub gamma: f64,
    /// cap axial half axis / r_small
    pub delta1: f64,
}

impl Default for ConicalShape {
    fn default() -> Self {
        ConicalShape {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.3,
            delta1: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dome {
    kind: DomeType,
    x: Vec<f64>,
    r: Vec<f64>,
}

impl Dome {
    /// Build a dome from a meridian. The contour is moved axially so it
    /// starts at x = 0.
    pub fn new(kind: DomeType, x: Vec<f64>, r: Vec<f64>) -> DesignResult<Dome> {
        if x.len() != r.len() {
            return Err(DesignError::Geometry(format!(
                "dome contour has {} x values but {} radii",
                x.len(),
                r.len()
            )));
        }
        if x.len() < 2 {
            return Err(DesignError::Geometry(
                "dome contour needs at least two points".to_string(),
            ));
        }
        let x0 = x[0];
        let x: Vec<f64> = x.iter().map(|xi| xi - x0).collect();
        if let Some(i) = (1..x.len()).find(|&i| x[i] <= x[i - 1]) {
            return Err(DesignError::Geometry(format!(
                "dome x coordinates must increase strictly (point {})",
                i
            )));
        }
        if let Some(i) = (1..r.len()).find(|&i| r[i] > r[i - 1]) {
            return Err(DesignError::Geometry(format!(
                "dome radii must not increase away from the cylinder (point {})",
                i
            )));
        }
        if r.iter().any(|&ri| !ri.is_finite() || ri < 0.0) || r[r.len() - 1] >= r[0] {
            return Err(DesignError::Geometry(
                "dome radii must be finite, non-negative and end below the cylinder radius".to_string(),
            ));
        }
        Ok(Dome { kind, x, r })
    }

    pub fn generic(x: Vec<f64>, r: Vec<f64>) -> DesignResult<Dome> {
        Dome::new(DomeType::Generic, x, r)
    }

    /// Ellipsoidal dome with radial half axis `r_cyl` and axial half axis
    /// `axial_length`, clipped at the polar opening. Points are spaced
    /// equally along the arc.
    pub fn ellipsoidal(
        r_cyl: f64,
        axial_length: f64,
        r_polar_opening: f64,
        n: usize,
    ) -> DesignResult<Dome> {
        check_radii(r_cyl, r_polar_opening)?;
        if !(axial_length > 0.0) {
            return Err(DesignError::Geometry(format!(
                "ellipse needs a positive axial half axis, got {}",
                axial_length
            )));
        }
        let (x, r) = ellipse_points(r_cyl, axial_length, r_polar_opening, n.max(3));
        let kind = if (axial_length - r_cyl).abs() < 1e-12 * r_cyl {
            DomeType::Circle
        } else {
            DomeType::Ellipse
        };
        Dome::new(kind, x, r)
    }

    pub fn spherical(r_cyl: f64, r_polar_opening: f64, n: usize) -> DesignResult<Dome> {
        Dome::ellipsoidal(r_cyl, r_cyl, r_polar_opening, n)
    }

    /// Geodesic isotensoid from netting theory.
    ///
    /// With u = sin(phi), phi the angle between shell normal and axis,
    /// u(r) = r^3 sqrt(R^2 - r0^2) / (R^3 sqrt(r^2 - r0^2)) and
    /// dx/dr = -u / sqrt(1 - u^2). The meridian ends where u returns to one;
    /// r0 is chosen so that happens at the requested polar opening.
    pub fn isotensoid(r_cyl: f64, r_polar_opening: f64, n: usize) -> DesignResult<Dome> {
        check_radii(r_cyl, r_polar_opening)?;
        if r_polar_opening <= 0.0 {
            return Err(DesignError::Geometry(
                "an isotensoid needs a polar opening radius above zero".to_string(),
            ));
        }
        let r0 = isotensoid_winding_radius(r_cyl, r_polar_opening)?;
        let r_end = isotensoid_end_radius(r_cyl, r0);
        debug!(
            "isotensoid: r_cyl {} polar opening {} geodesic radius {}",
            r_cyl, r_end, r0
        );

        let steps = 4000;
        let half = 0.5 * (r_cyl - r_end);
        let mid = 0.5 * (r_cyl + r_end);
        let dtau = std::f64::consts::PI / steps as f64;
        let mut x = Vec::with_capacity(steps + 1);
        let mut r = Vec::with_capacity(steps + 1);
        x.push(0.0);
        r.push(r_cyl);
        let mut xi = 0.0;
        for j in 0..steps {
            let tau_mid = (j as f64 + 0.5) * dtau;
            let rm = mid + half * tau_mid.cos();
            let u = isotensoid_u(r_cyl, r0, rm).min(1.0);
            let slope = u / (1.0 - u * u).max(1e-12).sqrt();
            xi += slope * half * tau_mid.sin() * dtau;
            let tau = (j + 1) as f64 * dtau;
            x.push(xi);
            r.push(mid + half * tau.cos());
        }
        let last = r.len() - 1;
        r[0] = r_cyl;
        r[last] = r_polar_opening;

        let (x, mut r) = resample(&x, &r, n.max(3));
        let last = r.len() - 1;
        r[0] = r_cyl;
        r[last] = r_polar_opening;
        Dome::new(DomeType::Isotensoid, x, r)
    }

    /// Torispherical fillet, frustum and elliptical cap.
    pub fn conical_torispherical(
        r_cyl: f64,
        r_polar_opening: f64,
        shape: ConicalShape,
        n: usize,
    ) -> DesignResult<Dome> {
        check_radii(r_cyl, r_polar_opening)?;
        let r_small = r_cyl * (1.0 - shape.alpha);
        if !(shape.alpha > 0.0) || r_small >= r_cyl || r_small <= 0.0 {
            return Err(DesignError::Geometry(format!(
                "conical dome needs 0 < alpha < 1, got {}",
                shape.alpha
            )));
        }
        if r_polar_opening >= r_small {
            return Err(DesignError::Geometry(format!(
                "polar opening {} lies outside the cone apex radius {}",
                r_polar_opening, r_small
            )));
        }
        if !(shape.beta > 0.0) || shape.gamma < 0.0 || !(shape.delta1 > 0.0) {
            return Err(DesignError::Geometry(
                "conical dome needs beta > 0, gamma >= 0 and delta1 > 0".to_string(),
            ));
        }
        let l_cone = shape.beta * r_cyl;
        let radius = shape.gamma * r_cyl;
        let phi = ((r_cyl - r_small) / l_cone).atan();
        let x_fillet = radius * phi.sin();
        let r_fillet = r_cyl - radius * (1.0 - phi.cos());
        if r_fillet <= r_small {
            return Err(DesignError::Geometry(
                "fillet radius consumes the whole cone".to_string(),
            ));
        }
        let x_cone = x_fillet + (r_fillet - r_small) / phi.tan();

        let mut x = vec![0.0];
        let mut r = vec![r_cyl];
        let n_fillet = (n / 5).max(3);
        if radius > 0.0 {
            for i in 1..n_fillet {
                let t = phi * i as f64 / (n_fillet - 1) as f64;
                x.push(radius * t.sin());
                r.push(r_cyl - radius * (1.0 - t.cos()));
            }
        }
        x.push(x_cone);
        r.push(r_small);
        let (xc, rc) = ellipse_points(r_small, shape.delta1 * r_small, r_polar_opening, (n / 2).max(3));
        for (xi, ri) in xc.iter().zip(rc).skip(1) {
            x.push(x_cone + xi);
            r.push(ri);
        }
        let (x, mut r) = resample(&x, &r, n.max(3));
        let last = r.len() - 1;
        r[last] = r_polar_opening;
        Dome::new(DomeType::ConicalTorispherical, x, r)
    }

    pub fn kind(&self) -> DomeType {
        self.kind
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn r_cyl(&self) -> f64 {
        self.r[0]
    }

    pub fn r_polar_opening(&self) -> f64 {
        self.r[self.r.len() - 1]
    }

    /// Axial length of the dome.
    pub fn length(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn contour_length(&self) -> f64 {
        contour_length(&self.x, &self.r)
    }

    pub fn area(&self) -> f64 {
        frustum_area(&self.x, &self.r)
    }

    pub fn volume(&self) -> f64 {
        frustum_volume(&self.x, &self.r)
    }

    /// The contour resampled at `n` points equally spaced in arc length.
    pub fn get_contour(&self, n: usize) -> (Vec<f64>, Vec<f64>) {
        resample(&self.x, &self.r, n)
    }

    /// Copy of the dome offset along its normals. Positive thickness
    /// grows the dome outward.
    pub fn resized(&self, thickness: f64) -> DesignResult<Dome> {
        let t = vec![thickness; self.x.len()];
        let (mut x, mut r) = offset_nodes(&self.x, &self.r, &t);
        make_monotone(&mut x, &mut r);
        if r[r.len() - 1] < 0.0 {
            return Err(DesignError::Geometry(format!(
                "offset of {} closes the polar opening",
                thickness
            )));
        }
        Dome::new(self.kind, x, r)
    }
}

fn check_radii(r_cyl: f64, r_polar_opening: f64) -> DesignResult<()> {
    if !(r_cyl > 0.0) {
        return Err(DesignError::Geometry(format!(
            "cylinder radius must be positive, got {}",
            r_cyl
        )));
    }
    if !(r_polar_opening >= 0.0) || r_polar_opening >= r_cyl {
        return Err(DesignError::Geometry(format!(
            "polar opening radius {} must lie in [0, {})",
            r_polar_opening, r_cyl
        )));
    }
    Ok(())
}

// Points on the ellipse quadrant spaced equally along the arc.
fn ellipse_points(a: f64, b: f64, r_polar_opening: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let theta_end = (r_polar_opening / a).min(1.0).acos();
    let total = ellipse_arc_length(a, b, theta_end);
    let mut x = Vec::with_capacity(n);
    let mut r = Vec::with_capacity(n);
    for i in 0..n {
        let target = total * i as f64 / (n - 1) as f64;
        let (mut lo, mut hi) = (0.0, theta_end);
        for _ in 0..60 {
            let mid = 0.5 * (lo + hi);
            if ellipse_arc_length(a, b, mid) < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let theta = 0.5 * (lo + hi);
        x.push(b * theta.sin());
        r.push((a * theta.cos()).max(r_polar_opening));
    }
    r[0] = a;
    r[n - 1] = r_polar_opening;
    x[0] = 0.0;
    (x, r)
}

fn isotensoid_u(r_cyl: f64, r0: f64, r: f64) -> f64 {
    r.powi(3) * (r_cyl * r_cyl - r0 * r0).sqrt() / (r_cyl.powi(3) * (r * r - r0 * r0).sqrt())
}

// Radius below the cylinder where the isotensoid meridian turns axial again.
fn isotensoid_end_radius(r_cyl: f64, r0: f64) -> f64 {
    let (mut lo, mut hi) = (r0 * (1.0 + 1e-12), (1.5f64).sqrt() * r0);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if isotensoid_u(r_cyl, r0, mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

fn isotensoid_winding_radius(r_cyl: f64, r_polar_opening: f64) -> DesignResult<f64> {
    let sqrt15 = (1.5f64).sqrt();
    let lo_bound = r_polar_opening / sqrt15;
    if isotensoid_u(r_cyl, lo_bound, sqrt15 * lo_bound) >= 1.0 {
        return Err(DesignError::Geometry(format!(
            "polar opening {} is too large for an isotensoid on radius {}",
            r_polar_opening, r_cyl
        )));
    }
    let (mut lo, mut hi) = (lo_bound, r_polar_opening);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let feasible = isotensoid_u(r_cyl, mid, sqrt15 * mid) < 1.0;
        if feasible && isotensoid_end_radius(r_cyl, mid) < r_polar_opening {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::segment_lengths;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn variance(values: &[f64]) -> f64 {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
    }

    #[test]
    fn sphere_points_are_equidistant() {
        for &n in &[5, 20, 200] {
            let dome = Dome::spherical(200.0, 10.0, n).unwrap();
            assert_eq!(dome.kind(), DomeType::Circle);
            let seg = segment_lengths(dome.x(), dome.r());
            assert!(variance(&seg) < 1e-4, "n = {}", n);
        }
    }

    #[test]
    fn hemisphere_measures() {
        let dome = Dome::spherical(100.0, 0.0, 2000).unwrap();
        let area = 2.0 * PI * 100.0f64.powi(2);
        let volume = 2.0 / 3.0 * PI * 100.0f64.powi(3);
        assert!((dome.area() - area).abs() / area < 1e-5);
        assert!((dome.volume() - volume).abs() / volume < 1e-5);
        assert!((dome.length() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ellipse_is_clipped_at_polar_opening() {
        let dome = Dome::ellipsoidal(200.0, 100.0, 30.0, 100).unwrap();
        assert_eq!(dome.kind(), DomeType::Ellipse);
        assert!((dome.r_polar_opening() - 30.0).abs() < 1e-12);
        assert!(dome.r().iter().all(|&r| r >= 30.0));
        assert!(dome.length() < 100.0);
    }

    #[test]
    fn isotensoid_reaches_polar_opening() {
        let dome = Dome::isotensoid(200.0, 23.0, 300).unwrap();
        assert_eq!(dome.kind(), DomeType::Isotensoid);
        assert!((dome.r_cyl() - 200.0).abs() < 1e-12);
        assert!((dome.r_polar_opening() - 23.0).abs() < 1e-12);
        // flatter than a hemisphere
        assert!(dome.length() < 200.0);
        assert!(dome.length() > 50.0);
    }

    #[test]
    fn polar_opening_must_lie_inside_cylinder() {
        assert!(Dome::isotensoid(100.0, 100.0, 100).is_err());
        assert!(Dome::spherical(100.0, 120.0, 100).is_err());
        assert!(Dome::isotensoid(100.0, 0.0, 100).is_err());
    }

    #[test]
    fn conical_dome_validation() {
        let shape = ConicalShape::default();
        let dome = Dome::conical_torispherical(200.0, 20.0, shape, 200).unwrap();
        assert!((dome.r_polar_opening() - 20.0).abs() < 1e-12);
        assert!(Dome::conical_torispherical(200.0, 150.0, shape, 200).is_err());
        let flat = ConicalShape { alpha: 0.0, ..shape };
        assert!(Dome::conical_torispherical(200.0, 20.0, flat, 200).is_err());
    }

    #[test]
    fn generic_rejects_increasing_radius() {
        assert!(Dome::generic(vec![0.0, 1.0, 2.0], vec![10.0, 11.0, 5.0]).is_err());
        let dome = Dome::generic(vec![5.0, 6.0, 7.0], vec![10.0, 8.0, 5.0]).unwrap();
        assert!((dome.x()[0]).abs() < 1e-12);
    }

    #[test]
    fn contour_resampling_round_trip() {
        let dome = Dome::isotensoid(150.0, 20.0, 400).unwrap();
        let (x, r) = dome.get_contour(60);
        let copy = Dome::generic(x.clone(), r.clone()).unwrap();
        let (x2, r2) = copy.get_contour(60);
        assert_eq!(x2.len(), 60);
        for i in 0..60 {
            assert!((x[i] - x2[i]).abs() < 1e-9, "x at {}", i);
            assert!((r[i] - r2[i]).abs() < 1e-9, "r at {}", i);
        }
    }

    #[test]
    fn offset_round_trip_keeps_volume() {
        let dome = Dome::ellipsoidal(200.0, 120.0, 25.0, 400).unwrap();
        let back = dome.resized(0.5).unwrap().resized(-0.5).unwrap();
        assert!((back.volume() - dome.volume()).abs() / dome.volume() < 1e-4);
    }

    proptest! {
        #[test]
        fn dome_measures_are_consistent(
            r_cyl in 50.0f64..500.0,
            po_ratio in 0.05f64..0.4,
            length_ratio in 0.3f64..1.5,
        ) {
            let r_po = po_ratio * r_cyl;
            let dome = Dome::ellipsoidal(r_cyl, length_ratio * r_cyl, r_po, 50).unwrap();
            prop_assert!(dome.area() >= 0.0);
            prop_assert!(dome.volume() >= 0.0);
            prop_assert!(dome.contour_length() >= (r_cyl - r_po).abs() - 1e-9);
        }
    }
}
