//! Axisymmetric contours of liners, domes and mandrels.
//!
//! A contour is a meridian polyline given by axial coordinates `x` and
//! radii `r`. Lengths are in mm.

use std::f64::consts::PI;

use crate::error::{DesignError, DesignResult};
use crate::numbers::{cumulative, interp};

pub mod dome;
pub mod elliptic;
pub mod liner;

pub use self::dome::{ConicalShape, Dome, DomeType};
pub use self::liner::Liner;

/// Vessel half: side one carries the first dome, side two the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }
}

/// Length of each polyline segment.
pub fn segment_lengths(x: &[f64], r: &[f64]) -> Vec<f64> {
    x.windows(2)
        .zip(r.windows(2))
        .map(|(xs, rs)| ((xs[1] - xs[0]).powi(2) + (rs[1] - rs[0]).powi(2)).sqrt())
        .collect()
}

/// Cumulative arc length along the polyline, starting at zero.
pub fn arc_lengths(x: &[f64], r: &[f64]) -> Vec<f64> {
    cumulative(&segment_lengths(x, r))
}

pub fn contour_length(x: &[f64], r: &[f64]) -> f64 {
    segment_lengths(x, r).iter().sum()
}

/// Volume of revolution as a stack of truncated cones.
pub fn frustum_volume(x: &[f64], r: &[f64]) -> f64 {
    x.windows(2)
        .zip(r.windows(2))
        .map(|(xs, rs)| {
            let (big, small) = (rs[0], rs[1]);
            PI * (xs[1] - xs[0]).abs() / 3.0 * (big * big + big * small + small * small)
        })
        .sum()
}

/// Lateral surface of the truncated cones.
pub fn frustum_area(x: &[f64], r: &[f64]) -> f64 {
    x.windows(2)
        .zip(r.windows(2))
        .map(|(xs, rs)| {
            let (big, small) = (rs[0], rs[1]);
            PI * (big + small) * ((big - small).powi(2) + (xs[1] - xs[0]).powi(2)).sqrt()
        })
        .sum()
}

/// Resample the polyline at `n` points with equal chords between
/// neighbours, the first and last point on the polyline ends. A polyline
/// whose chords are already equal keeps its nodes, so resampling a
/// resampled contour at the same count gives it back.
///
/// The polyline must run monotone in both coordinates, as every dome
/// meridian does.
pub fn resample(x: &[f64], r: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let total = contour_length(x, r);
    if n < 2 || !(total > 0.0) {
        return (vec![x[0]; n], vec![r[0]; n]);
    }
    // a chord never exceeds the arc it spans
    let (mut lo, mut hi) = (0.0, total / (n - 1) as f64);
    if chord_walk(x, r, hi, n - 1).is_some() {
        lo = hi;
    }
    for _ in 0..200 {
        if hi - lo <= 1e-15 * total {
            break;
        }
        let c = 0.5 * (lo + hi);
        if chord_walk(x, r, c, n - 1).is_some() {
            lo = c;
        } else {
            hi = c;
        }
    }
    let (mut xs, mut rs) = chord_walk(x, r, lo, n - 1).unwrap_or_else(|| (vec![x[0]; n], vec![r[0]; n]));
    let last = x.len() - 1;
    xs[n - 1] = x[last];
    rs[n - 1] = r[last];
    (xs, rs)
}

/// Walk `steps` chords of length `c` from the start of the polyline.
/// None when the walk runs off its end.
fn chord_walk(x: &[f64], r: &[f64], c: f64, steps: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    let mut xs = Vec::with_capacity(steps + 1);
    let mut rs = Vec::with_capacity(steps + 1);
    let (mut px, mut pr) = (x[0], r[0]);
    xs.push(px);
    rs.push(pr);
    let (mut j, mut t) = (0, 0.0);
    for _ in 0..steps {
        loop {
            if j + 1 >= x.len() {
                return None;
            }
            let (dx, dr) = (x[j + 1] - x[j], r[j + 1] - r[j]);
            let (fx, fr) = (x[j] - px, r[j] - pr);
            // where segment j leaves the circle of radius c around the last point
            let qa = dx * dx + dr * dr;
            let qb = 2.0 * (fx * dx + fr * dr);
            let qc = fx * fx + fr * fr - c * c;
            let disc = qb * qb - 4.0 * qa * qc;
            if qa > 0.0 && disc >= 0.0 {
                let s = (-qb + disc.sqrt()) / (2.0 * qa);
                if s >= t && s <= 1.0 {
                    t = s;
                    px = x[j] + s * dx;
                    pr = r[j] + s * dr;
                    break;
                }
            }
            j += 1;
            t = 0.0;
        }
        xs.push(px);
        rs.push(pr);
    }
    Some((xs, rs))
}

/// Unit outward normals at the nodes, averaged over the adjacent segments.
pub fn node_normals(x: &[f64], r: &[f64]) -> Vec<(f64, f64)> {
    let n = x.len();
    let seg: Vec<(f64, f64)> = x
        .windows(2)
        .zip(r.windows(2))
        .map(|(xs, rs)| {
            let (dx, dr) = (xs[1] - xs[0], rs[1] - rs[0]);
            let len = (dx * dx + dr * dr).sqrt().max(f64::MIN_POSITIVE);
            (-dr / len, dx / len)
        })
        .collect();
    (0..n)
        .map(|i| {
            let (a, b) = match (i.checked_sub(1).and_then(|j| seg.get(j)), seg.get(i)) {
                (Some(a), Some(b)) => (*a, *b),
                (Some(a), None) => (*a, *a),
                (None, Some(b)) => (*b, *b),
                (None, None) => ((0.0, 1.0), (0.0, 1.0)),
            };
            let (nx, nr) = (a.0 + b.0, a.1 + b.1);
            let len = (nx * nx + nr * nr).sqrt().max(f64::MIN_POSITIVE);
            (nx / len, nr / len)
        })
        .collect()
}

/// Offset each node along its outward normal by its own thickness.
/// Negative thickness moves the contour inward.
pub fn offset_nodes(x: &[f64], r: &[f64], thickness: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let normals = node_normals(x, r);
    x.iter()
        .zip(r)
        .zip(normals)
        .zip(thickness)
        .map(|(((&xi, &ri), (nx, nr)), &t)| (xi + t * nx, ri + t * nr))
        .unzip()
}

/// Keep a meridian valid after an offset: `x` strictly increasing and
/// `r` non-increasing away from the cylinder.
pub fn make_monotone(x: &mut [f64], r: &mut [f64]) {
    for i in 1..x.len() {
        if x[i] <= x[i - 1] {
            x[i] = x[i - 1] + 1e-9;
        }
        if r[i] > r[i - 1] {
            r[i] = r[i - 1];
        }
    }
}

/// Move along a contour by `shift` starting at `start_radius`.
///
/// Only the part of the contour with `r < 0.9 * r_cyl` is used so the
/// radius is a unique function of the contour length there. A positive
/// shift moves toward the polar opening. Returns the new radius.
pub fn shift_on_contour(
    r: &[f64],
    l: &[f64],
    r_cyl: f64,
    start_radius: f64,
    shift: f64,
) -> DesignResult<f64> {
    let (mut radii, mut lengths): (Vec<f64>, Vec<f64>) = r
        .iter()
        .zip(l)
        .filter(|(&ri, _)| ri < 0.9 * r_cyl)
        .map(|(&ri, &li)| (ri, li))
        .unzip();
    if radii.len() < 2 {
        return Err(DesignError::Geometry(
            "contour has less than two points inside 0.9 of the cylinder radius".to_string(),
        ));
    }
    let max = lengths[lengths.len() - 1];
    // interpolation needs increasing abscissae
    radii.reverse();
    lengths.reverse();
    let start = interp(start_radius, &radii, &lengths);
    let target = start + shift;
    if target > max {
        return Err(DesignError::OutOfContour { length: target, max });
    }
    radii.reverse();
    lengths.reverse();
    Ok(interp(target, &lengths, &radii))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarter_circle(n: usize, radius: f64) -> (Vec<f64>, Vec<f64>) {
        (0..n)
            .map(|i| {
                let t = PI / 2.0 * i as f64 / (n - 1) as f64;
                (radius * t.sin(), radius * t.cos())
            })
            .unzip()
    }

    #[test]
    fn cylinder_measures() {
        let x = [0.0, 100.0];
        let r = [50.0, 50.0];
        assert!((frustum_volume(&x, &r) - PI * 2500.0 * 100.0).abs() < 1e-6);
        assert!((frustum_area(&x, &r) - 2.0 * PI * 50.0 * 100.0).abs() < 1e-6);
        assert!((contour_length(&x, &r) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn half_sphere_volume_converges() {
        let (x, r) = quarter_circle(2000, 100.0);
        let exact = 2.0 / 3.0 * PI * 100.0f64.powi(3);
        assert!((frustum_volume(&x, &r) - exact).abs() / exact < 1e-5);
    }

    #[test]
    fn resampled_chords_are_equal() {
        let (x, r) = quarter_circle(3000, 100.0);
        let (xs, rs) = resample(&x, &r, 25);
        assert_eq!((xs[0], rs[0]), (x[0], r[0]));
        assert_eq!((xs[24], rs[24]), (x[2999], r[2999]));
        let chords: Vec<f64> = xs
            .windows(2)
            .zip(rs.windows(2))
            .map(|(a, b)| (a[1] - a[0]).hypot(b[1] - b[0]))
            .collect();
        for c in &chords {
            assert!((c - chords[0]).abs() < 1e-9);
        }
        // points stay on the circle up to the polyline error
        for (xi, ri) in xs.iter().zip(&rs) {
            assert!((xi.hypot(*ri) - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn shift_moves_toward_polar_opening() {
        let (x, r) = quarter_circle(500, 100.0);
        let l = arc_lengths(&x, &r);
        let start = 50.0;
        let moved = shift_on_contour(&r, &l, 100.0, start, 5.0).unwrap();
        assert!(moved < start);
        let back = shift_on_contour(&r, &l, 100.0, moved, -5.0).unwrap();
        assert!((back - start).abs() < 1e-3);
    }

    #[test]
    fn shift_beyond_dome_is_out_of_contour() {
        let (x, r) = quarter_circle(100, 100.0);
        let l = arc_lengths(&x, &r);
        match shift_on_contour(&r, &l, 100.0, 10.0, 500.0) {
            Err(DesignError::OutOfContour { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn offset_of_circle_grows_radius() {
        let (x, r) = quarter_circle(200, 100.0);
        let t = vec![2.0; x.len()];
        let (xo, ro) = offset_nodes(&x, &r, &t);
        for (xi, ri) in xo.iter().zip(&ro).skip(1).take(190) {
            assert!(((xi * xi + ri * ri).sqrt() - 102.0).abs() < 1e-3);
        }
    }
}
