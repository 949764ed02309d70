//! Small numeric helpers shared by the geometry and the evaluation.

// Exposure tables may hold NaN where a trial broke down, so maxima go
// through a float that is known not to be NaN.

use std::cmp::Ordering;

#[derive(PartialEq, Clone, Copy, Debug)]
pub struct NonNan(f64);

impl NonNan {
    pub fn new(val: f64) -> Option<NonNan> {
        if val.is_nan() {
            None
        } else {
            Some(NonNan(val))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for NonNan {}
impl Ord for NonNan {
    fn cmp(&self, other: &NonNan) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for NonNan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Index and value of the largest entry, skipping NaN.
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| NonNan::new(v).map(|n| (i, n)))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(i, n)| (i, n.value()))
}

/// Evenly spaced values over the closed interval.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Piecewise linear interpolation with `xp` increasing. Values outside
/// the table are clamped to the end values.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // first index with xp[i] > x
    let i = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[i - 1], xp[i]);
    if (x1 - x0).abs() < f64::EPSILON {
        return fp[i];
    }
    fp[i - 1] + (fp[i] - fp[i - 1]) * (x - x0) / (x1 - x0)
}

/// Running sum starting at zero, one entry longer than the input.
pub fn cumulative(increments: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    let mut result = Vec::with_capacity(increments.len() + 1);
    result.push(total);
    for inc in increments {
        total += inc;
        result.push(total);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_ignores_nan_and_takes_first_of_ties() {
        let values = [1.0, f64::NAN, 3.0, 3.0, -2.0];
        assert_eq!(argmax(&values), Some((2, 3.0)));
        assert_eq!(argmax(&[f64::NAN]), None);
    }

    #[test]
    fn interp_clamps_outside_table() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [10.0, 20.0, 40.0];
        assert!((interp(-1.0, &xp, &fp) - 10.0).abs() < 1e-12);
        assert!((interp(2.0, &xp, &fp) - 30.0).abs() < 1e-12);
        assert!((interp(5.0, &xp, &fp) - 40.0).abs() < 1e-12);
        assert!((interp(1.0, &xp, &fp) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn linspace_hits_both_ends() {
        let v = linspace(-1.0, 2.0, 4);
        assert_eq!(v.len(), 4);
        assert!((v[0] + 1.0).abs() < 1e-12);
        assert!((v[3] - 2.0).abs() < 1e-12);
        assert!((v[1]).abs() < 1e-12);
    }
}
