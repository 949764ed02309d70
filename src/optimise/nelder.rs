//! Nelder-Mead simplex search on a box.
//!
//! Trial points are clamped onto the bounds before they are evaluated, so
//! a vertex may sit outside the box while its value belongs to the
//! nearest point inside.
//! Reference: <https://en.wikipedia.org/wiki/Nelder%E2%80%93Mead_method>

use std::cmp::Ordering;

use log::{debug, warn};

use super::{clamp_all, finite_or_inf, Bound, Evaluation, Objective, Optimisation};

/// Simplex coefficients.
#[derive(Debug, Clone, Copy)]
pub struct Parameters {
    /// size of the starting simplex as a fraction of the bound width
    pub step: f64,
    pub reflection: f64,
    pub expansion: f64,
    /// must lie in (0, 0.5]
    pub contraction: f64,
    pub shrink: f64,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            step: 0.1,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
        }
    }
}

impl Parameters {
    fn warn_if_odd(&self) {
        if !(self.expansion > 1.0) {
            warn!("simplex expansion {} should exceed 1", self.expansion);
        }
        if !(self.contraction > 0.0 && self.contraction <= 0.5) {
            warn!("simplex contraction {} should lie in (0, 0.5]", self.contraction);
        }
        if !(self.shrink > 0.0 && self.shrink < 1.0) {
            warn!("simplex shrink {} should lie in (0, 1)", self.shrink);
        }
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    x: Vec<f64>,
    value: f64,
}

/// `from + s (to - base)`
fn towards(from: &[f64], s: f64, to: &[f64], base: &[f64]) -> Vec<f64> {
    from.iter()
        .zip(to.iter().zip(base))
        .map(|(f, (t, b))| f + s * (t - b))
        .collect()
}

/// Vertices kept in ascending order of value.
struct Simplex {
    vertices: Vec<Vertex>,
}

impl Simplex {
    fn sort(&mut self) {
        self.vertices
            .sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
    }

    fn best(&self) -> &Vertex {
        &self.vertices[0]
    }

    fn worst(&self) -> &Vertex {
        &self.vertices[self.vertices.len() - 1]
    }

    fn second_worst(&self) -> &Vertex {
        &self.vertices[self.vertices.len() - 2]
    }

    fn spread(&self) -> f64 {
        (self.worst().value - self.best().value).abs()
    }

    /// Centroid of every vertex but the worst.
    fn centroid(&self) -> Vec<f64> {
        let kept = &self.vertices[..self.vertices.len() - 1];
        let mut centre = vec![0.0; kept[0].x.len()];
        for vertex in kept {
            for (c, xi) in centre.iter_mut().zip(&vertex.x) {
                *c += xi / kept.len() as f64;
            }
        }
        centre
    }

    fn replace_worst(&mut self, vertex: Vertex) {
        let last = self.vertices.len() - 1;
        self.vertices[last] = vertex;
    }
}

#[derive(Debug, Default)]
struct Tally {
    reflections: usize,
    expansions: usize,
    contractions: usize,
    shrinks: usize,
}

#[derive(Debug, Clone)]
pub struct Nelder {
    parameters: Parameters,
    /// start point, the best vertex after a search
    start: Vec<f64>,
    tolerance: f64,
    max_iter: usize,
}

impl Nelder {
    pub fn new(parameters: Parameters, start: Vec<f64>, tolerance: f64, max_iter: usize) -> Nelder {
        Nelder {
            parameters,
            start,
            tolerance,
            max_iter,
        }
    }

    pub fn best_point(&self) -> &[f64] {
        &self.start
    }

    /// Unbounded search from the start point with the given initial
    /// offsets. Returns the best value and the number of evaluations.
    fn search<F>(&mut self, offsets: &[f64], mut objective: F) -> (f64, usize)
    where
        F: FnMut(&[f64]) -> f64,
    {
        self.parameters.warn_if_odd();
        let p = self.parameters;
        let mut evaluations = 0;
        let mut eval = |x: Vec<f64>| {
            evaluations += 1;
            let value = finite_or_inf(objective(&x));
            Vertex { x, value }
        };

        let mut vertices = vec![eval(self.start.clone())];
        for (i, offset) in offsets.iter().enumerate() {
            let mut x = self.start.clone();
            x[i] += offset;
            vertices.push(eval(x));
        }
        let mut simplex = Simplex { vertices };
        let mut tally = Tally::default();
        let mut iter = 0;

        loop {
            simplex.sort();
            if simplex.spread() < self.tolerance || (iter > 0 && simplex.best().value.is_infinite()) {
                break;
            }
            if iter == self.max_iter {
                warn!(
                    "simplex search stopped after {} iterations with spread {:.3e}",
                    iter,
                    simplex.spread()
                );
                break;
            }
            iter += 1;

            let centre = simplex.centroid();
            let reflected = eval(towards(&centre, p.reflection, &centre, &simplex.worst().x));

            if reflected.value < simplex.best().value {
                let expanded = eval(towards(&centre, p.expansion, &reflected.x, &centre));
                if expanded.value < reflected.value {
                    tally.expansions += 1;
                    simplex.replace_worst(expanded);
                } else {
                    tally.reflections += 1;
                    simplex.replace_worst(reflected);
                }
                continue;
            }
            if reflected.value < simplex.second_worst().value {
                tally.reflections += 1;
                simplex.replace_worst(reflected);
                continue;
            }

            let contracted = eval(towards(&centre, p.contraction, &simplex.worst().x, &centre));
            if contracted.value < simplex.worst().value {
                tally.contractions += 1;
                simplex.replace_worst(contracted);
                continue;
            }

            tally.shrinks += 1;
            let best = simplex.best().x.clone();
            for i in 1..simplex.vertices.len() {
                let x = towards(&best, p.shrink, &simplex.vertices[i].x, &best);
                simplex.vertices[i] = eval(x);
            }
        }

        debug!(
            "simplex: {} iterations {:?}, best {:.6e}",
            iter,
            tally,
            simplex.best().value
        );
        self.start = simplex.best().x.clone();
        (simplex.best().value, evaluations)
    }
}

impl Optimisation for Nelder {
    fn minimise(&mut self, objective: &Objective, bounds: &[Bound]) -> Evaluation {
        self.start = clamp_all(&self.start, bounds);
        // the first simplex points into the box
        let offsets: Vec<f64> = self
            .start
            .iter()
            .zip(bounds)
            .map(|(&x, b)| {
                let step = self.parameters.step * b.width();
                if x + step > b.upper {
                    -step
                } else {
                    step
                }
            })
            .collect();
        let (fun, evaluations) = self.search(&offsets, |x| objective(&clamp_all(x, bounds)));
        self.start = clamp_all(&self.start, bounds);
        Evaluation {
            x: self.start.clone(),
            fun,
            evaluations,
        }
    }

    fn name(&self) -> &str {
        "Nelder-Mead"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2)
    }

    #[test]
    fn centroid_skips_the_worst_vertex() {
        let simplex = Simplex {
            vertices: vec![
                Vertex { x: vec![0.0, 0.0], value: 0.0 },
                Vertex { x: vec![2.0, 4.0], value: 1.0 },
                Vertex { x: vec![100.0, 100.0], value: 2.0 },
            ],
        };
        assert_eq!(simplex.centroid(), vec![1.0, 2.0]);
    }

    #[test]
    fn rosenbrock_valley() {
        let mut nelder = Nelder::new(Parameters::default(), vec![-1.2, 1.0], 1e-12, 2000);
        let (value, evaluations) = nelder.search(&[0.1, 0.1], rosenbrock);
        assert!(value < 1e-6);
        let x = nelder.best_point();
        assert!((x[0] - 1.0).abs() < 1e-2 && (x[1] - 1.0).abs() < 1e-2);
        assert!(evaluations > 3);
    }

    #[test]
    fn one_dimensional_parabola() {
        let mut nelder = Nelder::new(Parameters::default(), vec![12.0], 1e-12, 500);
        let f = |x: &[f64]| (x[0] - 17.5).powi(2) + 3.0;
        let best = nelder.minimise(&f, &[Bound::new(1.0, 70.0)]);
        assert!((best.x[0] - 17.5).abs() < 1e-4);
        assert!((best.fun - 3.0).abs() < 1e-8);
    }

    #[test]
    fn bounded_minimum_sits_on_the_bound() {
        let mut nelder = Nelder::new(Parameters::default(), vec![5.0], 1e-12, 200);
        let f = |x: &[f64]| (x[0] - 1.0).powi(2);
        let best = nelder.minimise(&f, &[Bound::new(3.0, 10.0)]);
        assert!((best.x[0] - 3.0).abs() < 1e-4);
        assert!((best.fun - 4.0).abs() < 1e-3);
    }

    #[test]
    fn start_at_the_upper_bound() {
        let mut nelder = Nelder::new(Parameters::default(), vec![70.0], 1e-12, 200);
        let f = |x: &[f64]| (x[0] - 60.0).abs();
        let best = nelder.minimise(&f, &[Bound::new(1.0, 70.0)]);
        assert!((best.x[0] - 60.0).abs() < 1e-3);
    }

    #[test]
    fn infinite_region_is_left() {
        let mut nelder = Nelder::new(Parameters::default(), vec![2.0], 1e-12, 200);
        let f = |x: &[f64]| if x[0] < 1.5 { f64::INFINITY } else { (x[0] - 3.0).powi(2) };
        let best = nelder.minimise(&f, &[Bound::new(1.0, 10.0)]);
        assert!((best.x[0] - 3.0).abs() < 1e-3);
    }
}
