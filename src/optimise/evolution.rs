//! Differential evolution (best/1/bin) with parallel population
//! evaluation.
//!
//! The population lives in the unit cube and is mapped onto the bounds
//! for evaluation. All random draws come from one seeded generator in a
//! fixed order, so a run is reproducible regardless of how `rayon`
//! schedules the evaluations.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{finite_or_inf, Bound, Brent, Evaluation, Nelder, Objective, Optimisation};

#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    pub seed: u64,
    /// population size per design variable
    pub popsize: usize,
    pub max_generations: usize,
    /// relative tolerance on the spread of the population energies
    pub tol: f64,
    pub atol: f64,
    /// dithering range of the differential weight
    pub mutation: (f64, f64),
    pub recombination: f64,
    /// refine the best member with a local search
    pub polish: bool,
    /// member placed into the initial population
    pub x0: Option<Vec<f64>>,
}

impl DifferentialEvolution {
    pub fn new(seed: u64) -> DifferentialEvolution {
        DifferentialEvolution {
            seed,
            popsize: 15,
            max_generations: 100,
            tol: 0.01,
            atol: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            polish: true,
            x0: None,
        }
    }

    fn scale(unit: &[f64], bounds: &[Bound]) -> Vec<f64> {
        unit.iter().zip(bounds).map(|(&u, b)| b.scale(u)).collect()
    }

    fn energies(population: &[Vec<f64>], objective: &Objective, bounds: &[Bound]) -> Vec<f64> {
        population
            .par_iter()
            .map(|member| finite_or_inf(objective(&DifferentialEvolution::scale(member, bounds))))
            .collect()
    }

    /// Latin hypercube start population.
    fn initial_population(&self, rng: &mut StdRng, dim: usize, size: usize, bounds: &[Bound]) -> Vec<Vec<f64>> {
        let mut population = vec![vec![0.0; dim]; size];
        for j in 0..dim {
            let mut strata: Vec<usize> = (0..size).collect();
            strata.shuffle(rng);
            for (member, stratum) in population.iter_mut().zip(strata) {
                member[j] = (stratum as f64 + rng.gen::<f64>()) / size as f64;
            }
        }
        if let Some(x0) = &self.x0 {
            population[0] = x0
                .iter()
                .zip(bounds)
                .map(|(&x, b)| if b.width() > 0.0 { ((x - b.lower) / b.width()).max(0.0).min(1.0) } else { 0.0 })
                .collect();
        }
        population
    }

    fn converged(&self, energies: &[f64]) -> bool {
        if energies.iter().any(|e| !e.is_finite()) {
            return false;
        }
        let n = energies.len() as f64;
        let mean = energies.iter().sum::<f64>() / n;
        let std = (energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n).sqrt();
        std <= self.atol + self.tol * mean.abs()
    }
}

fn distinct_pair(rng: &mut StdRng, size: usize, exclude: usize) -> (usize, usize) {
    loop {
        let a = rng.gen_range(0..size);
        let b = rng.gen_range(0..size);
        if a != b && a != exclude && b != exclude {
            return (a, b);
        }
    }
}

impl Optimisation for DifferentialEvolution {
    fn minimise(&mut self, objective: &Objective, bounds: &[Bound]) -> Evaluation {
        let dim = bounds.len();
        let size = (self.popsize * dim).max(5);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut population = self.initial_population(&mut rng, dim, size, bounds);
        let mut energies = DifferentialEvolution::energies(&population, objective, bounds);
        let mut evaluations = size;
        let best_of = |energies: &[f64]| {
            energies
                .iter()
                .enumerate()
                .fold(0, |best, (i, e)| if *e < energies[best] { i } else { best })
        };
        let mut best = best_of(&energies);

        let mut generation = 0;
        while generation < self.max_generations && !self.converged(&energies) {
            generation += 1;
            let weight = rng.gen_range(self.mutation.0..self.mutation.1);
            let trials: Vec<Vec<f64>> = (0..size)
                .map(|i| {
                    let (r1, r2) = distinct_pair(&mut rng, size, i);
                    let fill_point = rng.gen_range(0..dim);
                    (0..dim)
                        .map(|j| {
                            if j == fill_point || rng.gen::<f64>() < self.recombination {
                                let v = population[best][j] + weight * (population[r1][j] - population[r2][j]);
                                if (0.0..=1.0).contains(&v) {
                                    v
                                } else {
                                    rng.gen::<f64>()
                                }
                            } else {
                                population[i][j]
                            }
                        })
                        .collect()
                })
                .collect();
            let trial_energies = DifferentialEvolution::energies(&trials, objective, bounds);
            evaluations += size;
            for (i, (trial, energy)) in trials.into_iter().zip(trial_energies).enumerate() {
                if energy <= energies[i] {
                    population[i] = trial;
                    energies[i] = energy;
                }
            }
            best = best_of(&energies);
        }

        let mut result = Evaluation {
            x: DifferentialEvolution::scale(&population[best], bounds),
            fun: energies[best],
            evaluations,
        };
        debug!(
            "differential evolution: {} generations, best {:?} ({})",
            generation, result.x, result.fun
        );

        if self.polish && result.fun.is_finite() {
            let polished = if dim == 1 {
                // refine inside the neighbourhood the population has settled in
                let centre = population[best][0];
                let (lo, hi) = population
                    .iter()
                    .map(|m| m[0])
                    .fold((centre - 0.05, centre + 0.05), |(lo, hi), u| (lo.min(u), hi.max(u)));
                let local = [Bound::new(bounds[0].scale(lo.max(0.0)), bounds[0].scale(hi.min(1.0)))];
                if local[0].width() > 0.0 {
                    Brent::default().minimise(objective, &local)
                } else {
                    result.clone()
                }
            } else {
                let mut nelder = Nelder::new(Default::default(), result.x.clone(), 1e-8, 200);
                nelder.minimise(objective, bounds)
            };
            result.evaluations += polished.evaluations;
            if polished.fun < result.fun {
                result.x = polished.x;
                result.fun = polished.fun;
            }
        }
        result
    }

    fn name(&self) -> &str {
        "differential evolution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multimodal(x: &[f64]) -> f64 {
        (3.0 * x[0]).sin() + 0.1 * (x[0] - 2.0).powi(2)
    }

    #[test]
    fn result_is_not_worse_than_a_grid() {
        let bounds = [Bound::new(-3.0, 6.0)];
        let best = DifferentialEvolution::new(1).minimise(&multimodal, &bounds);
        for i in 0..=90 {
            let x = -3.0 + 0.1 * i as f64;
            assert!(best.fun <= multimodal(&[x]) + 1e-4);
        }
    }

    #[test]
    fn same_seed_same_result() {
        let bounds = [Bound::new(-3.0, 6.0)];
        let a = DifferentialEvolution::new(42).minimise(&multimodal, &bounds);
        let b = DifferentialEvolution::new(42).minimise(&multimodal, &bounds);
        assert_eq!(a, b);
    }

    #[test]
    fn rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
        let bounds = [Bound::new(-2.0, 2.0), Bound::new(-2.0, 2.0)];
        let mut de = DifferentialEvolution::new(3);
        de.max_generations = 300;
        let best = de.minimise(&f, &bounds);
        assert!(best.fun < 1e-3);
    }

    #[test]
    fn infeasible_members_are_replaced() {
        let f = |x: &[f64]| if x[0] < 20.0 { f64::INFINITY } else { (x[0] - 25.0).powi(2) };
        let best = DifferentialEvolution::new(5).minimise(&f, &[Bound::new(0.0, 70.0)]);
        assert!((best.x[0] - 25.0).abs() < 1e-3);
    }
}
