//! Layer by layer winding design.
//!
//! Every iteration evaluates the current laminate at burst pressure,
//! stops when the largest exposure is below one and otherwise appends one
//! ply. Whether the ply is a hoop or a helical ply depends on where the
//! critical element lies; its angle or shift is found by minimising the
//! target function on private copies of the winding engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::error::{DesignError, DesignResult};
use crate::evaluate::{evaluate, helical_indices, hoop_indices, Criterion, FailureField};
use crate::io::{write_snapshot, Snapshot};
use crate::laminate::{Laminate, LayerKind};
use crate::material::Material;
use crate::optimise::{finite_or_inf, nelder, Bound, DifferentialEvolution, Evaluation, Nelder, Objective, Optimisation};
use crate::plot;
use crate::solver::ShellSolver;
use crate::target::{compute_terms, CriticalLocations, TargetFunction, Terms, DEFAULT_WEIGHTS};
use crate::winding::{fibre_mass, WindingEngine};
use crate::COMMENT;

mod helical;
mod hoop;

pub use self::hoop::distribute_positions;
use self::hoop::HOOP_ANGLE;

/// Largest angle a helical ply may take (degrees).
pub const MAX_HELICAL_ANGLE: f64 = 70.0;

/// Upper limit of a hoop shift (mm).
pub const HOOP_SHIFT_CAP: f64 = 250.0;

#[derive(Debug, Clone)]
pub struct DesignSettings {
    /// design pressure of the failure evaluation (MPa)
    pub burst_pressure: f64,
    pub max_layers: usize,
    pub criterion: Criterion,
    /// hoop region of the bare liner, relative to the cylinder radius
    pub rel_radius_hoop_layer_end: f64,
    pub weights: Terms,
    /// a helical ply replaces a hoop ply when its target value is lower
    /// than this factor times the hoop value
    pub hoop_or_helical_fac: f64,
    /// optimise hoop shifts instead of distributing them evenly
    pub do_hoop_opt: bool,
    /// run differential evolution next to the local helical search
    pub use_global_search: bool,
    pub optimiser_seed: u64,
    pub max_helical_angle: f64,
    pub hoop_shift_cap: f64,
    /// friction coefficient given to every new ply
    pub friction: f64,
    /// plies wound before the design starts
    pub initial_stack: Vec<(f64, f64)>,
    pub thickness_retries: usize,
    /// lower bound increase after a corrupt thickness distribution (degrees)
    pub angle_nudge: f64,
    /// admissible distance of the thickness peak from the turning zone,
    /// relative to the mandrel contour length
    pub peak_tolerance: f64,
    pub de_popsize: usize,
    pub de_max_generations: usize,
    pub local_max_iter: usize,
    /// snapshots and plots are written here when set
    pub run_dir: Option<PathBuf>,
    pub plots: bool,
}

impl Default for DesignSettings {
    fn default() -> Self {
        DesignSettings {
            burst_pressure: 140.0,
            max_layers: 100,
            criterion: Criterion::FibreFailure,
            rel_radius_hoop_layer_end: 0.95,
            weights: DEFAULT_WEIGHTS,
            hoop_or_helical_fac: 1.0,
            do_hoop_opt: true,
            use_global_search: true,
            optimiser_seed: 1,
            max_helical_angle: MAX_HELICAL_ANGLE,
            hoop_shift_cap: HOOP_SHIFT_CAP,
            friction: 0.0,
            initial_stack: vec![],
            thickness_retries: 20,
            angle_nudge: 0.1,
            peak_tolerance: 0.1,
            de_popsize: 15,
            de_max_generations: 100,
            local_max_iter: 100,
            run_dir: None,
            plots: false,
        }
    }
}

/// Outcome of one placement sub-problem.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyChoice {
    pub angle: f64,
    pub shift: f64,
    pub value: f64,
    /// hoop shifts of all hoop plies after a redistribution, by layer index
    pub redistributed: Vec<(usize, f64)>,
    pub min_angle: Option<f64>,
}

/// What happened in one design iteration.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub iteration: usize,
    pub puck_max: f64,
    pub critical_element: usize,
    pub critical_layer: usize,
    pub bend_element: usize,
    /// largest exposure per element before the ply was added
    pub element_exposure: Vec<f64>,
    /// the ply added in this iteration, if any
    pub added: Option<(LayerKind, PlyChoice)>,
    /// (design variable, target value) of every trial
    pub trace: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct DesignOutcome {
    pub angles_shifts: Vec<(f64, f64)>,
    pub converged: bool,
    pub iterations: usize,
    pub puck_max: f64,
    pub records: Vec<IterationRecord>,
}

/// Target function setup shared by the trials of one sub-problem.
pub(crate) struct TrialSetup<'a> {
    pub target: TargetFunction,
    pub memory: CriticalLocations,
    pub mask: Option<&'a [usize]>,
}

/// Sub-problems that place the ply of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Placement {
    Hoop,
    /// both sub-problems, with the smallest helical angle
    HoopOrHelical(f64),
    Helical(f64),
}

pub struct LayerDesign {
    settings: DesignSettings,
    laminate: Laminate,
    engine: Box<dyn WindingEngine>,
    solver: Box<dyn ShellSolver>,
    hoop_indices: Vec<usize>,
    helical_indices: Vec<usize>,
    memory: Option<CriticalLocations>,
    trace: Mutex<Vec<(f64, f64)>>,
    records: Vec<IterationRecord>,
}

impl LayerDesign {
    /// The engine must carry the plies of the laminate.
    pub fn new(
        laminate: Laminate,
        engine: Box<dyn WindingEngine>,
        solver: Box<dyn ShellSolver>,
        settings: DesignSettings,
    ) -> DesignResult<LayerDesign> {
        if engine.layer_count() != laminate.len() {
            return Err(DesignError::Configuration(format!(
                "winding engine has {} layers but the laminate {}",
                engine.layer_count(),
                laminate.len()
            )));
        }
        if !(settings.burst_pressure > 0.0) {
            return Err(DesignError::Configuration(format!(
                "burst pressure must be positive, got {}",
                settings.burst_pressure
            )));
        }
        let hoop = hoop_indices(&*engine, settings.rel_radius_hoop_layer_end);
        let helical = helical_indices(&*engine, settings.rel_radius_hoop_layer_end);
        Ok(LayerDesign {
            settings,
            laminate,
            engine,
            solver,
            hoop_indices: hoop,
            helical_indices: helical,
            memory: None,
            trace: Mutex::new(vec![]),
            records: vec![],
        })
    }

    pub fn laminate(&self) -> &Laminate {
        &self.laminate
    }

    pub fn engine(&self) -> &dyn WindingEngine {
        &*self.engine
    }

    pub fn solver(&self) -> &dyn ShellSolver {
        &*self.solver
    }

    pub fn settings(&self) -> &DesignSettings {
        &self.settings
    }

    pub fn material(&self) -> Arc<Material> {
        self.laminate.material().clone()
    }

    pub fn hoop_indices(&self) -> &[usize] {
        &self.hoop_indices
    }

    pub fn helical_indices(&self) -> &[usize] {
        &self.helical_indices
    }

    /// Failure field of the current laminate.
    pub fn evaluate(&self, mask: Option<&[usize]>) -> DesignResult<FailureField> {
        evaluate(
            &*self.engine,
            &*self.solver,
            self.laminate.material(),
            self.settings.burst_pressure,
            mask,
        )
    }

    /// Run the design loop. On failure the last laminate is written to
    /// `snapshot_partial.json` before the error is returned.
    pub fn run(&mut self) -> DesignResult<DesignOutcome> {
        match self.design() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Some(dir) = &self.settings.run_dir {
                    let snapshot = self.snapshot(self.records.len(), None, false);
                    if let Err(write_error) = write_snapshot(dir, "snapshot_partial.json", &snapshot) {
                        warn!("could not write the partial snapshot: {}", write_error);
                    }
                }
                Err(e)
            }
        }
    }

    fn design(&mut self) -> DesignResult<DesignOutcome> {
        self.memory = None;
        self.records.clear();
        self.start_stack()?;
        let criterion = self.settings.criterion;

        loop {
            let iteration = self.records.len();
            let field = self.evaluate(None)?;
            let peak = field.peak(criterion);
            let (bend_element, _) = field.bend_peak();
            let current = CriticalLocations {
                puck: peak.element,
                bend: bend_element,
            };
            let memory = self.memory.unwrap_or(current);
            println!(
                "{}iteration {:3}: {} layers, max {} {:.4} at element {} in layer {}",
                COMMENT,
                iteration,
                self.laminate.len(),
                criterion,
                peak.value,
                peak.element,
                peak.layer
            );
            let mut record = IterationRecord {
                iteration,
                puck_max: peak.value,
                critical_element: peak.element,
                critical_layer: peak.layer,
                bend_element,
                element_exposure: field.element_max(criterion),
                added: None,
                trace: vec![],
            };

            let converged = peak.value < 1.0;
            if converged || self.laminate.len() >= self.settings.max_layers {
                self.write_iteration(&record, peak.value, converged)?;
                self.records.push(record);
                if !converged {
                    warn!(
                        "layer budget of {} exhausted with max exposure {:.4}, the design is infeasible",
                        self.settings.max_layers, peak.value
                    );
                }
                return Ok(DesignOutcome {
                    angles_shifts: self.laminate.angles_shifts(),
                    converged,
                    iterations: iteration,
                    puck_max: peak.value,
                    records: self.records.clone(),
                });
            }

            let k = self.append_ply(90.0, 0.0)?;
            let in_hoop_region = match criterion {
                Criterion::FibreFailure => self.laminate.plies()[peak.layer].is_hoop(),
                Criterion::InterFibreFailure => self.hoop_indices.contains(&peak.element),
            };
            let placement = if k == 1 && criterion == Criterion::FibreFailure {
                Placement::Hoop
            } else if in_hoop_region {
                Placement::HoopOrHelical(self.min_angle(k)?)
            } else {
                Placement::Helical(self.min_angle(k)?)
            };
            let mask: Option<Vec<usize>> = match placement {
                Placement::Helical(_) if self.hoop_indices.contains(&peak.element) => None,
                Placement::Helical(_) => Some(self.helical_indices.clone()),
                _ => Some(self.hoop_indices.clone()),
            };
            let setup = self.iteration_setup(k, placement, &field, memory, mask.as_deref());
            debug!("layer {} placed by {:?} with target\n{}", k, placement, setup.target);

            let (kind, choice) = match placement {
                Placement::Hoop => (LayerKind::Hoop, self.hoop_subproblem(k, &setup)?),
                Placement::Helical(min_angle) => (LayerKind::Helical, self.helical_subproblem(k, min_angle, &setup)?),
                Placement::HoopOrHelical(min_angle) => self.hoop_or_helical(k, min_angle, &setup)?,
            };
            if !choice.value.is_finite() {
                return Err(DesignError::Winding {
                    layer: k,
                    message: format!("no feasible {:?} ply", kind),
                });
            }
            self.apply_choice(k, kind, &choice)?;
            println!(
                "{}iteration {:3}: added {:?} ply {} with angle {:.3} and shift {:.3}, target {:.4}",
                COMMENT, iteration, kind, k, choice.angle, choice.shift, choice.value
            );

            record.trace = self.take_trace();
            record.added = Some((kind, choice));
            self.write_iteration(&record, peak.value, false)?;
            self.records.push(record);
            self.memory = Some(current);
        }
    }

    /// Wind the initial stack or a single helical ply at the smallest angle.
    fn start_stack(&mut self) -> DesignResult<()> {
        if !self.laminate.is_empty() {
            return self.engine.run_winding_simulation(self.laminate.len() - 1);
        }
        if self.settings.initial_stack.is_empty() {
            let k = self.append_ply(self.settings.max_helical_angle, 0.0)?;
            let angle = self.min_angle(k)?;
            info!("seed helical ply at the smallest angle {:.4}", angle);
            self.laminate.set_angle(k, angle)?;
            self.engine.set_layer_angle(k, angle)?;
        } else {
            for (angle, shift) in self.settings.initial_stack.clone() {
                self.append_ply(angle, shift)?;
            }
        }
        self.engine.run_winding_simulation(self.laminate.len() - 1)
    }

    fn append_ply(&mut self, angle: f64, shift: f64) -> DesignResult<usize> {
        let k = self.laminate.append(angle, shift);
        let engine_k = self.engine.add_layer(angle, shift);
        debug_assert_eq!(k, engine_k);
        self.laminate.set_friction(k, self.settings.friction)?;
        self.engine.set_layer_friction(k, self.settings.friction)?;
        Ok(k)
    }

    fn apply_choice(&mut self, k: usize, kind: LayerKind, choice: &PlyChoice) -> DesignResult<()> {
        self.laminate.set_angle(k, choice.angle)?;
        self.engine.set_layer_angle(k, choice.angle)?;
        if kind == LayerKind::Hoop {
            self.laminate.set_hoop_shift(k, choice.shift)?;
            self.engine.set_hoop_layer_shift(k, choice.shift)?;
        }
        for &(layer, shift) in &choice.redistributed {
            self.laminate.set_hoop_shift(layer, shift)?;
            self.engine.set_hoop_layer_shift(layer, shift)?;
        }
        self.engine.run_winding_simulation(k)
    }

    /// Target function of one iteration, rescaled at the start point of
    /// its sub-problems: ply k at the smallest helical angle, or as a hoop
    /// ply with shift zero. A start point that cannot be wound falls back
    /// to the laminate without ply k.
    pub(crate) fn iteration_setup<'a>(
        &self,
        k: usize,
        placement: Placement,
        field: &FailureField,
        memory: CriticalLocations,
        mask: Option<&'a [usize]>,
    ) -> TrialSetup<'a> {
        let unscaled = TrialSetup {
            target: TargetFunction::new(self.settings.weights),
            memory,
            mask,
        };
        let mean_layer_mass = fibre_mass(&*self.engine) / k.max(1) as f64;
        let start = match placement {
            Placement::Helical(min_angle) => self.trial_terms(k, min_angle, &[], &unscaled),
            _ => self.trial_terms(k, HOOP_ANGLE, &[(k, 0.0)], &unscaled),
        };
        let start = start.unwrap_or_else(|e| {
            warn!("start point of layer {} cannot be evaluated ({}), rescaling on the current laminate", k, e);
            let mut masked = field.clone();
            if let Some(mask) = mask {
                masked.apply_mask(mask);
            }
            compute_terms(&masked, self.settings.criterion, &memory, mean_layer_mass)
        });
        TrialSetup {
            target: unscaled.target.rescaled(&start, mean_layer_mass),
            ..unscaled
        }
    }

    /// Both sub-problems on one target. The hoop ply is kept unless the
    /// helical ply is better by `hoop_or_helical_fac`.
    fn hoop_or_helical(
        &mut self,
        k: usize,
        min_angle: f64,
        setup: &TrialSetup,
    ) -> DesignResult<(LayerKind, PlyChoice)> {
        let helical = self.helical_subproblem(k, min_angle, setup)?;
        let hoop = self.hoop_subproblem(k, setup)?;
        debug!("hoop region: helical {:?}, hoop {:?}", helical, hoop);
        if helical.value < self.settings.hoop_or_helical_fac * hoop.value {
            // settle the angle on the laminate that now holds a helical ply in slot k
            self.apply_choice(k, LayerKind::Helical, &helical)?;
            Ok((LayerKind::Helical, self.helical_subproblem(k, min_angle, setup)?))
        } else if hoop.value.is_finite() {
            Ok((LayerKind::Hoop, hoop))
        } else {
            Err(DesignError::Winding {
                layer: k,
                message: "neither a hoop nor a helical ply can be wound".to_string(),
            })
        }
    }

    /// Target terms with layer k set to `angle` and the given hoop shifts.
    pub(crate) fn trial_terms(
        &self,
        k: usize,
        angle: f64,
        shifts: &[(usize, f64)],
        setup: &TrialSetup,
    ) -> DesignResult<Terms> {
        let mut engine = self.engine.clone();
        engine.set_layer_angle(k, angle)?;
        for &(layer, shift) in shifts {
            engine.set_hoop_layer_shift(layer, shift)?;
        }
        engine.run_winding_simulation(k)?;
        let field = evaluate(
            &*engine,
            &*self.solver,
            self.laminate.material(),
            self.settings.burst_pressure,
            setup.mask,
        )?;
        Ok(compute_terms(
            &field,
            self.settings.criterion,
            &setup.memory,
            engine.layer_fibre_mass(k),
        ))
    }

    /// Target value of a trial; infeasible trials are infinite.
    pub(crate) fn trial_value(
        &self,
        k: usize,
        angle: f64,
        shifts: &[(usize, f64)],
        setup: &TrialSetup,
        traced: f64,
    ) -> f64 {
        let value = match self.trial_terms(k, angle, shifts, setup) {
            Ok(terms) => finite_or_inf(setup.target.value(&terms)),
            Err(e) => {
                debug!("trial angle {:.4} shifts {:?} rejected: {}", angle, shifts, e);
                f64::INFINITY
            }
        };
        if let Ok(mut trace) = self.trace.lock() {
            trace.push((traced, value));
        }
        value
    }

    fn take_trace(&self) -> Vec<(f64, f64)> {
        match self.trace.lock() {
            Ok(mut trace) => {
                let mut taken: Vec<(f64, f64)> = trace.drain(..).filter(|(_, v)| v.is_finite()).collect();
                taken.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                taken
            }
            Err(_) => vec![],
        }
    }

    pub(crate) fn local_optimiser(&self, start: f64) -> Nelder {
        Nelder::new(nelder::Parameters::default(), vec![start], 1e-6, self.settings.local_max_iter)
    }

    pub(crate) fn global_optimiser(&self, start: Option<f64>) -> DifferentialEvolution {
        let mut de = DifferentialEvolution::new(self.settings.optimiser_seed);
        de.popsize = self.settings.de_popsize;
        de.max_generations = self.settings.de_max_generations;
        de.x0 = start.map(|x| vec![x]);
        de
    }

    pub(crate) fn minimise_global(&self, objective: &Objective, bound: Bound, start: Option<f64>) -> Evaluation {
        self.global_optimiser(start).minimise(objective, &[bound])
    }

    fn snapshot(&self, iteration: usize, puck_max: Option<f64>, converged: bool) -> Snapshot {
        Snapshot {
            iteration,
            angles_shifts: self.laminate.angles_shifts(),
            puck_max,
            criterion: self.settings.criterion.to_string(),
            burst_pressure: self.settings.burst_pressure,
            converged,
        }
    }

    fn write_iteration(&self, record: &IterationRecord, puck_max: f64, converged: bool) -> DesignResult<()> {
        let dir = match &self.settings.run_dir {
            Some(dir) => dir,
            None => return Ok(()),
        };
        let snapshot = self.snapshot(record.iteration, Some(puck_max), converged);
        write_snapshot(dir, &format!("snapshot_{:03}.json", record.iteration), &snapshot)?;
        if self.settings.plots && !record.trace.is_empty() {
            let name = format!("targetFunction_{:03}.svg", record.iteration);
            let label = match &record.added {
                Some((LayerKind::Hoop, _)) => "hoop shift (mm)",
                _ => "angle (deg)",
            };
            plot::target_function(&dir.join(name), &record.trace, label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{Dome, Liner};
    use crate::laminate::PlyTemplate;
    use crate::solver::MembraneSolver;
    use crate::winding::ReferenceWinder;

    fn template() -> PlyTemplate {
        PlyTemplate {
            thickness: 0.125,
            roving_width: 3.175,
            rovings: 4,
            tex: 446.0,
            fibre_density: 1.78,
        }
    }

    /// Hoop plies of twice the helical thickness at the same fibre volume.
    fn hoop_template() -> PlyTemplate {
        PlyTemplate {
            thickness: 0.25,
            tex: 892.0,
            ..template()
        }
    }

    pub(crate) fn small_design(burst_pressure: f64, max_layers: usize) -> LayerDesign {
        let dome = Dome::isotensoid(200.0, 23.0, 40).unwrap();
        let liner = Liner::new(dome, 500.0, None).unwrap();
        let laminate = Laminate::new(Arc::new(Material::default()), template(), hoop_template());
        let engine = ReferenceWinder::from_laminate(&liner, 40, &laminate);
        let settings = DesignSettings {
            burst_pressure,
            max_layers,
            de_popsize: 6,
            de_max_generations: 15,
            local_max_iter: 40,
            ..DesignSettings::default()
        };
        LayerDesign::new(laminate, Box::new(engine), Box::new(MembraneSolver), settings).unwrap()
    }

    #[test]
    fn engine_must_match_laminate() {
        let dome = Dome::isotensoid(200.0, 23.0, 40).unwrap();
        let liner = Liner::new(dome, 500.0, None).unwrap();
        let mut laminate = Laminate::new(Arc::new(Material::default()), template(), template());
        let engine = ReferenceWinder::from_laminate(&liner, 40, &laminate);
        laminate.append(10.0, 0.0);
        let result = LayerDesign::new(laminate, Box::new(engine), Box::new(MembraneSolver), DesignSettings::default());
        assert!(result.map_err(|e| e.is_configuration()).err().unwrap_or(false));
    }

    #[test]
    fn seed_then_hoop() {
        let mut design = small_design(140.0, 2);
        let outcome = design.run().unwrap();
        assert_eq!(outcome.angles_shifts.len(), 2);
        let (seed, _) = outcome.angles_shifts[0];
        assert!(seed > 6.0 && seed < 10.0);
        let (angle, shift) = outcome.angles_shifts[1];
        assert_eq!(angle, 90.0);
        // the hoop ply ends on the dome, not inside the cylinder
        assert!(shift > 0.0);
        assert!(outcome.puck_max < outcome.records[0].puck_max);
        assert!(!outcome.converged);
    }

    /// Seed ply wound, ply 1 appended and the loop state of iteration 0.
    fn first_iteration(weights: Terms) -> (LayerDesign, FailureField, CriticalLocations, usize) {
        let mut design = small_design(140.0, 1);
        design.settings.weights = weights;
        design.run().unwrap();
        let field = design.evaluate(None).unwrap();
        let memory = CriticalLocations::of(&field, design.settings().criterion);
        let k = design.append_ply(90.0, 0.0).unwrap();
        (design, field, memory, k)
    }

    #[test]
    fn equal_weights_balance_at_the_smallest_angle() {
        let (design, field, memory, k) = first_iteration([1.0; 6]);
        let min_angle = design.min_angle(k).unwrap();
        let setup = design.iteration_setup(k, Placement::Helical(min_angle), &field, memory, None);
        let start = design.trial_terms(k, min_angle, &[], &setup).unwrap();
        let contributions = setup.target.contributions(&start);
        for (i, c) in contributions.iter().enumerate() {
            assert!(*c > 0.5 && *c < 2.0, "term {} contributes {}", i, c);
        }
        // every term but the mass is matched exactly
        for &i in &[0, 1, 2, 4, 5] {
            assert!((contributions[i] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn hoop_region_choices_share_one_scaling() {
        let (design, field, memory, k) = first_iteration(DEFAULT_WEIGHTS);
        let min_angle = design.min_angle(k).unwrap();
        let mask = design.hoop_indices().to_vec();
        let setup = design.iteration_setup(k, Placement::HoopOrHelical(min_angle), &field, memory, Some(&mask));

        // rescaled at the hoop start point
        let start = design.trial_terms(k, HOOP_ANGLE, &[(k, 0.0)], &setup).unwrap();
        let active: f64 = DEFAULT_WEIGHTS
            .iter()
            .zip(&start)
            .enumerate()
            .filter(|&(i, (w, t))| *w > 0.0 && i != 3 && *t > 0.0)
            .map(|(_, (w, _))| w)
            .sum();
        assert!((setup.target.value(&start) - active).abs() < 1e-9);

        let helical = design.helical_subproblem(k, min_angle, &setup).unwrap();
        let hoop = design.hoop_subproblem(k, &setup).unwrap();
        let helical_terms = design.trial_terms(k, helical.angle, &[], &setup).unwrap();
        let hoop_terms = design.trial_terms(k, HOOP_ANGLE, &[(k, hoop.shift)], &setup).unwrap();
        assert!((setup.target.value(&helical_terms) - helical.value).abs() < 1e-9 * helical.value.abs().max(1.0));
        assert!((setup.target.value(&hoop_terms) - hoop.value).abs() < 1e-9 * hoop.value.abs().max(1.0));
    }

    #[test]
    fn low_pressure_terminates() {
        let mut design = small_design(5.0, 20);
        let outcome = design.run().unwrap();
        assert!(outcome.converged);
        assert!(outcome.puck_max < 1.0);
        assert!(outcome.angles_shifts.len() <= 20);
        let field = design.evaluate(None).unwrap();
        assert!(field.peak(Criterion::FibreFailure).value < 1.0);
    }
}
