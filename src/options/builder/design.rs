//! Design run and result inputs from the command line options.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use copv::contour::Liner;
use copv::design::{DesignSettings, LayerDesign};
use copv::error::{DesignError, DesignResult};
use copv::evaluate::Criterion;
use copv::io::read_snapshot;
use copv::laminate::{Laminate, PlyTemplate};
use copv::material::{get_material, Material};
use copv::metal::{self, MetalMaterial};
use copv::results::{HydrogenMass, ResultInputs};
use copv::solver::MembraneSolver;
use copv::winding::ReferenceWinder;
use log::{info, warn};

use crate::options::{DesignArgs, DEFAULT_PRESSURE};

/// Composite material from a file or the built in database.
pub fn get_composite(options: &DesignArgs) -> DesignResult<Material> {
    match &options.material_file {
        Some(file) => Material::from_file(file),
        None => get_material(&options.material),
    }
}

pub fn get_metal(options: &DesignArgs) -> DesignResult<MetalMaterial> {
    metal::get_metal(&options.metal)
}

/// Helical and hoop ply templates.
pub fn get_templates(options: &DesignArgs, material: &Material) -> (PlyTemplate, PlyTemplate) {
    let fibre_density = options.fibre_density.unwrap_or(material.fibre_density);
    let helical = PlyTemplate {
        thickness: options.helical_ply_thickness,
        roving_width: options.roving_width_helical,
        rovings: options.rovings_helical,
        tex: options.tex,
        fibre_density,
    };
    let hoop = PlyTemplate {
        thickness: options.hoop_ply_thickness,
        roving_width: options.roving_width_hoop,
        rovings: options.rovings_hoop,
        ..helical.clone()
    };
    (helical, hoop)
}

/// Plies wound before the design starts, from a snapshot or the options.
pub fn get_initial_stack(options: &DesignArgs, burst_pressure: f64) -> DesignResult<Vec<(f64, f64)>> {
    let file = match &options.resume {
        Some(file) => file,
        None => return Ok(options.initial_stack.clone()),
    };
    if !options.initial_stack.is_empty() {
        return Err(DesignError::Configuration(
            "give either --resume or --initial_stack, not both".to_string(),
        ));
    }
    let snapshot = read_snapshot(Path::new(file))?;
    if (snapshot.burst_pressure - burst_pressure).abs() > 1e-9 * burst_pressure {
        warn!(
            "snapshot '{}' was designed for {} MPa, now designing for {} MPa",
            file, snapshot.burst_pressure, burst_pressure
        );
    }
    info!(
        "resuming from '{}' with {} plies after iteration {}",
        file,
        snapshot.angles_shifts.len(),
        snapshot.iteration
    );
    Ok(snapshot.angles_shifts)
}

pub fn get_settings(
    options: &DesignArgs,
    burst_pressure: f64,
    run_dir: Option<PathBuf>,
) -> DesignResult<DesignSettings> {
    Ok(DesignSettings {
        burst_pressure,
        max_layers: options.max_layers,
        criterion: Criterion::from_fibre_failure(options.use_fibre_failure),
        rel_radius_hoop_layer_end: options.rel_radius_hoop_layer_end,
        weights: options.weights,
        hoop_or_helical_fac: options.hoop_or_helical_fac,
        do_hoop_opt: options.do_hoop_opt,
        use_global_search: options.use_global_search,
        optimiser_seed: options.optimiser_seed,
        max_helical_angle: options.max_helical_angle,
        hoop_shift_cap: options.hoop_shift_cap,
        friction: options.friction,
        initial_stack: get_initial_stack(options, burst_pressure)?,
        run_dir,
        plots: options.plots,
        ..DesignSettings::default()
    })
}

/// Layer design on the reference winder and membrane solver.
pub fn get_design(
    options: &DesignArgs,
    liner: &Liner,
    burst_pressure: f64,
    run_dir: Option<PathBuf>,
) -> DesignResult<LayerDesign> {
    let material = get_composite(options)?;
    let (helical, hoop) = get_templates(options, &material);
    let laminate = Laminate::new(Arc::new(material), helical.clone(), hoop.clone());
    let engine = ReferenceWinder::new(liner, options.dome_points, helical, hoop);
    let settings = get_settings(options, burst_pressure, run_dir)?;
    LayerDesign::new(laminate, Box::new(engine), Box::new(MembraneSolver), settings)
}

pub fn get_result_inputs(options: &DesignArgs) -> ResultInputs {
    let hydrogen = match options.h2_mass {
        Some(mass) => HydrogenMass::Given(mass),
        None => HydrogenMass::Stored {
            pressure: options.pressure.unwrap_or(DEFAULT_PRESSURE),
            temperature: options.temperature,
            max_fill: options.max_fill,
        },
    };
    ResultInputs {
        liner_thickness: options.liner_thickness,
        liner_density: options.liner_density,
        hydrogen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::get_default_options;
    use copv::io::{write_snapshot, Snapshot};
    use tempdir::TempDir;

    #[test]
    fn templates_share_the_fibre() {
        let mut options = get_default_options();
        options.rovings_hoop = 2;
        let material = get_composite(&options).unwrap();
        let (helical, hoop) = get_templates(&options, &material);
        assert_eq!(helical.rovings, 4);
        assert_eq!(hoop.rovings, 2);
        assert_eq!(helical.tex, hoop.tex);
        assert_eq!(helical.fibre_density, 1.78);
    }

    #[test]
    fn resume_takes_the_snapshot_stack() {
        let dir = TempDir::new("copv").unwrap();
        let snapshot = Snapshot {
            iteration: 4,
            angles_shifts: vec![(8.0, 0.0), (90.0, 5.0)],
            puck_max: Some(1.3),
            criterion: "FF".to_string(),
            burst_pressure: 140.0,
            converged: false,
        };
        let path = write_snapshot(dir.path(), "snapshot_004.json", &snapshot).unwrap();
        let mut options = get_default_options();
        options.resume = Some(path.to_string_lossy().to_string());
        assert_eq!(get_initial_stack(&options, 140.0).unwrap(), snapshot.angles_shifts);

        options.initial_stack = vec![(10.0, 0.0)];
        assert!(get_initial_stack(&options, 140.0).unwrap_err().is_configuration());
    }

    #[test]
    fn hydrogen_from_the_gas_state() {
        let mut options = get_default_options();
        options.pressure = Some(35.0);
        match get_result_inputs(&options).hydrogen {
            HydrogenMass::Stored { pressure, .. } => assert_eq!(pressure, 35.0),
            other => panic!("unexpected {:?}", other),
        }
        options.h2_mass = Some(5.6);
        assert_eq!(get_result_inputs(&options).hydrogen, HydrogenMass::Given(5.6));
    }
}
