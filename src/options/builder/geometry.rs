//! Liner and pressure from the command line options.

use std::f64::consts::PI;
use std::path::Path;

use copv::contour::{Dome, DomeType, Liner};
use copv::error::{DesignError, DesignResult};
use copv::io::read_contour_file;
use copv::optimise::brent::Brent;
use log::{info, warn};

use crate::options::{DesignArgs, DomeArgs, DEFAULT_LCYL_BY_R, DEFAULT_PRESSURE, DEFAULT_SAFETY_FACTOR,
                     DEFAULT_VALVE_RELEASE_FACTOR};

/// Points of a constructed dome contour.
const CONTOUR_POINTS: usize = 200;

/// Largest relative miss of a requested volume.
const VOLUME_TOLERANCE: f64 = 0.01;

fn config<T>(message: String) -> DesignResult<T> {
    Err(DesignError::Configuration(message))
}

/// Reject options that exclude each other or that are not physical.
pub fn check_options(options: &DesignArgs) -> DesignResult<()> {
    if options.lcyl.is_some() && options.lcyl_by_r.is_some() {
        return config("give either --lcyl or --lcyl_by_r, not both".to_string());
    }
    if options.volume.is_some() && (options.lcyl.is_some() || options.lcyl_by_r.is_some()) {
        return config("the cylindrical length follows from --volume, do not give --lcyl or --lcyl_by_r".to_string());
    }
    if options.burst_pressure.is_some()
        && (options.pressure_hydrostatic.is_some()
            || options.safety_factor.is_some()
            || options.valve_release_factor.is_some())
    {
        return config(
            "give either --burst_pressure or the factors it is derived from, not both".to_string(),
        );
    }
    for (i, dome) in Some(&options.dome).into_iter().chain(options.dome2.as_ref()).enumerate() {
        if dome.contour.is_some() && dome.contour_file.is_some() {
            return config(format!(
                "dome {} has a contour and a contour file, give only one",
                i + 1
            ));
        }
        if !(dome.r_polar_opening > 0.0) {
            return config(format!("polar opening radius must be positive, got {}", dome.r_polar_opening));
        }
    }

    let positive = [
        ("dcyl", options.dcyl),
        ("temperature", options.temperature),
        ("max_fill", options.max_fill),
        ("helical_thickness", options.helical_ply_thickness),
        ("hoop_thickness", options.hoop_ply_thickness),
        ("roving_width_helical", options.roving_width_helical),
        ("roving_width_hoop", options.roving_width_hoop),
        ("tex", options.tex),
        ("rel_radius_hoop_layer_end", options.rel_radius_hoop_layer_end),
        ("max_helical_angle", options.max_helical_angle),
    ];
    for (name, value) in positive.iter() {
        if !(*value > 0.0) {
            return config(format!("--{} must be positive, got {}", name, value));
        }
    }
    let optional = [
        ("volume", options.volume),
        ("h2_mass", options.h2_mass),
        ("burst_pressure", options.burst_pressure),
        ("pressure", options.pressure),
        ("safety_factor", options.safety_factor),
        ("valve_release_factor", options.valve_release_factor),
        ("fibre_density", options.fibre_density),
    ];
    for (name, value) in optional.iter() {
        if let Some(value) = value {
            if !(*value > 0.0) {
                return config(format!("--{} must be positive, got {}", name, value));
            }
        }
    }
    let not_negative = [
        ("lcyl", options.lcyl.unwrap_or(0.0)),
        ("lcyl_by_r", options.lcyl_by_r.unwrap_or(0.0)),
        ("min_cyl_length", options.min_cylindrical_length),
        ("liner_thickness", options.liner_thickness),
        ("liner_density", options.liner_density),
        ("pressure_hydrostatic", options.pressure_hydrostatic.unwrap_or(0.0)),
        ("friction", options.friction),
    ];
    for (name, value) in not_negative.iter() {
        if !(*value >= 0.0) {
            return config(format!("--{} must not be negative, got {}", name, value));
        }
    }
    if options.max_fill > 1.0 {
        return config(format!("--max_fill must not exceed 1, got {}", options.max_fill));
    }
    if options.rovings_helical == 0 || options.rovings_hoop == 0 {
        return config("the number of rovings must be at least one".to_string());
    }
    if options.dome_points < 3 || options.every_nth == 0 {
        return config("--dome_points needs at least 3 and --every_nth at least 1".to_string());
    }
    Ok(())
}

/// Design burst pressure, derived from the service pressure when it is
/// not given. The resolved value is stored in the options.
pub fn get_burst_pressure(options: &mut DesignArgs) -> DesignResult<f64> {
    let burst = match options.burst_pressure {
        Some(burst) => burst,
        None => {
            (options.pressure.unwrap_or(DEFAULT_PRESSURE) + options.pressure_hydrostatic.unwrap_or(0.0))
                * options.safety_factor.unwrap_or(DEFAULT_SAFETY_FACTOR)
                * options.valve_release_factor.unwrap_or(DEFAULT_VALVE_RELEASE_FACTOR)
        }
    };
    if !(burst > 0.0) {
        return config(format!("burst pressure must be positive, got {}", burst));
    }
    options.burst_pressure = Some(burst);
    Ok(burst)
}

/// Read a contour file into the dome options. A dome given by points is
/// a generic dome.
fn load_contour(dome: &mut DomeArgs, every_nth: usize) -> DesignResult<()> {
    if let Some(file) = &dome.contour_file {
        dome.contour = Some(read_contour_file(Path::new(file), every_nth)?);
    }
    if dome.contour.is_some() {
        dome.dome_type = DomeType::Generic;
    }
    Ok(())
}

/// Dome at cylinder radius `r_cyl`. A contour is scaled to the radius.
fn build_dome(dome: &DomeArgs, r_cyl: f64) -> DesignResult<Dome> {
    if let Some((x, r)) = &dome.contour {
        let r0 = match r.first() {
            Some(&r0) if r0 > 0.0 => r0,
            _ => return Err(DesignError::Geometry("dome contour needs a positive first radius".to_string())),
        };
        let scale = r_cyl / r0;
        return Dome::generic(
            x.iter().map(|v| v * scale).collect(),
            r.iter().map(|v| v * scale).collect(),
        );
    }
    let r_po = dome.r_polar_opening;
    if r_po >= r_cyl {
        return config(format!(
            "polar opening radius {} must be smaller than the cylinder radius {}",
            r_po, r_cyl
        ));
    }
    match dome.dome_type {
        DomeType::Isotensoid => Dome::isotensoid(r_cyl, r_po, CONTOUR_POINTS),
        DomeType::Circle => Dome::spherical(r_cyl, r_po, CONTOUR_POINTS),
        DomeType::Ellipse => Dome::ellipsoidal(r_cyl, dome.length_by_r * r_cyl, r_po, CONTOUR_POINTS),
        DomeType::ConicalTorispherical => {
            Dome::conical_torispherical(r_cyl, r_po, dome.conical, CONTOUR_POINTS)
        }
        DomeType::Generic => config("a generic dome needs --dome_contour or --dome_contour_file".to_string()),
    }
}

fn build_domes(options: &DesignArgs, r_cyl: f64) -> DesignResult<(Dome, Option<Dome>)> {
    let dome = build_dome(&options.dome, r_cyl)?;
    let dome2 = match &options.dome2 {
        Some(args) => Some(build_dome(args, r_cyl)?),
        None => None,
    };
    Ok((dome, dome2))
}

/// Wall thickness between the winding surface and the stored gas.
fn wall(options: &DesignArgs) -> f64 {
    if options.is_metal() {
        0.0
    } else {
        options.liner_thickness
    }
}

/// Contour inside the liner wall.
fn inner_liner(liner: &Liner, wall: f64) -> DesignResult<Liner> {
    if wall > 0.0 {
        liner.resized(-wall)
    } else {
        Ok(liner.clone())
    }
}

/// Cylindrical length for the requested volume. When the domes alone hold
/// more than the request allows, the diameter shrinks so the minimum
/// cylindrical length fits.
fn size_to_volume(options: &mut DesignArgs, volume: f64) -> DesignResult<(Dome, Option<Dome>, f64)> {
    // m^3 -> mm^3
    let target = volume * 1e9;
    let wall = wall(options);
    let r_cyl = 0.5 * options.dcyl;
    let (dome, dome2) = build_domes(options, r_cyl)?;
    let domes_only = inner_liner(&Liner::new(dome.clone(), 0.0, dome2.clone())?, wall)?;
    let lcyl = (target - domes_only.volume()) / (PI * domes_only.r_cyl().powi(2));
    if lcyl >= options.min_cylindrical_length {
        return Ok((dome, dome2, lcyl));
    }

    let lcyl = options.min_cylindrical_length;
    let volume_at = |d: f64| -> DesignResult<f64> {
        let (dome, dome2) = build_domes(options, 0.5 * d)?;
        Ok(inner_liner(&Liner::new(dome, lcyl, dome2)?, wall)?.volume())
    };
    let r_po = options
        .dome2
        .iter()
        .chain(Some(&options.dome))
        .filter(|d| d.contour.is_none())
        .map(|d| d.r_polar_opening)
        .fold(0.0, f64::max);
    let lower = 2.0 * (r_po + wall) * 1.05;
    let (dcyl, residual, _) = Brent::default().fminbound(
        |d| match volume_at(d) {
            Ok(v) => (v - target).abs(),
            Err(_) => f64::INFINITY,
        },
        lower.min(options.dcyl),
        options.dcyl,
    );
    if !(residual <= VOLUME_TOLERANCE * target) {
        return config(format!(
            "a volume of {} m^3 can not be reached with a cylindrical length of at least {} mm",
            volume, lcyl
        ));
    }
    warn!(
        "volume of {} m^3 fits into the domes, diameter reduced from {:.3} to {:.3} mm",
        volume, options.dcyl, dcyl
    );
    options.dcyl = dcyl;
    let (dome, dome2) = build_domes(options, 0.5 * dcyl)?;
    Ok((dome, dome2, lcyl))
}

/// Build the liner the composite is wound on, or the inner contour of a
/// metal tank. Resolved values (diameter, cylindrical length, contours)
/// are written back into the options.
pub fn get_liner(options: &mut DesignArgs) -> DesignResult<Liner> {
    check_options(options)?;
    let every_nth = options.every_nth;
    load_contour(&mut options.dome, every_nth)?;
    if let Some(dome2) = options.dome2.as_mut() {
        load_contour(dome2, every_nth)?;
    }
    if let Some((_, r)) = &options.dome.contour {
        if let (Some(&first), Some(&last)) = (r.first(), r.last()) {
            if (2.0 * first - options.dcyl).abs() > 1e-6 * options.dcyl {
                info!("cylinder diameter {} taken from the dome contour", 2.0 * first);
            }
            options.dcyl = 2.0 * first;
            options.dome.r_polar_opening = last;
        }
    }
    let r_cyl = 0.5 * options.dcyl;
    if options.dome.contour.is_none() && options.dome.r_polar_opening >= r_cyl {
        return config(format!(
            "polar opening radius {} must be smaller than half the cylinder diameter {}",
            options.dome.r_polar_opening, options.dcyl
        ));
    }
    if !(wall(options) < r_cyl) {
        return config(format!(
            "liner thickness {} does not fit into the cylinder radius {}",
            options.liner_thickness, r_cyl
        ));
    }

    let (dome, dome2, lcyl) = match options.volume {
        Some(volume) => size_to_volume(options, volume)?,
        None => {
            let lcyl = match options.lcyl {
                Some(lcyl) => lcyl,
                None => options.lcyl_by_r.unwrap_or(DEFAULT_LCYL_BY_R) * r_cyl,
            };
            let (dome, dome2) = build_domes(options, r_cyl)?;
            (dome, dome2, lcyl)
        }
    };

    // record the contour that was built
    options.dome.contour = Some((dome.x().to_vec(), dome.r().to_vec()));
    if let (Some(args), Some(d)) = (options.dome2.as_mut(), &dome2) {
        args.contour = Some((d.x().to_vec(), d.r().to_vec()));
    }
    options.lcyl = Some(lcyl);
    info!("liner: dcyl {:.3} mm, lcyl {:.3} mm", options.dcyl, lcyl);
    Liner::new(dome, lcyl, dome2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::get_default_options;

    #[test]
    fn cylinder_length_from_the_radius() {
        let mut options = get_default_options();
        options.dcyl = 300.0;
        let liner = get_liner(&mut options).unwrap();
        assert!((liner.lcyl() - DEFAULT_LCYL_BY_R * 150.0).abs() < 1e-12);
        assert_eq!(options.dome.dome_type, DomeType::Isotensoid);
        assert!(options.dome.contour.is_some());
    }

    #[test]
    fn exclusive_options() {
        let mut options = get_default_options();
        options.lcyl = Some(300.0);
        options.lcyl_by_r = Some(2.0);
        assert!(get_liner(&mut options).unwrap_err().is_configuration());

        let mut options = get_default_options();
        options.burst_pressure = Some(100.0);
        options.safety_factor = Some(2.25);
        assert!(get_burst_pressure(&mut options).is_ok());
        assert!(check_options(&options).unwrap_err().is_configuration());
    }

    #[test]
    fn polar_opening_at_the_cylinder_radius() {
        let mut options = get_default_options();
        options.dome.r_polar_opening = 200.0;
        match get_liner(&mut options) {
            Err(DesignError::Configuration(_)) => (),
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn burst_pressure_from_the_service_pressure() {
        let mut options = get_default_options();
        options.pressure = Some(35.0);
        options.pressure_hydrostatic = Some(1.0);
        options.safety_factor = Some(2.25);
        options.valve_release_factor = Some(1.1);
        let burst = get_burst_pressure(&mut options).unwrap();
        assert!((burst - 36.0 * 2.25 * 1.1).abs() < 1e-12);
        assert_eq!(options.burst_pressure, Some(burst));
    }

    #[test]
    fn volume_sets_the_cylinder_length() {
        let mut options = get_default_options();
        options.volume = Some(0.1);
        let liner = get_liner(&mut options).unwrap();
        let inner = liner.resized(-options.liner_thickness).unwrap().volume() * 1e-9;
        assert!((inner - 0.1).abs() < 1e-9);
        assert_eq!(options.dcyl, 400.0);
    }

    #[test]
    fn thirty_seven_litre_tank() {
        let mut options = get_default_options();
        options.volume = Some(0.037);
        options.dome.r_polar_opening = 15.0;
        options.material = "CFRP_T700SC_LY556".to_string();
        let liner = get_liner(&mut options).unwrap();
        let inner = liner.resized(-options.liner_thickness).unwrap().volume() * 1e-9;
        assert!((inner - 0.037).abs() < 0.01 * 0.037);
        assert!(liner.lcyl() >= options.min_cylindrical_length);
    }

    #[test]
    fn tiny_volume_shrinks_the_diameter() {
        let mut options = get_default_options();
        options.volume = Some(0.002);
        let liner = get_liner(&mut options).unwrap();
        assert!(options.dcyl < 400.0);
        assert_eq!(liner.lcyl(), options.min_cylindrical_length);
        let inner = liner.resized(-options.liner_thickness).unwrap().volume() * 1e-9;
        assert!((inner - 0.002).abs() < 0.01 * 0.002);
    }

    #[test]
    fn contour_defines_the_diameter() {
        let mut options = get_default_options();
        options.dome.contour = Some((vec![0.0, 20.0, 40.0, 50.0], vec![120.0, 110.0, 70.0, 25.0]));
        options.lcyl = Some(100.0);
        let liner = get_liner(&mut options).unwrap();
        assert_eq!(options.dcyl, 240.0);
        assert_eq!(options.dome.dome_type, DomeType::Generic);
        assert_eq!(liner.dome(copv::contour::Side::One).r_polar_opening(), 25.0);
    }

    #[test]
    fn unsymmetric_liner() {
        let mut options = get_default_options();
        options.dome2 = Some(DomeArgs {
            dome_type: DomeType::Circle,
            r_polar_opening: 40.0,
            ..DomeArgs::default()
        });
        let liner = get_liner(&mut options).unwrap();
        assert!(!liner.symmetric());
    }
}
