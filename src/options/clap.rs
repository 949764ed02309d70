use std::process;
use std::str::FromStr;

use crate::options::{Contour, DesignArgs, DomeArgs, TerminatingOutput, Verbosity, WindingOrMetal};
use clap::{App, AppSettings, Arg, ArgMatches};
use copv::contour::{ConicalShape, DomeType};
use copv::io::parse_pairs;
use log::error;

/// Get the options from the command line, or from `line` when it is not
/// empty.
pub fn get_options_clap(line: &str, options: &mut DesignArgs) {
    let process = App::new("copvdesign: layer by layer winding design of pressure vessels")
        .version(crate_version!())
        .about(include_str!("../description.md"))
        .setting(AppSettings::AllowLeadingHyphen)

        .arg(Arg::with_name("winding_or_metal")
             .long("winding_or_metal")
             .value_name("KIND")
             .possible_values(&WindingOrMetal::variants())
             .case_insensitive(true)
             .help("design a wound composite vessel or size a metal tank (default winding)")
             .takes_value(true))

    // liner geometry
        .arg(Arg::with_name("dcyl")
             .long("dcyl")
             .value_name("DIAMETER")
             .help("cylinder diameter of the liner (default 400 mm)")
             .takes_value(true))

        .arg(Arg::with_name("lcyl")
             .long("lcyl")
             .value_name("LENGTH")
             .help("cylindrical length of the liner (mm)")
             .takes_value(true))

        .arg(Arg::with_name("lcyl_by_r")
             .long("lcyl_by_r")
             .value_name("RATIO")
             .help("cylindrical length relative to the cylinder radius (default 2.5)")
             .takes_value(true))

        .arg(Arg::with_name("volume")
             .long("volume")
             .value_name("VOLUME")
             .help("inner volume of the vessel (m^3). The cylindrical length, and if needed the diameter, are sized to it")
             .takes_value(true))

        .arg(Arg::with_name("min_cyl_length")
             .long("min_cyl_length")
             .value_name("LENGTH")
             .help("smallest cylindrical length when sizing to a volume (default 50 mm)")
             .takes_value(true))

        .arg(Arg::with_name("dome_type")
             .long("dome_type")
             .value_name("TYPE")
             .possible_values(&DomeType::variants())
             .case_insensitive(true)
             .help("dome shape (default isotensoid)")
             .takes_value(true))

        .arg(Arg::with_name("r_polar_opening")
             .long("r_polar_opening")
             .value_name("RADIUS")
             .help("polar opening radius of the dome (default 20 mm)")
             .takes_value(true))

        .arg(Arg::with_name("dome_length_by_r")
             .long("dome_length_by_r")
             .value_name("RATIO")
             .help("axial half axis of an ellipse dome relative to the cylinder radius (default 0.5)")
             .takes_value(true))

        .arg(Arg::with_name("conical_shape")
             .long("conical_shape")
             .value_name("ALPHA,BETA,GAMMA,DELTA1")
             .help("shape ratios of a conical torispherical dome (default 0.5,0.5,0.3,0.5)")
             .takes_value(true))

        .arg(Arg::with_name("dome_contour")
             .long("dome_contour")
             .value_name("x1,r1,x2,r2,...")
             .help("explicit dome contour, starting at the cylinder")
             .takes_value(true))

        .arg(Arg::with_name("dome_contour_file")
             .long("dome_contour_file")
             .value_name("FILE")
             .help("read the dome contour from a file of 'x r' rows")
             .takes_value(true))

        .arg(Arg::with_name("dome2_type")
             .long("dome2_type")
             .value_name("TYPE")
             .possible_values(&DomeType::variants())
             .case_insensitive(true)
             .help("shape of a different second dome. Any dome2 option makes the vessel unsymmetric")
             .takes_value(true))

        .arg(Arg::with_name("r_polar_opening2")
             .long("r_polar_opening2")
             .value_name("RADIUS")
             .help("polar opening radius of the second dome")
             .takes_value(true))

        .arg(Arg::with_name("dome2_length_by_r")
             .long("dome2_length_by_r")
             .value_name("RATIO")
             .help("axial half axis of a second ellipse dome relative to the cylinder radius")
             .takes_value(true))

        .arg(Arg::with_name("dome2_contour")
             .long("dome2_contour")
             .value_name("x1,r1,x2,r2,...")
             .help("explicit contour of the second dome")
             .takes_value(true))

        .arg(Arg::with_name("dome2_contour_file")
             .long("dome2_contour_file")
             .value_name("FILE")
             .help("read the contour of the second dome from a file")
             .takes_value(true))

        .arg(Arg::with_name("every_nth")
             .long("every_nth")
             .value_name("N")
             .help("keep every n-th row of a contour file (default 1)")
             .takes_value(true))

        .arg(Arg::with_name("dome_points")
             .long("dome_points")
             .value_name("N")
             .help("number of mandrel nodes per dome (default 50)")
             .takes_value(true))

        .arg(Arg::with_name("liner_thickness")
             .long("liner_thickness")
             .value_name("THICKNESS")
             .help("liner wall thickness (default 3 mm)")
             .takes_value(true))

        .arg(Arg::with_name("liner_density")
             .long("liner_density")
             .value_name("DENSITY")
             .help("liner density (default 0.95 g/cm^3)")
             .takes_value(true))

    // loads
        .arg(Arg::with_name("pressure")
             .short("p")
             .long("pressure")
             .value_name("PRESSURE")
             .help("service pressure (default 70 MPa)")
             .takes_value(true))

        .arg(Arg::with_name("pressure_hydrostatic")
             .long("pressure_hydrostatic")
             .value_name("PRESSURE")
             .help("hydrostatic pressure added to the service pressure (default 0 MPa)")
             .takes_value(true))

        .arg(Arg::with_name("safety_factor")
             .long("safety_factor")
             .value_name("FACTOR")
             .help("ultimate safety factor (default 2.0)")
             .takes_value(true))

        .arg(Arg::with_name("valve_release_factor")
             .long("valve_release_factor")
             .value_name("FACTOR")
             .help("factor of the pressure relief valve (default 1.0)")
             .takes_value(true))

        .arg(Arg::with_name("burst_pressure")
             .short("b")
             .long("burst_pressure")
             .value_name("PRESSURE")
             .help("design burst pressure (MPa), instead of deriving it from the service pressure")
             .takes_value(true))

    // hydrogen
        .arg(Arg::with_name("h2_mass")
             .long("h2_mass")
             .value_name("MASS")
             .help("stored hydrogen mass (kg). Derived from pressure and temperature when absent")
             .takes_value(true))

        .arg(Arg::with_name("temperature")
             .long("temperature")
             .value_name("T")
             .help("storage temperature (default 288.15 K)")
             .takes_value(true))

        .arg(Arg::with_name("max_fill")
             .long("max_fill")
             .value_name("FRACTION")
             .help("filled fraction of the volume (default 1.0)")
             .takes_value(true))

    // composite
        .arg(Arg::with_name("material")
             .short("m")
             .long("material")
             .value_name("NAME")
             .help("name of a built in composite material (default CFRP_HyPo_T700)")
             .takes_value(true))

        .arg(Arg::with_name("material_file")
             .long("material_file")
             .value_name("FILE")
             .help("read the composite material from a json file")
             .takes_value(true))

        .arg(Arg::with_name("helical_thickness")
             .long("helical_thickness")
             .value_name("THICKNESS")
             .help("single ply thickness of helical plies (default 0.125 mm)")
             .takes_value(true))

        .arg(Arg::with_name("hoop_thickness")
             .long("hoop_thickness")
             .value_name("THICKNESS")
             .help("single ply thickness of hoop plies (default 0.125 mm)")
             .takes_value(true))

        .arg(Arg::with_name("roving_width_helical")
             .long("roving_width_helical")
             .value_name("WIDTH")
             .help("roving width of helical plies (default 3.175 mm)")
             .takes_value(true))

        .arg(Arg::with_name("roving_width_hoop")
             .long("roving_width_hoop")
             .value_name("WIDTH")
             .help("roving width of hoop plies (default 3.175 mm)")
             .takes_value(true))

        .arg(Arg::with_name("rovings_helical")
             .long("rovings_helical")
             .value_name("N")
             .help("number of rovings of helical plies (default 4)")
             .takes_value(true))

        .arg(Arg::with_name("rovings_hoop")
             .long("rovings_hoop")
             .value_name("N")
             .help("number of rovings of hoop plies (default 4)")
             .takes_value(true))

        .arg(Arg::with_name("tex")
             .long("tex")
             .value_name("TEX")
             .help("fibre linear density (default 446 g/km)")
             .takes_value(true))

        .arg(Arg::with_name("fibre_density")
             .long("fibre_density")
             .value_name("DENSITY")
             .help("fibre density of the rovings (default 1.78 g/cm^3)")
             .takes_value(true))

        .arg(Arg::with_name("friction")
             .long("friction")
             .value_name("MU")
             .help("friction coefficient of every ply (default 0)")
             .takes_value(true))

    // design
        .arg(Arg::with_name("iff")
             .long("iff")
             .help("design against inter fibre failure instead of fibre failure"))

        .arg(Arg::with_name("max_layers")
             .long("max_layers")
             .value_name("N")
             .help("layer budget of the design (default 100)")
             .takes_value(true))

        .arg(Arg::with_name("rel_radius_hoop_layer_end")
             .long("rel_radius_hoop_layer_end")
             .value_name("RATIO")
             .help("end of the hoop region relative to the cylinder radius (default 0.95)")
             .takes_value(true))

        .arg(Arg::with_name("weights")
             .long("weights")
             .value_name("w1,...,w6")
             .help("weights of the six target function terms (default 1.0,0.2,0.2,0.0,1.0,0.5)")
             .takes_value(true)
             .require_delimiter(true))

        .arg(Arg::with_name("hoop_or_helical_fac")
             .long("hoop_or_helical_fac")
             .value_name("FACTOR")
             .help("a helical ply wins the hoop region when its target is below this factor times the hoop target (default 1.0)")
             .takes_value(true))

        .arg(Arg::with_name("distribute_hoop")
             .long("distribute_hoop")
             .help("place hoop plies on equally spaced shifts instead of optimising each shift"))

        .arg(Arg::with_name("local_only")
             .long("local_only")
             .help("only run the local search for helical angles"))

        .arg(Arg::with_name("seed")
             .long("seed")
             .value_name("SEED")
             .help("seed of the differential evolution (default 1)")
             .takes_value(true))

        .arg(Arg::with_name("max_helical_angle")
             .long("max_helical_angle")
             .value_name("ANGLE")
             .help("largest helical winding angle (default 70 deg)")
             .takes_value(true))

        .arg(Arg::with_name("hoop_shift_cap")
             .long("hoop_shift_cap")
             .value_name("SHIFT")
             .help("upper limit of a hoop shift (default 250 mm)")
             .takes_value(true))

        .arg(Arg::with_name("initial_stack")
             .long("initial_stack")
             .value_name("a1,s1,a2,s2,...")
             .help("angles and shifts of plies wound before the design starts")
             .takes_value(true))

        .arg(Arg::with_name("resume")
             .long("resume")
             .value_name("FILE")
             .help("start from the laminate of a snapshot file")
             .takes_value(true))

    // metal
        .arg(Arg::with_name("metal")
             .long("metal")
             .value_name("NAME")
             .help("metal of a metal tank (default alu6061T6)")
             .takes_value(true))

    // output
        .arg(Arg::with_name("out_dir")
             .short("o")
             .long("out_dir")
             .value_name("DIR")
             .help("directory the run directory is created in (default .)")
             .takes_value(true))

        .arg(Arg::with_name("plots")
             .long("plots")
             .help("write svg plots of the target function, exposure and contour"))

        .arg(Arg::with_name("list")
             .short("l")
             .long("list")
             .help("list the materials, metals, dome types and output files"))

        .arg(Arg::with_name("verbose")
             .short("v")
             .long("verbose")
             .help("print all options before the run"));

    // turn the commands into matches
    let matches = if line.is_empty() {
        // this will get them directly from the command line
        process.get_matches()
    } else {
        // add command word since it skips first argument
        process.get_matches_from(("copvdesign ".to_string() + line.trim()).split_whitespace())
    };

    if let Ok(kind) = value_t!(matches.value_of("winding_or_metal"), WindingOrMetal) {
        options.winding_or_metal = kind;
    }

    // geometry
    if let Some(dcyl) = number(&matches, "dcyl") {
        options.dcyl = dcyl;
    }
    if let Some(lcyl) = number(&matches, "lcyl") {
        options.lcyl = Some(lcyl);
    }
    if let Some(lcyl_by_r) = number(&matches, "lcyl_by_r") {
        options.lcyl_by_r = Some(lcyl_by_r);
    }
    if let Some(volume) = number(&matches, "volume") {
        options.volume = Some(volume);
    }
    if let Some(length) = number(&matches, "min_cyl_length") {
        options.min_cylindrical_length = length;
    }
    read_dome(&matches, "", &mut options.dome);
    let second = ["dome2_type", "r_polar_opening2", "dome2_length_by_r", "dome2_contour", "dome2_contour_file"];
    if second.iter().any(|name| matches.is_present(name)) {
        let mut dome2 = options.dome2.clone().unwrap_or_else(|| DomeArgs {
            contour: None,
            contour_file: None,
            ..options.dome.clone()
        });
        read_dome(&matches, "2", &mut dome2);
        options.dome2 = Some(dome2);
    }
    if let Some(every_nth) = number(&matches, "every_nth") {
        options.every_nth = every_nth;
    }
    if let Some(dome_points) = number(&matches, "dome_points") {
        options.dome_points = dome_points;
    }
    if let Some(thickness) = number(&matches, "liner_thickness") {
        options.liner_thickness = thickness;
    }
    if let Some(density) = number(&matches, "liner_density") {
        options.liner_density = density;
    }

    // loads
    if let Some(pressure) = number(&matches, "pressure") {
        options.pressure = Some(pressure);
    }
    if let Some(pressure) = number(&matches, "pressure_hydrostatic") {
        options.pressure_hydrostatic = Some(pressure);
    }
    if let Some(factor) = number(&matches, "safety_factor") {
        options.safety_factor = Some(factor);
    }
    if let Some(factor) = number(&matches, "valve_release_factor") {
        options.valve_release_factor = Some(factor);
    }
    if let Some(pressure) = number(&matches, "burst_pressure") {
        options.burst_pressure = Some(pressure);
    }

    // hydrogen
    if let Some(mass) = number(&matches, "h2_mass") {
        options.h2_mass = Some(mass);
    }
    if let Some(temperature) = number(&matches, "temperature") {
        options.temperature = temperature;
    }
    if let Some(fill) = number(&matches, "max_fill") {
        options.max_fill = fill;
    }

    // composite
    if let Some(material) = matches.value_of("material") {
        options.material = material.to_string();
    }
    if let Some(file) = matches.value_of("material_file") {
        options.material_file = Some(file.to_string());
        // the fibre density comes with the material
        if !matches.is_present("fibre_density") {
            options.fibre_density = None;
        }
    }
    if let Some(thickness) = number(&matches, "helical_thickness") {
        options.helical_ply_thickness = thickness;
    }
    if let Some(thickness) = number(&matches, "hoop_thickness") {
        options.hoop_ply_thickness = thickness;
    }
    if let Some(width) = number(&matches, "roving_width_helical") {
        options.roving_width_helical = width;
    }
    if let Some(width) = number(&matches, "roving_width_hoop") {
        options.roving_width_hoop = width;
    }
    if let Some(rovings) = number(&matches, "rovings_helical") {
        options.rovings_helical = rovings;
    }
    if let Some(rovings) = number(&matches, "rovings_hoop") {
        options.rovings_hoop = rovings;
    }
    if let Some(tex) = number(&matches, "tex") {
        options.tex = tex;
    }
    if let Some(density) = number(&matches, "fibre_density") {
        options.fibre_density = Some(density);
    }
    if let Some(friction) = number(&matches, "friction") {
        options.friction = friction;
    }

    // design
    if matches.is_present("iff") {
        options.use_fibre_failure = false;
    }
    if let Some(max_layers) = number(&matches, "max_layers") {
        options.max_layers = max_layers;
    }
    if let Some(ratio) = number(&matches, "rel_radius_hoop_layer_end") {
        options.rel_radius_hoop_layer_end = ratio;
    }
    if matches.is_present("weights") {
        let weights = values_t!(matches, "weights", f64).unwrap_or_else(|e| e.exit());
        options.weights = parse_weights(&weights);
    }
    if let Some(factor) = number(&matches, "hoop_or_helical_fac") {
        options.hoop_or_helical_fac = factor;
    }
    if matches.is_present("distribute_hoop") {
        options.do_hoop_opt = false;
    }
    if matches.is_present("local_only") {
        options.use_global_search = false;
    }
    if let Some(seed) = number(&matches, "seed") {
        options.optimiser_seed = seed;
    }
    if let Some(angle) = number(&matches, "max_helical_angle") {
        options.max_helical_angle = angle;
    }
    if let Some(cap) = number(&matches, "hoop_shift_cap") {
        options.hoop_shift_cap = cap;
    }
    if let Some(stack) = matches.value_of("initial_stack") {
        options.initial_stack = pairs_or_exit(stack);
    }
    if let Some(file) = matches.value_of("resume") {
        options.resume = Some(file.to_string());
    }

    if let Some(metal) = matches.value_of("metal") {
        options.metal = metal.to_string();
    }

    // output
    if let Some(dir) = matches.value_of("out_dir") {
        options.out_dir = dir.to_string();
    }
    if matches.is_present("plots") {
        options.plots = true;
    }
    if matches.is_present("list") {
        options.output = TerminatingOutput::List;
    }
    if matches.is_present("verbose") {
        options.verbosity = Verbosity::Verbose;
    }
}

/// Value of an option if it was given. A value that does not parse ends
/// the program with the clap error.
fn number<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    if matches.is_present(name) {
        Some(value_t!(matches, name, T).unwrap_or_else(|e| e.exit()))
    } else {
        None
    }
}

/// Read the options of one dome; `suffix` is "" for the first dome and
/// "2" for the second.
fn read_dome(matches: &ArgMatches, suffix: &str, dome: &mut DomeArgs) {
    let name = |base: &str| {
        if suffix.is_empty() {
            base.to_string()
        } else {
            match base {
                "r_polar_opening" => format!("r_polar_opening{}", suffix),
                _ => base.replacen("dome", &format!("dome{}", suffix), 1),
            }
        }
    };

    if let Some(kind) = matches.value_of(&name("dome_type")) {
        dome.dome_type = match kind.parse::<DomeType>() {
            Ok(kind) => kind,
            Err(why) => {
                error!("Error: {}", why);
                process::exit(1)
            }
        };
    }
    if let Some(r) = number(matches, &name("r_polar_opening")) {
        dome.r_polar_opening = r;
    }
    if let Some(ratio) = number(matches, &name("dome_length_by_r")) {
        dome.length_by_r = ratio;
    }
    if suffix.is_empty() {
        if let Some(shape) = matches.value_of("conical_shape") {
            dome.conical = parse_conical_shape(shape);
        }
    }
    if let Some(contour) = matches.value_of(&name("dome_contour")) {
        dome.contour = Some(contour_or_exit(contour));
    }
    if let Some(file) = matches.value_of(&name("dome_contour_file")) {
        dome.contour_file = Some(file.to_string());
    }
}

fn pairs_or_exit(input: &str) -> Vec<(f64, f64)> {
    match parse_pairs(input) {
        Ok(pairs) => pairs,
        Err(why) => {
            error!("Error: {}", why);
            process::exit(1)
        }
    }
}

fn contour_or_exit(input: &str) -> Contour {
    pairs_or_exit(input).into_iter().unzip()
}

fn parse_conical_shape(input: &str) -> ConicalShape {
    let values: Result<Vec<f64>, _> = input.split(',').map(|v| v.trim().parse::<f64>()).collect();
    match values {
        Ok(ref v) if v.len() == 4 => ConicalShape {
            alpha: v[0],
            beta: v[1],
            gamma: v[2],
            delta1: v[3],
        },
        _ => {
            error!(
                "Error: --conical_shape needs four numbers alpha,beta,gamma,delta1, got '{}'",
                input
            );
            process::exit(1)
        }
    }
}

fn parse_weights(values: &[f64]) -> [f64; 6] {
    if values.len() != 6 || values.iter().any(|w| !(*w >= 0.0)) {
        error!(
            "Error: --weights needs six non negative numbers, got {:?}",
            values
        );
        process::exit(1)
    }
    let mut weights = [0.0; 6];
    weights.copy_from_slice(values);
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::get_default_options;

    #[test]
    fn defaults_survive_an_empty_line() {
        let mut options = get_default_options();
        get_options_clap("--plots", &mut options);
        assert!(options.plots);
        assert_eq!(options.dcyl, 400.0);
        assert_eq!(options.winding_or_metal, WindingOrMetal::Winding);
        assert!(options.dome2.is_none());
    }

    #[test]
    fn geometry_options() {
        let mut options = get_default_options();
        get_options_clap(
            "--dcyl 300 --lcyl 500 --dome_type ellipse --dome_length_by_r 0.7 --r_polar_opening 15",
            &mut options,
        );
        assert_eq!(options.dcyl, 300.0);
        assert_eq!(options.lcyl, Some(500.0));
        assert_eq!(options.dome.dome_type, DomeType::Ellipse);
        assert_eq!(options.dome.length_by_r, 0.7);
        assert_eq!(options.dome.r_polar_opening, 15.0);
    }

    #[test]
    fn second_dome_starts_from_the_first() {
        let mut options = get_default_options();
        get_options_clap("--dome_type circle --r_polar_opening 12 --r_polar_opening2 30", &mut options);
        let dome2 = options.dome2.unwrap();
        assert_eq!(dome2.dome_type, DomeType::Circle);
        assert_eq!(dome2.r_polar_opening, 30.0);
        assert_eq!(options.dome.r_polar_opening, 12.0);
    }

    #[test]
    fn contour_and_stack() {
        let mut options = get_default_options();
        get_options_clap(
            "--dome_contour 0,100,20,80,30,20 --initial_stack 10,0,90,-5",
            &mut options,
        );
        let (x, r) = options.dome.contour.unwrap();
        assert_eq!(x, vec![0.0, 20.0, 30.0]);
        assert_eq!(r, vec![100.0, 80.0, 20.0]);
        assert_eq!(options.initial_stack, vec![(10.0, 0.0), (90.0, -5.0)]);
    }

    #[test]
    fn design_switches() {
        let mut options = get_default_options();
        get_options_clap(
            "--iff --distribute_hoop --local_only --weights 1,0,0,0.5,1,0 --winding_or_metal metal",
            &mut options,
        );
        assert!(!options.use_fibre_failure);
        assert!(!options.do_hoop_opt);
        assert!(!options.use_global_search);
        assert_eq!(options.weights, [1.0, 0.0, 0.0, 0.5, 1.0, 0.0]);
        assert!(options.is_metal());
    }

    #[test]
    fn material_file_brings_its_fibre_density() {
        let mut options = get_default_options();
        get_options_clap("--material_file cfrp.json", &mut options);
        assert_eq!(options.fibre_density, None);
        get_options_clap("--material_file cfrp.json --fibre_density 1.8", &mut options);
        assert_eq!(options.fibre_density, Some(1.8));
    }
}
