/// These are the data structures for command line options as well as
/// the initial default values.

use std::fmt;

use copv::contour::{ConicalShape, DomeType};
use copv::material::DEFAULT_MATERIAL;
use copv::target::DEFAULT_WEIGHTS;
use copv::COMMENT;

pub mod builder;
pub mod clap;

arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum WindingOrMetal {
        Winding,
        Metal,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verbosity {
    Verbose,
    Terse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminatingOutput {
    List,
    None,
}

/// Which options a key belongs to. Keys of the other vessel kind are left
/// out of the report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Group {
    Geometry,
    Loads,
    Hydrogen,
    Winding,
    Metal,
    Output,
}

/// Explicit contour points of one dome.
pub type Contour = (Vec<f64>, Vec<f64>);

/// Dome description of one side of the vessel.
#[derive(Debug, Clone)]
pub struct DomeArgs {
    pub dome_type: DomeType,
    /// polar opening radius (mm)
    pub r_polar_opening: f64,
    /// axial half axis of an ellipse relative to the cylinder radius
    pub length_by_r: f64,
    pub conical: ConicalShape,
    pub contour: Option<Contour>,
    pub contour_file: Option<String>,
}

/// Option data for a vessel design run.
#[derive(Debug, Clone)]
pub struct DesignArgs {
    pub winding_or_metal: WindingOrMetal,

    /// cylinder diameter of the liner (mm)
    pub dcyl: f64,
    /// cylindrical length (mm)
    pub lcyl: Option<f64>,
    /// cylindrical length relative to the cylinder radius
    pub lcyl_by_r: Option<f64>,
    /// requested inner volume (m^3)
    pub volume: Option<f64>,
    pub min_cylindrical_length: f64,
    pub dome: DomeArgs,
    /// a second dome makes the vessel unsymmetric
    pub dome2: Option<DomeArgs>,
    /// keep every n-th row of a contour file
    pub every_nth: usize,
    /// nodes per dome of the winding mandrel
    pub dome_points: usize,
    pub liner_thickness: f64,
    /// g/cm^3
    pub liner_density: f64,

    /// service pressure (MPa)
    pub pressure: Option<f64>,
    pub pressure_hydrostatic: Option<f64>,
    pub safety_factor: Option<f64>,
    pub valve_release_factor: Option<f64>,
    /// design pressure of the failure evaluation (MPa)
    pub burst_pressure: Option<f64>,

    /// given hydrogen mass (kg), otherwise derived from the gas state
    pub h2_mass: Option<f64>,
    /// K
    pub temperature: f64,
    pub max_fill: f64,

    pub material: String,
    pub material_file: Option<String>,
    pub helical_ply_thickness: f64,
    pub hoop_ply_thickness: f64,
    pub roving_width_helical: f64,
    pub roving_width_hoop: f64,
    pub rovings_helical: usize,
    pub rovings_hoop: usize,
    /// g/km
    pub tex: f64,
    /// fibre density of the rovings (g/cm^3), material value if absent
    pub fibre_density: Option<f64>,
    pub friction: f64,

    pub use_fibre_failure: bool,
    pub max_layers: usize,
    pub rel_radius_hoop_layer_end: f64,
    pub weights: [f64; 6],
    pub hoop_or_helical_fac: f64,
    pub do_hoop_opt: bool,
    pub use_global_search: bool,
    pub optimiser_seed: u64,
    pub max_helical_angle: f64,
    pub hoop_shift_cap: f64,
    pub initial_stack: Vec<(f64, f64)>,
    pub resume: Option<String>,

    pub metal: String,

    pub out_dir: String,
    pub plots: bool,
    pub output: TerminatingOutput,
    pub verbosity: Verbosity,
}

pub const DEFAULT_LCYL_BY_R: f64 = 2.5;
pub const DEFAULT_PRESSURE: f64 = 70.0;
pub const DEFAULT_SAFETY_FACTOR: f64 = 2.0;
pub const DEFAULT_VALVE_RELEASE_FACTOR: f64 = 1.0;

impl DesignArgs {
    pub fn is_metal(&self) -> bool {
        self.winding_or_metal == WindingOrMetal::Metal
    }

    pub fn service_pressure(&self) -> f64 {
        self.pressure.unwrap_or(DEFAULT_PRESSURE)
    }

    /// All options as `key: value` pairs with the group they belong to.
    pub fn entries(&self) -> Vec<(Group, String, String)> {
        let mut all = vec![];
        let mut add = |group: Group, key: &str, value: String| all.push((group, key.to_string(), value));

        add(Group::Geometry, "windingOrMetal", self.winding_or_metal.to_string());
        add(Group::Geometry, "dcyl", self.dcyl.to_string());
        add(Group::Geometry, "lcyl", opt(&self.lcyl));
        add(Group::Geometry, "lcylByR", opt(&self.lcyl_by_r));
        add(Group::Geometry, "volume", opt(&self.volume));
        add(Group::Geometry, "minCylindricalLength", self.min_cylindrical_length.to_string());
        add(Group::Geometry, "domeType", self.dome.dome_type.to_string());
        add(Group::Geometry, "rPolarOpening", self.dome.r_polar_opening.to_string());
        add(Group::Geometry, "domeContour", contour(&self.dome.contour));
        if let Some(dome2) = &self.dome2 {
            add(Group::Geometry, "dome2Type", dome2.dome_type.to_string());
            add(Group::Geometry, "rPolarOpening2", dome2.r_polar_opening.to_string());
            add(Group::Geometry, "dome2Contour", contour(&dome2.contour));
        }
        add(Group::Winding, "linerThickness", self.liner_thickness.to_string());
        add(Group::Winding, "linerDensity", self.liner_density.to_string());

        add(Group::Loads, "pressure", self.service_pressure().to_string());
        add(Group::Loads, "pressureHydrostatic", opt(&self.pressure_hydrostatic));
        add(Group::Loads, "safetyFactor", opt(&self.safety_factor));
        add(Group::Loads, "valveReleaseFactor", opt(&self.valve_release_factor));
        add(Group::Loads, "burstPressure", opt(&self.burst_pressure));

        add(Group::Hydrogen, "h2Mass", opt(&self.h2_mass));
        add(Group::Hydrogen, "temperature", self.temperature.to_string());
        add(Group::Hydrogen, "maxFill", self.max_fill.to_string());

        add(Group::Winding, "materialName", self.material.clone());
        add(Group::Winding, "materialFile", opt(&self.material_file));
        add(Group::Winding, "helicalLayerThickness", self.helical_ply_thickness.to_string());
        add(Group::Winding, "hoopLayerThickness", self.hoop_ply_thickness.to_string());
        add(Group::Winding, "rovingWidthHelical", self.roving_width_helical.to_string());
        add(Group::Winding, "rovingWidthHoop", self.roving_width_hoop.to_string());
        add(Group::Winding, "numberOfRovingsHelical", self.rovings_helical.to_string());
        add(Group::Winding, "numberOfRovingsHoop", self.rovings_hoop.to_string());
        add(Group::Winding, "tex", self.tex.to_string());
        add(Group::Winding, "fibreDensity", opt(&self.fibre_density));
        add(Group::Winding, "friction", self.friction.to_string());
        add(Group::Winding, "useFibreFailure", self.use_fibre_failure.to_string());
        add(Group::Winding, "maxLayers", self.max_layers.to_string());
        add(Group::Winding, "relRadiusHoopLayerEnd", self.rel_radius_hoop_layer_end.to_string());
        add(Group::Winding, "targetFuncWeights", format!("{:?}", self.weights));
        add(Group::Winding, "hoopOrHelicalFac", self.hoop_or_helical_fac.to_string());
        add(Group::Winding, "doHoopOpt", self.do_hoop_opt.to_string());
        add(Group::Winding, "useGlobalSearch", self.use_global_search.to_string());
        add(Group::Winding, "optimizerSeed", self.optimiser_seed.to_string());
        add(Group::Winding, "maxHelicalAngle", self.max_helical_angle.to_string());
        add(Group::Winding, "hoopShiftCap", self.hoop_shift_cap.to_string());
        add(Group::Winding, "initialStack", format!("{:?}", self.initial_stack));
        add(Group::Winding, "resume", opt(&self.resume));

        add(Group::Metal, "metalMaterial", self.metal.clone());

        add(Group::Output, "outDir", self.out_dir.clone());
        add(Group::Output, "plots", self.plots.to_string());
        all
    }

    /// Entries of the chosen vessel kind only.
    pub fn report_entries(&self) -> Vec<(String, String)> {
        let skipped = if self.is_metal() { Group::Winding } else { Group::Metal };
        self.entries()
            .into_iter()
            .filter(|(group, _, _)| *group != skipped)
            .map(|(_, key, value)| (key, value))
            .collect()
    }
}

fn opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn contour(contour: &Option<Contour>) -> String {
    match contour {
        Some((x, _)) => format!("{} points", x.len()),
        None => "-".to_string(),
    }
}

impl fmt::Display for DesignArgs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (key, value) in self.report_entries() {
            writeln!(f, "{}{}: {}", COMMENT, key, value)?;
        }
        Ok(())
    }
}

impl Default for DomeArgs {
    fn default() -> Self {
        DomeArgs {
            dome_type: DomeType::Isotensoid,
            r_polar_opening: 20.0,
            length_by_r: 0.5,
            conical: ConicalShape::default(),
            contour: None,
            contour_file: None,
        }
    }
}

pub fn get_default_options() -> DesignArgs {
    DesignArgs {
        winding_or_metal: WindingOrMetal::Winding,

        // liner geometry (mm)
        dcyl: 400.0,
        lcyl: None,
        lcyl_by_r: None,
        volume: None,
        min_cylindrical_length: 50.0,
        dome: DomeArgs::default(),
        dome2: None,
        every_nth: 1,
        dome_points: 50,
        liner_thickness: 3.0,
        liner_density: 0.95, // HDPE

        // pressures are resolved into the burst pressure by the builder
        pressure: None,
        pressure_hydrostatic: None,
        safety_factor: None,
        valve_release_factor: None,
        burst_pressure: None,

        h2_mass: None,
        temperature: 288.15,
        max_fill: 1.0,

        material: DEFAULT_MATERIAL.to_string(),
        material_file: None,
        helical_ply_thickness: 0.125,
        hoop_ply_thickness: 0.125,
        roving_width_helical: 3.175,
        roving_width_hoop: 3.175,
        rovings_helical: 4,
        rovings_hoop: 4,
        tex: 446.0,
        fibre_density: Some(1.78),
        friction: 0.0,

        use_fibre_failure: true,
        max_layers: 100,
        rel_radius_hoop_layer_end: 0.95,
        weights: DEFAULT_WEIGHTS,
        hoop_or_helical_fac: 1.0,
        do_hoop_opt: true,
        use_global_search: true,
        optimiser_seed: 1,
        max_helical_angle: copv::design::MAX_HELICAL_ANGLE,
        hoop_shift_cap: copv::design::HOOP_SHIFT_CAP,
        initial_stack: vec![],
        resume: None,

        metal: "alu6061T6".to_string(),

        out_dir: ".".to_string(),
        plots: false,
        output: TerminatingOutput::None,
        verbosity: Verbosity::Terse,
    }
}
