use copv::contour::DomeType;
use copv::material::MATERIALS;
use copv::metal::METALS;

static HIGHLIGHTS: &str =
"    - Layer by layer design of the winding stack of a composite overwrapped
      pressure vessel: every new ply is a hoop or a helical ply, placed by a
      bounded optimisation of a weighted target function
    - Puck fibre failure and inter fibre failure at burst pressure
    - Isotensoid, spherical, ellipsoidal, conical and point wise dome contours,
      symmetric or with two different domes
    - Sizing of the cylindrical length, and if needed the diameter, to a volume
    - Masses, stored hydrogen and gravimetric index of the vessel
    - Thin wall sizing of a metal tank of the same contour for comparison
";

static UNITS: &str =
"Lengths are in mm, pressures and stresses in MPa, densities in g/cm^3,
temperatures in K and masses in kg. Volumes are reported in dm^3. Fibre linear
density (tex) is in g/km. Angles are in degrees measured from the vessel axis,
so a hoop ply has 90 degrees. Hoop shifts are measured along the contour from
the cylinder end, positive towards the polar opening.
";

/// Print the materials, dome types, outputs and file formats.
pub fn print_list() {
    // Files of a run directory
    let output = [
        ("snapshot_NNN.json", "angles and shifts of the laminate after iteration NNN"),
        ("snapshot_partial.json", "last laminate of a run that stopped with an error"),
        ("nodalResults.csv", "mandrel nodes of the bare liner and of the wound vessel"),
        ("elementalResults.csv", "stresses, strains, thickness and exposures per element"),
        ("layerBook.txt", "angle, shifts, thicknesses, polar opening and diameter per layer"),
        ("all_parameters_and_results.txt", "all options of the run and the vessel results"),
        ("targetFunction_NNN.svg", "target values of every trial in iteration NNN (--plots)"),
        ("puckExposure.svg", "exposure of every layer along the contour (--plots)"),
        ("contour.svg", "liner and outer contour of the wound vessel (--plots)"),
    ];

    let domes = [
        ("isotensoid", "geodesic netting dome ending at the polar opening"),
        ("circle", "spherical dome cut at the polar opening"),
        ("ellipse", "ellipsoidal dome, axial half axis from --dome_length_by_r"),
        ("conicalTorispherical", "fillet, cone and elliptical cap, ratios from --conical_shape"),
        ("generic", "dome from --dome_contour or --dome_contour_file"),
    ];

    let formats = [
        (
            "Dome contour files",
"Each line holds the axial position x and the radius r of one contour point,
separated by whitespace. The first point lies on the cylinder, the radius
decreases towards the polar opening. Blank lines and lines starting with '#'
are skipped. With --every_nth N only every N-th point is used, the first and
the last point are always kept.

# x r
0.0 200.0
12.5 199.2
...
",
        ),
        (
            "Material files",
"A composite material is a json object:

{
  \"name\": \"myCFRP\",
  \"E1\": 135000, \"E2\": 8800, \"nu12\": 0.3, \"G12\": 4600,
  \"strength\": {\"R1t\": 2200, \"R1c\": 1300, \"R2t\": 50, \"R2c\": 200, \"R21\": 80},
  \"puck\": {\"p21Plus\": 0.3, \"p21Minus\": 0.25},
  \"fibreDensity\": 1.78,
  \"resinDensity\": 1.17
}

The resin density is optional.
",
        ),
        (
            "Snapshot files",
"A snapshot holds the laminate after one iteration and can be given to
--resume to continue a design:

{
  \"iteration\": 3,
  \"anglesShifts\": [[7.5, 0.0], [90.0, 12.5]],
  \"puckMax\": 1.21,
  \"criterion\": \"FF\",
  \"burstPressure\": 140.0,
  \"converged\": false
}
",
        ),
    ];

    let mut header = Counter::default();

    header.section("Program Highlights");
    print!("{}", HIGHLIGHTS);

    header.section("Units");
    print!("{}", UNITS);

    header.section("Output Files");
    for &(file, descrip) in &output {
        println!("{:32} {}", file, descrip);
    }

    header.section("Dome Types");
    debug_assert_eq!(domes.len(), DomeType::variants().len());
    for &(name, descrip) in &domes {
        println!("{:22} {}", name, descrip);
    }

    header.section("Composite Materials");
    println!(
        "{:20} {:>8} {:>8} {:>6} {:>8} {:>8} {:>8} {:>8}",
        "Name", "E1", "E2", "nu12", "G12", "R1t", "R2t", "rho_f"
    );
    for (name, mat) in MATERIALS.iter() {
        println!(
            "{:20} {:>8} {:>8} {:>6} {:>8} {:>8} {:>8} {:>8}",
            name, mat.e1, mat.e2, mat.nu12, mat.g12, mat.strength.r1t, mat.strength.r2t, mat.fibre_density
        );
    }
    println!(
        "\nA material can also be read from a json file with --material_file FILE."
    );

    header.section("Metals");
    println!("{:20} {:>8} {:>8} {:>8}", "Name", "rho", "Rp0.2", "Rm");
    for (name, metal) in METALS.iter() {
        println!(
            "{:20} {:>8} {:>8} {:>8}",
            name, metal.density, metal.yield_strength, metal.ultimate_strength
        );
    }

    header.section("File formats");

    for &(file, form) in &formats {
        header.subsection(file);
        println!("{}", form);
    }

    println!();
}

/// Numbers the section headers of the listing.
#[derive(Default)]
struct Counter {
    section: usize,
    subsection: usize,
}

impl Counter {
    fn section(&mut self, head: &str) {
        self.section += 1;
        self.subsection = 0;
        let header = format!("{}. {}", self.section, head);
        println!("\n{}\n{}\n", header, "=".repeat(header.len()));
    }

    fn subsection(&mut self, head: &str) {
        self.subsection += 1;
        let header = format!("{}.{}. {}", self.section, self.subsection, head);
        println!("{}\n{}\n", header, "-".repeat(header.len()));
    }
}
