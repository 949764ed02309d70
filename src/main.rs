/// copvdesign
///
/// A program for the layer by layer winding design of composite
/// overwrapped pressure vessels for hydrogen storage.
///
/// The program builds a liner from the command line options, then adds
/// one ply at a time until the Puck exposure of the whole laminate at
/// burst pressure stays below one. The winding and structural
/// calculations are done through the associated **copv** library; the
/// main program only turns the command line flags into the
/// **DesignArgs** data structure, builds the library objects from it and
/// writes the run directory.
///
/// Think of the program flow as
///
/// 1. Read in the options
/// 2. Build the liner and resolve the burst pressure
/// 3. Design the laminate, or size a metal tank
/// 4. Evaluate the final vessel
/// 5. Write out the requested output

#[macro_use]
extern crate clap;
extern crate copv;
extern crate env_logger;
extern crate log;

use std::path::Path;
use std::process;

use copv::contour::Liner;
use copv::error::{DesignError, DesignResult};
use copv::io::{create_run_dir, write_report};
use copv::metal::size_metal_tank;
use copv::results::{metal_entries, summarise, write_artifacts};
use copv::COMMENT;
use log::error;
use options::{builder, clap::get_options_clap, DesignArgs, TerminatingOutput, Verbosity, WindingOrMetal};

mod list;
mod options;

fn main() {
    env_logger::init();

    let mut options = options::get_default_options();
    get_options_clap("", &mut options);
    println!("{}copvdesign: version {}", COMMENT, crate_version!());
    println!("{}", COMMENT);

    // Check if we're just running to output data
    if options.output == TerminatingOutput::List {
        list::print_list();
        process::exit(0);
    }

    let liner = builder::geometry::get_liner(&mut options).unwrap_or_else(|why| exit_with(&why));
    let burst_pressure =
        builder::geometry::get_burst_pressure(&mut options).unwrap_or_else(|why| exit_with(&why));

    if options.verbosity == Verbosity::Verbose {
        println!("{}Options: ", COMMENT);
        print!("{}", options);
    }

    let run_dir = create_run_dir(Path::new(&options.out_dir)).unwrap_or_else(|why| exit_with(&why));
    println!("{}Run directory: {}", COMMENT, run_dir.display());

    let results = match options.winding_or_metal {
        WindingOrMetal::Metal => size_metal(&options, &liner, burst_pressure),
        WindingOrMetal::Winding => design_vessel(&options, &liner, burst_pressure, &run_dir),
    };
    let results = results.unwrap_or_else(|why| exit_with(&why));

    for (key, value) in &results {
        println!("{}{}: {}", COMMENT, key, value);
    }

    let mut report = options.report_entries();
    report.extend(results);
    if let Err(why) = write_report(&run_dir.join("all_parameters_and_results.txt"), &report) {
        exit_with(&why);
    }
}

/// Configuration and geometry problems end with 1, a failed design with 2.
fn exit_with(why: &DesignError) -> ! {
    error!("Error: {}", why);
    if why.is_configuration() {
        process::exit(1)
    } else {
        process::exit(2)
    }
}

fn design_vessel(
    options: &DesignArgs,
    liner: &Liner,
    burst_pressure: f64,
    run_dir: &Path,
) -> DesignResult<Vec<(String, String)>> {
    let mut design = builder::design::get_design(options, liner, burst_pressure, Some(run_dir.to_path_buf()))?;

    println!(
        "{}Now starting the layer design at a burst pressure of {} MPa ...",
        COMMENT, burst_pressure
    );
    let outcome = design.run()?;
    println!("{}...finished after {} iterations.", COMMENT, outcome.iterations);
    if !outcome.converged {
        println!(
            "{}Warning: the layer budget is exhausted, the laminate still fails with {:.4}",
            COMMENT, outcome.puck_max
        );
    }

    let (results, field) = summarise(&design, liner, &builder::design::get_result_inputs(options))?;
    write_artifacts(run_dir, &design, &field, liner, options.plots)?;

    let mut entries = vec![
        ("converged".to_string(), outcome.converged.to_string()),
        ("iterations".to_string(), outcome.iterations.to_string()),
        ("anglesShifts".to_string(), format!("{:?}", outcome.angles_shifts)),
    ];
    entries.extend(results.entries());
    Ok(entries)
}

fn size_metal(options: &DesignArgs, liner: &Liner, burst_pressure: f64) -> DesignResult<Vec<(String, String)>> {
    let metal = builder::design::get_metal(options)?;
    println!("{}Sizing a {} tank for {} MPa", COMMENT, metal.name, burst_pressure);
    let tank = size_metal_tank(liner, &metal, burst_pressure, options.dome_points)?;
    let hydrogen = builder::design::get_result_inputs(options).hydrogen.mass(tank.inner_volume)?;
    Ok(metal_entries(&tank, hydrogen))
}
