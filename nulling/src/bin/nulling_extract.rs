//! Run the maximum-likelihood extraction on a synthetic observation

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use nulling::run_scenario;
use nulling::shared_args::SharedSimulationArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recover an injected planet from synthetic nulling data")]
struct Args {
    #[command(flatten)]
    shared: SharedSimulationArgs,

    /// Also print the cost map of every output
    #[arg(long, default_value_t = false)]
    print_maps: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = args
        .shared
        .load_scenario()
        .context("failed to load scenario")?;
    if args.shared.debug {
        println!("{config:#?}");
    }

    let run = run_scenario(&config, args.shared.noise_level, args.shared.seed)
        .context("extraction pipeline failed")?;
    let extraction = &run.extraction;

    println!(
        "Star '{}': habitable zone centre at {:.3} au",
        config.star.name, run.habitable_zone_au
    );
    println!(
        "Planet '{}' injected at cell {:?}",
        config.planet.name, run.planet_cell
    );

    for output in 0..extraction.number_of_outputs() {
        let Some((row, col)) = extraction.best_position(output) else {
            continue;
        };
        let flux = extraction.optimized_flux[[row, col, output]];
        let cost = extraction.cost_function[[row, col, output]];
        println!("Output {output}: peak at ({row}, {col}), cost {cost:.4e}, summed flux {flux:.4e}");

        if args.print_maps {
            if let Some(map) = extraction.cost_map(output) {
                for map_row in map.rows() {
                    let cells: Vec<String> = map_row.iter().map(|c| format!("{c:10.3e}")).collect();
                    println!("  {}", cells.join(" "));
                }
            }
        }
    }

    if run.recovered(0) {
        println!("Planet recovered at its injected position");
    } else {
        warn!("Output 0 peak does not match the injected planet position");
    }

    let total: f64 = run.planet_spectrum.iter().sum();
    println!("Injected planet flux summed over bins: {total:.4e} photons/s/m^2/um");

    Ok(())
}
