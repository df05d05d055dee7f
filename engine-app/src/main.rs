/*
 * Episim
 * Copyright (c) 2026  The Episim Developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use std::fs;
use std::path::Path;
use std::process;

use chrono::NaiveDate;
use clap::Parser;
use log::{error, info, warn};

use episim::buildings::BuildingTypes;
use episim::ecosystem::Ecosystem;
use episim::epidemiology::{Epidemiology, RunConfig};
use episim::error::SimError;
use episim::listeners::csv_service::CsvListener;
use episim::listeners::intervention_reporter::InterventionReporter;
use episim::listeners::listener::Listeners;
use episim::measures::{MeasuresEngine, MutationSchedule, VaccinationSchedule};
use episim::readers::{
    read_age_csv, read_building_csv, read_cases_csv, read_disease_yml, read_measures_yml,
    read_needs_csv, read_vaccinations_yml, BuildingIngestConfig,
};
use episim::utils::RandomWrapper;

#[derive(Parser)]
#[command(author, version, about = "Building-scale epidemic simulation kernel")]
struct Args {
    #[arg(long, help = "Region name; selects the buildings CSV and the age column")]
    location: String,

    #[arg(long, default_value = "1/3/2020", help = "First simulated day (d/m/Y)")]
    start_date: String,

    #[arg(long, default_value_t = 180, help = "Number of simulated days after warm-up")]
    simulation_period: i32,

    #[arg(long, default_value_t = 30, help = "Warm-up days before the start date")]
    warmup_period: i32,

    #[arg(long, default_value = "covid_data")]
    data_dir: String,

    #[arg(long, default_value = ".")]
    output_dir: String,

    #[arg(long, default_value = "measures", help = "Measures YAML name inside data_dir")]
    measures_yml: String,

    #[arg(long, default_value = "disease_covid19", help = "Disease YAML name inside data_dir")]
    disease_yml: String,

    #[arg(long, default_value = "vaccinations", help = "Vaccinations YAML name inside data_dir")]
    vaccinations_yml: String,

    #[arg(long, default_value = "1")]
    #[arg(help = "Initial infections: an absolute count, or a ratio of the population \
                  when the literal starts with '0'")]
    starting_infections: String,

    #[arg(long, default_value_t = 2.6, help = "Mean household size")]
    household_size: f64,

    #[arg(long, default_value_t = 2, help = "Households represented by each placed house")]
    house_ratio: usize,

    #[arg(short, long, default_value_t = false)]
    #[arg(help = "Set house_ratio to 100 to do quicker (but less accurate) runs for populous regions")]
    quicktest: bool,

    #[arg(long, default_value_t = false, help = "Write the main series to out.csv")]
    generic_outfile: bool,

    #[arg(long, default_value_t = 0.625)]
    #[arg(help = "Out-of-house contact ratio for case-isolated patients relative to the default rate")]
    ci_multiplier: f64,

    #[arg(short, long, default_value_t = 1, help = "Number of parallel workers")]
    workers: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = false, help = "Write nearest_locations.csv and exit")]
    dump_nearest: bool,

    #[arg(long, default_value_t = false, help = "Write locations_0.csv before the run")]
    dump_locations: bool,

    #[arg(long, default_value_t = false, help = "Log per-tick exposure totals")]
    debug: bool,

    #[arg(long, default_value_t = false)]
    #[arg(help = "Use deterministic visit admission during warm-up (single worker only)")]
    deterministic_warmup: bool,
}

fn parse_starting_infections(text: &str, population: usize) -> Result<usize, SimError> {
    let text = text.trim();
    let parse_error = || {
        SimError::InvalidInput(format!("'{}' is not a valid starting-infections value", text))
    };
    if text.starts_with('0') {
        let ratio: f64 = text.parse().map_err(|_| parse_error())?;
        Ok((ratio * population as f64).round() as usize)
    } else {
        text.parse::<usize>().map_err(|_| parse_error())
    }
}

fn run(args: Args) -> Result<(), SimError> {
    let house_ratio = if args.quicktest { 100 } else { args.house_ratio };
    let data_dir = Path::new(&args.data_dir);
    let output_dir = Path::new(&args.output_dir);
    fs::create_dir_all(output_dir)?;
    let start_date = NaiveDate::parse_from_str(&args.start_date, "%d/%m/%Y").map_err(|_| {
        SimError::InvalidInput(format!("'{}' is not a d/m/Y start date", args.start_date))
    })?;

    let types = BuildingTypes::from_yml(&data_dir.join("building_types_map.yml"))?;
    let ages = read_age_csv(&data_dir.join("age-distr.csv"), &args.location)?;
    let disease = read_disease_yml(&data_dir.join(format!("{}.yml", args.disease_yml)))?;
    let needs = read_needs_csv(&data_dir.join("needs.csv"), &types)?;

    let mut ecosystem = Ecosystem::new(
        types,
        needs,
        disease,
        ages,
        args.simulation_period,
        args.workers,
        args.seed,
        Some(output_dir),
    )?;
    ecosystem.shared.ci_multiplier = args.ci_multiplier;
    ecosystem.shared.household_size = args.household_size;
    ecosystem.shared.debug_mode = args.debug;

    // offices are synthesised from one dedicated stream so every worker sees
    // an identical registry
    let mut ingest_rng = RandomWrapper::seeded(args.seed);
    read_building_csv(
        &mut ecosystem,
        &data_dir.join(format!("{}_buildings.csv", args.location)),
        &BuildingIngestConfig {
            house_ratio,
            offices_log: Some(output_dir.join("offices.csv")),
            ..BuildingIngestConfig::default()
        },
        &mut ingest_rng,
    )?;

    ecosystem.update_nearest_locations()?;
    if args.dump_nearest {
        let cache = output_dir.join("nearest_locations.csv");
        ecosystem.dump_nearest_csv(&cache)?;
        info!("nearest locations written to {}", cache.display());
        return Ok(());
    }
    if args.dump_locations {
        ecosystem.dump_locations(&output_dir.join("locations_0.csv"))?;
    }

    let cases_path = data_dir.join(format!("{}_cases.csv", args.location));
    if cases_path.exists() {
        read_cases_csv(&mut ecosystem, &cases_path, start_date, "%m/%d/%Y")?;
    } else {
        info!("no case data at {}; skipping admissions replay", cases_path.display());
    }

    let measures = read_measures_yml(&data_dir.join(format!("{}.yml", args.measures_yml)))?;
    let vaccinations_path = data_dir.join(format!("{}.yml", args.vaccinations_yml));
    let vaccinations = if vaccinations_path.exists() {
        read_vaccinations_yml(&vaccinations_path, ecosystem.shared.disease.immunity_duration)?
    } else {
        warn!("no vaccination schedule at {}", vaccinations_path.display());
        VaccinationSchedule::empty()
    };
    ecosystem.shared.vaccine_effect_time = vaccinations.vaccine_effect_time;
    let mutations_path = data_dir.join("mutations.yml");
    let mut mutations = if mutations_path.exists() {
        episim::readers::read_mutations_yml(&mutations_path)?
    } else {
        MutationSchedule::empty()
    };

    let population = ecosystem.population();
    let starting_infections = parse_starting_infections(&args.starting_infections, population)?;
    info!(
        "{}: population {}, {} initial infections, {} workers",
        args.location, population, starting_infections, args.workers
    );

    let outfile = if args.generic_outfile {
        output_dir.join("out.csv")
    } else {
        output_dir.join(format!("{}-{}.csv", args.location, args.simulation_period))
    };
    let report = output_dir.join(format!(
        "{}_interventions.json",
        outfile.file_stem().and_then(|s| s.to_str()).unwrap_or("out")
    ));
    let listeners_vec: Vec<Box<dyn episim::listeners::listener::Listener>> = vec![
        Box::new(CsvListener::new(outfile.to_string_lossy().to_string())?),
        Box::new(InterventionReporter::new(report.to_string_lossy().to_string())),
    ];
    let mut listeners = Listeners::from(listeners_vec);

    let config = RunConfig {
        start_date,
        simulation_period: args.simulation_period,
        warmup_period: args.warmup_period,
        starting_infections,
        deterministic_warmup: args.deterministic_warmup,
    };
    let mut measures_engine = MeasuresEngine::new(measures);
    let mut epidemiology = Epidemiology::new(ecosystem);
    epidemiology.run(&config, &mut measures_engine, &vaccinations, &mut mutations, &mut listeners)?;
    info!("output written to {}", outfile.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("fatal: {}", e);
        eprintln!("fatal: {}", e);
        process::exit(1);
    }
}
