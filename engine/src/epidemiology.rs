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

use std::time::Instant;

use chrono::NaiveDate;

use crate::ecosystem::Ecosystem;
use crate::error::SimError;
use crate::listeners::listener::{Listener, Listeners};
use crate::measures::{MeasuresEngine, MutationSchedule, VaccinationSchedule};
use crate::models::custom_types::Day;
use crate::person::Status;

pub const DATE_FORMAT: &str = "%-d/%-m/%Y";

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub simulation_period: Day,
    pub warmup_period: i32,
    pub starting_infections: usize,
    pub deterministic_warmup: bool,
}

/// The day-loop driver: warm-up, then the dated main loop with measures,
/// vaccinations and mutations applied ahead of each tick.
pub struct Epidemiology {
    pub ecosystem: Ecosystem,
}

impl Epidemiology {
    pub fn new(ecosystem: Ecosystem) -> Epidemiology {
        Epidemiology { ecosystem }
    }

    pub fn run(
        &mut self,
        config: &RunConfig,
        measures: &mut MeasuresEngine,
        vaccinations: &VaccinationSchedule,
        mutations: &mut MutationSchedule,
        listeners: &mut Listeners,
    ) -> Result<(), SimError> {
        let start_time = Instant::now();
        let e = &mut self.ecosystem;
        if e.population() == 0 {
            return Err(SimError::InvalidInput("no agents in the simulation".to_string()));
        }

        e.set_start_date(config.start_date, config.warmup_period);
        e.add_infections(config.starting_infections, Status::Exposed);

        e.shared.deterministic = config.deterministic_warmup;
        for _ in 0..config.warmup_period {
            e.evolve();
            debug!("warm-up, t {}", e.shared.time);
        }
        e.shared.deterministic = false;

        for day in 0..config.simulation_period {
            measures.enact(e, listeners)?;
            vaccinations.enact(e);
            mutations.advance(e);
            e.evolve();

            let counts = e.counts();
            let date = e.shared.date_string(DATE_FORMAT);
            listeners.counts_updated(&counts, &date);

            if day > 0 && day % 100 == 0 {
                info!(
                    "throughput: {:.1} days/sec; day {} of {}",
                    day as f32 / start_time.elapsed().as_secs_f32(),
                    day,
                    config.simulation_period
                );
                counts.log();
            }
        }

        let elapsed = start_time.elapsed().as_secs_f32();
        info!(
            "simulation complete: {} days in {:.1} seconds ({:.1} days/sec)",
            config.simulation_period,
            elapsed,
            config.simulation_period as f32 / elapsed
        );
        for worker in self.ecosystem.workers.iter_mut() {
            worker.events.flush();
        }
        listeners.simulation_ended();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingTypes;
    use crate::disease::Disease;
    use crate::listeners::csv_service::CsvListener;
    use crate::needs::Needs;

    fn dormant_ecosystem(houses: usize) -> Ecosystem {
        let types = BuildingTypes::standard();
        let mut row = vec![0.0; types.len()];
        row[0] = 120.0; // park
        row[3] = 2400.0; // office
        let needs = Needs::from_rows(&types, vec![row]).unwrap();
        let mut disease = Disease::new(0.0, 30.0, 60.0, 60.0, 60.0, 60.0, -1.0, 0.0);
        disease.add_hospitalisation_chances(&[(0.0, 0.0), (90.0, 0.0)]).unwrap();
        disease.add_mortality_chances(&[(0.0, 0.0), (90.0, 0.0)]).unwrap();
        let mut e =
            Ecosystem::new(types, needs, disease, vec![1.0 / 91.0; 91], 30, 1, 99, None).unwrap();
        e.shared.add_location(1, 0.0, 0.0, 5000.0);
        e.shared.add_location(0, 1.0, 0.0, 500.0);
        e.shared.add_location(3, 2.0, 0.0, 1600.0);
        e.shared.household_size = 1.0;
        let coords: Vec<(f64, f64)> = (0..houses).map(|k| (k as f64, 0.0)).collect();
        e.build_population(&coords, 1);
        e.update_nearest_locations().unwrap();
        e
    }

    #[test]
    fn should_run_a_dormant_epidemic_end_to_end() {
        let mut epidemiology = Epidemiology::new(dormant_ecosystem(100));
        assert_eq!(epidemiology.ecosystem.population(), 100);

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("out.csv").to_string_lossy().to_string();
        let boxed: Vec<Box<dyn Listener>> =
            vec![Box::new(CsvListener::new(csv_path.clone()).unwrap())];
        let mut listeners = Listeners::from(boxed);

        let config = RunConfig {
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            simulation_period: 10,
            warmup_period: 0,
            starting_infections: 10,
            deterministic_warmup: false,
        };
        let mut measures = MeasuresEngine::new(crate::measures::MeasuresSchedule::empty());
        let vaccinations = VaccinationSchedule::empty();
        let mut mutations = MutationSchedule::empty();
        epidemiology
            .run(&config, &mut measures, &vaccinations, &mut mutations, &mut listeners)
            .unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 11, "header plus one row per day");
        for line in &lines[1..] {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields[2], "90", "susceptible count must not move");
            assert_eq!(fields[6], "0", "nobody dies in a dormant epidemic");
            assert_eq!(fields[9], "0", "no hospitalisations");
        }
        // the ten seeds stay in circulation
        let last: Vec<&str> = lines[10].split(',').collect();
        let exposed: i64 = last[3].parse().unwrap();
        let infectious: i64 = last[4].parse().unwrap();
        assert_eq!(exposed + infectious, 10);
    }

    #[test]
    fn should_reject_an_empty_population() {
        let mut epidemiology = Epidemiology::new(dormant_ecosystem(0));
        let config = RunConfig {
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            simulation_period: 1,
            warmup_period: 0,
            starting_infections: 0,
            deterministic_warmup: false,
        };
        let mut measures = MeasuresEngine::new(crate::measures::MeasuresSchedule::empty());
        let vaccinations = VaccinationSchedule::empty();
        let mut mutations = MutationSchedule::empty();
        let mut listeners = Listeners::from(vec![]);
        assert!(epidemiology
            .run(&config, &mut measures, &vaccinations, &mut mutations, &mut listeners)
            .is_err());
    }

    #[test]
    fn should_keep_the_census_identity_through_an_epidemic() {
        // a live epidemic with certain hospitalisation and certain death
        let types = BuildingTypes::standard();
        let mut row = vec![0.0; types.len()];
        row[2] = 420.0; // daily supermarket visits
        let needs = Needs::from_rows(&types, vec![row]).unwrap();
        let mut disease = Disease::new(0.5, 2.0, 4.0, 4.0, 4.0, 4.0, -1.0, 0.0);
        disease.add_hospitalisation_chances(&[(0.0, 0.6), (90.0, 0.6)]).unwrap();
        disease.add_mortality_chances(&[(0.0, 0.3), (90.0, 0.3)]).unwrap();
        let mut e =
            Ecosystem::new(types, needs, disease, vec![1.0 / 91.0; 91], 60, 2, 31, None).unwrap();
        e.shared.add_location(1, 0.0, 0.0, 6000.0);
        e.shared.add_location(2, 1.0, 0.0, 100.0);
        e.shared.household_size = 3.0;
        let coords: Vec<(f64, f64)> = (0..40).map(|k| (k as f64, 0.0)).collect();
        e.build_population(&coords, 1);
        e.update_nearest_locations().unwrap();
        let population = e.population() as i64;
        e.add_infections(8, Status::Infectious);

        let mut dead_before = 0;
        for _ in 0..60 {
            e.evolve();
            let stats = e.shared.global_stats;
            assert_eq!(stats.iter().sum::<i64>(), population, "conservation");
            assert!(stats[Status::Dead.index()] >= dead_before, "no resurrection");
            dead_before = stats[Status::Dead.index()];
            let flagged: i64 = e
                .workers
                .iter()
                .map(|w| w.people.iter().filter(|p| p.hospitalised).count() as i64)
                .sum();
            assert_eq!(flagged, e.shared.num_hospitalised, "hospital census identity");
        }
        assert!(dead_before > 0, "with certain mortality someone must die");
    }
}
