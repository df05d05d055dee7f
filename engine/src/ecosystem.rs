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

use std::path::Path;

use chrono::{Duration, Datelike, NaiveDate};
use fxhash::FxHashMap;
use rayon::prelude::*;

use crate::buildings::BuildingTypes;
use crate::disease::Disease;
use crate::error::SimError;
use crate::listeners::event_logger::EventLog;
use crate::location::{LocationId, LocationRegistry};
use crate::models::constants;
use crate::models::custom_types::Day;
use crate::models::events::Counts;
use crate::needs::Needs;
use crate::person::Status;
use crate::utils::{calc_dist, RandomWrapper};
use crate::worker::Worker;

/// Broadcast-replicated state: every worker reads the same copy during a
/// tick, and interventions recompute it identically between ticks.
pub struct SharedState {
    pub time: Day,
    pub date: NaiveDate,
    pub types: BuildingTypes,
    pub needs: Needs,
    pub disease: Disease,
    pub locations: LocationRegistry,
    /// Exposure minutes per location, summed across workers (collective 1).
    pub loc_inf_minutes: Vec<f64>,
    pub seasonal_effect: f64,
    pub contact_rate_multiplier: Vec<f64>,
    pub contact_rate_multiplier_house: f64,
    pub self_isolation_multiplier: f64,
    pub household_isolation_multiplier: f64,
    pub track_trace_multiplier: f64,
    pub ci_multiplier: f64,
    pub traffic_multiplier: f64,
    pub external_travel_multiplier: f64,
    pub external_infection_ratio: f64,
    pub hospital_protection_factor: f64,
    pub enforce_masks_on_transport: bool,
    pub keyworker_fraction: f64,
    pub work_from_home_compliance: f64,
    /// Category index -> day the closure takes effect.
    pub closures: FxHashMap<usize, Day>,
    pub vaccinations_available: i64,
    pub vaccinations_age_limit: u32,
    pub vaccinations_legal_age_limit: u32,
    pub vac_no_symptoms: f64,
    pub vac_no_transmission: f64,
    pub vac_duration: f64,
    pub vaccine_effect_time: i64,
    /// Status counts after the end-of-tick reduction (collective 2).
    pub global_stats: [i64; 6],
    pub num_hospitalised: i64,
    pub infections_today: i64,
    pub hospitalisations_today: i64,
    pub deaths_today: i64,
    pub recoveries_today: i64,
    pub vaccinations_today: i64,
    /// Reference admissions per day, reported alongside the simulated series.
    pub validation: Vec<f64>,
    pub deterministic: bool,
    pub debug_mode: bool,
    pub ages: Vec<f64>,
    pub household_size: f64,
}

impl SharedState {
    pub fn new(
        types: BuildingTypes,
        needs: Needs,
        disease: Disease,
        ages: Vec<f64>,
        duration: Day,
    ) -> SharedState {
        let num_categories = types.len();
        SharedState {
            time: 0,
            date: NaiveDate::from_ymd_opt(2020, 3, 1).expect("valid default date"),
            locations: LocationRegistry::new(num_categories),
            loc_inf_minutes: Vec::new(),
            seasonal_effect: 1.0,
            contact_rate_multiplier: vec![1.0; num_categories],
            contact_rate_multiplier_house: 1.0,
            self_isolation_multiplier: 1.0,
            household_isolation_multiplier: 1.0,
            track_trace_multiplier: 1.0,
            ci_multiplier: 0.625,
            traffic_multiplier: 1.0,
            external_travel_multiplier: 1.0,
            external_infection_ratio: 0.5,
            hospital_protection_factor: 0.2,
            enforce_masks_on_transport: false,
            keyworker_fraction: 0.2,
            work_from_home_compliance: 0.0,
            closures: FxHashMap::default(),
            vaccinations_available: 0,
            vaccinations_age_limit: 70,
            vaccinations_legal_age_limit: 16,
            vac_no_symptoms: 1.0,
            vac_no_transmission: 1.0,
            vac_duration: -1.0,
            vaccine_effect_time: 14,
            global_stats: [0; 6],
            num_hospitalised: 0,
            infections_today: 0,
            hospitalisations_today: 0,
            deaths_today: 0,
            recoveries_today: 0,
            vaccinations_today: 0,
            validation: vec![0.0; (duration.max(0) as usize) + 1],
            deterministic: false,
            debug_mode: false,
            types,
            needs,
            disease,
            ages,
            household_size: 2.6,
        }
    }

    pub fn add_location(&mut self, category: usize, x: f64, y: f64, sqm: f64) -> LocationId {
        let id = self.locations.add(&self.types, category, x, y, sqm);
        self.loc_inf_minutes.push(0.0);
        id
    }

    pub fn is_closed(&self, category: usize) -> bool {
        self.closures.get(&category).map_or(false, |&effective| effective <= self.time)
    }

    pub fn date_string(&self, format: &str) -> String {
        self.date.format(format).to_string()
    }

    pub fn live_population(&self) -> i64 {
        self.global_stats.iter().sum::<i64>() - self.global_stats[Status::Dead.index()]
    }

    pub fn find_hospital(&self, rng: &mut RandomWrapper) -> LocationId {
        self.locations.find_hospital(&self.types, rng)
    }

    fn update_seasonal_effect(&mut self) {
        self.seasonal_effect = constants::SEASONAL_MULTIPLIERS[self.date.month0() as usize];
    }
}

/// Per-rider infection probability on public transport: 30 minutes of travel
/// in a 1 m2-per-rider vehicle over a 15-hour service day.
pub fn transport_infection_probability(
    traffic_multiplier: f64,
    masks_on_transport: bool,
    infection_rate: f64,
    infectious: i64,
    live_population: i64,
    external_infection_ratio: f64,
    external_travel_multiplier: f64,
) -> f64 {
    if live_population <= 0 {
        return 0.0;
    }
    let external_passengers =
        live_population as f64 * external_infection_ratio * external_travel_multiplier;
    let mut probability = traffic_multiplier;
    if masks_on_transport {
        probability *= constants::TRANSPORT_MASK_FACTOR;
    }
    probability *= infection_rate;
    probability *= constants::TRANSPORT_MINUTES_PER_DAY / constants::MINUTES_PER_DAY;
    probability *= (infectious as f64 + external_passengers) / live_population as f64;
    probability *= constants::TRANSPORT_MINUTES_PER_DAY / constants::TRANSPORT_SERVICE_MINUTES;
    probability
}

fn reduce_exposure(workers: &[Worker], slots: usize) -> Vec<f64> {
    let mut total = vec![0.0; slots];
    for worker in workers {
        for (slot, minutes) in worker.ledger.loc_inf_minutes.iter().enumerate() {
            total[slot] += minutes;
        }
    }
    total
}

fn reduce_statuses(workers: &[Worker]) -> [i64; 6] {
    let mut total = [0i64; 6];
    for worker in workers {
        let counts = worker.status_counts();
        for (slot, count) in counts.iter().enumerate() {
            total[slot] += count;
        }
    }
    total
}

/// The whole simulated region: the replicated state plus one shared-nothing
/// partition per worker.
pub struct Ecosystem {
    pub shared: SharedState,
    pub workers: Vec<Worker>,
}

impl Ecosystem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        types: BuildingTypes,
        needs: Needs,
        disease: Disease,
        ages: Vec<f64>,
        duration: Day,
        num_workers: usize,
        seed: u64,
        log_dir: Option<&Path>,
    ) -> Result<Ecosystem, SimError> {
        let shared = SharedState::new(types, needs, disease, ages, duration);
        let mut workers = Vec::with_capacity(num_workers.max(1));
        for rank in 0..num_workers.max(1) {
            let events = match log_dir {
                Some(dir) => EventLog::new(dir, rank)?,
                None => EventLog::disabled(),
            };
            workers.push(Worker::new(rank, seed, events));
        }
        Ok(Ecosystem { shared, workers })
    }

    pub fn set_start_date(&mut self, start: NaiveDate, warmup_days: i32) {
        self.shared.time = -warmup_days;
        self.shared.date = start - Duration::days(i64::from(warmup_days));
    }

    /// Distribute houses across workers by block layout; each worker then
    /// instantiates its own households and agents from its own stream.
    pub fn build_population(&mut self, house_coords: &[(f64, f64)], households_per_house: usize) {
        let num_houses = house_coords.len();
        let num_workers = self.workers.len();
        let mut start = 0;
        for (rank, worker) in self.workers.iter_mut().enumerate() {
            let size = num_houses / num_workers + usize::from(rank < num_houses % num_workers);
            for &(x, y) in &house_coords[start..start + size] {
                worker.add_house(
                    x,
                    y,
                    households_per_house,
                    self.shared.household_size,
                    &self.shared.ages,
                );
            }
            start += size;
        }
        info!(
            "population built: {} houses, {} agents across {} workers",
            num_houses,
            self.population(),
            num_workers
        );
    }

    pub fn population(&self) -> usize {
        self.workers.iter().map(|w| w.population()).sum()
    }

    pub fn update_nearest_locations(&mut self) -> Result<(), SimError> {
        let Ecosystem { shared, workers } = self;
        let types = &shared.types;
        let locations = &shared.locations;
        workers.par_iter_mut().try_for_each(|worker| worker.find_nearest(types, locations))?;
        let houses: usize = workers.iter().map(|w| w.houses.len()).sum();
        info!("nearest locations resolved for {} houses", houses);
        Ok(())
    }

    /// One row per house, one column per category; cells hold the shortlist
    /// as `;`-joined indices into that category's location list.
    pub fn dump_nearest_csv(&self, path: &Path) -> Result<(), SimError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.shared.types.names())?;
        for worker in &self.workers {
            for house in &worker.houses {
                let row: Vec<String> = house
                    .nearest_locations
                    .iter()
                    .map(|shortlist| {
                        shortlist
                            .iter()
                            .map(|i| i.to_string())
                            .collect::<Vec<_>>()
                            .join(";")
                    })
                    .collect();
                writer.write_record(&row)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_nearest_csv(&mut self, path: &Path) -> Result<(), SimError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let columns: Vec<usize> = headers
            .iter()
            .map(|name| {
                self.shared.types.index_of(name).ok_or_else(|| {
                    SimError::InvalidInput(format!(
                        "nearest-locations file references unknown category '{}'",
                        name
                    ))
                })
            })
            .collect::<Result<_, _>>()?;
        let num_categories = self.shared.types.len();
        let mut records = reader.records();
        for worker in self.workers.iter_mut() {
            let rank = worker.rank;
            for (house_row, house) in worker.houses.iter_mut().enumerate() {
                let record = records
                    .next()
                    .ok_or_else(|| {
                        SimError::InvalidInput(format!(
                            "nearest-locations file is short: no row for house {} of rank {}",
                            house_row, rank
                        ))
                    })??;
                let mut nearest = vec![Vec::new(); num_categories];
                for (cell, &category) in record.iter().zip(columns.iter()) {
                    if cell.is_empty() {
                        continue;
                    }
                    let mut shortlist = Vec::new();
                    for token in cell.split(';') {
                        let index: usize = token.parse().map_err(|_| {
                            SimError::InvalidInput(format!(
                                "nearest-locations cell '{}' is not an index list",
                                cell
                            ))
                        })?;
                        if index >= self.shared.locations.category(category).len() {
                            return Err(SimError::InvalidInput(format!(
                                "nearest-locations index {} out of range for category '{}'",
                                index,
                                self.shared.types.name(category)
                            )));
                        }
                        shortlist.push(index);
                    }
                    nearest[category] = shortlist;
                }
                house.nearest_locations = nearest;
            }
        }
        Ok(())
    }

    pub fn dump_locations(&self, path: &Path) -> Result<(), SimError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&["type", "x", "y", "sqm"])?;
        for (category, locations) in self.shared.locations.iter() {
            for location in locations {
                writer.write_record(&[
                    self.shared.types.name(category).to_string(),
                    location.x.to_string(),
                    location.y.to_string(),
                    location.sqm.to_string(),
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Randomly pre-seed infections, split across workers the way the house
    /// list is.
    pub fn add_infections(&mut self, num: usize, severity: Status) {
        let num_workers = self.workers.len();
        let Ecosystem { shared, workers } = self;
        for worker in workers.iter_mut() {
            let share = num / num_workers + usize::from(num % num_workers > worker.rank);
            worker.seed_infections(shared, share, severity);
        }
        info!("seeded {} infections at t {}", num, shared.time);
    }

    /// Seed an infection into the nearest house holding a susceptible agent
    /// of the given age (admissions replay).
    pub fn add_infection_by_age(&mut self, x: f64, y: f64, age: u32) {
        let age = age.min(crate::disease::MAX_AGE as u32);
        let mut best: Option<(usize, usize, f64)> = None;
        for (worker_index, worker) in self.workers.iter().enumerate() {
            for (house_index, house) in worker.houses.iter().enumerate() {
                let distance = calc_dist(house.x, house.y, x, y);
                if best.map_or(true, |(_, _, d)| distance < d)
                    && house.has_age_susceptible(&worker.households, &worker.people, age)
                {
                    best = Some((worker_index, house_index, distance));
                }
            }
        }
        let (worker_index, house_index) = match best {
            Some((w, h, _)) => (w, h),
            None => {
                warn!("no susceptible agent of age {} found for case seeding", age);
                return;
            }
        };
        let Ecosystem { shared, workers } = self;
        let worker = &mut workers[worker_index];
        let (hx, hy, agent_ids) = {
            let house = &worker.houses[house_index];
            let agent_ids: Vec<usize> = house
                .households
                .iter()
                .flat_map(|&hh| worker.households[hh].agents.iter().copied())
                .collect();
            (house.x, house.y, agent_ids)
        };
        for agent_id in agent_ids {
            if worker.people[agent_id].age == age && worker.people[agent_id].is_susceptible() {
                worker.people[agent_id].infect(
                    shared.time,
                    &shared.disease,
                    Status::Exposed,
                    "house",
                    hx,
                    hy,
                    worker.rank,
                    &mut worker.rng,
                    &mut worker.events,
                );
            }
        }
    }

    pub fn add_validation_point(&mut self, day: Day) {
        let index = day.max(0) as usize;
        if index < self.shared.validation.len() {
            self.shared.validation[index] += 1.0;
        }
    }

    /// Stable per-category assignment of agents to sub-venues (e.g. lecture
    /// halls), overriding the nearest-location rule.
    pub fn make_group(&mut self, category_name: &str, num_groups: usize) -> Result<(), SimError> {
        let category = self.resolve_category(category_name)?;
        if self.shared.locations.category(category).is_empty() {
            return Err(SimError::InvalidInput(format!(
                "cannot group category '{}': no locations of that type",
                category_name
            )));
        }
        self.shared.locations.make_groups(category, num_groups);
        for worker in self.workers.iter_mut() {
            worker.assign_groups(category, num_groups);
        }
        Ok(())
    }

    /// Advance the simulation by one day.
    pub fn evolve(&mut self) {
        if self.shared.deterministic && self.workers.len() > 1 {
            warn!("deterministic visits are unreliable with multiple workers; falling back to stochastic mode");
            self.shared.deterministic = false;
        }
        let slots = self.shared.locations.num_exposure_slots();
        let num_workers = self.workers.len() as i64;
        let budget = self.shared.vaccinations_available;
        let deterministic = self.shared.deterministic;
        let Ecosystem { shared, workers } = self;

        // phase 1: visit planning, condition progression, vaccination
        {
            let e: &SharedState = shared;
            workers.par_iter_mut().for_each(|worker| {
                worker.begin_tick(slots);
                let share = budget / num_workers
                    + i64::from((worker.rank as i64) < budget % num_workers);
                worker.agent_day(e, share, deterministic);
            });
        }

        // collective 1: element-wise sum of the exposure counters
        shared.loc_inf_minutes = reduce_exposure(workers, slots);
        if shared.debug_mode {
            let visit_minutes: f64 = workers.iter().map(|w| w.ledger.visit_minutes).sum();
            let exposure: f64 = shared.loc_inf_minutes.iter().sum();
            debug!(
                "t {}: total visit minutes {}, total exposure minutes {}",
                shared.time, visit_minutes, exposure
            );
        }

        // phase 2: per-location infection draws
        {
            let e: &SharedState = shared;
            workers.par_iter_mut().for_each(|worker| worker.spread_at_locations(e));
        }

        // phase 3: intra-household transmission
        {
            let e: &SharedState = shared;
            workers.par_iter_mut().for_each(|worker| worker.spread_in_households(e));
        }

        // phase 4: public transport, skipped during warm-up
        if shared.time >= 0 {
            shared.global_stats = reduce_statuses(workers);
            let probability = transport_infection_probability(
                shared.traffic_multiplier,
                shared.enforce_masks_on_transport,
                shared.disease.infection_rate,
                shared.global_stats[Status::Infectious.index()],
                shared.live_population(),
                shared.external_infection_ratio,
                shared.external_travel_multiplier,
            );
            let e: &SharedState = shared;
            let transport_infections: u32 = workers
                .par_iter_mut()
                .map(|worker| worker.spread_on_transport(e, probability))
                .sum();
            debug!(
                "transport: t {}, p_inf {:e}, {} infections",
                shared.time, probability, transport_infections
            );
        }

        // advance the calendar
        shared.time += 1;
        shared.date += Duration::days(1);
        shared.update_seasonal_effect();

        // collective 2: global census and daily event counters
        shared.global_stats = reduce_statuses(workers);
        shared.num_hospitalised = workers.iter().map(|w| w.num_hospitalised).sum();
        shared.infections_today =
            workers.iter().map(|w| i64::from(w.events.infections_today)).sum();
        shared.hospitalisations_today =
            workers.iter().map(|w| i64::from(w.events.hospitalisations_today)).sum();
        shared.deaths_today = workers.iter().map(|w| i64::from(w.events.deaths_today)).sum();
        shared.recoveries_today =
            workers.iter().map(|w| i64::from(w.events.recoveries_today)).sum();
        shared.vaccinations_today = workers.iter().map(|w| w.vaccinations_today).sum();
        if shared.debug_mode {
            let base_rate: f64 = workers.iter().map(|w| w.ledger.base_rate_total).sum();
            let loc_evolves: u64 = workers.iter().map(|w| w.ledger.loc_evolves).sum();
            debug!("t {}: summed base rate {}, location evolves {}", shared.time, base_rate, loc_evolves);
        }
    }

    pub fn counts(&self) -> Counts {
        let t = self.shared.time;
        let validation_index = (t.max(0) as usize).min(self.shared.validation.len() - 1);
        Counts::new(
            t,
            self.shared.global_stats,
            self.shared.infections_today,
            self.shared.hospitalisations_today,
            self.shared.num_hospitalised,
            self.shared.validation[validation_index],
        )
    }

    fn resolve_category(&self, name: &str) -> Result<usize, SimError> {
        self.shared.types.index_of(name).ok_or_else(|| {
            SimError::InvalidInput(format!(
                "schedule references location category '{}' which is absent from the registry",
                name
            ))
        })
    }

    // ---- measure primitives -------------------------------------------------

    pub fn initialise_social_distance(&mut self, contact_ratio: f64) {
        for multiplier in self.shared.contact_rate_multiplier.iter_mut() {
            *multiplier = contact_ratio;
        }
        self.shared.contact_rate_multiplier_house = 1.0;
        info!("contact rate multipliers reset to {}", contact_ratio);
    }

    pub fn add_closure(&mut self, category_name: &str, effective_day: Day) -> Result<(), SimError> {
        let category = self.resolve_category(category_name)?;
        self.shared.closures.insert(category, effective_day);
        info!("closure of {} from day {}", category_name, effective_day);
        Ok(())
    }

    pub fn remove_closure(&mut self, category_name: &str) -> Result<(), SimError> {
        let category = self.resolve_category(category_name)?;
        self.shared.closures.remove(&category);
        Ok(())
    }

    pub fn remove_closures(&mut self) {
        self.shared.closures.clear();
    }

    /// Suppress a fraction of a category's visits: school and office flip
    /// per-agent from-home flags, every other category rescales its needs
    /// column. Key workers keep attending school and office.
    pub fn add_partial_closure(
        &mut self,
        category_name: &str,
        fraction: f64,
        exclude_people: bool,
    ) -> Result<(), SimError> {
        let category = self.resolve_category(category_name)?;
        let school = self.shared.types.school == Some(category);
        let office = self.shared.types.office == Some(category);
        let fraction = if school || office {
            fraction.min(1.0 - self.shared.keyworker_fraction)
        } else {
            fraction
        };
        if school && exclude_people {
            for worker in self.workers.iter_mut() {
                worker.flag_school_from_home(fraction);
            }
        } else if office && exclude_people {
            for worker in self.workers.iter_mut() {
                worker.flag_work_from_home(fraction);
            }
        } else {
            self.shared.needs.scale_needs(category, 1.0 - fraction)?;
        }
        info!("partial closure of {} at fraction {}", category_name, fraction);
        Ok(())
    }

    pub fn undo_partial_closure(&mut self, category_name: &str) -> Result<(), SimError> {
        let category = self.resolve_category(category_name)?;
        if self.shared.types.school == Some(category) {
            for worker in self.workers.iter_mut() {
                worker.clear_school_from_home();
            }
        } else if self.shared.types.office == Some(category) {
            for worker in self.workers.iter_mut() {
                worker.clear_work_from_home();
            }
        } else {
            self.shared.needs.restore_category(category);
        }
        Ok(())
    }

    pub fn add_work_from_home(&mut self, compliance: f64) -> Result<(), SimError> {
        self.shared.work_from_home_compliance = compliance;
        self.add_partial_closure("office", compliance, true)?;
        info!("work from home with {} compliance", compliance);
        Ok(())
    }

    /// Social distancing at a target distance with partial compliance; masks
    /// add to the effective distance, with a separate tight-space value for
    /// supermarkets and shopping.
    pub fn add_social_distance(
        &mut self,
        distance: f64,
        compliance: f64,
        mask_uptake: f64,
        mask_uptake_shopping: f64,
    ) {
        let effective_distance = distance + mask_uptake;
        let tight_distance = 1.0 + mask_uptake_shopping;
        let dist_factor = (0.8 / effective_distance).powi(2);
        let dist_factor_tight = (0.8 / tight_distance).powi(2);
        for category in 0..self.shared.types.len() {
            let tight = self.shared.types.supermarket == Some(category)
                || self.shared.types.shopping == Some(category);
            let factor = if tight { dist_factor_tight } else { dist_factor };
            self.shared.contact_rate_multiplier[category] *= factor * compliance + (1.0 - compliance);
        }
        // compensatory indoor contact
        self.shared.contact_rate_multiplier_house = 1.25;
        info!(
            "social distancing at distance {} with compliance {} (mask uptake {})",
            distance, compliance, mask_uptake
        );
    }

    pub fn add_case_isolation(&mut self) {
        self.shared.self_isolation_multiplier =
            self.shared.ci_multiplier * self.shared.track_trace_multiplier;
        info!("case isolation with multiplier {}", self.shared.self_isolation_multiplier);
    }

    pub fn reset_case_isolation(&mut self) {
        self.shared.self_isolation_multiplier = 1.0;
    }

    pub fn add_household_isolation(&mut self, multiplier: f64) {
        self.shared.household_isolation_multiplier = multiplier;
        info!("household isolation with multiplier {}", multiplier);
    }

    pub fn reset_household_isolation(&mut self) {
        self.shared.household_isolation_multiplier = 1.0;
    }

    /// Reset contact rates, closures, the needs table and every per-agent
    /// from-home flag; isolation multipliers are toggled separately.
    pub fn remove_all_measures(&mut self) {
        self.initialise_social_distance(1.0);
        self.remove_closures();
        self.shared.needs.reset();
        for worker in self.workers.iter_mut() {
            worker.clear_school_from_home();
            worker.clear_work_from_home();
        }
    }
}
