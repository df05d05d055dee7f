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

use fxhash::FxHashMap;
use rand::distributions::{Distribution, WeightedIndex};

use crate::buildings::BuildingTypes;
use crate::ecosystem::SharedState;
use crate::house::House;
use crate::listeners::event_logger::EventLog;
use crate::models::constants;
use crate::person::{Person, Status};
use crate::utils::RandomWrapper;

/// Stable reference into the location registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationId {
    pub category: usize,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct Location {
    pub category: usize,
    pub x: f64,
    pub y: f64,
    pub sqm: f64,
    /// Slot in the per-worker and reduced exposure-minute arrays.
    pub exposure_id: usize,
    pub avg_visit_time: f64,
    is_park: bool,
    is_hospital: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Visit {
    /// Worker-local agent index.
    pub person: usize,
    pub minutes: f64,
}

/// Per-worker slice of the visit pipeline: each worker registers only its own
/// agents' visits; only the exposure counters are summed across workers.
#[derive(Debug, Default)]
pub struct VisitLedger {
    pub visits: Vec<Vec<Visit>>,
    pub loc_inf_minutes: Vec<f64>,
    /// Fractional accumulators for the deterministic warm-up path.
    counters: Vec<f64>,
    pub visit_minutes: f64,
    pub base_rate_total: f64,
    pub loc_evolves: u64,
}

impl VisitLedger {
    pub fn new(slots: usize) -> VisitLedger {
        VisitLedger {
            visits: vec![Vec::new(); slots],
            loc_inf_minutes: vec![0.0; slots],
            counters: vec![0.5; slots],
            visit_minutes: 0.0,
            base_rate_total: 0.0,
            loc_evolves: 0,
        }
    }

    /// Clear the previous day's visits; the deterministic accumulators carry
    /// over between ticks.
    pub fn clear(&mut self, slots: usize) {
        if self.visits.len() != slots {
            *self = VisitLedger::new(slots);
            return;
        }
        for visits in self.visits.iter_mut() {
            visits.clear();
        }
        for minutes in self.loc_inf_minutes.iter_mut() {
            *minutes = 0.0;
        }
        self.visit_minutes = 0.0;
        self.base_rate_total = 0.0;
        self.loc_evolves = 0;
    }

    pub fn total_visits(&self) -> usize {
        self.visits.iter().map(|v| v.len()).sum()
    }
}

impl Location {
    fn new(
        category: usize,
        x: f64,
        y: f64,
        sqm: f64,
        exposure_id: usize,
        types: &BuildingTypes,
    ) -> Location {
        let is_park = types.park == Some(category);
        let sqm = if is_park { sqm * constants::PARK_AREA_MULTIPLIER } else { sqm };
        Location {
            category,
            x,
            y,
            sqm,
            exposure_id,
            avg_visit_time: types.get(category).avg_visit_time,
            is_park,
            is_hospital: types.hospital == Some(category),
        }
    }

    /// Decide whether one agent visits today and book the exposure minutes of
    /// infectious visitors. `need` is the agent's weekly minutes for this
    /// category.
    #[allow(clippy::too_many_arguments)]
    pub fn register_visit(
        &self,
        e: &SharedState,
        ledger: &mut VisitLedger,
        rng: &mut RandomWrapper,
        person_id: usize,
        person: &Person,
        household_infected: bool,
        need: f64,
        deterministic: bool,
    ) {
        let mut visit_time = self.avg_visit_time;
        match person.status {
            Status::Dead => return,
            Status::Infectious => {
                // case isolation
                visit_time *= e.self_isolation_multiplier;
                if self.is_hospital && person.hospitalised {
                    ledger.loc_inf_minutes[self.exposure_id] +=
                        need / 7.0 * e.hospital_protection_factor;
                    return;
                }
            }
            _ => {
                if household_infected {
                    visit_time *= e.household_isolation_multiplier;
                }
            }
        }
        if visit_time <= 0.0 {
            return;
        }
        // weekly minutes / (average visit time * days in the week)
        let visit_probability = (need / (visit_time * 7.0)).min(1.0);
        let admitted = if deterministic {
            self.admit_deterministic(ledger, visit_probability)
        } else {
            rng.chance(visit_probability)
        };
        if admitted {
            ledger.visits[self.exposure_id].push(Visit { person: person_id, minutes: visit_time });
            if person.status == Status::Infectious {
                ledger.loc_inf_minutes[self.exposure_id] += visit_time;
            }
        }
    }

    fn admit_deterministic(&self, ledger: &mut VisitLedger, visit_probability: f64) -> bool {
        let counter = &mut ledger.counters[self.exposure_id];
        *counter += visit_probability;
        if *counter > 1.0 {
            *counter -= 1.0;
            return true;
        }
        false
    }

    /// Dimensionless per-minute infection rate for today's visitors, derived
    /// from the exposure minutes aggregated across all workers.
    pub fn base_rate(&self, e: &SharedState) -> f64 {
        let airflow =
            if self.is_park { constants::AIRFLOW_OUTDOORS } else { constants::AIRFLOW_INDOORS };
        constants::BASELINE_AREA_CORRECTION
            * e.seasonal_effect
            * e.contact_rate_multiplier[self.category]
            * e.disease.infection_rate
            * e.loc_inf_minutes[self.exposure_id]
            / (airflow * constants::MINUTES_PER_DAY * self.sqm * constants::MINUTES_OPENED)
    }

    /// Infect susceptible visitors with probability visit_time * base_rate.
    #[allow(clippy::too_many_arguments)]
    pub fn evolve(
        &self,
        e: &SharedState,
        visits: &[Visit],
        people: &mut [Person],
        houses: &[House],
        rank: usize,
        rng: &mut RandomWrapper,
        events: &mut EventLog,
    ) {
        let base_rate = self.base_rate(e);
        for visit in visits {
            if !people[visit.person].is_susceptible() {
                continue;
            }
            let infection_probability = visit.minutes * base_rate;
            if infection_probability > 0.0 && rng.chance(infection_probability) {
                let home = &houses[people[visit.person].home];
                let (x, y) = (home.x, home.y);
                people[visit.person].infect(
                    e.time,
                    &e.disease,
                    Status::Exposed,
                    e.types.name(self.category),
                    x,
                    y,
                    rank,
                    rng,
                    events,
                );
            }
        }
    }
}

/// All non-residential buildings, grouped by category. Replicated read-only
/// across workers during a tick.
#[derive(Clone, Debug, Default)]
pub struct LocationRegistry {
    categories: Vec<Vec<Location>>,
    num_slots: usize,
    groups: FxHashMap<usize, Vec<LocationId>>,
}

impl LocationRegistry {
    pub fn new(num_categories: usize) -> LocationRegistry {
        LocationRegistry {
            categories: vec![Vec::new(); num_categories],
            num_slots: 0,
            groups: FxHashMap::default(),
        }
    }

    pub fn add(
        &mut self,
        types: &BuildingTypes,
        category: usize,
        x: f64,
        y: f64,
        sqm: f64,
    ) -> LocationId {
        let exposure_id = self.num_slots;
        self.num_slots += 1;
        let index = self.categories[category].len();
        self.categories[category].push(Location::new(category, x, y, sqm, exposure_id, types));
        LocationId { category, index }
    }

    pub fn get(&self, id: LocationId) -> &Location {
        &self.categories[id.category][id.index]
    }

    pub fn category(&self, category: usize) -> &[Location] {
        &self.categories[category]
    }

    pub fn num_exposure_slots(&self) -> usize {
        self.num_slots
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn total_locations(&self) -> usize {
        self.categories.iter().map(|c| c.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Location])> {
        self.categories.iter().enumerate().map(|(category, locs)| (category, locs.as_slice()))
    }

    /// Area-weighted uniform pick among hospitals large enough to admit.
    /// The absence of any such hospital is a configuration fault and aborts.
    pub fn find_hospital(&self, types: &BuildingTypes, rng: &mut RandomWrapper) -> LocationId {
        let category = types
            .hospital
            .unwrap_or_else(|| panic!("no hospital category is defined in the building registry"));
        let candidates: Vec<(usize, f64)> = self.categories[category]
            .iter()
            .enumerate()
            .filter(|(_, l)| l.sqm > constants::MIN_HOSPITAL_SQM)
            .map(|(i, l)| (i, l.sqm))
            .collect();
        if candidates.is_empty() {
            panic!(
                "couldn't find hospitals with more than {} sqm",
                constants::MIN_HOSPITAL_SQM
            );
        }
        let weights = WeightedIndex::new(candidates.iter().map(|(_, sqm)| *sqm))
            .expect("hospital areas must be positive");
        let (index, _) = candidates[weights.sample(rng.get())];
        LocationId { category, index }
    }

    /// Bind `max_groups` group slots to this category's locations in round
    /// robin order.
    pub fn make_groups(&mut self, category: usize, max_groups: usize) {
        let num_locs = self.categories[category].len();
        let slots =
            (0..max_groups).map(|g| LocationId { category, index: g % num_locs }).collect();
        self.groups.insert(category, slots);
    }

    pub fn by_group(&self, category: usize, group: usize) -> Option<LocationId> {
        self.groups.get(&category).and_then(|slots| slots.get(group)).copied()
    }

    pub fn has_groups(&self, category: usize) -> bool {
        self.groups.contains_key(&category)
    }
}
