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

use crate::buildings::BuildingTypes;
use crate::ecosystem::SharedState;
use crate::error::SimError;
use crate::house::House;
use crate::household::Household;
use crate::listeners::event_logger::EventLog;
use crate::location::{LocationRegistry, VisitLedger};
use crate::models::constants;
use crate::person::{Person, Status};
use crate::utils::RandomWrapper;

/// One shared-nothing partition of the population. A worker owns its block of
/// houses end-to-end: it instantiates the households and agents in its slice,
/// plans their visits, progresses their conditions and writes only its own
/// ledger, event files and counters. The only cross-worker traffic is the
/// element-wise sum of the exposure counters and the status reduction.
pub struct Worker {
    pub rank: usize,
    pub houses: Vec<House>,
    pub households: Vec<Household>,
    pub people: Vec<Person>,
    pub rng: RandomWrapper,
    pub ledger: VisitLedger,
    pub events: EventLog,
    /// Running census of this worker's hospitalised agents.
    pub num_hospitalised: i64,
    pub vaccinations_today: i64,
}

impl Worker {
    pub fn new(rank: usize, seed: u64, events: EventLog) -> Worker {
        Worker {
            rank,
            houses: Vec::new(),
            households: Vec::new(),
            people: Vec::new(),
            rng: RandomWrapper::seeded(seed.wrapping_add(rank as u64)),
            ledger: VisitLedger::new(0),
            events,
            num_hospitalised: 0,
            vaccinations_today: 0,
        }
    }

    /// Instantiate one house with its households and residents. Household
    /// sizes follow a Poisson around the configured mean, or the 1..4 default
    /// when no mean is given.
    pub fn add_house(
        &mut self,
        x: f64,
        y: f64,
        num_households: usize,
        household_size: f64,
        ages: &[f64],
    ) {
        let house_id = self.houses.len();
        let mut house = House::new(x, y);
        for _ in 0..num_households {
            let household_id = self.households.len();
            let size = if household_size > 0.0 {
                1 + self.rng.poisson(household_size - 1.0) as usize
            } else {
                1 + self.rng.below(4)
            };
            let mut household = Household::new(house_id);
            for _ in 0..size {
                let agent_id = self.people.len();
                household.agents.push(agent_id);
                self.people.push(Person::new(house_id, household_id, ages, &mut self.rng));
            }
            house.households.push(household_id);
            house.num_agents += size;
            self.households.push(household);
        }
        self.houses.push(house);
    }

    pub fn population(&self) -> usize {
        self.people.len()
    }

    pub fn find_nearest(
        &mut self,
        types: &BuildingTypes,
        locations: &LocationRegistry,
    ) -> Result<(), SimError> {
        for house in self.houses.iter_mut() {
            house.find_nearest_locations(types, locations, &mut self.rng)?;
        }
        Ok(())
    }

    pub fn begin_tick(&mut self, exposure_slots: usize) {
        self.ledger.clear(exposure_slots);
        self.events.reset_daily();
        self.vaccinations_today = 0;
    }

    /// Phase 1 of a tick: plan visits, progress conditions and run both
    /// vaccination passes over this worker's share of the daily budget.
    pub fn agent_day(&mut self, e: &SharedState, vaccination_budget: i64, deterministic: bool) {
        let mut budget = vaccination_budget;
        for agent_id in 0..self.people.len() {
            let household_infected = {
                let person = &self.people[agent_id];
                self.households[person.household].is_infected(&self.people)
            };
            let (home, x, y) = {
                let person = &self.people[agent_id];
                let house = &self.houses[person.home];
                (person.home, house.x, house.y)
            };
            self.people[agent_id].plan_visits(
                e,
                agent_id,
                &self.houses[home],
                household_infected,
                &mut self.ledger,
                &mut self.rng,
                deterministic,
            );
            self.people[agent_id].progress_condition(
                e,
                x,
                y,
                self.rank,
                &mut self.rng,
                &mut self.events,
                &mut self.num_hospitalised,
            );
            // priority pass
            if budget > 0 {
                let person = &mut self.people[agent_id];
                if person.age > e.vaccinations_age_limit && person.is_vaccine_eligible() {
                    person.vaccinate(
                        e.time,
                        e.vac_no_symptoms,
                        e.vac_no_transmission,
                        e.vac_duration,
                        &mut self.rng,
                    );
                    self.vaccinations_today += 1;
                    budget -= 1;
                }
            }
        }
        // general pass over the remaining budget
        if budget > 0 {
            for person in self.people.iter_mut() {
                if budget <= 0 {
                    break;
                }
                if person.age > e.vaccinations_legal_age_limit && person.is_vaccine_eligible() {
                    person.vaccinate(
                        e.time,
                        e.vac_no_symptoms,
                        e.vac_no_transmission,
                        e.vac_duration,
                        &mut self.rng,
                    );
                    self.vaccinations_today += 1;
                    budget -= 1;
                }
            }
        }
    }

    /// Phase 3: infection draws at every open location with local visits,
    /// using the exposure minutes summed across all workers.
    pub fn spread_at_locations(&mut self, e: &SharedState) {
        for (category, locations) in e.locations.iter() {
            if e.is_closed(category) {
                continue;
            }
            for location in locations {
                let num_visits = self.ledger.visits[location.exposure_id].len();
                if num_visits == 0 {
                    continue;
                }
                self.ledger.base_rate_total += location.base_rate(e);
                self.ledger.loc_evolves += num_visits as u64;
                let visits = &self.ledger.visits[location.exposure_id];
                location.evolve(
                    e,
                    visits,
                    &mut self.people,
                    &self.houses,
                    self.rank,
                    &mut self.rng,
                    &mut self.events,
                );
            }
        }
    }

    /// Phase 4: intra-household transmission.
    pub fn spread_in_households(&mut self, e: &SharedState) {
        for household in &self.households {
            let house = &self.houses[household.house];
            let (x, y) = (house.x, house.y);
            household.evolve(e, x, y, &mut self.people, self.rank, &mut self.rng, &mut self.events);
        }
    }

    /// Phase 5: public-transport transmission at a globally computed
    /// probability. Hospitalised agents are off the network.
    pub fn spread_on_transport(&mut self, e: &SharedState, infection_probability: f64) -> u32 {
        let mut infections = 0;
        for agent_id in 0..self.people.len() {
            {
                let person = &self.people[agent_id];
                if person.is_dead() || person.hospitalised {
                    continue;
                }
            }
            if self.rng.chance(infection_probability) {
                let (x, y) = {
                    let house = &self.houses[self.people[agent_id].home];
                    (house.x, house.y)
                };
                self.people[agent_id].infect(
                    e.time,
                    &e.disease,
                    Status::Exposed,
                    "traffic",
                    x,
                    y,
                    self.rank,
                    &mut self.rng,
                    &mut self.events,
                );
                infections += 1;
            }
        }
        infections
    }

    pub fn status_counts(&self) -> [i64; 6] {
        let mut counts = [0i64; 6];
        for person in &self.people {
            counts[person.status.index()] += 1;
        }
        counts
    }

    /// Pre-seed `num` infections into random houses of this worker's slice.
    pub fn seed_infections(&mut self, e: &SharedState, num: usize, severity: Status) {
        if self.houses.is_empty() {
            if num > 0 {
                warn!("rank {}: no houses to seed {} infections into", self.rank, num);
            }
            return;
        }
        for _ in 0..num {
            let mut attempts = 0;
            let mut infected = false;
            while !infected && attempts < constants::SEEDING_MAX_ATTEMPTS {
                let house_id = self.rng.below(self.houses.len());
                infected = self.try_seed_in_house(e, house_id, severity);
                attempts += 1;
            }
            if !infected {
                warn!("rank {}: unable to seed infection", self.rank);
            }
        }
    }

    fn try_seed_in_house(&mut self, e: &SharedState, house_id: usize, severity: Status) -> bool {
        let (household_id, x, y) = {
            let house = &self.houses[house_id];
            if house.households.is_empty() {
                return false;
            }
            (house.households[self.rng.below(house.households.len())], house.x, house.y)
        };
        let agent_id = {
            let agents = &self.households[household_id].agents;
            if agents.is_empty() {
                return false;
            }
            agents[self.rng.below(agents.len())]
        };
        if self.people[agent_id].is_susceptible() {
            self.people[agent_id].infect(
                e.time,
                &e.disease,
                severity,
                "house",
                x,
                y,
                self.rank,
                &mut self.rng,
                &mut self.events,
            );
            return true;
        }
        false
    }

    pub fn flag_school_from_home(&mut self, fraction: f64) {
        for person in self.people.iter_mut() {
            if self.rng.chance(fraction) {
                person.school_from_home = true;
            }
        }
    }

    pub fn flag_work_from_home(&mut self, fraction: f64) {
        for person in self.people.iter_mut() {
            if self.rng.chance(fraction) {
                person.work_from_home = true;
            }
        }
    }

    pub fn clear_school_from_home(&mut self) {
        for person in self.people.iter_mut() {
            person.school_from_home = false;
        }
    }

    pub fn clear_work_from_home(&mut self) {
        for person in self.people.iter_mut() {
            person.work_from_home = false;
        }
    }

    pub fn assign_groups(&mut self, category: usize, num_groups: usize) {
        for person in self.people.iter_mut() {
            person.assign_group(category, num_groups, &mut self.rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::Disease;
    use crate::needs::Needs;

    fn shared() -> SharedState {
        let types = BuildingTypes::standard();
        let rows = vec![vec![0.0; types.len()]];
        let needs = Needs::from_rows(&types, rows).unwrap();
        let disease = Disease::new(0.0, 4.0, 8.0, 12.0, 8.0, 12.0, -1.0, 0.0);
        SharedState::new(types, needs, disease, vec![1.0 / 91.0; 91], 50)
    }

    fn worker_with_population(houses: usize, household_size: usize) -> Worker {
        let mut worker = Worker::new(0, 17, EventLog::disabled());
        let ages = vec![1.0 / 91.0; 91];
        for k in 0..houses {
            let mut house = House::new(k as f64, 0.0);
            let household_id = worker.households.len();
            let mut household = Household::new(k);
            for _ in 0..household_size {
                let agent_id = worker.people.len();
                household.agents.push(agent_id);
                let mut person = Person::new(k, household_id, &ages, &mut worker.rng);
                person.age = 30;
                person.antivax = false;
                worker.people.push(person);
            }
            house.households.push(household_id);
            house.num_agents = household_size;
            worker.households.push(household);
            worker.houses.push(house);
        }
        worker
    }

    #[test]
    fn should_build_contiguous_arenas() {
        let mut worker = Worker::new(0, 3, EventLog::disabled());
        let ages = vec![1.0 / 91.0; 91];
        worker.add_house(0.0, 0.0, 2, 2.6, &ages);
        worker.add_house(1.0, 1.0, 1, 2.6, &ages);
        assert_eq!(worker.houses.len(), 2);
        assert_eq!(worker.households.len(), 3);
        assert_eq!(worker.population(), worker.households.iter().map(|h| h.agents.len()).sum::<usize>());
        assert_eq!(worker.houses[0].num_agents + worker.houses[1].num_agents, worker.population());
    }

    #[test]
    fn should_seed_the_exact_number_of_infections() {
        let mut e = shared();
        e.time = -30;
        let mut worker = worker_with_population(20, 2);
        worker.seed_infections(&e, 10, Status::Exposed);
        let seeded = worker.people.iter().filter(|p| !p.is_susceptible()).count();
        assert_eq!(seeded, 10);
        assert_eq!(worker.events.infections_today, 10);
        assert!(worker.people.iter().all(|p| p.is_susceptible() || p.status == Status::Exposed));
    }

    #[test]
    fn should_warn_but_continue_when_seeding_saturates() {
        let mut e = shared();
        e.time = 0;
        let mut worker = worker_with_population(1, 1);
        worker.seed_infections(&e, 3, Status::Exposed);
        // one agent: only one seed can land
        assert_eq!(worker.people.iter().filter(|p| !p.is_susceptible()).count(), 1);
    }

    #[test]
    fn should_respect_the_vaccination_budget() {
        let mut e = shared();
        e.vaccinations_age_limit = 0;
        e.vac_no_transmission = 1.0;
        let mut worker = worker_with_population(10, 1);
        worker.begin_tick(0);
        worker.agent_day(&e, 5, false);
        assert_eq!(worker.vaccinations_today, 5);
        let immune = worker.people.iter().filter(|p| p.status == Status::Immune).count();
        assert_eq!(immune, 5);
    }

    #[test]
    fn should_fall_back_to_the_legal_age_limit() {
        let mut e = shared();
        // nobody clears the priority limit, everyone clears the legal one
        e.vaccinations_age_limit = 95;
        e.vaccinations_legal_age_limit = 16;
        e.vac_no_transmission = 1.0;
        let mut worker = worker_with_population(4, 1);
        worker.begin_tick(0);
        worker.agent_day(&e, 10, false);
        assert_eq!(worker.vaccinations_today, 4);
        assert!(worker.people.iter().all(|p| p.status == Status::Immune));
    }

    #[test]
    fn should_not_vaccinate_without_budget() {
        let mut e = shared();
        e.vaccinations_age_limit = 0;
        let mut worker = worker_with_population(10, 1);
        worker.begin_tick(0);
        worker.agent_day(&e, 0, false);
        assert_eq!(worker.vaccinations_today, 0);
        assert!(worker.people.iter().all(|p| p.is_susceptible()));
    }

    #[test]
    fn should_count_statuses_per_worker() {
        let mut worker = worker_with_population(5, 2);
        worker.people[0].status = Status::Dead;
        worker.people[1].status = Status::Infectious;
        let counts = worker.status_counts();
        assert_eq!(counts[0], 8);
        assert_eq!(counts[2], 1);
        assert_eq!(counts[4], 1);
        assert_eq!(counts.iter().sum::<i64>(), 10);
    }

    #[test]
    fn should_skip_dead_and_hospitalised_agents_on_transport() {
        let e = shared();
        let mut worker = worker_with_population(4, 1);
        worker.people[0].status = Status::Dead;
        worker.people[1].hospitalised = true;
        let infections = worker.spread_on_transport(&e, 1.0);
        assert_eq!(infections, 2);
        assert_eq!(worker.people[0].status, Status::Dead);
    }
}
