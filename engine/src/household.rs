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

use crate::ecosystem::SharedState;
use crate::listeners::event_logger::EventLog;
use crate::models::constants;
use crate::person::{Person, Status};
use crate::utils::RandomWrapper;

/// Fixed group of co-resident agents.
#[derive(Clone, Debug)]
pub struct Household {
    /// Worker-local house id.
    pub house: usize,
    /// Worker-local agent ids.
    pub agents: Vec<usize>,
}

impl Household {
    pub fn new(house: usize) -> Household {
        Household { house, agents: Vec::new() }
    }

    /// Infectious co-residents who are actually at home.
    pub fn infectious_count(&self, people: &[Person]) -> usize {
        self.agents
            .iter()
            .filter(|&&aid| people[aid].status == Status::Infectious && !people[aid].hospitalised)
            .count()
    }

    pub fn is_infected(&self, people: &[Person]) -> bool {
        self.infectious_count(people) > 0
    }

    /// Intra-household transmission for one tick. Airflow is already folded
    /// into the literature-derived home interaction constant.
    #[allow(clippy::too_many_arguments)]
    pub fn evolve(
        &self,
        e: &SharedState,
        house_x: f64,
        house_y: f64,
        people: &mut [Person],
        rank: usize,
        rng: &mut RandomWrapper,
        events: &mut EventLog,
    ) {
        let infectious = self.infectious_count(people);
        if infectious == 0 {
            return;
        }
        let infection_chance = e.contact_rate_multiplier_house
            * e.disease.infection_rate
            * constants::HOME_INTERACTION_FRACTION
            * infectious as f64;
        for &aid in &self.agents {
            if people[aid].is_susceptible() && rng.chance(infection_chance) {
                people[aid].infect(
                    e.time,
                    &e.disease,
                    Status::Exposed,
                    "house",
                    house_x,
                    house_y,
                    rank,
                    rng,
                    events,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingTypes;
    use crate::disease::Disease;
    use crate::ecosystem::SharedState;
    use crate::needs::Needs;

    fn shared(infection_rate: f64) -> SharedState {
        let types = BuildingTypes::standard();
        let rows = vec![vec![0.0; types.len()]];
        let needs = Needs::from_rows(&types, rows).unwrap();
        let disease = Disease::new(infection_rate, 4.6, 8.4, 12.0, 8.0, 12.0, -1.0, 0.0);
        SharedState::new(types, needs, disease, vec![1.0 / 91.0; 91], 100)
    }

    fn household_of(size: usize) -> (Household, Vec<Person>) {
        let mut rng = RandomWrapper::seeded(9);
        let ages = vec![1.0 / 91.0; 91];
        let mut household = Household::new(0);
        let mut people = Vec::new();
        for i in 0..size {
            household.agents.push(i);
            people.push(Person::new(0, 0, &ages, &mut rng));
        }
        (household, people)
    }

    #[test]
    fn should_not_count_hospitalised_residents_as_infectious() {
        let (household, mut people) = household_of(3);
        people[0].status = Status::Infectious;
        people[1].status = Status::Infectious;
        people[1].hospitalised = true;
        assert_eq!(household.infectious_count(&people), 1);
        assert!(household.is_infected(&people));
    }

    #[test]
    fn should_never_infect_without_infectious_residents() {
        let e = shared(1.0);
        let (household, mut people) = household_of(4);
        let mut rng = RandomWrapper::seeded(10);
        let mut events = EventLog::disabled();
        for _ in 0..50 {
            household.evolve(&e, 0.0, 0.0, &mut people, 0, &mut rng, &mut events);
        }
        assert!(people.iter().all(|p| p.is_susceptible()));
    }

    #[test]
    fn should_infect_co_residents_at_the_expected_rate() {
        // one infectious among four: p = 1.0 * 1.0 * 0.2 * 1 = 0.2 per
        // susceptible co-resident and tick
        let e = shared(1.0);
        let mut rng = RandomWrapper::seeded(11);
        let mut events = EventLog::disabled();
        let replicates = 4000;
        let mut new_exposed = 0u32;
        for _ in 0..replicates {
            let (household, mut people) = household_of(4);
            people[0].status = Status::Infectious;
            household.evolve(&e, 0.0, 0.0, &mut people, 0, &mut rng, &mut events);
            new_exposed +=
                people.iter().filter(|p| p.status == Status::Exposed).count() as u32;
        }
        let mean = f64::from(new_exposed) / replicates as f64;
        // 3 susceptible co-residents at 0.2 each
        assert!((mean - 0.6).abs() < 0.05, "mean new exposed was {}", mean);
    }

    #[test]
    fn should_respect_a_zero_infection_rate() {
        let e = shared(0.0);
        let (household, mut people) = household_of(4);
        people[0].status = Status::Infectious;
        let mut rng = RandomWrapper::seeded(12);
        let mut events = EventLog::disabled();
        for _ in 0..50 {
            household.evolve(&e, 0.0, 0.0, &mut people, 0, &mut rng, &mut events);
        }
        assert_eq!(people.iter().filter(|p| p.status == Status::Exposed).count(), 0);
    }
}
