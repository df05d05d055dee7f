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

use std::cmp::Ordering;

use crate::buildings::BuildingTypes;
use crate::error::SimError;
use crate::household::Household;
use crate::location::LocationRegistry;
use crate::person::Person;
use crate::utils::{calc_dist, RandomWrapper};

/// Spatial anchor for one or more households. Owned by exactly one worker.
#[derive(Clone, Debug)]
pub struct House {
    pub x: f64,
    pub y: f64,
    /// Worker-local household ids.
    pub households: Vec<usize>,
    /// Per category: shortlist of indices into `locations[category]`,
    /// computed once after ingest.
    pub nearest_locations: Vec<Vec<usize>>,
    pub num_agents: usize,
}

impl House {
    pub fn new(x: f64, y: f64) -> House {
        House { x, y, households: Vec::new(), nearest_locations: Vec::new(), num_agents: 0 }
    }

    /// Identify the preferred buildings for each category, scoring by
    /// distance over the square root of floor area. Offices model commuting
    /// rather than proximity and are drawn uniformly from the full set.
    pub fn find_nearest_locations(
        &mut self,
        types: &BuildingTypes,
        locations: &LocationRegistry,
        rng: &mut RandomWrapper,
    ) -> Result<(), SimError> {
        let mut nearest = Vec::with_capacity(types.len());
        for category in 0..types.len() {
            let locs = locations.category(category);
            if locs.is_empty() {
                warn!("location type {} missing", types.name(category));
                nearest.push(Vec::new());
                continue;
            }
            for (position, location) in locs.iter().enumerate() {
                if location.sqm <= 0.0 {
                    return Err(SimError::InvalidInput(format!(
                        "location with 0 sqm area: type {}, x {}, y {}, position {}; \
                         this is commonly caused by corrupt rows in the buildings CSV",
                        types.name(category),
                        location.x,
                        location.y,
                        position
                    )));
                }
            }
            if types.office == Some(category) {
                nearest.push(vec![rng.below(locs.len())]);
                continue;
            }
            let mut scored: Vec<(f64, usize)> = locs
                .iter()
                .enumerate()
                .map(|(k, l)| (calc_dist(self.x, self.y, l.x, l.y) / l.sqm.sqrt(), k))
                .collect();
            scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            scored.truncate(types.get(category).neighbours.max(1));
            let mut shortlist: Vec<usize> = scored.into_iter().map(|(_, k)| k).collect();
            if types.get(category).fixed && shortlist.len() > 1 {
                shortlist = vec![shortlist[rng.below(shortlist.len())]];
            }
            nearest.push(shortlist);
        }
        self.nearest_locations = nearest;
        Ok(())
    }

    pub fn has_age_susceptible(
        &self,
        households: &[Household],
        people: &[Person],
        age: u32,
    ) -> bool {
        self.households.iter().any(|&hh| {
            households[hh]
                .agents
                .iter()
                .any(|&aid| people[aid].age == age && people[aid].is_susceptible())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(types: &BuildingTypes) -> LocationRegistry {
        LocationRegistry::new(types.len())
    }

    #[test]
    fn should_prefer_close_and_large_buildings() {
        let types = BuildingTypes::standard();
        let mut locations = registry(&types);
        // supermarket: a tiny one next door and a huge one a little further
        locations.add(&types, 2, 1.0, 0.0, 100.0); // score 0.1
        locations.add(&types, 2, 3.0, 0.0, 10000.0); // score 0.03
        let mut house = House::new(0.0, 0.0);
        let mut rng = RandomWrapper::seeded(1);
        house.find_nearest_locations(&types, &locations, &mut rng).unwrap();
        assert_eq!(house.nearest_locations[2][0], 1);
        assert_eq!(house.nearest_locations[2][1], 0);
    }

    #[test]
    fn should_truncate_to_the_neighbour_count() {
        let types = BuildingTypes::standard();
        let mut locations = registry(&types);
        for k in 0..8 {
            locations.add(&types, 1, k as f64, 0.0, 2000.0);
        }
        let mut house = House::new(0.0, 0.0);
        let mut rng = RandomWrapper::seeded(2);
        house.find_nearest_locations(&types, &locations, &mut rng).unwrap();
        // hospital keeps 4 neighbours
        assert_eq!(house.nearest_locations[1].len(), 4);
        assert_eq!(house.nearest_locations[1], vec![0, 1, 2, 3]);
    }

    #[test]
    fn should_reduce_fixed_categories_to_one_member() {
        let types = BuildingTypes::standard();
        let mut locations = registry(&types);
        for k in 0..6 {
            locations.add(&types, 4, k as f64, 0.0, 2000.0);
        }
        let mut house = House::new(0.0, 0.0);
        let mut rng = RandomWrapper::seeded(3);
        house.find_nearest_locations(&types, &locations, &mut rng).unwrap();
        assert_eq!(house.nearest_locations[4].len(), 1);
        // the pick must come from the 4-member shortlist
        assert!(house.nearest_locations[4][0] < 4);
    }

    #[test]
    fn should_pick_offices_from_the_full_set() {
        let types = BuildingTypes::standard();
        let mut locations = registry(&types);
        for k in 0..50 {
            locations.add(&types, 3, k as f64, 0.0, 1600.0);
        }
        let mut rng = RandomWrapper::seeded(4);
        let mut seen_far_office = false;
        for _ in 0..40 {
            let mut house = House::new(0.0, 0.0);
            house.find_nearest_locations(&types, &locations, &mut rng).unwrap();
            assert_eq!(house.nearest_locations[3].len(), 1);
            if house.nearest_locations[3][0] > 0 {
                seen_far_office = true;
            }
        }
        assert!(seen_far_office, "offices should not be proximity-bound");
    }

    #[test]
    fn should_fail_on_zero_area_locations() {
        let types = BuildingTypes::standard();
        let mut locations = registry(&types);
        locations.add(&types, 2, 1.0, 1.0, 0.0);
        let mut house = House::new(0.0, 0.0);
        let mut rng = RandomWrapper::seeded(5);
        let result = house.find_nearest_locations(&types, &locations, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn should_leave_missing_categories_empty() {
        let types = BuildingTypes::standard();
        let locations = registry(&types);
        let mut house = House::new(0.0, 0.0);
        let mut rng = RandomWrapper::seeded(6);
        house.find_nearest_locations(&types, &locations, &mut rng).unwrap();
        assert!(house.nearest_locations.iter().all(|n| n.is_empty()));
    }
}
