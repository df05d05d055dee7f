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

use crate::models::custom_types::{Count, Day};

/// Aggregated census for one tick, after the end-of-tick reduction.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Counts {
    time: Day,
    susceptible: Count,
    exposed: Count,
    infectious: Count,
    recovered: Count,
    dead: Count,
    immune: Count,
    infections_today: Count,
    hospitalisations_today: Count,
    hospital_bed_occupancy: Count,
    validation: f64,
}

impl Counts {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        time: Day,
        statuses: [Count; 6],
        infections_today: Count,
        hospitalisations_today: Count,
        hospital_bed_occupancy: Count,
        validation: f64,
    ) -> Counts {
        Counts {
            time,
            susceptible: statuses[0],
            exposed: statuses[1],
            infectious: statuses[2],
            recovered: statuses[3],
            dead: statuses[4],
            immune: statuses[5],
            infections_today,
            hospitalisations_today,
            hospital_bed_occupancy,
            validation,
        }
    }

    pub fn get_time(&self) -> Day {
        self.time
    }

    pub fn get_susceptible(&self) -> Count {
        self.susceptible
    }

    pub fn get_exposed(&self) -> Count {
        self.exposed
    }

    pub fn get_infectious(&self) -> Count {
        self.infectious
    }

    pub fn get_recovered(&self) -> Count {
        self.recovered
    }

    pub fn get_dead(&self) -> Count {
        self.dead
    }

    pub fn get_immune(&self) -> Count {
        self.immune
    }

    pub fn get_infections_today(&self) -> Count {
        self.infections_today
    }

    pub fn get_hospitalisations_today(&self) -> Count {
        self.hospitalisations_today
    }

    pub fn get_hospital_bed_occupancy(&self) -> Count {
        self.hospital_bed_occupancy
    }

    pub fn get_validation(&self) -> f64 {
        self.validation
    }

    pub fn total(&self) -> Count {
        self.susceptible + self.exposed + self.infectious + self.recovered + self.dead + self.immune
    }

    pub fn log(&self) {
        info!(
            "t {}: S {}, E {}, I {}, R {}, D {}, M {}, new inf {}, new hosp {}, beds {}",
            self.time,
            self.susceptible,
            self.exposed,
            self.infectious,
            self.recovered,
            self.dead,
            self.immune,
            self.infections_today,
            self.hospitalisations_today,
            self.hospital_bed_occupancy
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_sum_statuses() {
        let counts = Counts::new(3, [10, 2, 3, 1, 0, 4], 5, 1, 1, 0.0);
        assert_eq!(counts.total(), 20);
        assert_eq!(counts.get_time(), 3);
        assert_eq!(counts.get_infections_today(), 5);
    }
}
