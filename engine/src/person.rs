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

use crate::disease::Disease;
use crate::ecosystem::SharedState;
use crate::house::House;
use crate::listeners::event_logger::EventLog;
use crate::location::{LocationId, VisitLedger};
use crate::models::constants;
use crate::models::custom_types::Day;
use crate::utils::RandomWrapper;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Susceptible,
    Exposed,
    Infectious,
    Recovered,
    Dead,
    Immune,
}

impl Status {
    pub fn index(self) -> usize {
        match self {
            Status::Susceptible => 0,
            Status::Exposed => 1,
            Status::Infectious => 2,
            Status::Recovered => 3,
            Status::Dead => 4,
            Status::Immune => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Susceptible => "susceptible",
            Status::Exposed => "exposed",
            Status::Infectious => "infectious",
            Status::Recovered => "recovered",
            Status::Dead => "dead",
            Status::Immune => "immune",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Job {
    Default,
    Teacher,
    ShopWorker,
    HealthWorker,
}

#[derive(Clone, Debug)]
pub struct Person {
    /// Worker-local house id.
    pub home: usize,
    /// Worker-local household id.
    pub household: usize,
    pub age: u32,
    pub job: Job,
    pub status: Status,
    pub status_change_time: Day,
    /// Days until the next phase transition may fire.
    pub phase_duration: f64,
    pub mild_version: bool,
    pub hospitalised: bool,
    pub dying: bool,
    pub work_from_home: bool,
    pub school_from_home: bool,
    pub symptoms_suppressed: bool,
    pub antivax: bool,
    pub hospital: Option<LocationId>,
    /// Per-category group id, overriding the nearest-location rule.
    pub groups: FxHashMap<usize, usize>,
}

impl Person {
    pub fn new(home: usize, household: usize, ages: &[f64], rng: &mut RandomWrapper) -> Person {
        let age_dist = WeightedIndex::new(ages).expect("age distribution must not be empty");
        let job_dist = WeightedIndex::new(&constants::JOB_DISTRIBUTION)
            .expect("job distribution is well formed");
        let job = match job_dist.sample(rng.get()) {
            0 => Job::Default,
            1 => Job::Teacher,
            2 => Job::ShopWorker,
            _ => Job::HealthWorker,
        };
        Person {
            home,
            household,
            age: age_dist.sample(rng.get()) as u32,
            job,
            status: Status::Susceptible,
            status_change_time: -1,
            phase_duration: 0.0,
            mild_version: true,
            hospitalised: false,
            dying: false,
            work_from_home: false,
            school_from_home: false,
            symptoms_suppressed: false,
            antivax: rng.chance(constants::ANTIVAX_FRACTION),
            hospital: None,
            groups: FxHashMap::default(),
        }
    }

    pub fn is_susceptible(&self) -> bool {
        self.status == Status::Susceptible
    }

    pub fn is_infectious(&self) -> bool {
        self.status == Status::Infectious
    }

    pub fn is_dead(&self) -> bool {
        self.status == Status::Dead
    }

    /// Susceptible, not already protected, and willing.
    pub fn is_vaccine_eligible(&self) -> bool {
        self.is_susceptible() && !self.symptoms_suppressed && !self.antivax
    }

    pub fn assign_group(&mut self, category: usize, num_groups: usize, rng: &mut RandomWrapper) {
        self.groups.insert(category, rng.below(num_groups));
    }

    /// Register today's visits against the worker's ledger. Recovered, dead
    /// and immune agents are assumed not to mix.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_visits(
        &self,
        e: &SharedState,
        my_id: usize,
        house: &House,
        household_infected: bool,
        ledger: &mut VisitLedger,
        rng: &mut RandomWrapper,
        deterministic: bool,
    ) {
        if !matches!(self.status, Status::Susceptible | Status::Exposed | Status::Infectious) {
            return;
        }
        let personal_needs = e.needs.get_needs(self);
        for (category, &minutes) in personal_needs.iter().enumerate() {
            if minutes < 1.0 || e.is_closed(category) {
                continue;
            }
            let target = self.choose_destination(e, house, category, rng);
            if let Some(id) = target {
                ledger.visit_minutes += minutes;
                e.locations.get(id).register_visit(
                    e,
                    ledger,
                    rng,
                    my_id,
                    self,
                    household_infected,
                    minutes,
                    deterministic,
                );
            }
        }
    }

    fn choose_destination(
        &self,
        e: &SharedState,
        house: &House,
        category: usize,
        rng: &mut RandomWrapper,
    ) -> Option<LocationId> {
        if e.types.hospital == Some(category) && self.hospitalised {
            return self.hospital;
        }
        if e.types.office == Some(category) && self.job != Job::Default {
            let job_category = match self.job {
                Job::Teacher => e.types.school,
                Job::ShopWorker => e.types.shopping,
                Job::HealthWorker => e.types.hospital,
                Job::Default => None,
            };
            return job_category.and_then(|cat| pick_from_shortlist(e, house, cat, rng));
        }
        if let Some(&group) = self.groups.get(&category) {
            if let Some(id) = e.locations.by_group(category, group) {
                return Some(id);
            }
        }
        pick_from_shortlist(e, house, category, rng)
    }

    /// Move this agent into the exposed state (or a caller-supplied severity
    /// when rigidly inserting cases).
    #[allow(clippy::too_many_arguments)]
    pub fn infect(
        &mut self,
        time: Day,
        disease: &Disease,
        severity: Status,
        location_type: &str,
        x: f64,
        y: f64,
        rank: usize,
        rng: &mut RandomWrapper,
        events: &mut EventLog,
    ) {
        self.status = severity;
        self.status_change_time = time;
        self.mild_version = true;
        self.hospitalised = false;
        self.phase_duration = rng.poisson(disease.incubation_period).max(1.0);
        events.log_infection(time, x, y, location_type, rank, self.phase_duration);
    }

    pub fn recover(
        &mut self,
        e: &SharedState,
        x: f64,
        y: f64,
        rng: &mut RandomWrapper,
        events: &mut EventLog,
    ) {
        if e.disease.immunity_duration > 0.0 {
            // scale fixed at 20, shape carries the configured duration
            self.phase_duration = rng.gamma(e.disease.immunity_duration / 20.0, 20.0);
        }
        self.status = if e.disease.immunity_fraction > 0.0 && rng.chance(e.disease.immunity_fraction)
        {
            Status::Immune
        } else {
            Status::Recovered
        };
        self.status_change_time = e.time;
        events.log_recovery(e.time, x, y, self.age);
    }

    pub fn vaccinate(
        &mut self,
        time: Day,
        vac_no_symptoms: f64,
        vac_no_transmission: f64,
        vac_duration: f64,
        rng: &mut RandomWrapper,
    ) {
        self.status_change_time = time;
        if vac_duration > 0.0 {
            self.phase_duration = if vac_duration > 100.0 {
                rng.gamma(vac_duration / 20.0, 20.0)
            } else {
                rng.poisson(vac_duration)
            };
        }
        if self.status == Status::Susceptible {
            if rng.chance(vac_no_transmission) {
                self.status = Status::Immune;
            } else if rng.chance(vac_no_symptoms) {
                self.symptoms_suppressed = true;
            }
        }
    }

    /// Advance the state machine by at most one transition for tick `e.time`.
    #[allow(clippy::too_many_arguments)]
    pub fn progress_condition(
        &mut self,
        e: &SharedState,
        x: f64,
        y: f64,
        rank: usize,
        rng: &mut RandomWrapper,
        events: &mut EventLog,
        num_hospitalised: &mut i64,
    ) {
        let t = e.time;
        if self.status_change_time > t {
            return;
        }
        match self.status {
            Status::Exposed => {
                if t - self.status_change_time >= self.phase_duration as Day {
                    self.status = Status::Infectious;
                    self.status_change_time = t;
                    let incubation = self.phase_duration;
                    if rng.chance(e.disease.hospitalisation_chance(self.age))
                        && !self.symptoms_suppressed
                    {
                        self.mild_version = false;
                        self.phase_duration = (rng.poisson(e.disease.period_to_hospitalisation)
                            - incubation)
                            .max(1.0);
                    } else {
                        self.mild_version = true;
                        self.phase_duration =
                            (rng.poisson(e.disease.mild_recovery_period) - incubation).max(1.0);
                    }
                }
            }
            Status::Infectious => {
                if self.mild_version {
                    if (t - self.status_change_time) as f64 >= self.phase_duration {
                        self.recover(e, x, y, rng, events);
                    }
                } else if !self.hospitalised {
                    if (t - self.status_change_time) as f64 >= self.phase_duration {
                        self.hospitalised = true;
                        self.hospital = Some(e.locations.find_hospital(&e.types, rng));
                        *num_hospitalised += 1;
                        events.log_hospitalisation(t, x, y, self.age);
                        // recovery and mortality periods run from admission
                        self.status_change_time = t;
                        let hospitalisation_chance = e.disease.hospitalisation_chance(self.age);
                        let mortality_given_admission = if hospitalisation_chance > 0.0 {
                            e.disease.mortality_chance(self.age) / hospitalisation_chance
                        } else {
                            0.0
                        };
                        if rng.chance(mortality_given_admission) {
                            self.dying = true;
                            self.phase_duration = rng.poisson(e.disease.mortality_period);
                        } else {
                            self.dying = false;
                            self.phase_duration = rng.poisson(e.disease.recovery_period);
                        }
                    }
                } else if (t - self.status_change_time) as f64 >= self.phase_duration {
                    self.hospitalised = false;
                    *num_hospitalised -= 1;
                    self.status_change_time = t;
                    if self.dying {
                        self.status = Status::Dead;
                        events.log_death(t, x, y, self.age);
                    } else {
                        self.recover(e, x, y, rng, events);
                    }
                }
            }
            Status::Recovered | Status::Immune => {
                if e.disease.immunity_duration > 0.0
                    && (t - self.status_change_time) as f64 >= self.phase_duration
                {
                    self.status = Status::Susceptible;
                    self.status_change_time = t;
                    self.symptoms_suppressed = false;
                }
            }
            Status::Susceptible | Status::Dead => {}
        }
    }
}

fn pick_from_shortlist(
    e: &SharedState,
    house: &House,
    category: usize,
    rng: &mut RandomWrapper,
) -> Option<LocationId> {
    let shortlist = house.nearest_locations.get(category)?;
    if shortlist.is_empty() {
        return None;
    }
    let index = if shortlist.len() == 1 {
        shortlist[0]
    } else if e.types.get(category).weighted {
        let weights = shortlist.iter().map(|&k| e.locations.category(category)[k].sqm);
        let dist = WeightedIndex::new(weights).ok()?;
        shortlist[dist.sample(rng.get())]
    } else {
        shortlist[rng.below(shortlist.len())]
    };
    Some(LocationId { category, index })
}
