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

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};

use crate::ecosystem::Ecosystem;
use crate::error::SimError;
use crate::listeners::listener::{Listener, Listeners};

pub const DEFAULT_HOUSEHOLD_ISOLATION_MULTIPLIER: f64 = 0.625;

/// One dated bundle of intervention knobs.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MeasureEntry {
    pub case_isolation: Option<bool>,
    pub household_isolation: Option<bool>,
    pub external_multiplier: Option<f64>,
    /// Ordered so the per-agent flag path consumes the RNG deterministically.
    pub partial_closure: Option<BTreeMap<String, f64>>,
    pub closure: Option<Vec<String>>,
    pub work_from_home: Option<f64>,
    pub mask_uptake: Option<f64>,
    pub mask_uptake_shopping: Option<f64>,
    pub social_distance: Option<f64>,
    pub traffic_multiplier: Option<f64>,
    pub hospital_protection_factor: Option<f64>,
    pub track_trace_efficiency: Option<f64>,
    pub masks_on_transport: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct MeasuresSchedule {
    pub keyworker_fraction: f64,
    pub date_format: String,
    pub entries: HashMap<NaiveDate, MeasureEntry>,
}

impl MeasuresSchedule {
    pub fn empty() -> MeasuresSchedule {
        MeasuresSchedule {
            keyworker_fraction: 0.2,
            date_format: "%-d/%-m/%Y".to_string(),
            entries: HashMap::new(),
        }
    }
}

/// Applies the date-keyed measure bundles. Mask uptake, social-distance
/// compliance and work-from-home compliance are sticky across entries: an
/// entry that omits them re-applies the last configured value.
pub struct MeasuresEngine {
    schedule: MeasuresSchedule,
    mask_uptake: f64,
    mask_uptake_shopping: f64,
    social_distance: f64,
    work_from_home: f64,
}

impl MeasuresEngine {
    pub fn new(schedule: MeasuresSchedule) -> MeasuresEngine {
        MeasuresEngine {
            schedule,
            mask_uptake: 0.0,
            mask_uptake_shopping: 0.0,
            social_distance: 0.0,
            work_from_home: 0.0,
        }
    }

    pub fn enact(
        &mut self,
        e: &mut Ecosystem,
        listeners: &mut Listeners,
    ) -> Result<(), SimError> {
        let entry = match self.schedule.entries.get(&e.shared.date) {
            Some(entry) => entry.clone(),
            None => return Ok(()),
        };
        e.shared.keyworker_fraction = self.schedule.keyworker_fraction;
        e.remove_all_measures();

        if let Some(case_isolation) = entry.case_isolation {
            if case_isolation {
                e.add_case_isolation();
            } else {
                e.reset_case_isolation();
            }
        }
        if let Some(household_isolation) = entry.household_isolation {
            if household_isolation {
                e.add_household_isolation(DEFAULT_HOUSEHOLD_ISOLATION_MULTIPLIER);
            } else {
                e.reset_household_isolation();
            }
        }
        if let Some(multiplier) = entry.external_multiplier {
            e.shared.external_travel_multiplier = multiplier;
        }
        if let Some(partial_closures) = &entry.partial_closure {
            for (name, &fraction) in partial_closures {
                let category = e.shared.types.index_of(name);
                let exclude_people = category.map_or(false, |c| {
                    e.shared.types.school == Some(c) || e.shared.types.office == Some(c)
                });
                e.add_partial_closure(name, fraction, exclude_people)?;
            }
        }
        if let Some(closures) = &entry.closure {
            for name in closures {
                e.add_closure(name, e.shared.time)?;
            }
        }
        if let Some(compliance) = entry.work_from_home {
            self.work_from_home = compliance;
        }
        e.add_work_from_home(self.work_from_home)?;

        if let Some(uptake) = entry.mask_uptake {
            self.mask_uptake = uptake;
        }
        if let Some(uptake) = entry.mask_uptake_shopping {
            self.mask_uptake_shopping = uptake;
        }
        if let Some(compliance) = entry.social_distance {
            self.social_distance = compliance;
        }
        e.add_social_distance(2.0, self.social_distance, self.mask_uptake, self.mask_uptake_shopping);

        if let Some(multiplier) = entry.traffic_multiplier {
            e.shared.traffic_multiplier = multiplier;
        }
        if let Some(factor) = entry.hospital_protection_factor {
            e.shared.hospital_protection_factor = factor;
        }
        if let Some(efficiency) = entry.track_trace_efficiency {
            e.shared.track_trace_multiplier = 1.0 - efficiency;
        }
        if let Some(masks) = entry.masks_on_transport {
            e.shared.enforce_masks_on_transport = masks;
        }

        info!("enacted measures for {}", e.shared.date_string(&self.schedule.date_format));
        listeners.intervention_applied(e.shared.time, "measures", &serde_json::to_value(&entry)?);
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct VaccinationEntry {
    pub vaccines_per_day: Option<i64>,
    pub vaccine_age_limit: Option<u32>,
    pub no_symptoms: Option<f64>,
    pub no_transmission: Option<f64>,
    pub vac_duration: Option<f64>,
}

/// Dated rollout parameters. Doses administered on the schedule date become
/// effective `vaccine_effect_time` days later, so the lookup is shifted back.
#[derive(Clone, Debug)]
pub struct VaccinationSchedule {
    pub vaccine_effect_time: i64,
    pub entries: HashMap<NaiveDate, VaccinationEntry>,
}

impl VaccinationSchedule {
    pub fn empty() -> VaccinationSchedule {
        VaccinationSchedule { vaccine_effect_time: 14, entries: HashMap::new() }
    }

    pub fn enact(&self, e: &mut Ecosystem) {
        let lookup = e.shared.date - Duration::days(self.vaccine_effect_time);
        if let Some(entry) = self.entries.get(&lookup) {
            if let Some(doses) = entry.vaccines_per_day {
                e.shared.vaccinations_available = doses;
            }
            if let Some(age) = entry.vaccine_age_limit {
                e.shared.vaccinations_age_limit = age;
            }
            if let Some(value) = entry.no_symptoms {
                e.shared.vac_no_symptoms = value;
            }
            if let Some(value) = entry.no_transmission {
                e.shared.vac_no_transmission = value;
            }
            if let Some(value) = entry.vac_duration {
                e.shared.vac_duration = value;
            }
            info!(
                "vaccination rollout: {} doses/day, priority age > {}",
                e.shared.vaccinations_available, e.shared.vaccinations_age_limit
            );
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MutationEvent {
    #[serde(rename = "type")]
    pub variant: String,
    pub transition_period: i64,
}

/// Linearly interpolates the disease infection rate towards a named variant's
/// rate over its transition window.
#[derive(Clone, Debug)]
pub struct MutationSchedule {
    pub entries: HashMap<NaiveDate, MutationEvent>,
    daily_change: f64,
    days_remaining: i64,
}

impl MutationSchedule {
    pub fn new(entries: HashMap<NaiveDate, MutationEvent>) -> MutationSchedule {
        MutationSchedule { entries, daily_change: 0.0, days_remaining: 0 }
    }

    pub fn empty() -> MutationSchedule {
        MutationSchedule::new(HashMap::new())
    }

    pub fn advance(&mut self, e: &mut Ecosystem) {
        if let Some(event) = self.entries.get(&e.shared.date) {
            match e.shared.disease.mutations.get(&event.variant) {
                Some(mutation) if event.transition_period > 0 => {
                    let target = mutation.infection_rate;
                    self.daily_change =
                        (target - e.shared.disease.infection_rate) / event.transition_period as f64;
                    self.days_remaining = event.transition_period;
                    info!(
                        "variant {}: infection rate {} -> {} over {} days",
                        event.variant,
                        e.shared.disease.infection_rate,
                        target,
                        event.transition_period
                    );
                }
                Some(_) => warn!("variant {} has a non-positive transition period", event.variant),
                None => warn!("mutation schedule references unknown variant '{}'", event.variant),
            }
        }
        if self.days_remaining > 0 {
            e.shared.disease.infection_rate += self.daily_change;
            self.days_remaining -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingTypes;
    use crate::disease::{Disease, Mutation};
    use crate::needs::Needs;

    fn ecosystem() -> Ecosystem {
        let types = BuildingTypes::standard();
        let mut row = vec![60.0; types.len()];
        row[4] = 400.0;
        let needs = Needs::from_rows(&types, vec![row]).unwrap();
        let mut disease = Disease::new(0.07, 4.0, 8.0, 12.0, 8.0, 12.0, -1.0, 0.0);
        disease
            .mutations
            .insert("alpha".to_string(), Mutation { infection_rate: 0.17 });
        let mut e = Ecosystem::new(
            types,
            needs,
            disease,
            vec![1.0 / 91.0; 91],
            100,
            1,
            13,
            None,
        )
        .unwrap();
        e.shared.household_size = 1.0;
        let coords: Vec<(f64, f64)> = (0..30).map(|k| (k as f64, 0.0)).collect();
        e.build_population(&coords, 1);
        e
    }

    fn date(day: u32, month: u32, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn should_apply_a_dated_measure_bundle() {
        let mut e = ecosystem();
        e.shared.date = date(16, 3, 2020);
        let mut schedule = MeasuresSchedule::empty();
        let mut partial = BTreeMap::new();
        partial.insert("shopping".to_string(), 0.4);
        schedule.entries.insert(
            date(16, 3, 2020),
            MeasureEntry {
                case_isolation: Some(true),
                household_isolation: Some(true),
                closure: Some(vec!["leisure".to_string()]),
                partial_closure: Some(partial),
                traffic_multiplier: Some(0.4),
                track_trace_efficiency: Some(0.3),
                ..MeasureEntry::default()
            },
        );
        let mut engine = MeasuresEngine::new(schedule);
        let mut listeners = Listeners::from(vec![]);
        engine.enact(&mut e, &mut listeners).unwrap();
        assert!((e.shared.self_isolation_multiplier - 0.625).abs() < 1e-12);
        assert!((e.shared.household_isolation_multiplier - 0.625).abs() < 1e-12);
        assert!(e.shared.closures.contains_key(&5));
        assert!((e.shared.needs.minutes(0, 6) - 36.0).abs() < 1e-12);
        assert!((e.shared.traffic_multiplier - 0.4).abs() < 1e-12);
        assert!((e.shared.track_trace_multiplier - 0.7).abs() < 1e-12);
    }

    #[test]
    fn should_do_nothing_between_scheduled_dates() {
        let mut e = ecosystem();
        e.shared.date = date(1, 3, 2020);
        e.shared.traffic_multiplier = 0.8;
        let mut engine = MeasuresEngine::new(MeasuresSchedule::empty());
        let mut listeners = Listeners::from(vec![]);
        engine.enact(&mut e, &mut listeners).unwrap();
        assert_eq!(e.shared.traffic_multiplier, 0.8);
    }

    #[test]
    fn should_keep_sticky_values_across_entries() {
        let mut e = ecosystem();
        let mut schedule = MeasuresSchedule::empty();
        schedule.entries.insert(
            date(16, 3, 2020),
            MeasureEntry {
                social_distance: Some(1.0),
                mask_uptake: Some(0.0),
                ..MeasureEntry::default()
            },
        );
        // a later entry that only toggles case isolation keeps distancing
        schedule.entries.insert(
            date(20, 3, 2020),
            MeasureEntry { case_isolation: Some(true), ..MeasureEntry::default() },
        );
        let mut engine = MeasuresEngine::new(schedule);
        let mut listeners = Listeners::from(vec![]);
        e.shared.date = date(16, 3, 2020);
        engine.enact(&mut e, &mut listeners).unwrap();
        let distanced = e.shared.contact_rate_multiplier[0];
        assert!((distanced - 0.16).abs() < 1e-12);
        e.shared.date = date(20, 3, 2020);
        engine.enact(&mut e, &mut listeners).unwrap();
        assert!((e.shared.contact_rate_multiplier[0] - distanced).abs() < 1e-12);
    }

    #[test]
    fn should_shift_vaccination_entries_by_the_effect_time() {
        let mut e = ecosystem();
        let mut schedule = VaccinationSchedule::empty();
        schedule.vaccine_effect_time = 14;
        schedule.entries.insert(
            date(1, 3, 2021),
            VaccinationEntry {
                vaccines_per_day: Some(100),
                vaccine_age_limit: Some(60),
                no_transmission: Some(0.6),
                ..VaccinationEntry::default()
            },
        );
        e.shared.date = date(1, 3, 2021);
        schedule.enact(&mut e);
        assert_eq!(e.shared.vaccinations_available, 0, "effect must be delayed");
        e.shared.date = date(15, 3, 2021);
        schedule.enact(&mut e);
        assert_eq!(e.shared.vaccinations_available, 100);
        assert_eq!(e.shared.vaccinations_age_limit, 60);
        assert!((e.shared.vac_no_transmission - 0.6).abs() < 1e-12);
    }

    #[test]
    fn should_interpolate_infection_rate_during_a_takeover() {
        let mut e = ecosystem();
        let mut entries = HashMap::new();
        entries.insert(
            date(1, 10, 2020),
            MutationEvent { variant: "alpha".to_string(), transition_period: 10 },
        );
        let mut schedule = MutationSchedule::new(entries);
        e.shared.date = date(1, 10, 2020);
        let start = e.shared.disease.infection_rate;
        for day in 0..12 {
            schedule.advance(&mut e);
            e.shared.date += Duration::days(1);
            if day < 9 {
                assert!(e.shared.disease.infection_rate > start);
                assert!(e.shared.disease.infection_rate < 0.17 + 1e-9);
            }
        }
        assert!((e.shared.disease.infection_rate - 0.17).abs() < 1e-9);
    }
}
