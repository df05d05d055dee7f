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

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::SimError;
use crate::measures::{MutationEvent, MutationSchedule, VaccinationEntry, VaccinationSchedule};
use crate::readers::ensure_extension;

const DATE_FORMAT: &str = "%-d/%-m/%Y";

/// Parse the dated vaccination rollout. The driver shifts lookups back by
/// `vaccine_effect_time`, so entries describe administration dates.
pub fn read_vaccinations_yml(
    path: &Path,
    immunity_duration: f64,
) -> Result<VaccinationSchedule, SimError> {
    ensure_extension(path, &["yml", "yaml"])?;
    let value: serde_yaml::Value = serde_yaml::from_reader(File::open(path)?)?;
    let mapping = value.as_mapping().ok_or_else(|| {
        SimError::InvalidInput(format!("{}: vaccinations YAML must be a mapping", path.display()))
    })?;

    let mut schedule = VaccinationSchedule::empty();
    match mapping
        .get(&serde_yaml::Value::String("vaccine_effect_time".to_string()))
        .and_then(|v| v.as_i64())
    {
        Some(days) => schedule.vaccine_effect_time = days,
        None => warn!(
            "{} does not set vaccine_effect_time; using the {}-day default",
            path.display(),
            schedule.vaccine_effect_time
        ),
    }

    for (key, entry_value) in mapping.iter() {
        let key_str = match key.as_str() {
            Some(s) => s,
            None => continue,
        };
        if key_str == "vaccine_effect_time" {
            continue;
        }
        let date = NaiveDate::parse_from_str(key_str, DATE_FORMAT).map_err(|_| {
            SimError::InvalidInput(format!(
                "{}: key '{}' is neither vaccine_effect_time nor a date",
                path.display(),
                key_str
            ))
        })?;
        let mut entry: VaccinationEntry = serde_yaml::from_value(entry_value.clone())?;
        // vaccine efficacy wanes on the immunity timescale unless overridden
        if entry.vac_duration.is_none() && immunity_duration > 0.0 {
            entry.vac_duration = Some(immunity_duration);
        }
        schedule.entries.insert(date, entry);
    }
    info!(
        "vaccination schedule loaded from {}: {} dated entries, effect time {} days",
        path.display(),
        schedule.entries.len(),
        schedule.vaccine_effect_time
    );
    Ok(schedule)
}

/// Parse the optional variant take-over schedule.
pub fn read_mutations_yml(path: &Path) -> Result<MutationSchedule, SimError> {
    ensure_extension(path, &["yml", "yaml"])?;
    let value: serde_yaml::Value = serde_yaml::from_reader(File::open(path)?)?;
    let mapping = value.as_mapping().ok_or_else(|| {
        SimError::InvalidInput(format!("{}: mutations YAML must be a mapping", path.display()))
    })?;
    let mut entries = std::collections::HashMap::new();
    for (key, entry_value) in mapping.iter() {
        let key_str = match key.as_str() {
            Some(s) => s,
            None => continue,
        };
        let date = NaiveDate::parse_from_str(key_str, DATE_FORMAT).map_err(|_| {
            SimError::InvalidInput(format!(
                "{}: key '{}' is not a date in format {}",
                path.display(),
                key_str,
                DATE_FORMAT
            ))
        })?;
        let event: MutationEvent = serde_yaml::from_value(entry_value.clone())?;
        entries.insert(date, event);
    }
    Ok(MutationSchedule::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yml(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    #[test]
    fn should_parse_the_rollout_schedule() {
        let (_dir, path) = write_yml(
            "vaccinations.yml",
            "vaccine_effect_time: 21\n\
             8/12/2020:\n\
             \u{20}  vaccines_per_day: 2000\n\
             \u{20}  vaccine_age_limit: 80\n\
             \u{20}  no_symptoms: 0.75\n\
             \u{20}  no_transmission: 0.45\n",
        );
        let schedule = read_vaccinations_yml(&path, 273.0).unwrap();
        assert_eq!(schedule.vaccine_effect_time, 21);
        let entry = &schedule.entries[&NaiveDate::from_ymd_opt(2020, 12, 8).unwrap()];
        assert_eq!(entry.vaccines_per_day, Some(2000));
        assert_eq!(entry.vaccine_age_limit, Some(80));
        assert_eq!(entry.vac_duration, Some(273.0));
    }

    #[test]
    fn should_default_the_effect_time() {
        let (_dir, path) = write_yml("vaccinations.yml", "1/1/2021:\n  vaccines_per_day: 10\n");
        let schedule = read_vaccinations_yml(&path, -1.0).unwrap();
        assert_eq!(schedule.vaccine_effect_time, 14);
        let entry = &schedule.entries[&NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()];
        assert_eq!(entry.vac_duration, None);
    }

    #[test]
    fn should_parse_variant_takeovers() {
        let (_dir, path) = write_yml(
            "mutations.yml",
            "22/10/2020:\n  type: alpha\n  transition_period: 80\n",
        );
        let schedule = read_mutations_yml(&path).unwrap();
        assert_eq!(
            schedule.entries[&NaiveDate::from_ymd_opt(2020, 10, 22).unwrap()].variant,
            "alpha"
        );
    }
}
