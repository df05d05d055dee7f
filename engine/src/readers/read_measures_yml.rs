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
use crate::measures::{MeasureEntry, MeasuresSchedule};
use crate::readers::{ensure_extension, normalise_date_format};

/// Parse the date-keyed measures YAML: a `keyworker_fraction`, a
/// `date_format`, and one intervention bundle per date.
pub fn read_measures_yml(path: &Path) -> Result<MeasuresSchedule, SimError> {
    ensure_extension(path, &["yml", "yaml"])?;
    let value: serde_yaml::Value = serde_yaml::from_reader(File::open(path)?)?;
    let mapping = value.as_mapping().ok_or_else(|| {
        SimError::InvalidInput(format!("{}: measures YAML must be a mapping", path.display()))
    })?;

    let mut schedule = MeasuresSchedule::empty();
    if let Some(fraction) = mapping
        .get(&serde_yaml::Value::String("keyworker_fraction".to_string()))
        .and_then(|v| v.as_f64())
    {
        schedule.keyworker_fraction = fraction;
    }
    if let Some(format) = mapping
        .get(&serde_yaml::Value::String("date_format".to_string()))
        .and_then(|v| v.as_str())
    {
        schedule.date_format = normalise_date_format(format);
    }

    for (key, entry_value) in mapping.iter() {
        let key_str = match key.as_str() {
            Some(s) => s,
            None => continue,
        };
        if key_str == "keyworker_fraction" || key_str == "date_format" {
            continue;
        }
        let date =
            NaiveDate::parse_from_str(key_str, &schedule.date_format).map_err(|_| {
                SimError::InvalidInput(format!(
                    "{}: key '{}' is neither a known field nor a date in format {}",
                    path.display(),
                    key_str,
                    schedule.date_format
                ))
            })?;
        let entry: MeasureEntry = serde_yaml::from_value(entry_value.clone())?;
        schedule.entries.insert(date, entry);
    }
    info!("measures schedule loaded from {}: {} dated entries", path.display(), schedule.entries.len());
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yml(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measures.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    #[test]
    fn should_parse_dated_measure_bundles() {
        let (_dir, path) = write_yml(
            "keyworker_fraction: 0.18\n\
             date_format: \"%d/%m/%Y\"\n\
             16/3/2020:\n\
             \u{20}  case_isolation: true\n\
             \u{20}  social_distance: 0.5\n\
             \u{20}  partial_closure:\n\
             \u{20}    shopping: 0.8\n\
             \u{20}  closure:\n\
             \u{20}    - leisure\n\
             1/6/2020:\n\
             \u{20}  case_isolation: false\n",
        );
        let schedule = read_measures_yml(&path).unwrap();
        assert!((schedule.keyworker_fraction - 0.18).abs() < 1e-12);
        assert_eq!(schedule.entries.len(), 2);
        let entry = &schedule.entries[&NaiveDate::from_ymd_opt(2020, 3, 16).unwrap()];
        assert_eq!(entry.case_isolation, Some(true));
        assert_eq!(entry.social_distance, Some(0.5));
        assert_eq!(entry.partial_closure.as_ref().unwrap()["shopping"], 0.8);
        assert_eq!(entry.closure.as_ref().unwrap(), &vec!["leisure".to_string()]);
        let later = &schedule.entries[&NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()];
        assert_eq!(later.case_isolation, Some(false));
        assert!(later.social_distance.is_none());
    }

    #[test]
    fn should_reject_keys_that_are_not_dates() {
        let (_dir, path) = write_yml("date_format: \"%d/%m/%Y\"\nsometime:\n  closure: [school]\n");
        assert!(read_measures_yml(&path).is_err());
    }
}
