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

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::disease::{Disease, Mutation};
use crate::error::SimError;
use crate::readers::ensure_extension;

#[derive(Deserialize)]
struct DiseaseYml {
    infection_rate: f64,
    incubation_period: f64,
    mild_recovery_period: f64,
    recovery_period: f64,
    mortality_period: f64,
    period_to_hospitalisation: f64,
    #[serde(default = "default_immunity_duration")]
    immunity_duration: f64,
    #[serde(default)]
    immunity_fraction: f64,
    hospitalised: Vec<(f64, f64)>,
    mortality: Vec<(f64, f64)>,
    #[serde(default)]
    mutations: HashMap<String, Mutation>,
    #[serde(default)]
    genotypes: HashMap<String, Mutation>,
}

fn default_immunity_duration() -> f64 {
    -1.0
}

pub fn read_disease_yml(path: &Path) -> Result<Disease, SimError> {
    ensure_extension(path, &["yml", "yaml"])?;
    let profile: DiseaseYml = serde_yaml::from_reader(File::open(path)?)?;

    for (name, value) in [
        ("infection_rate", profile.infection_rate),
        ("incubation_period", profile.incubation_period),
        ("mild_recovery_period", profile.mild_recovery_period),
        ("recovery_period", profile.recovery_period),
        ("mortality_period", profile.mortality_period),
        ("period_to_hospitalisation", profile.period_to_hospitalisation),
    ]
    .iter()
    {
        if *value < 0.0 {
            return Err(SimError::InvalidInput(format!(
                "{}: {} must be non-negative, got {}",
                path.display(),
                name,
                value
            )));
        }
    }
    if !(0.0..=1.0).contains(&profile.immunity_fraction) {
        return Err(SimError::InvalidInput(format!(
            "{}: immunity_fraction must be within [0, 1]",
            path.display()
        )));
    }

    let mut disease = Disease::new(
        profile.infection_rate,
        profile.incubation_period,
        profile.mild_recovery_period,
        profile.recovery_period,
        profile.mortality_period,
        profile.period_to_hospitalisation,
        profile.immunity_duration,
        profile.immunity_fraction,
    );
    disease.add_hospitalisation_chances(&profile.hospitalised)?;
    disease.add_mortality_chances(&profile.mortality)?;
    disease.mutations = profile.mutations.into_iter().collect();
    disease.genotypes = profile.genotypes.into_iter().collect();
    info!(
        "disease loaded from {}: infection rate {}, incubation {} days",
        path.display(),
        disease.infection_rate,
        disease.incubation_period
    );
    Ok(disease)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yml(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disease_covid19.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    const BASE: &str = "infection_rate: 0.07\n\
                        incubation_period: 4.6\n\
                        mild_recovery_period: 8.4\n\
                        recovery_period: 12.0\n\
                        mortality_period: 8.0\n\
                        period_to_hospitalisation: 12.0\n\
                        immunity_duration: 273\n\
                        hospitalised:\n- [0, 0.001]\n- [90, 0.3]\n\
                        mortality:\n- [0, 0.0001]\n- [90, 0.15]\n";

    #[test]
    fn should_load_a_full_disease_profile() {
        let content = format!(
            "{}mutations:\n  alpha:\n    infection_rate: 0.112\n  delta:\n    infection_rate: 0.165\n",
            BASE
        );
        let (_dir, path) = write_yml(&content);
        let disease = read_disease_yml(&path).unwrap();
        assert!((disease.infection_rate - 0.07).abs() < 1e-12);
        assert_eq!(disease.immunity_duration, 273.0);
        assert!(disease.hospitalisation_chance(45) > 0.001);
        assert!(disease.hospitalisation_chance(45) < 0.3);
        assert!((disease.mutations["delta"].infection_rate - 0.165).abs() < 1e-12);
        assert!(disease.genotypes.is_empty());
    }

    #[test]
    fn should_default_to_permanent_immunity() {
        let content = BASE.replace("immunity_duration: 273\n", "");
        let (_dir, path) = write_yml(&content);
        let disease = read_disease_yml(&path).unwrap();
        assert_eq!(disease.immunity_duration, -1.0);
        assert_eq!(disease.immunity_fraction, 0.0);
    }

    #[test]
    fn should_reject_negative_periods() {
        let content = BASE.replace("incubation_period: 4.6", "incubation_period: -1");
        let (_dir, path) = write_yml(&content);
        assert!(read_disease_yml(&path).is_err());
    }

    #[test]
    fn should_reject_missing_fields() {
        let (_dir, path) = write_yml("infection_rate: 0.07\n");
        assert!(read_disease_yml(&path).is_err());
    }

    #[test]
    fn should_reject_malformed_probability_tables() {
        let content = BASE.replace("- [90, 0.3]", "- [90, 1.3]");
        let (_dir, path) = write_yml(&content);
        assert!(read_disease_yml(&path).is_err());
    }
}
