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

use crate::error::SimError;
use crate::utils::interpolate_pairs;

pub const MAX_AGE: usize = 90;

/// A named variant with the infection rate it converges to.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Mutation {
    pub infection_rate: f64,
}

#[derive(Clone, Debug)]
pub struct Disease {
    /// Mutable at runtime: variant take-over interpolates towards a target.
    pub infection_rate: f64,
    pub incubation_period: f64,
    pub mild_recovery_period: f64,
    pub recovery_period: f64,
    pub mortality_period: f64,
    pub period_to_hospitalisation: f64,
    /// Days of immunity after recovery; non-positive means permanent.
    pub immunity_duration: f64,
    /// Probability that a recovery lands in the immune compartment.
    pub immunity_fraction: f64,
    hospital: Vec<f64>,
    mortality: Vec<f64>,
    pub mutations: FxHashMap<String, Mutation>,
    pub genotypes: FxHashMap<String, Mutation>,
}

impl Disease {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        infection_rate: f64,
        incubation_period: f64,
        mild_recovery_period: f64,
        recovery_period: f64,
        mortality_period: f64,
        period_to_hospitalisation: f64,
        immunity_duration: f64,
        immunity_fraction: f64,
    ) -> Disease {
        Disease {
            infection_rate,
            incubation_period,
            mild_recovery_period,
            recovery_period,
            mortality_period,
            period_to_hospitalisation,
            immunity_duration,
            immunity_fraction,
            hospital: vec![0.0; MAX_AGE + 1],
            mortality: vec![0.0; MAX_AGE + 1],
            mutations: FxHashMap::default(),
            genotypes: FxHashMap::default(),
        }
    }

    pub fn add_hospitalisation_chances(&mut self, pairs: &[(f64, f64)]) -> Result<(), SimError> {
        validate_probability_pairs("hospitalised", pairs)?;
        self.hospital = interpolate_pairs(MAX_AGE + 1, pairs);
        Ok(())
    }

    pub fn add_mortality_chances(&mut self, pairs: &[(f64, f64)]) -> Result<(), SimError> {
        validate_probability_pairs("mortality", pairs)?;
        self.mortality = interpolate_pairs(MAX_AGE + 1, pairs);
        Ok(())
    }

    pub fn hospitalisation_chance(&self, age: u32) -> f64 {
        self.hospital[(age as usize).min(self.hospital.len() - 1)]
    }

    pub fn mortality_chance(&self, age: u32) -> f64 {
        self.mortality[(age as usize).min(self.mortality.len() - 1)]
    }
}

fn validate_probability_pairs(name: &str, pairs: &[(f64, f64)]) -> Result<(), SimError> {
    for window in pairs.windows(2) {
        if window[1].0 <= window[0].0 {
            return Err(SimError::InvalidInput(format!(
                "disease table '{}' has unsorted or duplicate ages ({} after {})",
                name, window[1].0, window[0].0
            )));
        }
    }
    for &(age, probability) in pairs {
        if age < 0.0 || age > MAX_AGE as f64 {
            return Err(SimError::InvalidInput(format!(
                "disease table '{}' has out-of-range age {}",
                name, age
            )));
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(SimError::InvalidInput(format!(
                "disease table '{}' has probability {} outside [0, 1]",
                name, probability
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disease() -> Disease {
        Disease::new(0.07, 4.6, 8.4, 12.0, 8.0, 12.0, -1.0, 0.0)
    }

    #[test]
    fn should_interpolate_sparse_age_tables() {
        let mut d = disease();
        d.add_hospitalisation_chances(&[(0.0, 0.02), (40.0, 0.02), (90.0, 0.3)]).unwrap();
        assert!((d.hospitalisation_chance(0) - 0.02).abs() < 1e-12);
        assert!((d.hospitalisation_chance(40) - 0.02).abs() < 1e-12);
        assert!((d.hospitalisation_chance(65) - 0.16).abs() < 1e-12);
        assert!((d.hospitalisation_chance(90) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn should_clamp_lookup_age() {
        let mut d = disease();
        d.add_mortality_chances(&[(0.0, 0.0), (90.0, 0.2)]).unwrap();
        assert_eq!(d.mortality_chance(200), d.mortality_chance(90));
    }

    #[test]
    fn should_reject_unsorted_ages() {
        let mut d = disease();
        assert!(d.add_hospitalisation_chances(&[(40.0, 0.1), (20.0, 0.2)]).is_err());
        assert!(d.add_hospitalisation_chances(&[(20.0, 0.1), (20.0, 0.2)]).is_err());
    }

    #[test]
    fn should_reject_out_of_range_values() {
        let mut d = disease();
        assert!(d.add_mortality_chances(&[(0.0, 1.4)]).is_err());
        assert!(d.add_mortality_chances(&[(95.0, 0.4)]).is_err());
    }
}
