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
use crate::error::SimError;
use crate::models::constants;
use crate::person::Person;

/// Weekly minutes spent per location category, by age. Rows are ages from 0
/// upwards; columns follow the category indices of the building registry.
#[derive(Clone, Debug)]
pub struct Needs {
    table: Vec<Vec<f64>>,
    baseline: Vec<Vec<f64>>,
    num_categories: usize,
    hospital: Option<usize>,
    office: Option<usize>,
    school: Option<usize>,
}

impl Needs {
    /// Build from rows already aligned to the category indices. The school
    /// column is pre-scaled to its indoor share and truncated to whole
    /// minutes, as the source data counts breaks as school time.
    pub fn from_rows(types: &BuildingTypes, mut rows: Vec<Vec<f64>>) -> Result<Needs, SimError> {
        if rows.is_empty() {
            return Err(SimError::InvalidInput("needs table has no age rows".to_string()));
        }
        for (age, row) in rows.iter().enumerate() {
            if row.len() != types.len() {
                return Err(SimError::InvalidInput(format!(
                    "needs row for age {} has {} columns, expected {}",
                    age,
                    row.len(),
                    types.len()
                )));
            }
        }
        if let Some(school) = types.school {
            for row in rows.iter_mut() {
                row[school] = (row[school] * constants::SCHOOL_INDOOR_FRACTION).floor();
            }
        }
        Ok(Needs {
            baseline: rows.clone(),
            table: rows,
            num_categories: types.len(),
            hospital: types.hospital,
            office: types.office,
            school: types.school,
        })
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    pub fn minutes(&self, age: u32, category: usize) -> f64 {
        let row = (age as usize).min(self.table.len() - 1);
        self.table[row][category]
    }

    /// The weekly profile for one agent. Hospitalised agents are confined to
    /// the hospital column for the whole week.
    pub fn get_needs(&self, person: &Person) -> Vec<f64> {
        if person.hospitalised {
            let mut confined = vec![0.0; self.num_categories];
            if let Some(hospital) = self.hospital {
                confined[hospital] = constants::HOSPITAL_CONFINED_MINUTES;
            }
            return confined;
        }
        let row = (person.age as usize).min(self.table.len() - 1);
        let mut needs = self.table[row].clone();
        if person.work_from_home {
            if let Some(office) = self.office {
                needs[office] = 0.0;
            }
        }
        if person.school_from_home {
            if let Some(school) = self.school {
                needs[school] = 0.0;
            }
        }
        needs
    }

    pub fn scale_needs(&mut self, category: usize, factor: f64) -> Result<(), SimError> {
        if category >= self.num_categories {
            return Err(SimError::InvalidInput(format!(
                "cannot scale needs for unknown category index {}",
                category
            )));
        }
        if factor < 0.0 {
            return Err(SimError::InvalidInput(format!(
                "needs scale factor must be non-negative, got {}",
                factor
            )));
        }
        for row in self.table.iter_mut() {
            row[category] *= factor;
        }
        Ok(())
    }

    /// Restore one category column to its as-loaded values.
    pub fn restore_category(&mut self, category: usize) {
        for (row, baseline) in self.table.iter_mut().zip(self.baseline.iter()) {
            row[category] = baseline[category];
        }
    }

    /// Restore the whole table to its as-loaded values.
    pub fn reset(&mut self) {
        self.table = self.baseline.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::RandomWrapper;

    fn needs() -> Needs {
        let types = BuildingTypes::standard();
        // park, hospital, supermarket, office, school, leisure, shopping
        let rows = vec![
            vec![90.0, 10.0, 60.0, 0.0, 2000.0, 120.0, 60.0],
            vec![90.0, 10.0, 60.0, 2400.0, 0.0, 120.0, 60.0],
        ];
        Needs::from_rows(&types, rows).unwrap()
    }

    fn person(age: u32) -> Person {
        let mut rng = RandomWrapper::seeded(11);
        let ages = vec![1.0 / 91.0; 91];
        let mut p = Person::new(0, 0, &ages, &mut rng);
        p.age = age;
        p
    }

    #[test]
    fn should_prescale_the_school_column() {
        let n = needs();
        assert_eq!(n.minutes(0, 4), 1500.0);
        assert_eq!(n.minutes(1, 4), 0.0);
    }

    #[test]
    fn should_zero_office_when_working_from_home() {
        let n = needs();
        let mut p = person(1);
        p.work_from_home = true;
        let profile = n.get_needs(&p);
        assert_eq!(profile[3], 0.0);
        assert_eq!(profile[2], 60.0);
    }

    #[test]
    fn should_zero_school_when_schooling_from_home() {
        let n = needs();
        let mut p = person(0);
        p.school_from_home = true;
        assert_eq!(n.get_needs(&p)[4], 0.0);
    }

    #[test]
    fn should_confine_hospitalised_agents() {
        let n = needs();
        let mut p = person(1);
        p.hospitalised = true;
        let profile = n.get_needs(&p);
        assert_eq!(profile[1], 5040.0);
        assert_eq!(profile.iter().sum::<f64>(), 5040.0);
    }

    #[test]
    fn should_clamp_ages_beyond_the_table() {
        let n = needs();
        let p = person(200);
        assert_eq!(n.get_needs(&p)[3], 2400.0);
    }

    #[test]
    fn should_scale_and_restore_a_category() {
        let mut n = needs();
        n.scale_needs(6, 0.2).unwrap();
        assert_eq!(n.minutes(0, 6), 12.0);
        n.restore_category(6);
        assert_eq!(n.minutes(0, 6), 60.0);
    }

    #[test]
    fn should_reject_bad_scale_arguments() {
        let mut n = needs();
        assert!(n.scale_needs(40, 0.5).is_err());
        assert!(n.scale_needs(2, -0.5).is_err());
    }
}
