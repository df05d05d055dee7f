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

use fxhash::FxHashMap;

use crate::error::SimError;
use crate::models::constants;

/// One entry of the building-types YAML.
#[derive(Clone, Debug, Deserialize)]
pub struct BuildingTypeSpec {
    pub index: usize,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_sqm")]
    pub default_sqm: f64,
    #[serde(default = "default_neighbours")]
    pub neighbours: usize,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub weighted: bool,
}

fn default_sqm() -> f64 {
    400.0
}

fn default_neighbours() -> usize {
    1
}

#[derive(Clone, Debug)]
pub struct BuildingType {
    pub name: String,
    pub labels: Vec<String>,
    pub default_sqm: f64,
    /// Shortlist length kept by the nearest-location resolver.
    pub neighbours: usize,
    /// Pick one specific neighbour instead of drawing from the pool each day.
    pub fixed: bool,
    /// Visit probability proportional to floor area.
    pub weighted: bool,
    pub avg_visit_time: f64,
}

/// Closed category registry. Indices are stable ids used positionally by the
/// needs table, the nearest-location cache and the exposure counters.
#[derive(Clone, Debug)]
pub struct BuildingTypes {
    types: Vec<BuildingType>,
    by_name: FxHashMap<String, usize>,
    pub park: Option<usize>,
    pub hospital: Option<usize>,
    pub supermarket: Option<usize>,
    pub office: Option<usize>,
    pub school: Option<usize>,
    pub shopping: Option<usize>,
}

impl BuildingTypes {
    /// Load the closed category registry from the building-types YAML.
    pub fn from_yml(path: &std::path::Path) -> Result<BuildingTypes, SimError> {
        crate::readers::ensure_extension(path, &["yml", "yaml"])?;
        let specs: HashMap<String, BuildingTypeSpec> =
            serde_yaml::from_reader(std::fs::File::open(path)?)?;
        BuildingTypes::from_specs(specs)
    }

    pub fn from_specs(specs: HashMap<String, BuildingTypeSpec>) -> Result<BuildingTypes, SimError> {
        let mut ordered: Vec<(String, BuildingTypeSpec)> = specs.into_iter().collect();
        ordered.sort_by_key(|(_, spec)| spec.index);
        for (position, (name, spec)) in ordered.iter().enumerate() {
            if spec.index != position {
                return Err(SimError::InvalidInput(format!(
                    "building type '{}' has index {}, expected contiguous indices from 0",
                    name, spec.index
                )));
            }
        }
        let types = ordered
            .into_iter()
            .map(|(name, spec)| BuildingType {
                avg_visit_time: constants::AVG_VISIT_TIMES
                    .get(spec.index)
                    .copied()
                    .unwrap_or(constants::DEFAULT_VISIT_TIME),
                name,
                labels: spec.labels,
                default_sqm: spec.default_sqm,
                neighbours: spec.neighbours,
                fixed: spec.fixed,
                weighted: spec.weighted,
            })
            .collect::<Vec<_>>();
        let by_name: FxHashMap<String, usize> =
            types.iter().enumerate().map(|(i, t)| (t.name.clone(), i)).collect();
        let lookup = |name: &str| by_name.get(name).copied();
        Ok(BuildingTypes {
            park: lookup("park"),
            hospital: lookup("hospital"),
            supermarket: lookup("supermarket"),
            office: lookup("office"),
            school: lookup("school"),
            shopping: lookup("shopping"),
            types,
            by_name,
        })
    }

    /// The registry used throughout the test suite: the seven standard
    /// categories in their conventional order.
    pub fn standard() -> BuildingTypes {
        let entries: [(&str, f64, usize, bool, bool); 7] = [
            ("park", 500.0, 10, false, true),
            ("hospital", 2000.0, 4, false, true),
            ("supermarket", 1200.0, 10, false, true),
            ("office", 1600.0, 1, false, false),
            ("school", 2000.0, 4, true, false),
            ("leisure", 1200.0, 10, false, true),
            ("shopping", 800.0, 10, false, true),
        ];
        let specs = entries
            .iter()
            .enumerate()
            .map(|(index, &(name, default_sqm, neighbours, fixed, weighted))| {
                (
                    name.to_string(),
                    BuildingTypeSpec {
                        index,
                        labels: vec![name.to_string()],
                        default_sqm,
                        neighbours,
                        fixed,
                        weighted,
                    },
                )
            })
            .collect();
        BuildingTypes::from_specs(specs).expect("standard registry is well formed")
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, category: usize) -> &BuildingType {
        &self.types[category]
    }

    pub fn name(&self, category: usize) -> &str {
        &self.types[category].name
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Bin a raw building label into a category; unmapped labels are houses.
    pub fn categorise(&self, raw_label: &str) -> Option<usize> {
        self.types.iter().position(|t| t.labels.iter().any(|l| l == raw_label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_order_types_by_index() {
        let types = BuildingTypes::standard();
        assert_eq!(types.len(), 7);
        assert_eq!(types.name(0), "park");
        assert_eq!(types.office, Some(3));
        assert_eq!(types.school, Some(4));
        assert_eq!(types.index_of("shopping"), Some(6));
        assert_eq!(types.index_of("harbour"), None);
    }

    #[test]
    fn should_align_visit_times_positionally() {
        let types = BuildingTypes::standard();
        assert_eq!(types.get(0).avg_visit_time, 90.0);
        assert_eq!(types.get(3).avg_visit_time, 360.0);
        assert_eq!(types.get(6).avg_visit_time, 60.0);
    }

    #[test]
    fn should_bin_labels_into_categories() {
        let types = BuildingTypes::standard();
        assert_eq!(types.categorise("park"), Some(0));
        assert_eq!(types.categorise("detached house"), None);
    }

    #[test]
    fn should_load_the_registry_from_yaml() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("building_types_map.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "park:\n  index: 0\n  labels: [\"park\", \"green\"]\n  default_sqm: 500\n  neighbours: 10\n  weighted: true\n\
             school:\n  index: 1\n  labels: [\"school\", \"kindergarten\"]\n  default_sqm: 2000\n  neighbours: 4\n  fixed: true\n"
        )
        .unwrap();
        let types = BuildingTypes::from_yml(&path).unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types.name(0), "park");
        assert_eq!(types.categorise("kindergarten"), Some(1));
        assert!(types.get(1).fixed);
        assert!(types.get(0).weighted);
        assert_eq!(types.school, Some(1));
        assert_eq!(types.office, None);
    }

    #[test]
    fn should_reject_non_contiguous_indices() {
        let mut specs = HashMap::new();
        specs.insert(
            "park".to_string(),
            BuildingTypeSpec {
                index: 2,
                labels: vec![],
                default_sqm: 100.0,
                neighbours: 1,
                fixed: false,
                weighted: false,
            },
        );
        assert!(BuildingTypes::from_specs(specs).is_err());
    }
}
