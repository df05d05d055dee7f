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

use std::path::Path;

use crate::error::SimError;
use crate::readers::ensure_extension;

/// Read the demographic pyramid for one region and normalise it to a
/// probability mass over ages. Falls back to the United Kingdom column when
/// the region is missing.
pub fn read_age_csv(path: &Path, region: &str) -> Result<Vec<f64>, SimError> {
    ensure_extension(path, &["csv"])?;
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_lowercase()).collect();
    let region_lower = region.to_lowercase();
    let column = headers
        .iter()
        .position(|h| *h == region_lower)
        .or_else(|| headers.iter().position(|h| h == "united kingdom"))
        .ok_or_else(|| {
            SimError::InvalidInput(format!(
                "{}: no column for region '{}' and no United Kingdom fallback",
                path.display(),
                region
            ))
        })?;

    let mut counts = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = record.get(column).unwrap_or("").trim();
        let value: f64 = field.parse().map_err(|_| {
            SimError::InvalidInput(format!(
                "{}: row {} holds '{}' where a population count was expected",
                path.display(),
                row + 1,
                field
            ))
        })?;
        counts.push(value);
    }
    let total: f64 = counts.iter().sum();
    if counts.is_empty() || total <= 0.0 {
        return Err(SimError::InvalidInput(format!(
            "{}: age distribution is empty or sums to zero",
            path.display()
        )));
    }
    Ok(counts.into_iter().map(|c| c / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("age-distr.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    #[test]
    fn should_normalise_the_selected_region() {
        let (_dir, path) = write_csv("Age,Brent,United Kingdom\n0,10,100\n1,30,100\n2,60,100\n");
        let ages = read_age_csv(&path, "brent").unwrap();
        assert_eq!(ages.len(), 3);
        assert!((ages[0] - 0.1).abs() < 1e-12);
        assert!((ages[2] - 0.6).abs() < 1e-12);
        assert!((ages.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn should_fall_back_to_the_uk_column() {
        let (_dir, path) = write_csv("Age,United Kingdom\n0,50\n1,50\n");
        let ages = read_age_csv(&path, "atlantis").unwrap();
        assert_eq!(ages, vec![0.5, 0.5]);
    }

    #[test]
    fn should_fail_without_any_usable_column() {
        let (_dir, path) = write_csv("Age,Brent\n0,10\n");
        assert!(read_age_csv(&path, "atlantis").is_err());
    }

    #[test]
    fn should_fail_on_non_numeric_counts() {
        let (_dir, path) = write_csv("Age,United Kingdom\n0,many\n");
        assert!(read_age_csv(&path, "atlantis").is_err());
    }
}
