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
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::ecosystem::Ecosystem;
use crate::error::SimError;
use crate::readers::ensure_extension;
use crate::utils::RandomWrapper;

pub struct BuildingIngestConfig {
    /// Number of households represented by each placed house.
    pub house_ratio: usize,
    /// Office floor area per worker in m2.
    pub workspace: f64,
    /// Floor area of each synthesised office building.
    pub office_size: f64,
    /// Fraction of the population in the workforce.
    pub work_participation_rate: f64,
    /// Where to log the synthesised offices, if anywhere.
    pub offices_log: Option<PathBuf>,
}

impl Default for BuildingIngestConfig {
    fn default() -> BuildingIngestConfig {
        BuildingIngestConfig {
            house_ratio: 2,
            workspace: 12.0,
            office_size: 1600.0,
            work_participation_rate: 0.5,
            offices_log: None,
        }
    }
}

/// Ingest the building inventory: bin raw labels into categories, place one
/// house per `house_ratio` residential rows, and synthesise offices uniformly
/// in the bounding box until the workspace budget is filled. Offices in the
/// CSV model commuting poorly and are ignored. Rows starting with `#` are
/// comments.
pub fn read_building_csv(
    e: &mut Ecosystem,
    path: &Path,
    config: &BuildingIngestConfig,
    rng: &mut RandomWrapper,
) -> Result<(), SimError> {
    ensure_extension(path, &["csv"])?;
    if config.house_ratio == 0 {
        return Err(SimError::InvalidInput("house_ratio must be positive".to_string()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)?;

    let mut house_coords: Vec<(f64, f64)> = Vec::new();
    let mut house_csv_count = 0usize;
    let mut num_locations = 0usize;
    let mut x_bounds = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y_bounds = (f64::INFINITY, f64::NEG_INFINITY);

    for (row_number, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 4 {
            return Err(SimError::InvalidInput(format!(
                "{}: row {} has {} columns, expected label,x,y,sqm",
                path.display(),
                row_number + 1,
                record.len()
            )));
        }
        let label = record.get(0).unwrap_or("").trim().to_string();
        let parse = |index: usize, what: &str| -> Result<f64, SimError> {
            let field = record.get(index).unwrap_or("").trim();
            field.parse::<f64>().map_err(|_| {
                SimError::InvalidInput(format!(
                    "{}: row {} holds '{}' where {} was expected",
                    path.display(),
                    row_number + 1,
                    field,
                    what
                ))
            })
        };
        let x = parse(1, "a coordinate")?;
        let y = parse(2, "a coordinate")?;
        let sqm = parse(3, "a floor area")?;
        x_bounds = (x_bounds.0.min(x), x_bounds.1.max(x));
        y_bounds = (y_bounds.0.min(y), y_bounds.1.max(y));

        match e.shared.types.categorise(&label) {
            // unmapped labels are residential
            None => {
                if house_csv_count % config.house_ratio == 0 {
                    house_coords.push((x, y));
                }
                house_csv_count += 1;
            }
            Some(category) if e.shared.types.office == Some(category) => {}
            Some(category) => {
                e.shared.add_location(category, x, y, sqm);
                num_locations += 1;
            }
        }
    }
    if house_csv_count == 0 && num_locations == 0 {
        return Err(SimError::InvalidInput(format!(
            "{}: no usable building rows",
            path.display()
        )));
    }

    // fill the workspace budget with synthesised offices
    if let Some(office) = e.shared.types.office {
        let mut offices_log = match &config.offices_log {
            Some(log_path) => Some(BufWriter::new(File::create(log_path)?)),
            None => None,
        };
        let (x_min, x_max) = pad_degenerate(x_bounds);
        let (y_min, y_max) = pad_degenerate(y_bounds);
        let mut office_sqm =
            config.workspace * house_csv_count as f64 * config.work_participation_rate;
        while office_sqm > 0.0 {
            let x = rng.get().gen_range(x_min..x_max);
            let y = rng.get().gen_range(y_min..y_max);
            e.shared.add_location(office, x, y, config.office_size);
            num_locations += 1;
            if let Some(log) = offices_log.as_mut() {
                writeln!(log, "office,{},{},{}", x, y, config.office_size)?;
            }
            office_sqm -= config.office_size;
        }
    } else {
        warn!("no office category in the registry; skipping office synthesis");
    }

    e.build_population(&house_coords, config.house_ratio);
    info!(
        "read {} houses ({} residential rows) and {} other locations from {}",
        house_coords.len(),
        house_csv_count,
        num_locations,
        path.display()
    );
    Ok(())
}

fn pad_degenerate((min, max): (f64, f64)) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        (min, min + 1.0)
    }
}
