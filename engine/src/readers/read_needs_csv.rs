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

use crate::buildings::BuildingTypes;
use crate::error::SimError;
use crate::needs::Needs;
use crate::readers::ensure_extension;

/// Read the age-by-category weekly minutes table. Every category of the
/// registry must appear as a column; the first column (age) is positional.
pub fn read_needs_csv(path: &Path, types: &BuildingTypes) -> Result<Needs, SimError> {
    ensure_extension(path, &["csv"])?;
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut columns = Vec::with_capacity(types.len());
    for category in 0..types.len() {
        let name = types.name(category);
        let column = headers.iter().position(|h| h == name).ok_or_else(|| {
            SimError::InvalidInput(format!(
                "{}: needs file does not contain a column for '{}'",
                path.display(),
                name
            ))
        })?;
        columns.push(column);
    }

    let mut rows = Vec::new();
    for (row_number, record) in reader.records().enumerate() {
        let record = record?;
        let mut row = Vec::with_capacity(columns.len());
        for &column in &columns {
            let field = record.get(column).unwrap_or("").trim();
            let minutes: f64 = field.parse().map_err(|_| {
                SimError::InvalidInput(format!(
                    "{}: row {} holds '{}' where weekly minutes were expected",
                    path.display(),
                    row_number + 1,
                    field
                ))
            })?;
            row.push(minutes);
        }
        rows.push(row);
    }
    Needs::from_rows(types, rows)
}
