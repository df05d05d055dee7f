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

mod read_age_csv;
mod read_building_csv;
mod read_cases_csv;
mod read_disease_yml;
mod read_measures_yml;
mod read_needs_csv;
mod read_vaccinations_yml;

pub use self::read_age_csv::read_age_csv;
pub use self::read_building_csv::{read_building_csv, BuildingIngestConfig};
pub use self::read_cases_csv::read_cases_csv;
pub use self::read_disease_yml::read_disease_yml;
pub use self::read_measures_yml::read_measures_yml;
pub use self::read_needs_csv::read_needs_csv;
pub use self::read_vaccinations_yml::{read_mutations_yml, read_vaccinations_yml};

pub(crate) fn ensure_extension(path: &Path, allowed: &[&str]) -> Result<(), SimError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(extension)) {
        return Ok(());
    }
    Err(SimError::InvalidInput(format!(
        "{}: expected a .{} file",
        path.display(),
        allowed.join("/.")
    )))
}

/// The original tooling wrote platform-specific strftime padding flags; map
/// them onto the equivalent chrono specifiers.
pub(crate) fn normalise_date_format(format: &str) -> String {
    if format == "%d/%m/%Y" {
        return "%-d/%-m/%Y".to_string();
    }
    format.to_string()
}
