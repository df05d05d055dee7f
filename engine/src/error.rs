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

use std::fmt::{self, Display};
use std::io;

/// Errors surfaced by readers and setup paths. Input faults are fatal for the
/// run; the binary maps them to a non-zero exit code.
#[derive(Debug)]
pub enum SimError {
    IoError(io::Error),
    CsvError(csv::Error),
    YamlError(serde_yaml::Error),
    JsonError(serde_json::Error),
    InvalidInput(String),
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CsvError(error)
    }
}

impl From<serde_yaml::Error> for SimError {
    fn from(error: serde_yaml::Error) -> Self {
        SimError::YamlError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<String> for SimError {
    fn from(error: String) -> Self {
        SimError::InvalidInput(error)
    }
}

impl From<&str> for SimError {
    fn from(error: &str) -> Self {
        SimError::InvalidInput(error.to_string())
    }
}

impl std::error::Error for SimError {}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::IoError(e) => write!(f, "i/o error: {}", e),
            SimError::CsvError(e) => write!(f, "csv error: {}", e),
            SimError::YamlError(e) => write!(f, "yaml error: {}", e),
            SimError::JsonError(e) => write!(f, "json error: {}", e),
            SimError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_from_string() {
        let err: SimError = "needs file not found".into();
        assert!(format!("{}", err).contains("needs file not found"));
    }
}
