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

use std::any::Any;
use std::fs::File;

use serde_json::json;

use crate::listeners::listener::Listener;
use crate::models::custom_types::Day;
use crate::models::events::Counts;

/// Collects every enacted intervention bundle and writes one JSON document at
/// the end of the run.
pub struct InterventionReporter {
    file_path: String,
    applied: Vec<serde_json::Value>,
}

impl InterventionReporter {
    pub fn new(file_path: String) -> InterventionReporter {
        InterventionReporter { file_path, applied: Vec::new() }
    }
}

impl Listener for InterventionReporter {
    fn counts_updated(&mut self, _counts: &Counts, _date: &str) {}

    fn intervention_applied(&mut self, time: Day, name: &str, detail: &serde_json::Value) {
        self.applied.push(json!({ "time": time, "name": name, "detail": detail }));
    }

    fn simulation_ended(&mut self) {
        match File::create(&self.file_path) {
            Ok(file) => {
                if let Err(e) = serde_json::to_writer_pretty(file, &self.applied) {
                    warn!("could not write intervention report {}: {}", self.file_path, e);
                }
            }
            Err(e) => warn!("could not create intervention report {}: {}", self.file_path, e),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
