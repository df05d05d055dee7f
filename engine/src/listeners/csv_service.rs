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

use crate::error::SimError;
use crate::listeners::listener::Listener;
use crate::models::events::Counts;

pub const MAIN_CSV_HEADER: [&str; 12] = [
    "#time",
    "date",
    "susceptible",
    "exposed",
    "infectious",
    "recovered",
    "dead",
    "immune",
    "num infections today",
    "num hospitalisations today",
    "hospital bed occupancy",
    "num hospitalisations today (data)",
];

/// Series that get a cumulative column appended after completion.
pub const CUMULATIVE_SERIES: [&str; 2] = ["num infections today", "num hospitalisations today"];

/// Writes the main per-tick time series.
pub struct CsvListener {
    output_file_path: String,
    writer: csv::Writer<File>,
}

impl CsvListener {
    pub fn new(output_file_path: String) -> Result<CsvListener, SimError> {
        let mut writer = csv::Writer::from_path(&output_file_path)?;
        writer.write_record(&MAIN_CSV_HEADER)?;
        writer.flush()?;
        Ok(CsvListener { output_file_path, writer })
    }
}

impl Listener for CsvListener {
    fn counts_updated(&mut self, counts: &Counts, date: &str) {
        let row = [
            counts.get_time().to_string(),
            date.to_string(),
            counts.get_susceptible().to_string(),
            counts.get_exposed().to_string(),
            counts.get_infectious().to_string(),
            counts.get_recovered().to_string(),
            counts.get_dead().to_string(),
            counts.get_immune().to_string(),
            counts.get_infections_today().to_string(),
            counts.get_hospitalisations_today().to_string(),
            counts.get_hospital_bed_occupancy().to_string(),
            counts.get_validation().to_string(),
        ];
        self.writer.write_record(&row).expect("failed to write simulation output row");
        self.writer.flush().expect("failed to flush simulation output");
    }

    fn simulation_ended(&mut self) {
        self.writer.flush().expect("failed to flush simulation output");
        if let Err(e) = append_cumulative_columns(&self.output_file_path, &CUMULATIVE_SERIES) {
            warn!("could not append cumulative columns to {}: {}", self.output_file_path, e);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Re-write the finished CSV with running totals for the requested series.
pub fn append_cumulative_columns(path: &str, series: &[&str]) -> Result<(), SimError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let indices: Vec<usize> =
        series.iter().filter_map(|s| headers.iter().position(|h| h == s)).collect();
    if indices.is_empty() {
        return Ok(());
    }
    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;

    let mut writer = csv::Writer::from_path(path)?;
    let mut out_headers = headers.clone();
    for &i in &indices {
        out_headers.push(format!("cum {}", headers[i]));
    }
    writer.write_record(&out_headers)?;

    let mut totals = vec![0.0f64; indices.len()];
    for record in &records {
        let mut row: Vec<String> = record.iter().map(String::from).collect();
        for (slot, &i) in indices.iter().enumerate() {
            totals[slot] += record.get(i).and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0);
            row.push(totals[slot].to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
