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
use std::path::Path;

use crate::error::SimError;
use crate::models::custom_types::Day;

/// Per-worker event files plus the daily event counters. Each worker owns one
/// log, so no write is ever contended.
#[derive(Debug)]
pub struct EventLog {
    writers: Option<EventWriters>,
    pub infections_today: u32,
    pub hospitalisations_today: u32,
    pub deaths_today: u32,
    pub recoveries_today: u32,
}

#[derive(Debug)]
struct EventWriters {
    infections: BufWriter<File>,
    hospitalisations: BufWriter<File>,
    deaths: BufWriter<File>,
    recoveries: BufWriter<File>,
}

fn open_with_header(dir: &Path, name: &str, header: &str) -> Result<BufWriter<File>, SimError> {
    let mut writer = BufWriter::new(File::create(dir.join(name))?);
    writeln!(writer, "{}", header)?;
    Ok(writer)
}

impl EventLog {
    pub fn new(dir: &Path, rank: usize) -> Result<EventLog, SimError> {
        let writers = EventWriters {
            infections: open_with_header(
                dir,
                &format!("covid_out_infections_{}.csv", rank),
                "#time,x,y,location_type,rank,incubation_time",
            )?,
            hospitalisations: open_with_header(
                dir,
                &format!("covid_out_hospitalisations_{}.csv", rank),
                "#time,x,y,age",
            )?,
            deaths: open_with_header(
                dir,
                &format!("covid_out_deaths_{}.csv", rank),
                "#time,x,y,age",
            )?,
            recoveries: open_with_header(
                dir,
                &format!("covid_out_recoveries_{}.csv", rank),
                "#time,x,y,age",
            )?,
        };
        Ok(EventLog {
            writers: Some(writers),
            infections_today: 0,
            hospitalisations_today: 0,
            deaths_today: 0,
            recoveries_today: 0,
        })
    }

    /// Counters only; used by tests and throwaway ecosystems.
    pub fn disabled() -> EventLog {
        EventLog {
            writers: None,
            infections_today: 0,
            hospitalisations_today: 0,
            deaths_today: 0,
            recoveries_today: 0,
        }
    }

    pub fn reset_daily(&mut self) {
        self.infections_today = 0;
        self.hospitalisations_today = 0;
        self.deaths_today = 0;
        self.recoveries_today = 0;
    }

    pub fn log_infection(
        &mut self,
        time: Day,
        x: f64,
        y: f64,
        location_type: &str,
        rank: usize,
        incubation_time: f64,
    ) {
        self.infections_today += 1;
        if let Some(writers) = self.writers.as_mut() {
            writeln!(
                writers.infections,
                "{},{},{},{},{},{}",
                time, x, y, location_type, rank, incubation_time
            )
            .expect("failed to write infection log");
        }
    }

    pub fn log_hospitalisation(&mut self, time: Day, x: f64, y: f64, age: u32) {
        self.hospitalisations_today += 1;
        if let Some(writers) = self.writers.as_mut() {
            writeln!(writers.hospitalisations, "{},{},{},{}", time, x, y, age)
                .expect("failed to write hospitalisation log");
        }
    }

    pub fn log_death(&mut self, time: Day, x: f64, y: f64, age: u32) {
        self.deaths_today += 1;
        if let Some(writers) = self.writers.as_mut() {
            writeln!(writers.deaths, "{},{},{},{}", time, x, y, age)
                .expect("failed to write death log");
        }
    }

    pub fn log_recovery(&mut self, time: Day, x: f64, y: f64, age: u32) {
        self.recoveries_today += 1;
        if let Some(writers) = self.writers.as_mut() {
            writeln!(writers.recoveries, "{},{},{},{}", time, x, y, age)
                .expect("failed to write recovery log");
        }
    }

    pub fn flush(&mut self) {
        if let Some(writers) = self.writers.as_mut() {
            let _ = writers.infections.flush();
            let _ = writers.hospitalisations.flush();
            let _ = writers.deaths.flush();
            let _ = writers.recoveries.flush();
        }
    }
}
