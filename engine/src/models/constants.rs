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

/// Fraction of time a co-resident spends within 2m of a given housemate.
pub const HOME_INTERACTION_FRACTION: f64 = 0.2;

/// Dimensionless airflow coefficients used by the per-location infection draw.
pub const AIRFLOW_INDOORS: f64 = 0.007;
pub const AIRFLOW_OUTDOORS: f64 = 0.028;

/// Buildings are assumed open 12 hours per day.
pub const MINUTES_OPENED: f64 = 720.0;

pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Corrects the exposure formula from a 4 m2 literature baseline to 1 m2.
pub const BASELINE_AREA_CORRECTION: f64 = 4.0;

/// Effective usable share of park area.
pub const PARK_AREA_MULTIPLIER: f64 = 10.0;

/// Hospitals below this floor area never receive admissions.
pub const MIN_HOSPITAL_SQM: f64 = 4000.0;

/// Weekly minutes booked against the hospital for an admitted patient.
pub const HOSPITAL_CONFINED_MINUTES: f64 = 5040.0;

/// 25% of school time is assumed to be outdoors (PE or breaks).
pub const SCHOOL_INDOOR_FRACTION: f64 = 0.75;

/// Average visit time in minutes, positionally aligned with the building-type
/// indices of the types YAML (park, hospital, supermarket, office, school,
/// leisure, shopping).
pub const AVG_VISIT_TIMES: [f64; 7] = [90.0, 60.0, 60.0, 360.0, 360.0, 60.0, 60.0];
pub const DEFAULT_VISIT_TIME: f64 = 60.0;

/// Monthly infection-rate multipliers, January first.
pub const SEASONAL_MULTIPLIERS: [f64; 12] =
    [1.4, 1.25, 1.1, 0.95, 0.8, 0.7, 0.7, 0.8, 0.95, 1.1, 1.25, 1.4];

/// Job distribution: default, teacher, shop worker, health worker.
pub const JOB_DISTRIBUTION: [f64; 4] = [0.865, 0.015, 0.08, 0.04];

pub const ANTIVAX_FRACTION: f64 = 0.05;

/// Public transport: 30 minutes of travel per day, 15 hours of service.
pub const TRANSPORT_MINUTES_PER_DAY: f64 = 30.0;
pub const TRANSPORT_SERVICE_MINUTES: f64 = 900.0;

/// Infection reduction when masks are widely worn on transport.
pub const TRANSPORT_MASK_FACTOR: f64 = 0.44;

pub const SEEDING_MAX_ATTEMPTS: u32 = 500;

/// Case seeding window: days from infection to hospitalisation and recovery,
/// used when replaying admissions data.
pub const CASE_PERIOD_TO_HOSPITALISATION: i32 = 11;
pub const CASE_PERIOD_TO_RECOVERY: i32 = 25;

/// Background infections seeded per admission record (1 admission per ~16.7
/// infections at a 6% hospitalisation probability).
pub const CASE_BACKGROUND_INFECTIONS: usize = 16;
