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

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod buildings;
pub mod disease;
pub mod ecosystem;
pub mod epidemiology;
pub mod error;
pub mod house;
pub mod household;
pub mod listeners;
pub mod location;
pub mod measures;
pub mod models;
pub mod needs;
pub mod person;
pub mod readers;
pub mod utils;
pub mod worker;
