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

use crate::models::custom_types::Day;
use crate::models::events::Counts;

pub trait Listener {
    fn counts_updated(&mut self, counts: &Counts, date: &str);

    fn intervention_applied(&mut self, _time: Day, _name: &str, _detail: &serde_json::Value) {}

    fn simulation_ended(&mut self);

    fn as_any(&self) -> &dyn Any;
}

pub struct Listeners {
    listeners: Vec<Box<dyn Listener>>,
}

impl Listeners {
    pub fn from(listeners: Vec<Box<dyn Listener>>) -> Listeners {
        Listeners { listeners }
    }

    pub fn get(&self, index: usize) -> Option<&dyn Listener> {
        self.listeners.get(index).map(|l| l.as_ref())
    }
}

impl Listener for Listeners {
    fn counts_updated(&mut self, counts: &Counts, date: &str) {
        self.listeners.iter_mut().for_each(|listener| listener.counts_updated(counts, date));
    }

    fn intervention_applied(&mut self, time: Day, name: &str, detail: &serde_json::Value) {
        self.listeners
            .iter_mut()
            .for_each(|listener| listener.intervention_applied(time, name, detail));
    }

    fn simulation_ended(&mut self) {
        self.listeners.iter_mut().for_each(|listener| listener.simulation_ended());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
