//! Local schedule — this node's identity and the units placed on it.
//!
//! The schedule carries no synchronization of its own. Evaluation reads
//! it several times (peers, conflicts, CPU accounting), so callers that
//! mutate it concurrently must serialize access; see
//! [`AdmissionAgent`](crate::agent::AdmissionAgent).

use std::collections::HashMap;

use nodegate_core::{MachineState, Unit};

use crate::glob::glob_matches;

#[derive(Debug, Clone)]
pub struct LocalSchedule {
    machine: MachineState,
    /// Unit name → unit. Keys always equal the unit's own name.
    units: HashMap<String, Unit>,
}

impl LocalSchedule {
    pub fn new(machine: MachineState) -> Self {
        Self {
            machine,
            units: HashMap::new(),
        }
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    /// Place a unit, replacing (and returning) any unit of the same name.
    pub fn schedule(&mut self, unit: Unit) -> Option<Unit> {
        self.units.insert(unit.name.clone(), unit)
    }

    pub fn unschedule(&mut self, name: &str) -> Option<Unit> {
        self.units.remove(name)
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Sum of CPU units requested by every scheduled unit.
    pub fn allocated_cpu_units(&self) -> f64 {
        self.units.values().map(Unit::requested_cpu_units).sum()
    }

    /// Find a scheduled unit that conflicts with a candidate.
    ///
    /// A conflict exists when one of `conflicts` matches a scheduled
    /// unit's name, or one of that unit's own patterns matches
    /// `candidate`. A scheduled unit named `candidate` is never compared
    /// against itself. When several units conflict, which one is
    /// returned is unspecified.
    pub fn has_conflict(&self, candidate: &str, conflicts: &[String]) -> Option<&str> {
        self.units
            .values()
            .filter(|existing| existing.name != candidate)
            .find(|existing| {
                conflicts
                    .iter()
                    .any(|pattern| glob_matches(pattern, &existing.name))
                    || existing
                        .conflicts()
                        .iter()
                        .any(|pattern| glob_matches(pattern, candidate))
            })
            .map(|existing| existing.name.as_str())
    }
}
