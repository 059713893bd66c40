//! Machine identity and unit descriptors.
//!
//! A [`Unit`] describes one schedulable workload. The same shape is used
//! for units already placed on this node and for candidate jobs that are
//! being considered for admission.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Unique identifier for a machine in the cluster.
pub type MachineId = String;

/// Number of leading characters of a machine ID that form its short ID.
const SHORT_ID_LEN: usize = 8;

/// Required metadata: each key maps to the set of acceptable values.
pub type MetadataRequirement = HashMap<String, BTreeSet<String>>;

// ── Machine ───────────────────────────────────────────────────────

/// Identity of the machine the local agent runs on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MachineState {
    pub id: MachineId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    /// Operator-assigned key/value metadata (region, disk type, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl MachineState {
    pub fn new(id: impl Into<MachineId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The abbreviated machine ID shown to operators.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// Whether `target` names this machine, by full or short ID.
    pub fn match_id(&self, target: &str) -> bool {
        self.id == target || self.short_id() == target
    }

    /// Whether this machine satisfies every key of `required`.
    ///
    /// For each key the machine must carry that key, with a value that is
    /// one of the acceptable values. An empty requirement always holds.
    pub fn has_metadata(&self, required: &MetadataRequirement) -> bool {
        required.iter().all(|(key, accepted)| {
            self.metadata
                .get(key)
                .is_some_and(|value| accepted.contains(value))
        })
    }
}

// ── Unit ──────────────────────────────────────────────────────────

/// Resources a unit asks for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UnitResources {
    /// Fractional logical CPUs.
    #[serde(default)]
    pub cpu_units: f64,
    /// Memory in kilobytes, the unit the memory probe reports in.
    #[serde(default)]
    pub memory_kb: u64,
}

/// A schedulable workload and its placement constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Unit {
    pub name: String,
    /// Glob patterns naming units this one must never share a node with.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Units that must already be on this node.
    #[serde(default)]
    pub peers: Vec<String>,
    /// Machine this unit is pinned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<MachineId>,
    #[serde(default)]
    pub metadata: MetadataRequirement,
    #[serde(default)]
    pub resources: UnitResources,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_conflict(mut self, pattern: impl Into<String>) -> Self {
        self.conflicts.push(pattern.into());
        self
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peers.push(peer.into());
        self
    }

    pub fn with_target(mut self, machine_id: impl Into<MachineId>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    pub fn with_metadata<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.metadata
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_cpu_units(mut self, cpu_units: f64) -> Self {
        self.resources.cpu_units = cpu_units;
        self
    }

    pub fn with_memory_kb(mut self, memory_kb: u64) -> Self {
        self.resources.memory_kb = memory_kb;
        self
    }

    pub fn required_target(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    pub fn required_target_metadata(&self) -> &MetadataRequirement {
        &self.metadata
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    pub fn needed_memory(&self) -> u64 {
        self.resources.memory_kb
    }

    pub fn requested_cpu_units(&self) -> f64 {
        self.resources.cpu_units
    }
}
