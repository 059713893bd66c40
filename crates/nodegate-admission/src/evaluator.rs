//! Admission evaluator — can this node run this unit right now?
//!
//! Gates run in a fixed order and the first failure wins:
//!
//! 1. target affinity (pinned machine ID)
//! 2. required machine metadata
//! 3. peers already scheduled locally
//! 4. conflicts with scheduled units
//! 5. available memory (probe)
//! 6. unallocated CPU units (probe)
//!
//! Rejections are ordinary values. A capacity probe that cannot be read
//! or parsed rejects the unit with a reason of its own instead of
//! letting it through.

use std::fmt;

use tracing::{debug, info, warn};

use nodegate_core::Unit;
use nodegate_probe::{ProbeError, ResourceProbe};

use crate::schedule::LocalSchedule;

/// Which capacity figure a probe failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Memory,
    Cpu,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Memory => f.write_str("memory"),
            Resource::Cpu => f.write_str("cpu"),
        }
    }
}

/// Why a unit may not run here.
#[derive(Debug)]
pub enum Rejection {
    TargetMismatch { machine_id: String, required: String },
    MetadataInsufficient,
    PeerNotScheduled { peer: String },
    Conflict { unit: String },
    /// A capacity probe failed; admission fails closed.
    CapacityProbe { resource: Resource, error: ProbeError },
    InsufficientMemory { needed_kb: u64, available_kb: u64 },
    InsufficientCpu { requested: f64, unallocated: f64 },
    /// A unit of the same name is already placed here (admission only).
    AlreadyScheduled { unit: String },
}

impl Rejection {
    /// True for rejections caused by the node's own plumbing rather than
    /// by the unit's constraints or current load.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Rejection::CapacityProbe { .. })
    }

    /// Short gate name for logs.
    pub fn gate(&self) -> &'static str {
        match self {
            Rejection::TargetMismatch { .. } => "target",
            Rejection::MetadataInsufficient => "metadata",
            Rejection::PeerNotScheduled { .. } => "peers",
            Rejection::Conflict { .. } => "conflicts",
            Rejection::CapacityProbe { .. } => "probe",
            Rejection::InsufficientMemory { .. } => "memory",
            Rejection::InsufficientCpu { .. } => "cpu",
            Rejection::AlreadyScheduled { .. } => "duplicate",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TargetMismatch {
                machine_id,
                required,
            } => write!(
                f,
                "agent ID {machine_id:?} does not match required {required:?}"
            ),
            Rejection::MetadataInsufficient => f.write_str("local machine metadata insufficient"),
            Rejection::PeerNotScheduled { peer } => {
                write!(f, "required peer unit {peer} is not scheduled locally")
            }
            Rejection::Conflict { unit } => {
                write!(f, "found conflict with locally-scheduled unit {unit}")
            }
            Rejection::CapacityProbe { resource, error } if error.is_unreadable() => {
                write!(f, "could not read {resource} capacity: {error}")
            }
            Rejection::CapacityProbe { resource, error } => {
                write!(f, "{resource} capacity report is malformed: {error}")
            }
            Rejection::InsufficientMemory {
                needed_kb,
                available_kb,
            } => write!(
                f,
                "not enough memory to run unit (needs {needed_kb} kB, {available_kb} kB available)"
            ),
            Rejection::InsufficientCpu {
                requested,
                unallocated,
            } => write!(
                f,
                "not enough CPU units left to allocate (requested {requested}, {unallocated} unallocated)"
            ),
            Rejection::AlreadyScheduled { unit } => {
                write!(f, "unit {unit} is already scheduled locally")
            }
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug)]
pub enum Decision {
    Admit,
    Reject(Rejection),
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Decision::Admit => None,
            Decision::Reject(rejection) => Some(rejection),
        }
    }

    /// Human-readable reason; empty when admitted.
    pub fn reason(&self) -> String {
        self.rejection().map(ToString::to_string).unwrap_or_default()
    }
}

impl From<Result<(), Rejection>> for Decision {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Decision::Admit,
            Err(rejection) => Decision::Reject(rejection),
        }
    }
}

/// Runs the gate chain against a schedule, reading capacity from `P`.
#[derive(Debug, Clone)]
pub struct Evaluator<P> {
    probe: P,
}

impl<P: ResourceProbe> Evaluator<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Decide whether `unit` may run on the node described by `schedule`.
    pub fn can_run(&self, schedule: &LocalSchedule, unit: &Unit) -> Decision {
        let result = self.check(schedule, unit);
        if let Err(rejection) = &result {
            debug!(
                unit = %unit.name,
                gate = rejection.gate(),
                reason = %rejection,
                "unit rejected"
            );
        }
        result.into()
    }

    fn check(&self, schedule: &LocalSchedule, unit: &Unit) -> Result<(), Rejection> {
        check_target(schedule, unit)?;
        check_metadata(schedule, unit)?;
        check_peers(schedule, unit)?;
        check_conflicts(schedule, unit)?;
        self.check_memory(unit)?;
        self.check_cpu(schedule, unit)
    }

    fn check_memory(&self, unit: &Unit) -> Result<(), Rejection> {
        let available_kb = self.probe.available_memory_kb().map_err(|error| {
            warn!(unit = %unit.name, error = %error, "memory capacity probe failed");
            Rejection::CapacityProbe {
                resource: Resource::Memory,
                error,
            }
        })?;

        let needed_kb = unit.needed_memory();
        if available_kb < needed_kb {
            info!(
                unit = %unit.name,
                short_by_kb = needed_kb - available_kb,
                "not enough memory to run unit"
            );
            return Err(Rejection::InsufficientMemory {
                needed_kb,
                available_kb,
            });
        }
        Ok(())
    }

    fn check_cpu(&self, schedule: &LocalSchedule, unit: &Unit) -> Result<(), Rejection> {
        let total = self.probe.total_cpu_units().map_err(|error| {
            warn!(unit = %unit.name, error = %error, "cpu capacity probe failed");
            Rejection::CapacityProbe {
                resource: Resource::Cpu,
                error,
            }
        })?;

        let unallocated = total - schedule.allocated_cpu_units();
        let requested = unit.requested_cpu_units();
        // NaN on either side never fits.
        let fits = unallocated >= requested;
        if !fits {
            info!(
                unit = %unit.name,
                short_by = requested - unallocated,
                "not enough CPU units left to allocate"
            );
            return Err(Rejection::InsufficientCpu {
                requested,
                unallocated,
            });
        }
        Ok(())
    }
}

fn check_target(schedule: &LocalSchedule, unit: &Unit) -> Result<(), Rejection> {
    match unit.required_target() {
        Some(required) if !schedule.machine().match_id(required) => {
            Err(Rejection::TargetMismatch {
                machine_id: schedule.machine().id.clone(),
                required: required.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn check_metadata(schedule: &LocalSchedule, unit: &Unit) -> Result<(), Rejection> {
    let required = unit.required_target_metadata();
    if !required.is_empty() && !schedule.machine().has_metadata(required) {
        return Err(Rejection::MetadataInsufficient);
    }
    Ok(())
}

fn check_peers(schedule: &LocalSchedule, unit: &Unit) -> Result<(), Rejection> {
    match unit.peers().iter().find(|peer| !schedule.is_scheduled(peer)) {
        Some(peer) => Err(Rejection::PeerNotScheduled { peer: peer.clone() }),
        None => Ok(()),
    }
}

fn check_conflicts(schedule: &LocalSchedule, unit: &Unit) -> Result<(), Rejection> {
    match schedule.has_conflict(&unit.name, unit.conflicts()) {
        Some(conflict) => Err(Rejection::Conflict {
            unit: conflict.to_string(),
        }),
        None => Ok(()),
    }
}
