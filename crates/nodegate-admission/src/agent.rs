//! Admission agent — serialized access to the local schedule.
//!
//! Holds the schedule behind an async read/write lock so that an
//! evaluation always sees one consistent snapshot:
//!
//! - `can_run` keeps the read lock for the whole gate chain
//! - `admit` keeps the write lock across evaluation and placement, so
//!   two concurrent admissions cannot both claim the same capacity
//! - `schedule` / `unschedule` are the reconciliation-side mutations

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use nodegate_core::Unit;
use nodegate_probe::ResourceProbe;

use crate::evaluator::{Decision, Evaluator, Rejection};
use crate::schedule::LocalSchedule;

pub struct AdmissionAgent<P> {
    evaluator: Evaluator<P>,
    schedule: RwLock<LocalSchedule>,
}

impl<P: ResourceProbe> AdmissionAgent<P> {
    pub fn new(schedule: LocalSchedule, probe: P) -> Self {
        Self {
            evaluator: Evaluator::new(probe),
            schedule: RwLock::new(schedule),
        }
    }

    /// Evaluate a candidate without placing it.
    pub async fn can_run(&self, unit: &Unit) -> Decision {
        let schedule = self.schedule.read().await;
        self.evaluator.can_run(&schedule, unit)
    }

    /// Evaluate a candidate and, if admitted, place it on this node.
    ///
    /// A name that is already scheduled is rejected; replacing a placed
    /// unit goes through `unschedule` and `schedule`.
    pub async fn admit(&self, unit: Unit) -> Decision {
        let mut schedule = self.schedule.write().await;
        if schedule.is_scheduled(&unit.name) {
            warn!(unit = %unit.name, "unit already scheduled, not admitting again");
            return Decision::Reject(Rejection::AlreadyScheduled { unit: unit.name });
        }
        let decision = self.evaluator.can_run(&schedule, &unit);
        if decision.is_admitted() {
            info!(
                unit = %unit.name,
                cpu_units = unit.requested_cpu_units(),
                memory_kb = unit.needed_memory(),
                "unit admitted"
            );
            schedule.schedule(unit);
        }
        decision
    }

    /// Place a unit without evaluation (reconciliation path).
    pub async fn schedule(&self, unit: Unit) -> Option<Unit> {
        debug!(unit = %unit.name, "unit scheduled");
        self.schedule.write().await.schedule(unit)
    }

    pub async fn unschedule(&self, name: &str) -> Option<Unit> {
        let removed = self.schedule.write().await.unschedule(name);
        if removed.is_some() {
            debug!(unit = %name, "unit unscheduled");
        }
        removed
    }

    /// Names of all scheduled units, sorted.
    pub async fn scheduled_units(&self) -> Vec<String> {
        let schedule = self.schedule.read().await;
        let mut names: Vec<String> = schedule.units().map(|u| u.name.clone()).collect();
        names.sort();
        names
    }

    pub async fn allocated_cpu_units(&self) -> f64 {
        self.schedule.read().await.allocated_cpu_units()
    }

    pub fn into_schedule(self) -> LocalSchedule {
        self.schedule.into_inner()
    }
}
