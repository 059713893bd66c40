//! nodegate-admission — node-local admission control.
//!
//! Answers one question for a node agent: can THIS node run THIS unit
//! right now? It is a greedy, local test; nothing here looks at other
//! nodes.
//!
//! # Components
//!
//! - **`schedule`** — [`LocalSchedule`], the node identity plus its placed units
//! - **`glob`** — shell-style conflict patterns
//! - **`evaluator`** — the ordered gate chain producing a [`Decision`]
//! - **`agent`** — [`AdmissionAgent`], lock-guarded evaluate-and-place
//!
//! # Example
//!
//! ```
//! use nodegate_admission::{Evaluator, LocalSchedule};
//! use nodegate_core::{MachineState, Unit};
//! use nodegate_probe::StaticProbe;
//!
//! let mut schedule = LocalSchedule::new(MachineState::new("node-1"));
//! schedule.schedule(Unit::new("db.service").with_cpu_units(1.0));
//!
//! let evaluator = Evaluator::new(StaticProbe::new(4 * 1024 * 1024, 2.0));
//! let web = Unit::new("web.service").with_peer("db.service").with_cpu_units(0.5);
//! assert!(evaluator.can_run(&schedule, &web).is_admitted());
//! ```

pub mod agent;
pub mod evaluator;
pub mod glob;
pub mod schedule;

pub use agent::AdmissionAgent;
pub use evaluator::{Decision, Evaluator, Rejection, Resource};
pub use glob::{Glob, GlobError, glob_matches};
pub use schedule::LocalSchedule;
