//! nodegate-probe — node capacity probes.
//!
//! Admission needs two point-in-time figures from the host: how much
//! memory is available right now and how many logical CPUs exist. Both
//! come from a [`ResourceProbe`], so the evaluator can run against the
//! real `/proc` files or against fixed values.
//!
//! # Components
//!
//! - **`procfs`** — [`ProcProbe`], reads meminfo/cpuinfo style reports
//! - **`fixed`** — [`StaticProbe`], fixed capacity figures
//! - **`error`** — [`ProbeError`]

pub mod error;
pub mod fixed;
pub mod procfs;

pub use error::{ProbeError, ProbeResult};
pub use fixed::StaticProbe;
pub use procfs::{ProcProbe, count_processors, parse_available_memory};

use nodegate_core::ProbeConfig;

/// A source of current node capacity.
///
/// Implementations are read fresh on every call; nothing is cached.
pub trait ResourceProbe: Send + Sync {
    /// Memory currently available, in kilobytes.
    fn available_memory_kb(&self) -> ProbeResult<u64>;

    /// Total logical CPUs, as fractional CPU units.
    fn total_cpu_units(&self) -> ProbeResult<f64>;
}

impl<P: ResourceProbe + ?Sized> ResourceProbe for Box<P> {
    fn available_memory_kb(&self) -> ProbeResult<u64> {
        (**self).available_memory_kb()
    }

    fn total_cpu_units(&self) -> ProbeResult<f64> {
        (**self).total_cpu_units()
    }
}

impl<P: ResourceProbe + ?Sized> ResourceProbe for std::sync::Arc<P> {
    fn available_memory_kb(&self) -> ProbeResult<u64> {
        (**self).available_memory_kb()
    }

    fn total_cpu_units(&self) -> ProbeResult<f64> {
        (**self).total_cpu_units()
    }
}

/// Build the probe described by an agent's `[probe]` section.
pub fn probe_from_config(config: &ProbeConfig) -> Box<dyn ResourceProbe> {
    match config.fixed() {
        Some((memory_kb, cpu_units)) => {
            tracing::info!(memory_kb, cpu_units, "using fixed capacity probe");
            Box::new(StaticProbe::new(memory_kb, cpu_units))
        }
        None => Box::new(ProcProbe::with_paths(
            &config.meminfo_path,
            &config.cpuinfo_path,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_overrides_select_static_probe() {
        let config = ProbeConfig {
            memory_kb: Some(1024),
            cpu_units: Some(2.0),
            ..Default::default()
        };
        let probe = probe_from_config(&config);
        assert_eq!(probe.available_memory_kb().unwrap(), 1024);
        assert_eq!(probe.total_cpu_units().unwrap(), 2.0);
    }

    #[test]
    fn config_paths_select_proc_probe() {
        let config = ProbeConfig {
            meminfo_path: "/nonexistent/meminfo".into(),
            cpuinfo_path: "/nonexistent/cpuinfo".into(),
            ..Default::default()
        };
        let probe = probe_from_config(&config);
        assert!(matches!(
            probe.available_memory_kb(),
            Err(ProbeError::Unreadable { .. })
        ));
    }
}
