//! Fixed-value probe.

use crate::{ProbeResult, ResourceProbe};

/// Reports the same capacity on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticProbe {
    memory_kb: u64,
    cpu_units: f64,
}

impl StaticProbe {
    pub fn new(memory_kb: u64, cpu_units: f64) -> Self {
        Self {
            memory_kb,
            cpu_units,
        }
    }
}

impl ResourceProbe for StaticProbe {
    fn available_memory_kb(&self) -> ProbeResult<u64> {
        Ok(self.memory_kb)
    }

    fn total_cpu_units(&self) -> ProbeResult<f64> {
        Ok(self.cpu_units)
    }
}
