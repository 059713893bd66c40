//! Agent configuration file (`nodegate.toml`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{MachineState, Unit};

pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";
pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Errors raised while loading or validating an [`AgentConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("machine id must not be empty")]
    EmptyMachineId,

    #[error("unit {0} is listed more than once")]
    DuplicateUnit(String),

    #[error("unit {name} requests an invalid cpu_units value {value}")]
    InvalidCpuUnits { name: String, value: f64 },

    #[error("probe override cpu_units must be a finite, non-negative number, got {0}")]
    InvalidProbeCpuUnits(f64),

    #[error("probe overrides memory_kb and cpu_units must be set together")]
    PartialProbeOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub machine: MachineState,
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Units already scheduled on this node when the agent starts.
    #[serde(default)]
    pub units: Vec<Unit>,
}

/// Where capacity figures come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    #[serde(default = "default_meminfo_path")]
    pub meminfo_path: PathBuf,
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,
    /// Fixed available memory in kB, replacing the meminfo report.
    #[serde(default)]
    pub memory_kb: Option<u64>,
    /// Fixed CPU count, replacing the cpuinfo report.
    #[serde(default)]
    pub cpu_units: Option<f64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            meminfo_path: default_meminfo_path(),
            cpuinfo_path: default_cpuinfo_path(),
            memory_kb: None,
            cpu_units: None,
        }
    }
}

impl ProbeConfig {
    /// Fixed capacity figures, when both overrides are configured.
    pub fn fixed(&self) -> Option<(u64, f64)> {
        self.memory_kb.zip(self.cpu_units)
    }
}

fn default_meminfo_path() -> PathBuf {
    PathBuf::from(DEFAULT_MEMINFO_PATH)
}

fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from(DEFAULT_CPUINFO_PATH)
}

impl AgentConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AgentConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.machine.id.trim().is_empty() {
            return Err(ConfigError::EmptyMachineId);
        }

        if self.probe.memory_kb.is_some() != self.probe.cpu_units.is_some() {
            return Err(ConfigError::PartialProbeOverride);
        }
        if let Some(cpu_units) = self.probe.cpu_units {
            if !cpu_units.is_finite() || cpu_units < 0.0 {
                return Err(ConfigError::InvalidProbeCpuUnits(cpu_units));
            }
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.name.as_str()) {
                return Err(ConfigError::DuplicateUnit(unit.name.clone()));
            }
            validate_cpu_units(unit)?;
        }
        Ok(())
    }
}

/// Reject CPU requests that would poison the allocation sum.
pub fn validate_cpu_units(unit: &Unit) -> Result<(), ConfigError> {
    let value = unit.requested_cpu_units();
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidCpuUnits {
            name: unit.name.clone(),
            value,
        });
    }
    Ok(())
}
