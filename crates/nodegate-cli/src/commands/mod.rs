pub mod check;
pub mod plan;

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use nodegate_admission::{AdmissionAgent, Decision, LocalSchedule};
use nodegate_core::{AgentConfig, Unit, config::validate_cpu_units};
use nodegate_probe::{ResourceProbe, probe_from_config};

pub type Agent = AdmissionAgent<Box<dyn ResourceProbe>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One decision as printed to the operator.
#[derive(Debug, Serialize)]
pub struct DecisionReport {
    pub unit: String,
    pub admitted: bool,
    pub reason: String,
    pub infrastructure: bool,
}

impl DecisionReport {
    pub fn new(unit: &str, decision: &Decision) -> Self {
        Self {
            unit: unit.to_string(),
            admitted: decision.is_admitted(),
            reason: decision.reason(),
            infrastructure: decision.rejection().is_some_and(|r| r.is_infrastructure()),
        }
    }

    fn to_text(&self) -> String {
        if self.admitted {
            format!("ADMITTED  {}", self.unit)
        } else {
            format!("REJECTED  {}: {}", self.unit, self.reason)
        }
    }
}

pub fn render(reports: &[DecisionReport], format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Text => reports
            .iter()
            .map(DecisionReport::to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => match reports {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        },
    })
}

/// Build the admission agent from an agent config file.
pub fn load_agent(config_path: &Path) -> anyhow::Result<Agent> {
    let config = AgentConfig::from_file(config_path)?;

    let mut schedule = LocalSchedule::new(config.machine);
    for unit in config.units {
        schedule.schedule(unit);
    }
    tracing::info!(
        machine = %schedule.machine().id,
        scheduled = schedule.len(),
        "loaded local schedule"
    );

    Ok(AdmissionAgent::new(schedule, probe_from_config(&config.probe)))
}

pub fn load_unit(path: &Path) -> anyhow::Result<Unit> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let unit: Unit =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    validate_cpu_units(&unit)?;
    Ok(unit)
}
