use std::collections::HashSet;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::info;

use nodegate_core::{Unit, config::validate_cpu_units};

use super::{DecisionReport, OutputFormat, load_agent, render};

#[derive(Debug, Deserialize)]
struct JobsFile {
    #[serde(default)]
    jobs: Vec<Unit>,
}

pub async fn plan(config: &Path, jobs: &Path, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let reports = run(config, jobs).await?;
    println!("{}", render(&reports, format)?);
    Ok(ExitCode::SUCCESS)
}

async fn run(config: &Path, jobs: &Path) -> anyhow::Result<Vec<DecisionReport>> {
    let agent = load_agent(config)?;
    let candidates = load_jobs(jobs)?;

    let mut reports = Vec::with_capacity(candidates.len());
    for unit in candidates {
        let name = unit.name.clone();
        let decision = agent.admit(unit).await;
        reports.push(DecisionReport::new(&name, &decision));
    }

    let admitted = reports.iter().filter(|r| r.admitted).count();
    info!(
        admitted,
        rejected = reports.len() - admitted,
        allocated_cpu_units = agent.allocated_cpu_units().await,
        "plan complete"
    );
    Ok(reports)
}

fn load_jobs(path: &Path) -> anyhow::Result<Vec<Unit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: JobsFile =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    let mut seen = HashSet::new();
    for unit in &file.jobs {
        if !seen.insert(unit.name.as_str()) {
            bail!("job {} is listed more than once in {}", unit.name, path.display());
        }
        validate_cpu_units(unit)?;
    }
    Ok(file.jobs)
}
