use std::path::Path;
use std::process::ExitCode;

use super::{DecisionReport, OutputFormat, load_agent, load_unit, render};

/// Exit status reported when the candidate is rejected.
pub const REJECTED: u8 = 2;

pub async fn check(config: &Path, job: &Path, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let report = evaluate(config, job).await?;
    println!("{}", render(std::slice::from_ref(&report), format)?);

    Ok(ExitCode::from(exit_status(&report)))
}

fn exit_status(report: &DecisionReport) -> u8 {
    if report.admitted { 0 } else { REJECTED }
}

async fn evaluate(config: &Path, job: &Path) -> anyhow::Result<DecisionReport> {
    let agent = load_agent(config)?;
    let unit = load_unit(job)?;
    let decision = agent.can_run(&unit).await;
    Ok(DecisionReport::new(&unit.name, &decision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testutil::*;

    #[tokio::test]
    async fn admits_fitting_unit() {
        let config = agent_config("");
        let job = write_file("name = \"web\"\n[resources]\nmemory_kb = 512\ncpu_units = 1.0\n");

        let report = evaluate(config.path(), job.path()).await.unwrap();
        assert!(report.admitted);
        assert!(report.reason.is_empty());
    }

    #[tokio::test]
    async fn rejects_with_reason() {
        let config = agent_config("[[units]]\nname = \"db\"\nconflicts = [\"web*\"]\n");
        let job = write_file("name = \"web\"\n");

        let report = evaluate(config.path(), job.path()).await.unwrap();
        assert!(!report.admitted);
        assert!(report.reason.contains("db"));
        assert!(!report.infrastructure);
    }

    #[tokio::test]
    async fn exit_status_follows_the_decision() {
        let config = agent_config("");
        let fits = write_file("name = \"web\"\n[resources]\ncpu_units = 1.0\n");
        let too_big = write_file("name = \"batch\"\n[resources]\ncpu_units = 8.0\n");

        let admitted = check(config.path(), fits.path(), OutputFormat::Text).await.unwrap();
        assert_eq!(format!("{admitted:?}"), format!("{:?}", ExitCode::SUCCESS));

        let rejected = check(config.path(), too_big.path(), OutputFormat::Json).await.unwrap();
        assert_eq!(format!("{rejected:?}"), format!("{:?}", ExitCode::from(REJECTED)));

        let report = evaluate(config.path(), too_big.path()).await.unwrap();
        assert_eq!(exit_status(&report), 2);
    }

    #[tokio::test]
    async fn check_does_not_place_the_unit() {
        let config = agent_config("");
        let job = write_file("name = \"web\"\n");

        let agent = load_agent(config.path()).unwrap();
        let unit = load_unit(job.path()).unwrap();
        assert!(agent.can_run(&unit).await.is_admitted());
        assert!(agent.scheduled_units().await.is_empty());
    }
}
