pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::model::Stage;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::{path::PathBuf, time::Duration};
#[cfg(feature = "cli")]
use toml_config::ScenarioConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "ledger-loadgen")]
#[command(about = "Load generator for the distributed ledger transfer API")]
pub struct CliConfig {
    /// Path to a TOML scenario file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ledger base URL
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Ramping stage as <duration>:<target>, repeatable (e.g. --stage 30s:10 --stage 1m:50)
    #[arg(long = "stage")]
    pub stages: Vec<Stage>,

    /// Pause between iterations of one virtual user
    #[arg(long, value_parser = humantime::parse_duration)]
    pub think_time: Option<Duration>,

    /// Fraction of iterations that also probe /api/v1/health
    #[arg(long)]
    pub health_probability: Option<f64>,

    /// Seed for reproducible account selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the end-of-run summary as JSON to this path
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log process CPU/memory at each stage
    #[arg(long)]
    pub monitor: bool,

    /// Show the resolved scenario without sending any traffic
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Scenario file (or the ledger defaults) with command-line overrides on top.
    pub fn resolve(&self) -> Result<ScenarioConfig> {
        let mut scenario = match &self.config {
            Some(path) => ScenarioConfig::from_file(path)?,
            None => ScenarioConfig::ledger_default(),
        };

        if let Some(base_url) = &self.base_url {
            scenario.target.base_url = base_url.clone();
        }
        if !self.stages.is_empty() {
            scenario.stages = self.stages.clone();
        }
        if let Some(think_time) = self.think_time {
            scenario.scenario.think_time = think_time;
        }
        if let Some(probability) = self.health_probability {
            scenario.scenario.health_probability = probability;
        }
        if self.seed.is_some() {
            scenario.scenario.seed = self.seed;
        }

        Ok(scenario)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_override_scenario_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[target]
base_url = "http://from-file:8080"

[scenario]
health_probability = 0.3
"#,
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "ledger-loadgen",
            "--config",
            file.path().to_str().unwrap(),
            "--base-url",
            "http://from-flag:8080",
            "--stage",
            "5s:2",
            "--stage",
            "5s:0",
            "--think-time",
            "100ms",
        ]);
        let scenario = cli.resolve().unwrap();

        assert_eq!(scenario.target.base_url, "http://from-flag:8080");
        assert_eq!(scenario.scenario.health_probability, 0.3);
        assert_eq!(scenario.scenario.think_time, Duration::from_millis(100));
        assert_eq!(scenario.stages.len(), 2);
        assert_eq!(scenario.max_vus(), 2);
    }

    #[test]
    fn test_no_flags_gives_ledger_defaults() {
        let cli = CliConfig::parse_from(["ledger-loadgen"]);
        let mut scenario = cli.resolve().unwrap();
        // BASE_URL may be set in the environment running the tests
        scenario.target.base_url = toml_config::DEFAULT_BASE_URL.to_string();
        assert_eq!(scenario, ScenarioConfig::ledger_default());
    }

    #[test]
    fn test_bad_stage_flag_is_rejected() {
        let result = CliConfig::try_parse_from(["ledger-loadgen", "--stage", "fast:10"]);
        assert!(result.is_err());
    }
}
