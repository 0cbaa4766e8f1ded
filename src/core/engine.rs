use crate::config::toml_config::ScenarioConfig;
use crate::core::metrics::Metrics;
use crate::core::profile::LoadProfile;
use crate::core::runner::{LoadRunner, DEFAULT_TICK};
use crate::core::scenario::TransferScenario;
use crate::core::summary::RunSummary;
use crate::core::transfer::TransferFactory;
use crate::domain::ports::{LedgerApi, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::Validate;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Exit code for a run whose thresholds failed.
pub const THRESHOLDS_FAILED_EXIT_CODE: i32 = 99;

/// Validates a scenario, runs it against a [`LedgerApi`] and produces the
/// summary.
pub struct LoadEngine<A: LedgerApi + 'static> {
    config: ScenarioConfig,
    api: Arc<A>,
    monitor_enabled: bool,
    tick: Duration,
}

impl<A: LedgerApi + 'static> LoadEngine<A> {
    pub fn new(config: ScenarioConfig, api: A) -> Self {
        Self::new_with_monitoring(config, api, false)
    }

    pub fn new_with_monitoring(config: ScenarioConfig, api: A, monitor_enabled: bool) -> Self {
        Self {
            config,
            api: Arc::new(api),
            monitor_enabled,
            tick: DEFAULT_TICK,
        }
    }

    /// Scheduler resolution; short profiles in tests want a finer tick.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_until(std::future::pending::<()>()).await
    }

    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> Result<RunSummary> {
        self.config.validate()?;
        let thresholds = self.config.parsed_thresholds()?;
        let profile = LoadProfile::new(self.config.stages.clone())?;
        let transfers = TransferFactory::new(
            self.config.transfer.account_ids(),
            self.config.transfer.amount,
            self.config.transfer.currency.clone(),
        )?;

        let metrics = Arc::new(Metrics::new());
        let scenario = TransferScenario::new(
            Arc::clone(&self.api),
            transfers,
            self.config.scenario.health_probability,
            Arc::clone(&metrics),
        );
        let runner = LoadRunner::new(scenario, profile, self.config.scenario.think_time)
            .with_graceful_stop(self.config.scenario.graceful_stop)
            .with_tick(self.tick)
            .with_seed(self.config.scenario.seed)
            .with_monitor(SystemMonitor::new(self.monitor_enabled));

        let started_at = Utc::now();
        let report = runner.run_until(shutdown).await;
        let summary = RunSummary::new(
            &self.config.target.base_url,
            started_at,
            report,
            metrics.snapshot(),
            &thresholds,
        );

        for failed in summary.failed_thresholds() {
            tracing::warn!(
                "❌ Threshold crossed: {} {} (observed {:?})",
                failed.metric,
                failed.expression,
                failed.observed
            );
        }

        Ok(summary)
    }
}

/// Writes the summary JSON through `storage`.
pub async fn export_summary<S: Storage>(storage: &S, path: &str, summary: &RunSummary) -> Result<()> {
    let json = summary.to_json()?;
    storage.write_file(path, json.as_bytes()).await?;
    tracing::info!("📁 Summary exported to: {}", path);
    Ok(())
}
