use crate::core::metrics::Metrics;
use crate::core::profile::LoadProfile;
use crate::core::scenario::TransferScenario;
use crate::domain::ports::LedgerApi;
use crate::utils::monitor::SystemMonitor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub elapsed: Duration,
    /// Stopped by the shutdown signal before the profile finished.
    pub interrupted: bool,
    /// VUs still busy after the graceful-stop window.
    pub aborted_vus: usize,
}

struct VirtualUser {
    id: u64,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl VirtualUser {
    fn signal_stop(self) -> JoinHandle<()> {
        // the receiver may already be gone if the task exited
        let _ = self.stop.send(true);
        tracing::trace!(vu = self.id, "stop signalled");
        self.handle
    }
}

/// Drives a [`LoadProfile`]: spawns and retires virtual users so the active
/// count follows the profile, each one looping over the scenario.
pub struct LoadRunner<A: LedgerApi + 'static> {
    scenario: Arc<TransferScenario<A>>,
    profile: LoadProfile,
    think_time: Duration,
    graceful_stop: Duration,
    tick: Duration,
    seed: Option<u64>,
    monitor: SystemMonitor,
}

impl<A: LedgerApi + 'static> LoadRunner<A> {
    pub fn new(scenario: TransferScenario<A>, profile: LoadProfile, think_time: Duration) -> Self {
        Self {
            scenario: Arc::new(scenario),
            profile,
            think_time,
            graceful_stop: Duration::from_secs(30),
            tick: DEFAULT_TICK,
            seed: None,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Makes account selection and health sampling reproducible per VU.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.scenario.metrics()
    }

    pub async fn run(&self) -> RunReport {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs the profile to completion or until `shutdown` resolves.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> RunReport {
        let start = Instant::now();
        let total = self.profile.total_duration();
        let metrics = Arc::clone(self.scenario.metrics());

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut active: Vec<VirtualUser> = Vec::new();
        let mut draining: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id = 0u64;
        let mut current_stage = None;
        let mut interrupted = false;

        tracing::info!(
            "🚀 Starting load run: {} stages, {:?} total, up to {} VUs",
            self.profile.stages().len(),
            total,
            self.profile.max_target()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    tracing::warn!("🛑 Shutdown requested, stopping virtual users");
                    interrupted = true;
                    break;
                }
            }

            let elapsed = start.elapsed();
            let stage = self.profile.stage_index_at(elapsed);
            if stage != current_stage {
                if let Some(index) = stage {
                    tracing::info!(
                        "⏱️ Stage {}/{}: {}",
                        index + 1,
                        self.profile.stages().len(),
                        self.profile.stages()[index]
                    );
                    self.monitor
                        .log_stats(&format!("Stage {}", index + 1), metrics.http_reqs());
                }
                current_stage = stage;
            }
            if stage.is_none() {
                break;
            }

            let target = self.profile.target_at(elapsed) as usize;
            while active.len() < target {
                active.push(self.spawn_vu(next_id));
                next_id += 1;
            }
            while active.len() > target {
                if let Some(vu) = active.pop() {
                    draining.push(vu.signal_stop());
                }
            }
            draining.retain(|handle| !handle.is_finished());
            metrics.set_active_vus(active.len());
        }

        draining.extend(active.drain(..).map(VirtualUser::signal_stop));
        let aborted_vus = self.drain(draining).await;
        metrics.set_active_vus(0);
        self.monitor.log_final_stats(metrics.http_reqs());

        let report = RunReport {
            elapsed: start.elapsed(),
            interrupted,
            aborted_vus,
        };
        tracing::info!(
            "🏁 Load run finished after {:?} ({} VUs spawned, {} aborted)",
            report.elapsed,
            next_id,
            aborted_vus
        );
        report
    }

    fn spawn_vu(&self, id: u64) -> VirtualUser {
        let (stop, stop_rx) = watch::channel(false);
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let handle = tokio::spawn(vu_loop(
            id,
            Arc::clone(&self.scenario),
            self.think_time,
            stop_rx,
            rng,
        ));
        tracing::trace!(vu = id, "spawned");
        VirtualUser { id, stop, handle }
    }

    /// Waits for stopping VUs to finish their iteration, aborting the rest
    /// once the graceful-stop window closes. Returns how many were aborted.
    async fn drain(&self, handles: Vec<JoinHandle<()>>) -> usize {
        let deadline = Instant::now() + self.graceful_stop;
        let mut aborted = 0;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            tracing::warn!(
                "⚠️ {} virtual users did not finish within {:?} and were aborted",
                aborted,
                self.graceful_stop
            );
        }
        aborted
    }
}

async fn vu_loop<A: LedgerApi>(
    id: u64,
    scenario: Arc<TransferScenario<A>>,
    think_time: Duration,
    mut stop: watch::Receiver<bool>,
    mut rng: StdRng,
) {
    loop {
        if *stop.borrow() {
            break;
        }
        scenario.iteration(&mut rng).await;

        tokio::select! {
            _ = tokio::time::sleep(think_time) => {}
            // a closed channel means the runner is gone too
            _ = stop.changed() => break,
        }
    }
    tracing::trace!(vu = id, "exited");
}
