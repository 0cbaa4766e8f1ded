#[cfg(feature = "cli")]
use parking_lot::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// Load generator process usage, sampled at stage boundaries.
#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ClientStats {
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed: Duration,
    /// Requests sent since the previous sample.
    pub requests: u64,
    pub requests_per_sec: f64,
}

#[cfg(feature = "cli")]
struct Sample {
    at: Instant,
    http_reqs: u64,
    peak_memory_mb: u64,
}

/// Samples the load generator's own process, so a saturated client can be
/// told apart from a slow target.
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    last: Mutex<Sample>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        // 停用時不做任何取樣
        let system = if enabled {
            System::new_with_specifics(RefreshKind::everything())
        } else {
            System::new()
        };
        let start_time = Instant::now();

        Self {
            system: Mutex::new(system),
            pid: sysinfo::get_current_pid().ok(),
            start_time,
            last: Mutex::new(Sample {
                at: start_time,
                http_reqs: 0,
                peak_memory_mb: 0,
            }),
            enabled,
        }
    }

    /// `http_reqs` is the run's running request total.
    pub fn sample(&self, http_reqs: u64) -> Option<ClientStats> {
        if !self.enabled {
            return None;
        }

        let (cpu_usage, memory_mb) = {
            let mut system = self.system.lock();
            system.refresh_all();
            let process = system.process(self.pid?)?;
            (process.cpu_usage(), process.memory() / 1024 / 1024)
        };

        let now = Instant::now();
        let mut last = self.last.lock();
        let requests = http_reqs.saturating_sub(last.http_reqs);
        let requests_per_sec = throughput(requests, now - last.at);
        last.at = now;
        last.http_reqs = http_reqs;
        last.peak_memory_mb = last.peak_memory_mb.max(memory_mb);

        Some(ClientStats {
            cpu_usage,
            memory_mb,
            peak_memory_mb: last.peak_memory_mb,
            elapsed: self.start_time.elapsed(),
            requests,
            requests_per_sec,
        })
    }

    pub fn log_stats(&self, phase: &str, http_reqs: u64) {
        if let Some(stats) = self.sample(http_reqs) {
            tracing::info!(
                "📊 {} - {} reqs ({:.1}/s) since last sample, CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.requests,
                stats.requests_per_sec,
                stats.cpu_usage,
                stats.memory_mb,
                stats.peak_memory_mb,
                stats.elapsed
            );
        }
    }

    pub fn log_final_stats(&self, http_reqs: u64) {
        if let Some(stats) = self.sample(http_reqs) {
            tracing::info!(
                "📊 Client totals - {} reqs in {:?} ({:.1}/s), Peak Memory: {}MB",
                http_reqs,
                stats.elapsed,
                throughput(http_reqs, stats.elapsed),
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(feature = "cli")]
fn throughput(requests: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        requests as f64 / secs
    } else {
        0.0
    }
}

// 非 CLI 建置沒有 sysinfo，提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str, _http_reqs: u64) {}

    pub fn log_final_stats(&self, _http_reqs: u64) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
