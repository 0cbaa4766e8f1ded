//! Run-wide metric aggregation shared by every virtual user.
//!
//! Counters are atomics so concurrent VUs never lose an increment; latency
//! samples and the keyed tallies sit behind short-lived mutexes.

use crate::domain::model::{ApiResponse, Endpoint};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fraction of samples that were "hits".
#[derive(Debug, Default)]
pub struct Rate {
    hits: AtomicU64,
    total: AtomicU64,
}

impl Rate {
    pub fn add(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RateSnapshot {
        RateSnapshot::new(
            self.hits.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSnapshot {
    pub hits: u64,
    pub total: u64,
    pub rate: f64,
}

impl RateSnapshot {
    pub fn new(hits: u64, total: u64) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self { hits, total, rate }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

/// Latency distribution in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSnapshot {
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl TrendSnapshot {
    pub fn from_samples(mut samples: Vec<f64>) -> Option<Self> {
        samples.sort_by(f64::total_cmp);
        Self::from_sorted(&samples)
    }

    pub fn from_sorted(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let sum: f64 = samples.iter().sum();
        Some(Self {
            count: count as u64,
            avg: sum / count as f64,
            min: samples[0],
            med: percentile(samples, 50.0)?,
            max: samples[count - 1],
            p90: percentile(samples, 90.0)?,
            p95: percentile(samples, 95.0)?,
            p99: percentile(samples, 99.0)?,
        })
    }
}

/// Linear interpolation between the closest ranks of an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[derive(Debug, Default)]
pub struct Metrics {
    http_reqs: AtomicU64,
    iterations: AtomicU64,
    vus: AtomicU64,
    vus_max: AtomicU64,
    http_req_failed: Rate,
    errors: Rate,
    durations_ms: Mutex<Vec<f64>>,
    checks: Mutex<BTreeMap<String, CheckTally>>,
    failures_by_status: Mutex<BTreeMap<String, u64>>,
    error_codes: Mutex<BTreeMap<String, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_response(&self, response: &ApiResponse) {
        self.http_reqs.fetch_add(1, Ordering::Relaxed);
        self.durations_ms
            .lock()
            .push(response.elapsed.as_secs_f64() * 1000.0);

        let failed = response.is_http_failure();
        self.http_req_failed.add(failed);
        if !response.is_ok() {
            *self
                .failures_by_status
                .lock()
                .entry(response.status.to_string())
                .or_default() += 1;
        }
        if let Some(code) = &response.error_code {
            *self.error_codes.lock().entry(code.clone()).or_default() += 1;
        }
    }

    /// A request that never got a response.
    pub fn record_transport_failure(&self, endpoint: Endpoint) {
        self.http_reqs.fetch_add(1, Ordering::Relaxed);
        self.http_req_failed.add(true);
        *self
            .failures_by_status
            .lock()
            .entry("transport".to_string())
            .or_default() += 1;
        tracing::trace!(?endpoint, "transport failure recorded");
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let mut checks = self.checks.lock();
        let tally = checks.entry(name.to_string()).or_default();
        if passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
    }

    /// Feeds the custom `errors` rate; `failed` counts as a hit.
    pub fn record_error(&self, failed: bool) {
        self.errors.add(failed);
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_active_vus(&self, active: usize) {
        let active = active as u64;
        self.vus.store(active, Ordering::Relaxed);
        self.vus_max.fetch_max(active, Ordering::Relaxed);
    }

    pub fn active_vus(&self) -> u64 {
        self.vus.load(Ordering::Relaxed)
    }

    pub fn http_reqs(&self) -> u64 {
        self.http_reqs.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let checks = self.checks.lock().clone();
        let (passes, fails) = checks
            .values()
            .fold((0, 0), |(p, f), t| (p + t.passes, f + t.fails));
        let mut latencies_ms = self.durations_ms.lock().clone();
        latencies_ms.sort_by(f64::total_cmp);

        MetricsSnapshot {
            http_reqs: self.http_reqs.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
            vus_max: self.vus_max.load(Ordering::Relaxed),
            http_req_duration: TrendSnapshot::from_sorted(&latencies_ms),
            latencies_ms,
            http_req_failed: self.http_req_failed.snapshot(),
            errors: self.errors.snapshot(),
            checks_rate: RateSnapshot::new(passes, passes + fails),
            checks,
            failures_by_status: self.failures_by_status.lock().clone(),
            error_codes: self.error_codes.lock().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub http_reqs: u64,
    pub iterations: u64,
    pub vus_max: u64,
    pub http_req_duration: Option<TrendSnapshot>,
    pub http_req_failed: RateSnapshot,
    pub errors: RateSnapshot,
    /// Pass rate over every check.
    pub checks_rate: RateSnapshot,
    pub checks: BTreeMap<String, CheckTally>,
    pub failures_by_status: BTreeMap<String, u64>,
    pub error_codes: BTreeMap<String, u64>,
    /// Ascending; kept for arbitrary percentiles, left out of exports.
    #[serde(skip)]
    pub latencies_ms: Vec<f64>,
}

impl MetricsSnapshot {
    pub fn latency_percentile(&self, p: f64) -> Option<f64> {
        percentile(&self.latencies_ms, p)
    }
}
