use crate::core::metrics::{MetricsSnapshot, TrendSnapshot};
use crate::core::runner::RunReport;
use crate::core::thresholds::{Threshold, ThresholdResult};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub base_url: String,
    pub interrupted: bool,
    pub aborted_vus: usize,
    pub metrics: MetricsSnapshot,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunSummary {
    pub fn new(
        base_url: &str,
        started_at: DateTime<Utc>,
        report: RunReport,
        metrics: MetricsSnapshot,
        thresholds: &[Threshold],
    ) -> Self {
        let results = thresholds.iter().map(|t| t.evaluate(&metrics)).collect();
        Self {
            started_at,
            finished_at: Utc::now(),
            duration_secs: report.elapsed.as_secs_f64(),
            base_url: base_url.to_string(),
            interrupted: report.interrupted,
            aborted_vus: report.aborted_vus,
            metrics,
            thresholds: results,
        }
    }

    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.thresholds.iter().filter(|t| !t.passed)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text end-of-run report.
    pub fn render(&self) -> String {
        let m = &self.metrics;
        let mut out = String::new();

        let _ = writeln!(out, "📋 Run Summary ({})", self.base_url);
        let _ = writeln!(
            out,
            "  Duration: {:.1}s{}",
            self.duration_secs,
            if self.interrupted { " (interrupted)" } else { "" }
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "  Checks:");
        for (name, tally) in &m.checks {
            let mark = if tally.fails == 0 { "✓" } else { "✗" };
            let _ = writeln!(
                out,
                "    {} {}  ✓ {} / ✗ {}",
                mark, name, tally.passes, tally.fails
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(
            out,
            "  checks.............: {:.2}% ({} of {})",
            m.checks_rate.rate * 100.0,
            m.checks_rate.hits,
            m.checks_rate.total
        );
        let _ = writeln!(
            out,
            "  errors.............: {:.2}% ({} of {})",
            m.errors.rate * 100.0,
            m.errors.hits,
            m.errors.total
        );
        let _ = writeln!(
            out,
            "  http_req_duration..: {}",
            m.http_req_duration
                .as_ref()
                .map(format_trend)
                .unwrap_or_else(|| "no samples".to_string())
        );
        let _ = writeln!(
            out,
            "  http_req_failed....: {:.2}% ({} of {})",
            m.http_req_failed.rate * 100.0,
            m.http_req_failed.hits,
            m.http_req_failed.total
        );
        let _ = writeln!(
            out,
            "  http_reqs..........: {} ({:.1}/s)",
            m.http_reqs,
            per_second(m.http_reqs, self.duration_secs)
        );
        let _ = writeln!(
            out,
            "  iterations.........: {} ({:.1}/s)",
            m.iterations,
            per_second(m.iterations, self.duration_secs)
        );
        let _ = writeln!(out, "  vus_max............: {}", m.vus_max);

        if !m.failures_by_status.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "  Failures by status:");
            for (status, count) in &m.failures_by_status {
                let _ = writeln!(out, "    {}: {}", status, count);
            }
        }
        if !m.error_codes.is_empty() {
            let _ = writeln!(out, "  Ledger error codes:");
            for (code, count) in &m.error_codes {
                let _ = writeln!(out, "    {}: {}", code, count);
            }
        }

        if !self.thresholds.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "  Thresholds:");
            for t in &self.thresholds {
                let observed = t
                    .observed
                    .map(|v| format!("{:.4}", v))
                    .unwrap_or_else(|| "n/a".to_string());
                let _ = writeln!(
                    out,
                    "    {} {}: {} (observed {})",
                    if t.passed { "✅" } else { "❌" },
                    t.metric,
                    t.expression,
                    observed
                );
            }
        }

        out
    }
}

fn format_trend(t: &TrendSnapshot) -> String {
    format!(
        "avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms p(99)={:.2}ms",
        t.avg, t.min, t.med, t.max, t.p90, t.p95, t.p99
    )
}

fn per_second(count: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
