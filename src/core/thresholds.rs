//! Pass/fail conditions evaluated against the final metrics.
//!
//! Expressions take the form `<aggregation><op><value>`, e.g. `p(95)<500`
//! on `http_req_duration` or `rate<0.01` on `http_req_failed`.

use crate::core::metrics::MetricsSnapshot;
use crate::utils::error::{LoadError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const HTTP_REQS: &str = "http_reqs";
pub const ITERATIONS: &str = "iterations";
pub const CHECKS: &str = "checks";
pub const ERRORS: &str = "errors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Trend,
    Rate,
    Counter,
}

fn metric_kind(metric: &str) -> Option<MetricKind> {
    match metric {
        HTTP_REQ_DURATION => Some(MetricKind::Trend),
        HTTP_REQ_FAILED | CHECKS | ERRORS => Some(MetricKind::Rate),
        HTTP_REQS | ITERATIONS => Some(MetricKind::Counter),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Percentile(f64),
    Avg,
    Min,
    Med,
    Max,
    Rate,
    Count,
}

impl Aggregation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "avg" => Some(Aggregation::Avg),
            "min" => Some(Aggregation::Min),
            "med" => Some(Aggregation::Med),
            "max" => Some(Aggregation::Max),
            "rate" => Some(Aggregation::Rate),
            "count" => Some(Aggregation::Count),
            _ => {
                let inner = raw.strip_prefix("p(")?.strip_suffix(')')?;
                let p: f64 = inner.trim().parse().ok()?;
                (0.0..=100.0).contains(&p).then_some(Aggregation::Percentile(p))
            }
        }
    }

    fn applies_to(&self, kind: MetricKind) -> bool {
        match self {
            Aggregation::Percentile(_)
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Med
            | Aggregation::Max => kind == MetricKind::Trend,
            Aggregation::Rate => kind == MetricKind::Rate,
            Aggregation::Count => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    // Two-character operators first so "<=" is not read as "<".
    const TOKENS: [(&'static str, Comparison); 6] = [
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
    ];

    fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => observed == bound,
            Comparison::Ne => observed != bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    metric: String,
    expression: String,
    aggregation: Aggregation,
    comparison: Comparison,
    bound: f64,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> Result<Self> {
        let invalid = |reason: &str| LoadError::ThresholdError {
            metric: metric.to_string(),
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let kind = metric_kind(metric).ok_or_else(|| invalid("unknown metric"))?;
        let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();

        let (position, token, comparison) = Comparison::TOKENS
            .iter()
            .filter_map(|(token, cmp)| compact.find(token).map(|pos| (pos, *token, *cmp)))
            .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
            .ok_or_else(|| invalid("missing comparison operator"))?;

        let aggregation = Aggregation::parse(&compact[..position])
            .ok_or_else(|| invalid("unknown aggregation"))?;
        if !aggregation.applies_to(kind) {
            return Err(invalid("aggregation does not apply to this metric"));
        }

        let bound: f64 = compact[position + token.len()..]
            .parse()
            .map_err(|_| invalid("threshold value is not a number"))?;

        Ok(Self {
            metric: metric.to_string(),
            expression: expression.trim().to_string(),
            aggregation,
            comparison,
            bound,
        })
    }

    /// Parses a `metric -> [expressions]` table.
    pub fn parse_all(table: &BTreeMap<String, Vec<String>>) -> Result<Vec<Self>> {
        table
            .iter()
            .flat_map(|(metric, expressions)| {
                expressions
                    .iter()
                    .map(move |expression| Threshold::parse(metric, expression))
            })
            .collect()
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> ThresholdResult {
        let observed = self.observe(snapshot);
        let passed = observed
            .map(|value| self.comparison.holds(value, self.bound))
            .unwrap_or(false);

        ThresholdResult {
            metric: self.metric.clone(),
            expression: self.expression.clone(),
            observed,
            passed,
        }
    }

    fn observe(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        let rate = match self.metric.as_str() {
            HTTP_REQ_FAILED => Some(snapshot.http_req_failed),
            ERRORS => Some(snapshot.errors),
            CHECKS => Some(snapshot.checks_rate),
            _ => None,
        };

        match (self.metric.as_str(), self.aggregation) {
            (HTTP_REQS, _) => Some(snapshot.http_reqs as f64),
            (ITERATIONS, _) => Some(snapshot.iterations as f64),
            (HTTP_REQ_DURATION, aggregation) => {
                let trend = snapshot.http_req_duration.as_ref();
                match aggregation {
                    Aggregation::Count => Some(trend.map(|t| t.count).unwrap_or(0) as f64),
                    Aggregation::Avg => trend.map(|t| t.avg),
                    Aggregation::Min => trend.map(|t| t.min),
                    Aggregation::Med => trend.map(|t| t.med),
                    Aggregation::Max => trend.map(|t| t.max),
                    Aggregation::Percentile(p) => snapshot.latency_percentile(p),
                    Aggregation::Rate => None,
                }
            }
            (_, Aggregation::Rate) => rate.map(|r| r.rate),
            (_, Aggregation::Count) => rate.map(|r| r.hits as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

pub fn default_thresholds() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (HTTP_REQ_DURATION.to_string(), vec!["p(95)<500".to_string()]),
        (HTTP_REQ_FAILED.to_string(), vec!["rate<0.01".to_string()]),
    ])
}
