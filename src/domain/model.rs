use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Seeded ledger accounts: Alice, Bob, Charlie and Dave.
pub const DEFAULT_ACCOUNTS: [&str; 4] = [
    "11111111-1111-1111-1111-111111111111",
    "22222222-2222-2222-2222-222222222222",
    "33333333-3333-3333-3333-333333333333",
    "44444444-4444-4444-4444-444444444444",
];

pub const DEFAULT_CURRENCY: &str = "TRY";

/// 10.00
pub fn default_amount() -> Decimal {
    Decimal::new(1000, 2)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /api/v1/transactions/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub reference_number: String,
}

/// Error body the ledger returns for 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Transfer,
    Health,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Transfer => "/api/v1/transactions/send",
            Endpoint::Health => "/api/v1/health",
        }
    }
}

/// What came back from one HTTP call that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub endpoint: Endpoint,
    pub status: u16,
    pub elapsed: Duration,
    pub error_code: Option<String>,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Same failure notion as `http_req_failed`: anything outside 2xx/3xx.
    pub fn is_http_failure(&self) -> bool {
        !(200..400).contains(&self.status)
    }
}

/// One ramping step: move linearly to `target` virtual users over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "humantime_str")]
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }

    /// 30s→10, 1m→50, hold 50 for 2m, 30s→0.
    pub fn default_profile() -> Vec<Stage> {
        vec![
            Stage::new(Duration::from_secs(30), 10),
            Stage::new(Duration::from_secs(60), 50),
            Stage::new(Duration::from_secs(120), 50),
            Stage::new(Duration::from_secs(30), 0),
        ]
    }
}

impl FromStr for Stage {
    type Err = String;

    /// Parses `<duration>:<target>`, e.g. `30s:10` or `1m30s:50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected <duration>:<target>, got '{}'", s))?;
        let duration = humantime::parse_duration(duration.trim())
            .map_err(|e| format!("invalid stage duration '{}': {}", duration, e))?;
        let target = target
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid stage target '{}': {}", target, e))?;
        Ok(Stage { duration, target })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} VUs",
            humantime::format_duration(self.duration),
            self.target
        )
    }
}

/// Serde adapter for human-readable durations ("30s", "1m", "250ms").
pub mod humantime_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
