use crate::core::thresholds::{default_thresholds, Threshold};
use crate::domain::model::{
    default_amount, humantime_str, AccountId, Stage, DEFAULT_ACCOUNTS, DEFAULT_CURRENCY,
};
use crate::utils::error::{LoadError, Result};
use crate::utils::validation::{self, Validate};
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Complete description of one load run. Every section is optional in the
/// TOML file; missing values fall back to the ledger defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub target: TargetConfig,
    pub transfer: TransferConfig,
    pub scenario: IterationConfig,
    pub stages: Vec<Stage>,
    pub thresholds: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    #[serde(with = "humantime_str")]
    pub timeout: Duration,
    pub username: String,
    pub password: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub accounts: Vec<String>,
    pub amount: Decimal,
    pub currency: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            accounts: DEFAULT_ACCOUNTS.iter().map(|a| a.to_string()).collect(),
            amount: default_amount(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl TransferConfig {
    pub fn account_ids(&self) -> Vec<AccountId> {
        self.accounts.iter().map(AccountId::new).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    #[serde(with = "humantime_str")]
    pub think_time: Duration,
    pub health_probability: f64,
    #[serde(with = "humantime_str")]
    pub graceful_stop: Duration,
    pub seed: Option<u64>,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            think_time: Duration::from_secs(1),
            health_probability: 0.1,
            graceful_stop: Duration::from_secs(30),
            seed: None,
        }
    }
}

impl ScenarioConfig {
    /// The stock ledger run: default profile and thresholds.
    pub fn ledger_default() -> Self {
        Self {
            stages: Stage::default_profile(),
            thresholds: default_thresholds(),
            ..Self::default()
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LoadError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario; omitted `stages` and `thresholds` take the
    /// ledger defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: ScenarioConfig =
            toml::from_str(&processed_content).map_err(|e| LoadError::ScenarioParseError {
                message: format!("TOML parsing error: {}", e),
            })?;

        if config.stages.is_empty() {
            config.stages = Stage::default_profile();
        }
        if config.thresholds.is_empty() {
            config.thresholds = default_thresholds();
        }
        Ok(config)
    }

    /// Replaces `${VAR}` and `${VAR:-fallback}`. Unset variables without a
    /// fallback are left as written.
    fn substitute_env_vars(content: &str) -> String {
        static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
                .expect("static pattern is valid")
        });

        re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            match (std::env::var(var_name), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(fallback)) => fallback.as_str().to_string(),
                (Err(_), None) => caps[0].to_string(),
            }
        })
        .into_owned()
    }

    pub fn parsed_thresholds(&self) -> Result<Vec<Threshold>> {
        Threshold::parse_all(&self.thresholds)
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn max_vus(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }
}

impl Validate for ScenarioConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("target.base_url", &self.target.base_url)?;
        validation::validate_non_zero_duration("target.timeout", self.target.timeout)?;
        validation::validate_non_empty_string("target.username", &self.target.username)?;

        validation::validate_distinct_values("transfer.accounts", &self.transfer.accounts)?;
        validation::validate_non_empty_string("transfer.currency", &self.transfer.currency)?;
        if self.transfer.amount <= Decimal::ZERO {
            return Err(LoadError::invalid_value(
                "transfer.amount",
                self.transfer.amount,
                "Amount must be greater than zero",
            ));
        }

        validation::validate_range(
            "scenario.health_probability",
            self.scenario.health_probability,
            0.0,
            1.0,
        )?;

        if self.stages.is_empty() {
            return Err(LoadError::MissingConfigError {
                field: "stages".to_string(),
            });
        }
        validation::validate_non_zero_duration("stages", self.total_duration())?;

        self.parsed_thresholds()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_gives_ledger_defaults() {
        let config = ScenarioConfig::from_toml_str("").unwrap();

        assert_eq!(config, ScenarioConfig::ledger_default());
        assert_eq!(config.target.base_url, "http://localhost:8080");
        assert_eq!(config.transfer.accounts.len(), 4);
        assert_eq!(config.transfer.currency, "TRY");
        assert_eq!(config.scenario.think_time, Duration::from_secs(1));
        assert_eq!(config.scenario.health_probability, 0.1);
        assert_eq!(config.max_vus(), 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_scenario() {
        let toml_content = r#"
[target]
base_url = "https://ledger.example.com"
timeout = "5s"

[transfer]
accounts = ["a", "b", "c"]
amount = "25.50"
currency = "EUR"

[scenario]
think_time = "250ms"
health_probability = 0.5
seed = 42

[[stages]]
duration = "10s"
target = 5

[[stages]]
duration = "5s"
target = 0

[thresholds]
http_req_duration = ["p(99)<800", "avg<200"]
errors = ["rate<0.05"]
"#;

        let config = ScenarioConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.target.base_url, "https://ledger.example.com");
        assert_eq!(config.target.timeout, Duration::from_secs(5));
        assert_eq!(config.target.username, "admin");
        assert_eq!(config.transfer.amount, Decimal::new(2550, 2));
        assert_eq!(config.scenario.think_time, Duration::from_millis(250));
        assert_eq!(config.scenario.seed, Some(42));
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.total_duration(), Duration::from_secs(15));
        assert_eq!(config.parsed_thresholds().unwrap().len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LOADGEN_TEST_LEDGER_URL", "http://ledger.internal:9090");

        let toml_content = r#"
[target]
base_url = "${LOADGEN_TEST_LEDGER_URL}"
password = "${LOADGEN_TEST_UNSET_PASSWORD:-secret}"
"#;

        let config = ScenarioConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.target.base_url, "http://ledger.internal:9090");
        assert_eq!(config.target.password, "secret");

        std::env::remove_var("LOADGEN_TEST_LEDGER_URL");
    }

    #[test]
    fn test_unset_env_var_is_left_and_rejected() {
        let toml_content = r#"
[target]
base_url = "${LOADGEN_TEST_NEVER_SET}"
"#;
        let config = ScenarioConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.target.base_url, "${LOADGEN_TEST_NEVER_SET}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScenarioConfig::ledger_default();
        config.transfer.accounts = vec!["only-one".to_string()];
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::ledger_default();
        config.scenario.health_probability = 2.0;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::ledger_default();
        config.transfer.amount = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::ledger_default();
        config
            .thresholds
            .insert("http_req_duration".to_string(), vec!["p95<500".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(LoadError::ThresholdError { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let result = ScenarioConfig::from_toml_str("[[stages]]\nduration = 30\n");
        assert!(matches!(result, Err(LoadError::ScenarioParseError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[scenario]\nhealth_probability = 0.25\n")
            .unwrap();

        let config = ScenarioConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.scenario.health_probability, 0.25);
        assert_eq!(config.stages, Stage::default_profile());
    }
}
