use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Scenario file error: {message}")]
    ScenarioParseError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid threshold '{expression}' on {metric}: {reason}")]
    ThresholdError {
        metric: String,
        expression: String,
        reason: String,
    },

    #[error("Runtime error: {message}")]
    RuntimeError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Io,
    Data,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LoadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoadError::HttpError(_) => ErrorCategory::Network,
            LoadError::IoError(_) => ErrorCategory::Io,
            LoadError::SerializationError(_) => ErrorCategory::Data,
            LoadError::ScenarioParseError { .. }
            | LoadError::InvalidConfigValueError { .. }
            | LoadError::MissingConfigError { .. }
            | LoadError::ThresholdError { .. } => ErrorCategory::Configuration,
            LoadError::RuntimeError { .. } => ErrorCategory::Runtime,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Runtime => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            LoadError::HttpError(_) => {
                "Check that the ledger service is reachable at BASE_URL and accepts connections"
            }
            LoadError::IoError(_) => "Check file paths and permissions",
            LoadError::SerializationError(_) => "Check that the summary data can be encoded as JSON",
            LoadError::ScenarioParseError { .. } => {
                "Make sure the scenario file exists and is valid TOML"
            }
            LoadError::InvalidConfigValueError { .. } | LoadError::MissingConfigError { .. } => {
                "Fix the reported value on the command line or in the scenario file"
            }
            LoadError::ThresholdError { .. } => {
                "Use expressions like 'p(95)<500' or 'rate<0.01' on a known metric"
            }
            LoadError::RuntimeError { .. } => "Re-run with --verbose and inspect the logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not talk to the target service: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Data => format!("Could not encode run data: {}", self),
            ErrorCategory::Runtime => format!("The load run failed unexpectedly: {}", self),
        }
    }

    pub fn invalid_value(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        LoadError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
