pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::ReqwestLedgerClient;
pub use config::{cli::LocalStorage, toml_config::ScenarioConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::core::{
    engine::{export_summary, LoadEngine, THRESHOLDS_FAILED_EXIT_CODE},
    summary::RunSummary,
};
pub use utils::error::{LoadError, Result};
