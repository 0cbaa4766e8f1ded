pub mod engine;
pub mod metrics;
pub mod profile;
pub mod runner;
pub mod scenario;
pub mod summary;
pub mod thresholds;
pub mod transfer;

pub use crate::domain::model::{AccountId, ApiResponse, Endpoint, Stage, TransferRequest};
pub use crate::domain::ports::{LedgerApi, Storage};
pub use crate::utils::error::Result;
