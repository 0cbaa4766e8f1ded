use crate::domain::model::{ApiResponse, TransferRequest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Client side of the ledger HTTP API.
///
/// An `Err` means the request never got a response (connect failure,
/// timeout); any HTTP status, including 4xx/5xx, is an `Ok`.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn send_transfer(&self, request: &TransferRequest) -> Result<ApiResponse>;
    async fn health(&self) -> Result<ApiResponse>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
