use crate::domain::model::{ApiErrorResponse, ApiResponse, Endpoint, HealthStatus, TransferRequest};
use crate::domain::ports::LedgerApi;
use crate::utils::error::{LoadError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::time::{Duration, Instant};

/// `Basic <base64(username:password)>`
pub fn basic_auth_value(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

/// Ledger API over HTTP.
#[derive(Debug, Clone)]
pub struct ReqwestLedgerClient {
    client: Client,
    base_url: String,
    authorization: HeaderValue,
}

impl ReqwestLedgerClient {
    pub fn new(base_url: &str, username: &str, password: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut authorization = HeaderValue::from_str(&basic_auth_value(username, password))
            .map_err(|e| LoadError::invalid_value("target.username", username, e.to_string()))?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl LedgerApi for ReqwestLedgerClient {
    async fn send_transfer(&self, request: &TransferRequest) -> Result<ApiResponse> {
        let started = Instant::now();

        let response = self
            .client
            .post(self.url(Endpoint::Transfer))
            .header(AUTHORIZATION, self.authorization.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let elapsed = started.elapsed();

        // 失敗時嘗試解析 ledger 的錯誤格式
        let error_code = if status.is_success() {
            None
        } else {
            serde_json::from_slice::<ApiErrorResponse>(&bytes)
                .ok()
                .map(|e| e.error_code)
        };

        Ok(ApiResponse {
            endpoint: Endpoint::Transfer,
            status: status.as_u16(),
            elapsed,
            error_code,
        })
    }

    async fn health(&self) -> Result<ApiResponse> {
        let started = Instant::now();
        let response = self.client.get(self.url(Endpoint::Health)).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let elapsed = started.elapsed();

        if let Ok(health) = serde_json::from_slice::<HealthStatus>(&bytes) {
            tracing::trace!(
                status = %health.status,
                service = health.service.as_deref().unwrap_or("-"),
                "health reported"
            );
        }

        Ok(ApiResponse {
            endpoint: Endpoint::Health,
            status: status.as_u16(),
            elapsed,
            error_code: None,
        })
    }
}
