use crate::core::metrics::Metrics;
use crate::core::transfer::TransferFactory;
use crate::domain::model::{ApiResponse, Endpoint};
use crate::domain::ports::LedgerApi;
use crate::utils::error::Result;
use rand::Rng;
use std::sync::Arc;

pub const TRANSFER_CHECK: &str = "transaction status is 200";
pub const HEALTH_CHECK: &str = "health is UP";

/// Outcome of a single iteration, for callers that want more than metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub transfer_ok: bool,
    /// `None` when this iteration did not probe health.
    pub health_ok: Option<bool>,
}

/// The unit of work every virtual user repeats: one transfer, maybe a
/// health probe. Failures are tallied and never abort the iteration.
pub struct TransferScenario<A: LedgerApi> {
    api: Arc<A>,
    transfers: TransferFactory,
    health_probability: f64,
    metrics: Arc<Metrics>,
}

impl<A: LedgerApi> TransferScenario<A> {
    pub fn new(
        api: Arc<A>,
        transfers: TransferFactory,
        health_probability: f64,
        metrics: Arc<Metrics>,
    ) -> Self {
        // NaN 不可交給 random_bool
        let health_probability = if health_probability.is_nan() {
            0.0
        } else {
            health_probability.clamp(0.0, 1.0)
        };
        Self {
            api,
            transfers,
            health_probability,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub async fn iteration<R: Rng + Send>(&self, rng: &mut R) -> IterationReport {
        let request = self.transfers.next_request(rng);
        tracing::trace!(
            from = %request.from_account_id,
            to = %request.to_account_id,
            reference = %request.reference_number,
            "sending transfer"
        );

        let outcome = self.api.send_transfer(&request).await;
        let transfer_ok = self.check(Endpoint::Transfer, TRANSFER_CHECK, outcome);
        self.metrics.record_error(!transfer_ok);

        let health_ok = if rng.random_bool(self.health_probability) {
            let outcome = self.api.health().await;
            Some(self.check(Endpoint::Health, HEALTH_CHECK, outcome))
        } else {
            None
        };

        self.metrics.record_iteration();
        IterationReport {
            transfer_ok,
            health_ok,
        }
    }

    fn check(&self, endpoint: Endpoint, name: &str, outcome: Result<ApiResponse>) -> bool {
        let passed = match outcome {
            Ok(response) => {
                self.metrics.record_response(&response);
                if !response.is_ok() {
                    tracing::debug!(
                        check = name,
                        status = response.status,
                        error_code = response.error_code.as_deref().unwrap_or("-"),
                        "check failed"
                    );
                }
                response.is_ok()
            }
            Err(e) => {
                self.metrics.record_transport_failure(endpoint);
                tracing::debug!(check = name, error = %e, "request failed before a response");
                false
            }
        };
        self.metrics.record_check(name, passed);
        passed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::model::{
        default_amount, AccountId, TransferRequest, DEFAULT_ACCOUNTS, DEFAULT_CURRENCY,
    };
    use crate::utils::error::LoadError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    /// Records what it is sent and answers with fixed statuses.
    pub(crate) struct FakeLedger {
        pub transfer_status: Option<u16>,
        pub health_status: u16,
        pub transfers: Mutex<Vec<TransferRequest>>,
        pub health_calls: Mutex<usize>,
    }

    impl FakeLedger {
        pub(crate) fn answering(transfer_status: Option<u16>, health_status: u16) -> Self {
            Self {
                transfer_status,
                health_status,
                transfers: Mutex::new(Vec::new()),
                health_calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl LedgerApi for FakeLedger {
        async fn send_transfer(&self, request: &TransferRequest) -> Result<ApiResponse> {
            self.transfers.lock().push(request.clone());
            let status = self.transfer_status.ok_or_else(|| LoadError::RuntimeError {
                message: "connection refused".to_string(),
            })?;
            Ok(ApiResponse {
                endpoint: Endpoint::Transfer,
                status,
                elapsed: Duration::from_millis(3),
                error_code: (status == 422).then(|| "INSUFFICIENT_FUNDS".to_string()),
            })
        }

        async fn health(&self) -> Result<ApiResponse> {
            *self.health_calls.lock() += 1;
            Ok(ApiResponse {
                endpoint: Endpoint::Health,
                status: self.health_status,
                elapsed: Duration::from_millis(1),
                error_code: None,
            })
        }
    }

    pub(crate) fn transfer_factory() -> TransferFactory {
        let accounts = DEFAULT_ACCOUNTS.iter().map(|a| AccountId::new(*a)).collect();
        TransferFactory::new(accounts, default_amount(), DEFAULT_CURRENCY).unwrap()
    }

    fn scenario(ledger: FakeLedger, health_probability: f64) -> TransferScenario<FakeLedger> {
        TransferScenario::new(
            Arc::new(ledger),
            transfer_factory(),
            health_probability,
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn test_successful_iterations_record_no_errors() {
        let scenario = scenario(FakeLedger::answering(Some(200), 200), 0.1);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let report = scenario.iteration(&mut rng).await;
            assert!(report.transfer_ok);
        }

        let snapshot = scenario.metrics().snapshot();
        assert_eq!(snapshot.iterations, 200);
        assert_eq!(snapshot.errors.total, 200);
        assert_eq!(snapshot.errors.rate, 0.0);
        assert_eq!(snapshot.http_req_failed.rate, 0.0);
        assert_eq!(snapshot.checks[TRANSFER_CHECK].passes, 200);
    }

    #[tokio::test]
    async fn test_health_probe_is_sampled() {
        let scenario = scenario(FakeLedger::answering(Some(200), 200), 0.1);
        let mut rng = StdRng::seed_from_u64(99);
        let mut probes = 0;
        for _ in 0..2_000 {
            if scenario.iteration(&mut rng).await.health_ok.is_some() {
                probes += 1;
            }
        }

        assert!(probes > 0 && probes < 2_000);
        assert!((100..=300).contains(&probes), "probes = {}", probes);
        assert_eq!(*scenario.api.health_calls.lock(), probes);
        assert_eq!(scenario.metrics().snapshot().checks[HEALTH_CHECK].passes, probes as u64);
    }

    #[tokio::test]
    async fn test_failed_transfer_keeps_going() {
        let scenario = scenario(FakeLedger::answering(Some(422), 200), 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let report = scenario.iteration(&mut rng).await;

        // the health probe still runs after a failed transfer
        assert!(!report.transfer_ok);
        assert_eq!(report.health_ok, Some(true));

        let snapshot = scenario.metrics().snapshot();
        assert_eq!(snapshot.errors.rate, 1.0);
        assert_eq!(snapshot.error_codes.get("INSUFFICIENT_FUNDS"), Some(&1));
        assert_eq!(snapshot.checks[TRANSFER_CHECK].fails, 1);
    }

    #[tokio::test]
    async fn test_transport_errors_count_as_failed_checks() {
        let scenario = scenario(FakeLedger::answering(None, 200), 0.0);
        let mut rng = StdRng::seed_from_u64(2);
        let report = scenario.iteration(&mut rng).await;

        assert!(!report.transfer_ok);
        assert_eq!(report.health_ok, None);
        let snapshot = scenario.metrics().snapshot();
        assert_eq!(snapshot.http_req_failed.hits, 1);
        assert!(snapshot.http_req_duration.is_none());
        assert_eq!(snapshot.iterations, 1);
    }

    #[tokio::test]
    async fn test_requests_sent_satisfy_transfer_contract() {
        let scenario = scenario(FakeLedger::answering(Some(200), 200), 0.0);
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..500 {
            scenario.iteration(&mut rng).await;
        }

        let sent = scenario.api.transfers.lock();
        assert_eq!(sent.len(), 500);
        assert!(sent.iter().all(|r| r.from_account_id != r.to_account_id));
        assert!(sent.iter().all(|r| r.currency == "TRY"));
    }

    #[tokio::test]
    async fn test_out_of_range_health_probability_is_tamed() {
        let never = scenario(FakeLedger::answering(Some(200), 200), f64::NAN);
        let always = scenario(FakeLedger::answering(Some(200), 200), 7.5);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            assert_eq!(never.iteration(&mut rng).await.health_ok, None);
            assert_eq!(always.iteration(&mut rng).await.health_ok, Some(true));
        }
        assert_eq!(*never.api.health_calls.lock(), 0);
        assert_eq!(*always.api.health_calls.lock(), 50);
    }
}
