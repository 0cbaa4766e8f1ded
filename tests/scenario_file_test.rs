use anyhow::Result;
use httpmock::prelude::*;
use ledger_loadgen::utils::validation::Validate;
use ledger_loadgen::{LoadEngine, ReqwestLedgerClient, ScenarioConfig};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// 透過 TOML 場景檔驅動整個負載測試
#[tokio::test]
async fn test_scenario_file_drives_custom_accounts_and_thresholds() -> Result<()> {
    let server = MockServer::start_async().await;
    let alice_to_bob = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/transactions/send")
                .body_contains("\"fromAccountId\":\"alice\"")
                .body_contains("\"toAccountId\":\"bob\"")
                .body_contains("\"currency\":\"EUR\"");
            then.status(200);
        })
        .await;
    let bob_to_alice = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/transactions/send")
                .body_contains("\"fromAccountId\":\"bob\"")
                .body_contains("\"toAccountId\":\"alice\"");
            then.status(200);
        })
        .await;
    let health = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/health");
            then.status(200);
        })
        .await;

    std::env::set_var("LOADGEN_SCENARIO_TEST_URL", server.base_url());

    let mut file = NamedTempFile::new()?;
    file.write_all(
        br#"
[target]
base_url = "${LOADGEN_SCENARIO_TEST_URL}"
timeout = "5s"

[transfer]
accounts = ["alice", "bob"]
amount = "1.50"
currency = "EUR"

[scenario]
think_time = "5ms"
health_probability = 1.0
graceful_stop = "5s"
seed = 7

[[stages]]
duration = "300ms"
target = 2

[thresholds]
http_req_failed = ["rate==0"]
errors = ["rate<0.01"]
iterations = ["count>5"]
checks = ["rate>0.99"]
"#,
    )?;

    let config = ScenarioConfig::from_file(file.path())?;
    std::env::remove_var("LOADGEN_SCENARIO_TEST_URL");
    config.validate()?;

    let client = ReqwestLedgerClient::new(
        &config.target.base_url,
        &config.target.username,
        &config.target.password,
        config.target.timeout,
    )?;
    let engine = LoadEngine::new(config, client).with_tick(Duration::from_millis(5));
    let summary = engine.run().await?;

    let transfers = (alice_to_bob.hits_async().await + bob_to_alice.hits_async().await) as u64;
    assert_eq!(transfers, summary.metrics.iterations);
    assert!(alice_to_bob.hits_async().await > 0);
    assert!(bob_to_alice.hits_async().await > 0);
    // probability 1.0 probes health on every iteration
    assert_eq!(health.hits_async().await as u64, summary.metrics.iterations);

    assert_eq!(summary.thresholds.len(), 4);
    assert!(summary.thresholds_passed(), "{}", summary.render());

    Ok(())
}

#[test]
fn test_scenario_file_with_bad_threshold_fails_validation() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(
        br#"
[thresholds]
http_req_duration = ["p(95) 500"]
"#,
    )?;

    let config = ScenarioConfig::from_file(file.path())?;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("p(95) 500"));

    Ok(())
}
