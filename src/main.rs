use clap::Parser;
use ledger_loadgen::core::Endpoint;
use ledger_loadgen::utils::error::ErrorSeverity;
use ledger_loadgen::utils::{logger, validation::Validate};
use ledger_loadgen::{
    export_summary, CliConfig, LoadEngine, LoadError, LocalStorage, ReqwestLedgerClient,
    ScenarioConfig, THRESHOLDS_FAILED_EXIT_CODE,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting ledger-loadgen");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let scenario = match cli.resolve().and_then(|s| s.validate().map(|_| s)) {
        Ok(scenario) => scenario,
        Err(e) => fail(&e),
    };

    tracing::info!("✅ Scenario loaded and validated successfully");
    display_config_summary(&scenario, &cli);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No traffic will be sent");
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let client = match ReqwestLedgerClient::new(
        &scenario.target.base_url,
        &scenario.target.username,
        &scenario.target.password,
        scenario.target.timeout,
    ) {
        Ok(client) => client,
        Err(e) => fail(&e),
    };

    let engine = LoadEngine::new_with_monitoring(scenario, client, cli.monitor);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = match engine.run_until(shutdown).await {
        Ok(summary) => summary,
        Err(e) => fail(&e),
    };

    println!();
    print!("{}", summary.render());

    if let Some(path) = &cli.summary_export {
        let storage = LocalStorage::new(".".to_string());
        if let Err(e) = export_summary(&storage, &path.to_string_lossy(), &summary).await {
            fail(&e);
        }
        println!("📁 Summary saved to: {}", path.display());
    }

    if !summary.thresholds_passed() {
        eprintln!("❌ Some thresholds have failed");
        std::process::exit(THRESHOLDS_FAILED_EXIT_CODE);
    }

    println!("✅ Load run completed, all thresholds passed");
    Ok(())
}

fn fail(e: &LoadError) -> ! {
    tracing::error!(
        "❌ Load run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(scenario: &ScenarioConfig, cli: &CliConfig) {
    let base_url = scenario.target.base_url.trim_end_matches('/');

    println!("📋 Scenario Summary:");
    println!("  Target: {}", scenario.target.base_url);
    println!("    POST {}{}", base_url, Endpoint::Transfer.path());
    println!("    GET  {}{}", base_url, Endpoint::Health.path());
    println!(
        "  Accounts: {} ({})",
        scenario.transfer.accounts.len(),
        scenario.transfer.accounts.join(", ")
    );
    println!(
        "  Transfer: {} {}",
        scenario.transfer.amount, scenario.transfer.currency
    );
    println!(
        "  Think time: {}, health probe rate: {:.0}%",
        humantime::format_duration(scenario.scenario.think_time),
        scenario.scenario.health_probability * 100.0
    );
    println!(
        "  Profile: {} total, up to {} VUs",
        humantime::format_duration(scenario.total_duration()),
        scenario.max_vus()
    );
    for (index, stage) in scenario.stages.iter().enumerate() {
        println!("    {}. {}", index + 1, stage);
    }
    println!("  Thresholds:");
    for (metric, expressions) in &scenario.thresholds {
        println!("    {}: {}", metric, expressions.join(", "));
    }

    if cli.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
