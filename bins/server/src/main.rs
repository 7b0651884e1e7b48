//! Curafin finance server.
//!
//! Main entry point for the ledger and wallet engine service.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curafin_api::{AppState, PlatformAccounts, create_router};
use curafin_core::accounts::types::{AccountType, CreateAccountInput};
use curafin_core::ledger::{EngineConfig, LedgerEngine};
use curafin_core::reports::Reports;
use curafin_core::wallet::WalletService;
use curafin_core::wallet::types::OwnerType;
use curafin_shared::AppConfig;
use curafin_shared::types::{Currency, Money, OwnerId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curafin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Build the engine and wallet service
    let engine = Arc::new(LedgerEngine::new(EngineConfig {
        lock_wait: Duration::from_millis(config.ledger.lock_wait_ms),
        posting_retries: config.ledger.posting_retries,
    }));
    let currency = Currency::from_str(&config.ledger.currency)
        .map_err(|message| anyhow::anyhow!(message))?;

    let (wallets, platform) = bootstrap(&config, &engine, currency)?;
    let reports = Arc::new(Reports::new(Arc::clone(&engine), Arc::clone(&wallets)));

    // Create application state
    let state = AppState {
        engine,
        wallets,
        reports,
        platform,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Seeds the chart of accounts and the platform wallet from config.
fn bootstrap(
    config: &AppConfig,
    engine: &Arc<LedgerEngine>,
    currency: Currency,
) -> anyhow::Result<(Arc<WalletService>, PlatformAccounts)> {
    for account in &config.bootstrap.accounts {
        let account_type = AccountType::from_str(&account.account_type)
            .map_err(|message| anyhow::anyhow!(message))?;
        let created = engine.chart().create_account(CreateAccountInput {
            code: account.code.clone(),
            name: account.name.clone(),
            account_type,
            floor: account.floor.map(Money::from_minor_units),
        });
        match created {
            Ok(created) => info!(code = %created.code, "Seeded account"),
            Err(e) => warn!(code = %account.code, error = %e, "Skipping account seed"),
        }
    }

    let mut liability_accounts = HashMap::new();
    for (owner_type, code) in &config.bootstrap.wallet_accounts {
        let owner_type =
            OwnerType::from_str(owner_type).map_err(|message| anyhow::anyhow!(message))?;
        engine
            .chart()
            .get_account(code)
            .with_context(|| format!("Wallet liability account {code} is not in the chart"))?;
        liability_accounts.insert(owner_type, code.clone());
    }

    let wallets = Arc::new(WalletService::new(
        Arc::clone(engine),
        currency,
        liability_accounts,
    ));

    // The platform's own operating wallet, opened on first boot.
    let platform_wallet = if wallets.liability_account_for(OwnerType::Platform).is_some() {
        let wallet = wallets
            .open_wallet(OwnerId::new(), OwnerType::Platform)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        info!(wallet_id = %wallet.wallet_id, "Platform wallet ready");
        Some(wallet.wallet_id)
    } else {
        warn!("No platform liability account mapped; operating-fund endpoint disabled");
        None
    };

    let platform = PlatformAccounts {
        wallet_id: platform_wallet,
        operating_account: config.bootstrap.operating_account.clone(),
    };

    Ok((wallets, platform))
}
