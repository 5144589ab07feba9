//! # Application State
//!
//! The shared resources every handler can reach: configuration, the database
//! provider, the account service and the rate limiter's window table.

use crate::{config::AppConfig, rate_limit::RateLimiter};
use core_access::{AccountService, LogNotifier, OtpNotifier, OtpPolicy, TokenConfig};
use std::{sync::Arc, time::Duration};
use tracing::info;
use zygote::{SqliteProvider, seed_demo_content};

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sqlite_provider: Arc<SqliteProvider>,
    pub accounts: AccountService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn db(&self) -> &turso::Database {
        &self.sqlite_provider.db
    }
}

/// Builds the state with codes written to the log instead of being mailed.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    build_app_state_with_notifier(config, Box::new(LogNotifier)).await
}

/// Opens the database, brings the schema up to date and wires the services.
/// Runs the demo seed when the configuration asks for it.
pub async fn build_app_state_with_notifier(
    config: AppConfig,
    notifier: Box<dyn OtpNotifier>,
) -> anyhow::Result<AppState> {
    let sqlite_provider = SqliteProvider::new(&config.db_url).await?;
    info!(db_path = %config.db_url, "Initialized storage provider (SQLite).");
    sqlite_provider.initialize_schema().await?;

    let tokens = TokenConfig {
        access_secret: config.jwt_secret.clone(),
        access_ttl_secs: config.jwt_expiry_secs,
        refresh_secret: config.refresh_token_secret.clone(),
        refresh_ttl_secs: config.refresh_token_expiry_secs,
    };
    let otp_policy = OtpPolicy {
        length: config.otp_length,
        expiry_minutes: config.otp_expiry_minutes,
    };
    let accounts = AccountService::new(
        sqlite_provider.db.clone(),
        tokens,
        otp_policy,
        notifier,
    );

    if config.seed_demo_content {
        let report = seed_demo_content(
            &sqlite_provider.db,
            &accounts,
            &config.admin_email,
            &config.admin_password,
        )
        .await?;
        info!(
            admin_id = %report.admin_id,
            catalogue_seeded = report.catalogue_seeded,
            "Demo seed finished"
        );
    }

    let rate_limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_window_secs),
        config.rate_limit_max_requests,
    );

    Ok(AppState {
        config: Arc::new(config),
        sqlite_provider: Arc::new(sqlite_provider),
        accounts,
        rate_limiter: Arc::new(rate_limiter),
    })
}
