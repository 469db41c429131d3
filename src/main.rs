// src/main.rs
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Instant;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod app;
mod auth;
mod common;
mod health;
mod logging_middleware;
mod security_middleware;
mod storage;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::resolver::AccountResolver;
use auth::service::LoginService;
use auth::session::SessionIssuer;
use auth::verifier::{GoogleTokenInfoProvider, IdentityVerifier};
use common::{AppConfig, AppState};
use storage::SqliteUserStore;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    info!(
        database_url = %config.database_url,
        port = config.port,
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool, config.reset_db).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder()
        .no_proxy()
        .timeout(config.google.verify_timeout)
        .build()?;

    let users = Arc::new(SqliteUserStore::new(pool));
    let provider = Arc::new(GoogleTokenInfoProvider::new(
        http_client,
        config.google.tokeninfo_url.clone(),
    ));
    let verifier = IdentityVerifier::new(
        provider,
        config.google.client_id.clone(),
        config.google.verify_timeout,
    );
    let login = LoginService::new(verifier, AccountResolver::new(users.clone()));
    info!("LoginService initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let shared = Arc::new(AppState {
        users,
        login,
        sessions: SessionIssuer::new(config.session.clone()),
        started_at: Instant::now(),
    });

    let app = app::build_router(shared, &config.cors_origins);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
