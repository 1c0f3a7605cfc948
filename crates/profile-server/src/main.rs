//! `profile-server`: binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Build the field cipher from `AES_KEY`; an unusable key aborts startup.
//! 4. Open the store: Postgres with retry + migrations, or in-memory.
//! 5. Construct the health escalator and token issuer.
//! 6. Spawn background tasks: rate limiter pruning.
//! 7. Build the Axum router and serve until SIGINT/SIGTERM.

mod auth;
mod config;
mod crypto;
mod health;
mod server;
mod store;
mod telemetry;
mod validation;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use auth::TokenIssuer;
use config::Config;
use crypto::FieldCipher;
use health::HealthEscalator;
use server::middleware::{self, RateLimit};
use server::state::AppState;
use store::Repository;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_port = cfg.api_port,
        "profile-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field cipher
    // -----------------------------------------------------------------------
    let cipher = FieldCipher::new(&cfg.aes_key).context("AES_KEY is not a usable AES key")?;
    info!(key_bits = cipher.key_bits(), "field cipher ready");

    // -----------------------------------------------------------------------
    // 4. Store
    // -----------------------------------------------------------------------
    let (repo, pool) = match &cfg.database_url {
        Some(url) => {
            let pool = store::postgres::connect_with_retry(
                url,
                cfg.db_max_connections,
                cfg.db_connect_attempts,
                cfg.db_connect_retry(),
            )
            .await?;
            store::postgres::migrate(&pool).await?;
            (Repository::postgres(pool.clone()), Some(pool))
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory store");
            (Repository::in_memory(), None)
        }
    };

    // -----------------------------------------------------------------------
    // 5. Health + tokens
    // -----------------------------------------------------------------------
    let health = HealthEscalator::new();
    let tokens = TokenIssuer::new(&cfg.jwt_secret, cfg.token_ttl());
    tokio::task::spawn_blocking(auth::prepare_dummy_hash);

    // -----------------------------------------------------------------------
    // 6. Background tasks
    // -----------------------------------------------------------------------
    let shutdown = CancellationToken::new();
    let rate_limit = RateLimit::from_config(&cfg)?;
    let pruning = tokio::spawn(middleware::prune_task(
        rate_limit.clone(),
        cfg.rate_limit_expiry(),
        shutdown.clone(),
    ));

    // -----------------------------------------------------------------------
    // 7. HTTP server
    // -----------------------------------------------------------------------
    let cors = middleware::cors(&cfg.cors_origins())?;
    let state = AppState::new(repo, cipher, tokens, health.clone(), cfg.admin_token.clone());
    let router = server::router::build(state, rate_limit, cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.api_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown::shutdown_signal(health, shutdown.clone()))
    .await
    .context("HTTP server failed")?;

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------
    shutdown.cancel();
    if let Err(e) = pruning.await {
        warn!(error = %e, "rate limiter pruning task panicked");
    }
    if let Some(pool) = pool {
        pool.close().await;
    }
    info!("profile-server stopped");
    telemetry::shutdown_telemetry();

    Ok(())
}
