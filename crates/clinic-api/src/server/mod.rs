//! Server setup and initialization
//!
//! Builds the application state for the configured storage backend, the
//! router, and the server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use clinic_common::{AppConfig, AppError, StorageBackend, TokenIssuer};
use clinic_db::{
    create_pool, run_migrations, InMemoryAccountStore, InMemoryRefreshTokenRepository,
    PgAccountRepository, PgRefreshTokenRepository, PoolConfig,
};
use clinic_service::{spawn_purge_task, ServiceContextBuilder, SessionPolicy};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::middleware::{apply_middleware, apply_rate_limit};
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
///
/// # Errors
/// Returns `AppError::Config` for an unusable rate limit
pub fn create_app(state: AppState) -> Result<Router, AppError> {
    let config = state.config();
    let router = apply_rate_limit(create_router(), &config.rate_limit)?.merge(health_routes());
    let router = apply_middleware(router, config);
    Ok(router.with_state(state))
}

fn token_issuer(config: &AppConfig, clock: clinic_core::SharedClock) -> Result<Arc<TokenIssuer>, AppError> {
    Ok(Arc::new(TokenIssuer::new(
        &config.jwt.secret,
        &config.jwt.issuer,
        &config.jwt.audience,
        config.jwt.access_token_expiry,
        clock,
    )?))
}

/// Initialize all dependencies for the configured backend and create AppState
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    match config.app.storage {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; sessions and accounts are lost on restart");
            create_in_memory_state(config, Arc::new(InMemoryAccountStore::new()))
        }
        StorageBackend::Postgres => create_postgres_state(config).await,
    }
}

/// AppState over in-memory adapters sharing the given account store
pub fn create_in_memory_state(
    config: AppConfig,
    accounts: Arc<InMemoryAccountStore>,
) -> Result<AppState, AppError> {
    let clock = clinic_core::SystemClock::shared();

    let service_context = ServiceContextBuilder::new()
        .refresh_token_repo(Arc::new(InMemoryRefreshTokenRepository::new()))
        .lockout_repo(accounts.clone())
        .identity(accounts)
        .token_issuer(token_issuer(&config, clock.clone())?)
        .clock(clock)
        .policy(SessionPolicy::from_config(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(AppState::new(service_context, config))
}

async fn create_postgres_state(config: AppConfig) -> Result<AppState, AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&PoolConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    if config.database.run_migrations {
        info!(dir = %config.database.migrations_dir, "Running migrations");
        run_migrations(&pool, &config.database.migrations_dir)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }

    let clock = clinic_core::SystemClock::shared();
    let accounts = Arc::new(PgAccountRepository::new(pool.clone()));

    let service_context = ServiceContextBuilder::new()
        .pool(pool.clone())
        .refresh_token_repo(Arc::new(PgRefreshTokenRepository::new(pool)))
        .lockout_repo(accounts.clone())
        .identity(accounts)
        .token_issuer(token_issuer(&config, clock.clone())?)
        .clock(clock)
        .policy(SessionPolicy::from_config(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(AppState::new(service_context, config))
}

/// Serve `app` on an already bound listener
///
/// Connect info is attached so handlers and the rate limiter see peer addresses.
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), AppError> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Config(format!("Failed to read local address: {e}")))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.api.address();
    let purge_interval = config.refresh.purge_interval();

    let state = create_app_state(config).await?;
    let purge = spawn_purge_task(state.service_context().clone(), purge_interval);

    let app = create_app(state)?;

    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let result = run_server(app, listener).await;
    purge.abort();
    result
}
