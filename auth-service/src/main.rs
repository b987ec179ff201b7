/// Argent Auth Service - Main entry point
///
/// Composition root: loads configuration, selects the storage backend
/// once, wires the services together, and serves the REST API.
use anyhow::Context;
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use auth_service::{
    config::{Config, StorageMode},
    routes,
    services::{Authenticator, SecurityEvents, SessionValidator, TracingEvents, TwoFactorService},
    storage::memory::{
        MemoryIdentityStore, MemoryLockoutStore, MemoryRevocationStore, MemorySecondFactorStore,
    },
    storage::postgres::PgIdentityStore,
    storage::redis::{RedisLockoutStore, RedisRevocationStore, RedisSecondFactorStore},
    storage::{IdentityStore, LockoutPolicy, LockoutStore, RevocationStore, SecondFactorStore},
    AppState,
};
use crypto_core::TokenIssuer;

type Stores = (
    Arc<dyn IdentityStore>,
    Arc<dyn LockoutStore>,
    Arc<dyn RevocationStore>,
    Arc<dyn SecondFactorStore>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "auth_service=info,info".into()),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration from environment")?;

    tracing::info!(
        "Starting Argent Auth Service on {}:{}",
        config.server_host,
        config.server_port
    );

    let stores = build_stores(&config).await?;
    let (identities, lockouts, revocations, second_factors) = stores;

    let issuer = TokenIssuer::new(config.jwt_secret.as_bytes());
    let events: Arc<dyn SecurityEvents> = Arc::new(TracingEvents);

    let authenticator = Arc::new(Authenticator::new(
        identities.clone(),
        lockouts,
        second_factors.clone(),
        issuer.clone(),
        events.clone(),
    ));
    let sessions = Arc::new(SessionValidator::new(
        issuer,
        identities.clone(),
        revocations,
        events.clone(),
    ));
    let two_factor = Arc::new(TwoFactorService::new(
        identities,
        second_factors,
        events,
        config.totp_issuer.clone(),
    ));

    let app_state = AppState {
        authenticator,
        sessions,
        two_factor,
    };

    let router = routes::build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

/// Select the storage backend. This is the only place that knows both
/// variants; everything downstream sees trait objects.
async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    let policy = LockoutPolicy {
        threshold: config.lockout_threshold,
        lock_duration_secs: config.lockout_duration_secs,
        ..LockoutPolicy::default()
    };

    match config.storage {
        StorageMode::Memory => {
            tracing::warn!(
                "In-memory storage selected; authentication state will not survive a restart"
            );
            Ok((
                Arc::new(MemoryIdentityStore::new()),
                Arc::new(MemoryLockoutStore::new(policy)),
                Arc::new(MemoryRevocationStore::new()),
                Arc::new(MemorySecondFactorStore::new()),
            ))
        }
        StorageMode::Durable => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for durable storage")?;
            let redis_url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for durable storage")?;

            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            sqlx::migrate!()
                .run(&db_pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Database connection pool initialized");

            let redis_client =
                redis::Client::open(redis_url).context("failed to construct Redis client")?;
            let redis_conn = ConnectionManager::new(redis_client)
                .await
                .context("failed to initialize Redis connection manager")?;
            tracing::info!("Redis connection initialized");

            Ok((
                Arc::new(PgIdentityStore::new(db_pool)),
                Arc::new(RedisLockoutStore::new(redis_conn.clone(), policy)),
                Arc::new(RedisRevocationStore::new(redis_conn.clone())),
                Arc::new(RedisSecondFactorStore::new(redis_conn)),
            ))
        }
    }
}
