//! Database module for handling PostgreSQL connections and operations
//!
//! This module provides connection pooling, configuration, the bootstrap
//! retry loop, migrations and health checks for the PostgreSQL database.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Pool, Postgres};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Database configuration struct
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database server host
    pub host: String,
    /// Database server port
    pub port: u16,
    /// Role used to connect
    pub user: String,
    /// Password for `user`
    pub password: String,
    /// Database name
    pub name: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long one attempt may wait for a connection
    pub connection_timeout: Duration,
    /// How many times bootstrap tries to reach the server
    pub connect_attempts: u32,
    /// Pause between two bootstrap attempts
    pub connect_interval: Duration,
}

impl DatabaseConfig {
    /// Create a new DatabaseConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DB_HOST`: server host (default: localhost)
    /// - `DB_PORT`: server port (default: 5432)
    /// - `DB_USER`: role name (required)
    /// - `DB_PASSWORD`: role password (default: empty)
    /// - `DB_NAME`: database name (required)
    /// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `DATABASE_CONNECTION_TIMEOUT`: seconds one attempt may wait (default: 30)
    /// - `DB_CONNECT_ATTEMPTS`: bootstrap attempts (default: 40)
    /// - `DB_CONNECT_INTERVAL`: seconds between attempts (default: 5)
    pub fn from_env() -> DatabaseResult<Self> {
        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());

        let port = match env::var("DB_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| DatabaseError::Configuration(format!("Invalid DB_PORT: {}", e)))?,
            Err(_) => 5432,
        };

        let user = required("DB_USER")?;
        let password = env::var("DB_PASSWORD").unwrap_or_default();
        let name = required("DB_NAME")?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let connection_timeout = env::var("DATABASE_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let connect_attempts = env::var("DB_CONNECT_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|attempts| *attempts > 0)
            .unwrap_or(40);

        let connect_interval = env::var("DB_CONNECT_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        Ok(Self {
            host,
            port,
            user,
            password,
            name,
            max_connections,
            connection_timeout,
            connect_attempts,
            connect_interval,
        })
    }

    /// Connection options for this configuration. TLS is not negotiated.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .ssl_mode(PgSslMode::Disable)
    }
}

fn required(key: &str) -> DatabaseResult<String> {
    env::var(key)
        .map_err(|_| DatabaseError::Configuration(format!("{} environment variable not set", key)))
}

/// Initialize a PostgreSQL connection pool
///
/// # Arguments
///
/// * `config` - Database configuration
///
/// # Returns
///
/// * `DatabaseResult<Pool<Postgres>>` - PostgreSQL connection pool or error
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<Pool<Postgres>> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connection_timeout)
        .connect_with(config.connect_options())
        .await
        .map_err(DatabaseError::Connection)
}

/// Initialize the pool, retrying while the server is not reachable yet
///
/// Each attempt opens the pool and runs a `SELECT 1` probe. The loop gives
/// up after `config.connect_attempts` failures.
pub async fn connect_with_retry(config: &DatabaseConfig) -> DatabaseResult<Pool<Postgres>> {
    info!(
        "Attempting to connect to PostgreSQL at {}:{}",
        config.host, config.port
    );

    let mut attempt = 1;
    loop {
        let result = match init_pool(config).await {
            Ok(pool) => sqlx::query("SELECT 1")
                .execute(&pool)
                .await
                .map(|_| pool),
            Err(DatabaseError::Connection(e)) => Err(e),
            Err(other) => return Err(other),
        };

        match result {
            Ok(pool) => {
                info!("Successfully connected to the database");
                return Ok(pool);
            }
            Err(e) if attempt >= config.connect_attempts => {
                return Err(DatabaseError::Unavailable {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                warn!(
                    "DB connection failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt, config.connect_attempts, e, config.connect_interval
                );
                tokio::time::sleep(config.connect_interval).await;
                attempt += 1;
            }
        }
    }
}

/// Apply the embedded migrations of a service
pub async fn run_migrations(pool: &PgPool, migrator: &Migrator) -> DatabaseResult<()> {
    migrator.run(pool).await.map_err(DatabaseError::Migration)?;
    info!("Database migrations applied");
    Ok(())
}

/// Check database connectivity
///
/// # Arguments
///
/// * `pool` - PostgreSQL connection pool
///
/// # Returns
///
/// * `DatabaseResult<bool>` - True if connection is successful, false otherwise
pub async fn health_check(pool: &PgPool) -> DatabaseResult<bool> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::Query)?;

    Ok(true)
}
