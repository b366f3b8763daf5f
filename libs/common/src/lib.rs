//! Common library for the portal workspace
//!
//! This crate provides shared infrastructure used by the services in the
//! workspace: PostgreSQL configuration, pool bootstrap with connection
//! retry, migrations and the database error type.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, connect_with_retry, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = connect_with_retry(&config).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
