//! User persistence capability and its implementations

use async_trait::async_trait;
use common::error::DatabaseError;
use thiserror::Error;

use crate::models::{ProfileUpdate, User, UserId};

#[cfg(test)]
pub mod memory;
pub mod password;
pub mod user;

pub use user::PgUserStore;

/// Failures reported by a [`UserStore`]
///
/// The first three variants are expected outcomes the handlers turn into
/// form messages or a login view. The rest are infrastructure failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate email")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no matching record found")]
    NotFound,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Storage for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Hash `password` and create a user, returning its id
    async fn insert(&self, email: &str, password: &str) -> Result<UserId, StoreError>;

    /// Id of the user owning `email` if `password` matches its hash.
    /// An unknown email and a wrong password both yield
    /// [`StoreError::InvalidCredentials`].
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserId, StoreError>;

    async fn get(&self, id: UserId) -> Result<User, StoreError>;

    /// Overwrite name, phone and age of user `id`
    async fn update(&self, changes: &ProfileUpdate, id: UserId) -> Result<(), StoreError>;

    /// Probe the backing storage
    async fn health_check(&self) -> Result<(), StoreError>;
}
