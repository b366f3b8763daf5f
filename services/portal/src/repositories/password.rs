//! Argon2 password hashing
//!
//! Hashing is CPU bound, so both operations run on the blocking pool.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};

use super::StoreError;

/// Hash `password` into a PHC string with a fresh salt
pub async fn hash_password(password: &str) -> Result<String, StoreError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| StoreError::PasswordHash(e.to_string()))?
}

/// Check `password` against a stored PHC string
pub async fn verify_password(hash: &str, password: &str) -> Result<bool, StoreError> {
    let hash = hash.to_owned();
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed_hash =
            PasswordHash::new(&hash).map_err(|e| StoreError::PasswordHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(StoreError::PasswordHash(e.to_string())),
        }
    })
    .await
    .map_err(|e| StoreError::PasswordHash(e.to_string()))?
}
