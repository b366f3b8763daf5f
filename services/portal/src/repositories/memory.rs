//! In-memory user store for tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::password::{hash_password, verify_password};
use super::{StoreError, UserStore};
use crate::models::{ProfileUpdate, User, UserId};

#[derive(Debug)]
struct Record {
    user: User,
    hashed_password: String,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: UserId,
    records: HashMap<UserId, Record>,
}

/// User store keeping records in a map. Email uniqueness is enforced the
/// same way the unique constraint does it in PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<Mutex<Inner>>,
    inserts: Arc<AtomicUsize>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert` calls seen, successful or not
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Remove a user, simulating a row deleted behind a live session
    pub async fn remove(&self, id: UserId) {
        self.inner.lock().await.records.remove(&id);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, email: &str, password: &str) -> Result<UserId, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let hashed_password = hash_password(password).await?;

        let mut inner = self.inner.lock().await;
        if inner.records.values().any(|r| r.user.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(
            id,
            Record {
                user: User {
                    id,
                    email: email.to_string(),
                    name: None,
                    age: None,
                    phone: None,
                    created: Utc::now(),
                },
                hashed_password,
            },
        );
        Ok(id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserId, StoreError> {
        let (id, hashed_password) = {
            let inner = self.inner.lock().await;
            let record = inner
                .records
                .values()
                .find(|r| r.user.email == email)
                .ok_or(StoreError::InvalidCredentials)?;
            (record.user.id, record.hashed_password.clone())
        };

        if !verify_password(&hashed_password, password).await? {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(id)
    }

    async fn get(&self, id: UserId) -> Result<User, StoreError> {
        self.inner
            .lock()
            .await
            .records
            .get(&id)
            .map(|r| r.user.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, changes: &ProfileUpdate, id: UserId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.user.name = changes.name.clone();
        record.user.phone = changes.phone.clone();
        record.user.age = Some(changes.age);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        let id = store.insert("a@example.com", "secret123").await.unwrap();
        assert_eq!(id, 1);

        let err = store
            .insert("a@example.com", "other-secret")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.insert_calls(), 2);
    }

    #[tokio::test]
    async fn test_authenticate_coalesces_failures() {
        let store = InMemoryUserStore::new();
        let id = store.insert("a@example.com", "secret123").await.unwrap();

        assert_eq!(
            store.authenticate("a@example.com", "secret123").await.unwrap(),
            id
        );
        assert!(matches!(
            store.authenticate("a@example.com", "wrong").await,
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("nobody@example.com", "secret123").await,
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let store = InMemoryUserStore::new();
        let id = store.insert("a@example.com", "secret123").await.unwrap();

        store
            .update(&ProfileUpdate::new("Ada", "0123456789", 36), id)
            .await
            .unwrap();

        let user = store.get(id).await.unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.phone.as_deref(), Some("0123456789"));
        assert_eq!(user.age, Some(36));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let store = InMemoryUserStore::new();
        assert!(matches!(store.get(7).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.update(&ProfileUpdate::default(), 7).await,
            Err(StoreError::NotFound)
        ));
    }
}
