//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database identifier of a user
pub type UserId = i32;

/// User entity as read back for the dashboard. The password hash never
/// leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[sqlx(rename = "username")]
    pub name: Option<String>,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub created: DateTime<Utc>,
}

/// Profile update payload. Email and password are not editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub age: i32,
}

impl ProfileUpdate {
    /// Blank name or phone are stored as NULL
    pub fn new(name: &str, phone: &str, age: i32) -> Self {
        let non_blank = |value: &str| (!value.trim().is_empty()).then(|| value.to_string());

        Self {
            name: non_blank(name),
            phone: non_blank(phone),
            age,
        }
    }
}
