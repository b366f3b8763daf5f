//! Portal models

pub mod user;

// Re-export for convenience
pub use user::{ProfileUpdate, User, UserId};
