//! Application state shared across handlers

use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    repositories::UserStore, session::SessionConfig, settings::Settings, templates::Templates,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub templates: Arc<Templates>,
    pub cookie_key: Key,
    pub session: SessionConfig,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, templates: Templates, settings: &Settings) -> Self {
        Self {
            users,
            templates: Arc::new(templates),
            cookie_key: settings.cookie_key(),
            session: SessionConfig {
                secure: settings.cookie_secure,
                max_age: Duration::from_secs(settings.session_max_age),
            },
        }
    }
}
