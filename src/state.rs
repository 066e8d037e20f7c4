//! Shared application state.
//!
//! Handlers extract only the part they need (`State<DbPool>`,
//! `State<Mailer>`, ...) through the `FromRef` impls below.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, db::DbPool, services::email_service::Mailer};

/// Settings handlers need at request time.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Base URL of the web client, without trailing slash
    pub app_base_url: String,
    pub invitation_ttl_hours: i64,
    /// Single allowed CORS origin; any origin when unset
    pub cors_allowed_origin: Option<String>,
}

impl AppSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_base_url: config.app_base_url.trim_end_matches('/').to_string(),
            invitation_ttl_hours: config.invitation_ttl_hours,
            cors_allowed_origin: config.cors_allowed_origin.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub mailer: Mailer,
    pub settings: Arc<AppSettings>,
}

impl AppState {
    pub fn new(pool: DbPool, mailer: Mailer, settings: AppSettings) -> Self {
        Self {
            pool,
            mailer,
            settings: Arc::new(settings),
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Mailer {
    fn from_ref(state: &AppState) -> Self {
        state.mailer.clone()
    }
}

impl FromRef<AppState> for Arc<AppSettings> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}
