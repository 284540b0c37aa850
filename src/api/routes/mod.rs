//! API routes module

pub mod info;
pub mod providers;
pub mod sessions;

use crate::api::state::SharedState;
use axum::Router;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Page text routes
        .nest("/info", info::router())
        // Provider and model routes
        .nest("/providers", providers::router())
        // Chat session routes
        .nest("/sessions", sessions::router())
}
