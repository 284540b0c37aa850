//! Router for the providers API

use axum::{Json, Router, extract::State, routing::get};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::{SharedState, read_state};

/// List configured providers and their models. Credentials are never
/// included, only the name of the variable they were read from.
async fn providers(
    State(state): State<SharedState>,
) -> Result<Json<public::ProvidersResponse>, ApiError> {
    let registry = read_state(&state)?.registry.clone();

    Ok(Json(public::ProvidersResponse {
        providers: registry.descriptors(),
        default: registry.default_selection(),
    }))
}

/// Create the providers router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(providers))
}
