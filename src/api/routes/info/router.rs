//! Router for the page text shown around the chat

use axum::{Json, Router, routing::get};

use super::public;
use crate::ai::prompt::{ABOUT, TAGLINE, TITLE, USAGE_TIPS};
use crate::api::state::SharedState;

async fn info() -> Json<public::InfoResponse> {
    Json(public::InfoResponse {
        title: TITLE.to_string(),
        tagline: TAGLINE.to_string(),
        about: ABOUT.iter().map(|s| s.to_string()).collect(),
        usage_tips: USAGE_TIPS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Create the info router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(info))
}
