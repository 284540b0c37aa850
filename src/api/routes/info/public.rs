//! Public types for the info API
use serde::Serialize;

#[derive(Serialize)]
pub struct InfoResponse {
    pub title: String,
    pub tagline: String,
    pub about: Vec<String>,
    pub usage_tips: Vec<String>,
}
