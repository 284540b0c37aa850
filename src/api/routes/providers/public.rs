//! Public types for the providers API
use serde::Serialize;

use crate::ai::{ProviderDescriptor, Selection};

#[derive(Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderDescriptor>,
    pub default: Selection,
}
