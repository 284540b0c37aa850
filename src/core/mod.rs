mod config;
mod logging;
pub mod sse;

pub use config::{AppConfig, ProviderConfig};
pub use logging::init_tracing;
