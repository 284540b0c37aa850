mod messages;
pub use messages::{API_VERSION, AnthropicMessages};
