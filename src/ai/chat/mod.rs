mod core;
mod models;

pub use self::core::{CURSOR, ChatSession, Exchange, Reply};
pub use models::{Message, Role, Transcript};
