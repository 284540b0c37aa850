//! Public types for the chat sessions API
use serde::{Deserialize, Serialize};

use crate::ai::ProviderKind;
use crate::ai::chat::{ChatSession, Exchange, Message};

#[derive(Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct SelectProviderRequest {
    pub provider: String,
    pub model: Option<String>,
}

/// A session as the page renders it. `messages` never includes the
/// system message.
#[derive(Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub footer: String,
    pub messages: Vec<Message>,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        let selection = session.selection();
        Self {
            id: session.id().to_string(),
            provider: selection.provider,
            model: selection.model.clone(),
            footer: session.footer(),
            messages: session.visible().cloned().collect(),
        }
    }
}

/// Payload of each `fragment` event
#[derive(Serialize, Deserialize)]
pub struct FragmentEvent {
    pub content: String,
}

/// Payload of the final `done` event. `content` is the complete
/// assistant message that was recorded.
#[derive(Serialize, Deserialize)]
pub struct DoneEvent {
    pub content: String,
    pub failed: bool,
}

impl From<Exchange> for DoneEvent {
    fn from(exchange: Exchange) -> Self {
        Self {
            content: exchange.content,
            failed: exchange.failed,
        }
    }
}
