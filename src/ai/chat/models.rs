//! The core models for managing a stateful chat with an LLM.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// Ordered messages of one session, oldest first. The first message
/// is always the system message and survives `reset`.
#[derive(Clone, Debug)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new(system_message: &str) -> Self {
        Self(vec![Message::new(Role::System, system_message)])
    }

    pub fn append(&mut self, role: Role, content: &str) {
        self.0.push(Message::new(role, content))
    }

    /// Drop everything except the system message
    pub fn reset(&mut self) {
        self.0.truncate(1);
    }

    /// Messages shown to the user, i.e. all but the system message
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.0.iter().skip(1)
    }

    /// The full sequence replayed to the provider on every turn
    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn system_message(&self) -> &Message {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
