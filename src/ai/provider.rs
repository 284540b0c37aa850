//! The common interface every hosted LLM vendor is adapted to.

use std::fmt;
use std::str::FromStr;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::chat::Message;

/// Sampling parameters are the same for every provider and request.
pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u32 = 2048;

/// Incremental pieces of a streamed reply. Consumed once, a new
/// request is needed for another pass.
pub type FragmentStream = BoxStream<'static, Result<String, Error>>;

/// Stream a chat completion for the full transcript of messages,
/// including the leading system message.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send(&self, model: &str, messages: &[Message]) -> Result<FragmentStream, Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum ProviderKind {
    #[serde(rename = "groq")]
    #[value(name = "groq")]
    Groq,
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    #[value(name = "anthropic")]
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Groq,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "Groq",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding the API key
    pub fn credential_key(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Prefix of the optional host and model list overrides
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "ADVISOR_GROQ",
            ProviderKind::OpenAi => "ADVISOR_OPENAI",
            ProviderKind::Anthropic => "ADVISOR_ANTHROPIC",
        }
    }

    pub fn default_hostname(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai",
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Groq => &["llama-3.3-70b-versatile", "llama-3.1-8b-instant"],
            ProviderKind::OpenAi => &["gpt-4o-mini", "gpt-4o"],
            ProviderKind::Anthropic => &["claude-3-5-sonnet-latest", "claude-3-5-haiku-latest"],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.name() == needle)
            .ok_or(anyhow!("Unknown provider: {}", s))
    }
}

/// Read-only view of a configured provider that is safe to hand to
/// clients. Never carries the credential itself.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProviderDescriptor {
    pub name: ProviderKind,
    pub display_name: String,
    pub models: Vec<String>,
    pub credential_key: String,
}
