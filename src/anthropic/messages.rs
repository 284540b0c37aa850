//! Anthropic Messages API with streaming.
//!
//! Anthropic does not accept a `system` role inside `messages`. The
//! system prompt is lifted into its own top level field and the rest
//! of the transcript is sent without it.

use std::time::Duration;

use anyhow::{Error, Result, anyhow, bail};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::ai::chat::{Message, Role};
use crate::ai::provider::{ChatProvider, FragmentStream, MAX_TOKENS, TEMPERATURE};
use crate::core::sse::data_events;

pub const API_VERSION: &str = "2023-06-01";

pub struct AnthropicMessages {
    client: reqwest::Client,
    api_hostname: String,
    api_key: String,
}

impl AnthropicMessages {
    pub fn new(api_hostname: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicMessages {
    async fn send(&self, model: &str, messages: &[Message]) -> Result<FragmentStream, Error> {
        let url = format!("{}/v1/messages", self.api_hostname.trim_end_matches("/"));
        let request = MessagesRequest::new(model, messages);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(Duration::from_secs(60 * 5))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Anthropic request failed with status {}: {}", status, body);
        }

        Ok(Box::pin(text_deltas(response.bytes_stream())))
    }
}

#[derive(Serialize, Debug)]
struct RequestMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<RequestMessage<'a>>,
    stream: bool,
}

impl<'a> MessagesRequest<'a> {
    fn new(model: &'a str, transcript: &'a [Message]) -> Self {
        let (system, rest): (Vec<&Message>, Vec<&Message>) =
            transcript.iter().partition(|m| m.role == Role::System);
        let system = system.first().map(|m| m.content.as_str());
        let messages = rest
            .into_iter()
            .map(|m| RequestMessage {
                role: m.role,
                content: &m.content,
            })
            .collect();

        Self {
            model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages,
            stream: true,
        }
    }
}

/// Streaming events from the Messages API
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum StreamEvent {
    /// Incremental update to a content block
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: Delta },

    /// End of the message
    #[serde(rename = "message_stop")]
    MessageStop,

    /// Errors can arrive mid-stream, e.g. `overloaded_error`
    #[serde(rename = "error")]
    Error { error: ErrorBody },

    // message_start, content_block_start, content_block_stop,
    // message_delta and ping carry nothing we display
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum Delta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },

    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

fn text_deltas<S, B, E>(byte_stream: S) -> impl futures::Stream<Item = Result<String, Error>>
where
    S: futures::Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    let events = data_events(byte_stream);
    try_stream! {
        let mut events = Box::pin(events);
        while let Some(data) = events.next().await {
            let data = data?;
            let event = serde_json::from_str::<StreamEvent>(&data).inspect_err(|e| {
                tracing::error!("Parsing stream event failed for {}\nError:{}", data, e)
            })?;

            match event {
                StreamEvent::ContentBlockDelta {
                    delta: Delta::TextDelta { text },
                } => {
                    if !text.is_empty() {
                        yield text;
                    }
                }
                StreamEvent::MessageStop => break,
                StreamEvent::Error { error } => {
                    Err::<(), Error>(anyhow!(
                        "Anthropic stream error {}: {}",
                        error.error_type,
                        error.message
                    ))?;
                }
                _ => {}
            }
        }
    }
}
