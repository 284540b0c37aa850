use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::ai::chat::Message;
use crate::ai::provider::{ChatProvider, FragmentStream, MAX_TOKENS, TEMPERATURE};
use crate::core::sse::data_events;

/// Streaming chat completions against any OpenAI compatible API. Used
/// for both OpenAI and Groq, which only differ by hostname and key.
pub struct OpenAiCompatible {
    client: reqwest::Client,
    api_hostname: String,
    api_key: String,
}

impl OpenAiCompatible {
    pub fn new(api_hostname: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatible {
    async fn send(&self, model: &str, messages: &[Message]) -> Result<FragmentStream, Error> {
        completion_stream(
            &self.client,
            messages,
            &self.api_hostname,
            &self.api_key,
            model,
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    delta: Delta,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

// Only the choices matter here, vendors disagree on the rest of the
// fields (Groq adds `x_groq`, some omit `system_fingerprint`)
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    choices: Vec<CompletionChunkChoice>,
}

fn payload(messages: &[Message], model: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": messages,
        "temperature": TEMPERATURE,
        "max_tokens": MAX_TOKENS,
        "stream": true,
    })
}

/// Send the whole transcript, verbatim, and stream back the content
/// deltas as they arrive.
pub async fn completion_stream(
    client: &reqwest::Client,
    messages: &[Message],
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<FragmentStream, Error> {
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 5))
        .json(&payload(messages, model))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Chat completion failed with status {}: {}", status, body));
    }

    Ok(Box::pin(content_deltas(response.bytes_stream())))
}

fn content_deltas<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<String, Error>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    let events = data_events(byte_stream);
    try_stream! {
        let mut events = Box::pin(events);
        while let Some(data) = events.next().await {
            let data = data?;

            // Handle the end of the stream
            if data == "[DONE]" {
                break;
            }

            let chunk = serde_json::from_str::<CompletionChunk>(&data).inspect_err(|e| {
                tracing::error!("Parsing completion chunk failed for {}\nError:{}", data, e)
            })?;

            // Usage only chunks have no choices
            let Some(choice) = chunk.choices.into_iter().next() else {
                continue;
            };
            if let Some(content) = choice.delta.content
                && !content.is_empty()
            {
                yield content;
            }
        }
    }
}
