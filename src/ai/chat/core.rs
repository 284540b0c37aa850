use anyhow::{Error, Result, anyhow};
use futures_util::StreamExt;

use super::models::{Message, Role, Transcript};
use crate::ai::prompt::APOLOGY;
use crate::ai::provider::ProviderKind;
use crate::ai::registry::{ProviderRegistry, Selection};

/// Appended to the partial reply while it is still streaming
pub const CURSOR: &str = "▌";

/// Accumulates streamed fragments into the final reply.
#[derive(Default, Debug)]
pub struct Reply(String);

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        self.0.push_str(fragment)
    }

    pub fn content(&self) -> &str {
        &self.0
    }

    /// The reply so far followed by the cursor glyph
    pub fn partial_display(&self) -> String {
        format!("{}{}", self.0, CURSOR)
    }

    pub fn into_content(self) -> String {
        self.0
    }
}

/// Outcome of one user turn. `content` is what was recorded as the
/// assistant message, the apology when `failed` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub content: String,
    pub failed: bool,
}

/// State of one interactive session: its transcript and the provider
/// it currently talks to. Owned by whoever drives the session (a REPL
/// loop or the API's session map), never shared between sessions.
pub struct ChatSession {
    id: String,
    transcript: Transcript,
    selection: Selection,
}

impl ChatSession {
    pub fn new(id: &str, system_message: &str, selection: Selection) -> Self {
        Self {
            id: id.to_string(),
            transcript: Transcript::new(system_message),
            selection,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.transcript.visible()
    }

    pub fn reset(&mut self) {
        self.transcript.reset()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Switch provider and/or model. The transcript is left as is so the
    /// next turn replays the same history to the new provider.
    pub fn select(
        &mut self,
        registry: &ProviderRegistry,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<&Selection, Error> {
        self.selection = registry.resolve(provider, model)?;
        tracing::debug!(
            "Session {} switched to {} {}",
            self.id,
            self.selection.provider,
            self.selection.model
        );
        Ok(&self.selection)
    }

    pub fn footer(&self) -> String {
        format!(
            "Powered by {} API | Model: {}",
            self.selection.provider.display_name(),
            self.selection.model
        )
    }

    /// Run one turn of the chat: record the user's message, stream the
    /// reply calling `on_fragment` for every piece, and record the
    /// assistant's message.
    ///
    /// Never fails. Any error along the way is logged and the reply is
    /// replaced by a fixed apology, partial content is discarded.
    pub async fn exchange<F>(
        &mut self,
        registry: &ProviderRegistry,
        text: &str,
        on_fragment: F,
    ) -> Exchange
    where
        F: FnMut(&str) + Send,
    {
        self.transcript.append(Role::User, text);

        let result = Self::stream_reply(
            registry,
            &self.selection,
            self.transcript.messages(),
            on_fragment,
        )
        .await;

        let exchange = match result {
            Ok(content) => Exchange {
                content,
                failed: false,
            },
            Err(e) => {
                tracing::error!(
                    "Exchange failed for session {} using {} {}: {:#}",
                    self.id,
                    self.selection.provider,
                    self.selection.model,
                    e
                );
                Exchange {
                    content: APOLOGY.to_string(),
                    failed: true,
                }
            }
        };

        self.transcript.append(Role::Assistant, &exchange.content);
        exchange
    }

    async fn stream_reply<F>(
        registry: &ProviderRegistry,
        selection: &Selection,
        messages: &[Message],
        mut on_fragment: F,
    ) -> Result<String, Error>
    where
        F: FnMut(&str) + Send,
    {
        let provider = registry
            .get(selection.provider)
            .ok_or(anyhow!("Provider {} is not configured", selection.provider))?;

        let mut stream = provider.send(&selection.model, messages).await?;
        let mut reply = Reply::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            reply.push(&fragment);
            on_fragment(&fragment);
        }

        Ok(reply.into_content())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::ai::provider::{ChatProvider, FragmentStream};
    use crate::core::ProviderConfig;

    /// Replies with canned fragments and remembers what it was sent
    struct ScriptedProvider {
        fragments: Vec<&'static str>,
        fail_after: Option<usize>,
        fail_on_send: bool,
        received: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail_after: None,
                fail_on_send: false,
                received: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn send(&self, _model: &str, messages: &[Message]) -> Result<FragmentStream, Error> {
            self.received.lock().unwrap().push(messages.to_vec());
            if self.fail_on_send {
                return Err(anyhow!("connection refused"));
            }
            let mut items: Vec<Result<String, Error>> = self
                .fragments
                .iter()
                .map(|f| Ok(f.to_string()))
                .collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(anyhow!("stream reset")));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn config(kind: ProviderKind, models: &[&str]) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: "test-key".to_string(),
            api_hostname: "http://localhost".to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn registry_with(provider: Arc<ScriptedProvider>) -> ProviderRegistry {
        let groq: Arc<dyn ChatProvider> = provider;
        let anthropic: Arc<dyn ChatProvider> =
            Arc::new(ScriptedProvider::new(vec!["From Claude"]));
        ProviderRegistry::new(vec![
            (config(ProviderKind::Groq, &["llama-a", "llama-b"]), groq),
            (config(ProviderKind::Anthropic, &["claude-a"]), anthropic),
        ])
        .unwrap()
    }

    fn session(registry: &ProviderRegistry) -> ChatSession {
        ChatSession::new("test", "You are a DJ.", registry.default_selection())
    }

    #[test]
    fn test_reply_partial_display() {
        let mut reply = Reply::new();
        assert_eq!(reply.partial_display(), "▌");
        reply.push("Kind of ");
        reply.push("Blue");
        assert_eq!(reply.partial_display(), "Kind of Blue▌");
        assert_eq!(reply.content(), "Kind of Blue");
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let provider = Arc::new(ScriptedProvider::new(vec!["Try ", "Kind of ", "Blue."]));
        let registry = registry_with(Arc::clone(&provider));
        let mut session = session(&registry);

        let mut seen = Vec::new();
        let exchange = session
            .exchange(&registry, "Recommend jazz", |f| seen.push(f.to_string()))
            .await;

        assert!(!exchange.failed);
        assert_eq!(exchange.content, "Try Kind of Blue.");
        assert_eq!(seen, vec!["Try ", "Kind of ", "Blue."]);
        assert_eq!(session.transcript().len(), 3);

        let visible: Vec<&Message> = session.visible().collect();
        assert_eq!(
            visible,
            vec![
                &Message::new(Role::User, "Recommend jazz"),
                &Message::new(Role::Assistant, "Try Kind of Blue."),
            ]
        );

        // The provider got the full transcript including the system message
        let received = provider.received.lock().unwrap();
        assert_eq!(received[0][0], Message::new(Role::System, "You are a DJ."));
        assert_eq!(received[0][1], Message::new(Role::User, "Recommend jazz"));
    }

    #[tokio::test]
    async fn test_each_exchange_adds_two_messages() {
        let provider = Arc::new(ScriptedProvider::new(vec!["ok"]));
        let registry = registry_with(Arc::clone(&provider));
        let mut session = session(&registry);

        for i in 1..=3 {
            session.exchange(&registry, "again", |_| {}).await;
            assert_eq!(session.transcript().len(), 1 + 2 * i);
        }
        // Every turn replays the whole history
        assert_eq!(provider.received.lock().unwrap()[2].len(), 6);
    }

    #[tokio::test]
    async fn test_failed_send_records_apology() {
        let mut provider = ScriptedProvider::new(vec!["never"]);
        provider.fail_on_send = true;
        let registry = registry_with(Arc::new(provider));
        let mut session = session(&registry);

        let exchange = session.exchange(&registry, "Recommend jazz", |_| {}).await;

        assert!(exchange.failed);
        assert_eq!(exchange.content, APOLOGY);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(
            session.transcript().messages()[2],
            Message::new(Role::Assistant, APOLOGY)
        );
    }

    #[tokio::test]
    async fn test_failure_mid_stream_discards_partial_reply() {
        let mut provider = ScriptedProvider::new(vec!["Try ", "Kind of ", "Blue."]);
        provider.fail_after = Some(2);
        let registry = registry_with(Arc::new(provider));
        let mut session = session(&registry);

        let mut seen = Vec::new();
        let exchange = session
            .exchange(&registry, "Recommend jazz", |f| seen.push(f.to_string()))
            .await;

        assert_eq!(seen, vec!["Try ", "Kind of "]);
        assert!(exchange.failed);
        assert_eq!(session.transcript().messages()[2].content, APOLOGY);
    }

    #[tokio::test]
    async fn test_switching_provider_keeps_transcript() {
        let provider = Arc::new(ScriptedProvider::new(vec!["From Groq"]));
        let registry = registry_with(provider);
        let mut session = session(&registry);

        session.exchange(&registry, "Recommend jazz", |_| {}).await;
        let before = session.transcript().messages().to_vec();

        let selection = session
            .select(&registry, ProviderKind::Anthropic, None)
            .unwrap()
            .clone();
        assert_eq!(selection.model, "claude-a");
        assert_eq!(session.transcript().messages(), before.as_slice());
        assert_eq!(session.footer(), "Powered by Anthropic API | Model: claude-a");

        let exchange = session.exchange(&registry, "And rock?", |_| {}).await;
        assert_eq!(exchange.content, "From Claude");
        assert_eq!(&session.transcript().messages()[..3], before.as_slice());
    }

    #[tokio::test]
    async fn test_invalid_selection_is_rejected_and_unchanged() {
        let registry = registry_with(Arc::new(ScriptedProvider::new(vec![])));
        let mut session = session(&registry);

        assert!(session.select(&registry, ProviderKind::OpenAi, None).is_err());
        assert!(
            session
                .select(&registry, ProviderKind::Groq, Some("gpt-4o"))
                .is_err()
        );
        assert_eq!(session.selection(), &registry.default_selection());
        assert_eq!(session.footer(), "Powered by Groq API | Model: llama-a");
    }

    #[tokio::test]
    async fn test_reset_after_exchanges() {
        let registry = registry_with(Arc::new(ScriptedProvider::new(vec!["ok"])));
        let mut session = session(&registry);
        session.exchange(&registry, "one", |_| {}).await;
        session.exchange(&registry, "two", |_| {}).await;

        session.reset();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.visible().count(), 0);
        assert_eq!(
            session.transcript().system_message(),
            &Message::new(Role::System, "You are a DJ.")
        );
    }
}
