use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use ocha_llm::{ChatClient, ChatOptions, ChatRequest, Message as EngineMessage, StreamEvent};
use ocha_persist::{ConversationStore, Message, MessagePart, MessageRole};

use crate::accumulator::TurnAccumulator;
use crate::error::ChatError;

pub type EventStream = Pin<Box<dyn Stream<Item = anyhow::Result<StreamEvent>> + Send>>;

/// How the two best-effort saves of a chat turn react to storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    /// Log and continue; the model response is still delivered (the
    /// source's behavior).
    #[default]
    BestEffort,
    /// A failed pre-generation save aborts the turn.
    Strict,
}

#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// How many stored messages to replay as context
    pub history_limit: usize,
    pub persistence: PersistenceMode,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            history_limit: 20,
            persistence: PersistenceMode::default(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Executes one chat turn: ownership check, history replay, user-turn
/// persistence, engine invocation, streamed delivery, assistant-turn
/// persistence.
pub struct Orchestrator {
    store: Arc<dyn ConversationStore>,
    engine: Arc<dyn ChatClient>,
    model: String,
    options: TurnOptions,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        engine: Arc<dyn ChatClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            engine,
            model: model.into(),
            options: TurnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one turn against a stored thread.
    ///
    /// The user message is durable before the engine is invoked; the
    /// assistant message is written only after the engine signals
    /// completion, on a spawned task that never blocks delivery.
    pub async fn run_turn(
        &self,
        thread_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<EventStream, ChatError> {
        // Ownership check; a mismatch is indistinguishable from absence.
        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or_else(|| ChatError::ThreadNotFound(thread_id.to_string()))?;
        if thread.user_id != user_id {
            tracing::debug!(thread_id, "Ownership mismatch on chat turn");
            return Err(ChatError::ThreadNotFound(thread_id.to_string()));
        }

        // Most recent N messages, chronological, flattened to text.
        let stored = self.store.list_messages(thread_id).await?;
        let skip = stored.len().saturating_sub(self.options.history_limit);
        let mut context: Vec<EngineMessage> =
            stored[skip..].iter().map(to_engine_message).collect();

        // Persist the user turn before generation so it survives an engine
        // failure. In best-effort mode a failed save is logged and the turn
        // proceeds with the in-memory message.
        let user_message_id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self
            .store
            .add_message(
                &user_message_id,
                thread_id,
                MessageRole::User,
                vec![MessagePart::text(content)],
            )
            .await
        {
            match self.options.persistence {
                PersistenceMode::Strict => return Err(ChatError::Storage(e)),
                PersistenceMode::BestEffort => {
                    tracing::error!(thread_id, "Failed to save user message: {}", e);
                }
            }
        }

        context.push(EngineMessage::human(content));

        let request = ChatRequest::new(self.model.as_str(), context).with_options(ChatOptions {
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            tools: None,
        });

        let engine_stream = self
            .engine
            .chat_stream(request)
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        Ok(self.wrap_stream(engine_stream, thread_id.to_string()))
    }

    /// Stateless turn for the legacy request shape: the caller supplies the
    /// full context and nothing is persisted.
    pub async fn stream_stateless(
        &self,
        messages: Vec<EngineMessage>,
    ) -> Result<EventStream, ChatError> {
        let request = ChatRequest::new(self.model.as_str(), messages).with_options(ChatOptions {
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            tools: None,
        });

        self.engine
            .chat_stream(request)
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))
    }

    /// Forward engine events to the caller while accumulating them; once the
    /// engine signals completion, write the assistant message without
    /// holding up the stream. At-most-once, no retry.
    fn wrap_stream(&self, mut engine_stream: EventStream, thread_id: String) -> EventStream {
        let store = Arc::clone(&self.store);

        Box::pin(async_stream::stream! {
            let mut accumulator = TurnAccumulator::new();
            let mut completed = false;

            while let Some(event) = engine_stream.next().await {
                match event {
                    Ok(event) => {
                        accumulator.push(&event);
                        let done = matches!(event, StreamEvent::Done { .. });
                        yield Ok(event);
                        if done {
                            completed = true;
                            break;
                        }
                    }
                    Err(e) => {
                        // Mid-stream engine failure: deliver the error, skip
                        // the assistant save.
                        yield Err(e);
                        return;
                    }
                }
            }

            if completed && !accumulator.is_empty() {
                let parts = accumulator.into_parts();
                let message_id = uuid::Uuid::new_v4().to_string();
                tokio::spawn(async move {
                    if let Err(e) = store
                        .add_message(&message_id, &thread_id, MessageRole::Assistant, parts)
                        .await
                    {
                        tracing::error!(%thread_id, "Failed to save assistant message: {}", e);
                    }
                });
            }
        })
    }
}

/// Replay a stored message as engine context via its flattened text view.
fn to_engine_message(message: &Message) -> EngineMessage {
    let text = message.text();
    match message.role {
        MessageRole::User => EngineMessage::human(text),
        MessageRole::Assistant => EngineMessage::ai(text),
        MessageRole::System => EngineMessage::system(text),
    }
}
