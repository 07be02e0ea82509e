use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use ocha_chat::{ChatError, Orchestrator, PersistenceMode, TurnOptions};
use ocha_llm::{ChatClient, ChatRequest, ChatResponse, Message as EngineMessage, StreamEvent};
use ocha_persist::{
    ConversationStore, MemoryConversationStore, Message, MessagePart, MessageRole, StoreError,
    Thread,
};

/// Engine stub that replays a scripted event stream and captures every
/// request it receives.
struct StubEngine {
    script: Vec<StreamEvent>,
    captured: Mutex<Vec<ChatRequest>>,
}

impl StubEngine {
    fn new(script: Vec<StreamEvent>) -> Self {
        Self {
            script,
            captured: Mutex::new(Vec::new()),
        }
    }

    fn replying(text: &str) -> Self {
        Self::new(vec![
            StreamEvent::Message {
                content: text.to_string(),
            },
            StreamEvent::Done {
                finish_reason: Some("stop".to_string()),
            },
        ])
    }

    fn last_request(&self) -> ChatRequest {
        self.captured.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatClient for StubEngine {
    async fn chat(&self, request: ChatRequest) -> anyhow::Result<ChatResponse> {
        self.captured.lock().unwrap().push(request);
        Ok(ChatResponse {
            content: None,
            tool_calls: None,
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
    ) -> anyhow::Result<Pin<Box<dyn Stream<Item = anyhow::Result<StreamEvent>> + Send>>> {
        self.captured.lock().unwrap().push(request);
        let events: Vec<anyhow::Result<StreamEvent>> =
            self.script.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// Engine stub that is unreachable.
struct DownEngine;

#[async_trait]
impl ChatClient for DownEngine {
    async fn chat(&self, _request: ChatRequest) -> anyhow::Result<ChatResponse> {
        anyhow::bail!("connection refused")
    }

    async fn chat_stream(
        &self,
        _request: ChatRequest,
    ) -> anyhow::Result<Pin<Box<dyn Stream<Item = anyhow::Result<StreamEvent>> + Send>>> {
        anyhow::bail!("connection refused")
    }
}

/// Store wrapper whose message appends always fail.
struct FailingAppendStore {
    inner: MemoryConversationStore,
}

#[async_trait]
impl ConversationStore for FailingAppendStore {
    async fn create_thread(
        &self,
        id: &str,
        owner_id: &str,
        title: Option<String>,
    ) -> ocha_persist::Result<Thread> {
        self.inner.create_thread(id, owner_id, title).await
    }

    async fn get_thread(&self, id: &str) -> ocha_persist::Result<Option<Thread>> {
        self.inner.get_thread(id).await
    }

    async fn list_threads(&self, owner_id: &str) -> ocha_persist::Result<Vec<Thread>> {
        self.inner.list_threads(owner_id).await
    }

    async fn rename_thread(&self, id: &str, title: &str) -> ocha_persist::Result<()> {
        self.inner.rename_thread(id, title).await
    }

    async fn add_message(
        &self,
        _id: &str,
        _thread_id: &str,
        _role: MessageRole,
        _parts: Vec<MessagePart>,
    ) -> ocha_persist::Result<Message> {
        Err(StoreError::Connection("injected failure".to_string()))
    }

    async fn list_messages(&self, thread_id: &str) -> ocha_persist::Result<Vec<Message>> {
        self.inner.list_messages(thread_id).await
    }

    async fn delete_thread(&self, id: &str) -> ocha_persist::Result<()> {
        self.inner.delete_thread(id).await
    }
}

async fn collect_events(
    mut stream: Pin<Box<dyn Stream<Item = anyhow::Result<StreamEvent>> + Send>>,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.unwrap());
    }
    events
}

/// The assistant save runs on a spawned task; poll until it lands.
async fn wait_for_message_count(store: &dyn ConversationStore, thread_id: &str, count: usize) {
    for _ in 0..100 {
        if store.list_messages(thread_id).await.unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {} messages", count);
}

#[tokio::test]
async fn test_turn_persists_user_then_assistant() {
    let store = Arc::new(MemoryConversationStore::new());
    let engine = Arc::new(StubEngine::replying("Hello there"));
    store.create_thread("t1", "u1", None).await.unwrap();

    let orchestrator = Orchestrator::new(store.clone(), engine, "gpt-4o-mini");
    let stream = orchestrator.run_turn("t1", "u1", "hello").await.unwrap();
    let events = collect_events(stream).await;
    assert_eq!(events.len(), 2);

    wait_for_message_count(store.as_ref(), "t1", 2).await;
    let messages = store.list_messages("t1").await.unwrap();

    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].text(), "hello");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].text(), "Hello there");
    assert!(messages[0].created_at <= messages[1].created_at);
}

#[tokio::test]
async fn test_history_bounded_to_most_recent_twenty() {
    let store = Arc::new(MemoryConversationStore::new());
    let engine = Arc::new(StubEngine::replying("ok"));
    store.create_thread("t1", "u1", None).await.unwrap();

    for i in 0..25 {
        store
            .add_message(
                &format!("m{}", i),
                "t1",
                MessageRole::User,
                vec![MessagePart::text(format!("msg {}", i))],
            )
            .await
            .unwrap();
    }

    let orchestrator = Orchestrator::new(store.clone(), engine.clone(), "gpt-4o-mini");
    let stream = orchestrator.run_turn("t1", "u1", "latest").await.unwrap();
    collect_events(stream).await;

    let request = engine.last_request();
    // 20 replayed history messages plus the new user turn
    assert_eq!(request.messages.len(), 21);

    let first_text = match &request.messages[0] {
        EngineMessage::Human { content } => content.as_text().unwrap().to_string(),
        other => panic!("unexpected message: {:?}", other),
    };
    assert_eq!(first_text, "msg 5");

    let last_text = match request.messages.last().unwrap() {
        EngineMessage::Human { content } => content.as_text().unwrap().to_string(),
        other => panic!("unexpected message: {:?}", other),
    };
    assert_eq!(last_text, "latest");
}

#[tokio::test]
async fn test_best_effort_save_failure_still_streams() {
    let inner = MemoryConversationStore::new();
    inner.create_thread("t1", "u1", None).await.unwrap();
    let store = Arc::new(FailingAppendStore { inner });
    let engine = Arc::new(StubEngine::replying("still works"));

    let orchestrator = Orchestrator::new(store.clone(), engine, "gpt-4o-mini");
    let stream = orchestrator.run_turn("t1", "u1", "hello").await.unwrap();
    let events = collect_events(stream).await;

    assert!(matches!(
        &events[0],
        StreamEvent::Message { content } if content == "still works"
    ));
    assert!(store.list_messages("t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_strict_mode_aborts_on_save_failure() {
    let inner = MemoryConversationStore::new();
    inner.create_thread("t1", "u1", None).await.unwrap();
    let store = Arc::new(FailingAppendStore { inner });
    let engine = Arc::new(StubEngine::replying("unreached"));

    let orchestrator =
        Orchestrator::new(store, engine, "gpt-4o-mini").with_options(TurnOptions {
            persistence: PersistenceMode::Strict,
            ..TurnOptions::default()
        });

    let err = orchestrator.run_turn("t1", "u1", "hello").await.err().unwrap();
    assert!(matches!(err, ChatError::Storage(_)));
}

#[tokio::test]
async fn test_non_owner_sees_not_found() {
    let store = Arc::new(MemoryConversationStore::new());
    let engine = Arc::new(StubEngine::replying("unreached"));
    store.create_thread("t1", "owner", None).await.unwrap();

    let orchestrator = Orchestrator::new(store, engine, "gpt-4o-mini");
    let err = orchestrator
        .run_turn("t1", "intruder", "hello")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatError::ThreadNotFound(_)));
}

#[tokio::test]
async fn test_missing_thread_not_found() {
    let store = Arc::new(MemoryConversationStore::new());
    let engine = Arc::new(StubEngine::replying("unreached"));

    let orchestrator = Orchestrator::new(store, engine, "gpt-4o-mini");
    let err = orchestrator
        .run_turn("missing", "u1", "hello")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ChatError::ThreadNotFound(_)));
}

#[tokio::test]
async fn test_engine_failure_keeps_user_message() {
    let store = Arc::new(MemoryConversationStore::new());
    store.create_thread("t1", "u1", None).await.unwrap();

    let orchestrator = Orchestrator::new(store.clone(), Arc::new(DownEngine), "gpt-4o-mini");
    let err = orchestrator.run_turn("t1", "u1", "hello").await.err().unwrap();
    assert!(matches!(err, ChatError::Generation(_)));

    // The user turn was made durable before the engine call
    let messages = store.list_messages("t1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_empty_completion_records_no_assistant_message() {
    let store = Arc::new(MemoryConversationStore::new());
    let engine = Arc::new(StubEngine::new(vec![StreamEvent::Done {
        finish_reason: Some("stop".to_string()),
    }]));
    store.create_thread("t1", "u1", None).await.unwrap();

    let orchestrator = Orchestrator::new(store.clone(), engine, "gpt-4o-mini");
    let stream = orchestrator.run_turn("t1", "u1", "hello").await.unwrap();
    collect_events(stream).await;

    wait_for_message_count(store.as_ref(), "t1", 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = store.list_messages("t1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn test_tool_call_recorded_as_tool_part() {
    let store = Arc::new(MemoryConversationStore::new());
    let engine = Arc::new(StubEngine::new(vec![
        StreamEvent::ToolCall {
            index: 0,
            id: Some("call_1".to_string()),
            name: Some("web_search".to_string()),
            arguments: Some(r#"{"query":"tea"}"#.to_string()),
        },
        StreamEvent::Message {
            content: "Found it".to_string(),
        },
        StreamEvent::Done {
            finish_reason: Some("stop".to_string()),
        },
    ]));
    store.create_thread("t1", "u1", None).await.unwrap();

    let orchestrator = Orchestrator::new(store.clone(), engine, "gpt-4o-mini");
    let stream = orchestrator.run_turn("t1", "u1", "search tea").await.unwrap();
    collect_events(stream).await;

    wait_for_message_count(store.as_ref(), "t1", 2).await;
    let messages = store.list_messages("t1").await.unwrap();
    let assistant = &messages[1];

    assert_eq!(assistant.parts.len(), 2);
    assert!(matches!(assistant.parts[0], MessagePart::Tool { .. }));
    assert_eq!(assistant.text(), "Found it");
}
