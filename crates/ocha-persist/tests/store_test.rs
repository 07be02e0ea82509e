use ocha_persist::{
    ConversationStore, MemoryConversationStore, MessagePart, MessageRole, PartState, StoreError,
};
use serde_json::json;

#[tokio::test]
async fn test_create_and_get_thread() {
    let store = MemoryConversationStore::new();

    let thread = store
        .create_thread("t1", "user-1", Some("Tea talk".to_string()))
        .await
        .unwrap();
    assert_eq!(thread.user_id, "user-1");
    assert!(thread.updated_at >= thread.created_at);

    let fetched = store.get_thread("t1").await.unwrap().unwrap();
    assert_eq!(fetched.id, "t1");
    assert_eq!(fetched.title.as_deref(), Some("Tea talk"));
}

#[tokio::test]
async fn test_duplicate_thread_id_rejected() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();

    let err = store.create_thread("t1", "user-2", None).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateThread(_)));
}

#[tokio::test]
async fn test_add_message_requires_thread() {
    let store = MemoryConversationStore::new();

    let err = store
        .add_message("m1", "missing", MessageRole::User, vec![MessagePart::text("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ThreadNotFound(_)));
}

#[tokio::test]
async fn test_add_message_bumps_thread_updated_at() {
    let store = MemoryConversationStore::new();
    let thread = store.create_thread("t1", "user-1", None).await.unwrap();

    store
        .add_message("m1", "t1", MessageRole::User, vec![MessagePart::text("hi")])
        .await
        .unwrap();

    let after = store.get_thread("t1").await.unwrap().unwrap();
    assert!(after.updated_at >= thread.updated_at);
    assert_eq!(after.created_at, thread.created_at);
}

#[tokio::test]
async fn test_message_ordering_is_chronological() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();

    for i in 0..5 {
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

    let messages = store.list_messages("t1").await.unwrap();
    assert_eq!(messages.len(), 5);
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
    assert_eq!(messages[0].text(), "msg 0");
    assert_eq!(messages[4].text(), "msg 4");
}

#[tokio::test]
async fn test_list_is_idempotent_without_writes() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();
    store
        .add_message("m1", "t1", MessageRole::User, vec![MessagePart::text("hi")])
        .await
        .unwrap();

    let first = store.list_messages("t1").await.unwrap();
    let second = store.list_messages("t1").await.unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].id, second[0].id);

    let t_first = store.get_thread("t1").await.unwrap().unwrap();
    let t_second = store.get_thread("t1").await.unwrap().unwrap();
    assert_eq!(t_first.updated_at, t_second.updated_at);
}

#[tokio::test]
async fn test_delete_thread_cascades_to_messages() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();
    store
        .add_message("m1", "t1", MessageRole::User, vec![MessagePart::text("hi")])
        .await
        .unwrap();
    store
        .add_message("m2", "t1", MessageRole::Assistant, vec![MessagePart::text("hello")])
        .await
        .unwrap();

    store.delete_thread("t1").await.unwrap();

    assert!(store.get_thread("t1").await.unwrap().is_none());
    assert!(store.list_messages("t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_threads_most_recent_first() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();
    store.create_thread("t2", "user-1", None).await.unwrap();
    store.create_thread("other", "user-2", None).await.unwrap();

    // Appending to t1 makes it the most recently updated
    store
        .add_message("m1", "t1", MessageRole::User, vec![MessagePart::text("hi")])
        .await
        .unwrap();

    let threads = store.list_threads("user-1").await.unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].id, "t1");
    assert_eq!(threads[1].id, "t2");
}

#[tokio::test]
async fn test_rename_thread() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();

    store.rename_thread("t1", "Renamed").await.unwrap();
    let thread = store.get_thread("t1").await.unwrap().unwrap();
    assert_eq!(thread.title.as_deref(), Some("Renamed"));

    let err = store.rename_thread("missing", "x").await.unwrap_err();
    assert!(matches!(err, StoreError::ThreadNotFound(_)));
}

#[tokio::test]
async fn test_invalid_part_rejected_at_boundary() {
    let store = MemoryConversationStore::new();
    store.create_thread("t1", "user-1", None).await.unwrap();

    let bad_part = MessagePart::Tool {
        tool: "web_search".to_string(),
        tool_call_id: "call_1".to_string(),
        state: PartState::Partial,
        input: Some(json!({"query": "tea"})),
        output: Some(json!({"results": []})),
    };

    let err = store
        .add_message("m1", "t1", MessageRole::Assistant, vec![bad_part])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidPart(_)));
    assert!(store.list_messages("t1").await.unwrap().is_empty());
}
