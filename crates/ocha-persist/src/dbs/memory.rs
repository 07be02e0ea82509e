use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Result, StoreError};
use crate::models::{validate_parts, Message, MessagePart, MessageRole, Thread};
use crate::store::ConversationStore;

/// In-memory store backend.
///
/// Keeps the same contract as the MongoDB backend without any I/O; used by
/// tests and as a zero-dependency development backend. Messages are kept in
/// insertion order, so the stable sort on `created_at` preserves the
/// insertion-order tie-break.
#[derive(Default)]
pub struct MemoryConversationStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    threads: HashMap<String, Thread>,
    messages: Vec<Message>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn create_thread(
        &self,
        id: &str,
        owner_id: &str,
        title: Option<String>,
    ) -> Result<Thread> {
        let mut inner = self.inner.lock().unwrap();
        if inner.threads.contains_key(id) {
            return Err(StoreError::DuplicateThread(id.to_string()));
        }

        let now = Utc::now();
        let thread = Thread {
            id: id.to_string(),
            user_id: owner_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
        };
        inner.threads.insert(id.to_string(), thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.threads.get(id).cloned())
    }

    async fn list_threads(&self, owner_id: &str) -> Result<Vec<Thread>> {
        let inner = self.inner.lock().unwrap();
        let mut threads: Vec<Thread> = inner
            .threads
            .values()
            .filter(|t| t.user_id == owner_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(threads)
    }

    async fn rename_thread(&self, id: &str, title: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let thread = inner
            .threads
            .get_mut(id)
            .ok_or_else(|| StoreError::ThreadNotFound(id.to_string()))?;
        thread.title = Some(title.to_string());
        thread.updated_at = Utc::now();
        Ok(())
    }

    async fn add_message(
        &self,
        id: &str,
        thread_id: &str,
        role: MessageRole,
        parts: Vec<MessagePart>,
    ) -> Result<Message> {
        validate_parts(&parts)?;

        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        let thread = inner
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;
        thread.updated_at = now;

        let message = Message {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            role,
            parts,
            created_at: now,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.threads.remove(id);
        inner.messages.retain(|m| m.thread_id != id);
        Ok(())
    }
}
