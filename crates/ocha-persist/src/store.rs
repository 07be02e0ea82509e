use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Message, MessagePart, MessageRole, Thread};

/// Trait for conversation persistence operations
///
/// Implementations provide database-specific CRUD; the orchestrator and the
/// HTTP surface only depend on this trait. The store is constructed once at
/// startup and dependency-injected, never lazily initialized.
///
/// All operations are safe to call concurrently for different thread ids.
/// Concurrent appends to the same thread are not serialized here; the
/// `created_at` ordering of `list_messages` is the only guarantee.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a new thread. Fails with `StoreError::DuplicateThread` when the
    /// id is already taken.
    async fn create_thread(&self, id: &str, owner_id: &str, title: Option<String>)
        -> Result<Thread>;

    /// Fetch a thread by id.
    async fn get_thread(&self, id: &str) -> Result<Option<Thread>>;

    /// List a user's threads, most recently updated first
    /// (`created_at` descending breaks ties).
    async fn list_threads(&self, owner_id: &str) -> Result<Vec<Thread>>;

    /// Update a thread's title, bumping `updated_at`.
    async fn rename_thread(&self, id: &str, title: &str) -> Result<()>;

    /// Append a message, bumping the parent thread's `updated_at` as part of
    /// the same logical operation. Fails with `StoreError::ThreadNotFound`
    /// when the thread does not exist, and rejects invalid parts.
    async fn add_message(
        &self,
        id: &str,
        thread_id: &str,
        role: MessageRole,
        parts: Vec<MessagePart>,
    ) -> Result<Message>;

    /// All messages of a thread, `created_at` ascending.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Delete a thread and, transitively, all of its messages.
    async fn delete_thread(&self, id: &str) -> Result<()>;
}
