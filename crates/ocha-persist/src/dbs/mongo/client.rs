use async_trait::async_trait;
use mongodb::Client;

use crate::dbs::mongo::models::MongoMessage;
use crate::dbs::mongo::repositories::{MongoMessageRepository, MongoThreadRepository};
use crate::error::{Result, StoreError};
use crate::models::{validate_parts, Message, MessagePart, MessageRole, Thread};
use crate::store::ConversationStore;

pub struct MongoConversationStore {
    thread_repo: MongoThreadRepository,
    message_repo: MongoMessageRepository,
}

impl MongoConversationStore {
    /// Connect to MongoDB and prepare the collections.
    ///
    /// Index creation is idempotent, so repeated startups are harmless.
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let thread_repo = MongoThreadRepository::new(&client, database);
        let message_repo = MongoMessageRepository::new(&client, database);

        thread_repo.ensure_indexes().await?;
        message_repo.ensure_indexes().await?;

        Ok(Self {
            thread_repo,
            message_repo,
        })
    }
}

#[async_trait]
impl ConversationStore for MongoConversationStore {
    async fn create_thread(
        &self,
        id: &str,
        owner_id: &str,
        title: Option<String>,
    ) -> Result<Thread> {
        let thread = self
            .thread_repo
            .create_thread(id.to_string(), owner_id.to_string(), title)
            .await?;
        Ok(thread.into())
    }

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        let thread = self.thread_repo.get_thread(id).await?;
        Ok(thread.map(Into::into))
    }

    async fn list_threads(&self, owner_id: &str) -> Result<Vec<Thread>> {
        let threads = self.thread_repo.list_threads(owner_id).await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn rename_thread(&self, id: &str, title: &str) -> Result<()> {
        self.thread_repo.rename_thread(id, title).await
    }

    async fn add_message(
        &self,
        id: &str,
        thread_id: &str,
        role: MessageRole,
        parts: Vec<MessagePart>,
    ) -> Result<Message> {
        validate_parts(&parts)?;

        // Touching the parent first doubles as the referential-integrity
        // check: a missing thread surfaces as ThreadNotFound before insert.
        let now = bson::DateTime::now();
        self.thread_repo.touch(thread_id, now).await?;

        let message = MongoMessage {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            role,
            parts,
            created_at: now,
        };
        self.message_repo.save_message(&message).await?;
        Ok(message.into())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.get_messages(thread_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        // Cascade: messages first, then the thread itself.
        self.message_repo.delete_messages(id).await?;
        self.thread_repo.delete_thread(id).await?;
        Ok(())
    }
}
