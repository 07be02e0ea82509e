use serde::{Deserialize, Serialize};

use crate::models::{Message, MessagePart, MessageRole, Thread};

/// MongoDB-specific thread document (native BSON datetimes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

/// MongoDB-specific message document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    pub created_at: bson::DateTime,
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id,
            user_id: thread.user_id,
            title: thread.title,
            created_at: thread.created_at.to_chrono(),
            updated_at: thread.updated_at.to_chrono(),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(message: MongoMessage) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            role: message.role,
            parts: message.parts,
            created_at: message.created_at.to_chrono(),
        }
    }
}
