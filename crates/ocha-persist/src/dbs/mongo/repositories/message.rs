use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    /// Compound index for ordered per-thread retrieval
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "thread_id": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    /// Insert a single message
    pub async fn save_message(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    /// All messages for a thread, oldest first
    pub async fn get_messages(&self, thread_id: &str) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "thread_id": thread_id };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    /// Remove every message belonging to a thread (cascade path)
    pub async fn delete_messages(&self, thread_id: &str) -> Result<()> {
        let filter = doc! { "thread_id": thread_id };
        self.collection.delete_many(filter).await?;
        Ok(())
    }
}
