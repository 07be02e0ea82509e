use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoThread;
use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    /// Secondary indexes for owner-scoped listing
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.collection
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
            .await?;
        self.collection
            .create_index(IndexModel::builder().keys(doc! { "updated_at": -1 }).build())
            .await?;
        Ok(())
    }

    /// Insert a new thread
    pub async fn create_thread(
        &self,
        id: String,
        user_id: String,
        title: Option<String>,
    ) -> Result<MongoThread> {
        let now = bson::DateTime::now();
        let thread = MongoThread {
            id,
            user_id,
            title,
            created_at: now,
            updated_at: now,
        };

        self.collection.insert_one(&thread).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::DuplicateThread(thread.id.clone())
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(thread)
    }

    /// Get thread by ID
    pub async fn get_thread(&self, thread_id: &str) -> Result<Option<MongoThread>> {
        let filter = doc! { "_id": thread_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// List threads for a user, most recently updated first
    pub async fn list_threads(&self, user_id: &str) -> Result<Vec<MongoThread>> {
        let filter = doc! { "user_id": user_id };
        let threads = self
            .collection
            .find(filter)
            .sort(doc! { "updated_at": -1, "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    /// Update thread title, bumping updated_at
    pub async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()> {
        let filter = doc! { "_id": thread_id };
        let update = doc! {
            "$set": {
                "title": title,
                "updated_at": bson::DateTime::now(),
            }
        };

        let result = self.collection.update_one(filter, update).await?;
        if result.matched_count == 0 {
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }

    /// Bump updated_at; errs when the thread is absent, which doubles as the
    /// referential-integrity check for message appends
    pub async fn touch(&self, thread_id: &str, at: bson::DateTime) -> Result<()> {
        let filter = doc! { "_id": thread_id };
        let update = doc! { "$set": { "updated_at": at } };

        let result = self.collection.update_one(filter, update).await?;
        if result.matched_count == 0 {
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }

    /// Delete thread
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let filter = doc! { "_id": thread_id };
        self.collection.delete_one(filter).await?;
        Ok(())
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*error.kind,
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}
