pub mod models;
pub mod store;
pub mod dbs;
pub mod error;

pub use models::{Message, MessagePart, MessageRole, PartState, Thread};
pub use store::ConversationStore;
pub use dbs::memory::MemoryConversationStore;
pub use dbs::mongo::MongoConversationStore;
pub use error::{Result, StoreError};
