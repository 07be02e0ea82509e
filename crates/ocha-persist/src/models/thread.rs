use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database-agnostic thread model
///
/// A thread is a persisted conversation owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
