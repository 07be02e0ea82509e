use serde::{Deserialize, Serialize};

/// Verified identity, reconstructed per-request from the bearer credential.
/// Never persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider-issued identifier (`sub` claim)
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub verified_email: bool,
}
