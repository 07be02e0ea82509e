use async_trait::async_trait;

use crate::error::Result;
use crate::user::AuthUser;

/// Opaque credential verifier.
///
/// The HTTP surface only depends on this trait; the production
/// implementation is [`crate::GoogleVerifier`], tests substitute a stub.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Validate a bearer credential and yield the verified identity.
    async fn verify(&self, credential: &str) -> Result<AuthUser>;
}
