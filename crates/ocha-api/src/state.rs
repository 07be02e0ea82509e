use std::sync::Arc;

use ocha_auth::IdentityVerifier;
use ocha_chat::Orchestrator;
use ocha_persist::ConversationStore;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Every resource is constructed once at startup and dependency-injected;
/// nothing is lazily initialized on first use.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ConversationStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ConversationStore>,
        verifier: Arc<dyn IdentityVerifier>,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            verifier,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
