use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ocha_api::{config::Config, router::build_router, state::AppState};
use ocha_auth::GoogleVerifier;
use ocha_chat::{Orchestrator, TurnOptions};
use ocha_llm::OpenAIClient;
use ocha_persist::MongoConversationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Ocha API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Initialize completion-engine client
    tracing::info!("Initializing completion-engine client");
    let engine: Arc<dyn ocha_llm::ChatClient> =
        Arc::new(OpenAIClient::new(config.openai_api_key.clone())?);

    // Initialize persistence store (MongoDB)
    tracing::info!("Connecting to MongoDB");
    let mongo_store =
        MongoConversationStore::connect(&config.mongodb_uri, &config.mongodb.database).await?;
    let store: Arc<dyn ocha_persist::ConversationStore> = Arc::new(mongo_store);

    tracing::info!("MongoDB connected");

    // Initialize identity verifier
    let verifier: Arc<dyn ocha_auth::IdentityVerifier> = Arc::new(
        GoogleVerifier::new(config.google_client_id.clone())
            .with_allowed_emails(config.auth.allowed_emails()),
    );

    // Build orchestrator
    let persistence = config
        .chat
        .persistence_mode()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        Arc::clone(&engine),
        config.llm.model.clone(),
    )
    .with_options(TurnOptions {
        history_limit: config.chat.history_limit,
        persistence,
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
    });

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), store, verifier, orchestrator));

    // Build router
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Process terminated");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install SIGINT handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, shutting down gracefully");
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
