use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use ocha_chat::PersistenceMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub mongodb: MongoDbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub google_client_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            mongodb: MongoDbConfig::default(),
            llm: LlmConfig::default(),
            auth: AuthConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
            mongodb_uri: String::new(),
            openai_api_key: String::new(),
            google_client_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "ocha".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Comma-separated allow-list of emails; empty means unrestricted
    #[serde(default)]
    pub allowed_users: String,
}

impl AuthConfig {
    /// Parse the allow-list. `None` means no restriction.
    pub fn allowed_emails(&self) -> Option<Vec<String>> {
        if self.allowed_users.trim().is_empty() {
            return None;
        }
        Some(
            self.allowed_users
                .split(',')
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// "best-effort" (the default) or "strict"
    #[serde(default = "default_persistence")]
    pub persistence: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            persistence: default_persistence(),
        }
    }
}

impl ChatConfig {
    pub fn persistence_mode(&self) -> Result<PersistenceMode, ConfigError> {
        match self.persistence.as_str() {
            "best-effort" => Ok(PersistenceMode::BestEffort),
            "strict" => Ok(PersistenceMode::Strict),
            other => Err(ConfigError::Message(format!(
                "chat.persistence must be \"best-effort\" or \"strict\", got \"{}\"",
                other
            ))),
        }
    }
}

fn default_history_limit() -> usize {
    20
}

fn default_persistence() -> String {
    "best-effort".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, MONGODB_, LLM_, AUTH_, CHAT_, LOG_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .prefix("SERVER")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("MONGODB")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("LLM")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("AUTH")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("CHAT")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("LOG")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Secrets only come from ENV, never from TOML.
        cfg.mongodb_uri = std::env::var("MONGODB_URI").map_err(|_| {
            ConfigError::Message("MONGODB_URI environment variable is required".to_string())
        })?;
        cfg.google_client_id = std::env::var("GOOGLE_CLIENT_ID").map_err(|_| {
            ConfigError::Message("GOOGLE_CLIENT_ID environment variable is required".to_string())
        })?;
        // Absence is tolerated at startup; the chat route reports it per
        // request, the way the source did.
        cfg.openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

        // Fail fast on a bad persistence knob.
        cfg.chat.persistence_mode()?;

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 3000

            [cors]
            enabled = true
            origins = ["http://localhost:5173"]

            [mongodb]
            database = "ocha_test"

            [llm]
            model = "gpt-4o-mini"

            [auth]
            allowed_users = "a@example.com, b@example.com"

            [chat]
            history_limit = 20
            persistence = "strict"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.mongodb.database, "ocha_test");
        assert_eq!(
            config.chat.persistence_mode().unwrap(),
            ocha_chat::PersistenceMode::Strict
        );
        assert_eq!(
            config.auth.allowed_emails().unwrap(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[test]
    fn test_empty_allow_list_means_unrestricted() {
        let auth = AuthConfig {
            allowed_users: "  ".to_string(),
        };
        assert!(auth.allowed_emails().is_none());
    }

    #[test]
    fn test_unknown_persistence_mode_rejected() {
        let chat = ChatConfig {
            history_limit: 20,
            persistence: "maybe".to_string(),
        };
        assert!(chat.persistence_mode().is_err());
    }
}
