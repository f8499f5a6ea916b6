use anyhow::Result;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WS_PORT: u16 = 8081;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

const DEFAULT_RUST_LOG: &str = "info,campus_chat_server=debug";

/// Maximum message body length in characters (after trimming)
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Length of the denormalized inbox preview stored on a conversation
pub const LAST_MESSAGE_PREVIEW_CHARS: usize = 100;

// ============================================================================
// Configuration Structures
// ============================================================================

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// When false, user identifiers in logs are replaced with salted hashes
    pub enable_user_identifiers: bool,
    pub hash_salt: String,
}

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Base URL of the auth service that resolves bearer credentials
    pub auth_service_url: String,
    /// Base URL of the notification service; None disables notifications
    pub notify_service_url: Option<String>,
    /// REST API port
    pub port: u16,
    /// Real-time (WebSocket) port
    pub ws_port: u16,
    pub rust_log: String,
    pub logging: LoggingConfig,
    pub db: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            auth_service_url: std::env::var("AUTH_SERVICE_URL")?,
            notify_service_url: std::env::var("NOTIFY_SERVICE_URL").ok(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            ws_port: std::env::var("WS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_WS_PORT),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.to_string()),
            logging: LoggingConfig {
                enable_user_identifiers: std::env::var("LOG_ENABLE_USER_IDENTIFIERS")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
                hash_salt: std::env::var("LOG_HASH_SALT").unwrap_or_else(|_| {
                    tracing::warn!(
                        "LOG_HASH_SALT not set, using default salt (identifier hashes are guessable)"
                    );
                    "campus-chat-log-salt".to_string()
                }),
            },
            db: DbConfig {
                max_connections: std::env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
                acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
            },
        })
    }
}
