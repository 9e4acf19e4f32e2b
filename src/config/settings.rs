//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// JWT session validation settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// WebSocket transport configuration
    pub websocket: WebSocketSettings,

    /// Gateway behaviour (history, timeouts, typing, reactions)
    pub gateway: GatewaySettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply bundled migrations on startup
    pub run_migrations: bool,
}

/// JWT configuration for validating gateway credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key the session-issuing service signs access tokens with
    pub secret: String,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum frame size in bytes (default: 16KB)
    pub max_frame_size: usize,

    /// Interval between server pings in milliseconds
    pub heartbeat_interval_ms: u64,

    /// A connection silent for this long is dropped
    pub idle_timeout_ms: u64,

    /// Inbound events buffered per connection before the reader waits
    pub inbound_queue_size: usize,
}

/// Who receives `message-reactions-updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReactionBroadcast {
    /// Subscribers of the message's channel, plus the requester
    #[default]
    Room,
    /// Every connected identity
    Platform,
}

/// Gateway behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Messages delivered on channel join
    pub history_limit: i64,

    /// Upper bound on any persistence call, in milliseconds
    pub persistence_timeout_ms: u64,

    /// Typing indicators expire after this many seconds without a refresh
    pub typing_ttl_secs: u64,

    /// Fan-out breadth for reaction updates
    #[serde(default)]
    pub reaction_broadcast: ReactionBroadcast,
}

impl GatewaySettings {
    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }

    pub fn typing_ttl(&self) -> Duration {
        Duration::from_secs(self.typing_ttl_secs)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            persistence_timeout_ms: 5_000,
            typing_ttl_secs: 10,
            reaction_broadcast: ReactionBroadcast::Room,
        }
    }
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", false)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.epoch", 1420070400000_u64)?
            .set_default("websocket.max_message_size", 65536_i64)? // 64KB
            .set_default("websocket.max_frame_size", 16384_i64)? // 16KB
            .set_default("websocket.heartbeat_interval_ms", 30000_i64)?
            .set_default("websocket.idle_timeout_ms", 90000_i64)?
            .set_default("websocket.inbound_queue_size", 32_i64)?
            .set_default("gateway.history_limit", 50)?
            .set_default("gateway.persistence_timeout_ms", 5000_i64)?
            .set_default("gateway.typing_ttl_secs", 10)?
            .set_default("gateway.reaction_broadcast", "room")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__GATEWAY__HISTORY_LIMIT=50 -> gateway.history_limit = 50
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| settings.validate())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.gateway.history_limit <= 0 {
            return Err(ConfigError::Message(
                "gateway.history_limit must be positive".into(),
            ));
        }
        if self.websocket.inbound_queue_size == 0 {
            return Err(ConfigError::Message(
                "websocket.inbound_queue_size must be positive".into(),
            ));
        }
        Ok(self)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
