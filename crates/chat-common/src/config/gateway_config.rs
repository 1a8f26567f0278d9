//! Gateway client configuration
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). The library takes a constructed [`GatewayConfig`]; only the
//! binary reads the environment.

use chat_model::{Intents, ShardId};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main gateway client configuration
#[derive(Clone)]
pub struct GatewayConfig {
    pub app: AppSettings,
    /// Bot token sent in Identify and Resume
    pub token: String,
    /// Initial discovery URL (used for every fresh session)
    pub gateway_url: String,
    /// Gateway protocol version appended as `?v=`
    pub api_version: u8,
    pub shard: ShardId,
    pub intents: Intents,
    /// Member count above which offline members are omitted from guild payloads
    pub large_threshold: u16,
    pub properties: ClientProperties,
    pub queues: QueueConfig,
    pub timeouts: TimeoutConfig,
    pub backoff: BackoffConfig,
    /// Give up after this many consecutive failed attempts (`None` retries forever)
    pub max_attempts: Option<u32>,
    /// Consecutive undecodable messages tolerated before reconnecting (`None` never reconnects)
    pub max_consecutive_decode_failures: Option<u32>,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: Environment::default(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Connection properties reported in Identify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for ClientProperties {
    fn default() -> Self {
        Self {
            os: env::consts::OS.to_string(),
            browser: default_app_name(),
            device: default_app_name(),
        }
    }
}

/// Handoff queue sizing and outbound pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Inbound event queue capacity; the receive loop blocks when full
    pub event_capacity: usize,
    /// Outbound command queue capacity; submission fails when full
    pub command_capacity: usize,
    /// Application commands allowed per minute (heartbeats are exempt)
    pub commands_per_minute: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            command_capacity: default_command_capacity(),
            commands_per_minute: default_commands_per_minute(),
        }
    }
}

/// Handshake timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Transport open
    pub connect: Duration,
    /// First envelope (Hello) after the transport opens
    pub hello: Duration,
    /// Ready / Resumed after Identify / Resume
    pub ready: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(default_connect_timeout_ms()),
            hello: Duration::from_millis(default_hello_timeout_ms()),
            ready: Duration::from_millis(default_ready_timeout_ms()),
        }
    }
}

/// Reconnect backoff policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
    /// Symmetric jitter as a fraction of the delay (0.2 = ±20%)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(default_backoff_initial_ms()),
            max: Duration::from_millis(default_backoff_max_ms()),
            multiplier: default_backoff_multiplier(),
            jitter: default_backoff_jitter(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "chat-gateway-client".to_string()
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg".to_string()
}

fn default_api_version() -> u8 {
    10
}

fn default_large_threshold() -> u16 {
    50
}

fn default_event_capacity() -> usize {
    256
}

fn default_command_capacity() -> usize {
    64
}

fn default_commands_per_minute() -> u32 {
    120
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_hello_timeout_ms() -> u64 {
    10_000
}

fn default_ready_timeout_ms() -> u64 {
    30_000
}

fn default_backoff_initial_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_jitter() -> f64 {
    0.2
}

impl GatewayConfig {
    /// Create a configuration with defaults for everything but the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            app: AppSettings::default(),
            token: token.into(),
            gateway_url: default_gateway_url(),
            api_version: default_api_version(),
            shard: ShardId::ONE,
            intents: Intents::DEFAULT,
            large_threshold: default_large_threshold(),
            properties: ClientProperties::default(),
            queues: QueueConfig::default(),
            timeouts: TimeoutConfig::default(),
            backoff: BackoffConfig::default(),
            max_attempts: None,
            max_consecutive_decode_failures: None,
        }
    }

    /// Set the discovery URL
    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Set the shard identity
    #[must_use]
    pub fn with_shard(mut self, shard: ShardId) -> Self {
        self.shard = shard;
        self
    }

    /// Set the intents
    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CHAT_TOKEN` is missing or a variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("CHAT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("CHAT_TOKEN"))?;

        let mut config = Self::new(token);

        config.app = AppSettings {
            name: lookup("APP_NAME").unwrap_or_else(default_app_name),
            env: lookup("APP_ENV")
                .as_deref()
                .and_then(Environment::parse)
                .unwrap_or_default(),
        };

        if let Some(url) = lookup("GATEWAY_URL") {
            config.gateway_url = url;
        }
        if let Some(version) = parse_var(&lookup, "GATEWAY_API_VERSION")? {
            config.api_version = version;
        }

        let index = parse_var(&lookup, "SHARD_INDEX")?.unwrap_or(0);
        let count = parse_var(&lookup, "SHARD_COUNT")?.unwrap_or(1);
        config.shard = ShardId::new(index, count)
            .map_err(|e| ConfigError::InvalidValue("SHARD_INDEX", e.to_string()))?;

        if let Some(raw) = lookup("GATEWAY_INTENTS") {
            config.intents = Intents::parse(&raw)
                .map_err(|e| ConfigError::InvalidValue("GATEWAY_INTENTS", e.to_string()))?;
        }
        if let Some(threshold) = parse_var(&lookup, "GATEWAY_LARGE_THRESHOLD")? {
            config.large_threshold = threshold;
        }

        if let Some(capacity) = parse_var(&lookup, "GATEWAY_EVENT_QUEUE")? {
            config.queues.event_capacity = capacity;
        }
        if let Some(capacity) = parse_var(&lookup, "GATEWAY_COMMAND_QUEUE")? {
            config.queues.command_capacity = capacity;
        }
        if let Some(rate) = parse_var(&lookup, "GATEWAY_COMMANDS_PER_MINUTE")? {
            config.queues.commands_per_minute = rate;
        }

        if let Some(ms) = parse_var(&lookup, "GATEWAY_CONNECT_TIMEOUT_MS")? {
            config.timeouts.connect = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "GATEWAY_HELLO_TIMEOUT_MS")? {
            config.timeouts.hello = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "GATEWAY_READY_TIMEOUT_MS")? {
            config.timeouts.ready = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var(&lookup, "GATEWAY_BACKOFF_INITIAL_MS")? {
            config.backoff.initial = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "GATEWAY_BACKOFF_MAX_MS")? {
            config.backoff.max = Duration::from_millis(ms);
        }
        if let Some(multiplier) = parse_var(&lookup, "GATEWAY_BACKOFF_MULTIPLIER")? {
            config.backoff.multiplier = multiplier;
        }
        if let Some(jitter) = parse_var(&lookup, "GATEWAY_BACKOFF_JITTER")? {
            config.backoff.jitter = jitter;
        }

        config.max_attempts = parse_var(&lookup, "GATEWAY_MAX_ATTEMPTS")?;
        config.max_consecutive_decode_failures =
            parse_var(&lookup, "GATEWAY_STRICT_DECODE_FAILURES")?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the engine misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queues.event_capacity == 0 {
            return Err(ConfigError::InvalidValue("GATEWAY_EVENT_QUEUE", "must be at least 1".into()));
        }
        if self.queues.command_capacity == 0 {
            return Err(ConfigError::InvalidValue("GATEWAY_COMMAND_QUEUE", "must be at least 1".into()));
        }
        if self.queues.commands_per_minute == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_COMMANDS_PER_MINUTE",
                "must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.backoff.jitter) {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BACKOFF_JITTER",
                format!("{} is outside [0, 1)", self.backoff.jitter),
            ));
        }
        Ok(())
    }
}

// The token never reaches logs.
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("app", &self.app)
            .field("token", &"<redacted>")
            .field("gateway_url", &self.gateway_url)
            .field("api_version", &self.api_version)
            .field("shard", &self.shard)
            .field("intents", &self.intents)
            .field("queues", &self.queues)
            .field("timeouts", &self.timeouts)
            .field("backoff", &self.backoff)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue(key, e.to_string())),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
