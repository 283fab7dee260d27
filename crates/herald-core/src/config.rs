use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POOL_SIZE: usize = 5;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_BACKOFF_MS: u64 = 1_000; // used when the transport gives no retry hint
pub const DEFAULT_BACKOFF_CEILING_MS: u64 = 60_000;
pub const DEFAULT_HEALTH_BIND: &str = "0.0.0.0";
pub const DEFAULT_HEALTH_PORT: u16 = 10_000;

/// Top-level config (herald.toml + HERALD_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Telegram user id of the single operator allowed to issue commands.
    /// `0` means unset; every sender is then refused.
    #[serde(default)]
    pub owner_id: u64,
    /// Look a channel up and require the bot to be an administrator there
    /// before registering it.
    #[serde(default = "bool_true")]
    pub verify_channels: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            owner_id: 0,
            verify_channels: true,
        }
    }
}

/// Tuning for the broadcast dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of sends in flight at once.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Upper bound on a single send; a send that exceeds it counts as failed.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Pause applied after a rate-limit signal that carries no wait hint.
    #[serde(default = "default_backoff_ms")]
    pub default_backoff_ms: u64,
    /// Cumulative pause allowed per run before the remainder is given up.
    #[serde(default = "default_backoff_ceiling_ms")]
    pub backoff_ceiling_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            default_backoff_ms: DEFAULT_BACKOFF_MS,
            backoff_ceiling_ms: DEFAULT_BACKOFF_CEILING_MS,
        }
    }
}

impl DispatchConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn default_backoff(&self) -> Duration {
        Duration::from_millis(self.default_backoff_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }
}

/// Liveness endpoint for the hosting platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_health_bind")]
    pub bind: String,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_health_bind(),
            port: DEFAULT_HEALTH_PORT,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}
fn default_send_timeout_ms() -> u64 {
    DEFAULT_SEND_TIMEOUT_MS
}
fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}
fn default_backoff_ceiling_ms() -> u64 {
    DEFAULT_BACKOFF_CEILING_MS
}
fn default_health_bind() -> String {
    DEFAULT_HEALTH_BIND.to_string()
}
fn default_health_port() -> u16 {
    DEFAULT_HEALTH_PORT
}

impl HeraldConfig {
    /// Load config from a TOML file with HERALD_* env var overrides.
    ///
    /// Path resolution: explicit argument, then `~/.herald/herald.toml`.
    /// A missing file is fine; defaults and env vars still apply.
    /// Nested keys use a double underscore: `HERALD_TELEGRAM__BOT_TOKEN`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: HeraldConfig = Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::HeraldError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(HeraldConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("HERALD_").split("__"))
    }

    /// Reject values the dispatcher cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let bad = |msg: &str| Err(crate::error::HeraldError::Config(msg.to_string()));
        if self.dispatch.pool_size == 0 {
            return bad("dispatch.pool_size must be at least 1");
        }
        if self.dispatch.send_timeout_ms == 0 {
            return bad("dispatch.send_timeout_ms must be greater than 0");
        }
        if self.health.enabled && self.health.port == 0 {
            return bad("health.port must be set when health is enabled");
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.toml", home)
}
