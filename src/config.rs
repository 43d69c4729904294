use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "trustcard.toml";
const DEFAULT_LOG_LEVEL: &str = "trustcard=info,tower_http=info";

/// Main configuration structure loaded from trustcard.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sessions: SessionConfig,
    pub variants: VariantConfig,
    pub model: ModelConfig,
    /// Secrets and process-level settings, env only
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub body_limit_bytes: usize,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            body_limit_bytes: 12 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub capacity: usize,
    /// Treat every new session as subscribed (unlocks insights)
    pub default_subscribed: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            default_subscribed: false,
        }
    }
}

/// Offline generator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VariantConfig {
    pub seed_pool: u32,
    /// External template library; the built-in one is used when unset
    pub templates_path: Option<PathBuf>,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            seed_pool: crate::rng::DEFAULT_SEED_POOL,
            templates_path: None,
        }
    }
}

/// Live model settings. The API key lives in [`RuntimeConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `anthropic` or `none`
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout_ms: 30_000,
            max_tokens: 2048,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: ["TRUSTCARD_API_KEY", "ANTHROPIC_API_KEY"]
                .into_iter()
                .filter_map(&lookup)
                .find(|k| !k.trim().is_empty()),
            log_level: lookup("RUST_LOG")
                .or_else(|| lookup("TRUSTCARD_LOG_LEVEL"))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

/// Load `.env` files:
/// 1) TRUSTCARD_ENV_FILE if set
/// 2) ./.env
/// 3) ../.env when no key was found yet
pub fn load_env() {
    if let Ok(env_path) = std::env::var("TRUSTCARD_ENV_FILE") {
        let _ = dotenvy::from_path(env_path);
        return;
    }
    let _ = dotenvy::from_path(".env");
    let core_present =
        std::env::var("TRUSTCARD_API_KEY").is_ok() || std::env::var("ANTHROPIC_API_KEY").is_ok();
    if !core_present {
        let _ = dotenvy::from_path("../.env");
    }
}

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses TRUSTCARD_CONFIG or defaults to "trustcard.toml".
    pub fn load() -> anyhow::Result<Self> {
        load_env();

        let config_path =
            std::env::var("TRUSTCARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.runtime = RuntimeConfig::load_from_env();
        config.validate();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply TRUSTCARD_* overrides (env-first)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("TRUSTCARD_BIND") {
            self.server.bind = bind;
        }
        if let Some(limit) = lookup("TRUSTCARD_BODY_LIMIT_BYTES").and_then(|v| v.parse().ok()) {
            self.server.body_limit_bytes = limit;
        }
        if let Some(origins) = lookup("TRUSTCARD_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(capacity) = lookup("TRUSTCARD_SESSION_CAPACITY").and_then(|v| v.parse().ok()) {
            self.sessions.capacity = capacity;
        }
        if let Some(subscribed) = lookup("TRUSTCARD_DEFAULT_SUBSCRIBED") {
            self.sessions.default_subscribed = parse_flag(&subscribed);
        }
        if let Some(pool) = lookup("TRUSTCARD_SEED_POOL").and_then(|v| v.parse().ok()) {
            self.variants.seed_pool = pool;
        }
        if let Some(path) = lookup("TRUSTCARD_TEMPLATES_PATH").filter(|p| !p.is_empty()) {
            self.variants.templates_path = Some(PathBuf::from(path));
        }
        if let Some(provider) = lookup("TRUSTCARD_MODEL_PROVIDER") {
            self.model.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("TRUSTCARD_MODEL") {
            self.model.model = model;
        }
        if let Some(base_url) = lookup("TRUSTCARD_MODEL_BASE_URL") {
            self.model.base_url = base_url;
        }
        if let Some(timeout) = lookup("TRUSTCARD_MODEL_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.model.timeout_ms = timeout;
        }
        if let Some(max_tokens) = lookup("TRUSTCARD_MODEL_MAX_TOKENS").and_then(|v| v.parse().ok())
        {
            self.model.max_tokens = max_tokens;
        }
    }

    /// Clamp out-of-range values, warning on each adjustment
    pub fn validate(&mut self) {
        if self.variants.seed_pool == 0 {
            tracing::warn!("seed_pool 0 is invalid, using 1");
            self.variants.seed_pool = 1;
        }
        if self.sessions.capacity == 0 {
            tracing::warn!("session capacity 0 is invalid, using 1");
            self.sessions.capacity = 1;
        }
        if self.server.body_limit_bytes < 1024 {
            tracing::warn!(
                "body_limit_bytes {} is below 1024, clamping",
                self.server.body_limit_bytes
            );
            self.server.body_limit_bytes = 1024;
        }
        if self.model.timeout_ms < 1000 {
            tracing::warn!(
                "model timeout {}ms is below 1000ms, clamping",
                self.model.timeout_ms
            );
            self.model.timeout_ms = 1000;
        } else if self.model.timeout_ms > 300_000 {
            tracing::warn!(
                "model timeout {}ms exceeds 300000ms, clamping",
                self.model.timeout_ms
            );
            self.model.timeout_ms = 300_000;
        }
        self.model.max_tokens = self.model.max_tokens.clamp(256, 8192);
        match self.model.provider.as_str() {
            "anthropic" | "none" => {}
            other => {
                tracing::warn!("Unknown model provider '{}', live model disabled", other);
                self.model.provider = "none".to_string();
            }
        }
    }

    /// A live model is used only with a provider and a key
    pub fn model_enabled(&self) -> bool {
        self.model.provider == "anthropic" && self.runtime.api_key.is_some()
    }
}
