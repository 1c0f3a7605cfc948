//! Configuration loading and validation for the profile server.
//!
//! Values are read from environment variables at startup, after an optional
//! `.env` file has been loaded into the environment. The process exits with a
//! clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated profile server configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Postgres connection string. When absent the server runs on the
    /// in-memory store and nothing survives a restart.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum size of the Postgres connection pool.
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// How many times to try connecting to Postgres before giving up.
    #[serde(default = "default_db_connect_attempts")]
    pub db_connect_attempts: u32,

    /// Delay (seconds) between Postgres connection attempts.
    #[serde(default = "default_db_connect_retry")]
    pub db_connect_retry_secs: u64,

    /// HMAC secret for signing session tokens. **Required.**
    pub jwt_secret: String,

    /// Session token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,

    /// Field encryption key: 16/24/32 raw bytes or base64 thereof. **Required.**
    pub aes_key: String,

    /// Shared secret for the health reset endpoint. The endpoint is disabled
    /// when unset.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Comma-separated list of origins allowed by CORS.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    /// Sustained per-client request rate.
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u32,

    /// Per-client burst allowance.
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,

    /// Key rate limiting on `X-Real-IP` / `X-Forwarded-For`. Enable only behind
    /// a reverse proxy that sets those headers itself.
    #[serde(default)]
    pub trust_proxy_headers: bool,

    /// Seconds after which idle per-client limiter state is pruned.
    #[serde(default = "default_rate_limit_expiry")]
    pub rate_limit_expiry_secs: u64,

    /// OTLP endpoint for span export. Spans are only logged locally when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_port() -> u16 {
    8080
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_connect_attempts() -> u32 {
    10
}
fn default_db_connect_retry() -> u64 {
    2
}
fn default_token_ttl_hours() -> u64 {
    72
}
fn default_cors_allowed_origins() -> String {
    "http://localhost:5173,http://localhost:3000".into()
}
fn default_rate_limit_per_second() -> u32 {
    10
}
fn default_rate_limit_burst() -> u32 {
    30
}
fn default_rate_limit_expiry() -> u64 {
    180
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured if present; real
    /// environment variables take precedence over it.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // A missing .env is the normal case in containers.
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.jwt_secret, "JWT_SECRET")?;
        ensure_non_empty(&self.aes_key, "AES_KEY")?;

        if let Some(url) = &self.database_url {
            ensure_non_empty(url, "DATABASE_URL")?;
        }
        if let Some(token) = &self.admin_token {
            ensure_non_empty(token, "ADMIN_TOKEN")?;
        }
        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be > 0");
        }
        if self.db_connect_attempts == 0 {
            anyhow::bail!("DB_CONNECT_ATTEMPTS must be > 0");
        }
        if self.token_ttl_hours == 0 {
            anyhow::bail!("TOKEN_TTL_HOURS must be > 0");
        }
        if self.rate_limit_per_second == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND must be > 0");
        }
        if self.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_BURST must be > 0");
        }
        if self.rate_limit_expiry_secs == 0 {
            anyhow::bail!("RATE_LIMIT_EXPIRY_SECS must be > 0");
        }
        let origins = self.cors_origins();
        if origins.is_empty() {
            anyhow::bail!("CORS_ALLOWED_ORIGINS must list at least one origin");
        }
        if origins.iter().any(|o| o == "*") {
            anyhow::bail!("CORS_ALLOWED_ORIGINS must list explicit origins; `*` cannot be combined with credentials");
        }
        Ok(())
    }

    /// Parsed CORS origins, whitespace-trimmed, empties dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_hours * 3600)
    }

    pub fn db_connect_retry(&self) -> Duration {
        Duration::from_secs(self.db_connect_retry_secs)
    }

    pub fn rate_limit_expiry(&self) -> Duration {
        Duration::from_secs(self.rate_limit_expiry_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets and the connection string (which may embed a password) are
        // never printed.
        f.debug_struct("Config")
            .field("api_port", &self.api_port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_connect_attempts", &self.db_connect_attempts)
            .field("db_connect_retry_secs", &self.db_connect_retry_secs)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("aes_key", &"[REDACTED]")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("rate_limit_expiry_secs", &self.rate_limit_expiry_secs)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
