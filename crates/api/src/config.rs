use std::path::PathBuf;

use axum::http::HeaderValue;
use vidgen_core::config::{env_parse, env_string};
use vidgen_core::ConfigError;

/// Wildcard value for `CORS_ORIGINS` that allows any origin.
pub const ANY_ORIGIN: &str = "*";

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins. `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory served for every path not matched by the API.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `3000`    |
    /// | `CORS_ORIGINS`         | `*`       |
    /// | `REQUEST_TIMEOUT_SECS` | `30`      |
    /// | `STATIC_DIR`           | `public`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3000)?,
            cors_origins: parse_origins(&env_string("CORS_ORIGINS", ANY_ORIGIN))?,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30)?,
            static_dir: PathBuf::from(env_string("STATIC_DIR", "public")),
        })
    }

    /// Whether CORS is open to every origin.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == ANY_ORIGIN)
    }
}

/// Split a comma-separated origin list. Every entry other than `*` must be
/// usable as an `Access-Control-Allow-Origin` value.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            if origin != ANY_ORIGIN {
                HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                    key: "CORS_ORIGINS",
                    value: origin.to_string(),
                    reason: e.to_string(),
                })?;
            }
            Ok(origin.to_string())
        })
        .collect()
}
