use std::time::Duration;

use vidgen_core::config::{env_parse, env_string};
use vidgen_core::ConfigError;

/// Path on our server that receives Kie.ai completion callbacks.
pub const CALLBACK_PATH: &str = "/api/callback";

/// Kie.ai client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct KieConfig {
    /// Bearer token for the Kie.ai API.
    pub api_key: String,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Model identifier sent with every job.
    pub model: String,
    /// Absolute URL Kie.ai posts completion callbacks to.
    pub callback_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl KieConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `KIE_API_KEY`              | empty                    |
    /// | `KIE_API_BASE_URL`         | `https://api.kie.ai`     |
    /// | `KIE_MODEL`                | `sora-2-text-to-video`   |
    /// | `CALLBACK_BASE_URL`        | `http://localhost:3000`  |
    /// | `KIE_REQUEST_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_string("KIE_API_KEY", "");
        if api_key.is_empty() {
            tracing::warn!("KIE_API_KEY is not set; job submissions will be rejected");
        }

        let callback_base = env_string("CALLBACK_BASE_URL", "http://localhost:3000");

        Ok(Self {
            api_key,
            base_url: env_string("KIE_API_BASE_URL", "https://api.kie.ai")
                .trim_end_matches('/')
                .to_string(),
            model: env_string("KIE_MODEL", "sora-2-text-to-video"),
            callback_url: callback_url(&callback_base),
            request_timeout: Duration::from_secs(env_parse("KIE_REQUEST_TIMEOUT_SECS", 30)?),
        })
    }
}

/// Join the public base URL of this server with the callback path.
pub fn callback_url(base: &str) -> String {
    format!("{}{CALLBACK_PATH}", base.trim_end_matches('/'))
}
