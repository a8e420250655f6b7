//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use crate::error::{ConsoleError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://evolve2p-backend.onrender.com";

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// REST API base, e.g. `https://host`
    pub api_base_url: String,
    /// Socket.IO server base (usually the same host as the API)
    pub realtime_url: String,
    /// Bearer token attached to every request
    pub auth_token: String,
    pub request_timeout: Duration,
}

impl ConsoleConfig {
    pub fn new(api_base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self {
            realtime_url: api_base_url.clone(),
            api_base_url,
            auth_token: auth_token.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Read `ADMIN_*` variables. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self> {
        let auth_token = env::var("ADMIN_AUTH_TOKEN")
            .map_err(|_| ConsoleError::Config("ADMIN_AUTH_TOKEN must be set".to_string()))?;
        let api_base_url =
            env::var("ADMIN_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let mut config = Self::new(api_base_url, auth_token);

        if let Ok(url) = env::var("ADMIN_REALTIME_URL") {
            config.realtime_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(secs) = env::var("ADMIN_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ConsoleError::Config(format!("ADMIN_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = ConsoleConfig::new("http://localhost:4000/", "token");
        assert_eq!(config.api_base_url, "http://localhost:4000");
        assert_eq!(config.realtime_url, "http://localhost:4000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }
}
