use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{OrnithoError, Result};

const DEFAULT_USER_AGENT: &str = concat!("ornitho-api-rs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Credentials and endpoint settings supplied to every request
#[derive(Clone)]
pub struct Config {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub user_email: String,
    pub user_pw: String,
    /// Always ends with `/`; request paths are appended verbatim
    pub api_base: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Enables the response cache when set
    pub cache_ttl: Option<Duration>,
}

impl Config {
    /// Build a configuration, rejecting empty credentials
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        user_email: impl Into<String>,
        user_pw: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            consumer_key: required("consumer_key", consumer_key.into())?,
            consumer_secret: required("consumer_secret", consumer_secret.into())?,
            user_email: required("user_email", user_email.into())?,
            user_pw: required("user_pw", user_pw.into())?,
            api_base: normalize_base(required("api_base", api_base.into())?),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: None,
        };
        Ok(config)
    }

    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            env::var("ORNITHO_CONSUMER_KEY").unwrap_or_default(),
            env::var("ORNITHO_CONSUMER_SECRET").unwrap_or_default(),
            env::var("ORNITHO_USER_EMAIL").unwrap_or_default(),
            env::var("ORNITHO_USER_PW").unwrap_or_default(),
            env::var("ORNITHO_API_BASE").unwrap_or_default(),
        )?;

        if let Some(secs) = env::var("ORNITHO_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }

        config.cache_ttl = env::var("ORNITHO_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(config)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .field("user_email", &self.user_email)
            .field("user_pw", &"***")
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

fn required(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(OrnithoError::Config(format!("{} missing", name)));
    }
    Ok(value)
}

fn normalize_base(mut base: String) -> String {
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}
