//! Client configuration: credentials, target environment and transport settings.

use std::fmt;
use std::time::Duration;

use log::debug;
use reqwest::Client;

use crate::error::{Error, Result};
use crate::http::HttpClient;

/// Production API host.
pub const PRODUCTION_URL: &str = "https://api.correios.com.br";

/// Staging ("homologação") API host.
pub const STAGING_URL: &str = "https://apihom.correios.com.br";

const ENV_USERNAME: &str = "CORREIOS_USERNAME";
const ENV_PASSWORD: &str = "CORREIOS_PASSWORD";
const ENV_POSTAGE_CARD: &str = "CORREIOS_POSTAGE_CARD";
const ENV_PRODUCTION: &str = "CORREIOS_PRODUCTION";
const ENV_BASE_URL: &str = "CORREIOS_BASE_URL";

/// Account credentials used to obtain a token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Postage card number ("cartão de postagem").
    pub postage_card: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        postage_card: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            postage_card: postage_card.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .field("postage_card", &self.postage_card)
            .finish()
    }
}

/// Which Correios host the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Staging,
}

impl Environment {
    /// `Production` when `production` is true, `Staging` otherwise.
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            Environment::Production
        } else {
            Environment::Staging
        }
    }

    /// Host of the environment, without a trailing slash.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_URL,
            Environment::Staging => STAGING_URL,
        }
    }
}

/// Everything needed to build a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub environment: Environment,
    /// Overrides the environment host when set.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Config {
    /// Configuration for the production host when `production` is true,
    /// the staging host otherwise.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        postage_card: impl Into<String>,
        production: bool,
    ) -> Self {
        Self {
            credentials: Credentials::new(username, password, postage_card),
            environment: Environment::from_production_flag(production),
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("correios-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeouts(mut self, timeout: Duration, connect_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = connect_timeout;
        self
    }

    /// Host all endpoint paths are appended to, without a trailing slash.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Loads the configuration from `CORREIOS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name to its value.
    ///
    /// `CORREIOS_USERNAME`, `CORREIOS_PASSWORD` and `CORREIOS_POSTAGE_CARD` are
    /// required. `CORREIOS_PRODUCTION` defaults to true and `CORREIOS_BASE_URL`
    /// is optional.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let username = required(ENV_USERNAME)?;
        let password = required(ENV_PASSWORD)?;
        let postage_card = required(ENV_POSTAGE_CARD)?;

        let production = match lookup(ENV_PRODUCTION) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                Error::Config(format!("{} must be a boolean, got {:?}", ENV_PRODUCTION, value))
            })?,
            None => true,
        };

        let mut config = Self::new(username, password, postage_card, production);
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            debug!("Using base URL override {}", base_url);
            config = config.with_base_url(base_url);
        }

        Ok(config)
    }

    pub(crate) fn build_http_client(&self) -> Result<HttpClient> {
        let client = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpClient::new(client))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
