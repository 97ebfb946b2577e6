// ABOUTME: Tredict client configuration covering credentials, endpoints, callback and token file
// ABOUTME: Supports explicit construction, JSON config files and TREDICT_* environment overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

use crate::constants::{callback, endpoints, env_vars, http, tokens};
use crate::errors::{TredictError, TredictResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// OAuth client credentials issued by Tredict
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth client id
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret; may be left out of a config file and supplied via
    /// `TREDICT_CLIENT_SECRET`
    #[serde(default)]
    pub client_secret: String,
}

impl Credentials {
    /// Create credentials from an id/secret pair
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

// The secret must never end up in logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TredictConfig {
    /// OAuth client credentials
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Authorization page URL
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// Token endpoint URL
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Suffix appended verbatim to `token_url`
    #[serde(default)]
    pub token_append: String,
    /// REST API root
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Host the callback listener binds to
    #[serde(default = "default_callback_host")]
    pub callback_host: String,
    /// Port the callback listener binds to
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    /// Redirect path served by the callback listener
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// Seconds to wait for the redirect
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
    /// Where the token pair is persisted
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// Refresh when the access token expires within this many seconds
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: i64,
    /// API request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// API connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_auth_url() -> String {
    endpoints::AUTH_URL.to_owned()
}

fn default_token_url() -> String {
    endpoints::TOKEN_URL.to_owned()
}

fn default_api_base_url() -> String {
    endpoints::API_BASE_URL.to_owned()
}

fn default_callback_host() -> String {
    callback::DEFAULT_HOST.to_owned()
}

const fn default_callback_port() -> u16 {
    callback::DEFAULT_PORT
}

fn default_callback_path() -> String {
    callback::DEFAULT_PATH.to_owned()
}

const fn default_callback_timeout_secs() -> u64 {
    callback::DEFAULT_TIMEOUT_SECS
}

const fn default_refresh_margin_secs() -> i64 {
    tokens::DEFAULT_REFRESH_MARGIN_SECS
}

const fn default_request_timeout_secs() -> u64 {
    http::API_TIMEOUT_SECS
}

const fn default_connect_timeout_secs() -> u64 {
    http::API_CONNECT_TIMEOUT_SECS
}

/// Token file under the platform config directory, or the working directory
/// when the platform has none
fn default_token_file() -> PathBuf {
    dirs::config_dir().map_or_else(
        || PathBuf::from(tokens::TOKEN_FILE_NAME),
        |dir| dir.join(tokens::APP_DIR).join(tokens::TOKEN_FILE_NAME),
    )
}

impl TredictConfig {
    /// Create a configuration from explicit credentials, defaulting everything else
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            token_append: String::new(),
            api_base_url: default_api_base_url(),
            callback_host: default_callback_host(),
            callback_port: default_callback_port(),
            callback_path: default_callback_path(),
            callback_timeout_secs: default_callback_timeout_secs(),
            token_file: default_token_file(),
            refresh_margin_secs: default_refresh_margin_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Load configuration from a JSON file, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or the
    /// resulting configuration fails validation
    pub fn from_file(path: &Path) -> TredictResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TredictError::config(format!("Cannot read {}: {e}", path.display()))
        })?;
        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            TredictError::config(format!("Invalid config file {}: {e}", path.display()))
        })?;
        config.apply_env_overrides()?;
        config.validate()?;

        info!(path = %path.display(), "Loaded Tredict configuration from file");
        Ok(config)
    }

    /// Load configuration from `TREDICT_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if the client credentials are not set or an override is invalid
    pub fn from_env() -> TredictResult<Self> {
        let client_id = require_env(env_vars::CLIENT_ID)?;
        let client_secret = require_env(env_vars::CLIENT_SECRET)?;

        let mut config = Self::new(Credentials::new(client_id, client_secret));
        config.apply_env_overrides()?;
        config.validate()?;

        info!("Loaded Tredict configuration from environment");
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the selected source is missing or invalid
    pub fn load(path: Option<&Path>) -> TredictResult<Self> {
        path.map_or_else(Self::from_env, Self::from_file)
    }

    fn apply_env_overrides(&mut self) -> TredictResult<()> {
        if let Ok(client_id) = env::var(env_vars::CLIENT_ID) {
            self.credentials.client_id = client_id;
        }
        if let Ok(client_secret) = env::var(env_vars::CLIENT_SECRET) {
            self.credentials.client_secret = client_secret;
        }
        if let Ok(auth_url) = env::var(env_vars::AUTH_URL) {
            self.auth_url = auth_url;
        }
        if let Ok(token_url) = env::var(env_vars::TOKEN_URL) {
            self.token_url = token_url;
        }
        if let Ok(api_base_url) = env::var(env_vars::API_BASE_URL) {
            self.api_base_url = api_base_url;
        }
        if let Ok(port) = env::var(env_vars::CALLBACK_PORT) {
            self.callback_port = port.parse().map_err(|_| {
                TredictError::config(format!(
                    "{} must be a port number, got '{port}'",
                    env_vars::CALLBACK_PORT
                ))
            })?;
        }
        if let Ok(path) = env::var(env_vars::CALLBACK_PATH) {
            self.callback_path = path;
        }
        if let Ok(token_file) = env::var(env_vars::TOKEN_FILE) {
            self.token_file = PathBuf::from(token_file);
        }
        debug!(config = ?self, "Applied environment overrides");
        Ok(())
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field
    pub fn validate(&self) -> TredictResult<()> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(TredictError::config("client_id must not be empty"));
        }
        if self.credentials.client_secret.trim().is_empty() {
            return Err(TredictError::config("client_secret must not be empty"));
        }
        for (name, value) in [
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("api_base_url", &self.api_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| TredictError::config(format!("{name} '{value}' is invalid: {e}")))?;
        }
        if !self.callback_path.starts_with('/') {
            return Err(TredictError::config(format!(
                "callback_path '{}' must start with '/'",
                self.callback_path
            )));
        }
        if self.callback_timeout_secs == 0 {
            return Err(TredictError::config("callback_timeout_secs must be positive"));
        }
        if !(0..=tokens::MAX_REFRESH_MARGIN_SECS).contains(&self.refresh_margin_secs) {
            return Err(TredictError::config(format!(
                "refresh_margin_secs must be between 0 and {}, got {}",
                tokens::MAX_REFRESH_MARGIN_SECS,
                self.refresh_margin_secs
            )));
        }
        Ok(())
    }

    /// Full token endpoint URL including the configured suffix
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.token_url, self.token_append)
    }

    /// Redirect URI registered with Tredict for the loopback listener
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.callback_port, self.callback_path)
    }

    /// Absolute URL of an API resource
    #[must_use]
    pub fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Absolute URL of a single API resource, with `id` appended as one
    /// percent-encoded path segment
    ///
    /// # Errors
    ///
    /// Returns [`TredictError::InvalidArgument`] if `id` is empty, `.` or `..`,
    /// or a config error if the API root cannot carry a path
    pub fn api_resource_url(&self, endpoint: &str, id: &str) -> TredictResult<String> {
        if matches!(id, "" | "." | "..") {
            return Err(TredictError::InvalidArgument(format!(
                "'{id}' is not a valid resource id"
            )));
        }

        let mut url = Url::parse(&self.api_url(endpoint))
            .map_err(|e| TredictError::config(format!("api_base_url is invalid: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| TredictError::config("api_base_url cannot carry a path"))?
            .push(id);
        Ok(url.into())
    }
}

fn require_env(name: &str) -> TredictResult<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| TredictError::config(format!("{name} environment variable is required")))
}
