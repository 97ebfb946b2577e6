// ABOUTME: Tredict API client combining the OAuth flow, token lifecycle and resource endpoints
// ABOUTME: Attaches a fresh bearer token to every request and surfaces non-2xx responses as errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! # Tredict API Client
//!
//! [`TredictClient`] is the library entry point. It runs the interactive
//! authorization flow, keeps the token pair fresh and exposes one method per
//! API resource. Each resource method issues exactly one request to the API
//! (preceded by at most one token refresh) and never retries.
//!
//! ```rust,no_run
//! use tredict::{ActivityListQuery, TredictClient, TredictResult};
//!
//! # async fn run() -> TredictResult<()> {
//! let client = TredictClient::from_env()?;
//! if client.token().await?.is_none() {
//!     client.authorize().await?;
//! }
//! let list = client.activity_list(&ActivityListQuery::default()).await?;
//! println!("{} activities", list.activities.len());
//! # Ok(())
//! # }
//! ```

use crate::config::TredictConfig;
use crate::constants::endpoints;
use crate::errors::{TredictError, TredictResult};
use crate::models::{Activity, ActivityList, ActivityListQuery, BodyValues, UserProfile};
use crate::oauth2_client::{
    generate_state, AuthorizationCode, CallbackServer, OAuth2Client, OAuth2Config, OAuth2Token,
    TokenManager, TokenStore,
};
use crate::utils::http_client::api_client;
use bytes::Bytes;
use chrono::Duration as ChronoDuration;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const JSON_ACCEPT: &str = "application/json";
const FIT_ACCEPT: &str = "application/octet-stream";

/// Client for the Tredict OAuth API
#[derive(Debug)]
pub struct TredictClient {
    config: TredictConfig,
    oauth_client: OAuth2Client,
    http: Client,
    tokens: Mutex<TokenManager>,
}

impl TredictClient {
    /// Create a client from a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation
    pub fn new(config: TredictConfig) -> TredictResult<Self> {
        config.validate()?;

        let oauth_client = OAuth2Client::new(OAuth2Config::from(&config));
        let store = TokenStore::new(config.token_file.clone());
        let refresh_margin = ChronoDuration::try_seconds(config.refresh_margin_secs)
            .ok_or_else(|| TredictError::config("refresh_margin_secs out of range"))?;
        let tokens = TokenManager::new(oauth_client.clone(), store, refresh_margin);
        let http = api_client(config.request_timeout_secs, config.connect_timeout_secs);

        Ok(Self {
            config,
            oauth_client,
            http,
            tokens: Mutex::new(tokens),
        })
    }

    /// Create a client from a JSON config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or is invalid
    pub fn from_config_file(path: &Path) -> TredictResult<Self> {
        Self::new(TredictConfig::from_file(path)?)
    }

    /// Create a client from `TREDICT_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid
    pub fn from_env() -> TredictResult<Self> {
        Self::new(TredictConfig::from_env()?)
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &TredictConfig {
        &self.config
    }

    /// Authorization URL for the given `state`
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization URL is malformed
    pub fn authorization_url(&self, state: &str) -> TredictResult<String> {
        self.oauth_client.authorization_url(state)
    }

    /// Run the interactive part of the flow and return the authorization code
    ///
    /// The authorization URL is only emitted as an `info` tracing event, so it
    /// is invisible unless a subscriber is installed at that level. Callers
    /// that must show the URL to the user should use
    /// [`Self::request_auth_code_with`] instead.
    ///
    /// # Errors
    ///
    /// See [`CallbackServer::wait_for_code`]
    pub async fn request_auth_code(&self) -> TredictResult<AuthorizationCode> {
        self.request_auth_code_with(|url| {
            info!(authorization_url = %url, "Open this URL to authorise");
        })
        .await
    }

    /// Bind the callback listener, hand the authorization URL to `present`, then
    /// wait for the redirect
    ///
    /// The listener is bound before `present` runs so a fast redirect cannot
    /// arrive at a closed port.
    ///
    /// # Errors
    ///
    /// See [`CallbackServer::wait_for_code`]
    pub async fn request_auth_code_with<F>(&self, present: F) -> TredictResult<AuthorizationCode>
    where
        F: FnOnce(&str) + Send,
    {
        let state = generate_state();
        let url = self.authorization_url(&state)?;

        let server = CallbackServer::bind(
            &self.config.callback_host,
            self.config.callback_port,
            self.config.callback_path.clone(),
        )
        .await?;

        present(&url);

        server
            .wait_for_code(
                Some(&state),
                Duration::from_secs(self.config.callback_timeout_secs),
            )
            .await
    }

    /// Exchange an authorization code for a token pair and persist it
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the token cannot be saved
    pub async fn request_user_access_token(&self, code: &str) -> TredictResult<OAuth2Token> {
        self.tokens
            .lock()
            .await
            .request_user_access_token(code)
            .await
    }

    /// Full interactive authorization: capture a code, then exchange it
    ///
    /// # Errors
    ///
    /// Returns the first error from either step
    pub async fn authorize(&self) -> TredictResult<OAuth2Token> {
        let code = self.request_auth_code().await?;
        self.request_user_access_token(&code.code).await
    }

    /// Force a token refresh
    ///
    /// # Errors
    ///
    /// See [`TokenManager::refresh`]
    pub async fn refresh(&self) -> TredictResult<OAuth2Token> {
        self.tokens.lock().await.refresh().await
    }

    /// Currently stored token, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the token file is malformed
    pub async fn token(&self) -> TredictResult<Option<OAuth2Token>> {
        Ok(self.tokens.lock().await.current_token().await?.cloned())
    }

    /// List activities
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport, status or decoding failure
    pub async fn activity_list(&self, query: &ActivityListQuery) -> TredictResult<ActivityList> {
        self.get_json_with_query(endpoints::ACTIVITY_LIST, &query.to_query_pairs())
            .await
    }

    /// Fetch one activity in detail
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport, status or decoding failure
    pub async fn activity(&self, activity_id: &str) -> TredictResult<Activity> {
        let url = self
            .config
            .api_resource_url(endpoints::ACTIVITY, activity_id)?;
        self.get_json_from(&url, &[]).await
    }

    /// Download the FIT file of an activity
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport or status failure
    pub async fn activity_fit(&self, activity_id: &str) -> TredictResult<Bytes> {
        let url = self
            .config
            .api_resource_url(endpoints::ACTIVITY_FIT, activity_id)?;
        let response = self.send(Method::GET, &url, &[], FIT_ACCEPT).await?;
        Ok(response.bytes().await?)
    }

    /// Fetch body values
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport, status or decoding failure
    pub async fn body_values(&self) -> TredictResult<BodyValues> {
        self.get_json(endpoints::BODY_VALUES).await
    }

    /// Fetch the authorized user's profile
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport, status or decoding failure
    pub async fn user_profile(&self) -> TredictResult<UserProfile> {
        self.get_json(endpoints::USER_PROFILE).await
    }

    /// Revoke this integration for the authorized user
    ///
    /// Issues exactly one request and never retries. On success the stored
    /// token is removed, since the server no longer honours it.
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport or status failure; the stored token
    /// is left in place in that case
    pub async fn deregister(&self) -> TredictResult<()> {
        let url = self.config.api_url(endpoints::DEREGISTRATION);
        self.send(Method::DELETE, &url, &[], JSON_ACCEPT).await?;
        info!("Tredict integration deregistered");
        self.tokens.lock().await.clear().await
    }

    /// Authenticated GET of any API endpoint, decoded as JSON
    ///
    /// # Errors
    ///
    /// Returns an error on token, transport, status or decoding failure
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> TredictResult<T> {
        self.get_json_with_query(endpoint, &[]).await
    }

    async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> TredictResult<T> {
        self.get_json_from(&self.config.api_url(endpoint), query)
            .await
    }

    async fn get_json_from<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> TredictResult<T> {
        let response = self.send(Method::GET, url, query, JSON_ACCEPT).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TredictError::invalid_response(url, e.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        accept: &str,
    ) -> TredictResult<Response> {
        // Held only while obtaining the token so concurrent calls refresh at most once
        let access_token = self.tokens.lock().await.access_token().await?;
        debug!(%method, %url, "Sending Tredict API request");

        let response = self
            .http
            .request(method, url)
            .bearer_auth(access_token)
            .header(ACCEPT, accept)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TredictError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
