// ABOUTME: OAuth2 client for the Tredict authorization code and refresh token grants
// ABOUTME: Builds authorization URLs and exchanges codes or refresh tokens at the token endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

use crate::config::{Credentials, TredictConfig};
use crate::constants::oauth;
use crate::errors::{TredictError, TredictResult};
use crate::utils::http_client::oauth_client;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// OAuth 2.0 client configuration
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Client credentials, sent as HTTP Basic auth to the token endpoint
    pub credentials: Credentials,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL, including any configured suffix
    pub token_url: String,
}

impl From<&TredictConfig> for OAuth2Config {
    fn from(config: &TredictConfig) -> Self {
        Self {
            credentials: config.credentials.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_endpoint(),
        }
    }
}

/// OAuth 2.0 access/refresh token pair with expiry information
///
/// Treated as an immutable value: a refresh produces a new token that replaces
/// the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Token {
    /// The access token string
    pub access_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Refresh token used to obtain the next access token
    pub refresh_token: String,
    /// Access token expiration timestamp (UTC)
    pub expires_at: DateTime<Utc>,
    /// Refresh token expiration timestamp (UTC), when the provider reports one
    #[serde(default)]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Granted OAuth scopes
    #[serde(default)]
    pub scope: Option<String>,
    /// Tredict user the token belongs to
    #[serde(default)]
    pub user_id: Option<String>,
}

impl OAuth2Token {
    /// Check if the access token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check if the access token expires within `margin`
    #[must_use]
    pub fn will_expire_within(&self, margin: Duration) -> bool {
        match Utc::now().checked_add_signed(margin) {
            Some(deadline) => self.expires_at <= deadline,
            None => true,
        }
    }

    /// Check if the refresh token is known to be expired
    #[must_use]
    pub fn is_refresh_token_expired(&self) -> bool {
        self.refresh_token_expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
    }
}

/// Generate a random `state` value binding a redirect to its authorization request
#[must_use]
pub fn generate_state() -> String {
    Uuid::new_v4().to_string()
}

/// OAuth 2.0 client for the Tredict token endpoint
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    config: OAuth2Config,
    client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new `OAuth2` client with the given configuration
    #[must_use]
    pub fn new(config: OAuth2Config) -> Self {
        Self {
            config,
            client: oauth_client(),
        }
    }

    /// Get the `OAuth2` configuration
    #[must_use]
    pub const fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Build the authorization URL the user opens in a browser
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization URL is malformed
    pub fn authorization_url(&self, state: &str) -> TredictResult<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| TredictError::config(format!("Invalid auth URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.credentials.client_id)
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Exchange an authorization code for a token pair
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the endpoint answers with a
    /// non-success status, or the response cannot be decoded
    pub async fn exchange_code(&self, code: &str) -> TredictResult<OAuth2Token> {
        info!("Exchanging authorization code for user access token");
        let params = [
            ("grant_type", oauth::GRANT_AUTHORIZATION_CODE),
            ("code", code),
        ];
        self.token_request(&params, None).await
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// When the provider does not rotate the refresh token, the one passed in is
    /// carried over to the new token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the endpoint answers with a
    /// non-success status, or the response cannot be decoded
    pub async fn refresh_token(&self, refresh_token: &str) -> TredictResult<OAuth2Token> {
        info!("Refreshing user access token");
        let params = [
            ("grant_type", oauth::GRANT_REFRESH_TOKEN),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&params, Some(refresh_token)).await
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        previous_refresh_token: Option<&str>,
    ) -> TredictResult<OAuth2Token> {
        debug!(url = %self.config.token_url, "POST token endpoint");

        let response = self
            .client
            .post(&self.config.token_url)
            .basic_auth(
                &self.config.credentials.client_id,
                Some(&self.config.credentials.client_secret),
            )
            .header(ACCEPT, oauth::TOKEN_ACCEPT)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TredictError::TokenRequest {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TredictError::invalid_response(&self.config.token_url, e.to_string()))?;

        Self::token_from_response(token_response, previous_refresh_token)
    }

    fn token_from_response(
        response: TokenResponse,
        previous_refresh_token: Option<&str>,
    ) -> TredictResult<OAuth2Token> {
        let now = Utc::now();
        let expires_in = response
            .expires_in
            .unwrap_or(oauth::DEFAULT_TOKEN_EXPIRY_SECONDS);

        let refresh_token = response
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_owned))
            .ok_or_else(|| {
                TredictError::invalid_response("token endpoint", "response has no refresh_token")
            })?;

        let expires_at = offset_from(now, expires_in).ok_or_else(|| {
            TredictError::invalid_response("token endpoint", "expires_in out of range")
        })?;
        let refresh_token_expires_at = response
            .refresh_token_expires_in
            .map(|seconds| {
                offset_from(now, seconds).ok_or_else(|| {
                    TredictError::invalid_response(
                        "token endpoint",
                        "refresh_token_expires_in out of range",
                    )
                })
            })
            .transpose()?;

        Ok(OAuth2Token {
            access_token: response.access_token,
            token_type: response
                .token_type
                .unwrap_or_else(|| oauth::DEFAULT_TOKEN_TYPE.to_owned()),
            refresh_token,
            expires_at,
            refresh_token_expires_at,
            scope: response.scope,
            user_id: response.user_id.map(|id| match id {
                Value::String(s) => s,
                other => other.to_string(),
            }),
        })
    }
}

/// `now + seconds`, or `None` when the instant is not representable
fn offset_from(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|delta| now.checked_add_signed(delta))
}

/// OAuth 2.0 token response from Tredict
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    refresh_token_expires_in: Option<i64>,
    scope: Option<String>,
    /// Numeric or string depending on the API version
    user_id: Option<Value>,
}
