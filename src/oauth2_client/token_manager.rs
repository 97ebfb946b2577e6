// ABOUTME: Token lifecycle management: initial code exchange, persistence and refresh on expiry
// ABOUTME: Owns the current token pair and hands out access tokens that are valid for use
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

use super::client::{OAuth2Client, OAuth2Token};
use super::token_store::TokenStore;
use crate::errors::{TredictError, TredictResult};
use chrono::Duration;
use tracing::{debug, info, warn};

/// Holds the current token pair and keeps it fresh
///
/// The token is loaded from the store lazily on first use, so a malformed file
/// only fails the operations that actually need a token.
#[derive(Debug)]
pub struct TokenManager {
    oauth_client: OAuth2Client,
    store: TokenStore,
    token: Option<OAuth2Token>,
    loaded: bool,
    refresh_margin: Duration,
}

impl TokenManager {
    /// Create a manager backed by `store`
    #[must_use]
    pub fn new(oauth_client: OAuth2Client, store: TokenStore, refresh_margin: Duration) -> Self {
        Self {
            oauth_client,
            store,
            token: None,
            loaded: false,
            refresh_margin,
        }
    }

    /// OAuth client used for token requests
    #[must_use]
    pub const fn oauth_client(&self) -> &OAuth2Client {
        &self.oauth_client
    }

    /// Token file backing this manager
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Exchange an authorization code for a token pair and persist it
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the token cannot be saved
    pub async fn request_user_access_token(&mut self, code: &str) -> TredictResult<OAuth2Token> {
        let token = self.oauth_client.exchange_code(code).await?;
        self.replace(token.clone()).await?;
        info!(user_id = ?token.user_id, "User access token retrieved");
        Ok(token)
    }

    /// Exchange the stored refresh token for a new token pair
    ///
    /// The new pair replaces the old one in memory and on disk. No retry is
    /// attempted when the token endpoint rejects the request.
    ///
    /// # Errors
    ///
    /// Returns [`TredictError::NotAuthorized`] when there is no token or the
    /// refresh token has expired, otherwise any token endpoint or I/O error
    pub async fn refresh(&mut self) -> TredictResult<OAuth2Token> {
        let current = self.current_token().await?.cloned().ok_or_else(|| {
            TredictError::not_authorized("no stored token to refresh; authorize first")
        })?;

        if current.is_refresh_token_expired() {
            warn!("Refresh token expired; interactive authorization required");
            return Err(TredictError::not_authorized(
                "refresh token expired; authorize again",
            ));
        }

        let token = self
            .oauth_client
            .refresh_token(&current.refresh_token)
            .await?;
        self.replace(token.clone()).await?;
        Ok(token)
    }

    /// Return an access token that is valid for at least the refresh margin,
    /// refreshing once first when the current one is expired or about to expire
    ///
    /// # Errors
    ///
    /// Returns [`TredictError::NotAuthorized`] when no token is stored, or any
    /// error raised by [`Self::refresh`]
    pub async fn access_token(&mut self) -> TredictResult<String> {
        let margin = self.refresh_margin;
        let needs_refresh = match self.current_token().await? {
            Some(token) => token.will_expire_within(margin),
            None => {
                return Err(TredictError::not_authorized(
                    "no stored token; authorize first",
                ))
            }
        };

        if needs_refresh {
            debug!("Access token expired or expiring, refreshing");
            return Ok(self.refresh().await?.access_token);
        }

        self.current_token()
            .await?
            .map(|token| token.access_token.clone())
            .ok_or_else(|| TredictError::not_authorized("no stored token; authorize first"))
    }

    /// Current token, loading it from the store on first access
    ///
    /// # Errors
    ///
    /// Returns an error if the token file exists but cannot be read or parsed
    pub async fn current_token(&mut self) -> TredictResult<Option<&OAuth2Token>> {
        if !self.loaded {
            self.token = self.store.load().await?;
            self.loaded = true;
        }
        Ok(self.token.as_ref())
    }

    /// Forget the token in memory and on disk
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the token file cannot be removed
    pub async fn clear(&mut self) -> TredictResult<()> {
        self.token = None;
        self.loaded = true;
        self.store.clear().await
    }

    async fn replace(&mut self, token: OAuth2Token) -> TredictResult<()> {
        self.loaded = true;
        let token = self.token.insert(token);
        self.store.save(token).await
    }
}
