// ABOUTME: Unified error type for the Tredict client library
// ABOUTME: Covers configuration, callback listener, token lifecycle and API failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! # Error Handling
//!
//! Every fallible operation in the library returns [`TredictResult`]. Errors are
//! surfaced to the caller as-is: the library never retries, so a variant here maps
//! one-to-one onto the failure the remote service or the local machine reported.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type TredictResult<T> = Result<T, TredictError>;

/// Errors raised by the Tredict client
#[derive(Debug, Error)]
pub enum TredictError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The callback listener could not bind or serve
    #[error("Callback listener error: {0}")]
    CallbackServer(String),

    /// No redirect reached the callback listener in time
    #[error("No authorization callback received within {timeout_secs} seconds")]
    CallbackTimeout {
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// The redirect reached the listener without a usable `code` parameter
    #[error("Authorization callback did not contain an authorization code")]
    MissingAuthorizationCode,

    /// The redirect carried a `state` different from the one sent
    #[error("Authorization callback state mismatch")]
    StateMismatch,

    /// The user or the provider rejected the authorization request
    #[error("Authorization denied: {error}{}", format_description(.description))]
    AuthorizationDenied {
        /// `error` query parameter from the redirect
        error: String,
        /// Optional `error_description` query parameter
        description: Option<String>,
    },

    /// The token endpoint answered with a non-success status
    #[error("Token request failed with status {status}: {body}")]
    TokenRequest {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the provider
        body: String,
    },

    /// A caller-supplied value cannot be used in a request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No token is available; run the authorization flow first
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// The persisted token file exists but cannot be parsed
    #[error("Malformed token file {path}: {reason}")]
    MalformedTokenFile {
        /// Token file location
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// An API endpoint answered with a non-success status
    #[error("API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the provider
        body: String,
    },

    /// A response body could not be decoded
    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        /// Endpoint that produced the response
        endpoint: String,
        /// Decoder message
        reason: String,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file system failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn format_description(description: &Option<String>) -> String {
    description
        .as_deref()
        .map_or_else(String::new, |d| format!(" ({d})"))
}

impl TredictError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a "not authorized" error
    #[must_use]
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::NotAuthorized(message.into())
    }

    /// Create an invalid response error
    #[must_use]
    pub fn invalid_response(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TokenRequest { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the caller must re-run the interactive authorization flow
    #[must_use]
    pub const fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized(_)
                | Self::TokenRequest {
                    status: 400 | 401,
                    ..
                }
        )
    }
}
