// ABOUTME: Main library entry point for the Tredict fitness platform client
// ABOUTME: Provides the OAuth2 authorization code flow, token lifecycle and API bindings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![deny(unsafe_code)]

//! # Tredict Client
//!
//! A client for the [Tredict](https://www.tredict.com) training platform API.
//!
//! ## Features
//!
//! - **Authorization**: Loopback listener capturing the OAuth2 redirect
//! - **Token lifecycle**: Code exchange, persistence and refresh before expiry
//! - **API access**: Activities, FIT downloads, body values, profile and deregistration
//!
//! ## Quick Start
//!
//! 1. Register an application with Tredict and set `TREDICT_CLIENT_ID` and
//!    `TREDICT_CLIENT_SECRET`
//! 2. Run `tredict-cli authorize` once and grant access in the browser
//! 3. Call the API through [`TredictClient`] or the CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tredict::{TredictClient, TredictResult};
//!
//! #[tokio::main]
//! async fn main() -> TredictResult<()> {
//!     let client = TredictClient::from_env()?;
//!     let profile = client.user_profile().await?;
//!     println!("Authorized as {:?}", profile.display_name);
//!     Ok(())
//! }
//! ```

/// API client combining authorization and resource endpoints
pub mod client;

/// Client configuration and credentials
pub mod config;

/// Endpoint paths, defaults and environment variable names
pub mod constants;

/// Error types
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Data models for API responses
pub mod models;

/// `OAuth2` authorization code flow and token lifecycle
pub mod oauth2_client;

/// HTTP client helpers
pub mod utils;

pub use client::TredictClient;
pub use config::{Credentials, TredictConfig};
pub use errors::{TredictError, TredictResult};
pub use models::{Activity, ActivityList, ActivityListQuery, BodyValue, BodyValues, UserProfile};
pub use oauth2_client::{AuthorizationCode, CallbackServer, OAuth2Token};
