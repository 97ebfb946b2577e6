// ABOUTME: OAuth 2.0 client implementation for connecting to the Tredict platform
// ABOUTME: Authorization code capture, token exchange, token persistence and refresh
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! # OAuth 2.0 Client Module
//!
//! The client acts on behalf of a single Tredict user via the authorization
//! code grant. This module handles:
//! - Authorization URL construction and the loopback redirect listener
//! - Code and refresh token exchanges against the token endpoint
//! - Token persistence and refresh on expiry

/// Loopback listener capturing the authorization redirect
pub mod callback_server;
/// Core OAuth 2.0 client implementation
pub mod client;
/// Token lifecycle (exchange, refresh, expiry checks)
pub mod token_manager;
/// File-backed token persistence
pub mod token_store;

pub use callback_server::{AuthorizationCode, CallbackOutcome, CallbackServer};
pub use client::{generate_state, OAuth2Client, OAuth2Config, OAuth2Token};
pub use token_manager::TokenManager;
pub use token_store::TokenStore;
