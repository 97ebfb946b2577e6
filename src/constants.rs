// ABOUTME: Constants for Tredict endpoints, OAuth parameters and environment variable names
// ABOUTME: Groups defaults by domain so config, client and listener share one source of truth
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! Constants module
//!
//! Values are grouped by domain. Anything a user may reasonably need to change
//! is only a default here and can be overridden through [`crate::config::TredictConfig`].

/// Tredict service endpoints
pub mod endpoints {
    /// Authorization page the user is sent to
    pub const AUTH_URL: &str = "https://www.tredict.com/authorization/";
    /// OAuth2 token endpoint (authorization code and refresh token grants)
    pub const TOKEN_URL: &str = "https://www.tredict.com/user/oauth/v2/token";
    /// Root of the OAuth-protected REST API
    pub const API_BASE_URL: &str = "https://www.tredict.com/api/oauth/v2";

    /// Activity list resource
    pub const ACTIVITY_LIST: &str = "activityList";
    /// Single activity resource, suffixed with the activity id
    pub const ACTIVITY: &str = "activity";
    /// FIT file download, suffixed with the activity id
    pub const ACTIVITY_FIT: &str = "activity/fit";
    /// Body values resource
    pub const BODY_VALUES: &str = "bodyvalues";
    /// User profile resource
    pub const USER_PROFILE: &str = "user";
    /// Revokes the integration for the authorized user
    pub const DEREGISTRATION: &str = "user/deregistration";
}

/// OAuth2 protocol values
pub mod oauth {
    /// Grant type for exchanging an authorization code
    pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
    /// Grant type for exchanging a refresh token
    pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
    /// Accept header sent to the token endpoint
    pub const TOKEN_ACCEPT: &str = "application/json;charset=UTF-8";
    /// Token type assumed when the provider omits it
    pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
    /// Lifetime assumed when the provider omits `expires_in`
    pub const DEFAULT_TOKEN_EXPIRY_SECONDS: i64 = 3600;
}

/// Loopback callback listener defaults
pub mod callback {
    /// Host the listener binds to
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    /// Fixed port registered as the redirect target
    pub const DEFAULT_PORT: u16 = 8080;
    /// Redirect path registered with the provider
    pub const DEFAULT_PATH: &str = "/";
    /// How long to wait for the browser redirect
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Body returned after a successful redirect
    pub const SUCCESS_BODY: &str = "Authorisation complete!";
    /// Body returned after the user denied access
    pub const FAILURE_BODY: &str = "Authorisation failed!";
    /// Body returned when the redirect carried neither a code nor an error
    pub const MALFORMED_BODY: &str = "Authorisation response is missing the code parameter";
    /// Body returned when the redirect state does not match the request
    pub const STATE_MISMATCH_BODY: &str = "Authorisation response state does not match";
}

/// Token lifecycle defaults
pub mod tokens {
    /// Refresh when the access token expires within this many seconds
    pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;
    /// Largest accepted refresh margin (one day)
    pub const MAX_REFRESH_MARGIN_SECS: i64 = 86_400;
    /// Directory under the user config dir holding the token file
    pub const APP_DIR: &str = "tredict";
    /// Token file name
    pub const TOKEN_FILE_NAME: &str = "token.json";
}

/// HTTP client timeouts
pub mod http {
    /// Token endpoint request timeout
    pub const OAUTH_TIMEOUT_SECS: u64 = 15;
    /// Token endpoint connect timeout
    pub const OAUTH_CONNECT_TIMEOUT_SECS: u64 = 5;
    /// API request timeout
    pub const API_TIMEOUT_SECS: u64 = 60;
    /// API connect timeout
    pub const API_CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Environment variable names
pub mod env_vars {
    /// OAuth client id
    pub const CLIENT_ID: &str = "TREDICT_CLIENT_ID";
    /// OAuth client secret
    pub const CLIENT_SECRET: &str = "TREDICT_CLIENT_SECRET";
    /// Authorization endpoint override
    pub const AUTH_URL: &str = "TREDICT_AUTH_URL";
    /// Token endpoint override
    pub const TOKEN_URL: &str = "TREDICT_TOKEN_URL";
    /// API root override
    pub const API_BASE_URL: &str = "TREDICT_API_BASE_URL";
    /// Callback port override
    pub const CALLBACK_PORT: &str = "TREDICT_CALLBACK_PORT";
    /// Callback path override
    pub const CALLBACK_PATH: &str = "TREDICT_CALLBACK_PATH";
    /// Token file location override
    pub const TOKEN_FILE: &str = "TREDICT_TOKEN_FILE";
}

/// Service identification used in logs
pub mod service_names {
    /// Name reported in startup log lines
    pub const TREDICT_CLIENT: &str = "tredict-client";
}
