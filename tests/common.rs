// ABOUTME: Shared test utilities for integration tests
// ABOUTME: Provides an in-process mock of the Tredict token and API endpoints plus config helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `tredict`
//!
//! [`MockTredict`] serves the token endpoint under `/token` and the API under
//! `/api`, counting every request so tests can assert how many calls an
//! operation made.

use axum::extract::{Form, Path, RawQuery, State};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::Level;
use tredict::oauth2_client::TokenStore;
use tredict::{Credentials, OAuth2Token, TredictConfig};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
/// `Basic base64("test-client:test-secret")`
pub const BASIC_AUTH: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";
pub const VALID_CODE: &str = "valid-code";
pub const FIT_BYTES: &[u8] = b"\x0e\x10\x43\x08.FIT-test-payload";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Clone, Default)]
struct MockState {
    token_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    api_calls: Arc<AtomicUsize>,
    deregister_calls: Arc<AtomicUsize>,
    deregistration_status: Arc<Mutex<Option<StatusCode>>>,
    last_bearer: Arc<Mutex<Option<String>>>,
    last_query: Arc<Mutex<Option<String>>>,
    last_accept: Arc<Mutex<Option<String>>>,
}

/// Running mock of the Tredict service
pub struct MockTredict {
    pub addr: SocketAddr,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockTredict {
    /// Start a mock whose deregistration endpoint answers `204 No Content`
    pub async fn start() -> Self {
        Self::start_with_deregistration_status(StatusCode::NO_CONTENT).await
    }

    /// Start a mock whose deregistration endpoint answers `status`
    pub async fn start_with_deregistration_status(status: StatusCode) -> Self {
        init_test_logging();

        let state = MockState::default();
        *state.deregistration_status.lock().unwrap() = Some(status);

        let app = Router::new()
            .route("/token", post(token))
            .route("/api/activityList", get(activity_list))
            .route("/api/activity/:id", get(activity))
            .route("/api/activity/fit/:id", get(activity_fit))
            .route("/api/bodyvalues", get(body_values))
            .route("/api/user", get(user))
            .route("/api/user/deregistration", delete(deregistration))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Requests to the token endpoint, of any grant type
    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    /// Requests using the refresh token grant
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    /// Requests to any API endpoint, authorized or not
    pub fn api_calls(&self) -> usize {
        self.state.api_calls.load(Ordering::SeqCst)
    }

    pub fn deregister_calls(&self) -> usize {
        self.state.deregister_calls.load(Ordering::SeqCst)
    }

    pub fn last_bearer(&self) -> Option<String> {
        self.state.last_bearer.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<String> {
        self.state.last_query.lock().unwrap().clone()
    }

    pub fn last_accept(&self) -> Option<String> {
        self.state.last_accept.lock().unwrap().clone()
    }
}

impl Drop for MockTredict {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Configuration pointing every endpoint at `mock`, with the token file in `dir`
pub fn test_config(mock: &MockTredict, dir: &TempDir) -> TredictConfig {
    let mut config = TredictConfig::new(Credentials::new(CLIENT_ID, CLIENT_SECRET));
    config.auth_url = mock.url("/authorization/");
    config.token_url = mock.url("/token");
    config.api_base_url = mock.url("/api");
    config.token_file = dir.path().join("token.json");
    config.callback_timeout_secs = 5;
    config
}

/// Persist a token pair directly, bypassing the token endpoint
pub async fn store_token(
    config: &TredictConfig,
    access_token: &str,
    refresh_token: &str,
    expires_in_secs: i64,
) -> OAuth2Token {
    let token = OAuth2Token {
        access_token: access_token.to_owned(),
        token_type: "Bearer".to_owned(),
        refresh_token: refresh_token.to_owned(),
        expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        refresh_token_expires_at: None,
        scope: None,
        user_id: Some("42".to_owned()),
    };
    TokenStore::new(config.token_file.clone())
        .save(&token)
        .await
        .unwrap();
    token
}

/// A local port that was free a moment ago
pub fn free_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn token(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == BASIC_AUTH);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client"})),
        )
            .into_response();
    }

    let accepts_json = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !accepts_json {
        return StatusCode::NOT_ACCEPTABLE.into_response();
    }

    let grant = form.get("grant_type").map(String::as_str);
    match grant {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some(VALID_CODE) => {
            Json(json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-1",
                "user_id": 42
            }))
            .into_response()
        }
        Some("refresh_token") => {
            state.refresh_calls.fetch_add(1, Ordering::SeqCst);
            match form.get("refresh_token").map(String::as_str) {
                // No rotated refresh token in the response
                Some("refresh-1") => Json(json!({
                    "access_token": "access-2",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .into_response(),
                _ => invalid_grant(),
            }
        }
        _ => invalid_grant(),
    }
}

fn invalid_grant() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid_grant"})),
    )
        .into_response()
}

/// Count the call, record request details and check the bearer token
fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    state.api_calls.fetch_add(1, Ordering::SeqCst);

    *state.last_accept.lock().unwrap() = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);
    *state.last_bearer.lock().unwrap() = bearer.clone();

    match bearer {
        Some(token) if token.starts_with("access-") => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_token"})),
        )
            .into_response()),
    }
}

async fn activity_list(
    State(state): State<MockState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    *state.last_query.lock().unwrap() = query;

    Json(json!({
        "activityList": [
            {"id": 1001, "name": "Morning Run", "sportType": "running",
             "startDate": "2025-03-01T07:30:00Z", "duration": 3600, "distance": 10000},
            {"id": "1002", "name": "Commute", "sportType": "cycling"}
        ],
        "total": 2
    }))
    .into_response()
}

async fn activity(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "activity not found").into_response();
    }
    Json(json!({"id": id, "name": "Morning Run", "sportType": "running", "heartRate": 148}))
        .into_response()
}

async fn activity_fit(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(_id): Path<String>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/octet-stream")],
        FIT_BYTES.to_vec(),
    )
        .into_response()
}

async fn body_values(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!([
        {"date": "2025-03-01T06:00:00Z", "weight": 71.5, "restingHeartRate": 48}
    ]))
    .into_response()
}

async fn user(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(json!({"id": 42, "name": "Test Athlete", "language": "en"})).into_response()
}

async fn deregistration(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    state.deregister_calls.fetch_add(1, Ordering::SeqCst);
    let status = state
        .deregistration_status
        .lock()
        .unwrap()
        .unwrap_or(StatusCode::NO_CONTENT);
    status.into_response()
}

/// Parsed `Value` helper for asserting on serialized models
pub fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}
