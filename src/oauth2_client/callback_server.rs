// ABOUTME: Short-lived loopback HTTP listener that captures the OAuth2 authorization redirect
// ABOUTME: Serves until one callback decides the outcome or the timeout elapses, then releases the port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! # OAuth Callback Listener
//!
//! The browser is redirected to `http://localhost:<port><path>?code=..&state=..`
//! once the user grants access. [`CallbackServer`] binds that port, waits for the
//! redirect and returns the authorization code.
//!
//! Requests for `/favicon.ico`, `/privacy` or unknown paths are answered without
//! ending the wait. The first request to the callback path always ends it, with
//! either a code or an error, so a malformed redirect never leaves the caller
//! hanging until the timeout.

use crate::constants::callback;
use crate::errors::{TredictError, TredictResult};
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::form_urlencoded;

/// How long to wait for in-flight responses after the outcome is known
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Authorization code captured from the redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The authorization code to exchange at the token endpoint
    pub code: String,
    /// `state` echoed back by the provider
    pub state: Option<String>,
}

/// Outcome of a request to the callback path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Redirect carried a code
    Code(AuthorizationCode),
    /// Redirect carried an `error` parameter
    Denied {
        /// `error` parameter
        error: String,
        /// `error_description` parameter
        description: Option<String>,
    },
    /// Redirect carried neither a code nor an error
    MissingCode,
    /// Redirect `state` differs from the one sent with the authorization request
    StateMismatch,
}

impl CallbackOutcome {
    /// Classify callback query parameters
    #[must_use]
    pub fn from_params(params: &HashMap<String, String>, expected_state: Option<&str>) -> Self {
        if let Some(error) = params.get("error") {
            return Self::Denied {
                error: error.clone(),
                description: params.get("error_description").cloned(),
            };
        }

        let Some(code) = params.get("code").filter(|code| !code.is_empty()) else {
            return Self::MissingCode;
        };

        let state = params.get("state").cloned();
        if let Some(expected) = expected_state {
            if state.as_deref() != Some(expected) {
                return Self::StateMismatch;
            }
        }

        Self::Code(AuthorizationCode {
            code: code.clone(),
            state,
        })
    }

    fn response(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Code(_) => (StatusCode::OK, callback::SUCCESS_BODY),
            Self::Denied { .. } => (StatusCode::OK, callback::FAILURE_BODY),
            Self::MissingCode => (StatusCode::BAD_REQUEST, callback::MALFORMED_BODY),
            Self::StateMismatch => (StatusCode::BAD_REQUEST, callback::STATE_MISMATCH_BODY),
        }
    }

    fn into_result(self) -> TredictResult<AuthorizationCode> {
        match self {
            Self::Code(code) => Ok(code),
            Self::Denied { error, description } => {
                Err(TredictError::AuthorizationDenied { error, description })
            }
            Self::MissingCode => Err(TredictError::MissingAuthorizationCode),
            Self::StateMismatch => Err(TredictError::StateMismatch),
        }
    }
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Option<String>,
    outcome_tx: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
}

impl CallbackState {
    /// Deliver the outcome; only the first call has any effect
    fn complete(&self, outcome: CallbackOutcome) {
        let sender = self
            .outcome_tx
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => debug!("Callback outcome already delivered, ignoring request"),
        }
    }
}

/// Loopback listener bound to the redirect port
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    path: String,
}

impl CallbackServer {
    /// Bind the listener
    ///
    /// Port `0` binds an ephemeral port; use [`Self::local_addr`] to find it.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not start with `/` or the port cannot be bound
    pub async fn bind(host: &str, port: u16, path: impl Into<String>) -> TredictResult<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(TredictError::config(format!(
                "callback path '{path}' must start with '/'"
            )));
        }

        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            TredictError::CallbackServer(format!("cannot bind {host}:{port}: {e}"))
        })?;

        info!(host, port, path = %path, "Callback server started");
        Ok(Self { listener, path })
    }

    /// Address the listener is bound to
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read
    pub fn local_addr(&self) -> TredictResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the callback path is hit once, or `wait` elapses
    ///
    /// When `expected_state` is given, a redirect with a different or missing
    /// `state` is rejected. The port is released before this returns.
    ///
    /// # Errors
    ///
    /// - [`TredictError::AuthorizationDenied`] when the redirect carries `error`
    /// - [`TredictError::MissingAuthorizationCode`] when it carries no code
    /// - [`TredictError::StateMismatch`] when the state does not match
    /// - [`TredictError::CallbackTimeout`] when nothing arrives in time
    pub async fn wait_for_code(
        self,
        expected_state: Option<&str>,
        wait: Duration,
    ) -> TredictResult<AuthorizationCode> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = CallbackState {
            expected_state: expected_state.map(str::to_owned),
            outcome_tx: Arc::new(Mutex::new(Some(outcome_tx))),
        };
        let app = router(&self.path, state);

        let mut server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = timeout(wait, outcome_rx).await;

        let _ = shutdown_tx.send(());
        match timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Ok(()))) => info!("Callback server stopped"),
            Ok(Ok(Err(e))) => warn!(error = %e, "Callback server stopped with error"),
            Ok(Err(e)) => warn!(error = %e, "Callback server task failed"),
            Err(_) => {
                warn!("Callback server did not stop within the grace period, aborting");
                server.abort();
            }
        }

        match outcome {
            Ok(Ok(outcome)) => outcome.into_result(),
            Ok(Err(_)) => Err(TredictError::CallbackServer(
                "callback listener stopped before a redirect arrived".to_owned(),
            )),
            Err(_) => Err(TredictError::CallbackTimeout {
                timeout_secs: wait.as_secs(),
            }),
        }
    }
}

fn router(path: &str, state: CallbackState) -> Router {
    let mut router = Router::new().route(path, get(handle_callback));
    // Browsers request these on their own; they must not end the wait
    if path != "/favicon.ico" {
        router = router.route("/favicon.ico", get(|| async { StatusCode::NOT_FOUND }));
    }
    if path != "/privacy" {
        router = router.route("/privacy", get(|| async { StatusCode::NO_CONTENT }));
    }
    router
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state)
}

async fn handle_callback(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, &'static str) {
    let params: HashMap<String, String> = query
        .as_deref()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let outcome = CallbackOutcome::from_params(&params, state.expected_state.as_deref());
    match &outcome {
        CallbackOutcome::Code(_) => info!("Authorization code received"),
        CallbackOutcome::Denied { error, .. } => warn!(error = %error, "Authorization denied"),
        CallbackOutcome::MissingCode => warn!("Callback without code or error parameter"),
        CallbackOutcome::StateMismatch => warn!("Callback state mismatch"),
    }

    let response = outcome.response();
    state.complete(outcome);
    response
}
