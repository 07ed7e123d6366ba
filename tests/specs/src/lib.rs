// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end gateway behavior.
//!
//! Runs an in-process mock of the EduHub backend (auth plus a named
//! resource route) and records every resource arrival in order, so
//! tests can assert on refresh counts, bearer tokens, and dispatch
//! ordering. The refresh endpoint can be held open to deterministically
//! park requests behind an in-flight rotation.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// How the mock backend answers `POST /auth/refresh`.
#[derive(Clone, Copy)]
pub enum RefreshScript {
    /// Accept: hand out this pair and start honoring the new access token.
    Rotate { access: &'static str, refresh: &'static str },
    /// Reject with this status.
    Fail(u16),
}

/// One recorded arrival at `GET /resource/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHit {
    pub name: String,
    pub bearer: Option<String>,
}

struct BackendState {
    valid_token: parking_lot::Mutex<String>,
    refresh_calls: AtomicU32,
    hits: parking_lot::Mutex<Vec<ResourceHit>>,
    hold_tx: watch::Sender<bool>,
    hold_rx: watch::Receiver<bool>,
}

/// In-process mock EduHub backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn status_of(code: u16) -> axum::http::StatusCode {
    axum::http::StatusCode::from_u16(code).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
}

impl MockBackend {
    /// Start the backend. `valid` is the access token the resource
    /// route initially honors.
    pub async fn start(valid: &str, refresh: RefreshScript) -> anyhow::Result<Self> {
        let (hold_tx, hold_rx) = watch::channel(false);
        let state = Arc::new(BackendState {
            valid_token: parking_lot::Mutex::new(valid.to_owned()),
            refresh_calls: AtomicU32::new(0),
            hits: parking_lot::Mutex::new(Vec::new()),
            hold_tx,
            hold_rx,
        });

        let resource = {
            let state = Arc::clone(&state);
            get(move |Path(name): Path<String>, headers: HeaderMap| {
                let token = bearer(&headers);
                state.hits.lock().push(ResourceHit { name: name.clone(), bearer: token.clone() });
                let ok = token.as_deref() == Some(state.valid_token.lock().as_str());
                async move {
                    if ok {
                        (
                            status_of(200),
                            serde_json::json!({ "success": true, "data": { "name": name } })
                                .to_string(),
                        )
                    } else {
                        (
                            status_of(401),
                            serde_json::json!({ "success": false, "message": "Not authorized" })
                                .to_string(),
                        )
                    }
                }
            })
        };

        let refresh_route = {
            let state = Arc::clone(&state);
            post(move |_body: String| {
                state.refresh_calls.fetch_add(1, Ordering::Relaxed);
                let mut hold = state.hold_rx.clone();
                let state = Arc::clone(&state);
                async move {
                    // Park here while the test holds the rotation open.
                    while *hold.borrow() {
                        if hold.changed().await.is_err() {
                            break;
                        }
                    }
                    match refresh {
                        RefreshScript::Rotate { access, refresh } => {
                            *state.valid_token.lock() = access.to_owned();
                            (
                                status_of(200),
                                serde_json::json!({
                                    "success": true,
                                    "data": { "token": access, "refreshToken": refresh },
                                })
                                .to_string(),
                            )
                        }
                        RefreshScript::Fail(code) => (
                            status_of(code),
                            serde_json::json!({
                                "success": false,
                                "message": "Invalid refresh token",
                            })
                            .to_string(),
                        ),
                    }
                }
            })
        };

        let login = post(|_body: String| async move {
            serde_json::json!({
                "success": true,
                "message": "Login successful",
                "data": {
                    "user": { "id": 1, "email": "ada@eduhub.dev", "role": "student" },
                    "token": "t1",
                    "refreshToken": "r1",
                },
            })
            .to_string()
        });

        let app = Router::new()
            .route("/api/v1/resource/{name}", resource)
            .route("/api/v1/auth/refresh", refresh_route)
            .route("/api/v1/auth/login", login);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, state })
    }

    /// Base URL to hand to the gateway config.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Number of `POST /auth/refresh` calls received so far.
    pub fn refresh_calls(&self) -> u32 {
        self.state.refresh_calls.load(Ordering::Relaxed)
    }

    /// All resource arrivals, in the order the backend saw them.
    pub fn hits(&self) -> Vec<ResourceHit> {
        self.state.hits.lock().clone()
    }

    /// Resource arrival names carrying the given bearer token, in order.
    pub fn hits_with_bearer(&self, token: &str) -> Vec<String> {
        self.hits()
            .into_iter()
            .filter(|h| h.bearer.as_deref() == Some(token))
            .map(|h| h.name)
            .collect()
    }

    /// Change which access token the resource route honors.
    pub fn set_valid_token(&self, token: &str) {
        *self.state.valid_token.lock() = token.to_owned();
    }

    /// Hold every in-flight and future refresh call open until released.
    pub fn hold_refresh(&self) {
        let _ = self.state.hold_tx.send(true);
    }

    /// Release held refresh calls.
    pub fn release_refresh(&self) {
        let _ = self.state.hold_tx.send(false);
    }
}

/// Poll `predicate` until it holds or the deadline passes.
pub async fn wait_for(predicate: impl Fn() -> bool, what: &str) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate() {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
