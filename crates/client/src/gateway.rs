// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session-aware request gateway.
//!
//! Dispatches [`ApiRequest`]s with the current access token attached and
//! recovers expired sessions through a single-flight token rotation:
//! the first request to fail with a 401 performs the one
//! `POST /auth/refresh` call; requests failing while that call is in
//! flight are parked in a queue and replayed (or rejected together)
//! when it settles. A replay that fails 401 again never chains into a
//! second rotation — it surfaces as session-expired and tears the
//! session down.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::{classify_status, classify_transport, ApiError};
use crate::request::{error_message, ApiRequest, ApiResponse};
use crate::session::{CredentialPair, SessionEvent, SessionStore};

/// A request that hit a 401 while a rotation was already in flight.
/// Held until the rotation settles, then replayed or rejected; the
/// outcome travels back through `done`.
struct PendingReplay {
    request: ApiRequest,
    done: oneshot::Sender<Result<ApiResponse, ApiError>>,
}

/// Rotation coordinator state. The queue exists only while a rotation
/// is in flight and is drained in full when it settles.
enum RefreshState {
    Idle,
    Refreshing { queue: Vec<PendingReplay> },
}

/// What a 401'd request should do, decided in one critical section.
enum Recovery {
    /// The pair this request sent has already been replaced (or cleared);
    /// replay with whatever is current now.
    Settled,
    /// A rotation is in flight; wait for its outcome.
    Parked(oneshot::Receiver<Result<ApiResponse, ApiError>>),
    /// This request is first: perform the one rotation.
    Lead,
}

/// Gateway between application code and the EduHub REST backend.
pub struct Gateway {
    config: GatewayConfig,
    http: reqwest::Client,
    session: Arc<SessionStore>,
    refresh: Mutex<RefreshState>,
}

impl Gateway {
    /// Build a gateway over an injected credential store.
    pub fn new(config: GatewayConfig, session: Arc<SessionStore>) -> Arc<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();
        Arc::new(Self { config, http, session, refresh: Mutex::new(RefreshState::Idle) })
    }

    /// The credential store this gateway reads from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Send a request, attaching the current access token when one is
    /// stored. A first-pass 401 is recovered by rotating the pair and
    /// replaying exactly once; every other failure surfaces classified.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (token, epoch) = self.session.current();
        match self.dispatch(&request, token.as_deref()).await {
            Err(e) if e.is_recoverable_unauthorized() => self.recover(request, epoch).await,
            other => other,
        }
    }

    /// Send without credentials and without session recovery. Used by
    /// the auth endpoints themselves (login, register), where a 401
    /// means bad credentials, not an expired session.
    pub async fn send_unauthenticated(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatch(&request, None).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Issue one HTTP call. Never retries.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let mut req = self.http.request(request.method.clone(), self.url(&request.path));
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| classify_transport(&e))?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| classify_transport(&e))?;

        if !(200..300).contains(&status) {
            return Err(classify_status(status, error_message(&text)));
        }
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| ApiError::Other { message: format!("invalid JSON response: {e}") })?
        };
        Ok(ApiResponse { status, body })
    }

    /// Entry point for a request whose dispatch came back 401.
    ///
    /// The role decision and every queue mutation happen inside one
    /// synchronous critical section — nothing is awaited between
    /// checking the coordinator state and transitioning it, so two
    /// racing 401s can never both start a rotation.
    async fn recover(&self, request: ApiRequest, sent_epoch: u64) -> Result<ApiResponse, ApiError> {
        let recovery = {
            let mut state = self.refresh.lock();
            if self.session.epoch() != sent_epoch {
                Recovery::Settled
            } else if let RefreshState::Refreshing { queue } = &mut *state {
                let (tx, rx) = oneshot::channel();
                queue.push(PendingReplay { request: request.clone(), done: tx });
                debug!(queued = queue.len(), "request parked behind in-flight rotation");
                Recovery::Parked(rx)
            } else {
                *state = RefreshState::Refreshing { queue: Vec::new() };
                Recovery::Lead
            }
        };

        match recovery {
            Recovery::Settled => self.replay(request).await,
            Recovery::Parked(rx) => rx.await.unwrap_or_else(|_| Err(ApiError::session_expired())),
            Recovery::Lead => self.lead_rotation(request).await,
        }
    }

    /// Perform the one rotation for this chain, then settle the queue.
    async fn lead_rotation(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let outcome = match self.session.refresh_token() {
            Some(refresh_token) => self.rotate(&refresh_token).await,
            // 401 with nothing to rotate: the session is simply gone.
            None => Err(ApiError::session_expired()),
        };

        match outcome {
            Ok(pair) => {
                // Install the new pair and drain the queue in the same
                // critical section: a late 401 from the old pair must
                // observe either `Refreshing` or the bumped epoch,
                // never a gap between them.
                let queue = {
                    let mut state = self.refresh.lock();
                    self.session.install(pair);
                    match std::mem::replace(&mut *state, RefreshState::Idle) {
                        RefreshState::Refreshing { queue } => queue,
                        RefreshState::Idle => Vec::new(),
                    }
                };
                info!(replaying = queue.len() + 1, "credential pair rotated");

                // Replay in arrival order: the triggering request first,
                // then the parked queue. `join` and `join_all` poll in
                // order, so dispatch starts FIFO even though the calls
                // complete concurrently.
                let own = self.replay(request);
                let parked = queue.into_iter().map(|pending| async move {
                    let result = self.replay(pending.request).await;
                    let _ = pending.done.send(result);
                });
                let (own_result, ()) = futures_util::future::join(
                    own,
                    async { futures_util::future::join_all(parked).await; },
                )
                .await;
                own_result
            }
            Err(err) => {
                let queue = {
                    let mut state = self.refresh.lock();
                    self.session.end_session();
                    match std::mem::replace(&mut *state, RefreshState::Idle) {
                        RefreshState::Refreshing { queue } => queue,
                        RefreshState::Idle => Vec::new(),
                    }
                };
                warn!(rejected = queue.len() + 1, err = %err, "token rotation failed, session ended");
                for pending in queue {
                    let _ = pending.done.send(Err(ApiError::session_expired()));
                }
                Err(ApiError::session_expired())
            }
        }
    }

    /// Re-dispatch a request once with the now-current token. A second
    /// 401 here is terminal: surface it and end the session.
    async fn replay(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (token, _) = self.session.current();
        match self.dispatch(&request, token.as_deref()).await {
            Err(e) if e.is_recoverable_unauthorized() => {
                self.session.end_session();
                Err(ApiError::session_expired())
            }
            other => other,
        }
    }

    /// The one `POST /auth/refresh` call. Any failure is terminal for
    /// the chain — rotation itself is never retried.
    async fn rotate(&self, refresh_token: &str) -> Result<CredentialPair, ApiError> {
        debug!("rotating credential pair");
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let resp = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| classify_transport(&e))?;
        if !(200..300).contains(&status) {
            return Err(classify_status(status, error_message(&text)));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::Other { message: format!("invalid refresh response: {e}") })?;
        let data = body.get("data").unwrap_or(&body);
        let access = data.get("token").and_then(Value::as_str).unwrap_or_default();
        let refresh = data.get("refreshToken").and_then(Value::as_str).unwrap_or_default();
        if access.is_empty() || refresh.is_empty() {
            // A partial pair would leave two tokens half-current; treat
            // it as a failed rotation.
            return Err(ApiError::Other {
                message: "refresh response missing token pair".to_owned(),
            });
        }
        Ok(CredentialPair { access_token: access.to_owned(), refresh_token: refresh.to_owned() })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
