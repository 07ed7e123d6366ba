// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store and session lifecycle.
//!
//! Holds the current token pair behind a single-writer discipline: only
//! the gateway's rotation path and the auth endpoints install or clear
//! credentials; request dispatch reads only. Every install or clear
//! bumps an epoch counter, which is how a request that failed with an
//! old token can tell "the pair I used has already been replaced" from
//! "I am the first to notice it expired".

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The current access/refresh token pair.
///
/// Field names match the backend wire format (`accessToken` /
/// `refreshToken`), which is also the persistence format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session lifecycle events broadcast to the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session is gone: credentials were cleared after a logout or
    /// an unrecoverable rotation failure. Emitted once per session.
    Ended,
}

struct Inner {
    pair: Option<CredentialPair>,
    /// Bumped on every install and clear.
    epoch: u64,
}

/// Credential store shared by all requests going through one gateway.
pub struct SessionStore {
    inner: RwLock<Inner>,
    persist_path: Option<PathBuf>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create a store with no persistence (tests, throwaway sessions).
    pub fn in_memory() -> (Arc<Self>, broadcast::Receiver<SessionEvent>) {
        Self::new(None)
    }

    /// Create a store backed by a credentials file. An existing pair on
    /// disk is loaded as the current session; a damaged file is ignored
    /// with a warning rather than failing startup.
    pub fn with_persistence(path: PathBuf) -> (Arc<Self>, broadcast::Receiver<SessionEvent>) {
        Self::new(Some(path))
    }

    fn new(persist_path: Option<PathBuf>) -> (Arc<Self>, broadcast::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = broadcast::channel(16);
        let pair = match persist_path.as_deref() {
            Some(path) => match crate::persist::load(path) {
                Ok(Some(pair)) => {
                    info!(path = %path.display(), "loaded persisted session");
                    Some(pair)
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "ignoring unreadable credentials file");
                    None
                }
            },
            None => None,
        };
        let store = Arc::new(Self {
            inner: RwLock::new(Inner { pair, epoch: 0 }),
            persist_path,
            event_tx,
        });
        (store, event_rx)
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// The current access token and the epoch it belongs to.
    pub fn current(&self) -> (Option<String>, u64) {
        let inner = self.inner.read();
        (inner.pair.as_ref().map(|p| p.access_token.clone()), inner.epoch)
    }

    /// The current refresh token, if a session exists.
    pub fn refresh_token(&self) -> Option<String> {
        self.inner.read().pair.as_ref().map(|p| p.refresh_token.clone())
    }

    /// The current epoch. Changes whenever the pair is installed or cleared.
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Whether a session is currently established.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().pair.is_some()
    }

    /// Install a new pair, replacing any current one. The swap is atomic:
    /// no reader ever observes a half-updated pair.
    pub fn install(&self, pair: CredentialPair) {
        {
            let mut inner = self.inner.write();
            inner.pair = Some(pair.clone());
            inner.epoch += 1;
            debug!(epoch = inner.epoch, "credential pair installed");
        }
        if let Some(ref path) = self.persist_path {
            if let Err(e) = crate::persist::save(path, &pair) {
                warn!(path = %path.display(), err = %e, "failed to persist credentials");
            }
        }
    }

    /// Tear the session down: clear both tokens and broadcast
    /// [`SessionEvent::Ended`]. Idempotent — a second call before the
    /// next install is a no-op and emits nothing.
    ///
    /// Returns whether a session was actually ended.
    pub fn end_session(&self) -> bool {
        {
            let mut inner = self.inner.write();
            if inner.pair.is_none() {
                return false;
            }
            inner.pair = None;
            inner.epoch += 1;
        }
        if let Some(ref path) = self.persist_path {
            if let Err(e) = crate::persist::clear(path) {
                warn!(path = %path.display(), err = %e, "failed to clear persisted credentials");
            }
        }
        info!("session ended");
        let _ = self.event_tx.send(SessionEvent::Ended);
        true
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
