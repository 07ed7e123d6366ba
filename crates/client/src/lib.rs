// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! EduHub API client: session-aware request gateway for the EduHub backend.
//!
//! The gateway attaches the current access token to outgoing requests,
//! classifies failures, and recovers expired sessions by rotating the
//! token pair through `POST /auth/refresh` — at most one refresh call in
//! flight no matter how many requests fail at once. Requests that hit a
//! 401 while a rotation is underway are parked and replayed once it
//! settles. An unrecoverable rotation ends the session: stored
//! credentials are cleared and a single [`session::SessionEvent::Ended`]
//! is broadcast for the application shell to act on.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod persist;
pub mod request;
pub mod session;
