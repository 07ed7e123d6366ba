// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request descriptors and response envelopes.
//!
//! An [`ApiRequest`] describes one call against the configured base URL.
//! Descriptors are `Clone` because a request that hits an expired
//! session is re-dispatched after the token rotation settles.

use reqwest::Method;
use serde_json::Value;

/// Description of a single API request, relative to the base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`, e.g. `/courses`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful response: status plus the decoded JSON body.
///
/// The backend wraps payloads in `{ "success": bool, "message": str,
/// "data": ... }`; the accessors below unwrap that envelope without
/// failing on endpoints that answer with a bare body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// The `data` field of the envelope, or the whole body when the
    /// response isn't enveloped.
    pub fn data(&self) -> &Value {
        match self.body.get("data") {
            Some(data) => data,
            None => &self.body,
        }
    }

    /// The envelope `message`, if any.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Deserialize the `data` field into a typed payload.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, crate::error::ApiError> {
        serde_json::from_value(self.data().clone()).map_err(|e| crate::error::ApiError::Other {
            message: format!("unexpected response shape: {e}"),
        })
    }
}

/// Pull the envelope `message` out of an error body, falling back to the
/// raw text when the body isn't the standard envelope.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => v
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| body.to_owned()),
        Err(_) => body.to_owned(),
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
