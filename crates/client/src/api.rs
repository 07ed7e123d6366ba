// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed endpoint surface over the gateway.
//!
//! Thin wrappers for the backend routes the client actually uses:
//! authentication, the course catalog, and enrollments. Everything goes
//! through [`Gateway::send`] and therefore inherits token attachment
//! and session recovery; login and register use the unauthenticated
//! path since a 401 there means bad credentials, not an expired session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::request::ApiRequest;
use crate::session::CredentialPair;

/// A user profile as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A catalog course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// One enrollment row, optionally with its course expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub course: Option<Course>,
}

/// Registration payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Catalog listing filters, all optional.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `{ user, token, refreshToken }` payload from login/register.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthGrant {
    user: User,
    token: String,
    refresh_token: String,
}

impl Gateway {
    /// Log in and establish a session. The returned pair is installed
    /// into the credential store (and persisted when configured).
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let req = ApiRequest::post("/auth/login")
            .json(serde_json::json!({ "email": email, "password": password }));
        let resp = self.send_unauthenticated(req).await?;
        let grant: AuthGrant = resp.data_as()?;
        self.session().install(CredentialPair {
            access_token: grant.token,
            refresh_token: grant.refresh_token,
        });
        Ok(grant.user)
    }

    /// Register a new account. Like login, a successful registration
    /// establishes a session immediately.
    pub async fn register(&self, new_user: &NewUser) -> Result<User, ApiError> {
        let body = serde_json::to_value(new_user)
            .map_err(|e| ApiError::Other { message: format!("unencodable payload: {e}") })?;
        let resp = self.send_unauthenticated(ApiRequest::post("/auth/register").json(body)).await?;
        let grant: AuthGrant = resp.data_as()?;
        self.session().install(CredentialPair {
            access_token: grant.token,
            refresh_token: grant.refresh_token,
        });
        Ok(grant.user)
    }

    /// Log out: tell the backend (best effort), then tear the local
    /// session down. Teardown happens even when the network call fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.session().is_authenticated() {
            if let Err(e) = self.send(ApiRequest::post("/auth/logout")).await {
                tracing::debug!(err = %e, "backend logout failed, ending session locally");
            }
        }
        self.session().end_session();
        Ok(())
    }

    /// Fetch the current user's profile.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.send(ApiRequest::get("/auth/me")).await?.data_as()
    }

    /// Update profile fields (partial update, camelCase keys).
    pub async fn update_profile(&self, fields: Value) -> Result<User, ApiError> {
        self.send(ApiRequest::put("/auth/update-profile").json(fields)).await?.data_as()
    }

    /// Change the account password.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::put("/auth/change-password").json(serde_json::json!({
            "currentPassword": current,
            "newPassword": new,
        })))
        .await?;
        Ok(())
    }

    /// List catalog courses with optional filters.
    pub async fn courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, ApiError> {
        let mut req = ApiRequest::get("/courses");
        if let Some(ref search) = filter.search {
            req = req.query("search", search.clone());
        }
        if let Some(ref category) = filter.category {
            req = req.query("category", category.clone());
        }
        if let Some(ref level) = filter.level {
            req = req.query("level", level.clone());
        }
        if let Some(page) = filter.page {
            req = req.query("page", page.to_string());
        }
        if let Some(limit) = filter.limit {
            req = req.query("limit", limit.to_string());
        }
        let resp = self.send(req).await?;
        // The listing endpoint nests under data.courses alongside
        // pagination; tolerate a bare array too.
        let data = resp.data();
        let courses = data.get("courses").unwrap_or(data);
        serde_json::from_value(courses.clone())
            .map_err(|e| ApiError::Other { message: format!("unexpected course list shape: {e}") })
    }

    /// Fetch one course by id.
    pub async fn course(&self, id: i64) -> Result<Course, ApiError> {
        self.send(ApiRequest::get(format!("/courses/{id}"))).await?.data_as()
    }

    /// Enroll the current user in a course.
    pub async fn enroll(&self, course_id: i64) -> Result<Enrollment, ApiError> {
        self.send(ApiRequest::post("/enrollments").json(serde_json::json!({
            "courseId": course_id,
        })))
        .await?
        .data_as()
    }

    /// List the current user's enrollments.
    pub async fn my_courses(&self) -> Result<Vec<Enrollment>, ApiError> {
        self.send(ApiRequest::get("/enrollments/my-courses")).await?.data_as()
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
