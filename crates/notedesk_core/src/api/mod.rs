//! Framework-agnostic route handlers.
//!
//! # Responsibility
//! - Turn caller identity, path parameters and raw JSON bodies into façade calls.
//! - Map every failure to a status code and a `{"error": ...}` body.
//!
//! # Invariants
//! - No identity is always 401, before any store access.
//! - Unexpected failures never leak details to the caller; they are logged.

use crate::repo::RepoError;
use log::error;
use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod documents;

/// Status code plus JSON body, ready for any HTTP framework to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Serializes `payload` as the response body.
    pub fn json(status: u16, payload: &impl Serialize) -> Result<Self, ApiError> {
        let body = serde_json::to_value(payload)
            .map_err(|err| ApiError::Internal(format!("response serialization failed: {err}")))?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Route-level failure taxonomy.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    UserNotFound,
    /// Unknown, malformed or otherwise unreadable document id.
    DocumentNotFound,
    Forbidden,
    Validation(String),
    /// Store or serialization failure. The message is logged, never returned.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::UserNotFound | Self::DocumentNotFound => 404,
            Self::Forbidden => 403,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn public_message(&self) -> &str {
        match self {
            Self::Unauthenticated => "Unauthorized",
            Self::UserNotFound => "User not found",
            Self::DocumentNotFound => "Document not found",
            Self::Forbidden => "Forbidden",
            Self::Validation(message) => message.as_str(),
            Self::Internal(_) => "Internal server error",
        }
    }

    pub fn into_response(self) -> ApiResponse {
        ApiResponse {
            status: self.status(),
            body: json!({ "error": self.public_message() }),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(message) => write!(f, "internal error: {message}"),
            other => write!(f, "{}", other.public_message()),
        }
    }
}

impl Error for ApiError {}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Internal(value.to_string())
    }
}

/// Collapses a handler result into a response, logging internal failures.
pub(crate) fn respond(route: &str, result: Result<ApiResponse, ApiError>) -> ApiResponse {
    match result {
        Ok(response) => response,
        Err(err) => {
            if let ApiError::Internal(message) = &err {
                error!(
                    "event=route_failed module=api status=error route={route} error={}",
                    crate::logging::sanitize_message(message, 200)
                );
            }
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{respond, ApiError, ApiResponse};
    use crate::repo::{EntityKind, RepoError};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ApiError::Unauthenticated.status(), 401);
        assert_eq!(ApiError::UserNotFound.status(), 404);
        assert_eq!(ApiError::DocumentNotFound.status(), 404);
        assert_eq!(ApiError::Forbidden.status(), 403);
        assert_eq!(ApiError::Validation("bad".to_string()).status(), 400);
        assert_eq!(ApiError::Internal("boom".to_string()).status(), 500);
    }

    #[test]
    fn internal_error_hides_details() {
        let err = ApiError::from(RepoError::NotFound {
            entity: EntityKind::Document,
            id: Uuid::nil(),
        });
        let response = respond("test", Err(err));
        assert_eq!(response.status, 500);
        assert_eq!(response.body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn validation_message_is_returned() {
        let response = ApiError::Validation("Title is required".to_string()).into_response();
        assert_eq!(response.status, 400);
        assert_eq!(response.body, json!({ "error": "Title is required" }));
        assert!(!response.is_success());
    }

    #[test]
    fn json_response_serializes_payload() {
        let response = ApiResponse::json(200, &json!({ "success": true })).unwrap();
        assert!(response.is_success());
        assert_eq!(response.body["success"], true);
    }
}
