// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`AuthError`] is what the client sees. Every verification failure
//! collapses to [`AuthError::InvalidToken`] so a caller cannot tell which
//! check rejected the token; the specific reason travels in [`VerifyError`]
//! and only reaches the server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Client-facing authentication and authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header, or it does not carry a bearer token.
    #[error("Missing bearer token")]
    MissingToken,
    /// The token failed verification for any reason.
    #[error("Invalid token")]
    InvalidToken,
    /// A guard ran without an identity on the request. Indicates a layer
    /// ordering bug, not a client mistake.
    #[error("Missing user context")]
    MissingUserContext,
    /// Verified identity lacks the required role or ownership.
    #[error("Forbidden")]
    Forbidden,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::MissingUserContext => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

/// Reasons a token was rejected. Server-side only.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("no key in the key set matches kid {0:?}")]
    NoMatchingKey(Option<String>),
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token algorithm does not match the key")]
    AlgorithmMismatch,
    #[error("token is missing required claim `{0}`")]
    MissingClaim(String),
    #[error("key set unavailable: {0}")]
    KeySet(#[from] KeySetError),
    #[error("claim has an unsupported shape: {0}")]
    ClaimShape(#[from] ClaimShapeError),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
            ErrorKind::InvalidIssuer => VerifyError::InvalidIssuer,
            ErrorKind::InvalidAudience => VerifyError::InvalidAudience,
            ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
            ErrorKind::InvalidAlgorithm => VerifyError::AlgorithmMismatch,
            ErrorKind::MissingRequiredClaim(claim) => VerifyError::MissingClaim(claim.clone()),
            _ => VerifyError::Malformed(e.to_string()),
        }
    }
}

impl From<VerifyError> for AuthError {
    fn from(_: VerifyError) -> Self {
        AuthError::InvalidToken
    }
}

/// Failures while fetching or decoding a remote key set.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("request to {uri} failed: {source}")]
    Transport {
        uri: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} from {uri}")]
    Status { uri: String, status: u16 },
    #[error("key set document from {uri} is too large ({size} bytes)")]
    TooLarge { uri: String, size: u64 },
    #[error("key set document from {uri} is not valid JWKS: {reason}")]
    Decode { uri: String, reason: String },
}

/// A role-bearing claim arrived in a shape that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimShapeError {
    #[error("claim `{claim}` must be a string or a list of strings, got {found}")]
    NotStringOrList { claim: &'static str, found: &'static str },
    #[error("claim `{claim}` contains a non-string entry")]
    NonStringEntry { claim: &'static str },
    #[error("claim `{claim}` must be a string, got {found}")]
    NotString { claim: &'static str, found: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AuthError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_token_returns_401() {
        let (status, body) = body_of(AuthError::MissingToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, r#"{"error":"Missing bearer token"}"#);
    }

    #[tokio::test]
    async fn invalid_token_returns_401() {
        let (status, body) = body_of(AuthError::InvalidToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, r#"{"error":"Invalid token"}"#);
    }

    #[tokio::test]
    async fn missing_user_context_returns_401() {
        let (status, body) = body_of(AuthError::MissingUserContext).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, r#"{"error":"Missing user context"}"#);
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let (status, body) = body_of(AuthError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, r#"{"error":"Forbidden"}"#);
    }

    #[test]
    fn every_verify_error_collapses_to_invalid_token() {
        let reasons = vec![
            VerifyError::InvalidSignature,
            VerifyError::InvalidIssuer,
            VerifyError::InvalidAudience,
            VerifyError::Expired,
            VerifyError::NoMatchingKey(Some("kid-1".into())),
            VerifyError::ClaimShape(ClaimShapeError::NonStringEntry {
                claim: "cognito:groups",
            }),
        ];
        for reason in reasons {
            assert_eq!(AuthError::from(reason), AuthError::InvalidToken);
        }
    }
}
