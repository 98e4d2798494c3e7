// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers mounted behind `require_auth`:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser};

/// Extractor for the identity attached by `require_auth`.
///
/// Rejects with [`AuthError::MissingUserContext`] when no identity is
/// present, which means the handler was mounted without the auth layer.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_context(parts).cloned().map(Auth)
    }
}

/// Borrow the identity from request parts, logging a pipeline error if absent.
pub fn user_context(parts: &Parts) -> Result<&AuthenticatedUser, AuthError> {
    parts.extensions.get::<AuthenticatedUser>().ok_or_else(|| {
        tracing::error!(
            path = %parts.uri.path(),
            "No authenticated user on request; auth layer missing or misordered"
        );
        AuthError::MissingUserContext
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleSet;
    use axum::http::Request;

    fn parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn missing_identity_is_missing_user_context() {
        let mut parts = parts();
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingUserContext)));
    }

    #[tokio::test]
    async fn reads_identity_from_extensions() {
        let mut parts = parts();
        let user = AuthenticatedUser {
            user_id: "user_from_middleware".to_string(),
            roles: RoleSet::from_iter(["admin"]),
            scope: None,
            issuer: None,
            expires_at: None,
        };
        parts.extensions.insert(user.clone());

        let Auth(found) = Auth::from_request_parts(&mut parts, &())
            .await
            .expect("identity present");
        assert_eq!(found, user);
    }
}
