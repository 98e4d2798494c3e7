// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access-control guards.
//!
//! Two policies sit behind `require_auth`:
//!
//! - [`require_role`]: the identity must hold at least one allowed role.
//! - [`require_self_or_role`]: the path id equals the identity's subject,
//!   or the role check passes. Self-access is checked first.
//!
//! Both report a missing identity as [`AuthError::MissingUserContext`],
//! never as [`AuthError::Forbidden`].
//!
//! ```rust,ignore
//! let admin = from_fn_with_state(RoleGuard::new([ADMIN_ROLE]), require_role);
//! let owner_or_admin = from_fn_with_state(RoleGuard::new([ADMIN_ROLE]), require_self_or_role);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedUser};

/// Path parameter compared against the subject for self-access.
pub const DEFAULT_ID_PARAM: &str = "id";

/// Allowed roles for a guarded route.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Arc<BTreeSet<String>>,
    id_param: &'static str,
}

impl RoleGuard {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Arc::new(allowed.into_iter().map(Into::into).collect()),
            id_param: DEFAULT_ID_PARAM,
        }
    }

    /// Use another path parameter as the resource id.
    pub fn with_id_param(mut self, name: &'static str) -> Self {
        self.id_param = name;
        self
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Permit when the identity holds one of the allowed roles.
    pub fn check_role(&self, user: Option<&AuthenticatedUser>) -> Result<(), AuthError> {
        let user = user.ok_or(AuthError::MissingUserContext)?;
        if user.has_any_role(self.allowed.iter()) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Permit when `resource_id` is the identity's own subject, or when the
    /// role check passes.
    pub fn check_self_or_role(
        &self,
        user: Option<&AuthenticatedUser>,
        resource_id: Option<&str>,
    ) -> Result<(), AuthError> {
        let identity = user.ok_or(AuthError::MissingUserContext)?;
        if resource_id == Some(identity.user_id.as_str()) {
            return Ok(());
        }
        self.check_role(user)
    }
}

/// Middleware enforcing [`RoleGuard::check_role`].
pub async fn require_role(State(guard): State<RoleGuard>, request: Request, next: Next) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>();
    if let Err(e) = guard.check_role(user) {
        return reject(e, &request, &guard);
    }
    next.run(request).await
}

/// Middleware enforcing [`RoleGuard::check_self_or_role`].
pub async fn require_self_or_role(
    State(guard): State<RoleGuard>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>();
    let resource_id = params.get(guard.id_param).map(String::as_str);
    if let Err(e) = guard.check_self_or_role(user, resource_id) {
        return reject(e, &request, &guard);
    }
    next.run(request).await
}

fn reject(error: AuthError, request: &Request, guard: &RoleGuard) -> Response {
    match error {
        AuthError::MissingUserContext => tracing::error!(
            path = %request.uri().path(),
            "Guard ran without an authenticated user; require_auth must be layered first"
        ),
        _ => tracing::debug!(
            path = %request.uri().path(),
            allowed = ?guard.allowed,
            "Access denied"
        ),
    }
    error.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::ADMIN_ROLE;
    use crate::auth::RoleSet;

    fn user(id: &str, roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: id.to_string(),
            roles: roles.iter().copied().collect::<RoleSet>(),
            scope: None,
            issuer: None,
            expires_at: None,
        }
    }

    #[test]
    fn admin_passes_admin_guard() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(guard.check_role(Some(&user("u1", &["admin"]))), Ok(()));
    }

    #[test]
    fn user_fails_admin_guard() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(
            guard.check_role(Some(&user("u1", &["user"]))),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn any_allowed_role_is_enough() {
        let guard = RoleGuard::new(["admin", "editor"]);
        assert_eq!(guard.check_role(Some(&user("u1", &["user", "editor"]))), Ok(()));
    }

    #[test]
    fn missing_identity_is_not_forbidden() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(guard.check_role(None), Err(AuthError::MissingUserContext));
        assert_eq!(
            guard.check_self_or_role(None, Some("u1")),
            Err(AuthError::MissingUserContext)
        );
    }

    #[test]
    fn self_access_needs_no_roles() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(guard.check_self_or_role(Some(&user("U1", &[])), Some("U1")), Ok(()));
    }

    #[test]
    fn other_resource_without_role_is_forbidden() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(
            guard.check_self_or_role(Some(&user("U1", &["user"])), Some("U2")),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn role_grants_access_to_other_resources() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(
            guard.check_self_or_role(Some(&user("U1", &["admin"])), Some("U2")),
            Ok(())
        );
    }

    #[test]
    fn self_match_is_exact() {
        let guard = RoleGuard::new([ADMIN_ROLE]);
        assert_eq!(
            guard.check_self_or_role(Some(&user("u1", &[])), Some("U1")),
            Err(AuthError::Forbidden)
        );
        assert_eq!(
            guard.check_self_or_role(Some(&user("u1", &[])), None),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn custom_id_param() {
        let guard = RoleGuard::new([ADMIN_ROLE]).with_id_param("user_id");
        assert_eq!(guard.id_param, "user_id");
        assert_eq!(guard.allowed().collect::<Vec<_>>(), vec!["admin"]);
    }
}
