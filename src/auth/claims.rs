// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims, role normalization, and the authenticated user representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ClaimShapeError;
use super::roles::RoleSet;

/// Claim carrying explicit roles.
pub const ROLES_CLAIM: &str = "roles";
/// Claim carrying group membership (Cognito style).
pub const GROUPS_CLAIM: &str = "cognito:groups";
/// OAuth scope claim, space separated.
pub const SCOPE_CLAIM: &str = "scope";

/// Claims decoded from a verified token.
///
/// The role-bearing claims are kept as raw JSON because identity providers
/// disagree on their shape; [`normalize_roles`] turns them into a
/// [`RoleSet`]. Issuer, audience and expiry are checked by `jsonwebtoken`
/// before this struct is produced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: Option<i64>,

    /// Space separated OAuth scopes
    #[serde(default)]
    pub scope: Option<Value>,

    /// Explicit role list
    #[serde(default)]
    pub roles: Option<Value>,

    /// Group membership: list or comma separated string
    #[serde(default, rename = "cognito:groups")]
    pub groups: Option<Value>,
}

/// Union the roles carried by `roles`, `cognito:groups` and `scope`.
///
/// - `roles` counts only when it is a list; string entries are taken and
///   anything else in it is ignored.
/// - `cognito:groups` may be a list of strings or a comma separated string.
///   Any other shape is rejected.
/// - `scope` is split on whitespace and every token becomes a role. A
///   non-string scope is rejected.
///
/// No role claims at all is not an error and yields an empty set.
pub fn normalize_roles(claims: &TokenClaims) -> Result<RoleSet, ClaimShapeError> {
    let mut roles = RoleSet::new();

    if let Some(Value::Array(entries)) = &claims.roles {
        roles.extend(entries.iter().filter_map(Value::as_str));
    }

    match &claims.groups {
        None | Some(Value::Null) => {}
        Some(Value::String(joined)) => roles.extend(joined.split(',').map(str::trim)),
        Some(Value::Array(entries)) => {
            for entry in entries {
                let group = entry.as_str().ok_or(ClaimShapeError::NonStringEntry {
                    claim: GROUPS_CLAIM,
                })?;
                roles.insert(group.trim());
            }
        }
        Some(other) => {
            return Err(ClaimShapeError::NotStringOrList {
                claim: GROUPS_CLAIM,
                found: json_kind(other),
            })
        }
    }

    match &claims.scope {
        None | Some(Value::Null) => {}
        Some(Value::String(scopes)) => roles.extend(scopes.split_whitespace()),
        Some(other) => {
            return Err(ClaimShapeError::NotString {
                claim: SCOPE_CLAIM,
                found: json_kind(other),
            })
        }
    }

    Ok(roles)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Authenticated user information extracted from a verified token.
///
/// Lives in the request extensions for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Normalized roles
    pub roles: RoleSet,

    /// Raw scope string (if present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Issuer
    #[serde(skip)]
    pub issuer: Option<String>,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: Option<i64>,
}

impl AuthenticatedUser {
    /// Build from verified claims, normalizing roles.
    pub fn from_claims(claims: TokenClaims) -> Result<Self, ClaimShapeError> {
        let roles = normalize_roles(&claims)?;
        let scope = claims.scope.as_ref().and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            user_id: claims.sub,
            roles,
            scope,
            issuer: claims.iss,
            expires_at: claims.exp,
        })
    }

    /// Synthetic identity used by the development bypass mode.
    pub fn development() -> Self {
        Self {
            user_id: "dev".to_string(),
            roles: [super::roles::USER_ROLE].into_iter().collect(),
            scope: Some("user".to_string()),
            issuer: None,
            expires_at: None,
        }
    }

    pub fn has_any_role<'a, I>(&self, allowed: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.roles.intersects(allowed)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }
}
