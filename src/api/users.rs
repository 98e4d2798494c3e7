// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! Access control is applied by the router: these handlers assume the
//! request already passed `require_auth` and the route's guard.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    auth::{Auth, AuthError, AuthenticatedUser, RoleSet},
    error::{ApiError, JsonBody},
    models::{CreateUserRequest, UpdateUserRequest, User},
    state::AppState,
};

/// Response for GET /api/users/me
#[derive(Debug, Serialize)]
pub struct UserMeResponse {
    /// Subject of the verified token.
    pub user_id: String,
    /// Normalized roles.
    pub roles: RoleSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            roles: user.roles,
            scope: user.scope,
        }
    }
}

/// Get the current authenticated identity.
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    let store = state.store.read().await;
    Json(store.list_users())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let store = state.store.read().await;
    store
        .get_user(&user_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn create_user(
    State(state): State<AppState>,
    Auth(actor): Auth,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    request.validate()?;

    let mut store = state.store.write().await;
    let user = store.create_user(request)?;
    tracing::info!(user_id = %user.id, actor = %actor.user_id, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Partial update, shared by PUT and PATCH.
///
/// Only admins may change a stored role; a non-admin editing their own
/// record with a different role is refused.
pub async fn update_user(
    State(state): State<AppState>,
    Auth(actor): Auth,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    request.validate()?;

    let mut store = state.store.write().await;
    let existing = store
        .get_user(&user_id)
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(role) = request.role {
        if role != existing.role && !actor.is_admin() {
            tracing::debug!(
                user_id = %user_id,
                actor = %actor.user_id,
                requested = %role,
                "Role change refused for non-admin"
            );
            return Err(AuthError::Forbidden.into());
        }
    }

    let user = store.update_user(&user_id, request)?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Auth(actor): Auth,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store.delete_user(&user_id)?;
    tracing::info!(user_id = %user_id, actor = %actor.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
