// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{require_auth, require_role, require_self_or_role, RoleGuard, ADMIN_ROLE},
    config::CorsOrigins,
    state::AppState,
};

pub mod health;
pub mod users;

pub fn router(state: AppState, cors: &CorsOrigins) -> Router {
    let admin_only = from_fn_with_state(RoleGuard::new([ADMIN_ROLE]), require_role);
    let self_or_admin = from_fn_with_state(RoleGuard::new([ADMIN_ROLE]), require_self_or_role);

    let api_routes = Router::new()
        .route(
            "/users",
            get(users::list_users)
                .post(users::create_user)
                .route_layer(admin_only.clone()),
        )
        .route("/users/me", get(users::get_current_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .route_layer(self_or_admin)
                .merge(delete(users::delete_user).route_layer(admin_only)),
        )
        // Applied after the guards so it runs before them.
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(cors))
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(parsed))
        }
    }
}
