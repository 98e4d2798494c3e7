// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use rbac_users_server::{
    api::router,
    auth::Authenticator,
    config::{AppConfig, AuthMode},
    logging,
    state::AppState,
    store::InMemoryStore,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_from_env();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let auth = match &config.auth_mode {
        AuthMode::Strict(verifier) => {
            tracing::info!(
                issuer = %verifier.issuer,
                audience = %verifier.audience,
                jwks_uri = %verifier.jwks_uri,
                "Strict token verification enabled"
            );
            match Authenticator::strict(
                verifier.settings(),
                verifier.jwks_fetch_timeout,
                verifier.jwks_cache_ttl,
            ) {
                Ok(auth) => auth,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build JWKS client");
                    return ExitCode::FAILURE;
                }
            }
        }
        AuthMode::DevelopmentBypass => {
            tracing::warn!("AUTH_MODE=development-bypass: bearer tokens are NOT verified");
            Authenticator::DevelopmentBypass
        }
    };

    let state = AppState::new(InMemoryStore::new(), auth);
    let app = router(state, &config.cors_origins);

    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(addr = %config.addr, env = ?config.app_env, "RBAC users server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
