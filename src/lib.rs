// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RBAC Users Server
//!
//! A users CRUD backend guarded by bearer JWT authentication. Tokens are
//! verified against a remote JWKS, roles are normalized from several claim
//! shapes, and route guards enforce role or self-access policies.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - JWKS cache, token verification, role guards
//! - `config` - Environment configuration
//! - `logging` - Tracing subscriber setup
//! - `store` - In-memory user store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod store;
