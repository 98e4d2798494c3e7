// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication and role-based access control for the API.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <JWT>`
//! 2. `require_auth`:
//!    - Resolves the JWKS for the configured URI (cached per URI)
//!    - Verifies signature, expiry, issuer, audience
//!    - Normalizes roles from `roles`, `cognito:groups` and `scope`
//!    - Attaches an [`AuthenticatedUser`] to the request
//! 3. Guards (`require_role`, `require_self_or_role`) allow or deny
//!
//! ## Responses
//!
//! | Condition | Status | Body |
//! |-----------|--------|------|
//! | no / garbled header | 401 | `{"error":"Missing bearer token"}` |
//! | verification failed | 401 | `{"error":"Invalid token"}` |
//! | guard without identity | 401 | `{"error":"Missing user context"}` |
//! | role / ownership denied | 403 | `{"error":"Forbidden"}` |

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guards;
pub mod jwks;
pub mod middleware;
pub mod roles;
pub mod verifier;

pub use claims::{normalize_roles, AuthenticatedUser, TokenClaims};
pub use error::{AuthError, ClaimShapeError, KeySetError, VerifyError};
pub use extractor::Auth;
pub use guards::{require_role, require_self_or_role, RoleGuard};
pub use jwks::{KeySet, KeySetCache};
pub use middleware::{bearer_token, require_auth};
pub use roles::{RoleSet, ADMIN_ROLE, USER_ROLE};
pub use verifier::{Authenticator, TokenVerifier, VerifierSettings};
