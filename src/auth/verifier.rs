// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! [`TokenVerifier`] checks signature, issuer, audience and expiry against
//! the keys published at the configured JWKS URI. [`Authenticator`] picks
//! between strict verification and the development bypass; the choice is
//! made once at startup from explicit configuration.

use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Validation};
use url::Url;

use super::claims::{AuthenticatedUser, TokenClaims};
use super::error::{AuthError, VerifyError};
use super::jwks::{KeySet, KeySetCache};

/// Clock skew tolerance (60 seconds).
pub const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Expected token properties.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// JWKS endpoint
    pub jwks_uri: Url,
    /// Expected `iss`
    pub issuer: String,
    /// Audience that must appear in `aud`
    pub audience: String,
    /// Leeway applied to `exp` and `nbf`, in seconds
    pub leeway: u64,
}

/// Verifies bearer tokens against a remote key set.
#[derive(Clone)]
pub struct TokenVerifier {
    settings: VerifierSettings,
    keys: KeySetCache,
}

impl TokenVerifier {
    pub fn new(settings: VerifierSettings, keys: KeySetCache) -> Self {
        Self { settings, keys }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    pub fn key_set_cache(&self) -> &KeySetCache {
        &self.keys
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        let header = decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        let kid = header.kid.as_deref();

        let mut key_set = self.keys.resolve(&self.settings.jwks_uri).await?;

        // Unknown kid: the provider may have rotated keys since the last fetch.
        if let Some(kid) = kid {
            if !key_set.has_kid(kid) && key_set.age() >= self.keys.min_refetch_interval() {
                tracing::debug!(kid, "Unknown kid, refreshing JWKS");
                key_set = self.keys.refresh(&self.settings.jwks_uri).await?;
            }
        }

        self.verify_with(&key_set, token, kid, header.alg)
    }

    fn verify_with(
        &self,
        key_set: &KeySet,
        token: &str,
        kid: Option<&str>,
        header_alg: jsonwebtoken::Algorithm,
    ) -> Result<TokenClaims, VerifyError> {
        let mut last_error = VerifyError::NoMatchingKey(kid.map(str::to_string));

        for candidate in key_set.candidates(kid) {
            if candidate.algorithm != header_alg {
                last_error = VerifyError::AlgorithmMismatch;
                continue;
            }

            let validation = self.validation(candidate.algorithm);
            match decode::<TokenClaims>(token, &candidate.key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_error = e.into(),
            }
        }

        Err(last_error)
    }

    fn validation(&self, algorithm: jsonwebtoken::Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = self.settings.leeway;
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

/// How bearer tokens are turned into identities.
#[derive(Clone)]
pub enum Authenticator {
    /// Full verification against the configured key set.
    Strict(TokenVerifier),
    /// Every presented token maps to a fixed development identity. Never
    /// selected implicitly; see `config::AuthMode`.
    DevelopmentBypass,
}

impl Authenticator {
    /// Build a strict authenticator from settings.
    pub fn strict(
        settings: VerifierSettings,
        fetch_timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, reqwest::Error> {
        let keys = KeySetCache::new(fetch_timeout)?.with_cache_ttl(cache_ttl);
        Ok(Authenticator::Strict(TokenVerifier::new(settings, keys)))
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self, Authenticator::DevelopmentBypass)
    }

    /// Turn a bearer token into an authenticated user.
    ///
    /// Failures are logged with their reason and surface as
    /// [`AuthError::InvalidToken`].
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        match self {
            Authenticator::Strict(verifier) => {
                let claims = verifier.verify(token).await.map_err(log_rejection)?;
                AuthenticatedUser::from_claims(claims)
                    .map_err(|e| log_rejection(VerifyError::from(e)))
            }
            Authenticator::DevelopmentBypass => {
                tracing::warn!("Development auth bypass: token accepted without verification");
                Ok(AuthenticatedUser::development())
            }
        }
    }
}

fn log_rejection(error: VerifyError) -> AuthError {
    match &error {
        VerifyError::KeySet(e) => tracing::warn!(error = %e, "Token rejected: key set unavailable"),
        other => tracing::debug!(reason = %other, "Token rejected"),
    }
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> VerifierSettings {
        VerifierSettings {
            jwks_uri: Url::parse("http://127.0.0.1:9/.well-known/jwks.json").unwrap(),
            issuer: "https://auth.example.com".to_string(),
            audience: "test-client".to_string(),
            leeway: CLOCK_SKEW_LEEWAY,
        }
    }

    fn strict() -> Authenticator {
        Authenticator::strict(settings(), Duration::from_millis(500), Duration::from_secs(60))
            .expect("client builds")
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let result = strict().authenticate("not-a-jwt").await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn unreachable_key_set_is_invalid_token() {
        // Structurally valid header so the verifier reaches the key fetch.
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.e30.c2ln";
        let result = strict().authenticate(token).await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn bypass_yields_development_identity() {
        let user = Authenticator::DevelopmentBypass
            .authenticate("anything")
            .await
            .unwrap();
        assert_eq!(user, AuthenticatedUser::development());
    }

    #[test]
    fn validation_checks_issuer_and_audience() {
        let Authenticator::Strict(verifier) = strict() else {
            panic!("expected strict authenticator");
        };
        let validation = verifier.validation(jsonwebtoken::Algorithm::RS256);
        assert!(validation.validate_exp);
        assert_eq!(validation.leeway, CLOCK_SKEW_LEEWAY);
        assert!(validation
            .iss
            .as_ref()
            .is_some_and(|iss| iss.contains("https://auth.example.com")));
        assert!(validation
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains("test-client")));
    }
}
