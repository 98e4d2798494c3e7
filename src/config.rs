// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup (a `.env`
//! file is read first if present). Anything the auth layer needs that is
//! missing or malformed fails startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `APP_ENV` | `development`, `test` or `production` | `development` |
//! | `AUTH_MODE` | `strict` or `development-bypass` | `strict` |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Required (strict) |
//! | `JWT_AUDIENCE` | Expected JWT audience claim | Required (strict) |
//! | `JWKS_URI` | JWKS endpoint for JWT verification | Required (strict) |
//! | `JWKS_CACHE_TTL_SECS` | JWKS cache lifetime | `300` |
//! | `JWKS_FETCH_TIMEOUT_SECS` | JWKS fetch timeout | `10` |
//! | `JWT_CLOCK_SKEW_SECS` | Leeway on `exp` / `nbf` | `60` |
//! | `CORS_ORIGIN` | `*` or comma-separated origins | `*` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};
use crate::auth::verifier::{VerifierSettings, CLOCK_SKEW_LEEWAY};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const AUTH_MODE_ENV: &str = "AUTH_MODE";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const JWKS_URI_ENV: &str = "JWKS_URI";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECS";
pub const JWT_CLOCK_SKEW_ENV: &str = "JWT_CLOCK_SKEW_SECS";
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}: {1}")]
    Invalid(&'static str, String),
    #[error("AUTH_MODE=development-bypass is not allowed when APP_ENV=production")]
    BypassForbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("development") | Some("dev") => Ok(Self::Development),
            Some("test") => Ok(Self::Test),
            Some("production") | Some("prod") => Ok(Self::Production),
            Some(other) => Err(ConfigError::Invalid(APP_ENV_ENV, other.to_string())),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// How requests are authenticated. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Verify every token against the remote key set.
    Strict(VerifierConfig),
    /// Accept any bearer token as the development identity.
    DevelopmentBypass,
}

/// Strict-mode settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_uri: Url,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,
    pub clock_skew_secs: u64,
}

impl VerifierConfig {
    pub fn settings(&self) -> VerifierSettings {
        VerifierSettings {
            jwks_uri: self.jwks_uri.clone(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            leeway: self.clock_skew_secs,
        }
    }
}

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub auth_mode: AuthMode,
    pub cors_origins: CorsOrigins,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid(HOST_ENV, host.clone()))?;

        let app_env = AppEnv::parse(get(APP_ENV_ENV).as_deref())?;

        let auth_mode = match get(AUTH_MODE_ENV).map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("strict") => AuthMode::Strict(verifier_config(&get)?),
            Some("development-bypass") => {
                if app_env.is_production() {
                    return Err(ConfigError::BypassForbidden);
                }
                AuthMode::DevelopmentBypass
            }
            Some(other) => return Err(ConfigError::Invalid(AUTH_MODE_ENV, other.to_string())),
        };

        let cors_origins = match get(CORS_ORIGIN_ENV).as_deref().map(str::trim) {
            None | Some("*") => CorsOrigins::Any,
            Some(list) => CorsOrigins::List(
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        };

        Ok(Self {
            addr,
            app_env,
            auth_mode,
            cors_origins,
        })
    }
}

fn verifier_config<G>(get: &G) -> Result<VerifierConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let issuer = get(JWT_ISSUER_ENV).ok_or(ConfigError::Missing(JWT_ISSUER_ENV))?;
    let audience = get(JWT_AUDIENCE_ENV).ok_or(ConfigError::Missing(JWT_AUDIENCE_ENV))?;
    let raw_uri = get(JWKS_URI_ENV).ok_or(ConfigError::Missing(JWKS_URI_ENV))?;

    let jwks_uri =
        Url::parse(&raw_uri).map_err(|e| ConfigError::Invalid(JWKS_URI_ENV, e.to_string()))?;
    if !matches!(jwks_uri.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(
            JWKS_URI_ENV,
            format!("unsupported scheme `{}`", jwks_uri.scheme()),
        ));
    }
    if jwks_uri.scheme() == "http" {
        tracing::warn!(uri = %jwks_uri, "JWKS URI is not HTTPS");
    }

    let ttl = parse_or(
        get(JWKS_CACHE_TTL_ENV),
        JWKS_CACHE_TTL_ENV,
        DEFAULT_CACHE_TTL.as_secs(),
    )?;
    let timeout = parse_or(
        get(JWKS_FETCH_TIMEOUT_ENV),
        JWKS_FETCH_TIMEOUT_ENV,
        DEFAULT_FETCH_TIMEOUT.as_secs(),
    )?;
    let clock_skew_secs =
        parse_or(get(JWT_CLOCK_SKEW_ENV), JWT_CLOCK_SKEW_ENV, CLOCK_SKEW_LEEWAY)?;

    if timeout == 0 {
        return Err(ConfigError::Invalid(JWKS_FETCH_TIMEOUT_ENV, "0".to_string()));
    }

    Ok(VerifierConfig {
        issuer,
        audience,
        jwks_uri,
        jwks_cache_ttl: Duration::from_secs(ttl),
        jwks_fetch_timeout: Duration::from_secs(timeout),
        clock_skew_secs,
    })
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    const STRICT: &[(&str, &str)] = &[
        (JWT_ISSUER_ENV, "https://auth.example.com"),
        (JWT_AUDIENCE_ENV, "test-client"),
        (JWKS_URI_ENV, "https://auth.example.com/.well-known/jwks.json"),
    ];

    #[test]
    fn strict_defaults() {
        let config = load(STRICT).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.cors_origins, CorsOrigins::Any);

        let AuthMode::Strict(verifier) = config.auth_mode else {
            panic!("expected strict mode");
        };
        assert_eq!(verifier.issuer, "https://auth.example.com");
        assert_eq!(verifier.audience, "test-client");
        assert_eq!(verifier.jwks_cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(verifier.jwks_fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(verifier.clock_skew_secs, CLOCK_SKEW_LEEWAY);
    }

    #[test]
    fn each_auth_value_is_required_in_strict_mode() {
        for missing in [JWT_ISSUER_ENV, JWT_AUDIENCE_ENV, JWKS_URI_ENV] {
            let pairs: Vec<(&str, &str)> =
                STRICT.iter().copied().filter(|(k, _)| *k != missing).collect();
            assert_eq!(load(&pairs).unwrap_err(), ConfigError::Missing(missing));
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let config = load(&[
            (JWT_ISSUER_ENV, "https://auth.example.com"),
            (JWT_AUDIENCE_ENV, "  "),
            (JWKS_URI_ENV, "https://auth.example.com/.well-known/jwks.json"),
        ]);
        assert_eq!(config.unwrap_err(), ConfigError::Missing(JWT_AUDIENCE_ENV));
    }

    #[test]
    fn missing_config_never_selects_bypass() {
        let config = load(&[]);
        assert_eq!(config.unwrap_err(), ConfigError::Missing(JWT_ISSUER_ENV));
    }

    #[test]
    fn bypass_requires_explicit_mode() {
        let config = load(&[(AUTH_MODE_ENV, "development-bypass")]).unwrap();
        assert_eq!(config.auth_mode, AuthMode::DevelopmentBypass);
    }

    #[test]
    fn bypass_refused_in_production() {
        let config = load(&[
            (AUTH_MODE_ENV, "development-bypass"),
            (APP_ENV_ENV, "production"),
        ]);
        assert_eq!(config.unwrap_err(), ConfigError::BypassForbidden);
    }

    #[test]
    fn unknown_auth_mode_is_invalid() {
        let config = load(&[(AUTH_MODE_ENV, "off")]);
        assert!(matches!(config, Err(ConfigError::Invalid(AUTH_MODE_ENV, _))));
    }

    #[test]
    fn malformed_jwks_uri_is_invalid() {
        let mut pairs: Vec<_> = STRICT
            .iter()
            .copied()
            .filter(|(k, _)| *k != JWKS_URI_ENV)
            .collect();
        pairs.push((JWKS_URI_ENV, "not a url"));
        assert!(matches!(load(&pairs), Err(ConfigError::Invalid(JWKS_URI_ENV, _))));

        pairs.pop();
        pairs.push((JWKS_URI_ENV, "ftp://auth.example.com/jwks.json"));
        assert!(matches!(load(&pairs), Err(ConfigError::Invalid(JWKS_URI_ENV, _))));
    }

    #[test]
    fn numeric_overrides() {
        let mut pairs = STRICT.to_vec();
        pairs.extend([
            (PORT_ENV, "8080"),
            (JWKS_CACHE_TTL_ENV, "30"),
            (JWKS_FETCH_TIMEOUT_ENV, "2"),
            (JWT_CLOCK_SKEW_ENV, "0"),
        ]);
        let config = load(&pairs).unwrap();
        assert_eq!(config.addr.port(), 8080);
        let AuthMode::Strict(verifier) = config.auth_mode else {
            panic!("expected strict mode");
        };
        assert_eq!(verifier.jwks_cache_ttl, Duration::from_secs(30));
        assert_eq!(verifier.jwks_fetch_timeout, Duration::from_secs(2));
        assert_eq!(verifier.clock_skew_secs, 0);
    }

    #[test]
    fn bad_port_is_invalid() {
        let mut pairs = STRICT.to_vec();
        pairs.push((PORT_ENV, "http"));
        assert!(matches!(load(&pairs), Err(ConfigError::Invalid(PORT_ENV, _))));
    }

    #[test]
    fn cors_origin_list() {
        let mut pairs = STRICT.to_vec();
        pairs.push((CORS_ORIGIN_ENV, "http://localhost:5173, https://app.example.com"));
        let config = load(&pairs).unwrap();
        assert_eq!(
            config.cors_origins,
            CorsOrigins::List(vec![
                "http://localhost:5173".to_string(),
                "https://app.example.com".to_string()
            ])
        );
    }
}
