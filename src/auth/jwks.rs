// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache model
//!
//! [`KeySetCache`] holds at most one [`KeySet`] snapshot: the URI it was
//! fetched from, the decoding keys, and the fetch instant. A snapshot is
//! reused only while the requested URI equals the snapshot's URI and the
//! snapshot is younger than the TTL. Anything else fetches again and swaps
//! the whole snapshot in a single assignment, so readers never observe a
//! URI paired with another URI's keys.
//!
//! Concurrent first use may fetch more than once; the last writer wins with
//! an equivalent snapshot.
//!
//! Stale cache is used on fetch failure: once a URI has resolved, a failed
//! TTL refresh keeps serving the previous snapshot for that same URI.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use url::Url;

use super::error::KeySetError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default JWKS fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum snapshot age before an unknown `kid` may force a re-fetch.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on the JWKS document size.
const MAX_JWKS_BYTES: u64 = 512 * 1024;

/// A decoding key resolved from one JWK.
#[derive(Clone, Debug)]
pub struct ResolvedKey {
    pub kid: Option<String>,
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

/// Immutable snapshot of the keys published at one URI.
#[derive(Debug)]
pub struct KeySet {
    uri: Url,
    keys: Vec<ResolvedKey>,
    fetched_at: Instant,
}

impl KeySet {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Keys eligible to verify a token with the given `kid`.
    ///
    /// With a `kid` only the matching key qualifies; without one every key
    /// in the set is a candidate.
    pub fn candidates<'a>(&'a self, kid: Option<&'a str>) -> impl Iterator<Item = &'a ResolvedKey> {
        self.keys
            .iter()
            .filter(move |k| kid.is_none() || k.kid.as_deref() == kid)
    }

    pub fn has_kid(&self, kid: &str) -> bool {
        self.keys.iter().any(|k| k.kid.as_deref() == Some(kid))
    }
}

/// JWKS cache keyed by source URI.
#[derive(Clone)]
pub struct KeySetCache {
    /// Cache TTL
    cache_ttl: Duration,
    /// Minimum snapshot age before an unknown kid may force a fetch
    min_refetch_interval: Duration,
    /// Current snapshot
    current: Arc<RwLock<Option<Arc<KeySet>>>>,
    /// Number of network fetches performed
    fetches: Arc<AtomicU64>,
    /// HTTP client
    client: reqwest::Client,
}

impl KeySetCache {
    /// Create a cache whose fetches give up after `fetch_timeout`.
    pub fn new(fetch_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refetch_interval: MIN_REFETCH_INTERVAL,
            current: Arc::new(RwLock::new(None)),
            fetches: Arc::new(AtomicU64::new(0)),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Override the unknown-kid cool-down.
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    pub fn min_refetch_interval(&self) -> Duration {
        self.min_refetch_interval
    }

    /// Total number of fetches issued since creation.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Return the key set for `uri`, fetching only if the cached snapshot is
    /// for another URI or has gone stale.
    ///
    /// A failed refresh of a stale snapshot for the same URI returns the
    /// stale snapshot. The error propagates only when nothing was cached for
    /// `uri`.
    pub async fn resolve(&self, uri: &Url) -> Result<Arc<KeySet>, KeySetError> {
        if let Some(snapshot) = self.fresh_snapshot(uri).await {
            return Ok(snapshot);
        }

        match self.refresh(uri).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.snapshot_for(uri).await {
                Some(stale) => {
                    tracing::warn!(
                        uri = %uri,
                        error = %e,
                        age_secs = stale.age().as_secs(),
                        "JWKS refresh failed, serving stale keys"
                    );
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Fetch `uri` unconditionally and replace the snapshot.
    pub async fn refresh(&self, uri: &Url) -> Result<Arc<KeySet>, KeySetError> {
        let keys = self.fetch_jwks(uri).await?;
        let snapshot = Arc::new(KeySet {
            uri: uri.clone(),
            keys,
            fetched_at: Instant::now(),
        });

        *self.current.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Check if a fresh snapshot for `uri` is cached.
    pub async fn is_cached(&self, uri: &Url) -> bool {
        self.fresh_snapshot(uri).await.is_some()
    }

    async fn fresh_snapshot(&self, uri: &Url) -> Option<Arc<KeySet>> {
        self.snapshot_for(uri)
            .await
            .filter(|s| s.fetched_at.elapsed() < self.cache_ttl)
    }

    async fn snapshot_for(&self, uri: &Url) -> Option<Arc<KeySet>> {
        let current = self.current.read().await;
        current.as_ref().filter(|s| &s.uri == uri).cloned()
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self, uri: &Url) -> Result<Vec<ResolvedKey>, KeySetError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::info!(uri = %uri, "Fetching JWKS");

        let transport = |source: reqwest::Error| KeySetError::Transport {
            uri: uri.to_string(),
            source,
        };

        let mut response = self
            .client
            .get(uri.clone())
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(KeySetError::Status {
                uri: uri.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(size) = response.content_length() {
            if size > MAX_JWKS_BYTES {
                return Err(KeySetError::TooLarge {
                    uri: uri.to_string(),
                    size,
                });
            }
        }

        // Content-Length may be absent; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            if (body.len() + chunk.len()) as u64 > MAX_JWKS_BYTES {
                return Err(KeySetError::TooLarge {
                    uri: uri.to_string(),
                    size: (body.len() + chunk.len()) as u64,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let jwks: JwkSet = serde_json::from_slice(&body).map_err(|e| KeySetError::Decode {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        let keys: Vec<ResolvedKey> = jwks
            .keys
            .iter()
            .filter_map(|jwk| match jwk_to_decoding_key(jwk) {
                Ok(key) => Some(key),
                Err(reason) => {
                    tracing::debug!(kid = ?jwk.common.key_id, reason, "Skipping JWK");
                    None
                }
            })
            .collect();

        tracing::debug!(uri = %uri, keys = keys.len(), "JWKS resolved");
        Ok(keys)
    }
}

/// Convert a JWK to a decoding key and its algorithm.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<ResolvedKey, &'static str> {
    let (key, algorithm) = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|_| "invalid RSA components")?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
                Some(_) => return Err("algorithm does not fit an RSA key"),
            };
            (key, alg)
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|_| "invalid EC components")?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                Some(KeyAlgorithm::ES256) | None => Algorithm::ES256,
                Some(_) => return Err("algorithm does not fit an EC key"),
            };
            (key, alg)
        }
        _ => return Err("unsupported key type"),
    };

    Ok(ResolvedKey {
        kid: jwk.common.key_id.clone(),
        algorithm,
        key,
    })
}
