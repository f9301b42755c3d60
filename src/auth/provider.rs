//! Credential provider implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{
    BearerToken, CredentialProvider, SilentAcquisition, TokenRequest, DEFAULT_REFRESH_THRESHOLD,
};
use crate::error::CredentialError;

/// Interactive sign-in flow supplied by the host application.
#[async_trait]
pub trait InteractiveLogin: Send + Sync {
    /// Prompts the user and returns a fresh token.
    async fn login(&self, request: &TokenRequest) -> Result<BearerToken, CredentialError>;
}

/// Token cache keyed by principal, in front of an [`InteractiveLogin`].
///
/// The silent path serves a cached token until it is within the refresh
/// threshold of expiry. The interactive path always runs the login flow and
/// caches what it returns.
pub struct CachedCredentialProvider {
    login: Arc<dyn InteractiveLogin>,
    cache: RwLock<HashMap<String, BearerToken>>,
    refresh_threshold: Duration,
}

impl std::fmt::Debug for CachedCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredentialProvider")
            .field("cached_principals", &self.cache.read().len())
            .field("refresh_threshold", &self.refresh_threshold)
            .finish()
    }
}

impl CachedCredentialProvider {
    /// Creates an empty cache in front of `login`.
    pub fn new(login: Arc<dyn InteractiveLogin>) -> Self {
        Self {
            login,
            cache: RwLock::new(HashMap::new()),
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
        }
    }

    /// Sets the refresh threshold.
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Seeds the cache, e.g. with a token restored by the host.
    pub fn insert(&self, username: &str, token: BearerToken) {
        self.cache.write().insert(cache_key(username), token);
    }

    /// Drops the cached token for `username` (sign-out).
    pub fn evict(&self, username: &str) -> Option<BearerToken> {
        self.cache.write().remove(&cache_key(username))
    }
}

fn cache_key(username: &str) -> String {
    username.trim().to_lowercase()
}

#[async_trait]
impl CredentialProvider for CachedCredentialProvider {
    async fn acquire_silent(
        &self,
        request: &TokenRequest,
    ) -> Result<SilentAcquisition, CredentialError> {
        let key = cache_key(&request.principal.username);
        let cached = self.cache.read().get(&key).cloned();
        Ok(match cached {
            Some(token) if !token.expires_soon(self.refresh_threshold) => {
                SilentAcquisition::Acquired(token)
            },
            Some(_) => SilentAcquisition::InteractionRequired {
                reason: "cached token is expiring".to_string(),
            },
            None => SilentAcquisition::InteractionRequired {
                reason: "no cached token".to_string(),
            },
        })
    }

    async fn acquire_interactive(
        &self,
        request: &TokenRequest,
    ) -> Result<BearerToken, CredentialError> {
        let token = self.login.login(request).await?;
        self.insert(&request.principal.username, token.clone());
        Ok(token)
    }
}

/// Provider that hands out one fixed token.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    token: BearerToken,
}

impl StaticCredentialProvider {
    /// Provider for a raw access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: BearerToken::new(token),
        }
    }

    /// Provider for a prepared token.
    pub fn from_token(token: BearerToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn acquire_silent(
        &self,
        _request: &TokenRequest,
    ) -> Result<SilentAcquisition, CredentialError> {
        if self.token.is_expired() {
            return Ok(SilentAcquisition::InteractionRequired {
                reason: "static token has expired".to_string(),
            });
        }
        Ok(SilentAcquisition::Acquired(self.token.clone()))
    }

    async fn acquire_interactive(
        &self,
        request: &TokenRequest,
    ) -> Result<BearerToken, CredentialError> {
        if self.token.is_expired() {
            return Err(CredentialError::InteractiveFailed {
                principal: request.principal.username.clone(),
                reason: "static token has expired".to_string(),
            });
        }
        Ok(self.token.clone())
    }
}
