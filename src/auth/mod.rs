//! Delegated credentials for workbook access.
//!
//! Every gateway call takes a [`BearerToken`]. Tokens come from a
//! [`CredentialProvider`], which is tried silently first and interactively
//! only when the silent path says interaction is required. See
//! [`resolve_credential`].

mod provider;

pub use provider::{CachedCredentialProvider, InteractiveLogin, StaticCredentialProvider};

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::error::CredentialError;

/// Scopes needed to find the workbook and update its cells.
pub const DEFAULT_SCOPES: [&str; 2] = ["User.Read", "Files.ReadWrite"];

/// Tokens closer than this to expiry are not served from a cache.
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(60);

/// An access token sent as `Authorization: Bearer ...`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    /// The access token.
    pub token: String,
    /// Token type, `Bearer` unless the issuer says otherwise.
    pub token_type: String,
    /// Expiration time, if the issuer reported one.
    pub expires_at: Option<SystemTime>,
}

impl BearerToken {
    /// Token with no known expiry.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    /// Token that expires `expires_in` from now.
    pub fn with_expiry(token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            expires_at: Some(SystemTime::now() + expires_in),
            ..Self::new(token)
        }
    }

    /// Returns `true` once the expiry time has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| SystemTime::now() >= expires_at)
    }

    /// Returns `true` if less than `threshold` remains.
    pub fn expires_soon(&self, threshold: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at
                .duration_since(SystemTime::now())
                .map_or(true, |remaining| remaining < threshold),
            None => false,
        }
    }

    /// Value for the `Authorization` header.
    pub fn to_header_value(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    /// Sign-in name, normally the account email.
    pub username: String,
}

impl Principal {
    /// Creates a principal.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// What a token is being requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    /// Account the token acts on behalf of.
    pub principal: Principal,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

impl TokenRequest {
    /// Request for [`DEFAULT_SCOPES`].
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Replaces the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of a silent acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilentAcquisition {
    /// A usable token without user interaction.
    Acquired(BearerToken),
    /// The provider needs the user; fall back to the interactive path.
    InteractionRequired {
        /// Why silent acquisition could not complete.
        reason: String,
    },
}

/// Source of bearer tokens for a principal.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Attempts to get a token without user interaction.
    ///
    /// Needing interaction is reported as
    /// [`SilentAcquisition::InteractionRequired`], not as an error.
    async fn acquire_silent(
        &self,
        request: &TokenRequest,
    ) -> Result<SilentAcquisition, CredentialError>;

    /// Runs the interactive challenge.
    async fn acquire_interactive(&self, request: &TokenRequest)
        -> Result<BearerToken, CredentialError>;
}

/// Gets a token silently, falling back to the interactive flow.
///
/// A silent *error* also falls back; only an interactive failure is returned.
pub async fn resolve_credential(
    provider: &dyn CredentialProvider,
    request: &TokenRequest,
) -> Result<BearerToken, CredentialError> {
    match provider.acquire_silent(request).await {
        Ok(SilentAcquisition::Acquired(token)) => {
            tracing::debug!(principal = %request.principal, "token acquired silently");
            return Ok(token);
        },
        Ok(SilentAcquisition::InteractionRequired { reason }) => {
            tracing::debug!(principal = %request.principal, %reason, "interaction required");
        },
        Err(err) => {
            tracing::warn!(principal = %request.principal, "silent acquisition failed: {err}");
        },
    }
    provider.acquire_interactive(request).await
}
