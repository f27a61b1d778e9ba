//! Session based CSRF protection for forms
//!
//! A random raw value is kept in the host's session under [`CSRF_SESSION_KEY`].
//! Tokens are `"{expires}##{hex digest}"`, where the digest is an
//! HMAC-SHA256 over the raw value and the expiry timestamp, keyed with the
//! application secret. Validation checks the format, the expiry and the
//! digest in constant time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::config::SecuritySettings;
use crate::error::MixinError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the hidden form field carrying the token
pub const CSRF_FIELD: &str = "_csrf_token";

/// Session key of the raw per-session value
pub const CSRF_SESSION_KEY: &str = "csrf";

/// Per-request key/value store holding the raw CSRF value
///
/// Implement this on the host's session type.
pub trait CsrfContext: Send {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value
    fn insert(&mut self, key: &str, value: String);
}

/// In-memory [`CsrfContext`]
#[derive(Debug, Clone, Default)]
pub struct MemoryCsrfContext {
    values: HashMap<String, String>,
}

impl MemoryCsrfContext {
    /// Empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CsrfContext for MemoryCsrfContext {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

/// Why a submitted token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfFailure {
    /// No token was submitted
    MissingToken,
    /// The session holds no raw value
    MissingSessionValue,
    /// The token is malformed or its digest does not match
    Invalid,
    /// The token's expiry is in the past
    Expired,
}

impl CsrfFailure {
    /// User facing message
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingToken => "The CSRF token is missing.",
            Self::MissingSessionValue => "CSRF failed.",
            Self::Invalid => "The CSRF token is invalid.",
            Self::Expired => "The CSRF token has expired.",
        }
    }
}

impl fmt::Display for CsrfFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Application wide CSRF settings
#[derive(Clone)]
pub struct CsrfSettings {
    secret: Arc<[u8]>,
    time_limit: Option<Duration>,
}

impl fmt::Debug for CsrfSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfSettings")
            .field("secret", &"<redacted>")
            .field("time_limit", &self.time_limit)
            .finish()
    }
}

impl CsrfSettings {
    /// Default token lifetime
    pub const DEFAULT_TIME_LIMIT_SECS: i64 = 1800;

    /// Settings with the given secret and the default time limit
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            time_limit: Some(Duration::seconds(Self::DEFAULT_TIME_LIMIT_SECS)),
        }
    }

    /// Settings with a freshly generated secret
    #[must_use]
    pub fn random() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill(&mut secret);
        Self::new(secret)
    }

    /// Change the token lifetime; `None` issues tokens that never expire
    #[must_use]
    pub const fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Token lifetime
    #[must_use]
    pub const fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Build from configuration; `None` when CSRF is disabled
    ///
    /// Without a configured secret a random one is generated, so tokens do
    /// not survive a restart.
    #[must_use]
    pub fn from_config(security: &SecuritySettings) -> Option<Self> {
        if !security.csrf_enabled {
            return None;
        }
        let settings = match security.csrf_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Self::new(secret),
            _ => {
                tracing::warn!("no CSRF secret configured, generating one for this process");
                Self::random()
            }
        };
        let limit = security
            .csrf_time_limit_secs
            .map(|secs| Duration::seconds(i64::from(u32::try_from(secs).unwrap_or(u32::MAX))));
        Some(settings.with_time_limit(limit))
    }

    /// Issue a token for the session behind `context`
    ///
    /// Creates the session's raw value on first use.
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::Config`] if the secret cannot key the MAC.
    pub fn generate_token(&self, context: &mut dyn CsrfContext) -> Result<String, MixinError> {
        self.generate_token_at(context, Utc::now())
    }

    pub(crate) fn generate_token_at(
        &self,
        context: &mut dyn CsrfContext,
        now: DateTime<Utc>,
    ) -> Result<String, MixinError> {
        let raw = context.get(CSRF_SESSION_KEY).unwrap_or_else(|| {
            let raw = random_value();
            context.insert(CSRF_SESSION_KEY, raw.clone());
            raw
        });
        let expires = self
            .time_limit
            .map(|limit| (now + limit).timestamp().to_string())
            .unwrap_or_default();
        let digest = self.mac(&raw, &expires)?.finalize().into_bytes();
        Ok(format!("{expires}##{}", hex::encode(digest)))
    }

    /// Check a submitted token against the session behind `context`
    ///
    /// # Errors
    ///
    /// Returns the [`CsrfFailure`] describing the rejection.
    pub fn validate_token(
        &self,
        context: &dyn CsrfContext,
        token: Option<&str>,
    ) -> Result<(), CsrfFailure> {
        self.validate_token_at(context, token, Utc::now())
    }

    pub(crate) fn validate_token_at(
        &self,
        context: &dyn CsrfContext,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CsrfFailure> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(CsrfFailure::MissingToken)?;
        let raw = context
            .get(CSRF_SESSION_KEY)
            .ok_or(CsrfFailure::MissingSessionValue)?;
        let (expires, digest) = token.split_once("##").ok_or(CsrfFailure::Invalid)?;

        if self.time_limit.is_some() {
            let deadline: i64 = expires.parse().map_err(|_| CsrfFailure::Invalid)?;
            if now.timestamp() > deadline {
                return Err(CsrfFailure::Expired);
            }
        }

        let digest = hex::decode(digest).map_err(|_| CsrfFailure::Invalid)?;
        self.mac(&raw, expires)
            .map_err(|_| CsrfFailure::Invalid)?
            .verify_slice(&digest)
            .map_err(|_| CsrfFailure::Invalid)
    }

    /// MAC over the raw value followed by the expiry
    fn mac(&self, raw: &str, expires: &str) -> Result<HmacSha256, MixinError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| MixinError::Config(format!("invalid CSRF secret: {e}")))?;
        mac.update(raw.as_bytes());
        mac.update(expires.as_bytes());
        Ok(mac)
    }
}

fn random_value() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
