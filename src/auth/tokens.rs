//! Token storage and management

use anyhow::Result;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds shaved off the upstream-declared lifetime so refresh happens early.
pub const EXPIRY_SAFETY_MARGIN_SECS: u64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Current wall-clock time in unix seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Spotify app credentials entered by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Access/refresh token pair with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds, already reduced by the safety margin.
    pub expires_at: u64,
}

impl TokenSet {
    pub fn issued_at(
        access_token: String,
        refresh_token: String,
        expires_in: u64,
        issued_at: u64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: (issued_at + expires_in).saturating_sub(EXPIRY_SAFETY_MARGIN_SECS),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_secs())
    }
}

/// Persistent storage for credentials and OAuth tokens.
///
/// Implementations persist every mutation before returning `Ok`.
pub trait TokenStore {
    fn credentials(&self) -> Option<Credentials>;
    fn set_credentials(&self, client_id: &str, client_secret: &str) -> Result<()>;
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn tokens(&self) -> Option<TokenSet>;
    fn set_tokens(&self, access_token: &str, refresh_token: &str, expires_in: u64) -> Result<()>;
    /// True when no expiry is stored or the stored expiry has passed.
    fn is_token_expired(&self) -> bool;
    fn clear_tokens(&self) -> Result<()>;
}
