//! Authentication module for the Spotify Web API
//!
//! Implements the OAuth2 authorization-code grant: the operator opens the
//! authorize URL, pastes back the code, and the driver keeps the resulting
//! token pair fresh with refresh-token grants.

pub mod oauth;
pub mod tokens;

pub use oauth::TokenGrant;
pub use tokens::{now_secs, Credentials, TokenSet, TokenStore};

/// Scopes requested from the operator's account.
pub const SCOPES: [&str; 4] = [
    "user-read-currently-playing",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-private",
];

/// Redirect target registered in the Spotify app. Nothing listens there;
/// the operator copies the code out of the browser's address bar.
pub const REDIRECT_URI: &str = "https://example.com/callback";

/// Host/path fragment identifying a pasted callback URL.
pub const CALLBACK_MARKER: &str = "example.com/callback";

/// Upstream endpoint configuration
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// OAuth2 authorize endpoint (browser-facing)
    pub authorize_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
    /// Versioned Web API base
    pub api_base: String,
    /// OAuth2 redirect URI
    pub redirect_uri: String,
}

impl Endpoints {
    pub fn spotify() -> Self {
        Self {
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base: "https://api.spotify.com/v1".to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
        }
    }

    /// All endpoints rooted at one base URL (mock servers).
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{}/authorize", base),
            token_url: format!("{}/api/token", base),
            api_base: format!("{}/v1", base),
            redirect_uri: REDIRECT_URI.to_string(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::spotify()
    }
}
