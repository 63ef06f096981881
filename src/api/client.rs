//! Authenticated HTTP client for the Spotify Web API
//!
//! Wraps reqwest::Client with automatic token injection and refresh. Nothing
//! in here returns an error to the caller: transport and status failures are
//! logged and folded into [`ApiResponse::Failed`] or a `false`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use url::Url;

use crate::auth::{oauth, Endpoints, TokenGrant, TokenStore};
use crate::config::ConfigStore;
use crate::error::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of an authenticated call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// 2xx without a usable JSON body (204, empty, non-JSON).
    Empty,
    /// 2xx with a parsed JSON body.
    Json(serde_json::Value),
    /// Non-2xx, transport failure, or no usable token.
    Failed,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        !matches!(self, ApiResponse::Failed)
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Where the client stands with the upstream account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// No token pair, or the upstream rejected our refresh token.
    Unauthenticated,
    Authenticated,
    /// Token pair present but past its (margin-adjusted) expiry.
    Expired,
}

/// Authenticated client shared by the setup flow and entity controllers.
pub struct SpotifyClient {
    http: reqwest::Client,
    store: Arc<ConfigStore>,
    endpoints: Endpoints,
    /// Held for the duration of a token grant; stores the last refresh outcome.
    refresh_lock: Mutex<bool>,
    /// Bumped after every completed refresh attempt.
    refresh_generation: AtomicU64,
    /// Set when the token endpoint refused our refresh token.
    revoked: AtomicBool,
}

impl SpotifyClient {
    pub fn new(store: Arc<ConfigStore>) -> Result<Self> {
        Self::with_endpoints(store, Endpoints::spotify())
    }

    pub fn with_endpoints(store: Arc<ConfigStore>, endpoints: Endpoints) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        tracing::info!("Spotify client initialized");
        Ok(Self {
            http,
            store,
            endpoints,
            refresh_lock: Mutex::new(false),
            refresh_generation: AtomicU64::new(0),
            revoked: AtomicBool::new(false),
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn is_premium(&self) -> bool {
        self.store.is_premium()
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.store.polling_interval())
    }

    pub fn auth_status(&self) -> AuthStatus {
        if self.revoked.load(Ordering::SeqCst) {
            return AuthStatus::Unauthenticated;
        }
        match self.store.tokens() {
            None => AuthStatus::Unauthenticated,
            Some(tokens) if tokens.is_expired() => AuthStatus::Expired,
            Some(_) => AuthStatus::Authenticated,
        }
    }

    /// Token pair present and not revoked. Expired still counts: the next
    /// call refreshes transparently.
    pub fn is_authenticated(&self) -> bool {
        self.auth_status() != AuthStatus::Unauthenticated
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }

    pub fn authorization_url(&self) -> Result<Url, Error> {
        let client_id = self.store.credentials().map(|c| c.client_id);
        oauth::authorization_url(&self.endpoints, client_id.as_deref())
    }

    /// Exchange an authorization code and persist the resulting tokens.
    pub async fn exchange_code(&self, code: &str) -> bool {
        let Some(credentials) = self.store.credentials() else {
            tracing::error!("Client ID or client secret not configured");
            return false;
        };

        let _guard = self.refresh_lock.lock().await;
        match oauth::exchange_code(&self.http, &self.endpoints, &credentials, code).await {
            Ok(TokenGrant {
                access_token,
                refresh_token: Some(refresh_token),
                expires_in,
            }) => {
                if let Err(e) = self.store.set_tokens(&access_token, &refresh_token, expires_in) {
                    tracing::error!("Failed to persist tokens: {:#}", e);
                    return false;
                }
                self.revoked.store(false, Ordering::SeqCst);
                tracing::info!("Successfully obtained Spotify access tokens");
                true
            }
            Ok(_) => {
                tracing::error!("Token exchange succeeded but returned no refresh token");
                false
            }
            Err(e) => {
                tracing::error!("Token exchange failed: {}", e);
                false
            }
        }
    }

    /// Refresh the access token.
    ///
    /// Concurrent callers queue on the refresh lock; anyone who waited while
    /// another caller refreshed gets that caller's outcome instead of issuing
    /// a second request.
    pub async fn refresh(&self) -> bool {
        self.refresh_after(self.refresh_generation.load(Ordering::SeqCst))
            .await
    }

    /// Refresh unless an attempt has completed since generation `seen` was
    /// observed, in which case that attempt's outcome is returned.
    async fn refresh_after(&self, seen: u64) -> bool {
        let mut last_outcome = self.refresh_lock.lock().await;
        if self.refresh_generation.load(Ordering::SeqCst) != seen {
            return *last_outcome;
        }

        let ok = self.refresh_locked().await;
        *last_outcome = ok;
        self.refresh_generation.fetch_add(1, Ordering::SeqCst);
        ok
    }

    async fn refresh_locked(&self) -> bool {
        let (Some(credentials), Some(refresh_token)) =
            (self.store.credentials(), self.store.refresh_token())
        else {
            tracing::error!("Missing credentials or refresh token");
            return false;
        };

        tracing::debug!("Refreshing Spotify access token...");
        match oauth::refresh_token(&self.http, &self.endpoints, &credentials, &refresh_token).await
        {
            Ok(grant) => {
                let refresh_token = grant.refresh_token.unwrap_or(refresh_token);
                if let Err(e) =
                    self.store
                        .set_tokens(&grant.access_token, &refresh_token, grant.expires_in)
                {
                    tracing::error!("Failed to persist refreshed tokens: {:#}", e);
                    return false;
                }
                self.revoked.store(false, Ordering::SeqCst);
                tracing::debug!("Successfully refreshed Spotify access token");
                true
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                if e.is_revocation() {
                    self.revoked.store(true, Ordering::SeqCst);
                }
                false
            }
        }
    }

    /// Issue a bearer-authenticated request against the versioned API base.
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResponse {
        if self.store.access_token().is_none() {
            tracing::error!("Not authenticated with Spotify");
            return ApiResponse::Failed;
        }

        // Sampled before the expiry check so a refresh that lands in between
        // is reused rather than repeated.
        let seen = self.refresh_generation.load(Ordering::SeqCst);
        if self.store.is_token_expired() && !self.refresh_after(seen).await {
            tracing::error!("Failed to refresh access token");
            return ApiResponse::Failed;
        }

        let Some(token) = self.store.access_token() else {
            return ApiResponse::Failed;
        };

        let url = format!("{}{}", self.endpoints.api_base, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), &url).bearer_auth(&token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if method != Method::GET {
            request = request.header(CONTENT_LENGTH, 0);
        }

        match request.send().await {
            Ok(resp) => read_response(&method, &url, resp).await,
            Err(e) => {
                tracing::error!("Error making authenticated request {} {}: {}", method, url, e);
                ApiResponse::Failed
            }
        }
    }
}

async fn read_response(method: &Method, url: &str, resp: reqwest::Response) -> ApiResponse {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::error!(
            "API request failed: {} {} - Status: {} {}",
            method,
            url,
            status.as_u16(),
            body
        );
        return ApiResponse::Failed;
    }

    if status == StatusCode::NO_CONTENT {
        return ApiResponse::Empty;
    }

    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        return ApiResponse::Empty;
    }

    match resp.bytes().await {
        Ok(bytes) if bytes.is_empty() => ApiResponse::Empty,
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(ApiResponse::Json)
            .unwrap_or(ApiResponse::Empty),
        Err(e) => {
            tracing::error!("Failed to read response body from {}: {}", url, e);
            ApiResponse::Failed
        }
    }
}
