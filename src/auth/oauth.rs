//! OAuth2 authorization-code and refresh-token grants

use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, HttpRequest, HttpResponse,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use thiserror::Error;
use url::Url;

use super::tokens::DEFAULT_EXPIRES_IN_SECS;
use super::{Credentials, Endpoints, SCOPES};
use crate::error::Error;

/// Tokens returned by a successful grant.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the upstream keeps the existing refresh token.
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

#[derive(Debug, Error)]
pub enum GrantError {
    /// The token endpoint answered and refused (bad code, revoked token).
    #[error("token endpoint rejected the grant: {0}")]
    Rejected(String),
    /// The token endpoint could not be reached or answered garbage.
    #[error("token request failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Config(#[from] Error),
}

impl GrantError {
    /// True when retrying with the same grant cannot succeed.
    pub fn is_revocation(&self) -> bool {
        matches!(self, GrantError::Rejected(_))
    }
}

/// Build the OAuth2 client for the operator's app
fn build_client(endpoints: &Endpoints, client_id: &str, client_secret: Option<&str>) -> Result<BasicClient, Error> {
    let auth_url = AuthUrl::new(endpoints.authorize_url.clone())
        .map_err(|e| Error::Configuration(format!("invalid authorize URL: {}", e)))?;
    let token_url = TokenUrl::new(endpoints.token_url.clone())
        .map_err(|e| Error::Configuration(format!("invalid token URL: {}", e)))?;
    let redirect_url = RedirectUrl::new(endpoints.redirect_uri.clone())
        .map_err(|e| Error::Configuration(format!("invalid redirect URI: {}", e)))?;

    Ok(BasicClient::new(
        ClientId::new(client_id.to_string()),
        client_secret.map(|s| ClientSecret::new(s.to_string())),
        auth_url,
        Some(token_url),
    )
    .set_redirect_uri(redirect_url))
}

/// Authorize URL the operator opens in a browser.
pub fn authorization_url(endpoints: &Endpoints, client_id: Option<&str>) -> Result<Url, Error> {
    let client_id = client_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Configuration("client ID not configured".to_string()))?;
    let client = build_client(endpoints, client_id, None)?;

    let (url, _state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("show_dialog", "true")
        .url();
    Ok(url)
}

/// Exchange an authorization code for a token pair.
pub async fn exchange_code(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    credentials: &Credentials,
    code: &str,
) -> Result<TokenGrant, GrantError> {
    let client = build_client(
        endpoints,
        &credentials.client_id,
        Some(&credentials.client_secret),
    )?;

    let response = client
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .request_async(|request| send(http, request))
        .await
        .map_err(grant_error)?;

    Ok(TokenGrant {
        access_token: response.access_token().secret().to_string(),
        refresh_token: response.refresh_token().map(|t| t.secret().to_string()),
        expires_in: response
            .expires_in()
            .map_or(DEFAULT_EXPIRES_IN_SECS, |d| d.as_secs()),
    })
}

/// Trade a refresh token for a new access token.
pub async fn refresh_token(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    credentials: &Credentials,
    refresh_token: &str,
) -> Result<TokenGrant, GrantError> {
    let client = build_client(
        endpoints,
        &credentials.client_id,
        Some(&credentials.client_secret),
    )?;

    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request_async(|request| send(http, request))
        .await
        .map_err(grant_error)?;

    Ok(TokenGrant {
        access_token: response.access_token().secret().to_string(),
        refresh_token: response.refresh_token().map(|t| t.secret().to_string()),
        expires_in: response
            .expires_in()
            .map_or(DEFAULT_EXPIRES_IN_SECS, |d| d.as_secs()),
    })
}

/// Run an oauth2 request over the shared reqwest client so its timeouts apply.
async fn send(http: &reqwest::Client, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn grant_error(err: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> GrantError {
    match err {
        RequestTokenError::ServerResponse(resp) => match resp.error() {
            BasicErrorResponseType::InvalidGrant
            | BasicErrorResponseType::InvalidClient
            | BasicErrorResponseType::UnauthorizedClient => GrantError::Rejected(resp.to_string()),
            _ => GrantError::Transport(resp.to_string()),
        },
        RequestTokenError::Request(e) => GrantError::Transport(e.to_string()),
        RequestTokenError::Parse(e, body) => GrantError::Transport(format!(
            "{} (body: {})",
            e,
            String::from_utf8_lossy(&body)
        )),
        RequestTokenError::Other(msg) => GrantError::Transport(msg),
    }
}
