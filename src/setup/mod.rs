//! Driver setup flow
//!
//! Walks the operator through entering app credentials, opening the
//! authorize URL and pasting back the code (or the whole callback URL).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::api::SpotifyClient;
use crate::auth::{TokenStore, CALLBACK_MARKER};
use crate::hub::setup::SetupField;
use crate::hub::{SetupAction, SetupErrorKind, SetupMessage};

/// Input field carrying the pasted code or URL.
pub const AUTH_CODE_FIELD: &str = "auth_code";

const INSTRUCTIONS: &str = "1. Open the Spotify URL below in a browser tab\n\
2. Log in to your Spotify account and authorize this application\n\
3. Your browser will show 'page not found' - this is normal!\n\
4. Find 'code=...' in the browser's address bar\n\
5. Paste the code, or the entire URL, below";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    AwaitingCredentials,
    AwaitingAuthorizationCode,
    Complete,
    Aborted,
}

pub struct SetupFlow {
    client: Arc<SpotifyClient>,
    state: SetupState,
}

impl SetupFlow {
    pub fn new(client: Arc<SpotifyClient>) -> Self {
        Self {
            client,
            state: SetupState::AwaitingCredentials,
        }
    }

    pub async fn handle(&mut self, msg: SetupMessage) -> SetupAction {
        match msg {
            SetupMessage::DriverSetupRequest {
                setup_data,
                reconfigure,
            } => self.handle_driver_setup_request(&setup_data, reconfigure),
            SetupMessage::UserDataResponse { input_values } => {
                self.handle_user_data_response(&input_values).await
            }
            SetupMessage::AbortDriverSetup { error } => self.handle_abort(error),
        }
    }

    fn handle_driver_setup_request(
        &mut self,
        setup_data: &serde_json::Map<String, Value>,
        reconfigure: bool,
    ) -> SetupAction {
        tracing::debug!("Handling driver setup request (reconfigure={})", reconfigure);
        let store = self.client.store();

        if store.is_configured() && !reconfigure {
            tracing::info!("Already configured, proceeding to completion");
            self.state = SetupState::Complete;
            return SetupAction::Complete;
        }

        self.state = SetupState::AwaitingCredentials;
        let client_id = string_field(setup_data, "client_id");
        let client_secret = string_field(setup_data, "client_secret");
        if client_id.is_empty() || client_secret.is_empty() {
            tracing::error!("Missing client ID or client secret in setup data");
            return SetupAction::Error(SetupErrorKind::Other);
        }

        let is_premium = parse_flag(setup_data.get("is_premium"));
        let persisted = store
            .set_credentials(&client_id, &client_secret)
            .and_then(|()| store.set_premium(is_premium))
            .and_then(|()| match parse_seconds(setup_data.get("polling_interval")) {
                Some(secs) => store.set_polling_interval(secs),
                None => Ok(()),
            });
        if let Err(e) = persisted {
            tracing::error!("Failed to save setup data: {:#}", e);
            return SetupAction::Error(SetupErrorKind::Other);
        }

        tracing::info!(
            "App credentials provided (premium={}), proceeding to authentication",
            is_premium
        );
        self.show_authentication_screen()
    }

    fn show_authentication_screen(&mut self) -> SetupAction {
        let auth_url = match self.client.authorization_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Failed to generate auth URL: {}", e);
                return SetupAction::Error(SetupErrorKind::Other);
            }
        };

        self.state = SetupState::AwaitingAuthorizationCode;
        SetupAction::RequestUserInput {
            title: "Spotify Authentication".to_string(),
            settings: vec![
                SetupField::label("instructions", "Authentication Instructions", INSTRUCTIONS),
                SetupField::read_only_text(
                    "spotify_url",
                    "Spotify Authorization URL (Click to Copy)",
                    auth_url.as_str(),
                ),
                SetupField::text_input(
                    AUTH_CODE_FIELD,
                    "Paste Code or Full URL Here",
                    "Paste the code or entire URL from your browser here...",
                ),
            ],
        }
    }

    async fn handle_user_data_response(
        &mut self,
        input_values: &HashMap<String, String>,
    ) -> SetupAction {
        if self.state != SetupState::AwaitingAuthorizationCode {
            tracing::error!("Unexpected user data in setup state {:?}", self.state);
            return SetupAction::Error(SetupErrorKind::Other);
        }

        let input = input_values
            .get(AUTH_CODE_FIELD)
            .map(String::as_str)
            .unwrap_or_default();
        let Some(code) = extract_authorization_code(input) else {
            tracing::error!("Could not extract authorization code from input");
            return SetupAction::Error(SetupErrorKind::Other);
        };

        tracing::info!("Exchanging authorization code for access tokens...");
        if self.client.exchange_code(&code).await {
            tracing::info!("Successfully authenticated with Spotify");
            self.state = SetupState::Complete;
            SetupAction::Complete
        } else {
            tracing::error!("Failed to authenticate with Spotify");
            SetupAction::Error(SetupErrorKind::AuthorizationError)
        }
    }

    fn handle_abort(&mut self, error: SetupErrorKind) -> SetupAction {
        tracing::info!("Setup aborted: {:?}", error);
        if let Err(e) = self.client.store().clear_tokens() {
            tracing::error!("Failed to clear tokens: {:#}", e);
        }
        self.state = SetupState::Aborted;
        SetupAction::Error(error)
    }
}

/// Pull the authorization code out of what the operator pasted.
///
/// A pasted callback URL yields the `code` query value; anything else is
/// taken verbatim. `None` when nothing usable remains.
pub fn extract_authorization_code(input: &str) -> Option<String> {
    let input = input.trim();
    let looks_like_callback = input.contains(CALLBACK_MARKER) || input.starts_with("http");

    let code = match input.split_once("code=") {
        Some((_, rest)) if looks_like_callback => {
            let code = rest.split('&').next().unwrap_or_default();
            tracing::info!(
                "Extracted code from URL (input length {}, code length {})",
                input.len(),
                code.len()
            );
            code
        }
        _ => input,
    };

    (!code.is_empty()).then(|| code.to_string())
}

fn string_field(data: &serde_json::Map<String, Value>, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Checkbox values arrive as booleans or as strings depending on the hub.
fn parse_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn parse_seconds(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
