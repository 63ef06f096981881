//! Setup messages exchanged with the hub during driver setup

use std::collections::HashMap;

use serde::Serialize;

/// Inbound setup message.
#[derive(Debug, Clone)]
pub enum SetupMessage {
    /// Operator started (or restarted) setup with the form's values.
    DriverSetupRequest {
        setup_data: serde_json::Map<String, serde_json::Value>,
        reconfigure: bool,
    },
    /// Operator answered a `RequestUserInput` screen.
    UserDataResponse { input_values: HashMap<String, String> },
    /// Hub or operator cancelled setup.
    AbortDriverSetup { error: SetupErrorKind },
}

/// Outbound setup response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SetupAction {
    Complete,
    RequestUserInput {
        title: String,
        settings: Vec<SetupField>,
    },
    Error(SetupErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupErrorKind {
    None,
    AuthorizationError,
    Other,
}

/// One row on a `RequestUserInput` screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupField {
    pub id: String,
    pub label: String,
    pub field: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Static text.
    Label { value: String },
    /// Text input, optionally read-only.
    Text {
        value: String,
        read_only: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
}

impl SetupField {
    pub fn label(id: &str, label: &str, value: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            field: FieldKind::Label {
                value: value.to_string(),
            },
        }
    }

    pub fn read_only_text(id: &str, label: &str, value: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            field: FieldKind::Text {
                value: value.to_string(),
                read_only: true,
                placeholder: None,
            },
        }
    }

    pub fn text_input(id: &str, label: &str, placeholder: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            field: FieldKind::Text {
                value: String::new(),
                read_only: false,
                placeholder: Some(placeholder.to_string()),
            },
        }
    }

    /// Current value, for text and label fields alike.
    pub fn value(&self) -> &str {
        match &self.field {
            FieldKind::Label { value } | FieldKind::Text { value, .. } => value,
        }
    }
}
