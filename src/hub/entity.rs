//! Entity definitions published to the hub

use serde::Serialize;

use super::AttributeMap;

/// Attribute names shared with the hub.
pub mod attr {
    pub const STATE: &str = "state";
    pub const MEDIA_TITLE: &str = "media_title";
    pub const MEDIA_ARTIST: &str = "media_artist";
    pub const MEDIA_ALBUM: &str = "media_album";
    pub const MEDIA_DURATION: &str = "media_duration";
    pub const MEDIA_POSITION: &str = "media_position";
    pub const MEDIA_IMAGE_URL: &str = "media_image_url";
    pub const VOLUME: &str = "volume";
    pub const MUTED: &str = "muted";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    MediaPlayer,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    OnOff,
    MediaDuration,
    MediaPosition,
    MediaTitle,
    MediaArtist,
    MediaAlbum,
    MediaImageUrl,
    MediaType,
    PlayPause,
    Next,
    Previous,
    Volume,
    VolumeUpDown,
    SendCmd,
}

/// Value of the `state` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityState {
    On,
    Off,
    Playing,
    Paused,
}

impl EntityState {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityState::On => "ON",
            EntityState::Off => "OFF",
            EntityState::Playing => "PLAYING",
            EntityState::Paused => "PAUSED",
        }
    }
}

impl From<EntityState> for serde_json::Value {
    fn from(state: EntityState) -> Self {
        serde_json::Value::from(state.as_str())
    }
}

/// An entity as the hub sees it: identity, capabilities and initial state.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDefinition {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub features: Vec<Feature>,
    pub attributes: AttributeMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<RemoteOptions>,
}

impl EntityDefinition {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// Remote-specific options: command list, physical buttons and screen layout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoteOptions {
    pub simple_commands: Vec<String>,
    pub button_mapping: Vec<ButtonMapping>,
    pub user_interface: UserInterface,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserInterface {
    pub pages: Vec<UiPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityCommand {
    pub cmd_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonMapping {
    pub button: String,
    pub short_press: EntityCommand,
}

impl ButtonMapping {
    pub fn new(button: &str, cmd_id: &str) -> Self {
        Self {
            button: button.to_string(),
            short_press: EntityCommand {
                cmd_id: cmd_id.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u8,
    pub height: u8,
}

impl Size {
    pub const fn new(width: u8, height: u8) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiItemKind {
    Icon,
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiItem {
    #[serde(rename = "type")]
    pub kind: UiItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub location: Location,
    pub size: Size,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<EntityCommand>,
}

impl UiItem {
    pub fn icon(icon: &str, x: u8, y: u8, size: Size, cmd_id: &str) -> Self {
        Self {
            kind: UiItemKind::Icon,
            icon: Some(icon.to_string()),
            text: None,
            location: Location { x, y },
            size,
            command: Some(EntityCommand {
                cmd_id: cmd_id.to_string(),
            }),
        }
    }

    pub fn text(text: &str, x: u8, y: u8, size: Size) -> Self {
        Self {
            kind: UiItemKind::Text,
            icon: None,
            text: Some(text.to_string()),
            location: Location { x, y },
            size,
            command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UiPage {
    pub page_id: String,
    pub name: String,
    pub grid: Size,
    pub items: Vec<UiItem>,
}

impl UiPage {
    pub fn new(page_id: &str, name: &str, grid: Size) -> Self {
        Self {
            page_id: page_id.to_string(),
            name: name.to_string(),
            grid,
            items: Vec::new(),
        }
    }

    pub fn add(&mut self, item: UiItem) {
        self.items.push(item);
    }
}
