//! Remote entity: button mapping and a control page for Premium accounts

use std::sync::Arc;

use serde_json::Value;

use crate::api::SpotifyClient;
use crate::error::{Error, Result};
use crate::hub::entity::{attr, ButtonMapping, EntityState, RemoteOptions, Size, UiItem, UiPage, UserInterface};
use crate::hub::{AttributeMap, EntityDefinition, EntityType, Feature, Hub, StatusCode};

pub const ENTITY_ID: &str = "spotify_remote_main";
const NAME: &str = "Spotify Remote";
const VOLUME_STEP: i64 = 10;

/// Remote command ids.
pub mod cmd {
    pub const ON: &str = "on";
    pub const OFF: &str = "off";
    pub const SEND_CMD: &str = "send_cmd";
}

/// Simple commands carried by `send_cmd`.
pub mod simple {
    pub const PLAY_PAUSE: &str = "PLAY_PAUSE";
    pub const NEXT: &str = "NEXT";
    pub const PREVIOUS: &str = "PREVIOUS";
    pub const VOLUME_UP: &str = "VOLUME_UP";
    pub const VOLUME_DOWN: &str = "VOLUME_DOWN";

    pub const ALL: [&str; 5] = [PLAY_PAUSE, NEXT, PREVIOUS, VOLUME_UP, VOLUME_DOWN];
}

pub struct Remote {
    client: Arc<SpotifyClient>,
    hub: Arc<dyn Hub>,
    definition: EntityDefinition,
    premium: bool,
}

impl Remote {
    pub fn new(client: Arc<SpotifyClient>, hub: Arc<dyn Hub>) -> Self {
        let premium = client.is_premium();
        let definition = definition(premium);
        tracing::info!("Spotify remote entity created");
        Self {
            client,
            hub,
            definition,
            premium,
        }
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    pub async fn handle_command(&self, cmd_id: &str, params: Option<&Value>) -> StatusCode {
        tracing::info!("Remote command: {} {:?}", cmd_id, params);
        match self.dispatch(cmd_id, params).await {
            Ok(()) => StatusCode::Ok,
            Err(e) => {
                tracing::warn!("Remote command {} not executed: {}", cmd_id, e);
                StatusCode::from(&e)
            }
        }
    }

    async fn dispatch(&self, cmd_id: &str, params: Option<&Value>) -> Result<()> {
        if !self.client.is_authenticated() {
            return Err(Error::Authentication(
                "Spotify client not authenticated".to_string(),
            ));
        }

        match cmd_id {
            cmd::ON => {
                self.publish_state(EntityState::On);
                Ok(())
            }
            cmd::OFF => {
                self.publish_state(EntityState::Off);
                Ok(())
            }
            cmd::SEND_CMD => self.send_command(params).await,
            other => Err(Error::Unsupported(format!("remote command {}", other))),
        }
    }

    async fn send_command(&self, params: Option<&Value>) -> Result<()> {
        if !self.premium {
            return Err(Error::TierRestricted(cmd::SEND_CMD.to_string()));
        }

        let command = params
            .and_then(|p| p.get("command"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Validation("'command' required".to_string()))?;
        tracing::debug!("Executing remote command for Premium user: {}", command);

        let ok = match command {
            simple::PLAY_PAUSE => self.client.play_pause().await,
            simple::NEXT => self.client.next_track().await,
            simple::PREVIOUS => self.client.previous_track().await,
            simple::VOLUME_UP => return self.step_volume(VOLUME_STEP).await,
            simple::VOLUME_DOWN => return self.step_volume(-VOLUME_STEP).await,
            other => return Err(Error::Unsupported(format!("simple command {}", other))),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Upstream(command.to_string()))
        }
    }

    /// Relative volume change from the device's live volume.
    async fn step_volume(&self, delta: i64) -> Result<()> {
        let Some(state) = self.client.playback_state().await else {
            return Err(Error::Upstream("no active playback state".to_string()));
        };
        if !state.supports_volume {
            return Err(Error::Unsupported(format!(
                "volume control on device {}",
                state.device_name
            )));
        }

        let target = i64::from(state.volume_percent) + delta;
        if self.client.set_volume(target).await {
            Ok(())
        } else {
            Err(Error::Upstream("set volume".to_string()))
        }
    }

    fn publish_state(&self, state: EntityState) {
        self.hub.update_attributes(
            ENTITY_ID,
            AttributeMap::from_iter([(attr::STATE.to_string(), state.into())]),
        );
    }
}

fn definition(premium: bool) -> EntityDefinition {
    let mut features = vec![Feature::OnOff];
    let mut options = RemoteOptions::default();

    let mut page = UiPage::new("main", "Spotify Controls", Size::new(4, 6));
    if premium {
        features.push(Feature::SendCmd);
        options.simple_commands = simple::ALL.iter().map(|c| c.to_string()).collect();
        options.button_mapping = vec![
            ButtonMapping::new("PLAY", simple::PLAY_PAUSE),
            ButtonMapping::new("NEXT", simple::NEXT),
            ButtonMapping::new("PREV", simple::PREVIOUS),
            ButtonMapping::new("VOLUME_UP", simple::VOLUME_UP),
            ButtonMapping::new("VOLUME_DOWN", simple::VOLUME_DOWN),
        ];
        page.add(UiItem::icon("uc:play-pause", 1, 1, Size::new(2, 1), simple::PLAY_PAUSE));
        page.add(UiItem::icon("uc:backward", 0, 2, Size::new(1, 1), simple::PREVIOUS));
        page.add(UiItem::icon("uc:forward", 3, 2, Size::new(1, 1), simple::NEXT));
        page.add(UiItem::icon("uc:volume-high", 1, 3, Size::new(1, 1), simple::VOLUME_UP));
        page.add(UiItem::icon("uc:volume-low", 2, 3, Size::new(1, 1), simple::VOLUME_DOWN));
    } else {
        page.add(UiItem::text("Spotify Premium required", 0, 1, Size::new(4, 1)));
        page.add(UiItem::text("for playback control", 0, 2, Size::new(4, 1)));
        page.add(UiItem::text("Display only mode", 0, 4, Size::new(4, 1)));
    }
    options.user_interface = UserInterface { pages: vec![page] };

    EntityDefinition {
        entity_id: ENTITY_ID.to_string(),
        entity_type: EntityType::Remote,
        name: NAME.to_string(),
        features,
        attributes: AttributeMap::from_iter([(attr::STATE.to_string(), EntityState::On.into())]),
        options: Some(options),
    }
}
