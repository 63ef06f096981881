//! Integration driver
//!
//! Owns the API client, the setup flow and (once authorized) the two entity
//! controllers, and routes hub events to them.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::api::SpotifyClient;
use crate::entities::{media_player, remote, MediaPlayer, Remote};
use crate::hub::{DeviceState, Hub, SetupAction, SetupMessage, StatusCode};
use crate::setup::SetupFlow;

#[derive(Clone)]
struct Entities {
    media_player: Arc<MediaPlayer>,
    remote: Arc<Remote>,
}

pub struct Driver {
    client: Arc<SpotifyClient>,
    hub: Arc<dyn Hub>,
    setup: Mutex<SetupFlow>,
    entities: RwLock<Option<Entities>>,
}

impl Driver {
    pub fn new(client: Arc<SpotifyClient>, hub: Arc<dyn Hub>) -> Self {
        Self {
            setup: Mutex::new(SetupFlow::new(client.clone())),
            client,
            hub,
            entities: RwLock::new(None),
        }
    }

    /// Bring the integration up from stored configuration.
    pub async fn start(&self) {
        tracing::info!("Starting Spotify integration driver");
        if !self.client.store().is_configured() {
            tracing::warn!("Integration is not configured, setting state to ERROR to prompt setup");
            self.hub.set_device_state(DeviceState::Error);
            return;
        }

        tracing::info!("Configuration found, refreshing tokens and connecting...");
        self.hub.set_device_state(DeviceState::Connecting);
        if self.client.refresh().await {
            tracing::info!("Token refresh successful");
            self.on_setup_complete().await;
        } else {
            tracing::error!("Failed to refresh tokens on startup, setting state to ERROR");
            self.hub.set_device_state(DeviceState::Error);
        }
    }

    pub async fn handle_setup(&self, msg: SetupMessage) -> SetupAction {
        let action = self.setup.lock().await.handle(msg).await;
        if action == SetupAction::Complete {
            self.on_setup_complete().await;
        }
        action
    }

    /// Build both controllers from the current preferences and announce them.
    async fn on_setup_complete(&self) {
        tracing::info!("Setup complete, creating entities...");

        // Preferences may have changed on reconfigure. The hub's subscription
        // outlives the old controller, so polling carries over.
        let mut was_polling = false;
        if let Some(old) = self.entities() {
            was_polling = old.media_player.is_polling().await;
            old.media_player.stop_polling().await;
        }

        let entities = Entities {
            media_player: MediaPlayer::new(self.client.clone(), self.hub.clone()),
            remote: Arc::new(Remote::new(self.client.clone(), self.hub.clone())),
        };
        self.hub.register_entity(entities.media_player.definition());
        self.hub.register_entity(entities.remote.definition());
        *self.entities.write().unwrap_or_else(PoisonError::into_inner) = Some(entities.clone());

        if was_polling {
            entities.media_player.start_polling().await;
        }

        tracing::info!("Entities created, setting state to CONNECTED");
        self.hub.set_device_state(DeviceState::Connected);
    }

    pub fn on_connect(&self) {
        tracing::info!("Hub connected");
        if self.client.store().is_configured() {
            tracing::info!("Re-confirming CONNECTED state for configured integration");
            self.hub.set_device_state(DeviceState::Connected);
        }
    }

    pub async fn subscribe(&self, entity_ids: &[String]) {
        tracing::info!("Hub subscribed to entities: {:?}", entity_ids);
        if let Some(entities) = self.entities() {
            if entity_ids.iter().any(|id| id == media_player::ENTITY_ID) {
                entities.media_player.start_polling().await;
            }
        }
    }

    pub async fn unsubscribe(&self, entity_ids: &[String]) {
        tracing::info!("Hub unsubscribed from entities: {:?}", entity_ids);
        if let Some(entities) = self.entities() {
            if entity_ids.iter().any(|id| id == media_player::ENTITY_ID) {
                entities.media_player.stop_polling().await;
            }
        }
    }

    pub async fn handle_command(
        &self,
        entity_id: &str,
        cmd_id: &str,
        params: Option<&Value>,
    ) -> StatusCode {
        let Some(entities) = self.entities() else {
            tracing::warn!("Command {} for {} before setup completed", cmd_id, entity_id);
            return StatusCode::ServiceUnavailable;
        };

        match entity_id {
            media_player::ENTITY_ID => entities.media_player.handle_command(cmd_id, params).await,
            remote::ENTITY_ID => entities.remote.handle_command(cmd_id, params).await,
            other => {
                tracing::warn!("Command {} for unknown entity {}", cmd_id, other);
                StatusCode::BadRequest
            }
        }
    }

    pub async fn shutdown(&self) {
        tracing::info!("Shutting down Spotify integration driver");
        let entities = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(entities) = entities {
            entities.media_player.stop_polling().await;
        }
        self.hub.set_device_state(DeviceState::Disconnected);
    }

    fn entities(&self) -> Option<Entities> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::client_for;
    use crate::auth::Endpoints;
    use crate::auth::TokenStore;
    use crate::config::ConfigStore;
    use crate::hub::testing::RecordingHub;
    use crate::setup::AUTH_CODE_FIELD;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "token_type": "Bearer",
            "expires_in": 3600
        }))
    }

    async fn started(server: &MockServer, dir: &tempfile::TempDir) -> (Driver, Arc<RecordingHub>) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(token_ok())
            .mount(server)
            .await;
        let client = client_for(server, dir, true).await;
        let hub = Arc::new(RecordingHub::default());
        let driver = Driver::new(client, hub.clone());
        driver.start().await;
        (driver, hub)
    }

    #[tokio::test]
    async fn test_start_unconfigured() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::open(dir.path()));
        let client =
            Arc::new(SpotifyClient::with_endpoints(store, Endpoints::rooted_at(&server.uri())).unwrap());
        let hub = Arc::new(RecordingHub::default());
        let driver = Driver::new(client, hub.clone());

        driver.start().await;
        assert_eq!(hub.states(), vec![DeviceState::Error]);
        assert!(hub.entity_ids().is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());

        driver.on_connect();
        assert_eq!(hub.states(), vec![DeviceState::Error]);
    }

    #[tokio::test]
    async fn test_start_configured_registers_entities() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (driver, hub) = started(&server, &dir).await;

        assert_eq!(hub.states(), vec![DeviceState::Connecting, DeviceState::Connected]);
        assert_eq!(
            hub.entity_ids(),
            vec![media_player::ENTITY_ID.to_string(), remote::ENTITY_ID.to_string()]
        );
        assert_eq!(
            driver.client.store().access_token().as_deref(),
            Some("new-access")
        );

        driver.on_connect();
        assert_eq!(hub.states().last(), Some(&DeviceState::Connected));
        assert_eq!(hub.states().len(), 3);
    }

    #[tokio::test]
    async fn test_start_refresh_failure() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let client = client_for(&server, &dir, true).await;
        let hub = Arc::new(RecordingHub::default());
        let driver = Driver::new(client, hub.clone());

        driver.start().await;
        assert_eq!(hub.states(), vec![DeviceState::Connecting, DeviceState::Error]);
        assert!(hub.entity_ids().is_empty());
    }

    #[tokio::test]
    async fn test_command_routing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir, false).await;
        let hub = Arc::new(RecordingHub::default());
        let driver = Driver::new(client, hub.clone());

        assert_eq!(
            driver.handle_command(media_player::ENTITY_ID, "next", None).await,
            StatusCode::ServiceUnavailable
        );

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(token_ok())
            .mount(&server)
            .await;
        driver.start().await;

        assert_eq!(
            driver.handle_command("light.kitchen", "on", None).await,
            StatusCode::BadRequest
        );
        assert_eq!(
            driver.handle_command(remote::ENTITY_ID, "off", None).await,
            StatusCode::Ok
        );
        assert_eq!(
            driver.handle_command(media_player::ENTITY_ID, "next", None).await,
            StatusCode::Ok
        );
        assert_eq!(hub.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_controls_polling() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let (driver, hub) = started(&server, &dir).await;
        let player = driver.entities().unwrap().media_player;

        driver.subscribe(&[remote::ENTITY_ID.to_string()]).await;
        assert!(!player.is_polling().await);

        driver
            .subscribe(&[media_player::ENTITY_ID.to_string(), remote::ENTITY_ID.to_string()])
            .await;
        assert!(player.is_polling().await);

        driver.unsubscribe(&[media_player::ENTITY_ID.to_string()]).await;
        assert!(!player.is_polling().await);

        driver.subscribe(&[media_player::ENTITY_ID.to_string()]).await;
        driver.shutdown().await;
        assert!(!player.is_polling().await);
        assert_eq!(hub.states().last(), Some(&DeviceState::Disconnected));
        assert_eq!(
            driver.handle_command(media_player::ENTITY_ID, "next", None).await,
            StatusCode::ServiceUnavailable
        );
    }

    #[tokio::test]
    async fn test_setup_completion_creates_entities() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::open(dir.path()));
        let client =
            Arc::new(SpotifyClient::with_endpoints(store, Endpoints::rooted_at(&server.uri())).unwrap());
        let hub = Arc::new(RecordingHub::default());
        let driver = Driver::new(client, hub.clone());

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access",
                "refresh_token": "refresh",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let action = driver
            .handle_setup(SetupMessage::DriverSetupRequest {
                setup_data: json!({"client_id": "id", "client_secret": "secret", "is_premium": true})
                    .as_object()
                    .cloned()
                    .unwrap(),
                reconfigure: false,
            })
            .await;
        assert!(matches!(action, SetupAction::RequestUserInput { .. }));
        assert!(hub.entity_ids().is_empty());

        let action = driver
            .handle_setup(SetupMessage::UserDataResponse {
                input_values: HashMap::from([(
                    AUTH_CODE_FIELD.to_string(),
                    "https://example.com/callback?code=AQD".to_string(),
                )]),
            })
            .await;
        assert_eq!(action, SetupAction::Complete);
        assert_eq!(hub.states(), vec![DeviceState::Connected]);
        assert_eq!(hub.entity_ids().len(), 2);
        let registered = hub.entities.lock().unwrap();
        assert!(registered[0].has_feature(crate::hub::Feature::Next));
    }

    #[tokio::test]
    async fn test_setup_reentry_keeps_polling_for_subscribed_player() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let (driver, _hub) = started(&server, &dir).await;
        driver.subscribe(&[media_player::ENTITY_ID.to_string()]).await;
        let old = driver.entities().unwrap().media_player;

        let action = driver
            .handle_setup(SetupMessage::DriverSetupRequest {
                setup_data: serde_json::Map::new(),
                reconfigure: false,
            })
            .await;
        assert_eq!(action, SetupAction::Complete);

        let new = driver.entities().unwrap().media_player;
        assert!(!Arc::ptr_eq(&old, &new));
        assert!(!old.is_polling().await);
        assert!(new.is_polling().await);

        // A second start rebuilds again and still polls.
        driver.start().await;
        assert!(driver.entities().unwrap().media_player.is_polling().await);
        driver.shutdown().await;
    }

    #[tokio::test]
    async fn test_setup_reentry_without_subscription_does_not_poll() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (driver, _hub) = started(&server, &dir).await;

        driver.start().await;
        assert!(!driver.entities().unwrap().media_player.is_polling().await);
    }
}
