//! Media player entity: now-playing display and, for Premium, transport control

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use super::poller::Poller;
use crate::api::SpotifyClient;
use crate::error::{Error, Result};
use crate::hub::entity::{attr, EntityState};
use crate::hub::{AttributeMap, DeviceState, EntityDefinition, EntityType, Feature, Hub, StatusCode};
use crate::models::{PlaybackSnapshot, DEFAULT_VOLUME};

pub const ENTITY_ID: &str = "spotify_media_player_main";
const NAME: &str = "Spotify Player";
const VOLUME_STEP: i64 = 5;

/// Media player command ids.
pub mod cmd {
    pub const ON: &str = "on";
    pub const OFF: &str = "off";
    pub const PLAY_PAUSE: &str = "play_pause";
    pub const NEXT: &str = "next";
    pub const PREVIOUS: &str = "previous";
    pub const VOLUME: &str = "volume";
    pub const VOLUME_UP: &str = "volume_up";
    pub const VOLUME_DOWN: &str = "volume_down";
    pub const MUTE_TOGGLE: &str = "mute_toggle";
    pub const MUTE: &str = "mute";
    pub const UNMUTE: &str = "unmute";
    pub const SHUFFLE: &str = "shuffle";
    pub const REPEAT: &str = "repeat";
    pub const SEEK: &str = "seek";
    pub const STOP: &str = "stop";
    pub const FAST_FORWARD: &str = "fast_forward";
    pub const REWIND: &str = "rewind";
}

/// Acknowledged without an upstream call on free accounts.
const PREMIUM_COMMANDS: [&str; 15] = [
    cmd::PLAY_PAUSE,
    cmd::NEXT,
    cmd::PREVIOUS,
    cmd::VOLUME,
    cmd::VOLUME_UP,
    cmd::VOLUME_DOWN,
    cmd::MUTE_TOGGLE,
    cmd::MUTE,
    cmd::UNMUTE,
    cmd::SHUFFLE,
    cmd::REPEAT,
    cmd::SEEK,
    cmd::STOP,
    cmd::FAST_FORWARD,
    cmd::REWIND,
];

pub struct MediaPlayer {
    client: Arc<SpotifyClient>,
    hub: Arc<dyn Hub>,
    definition: EntityDefinition,
    premium: bool,
    /// Attributes as last sent to the hub.
    published: Mutex<AttributeMap>,
    poller: tokio::sync::Mutex<Option<Poller>>,
    revocation_reported: AtomicBool,
}

impl MediaPlayer {
    pub fn new(client: Arc<SpotifyClient>, hub: Arc<dyn Hub>) -> Arc<Self> {
        let premium = client.is_premium();
        if premium {
            tracing::info!("User has Spotify Premium - enabling playback controls");
        } else {
            tracing::info!("User has Spotify Free - display only mode");
        }

        let definition = definition(premium);
        tracing::info!(
            "Spotify media player entity created with {} features",
            definition.features.len()
        );
        Arc::new(Self {
            client,
            hub,
            published: Mutex::new(definition.attributes.clone()),
            definition,
            premium,
            poller: tokio::sync::Mutex::new(None),
            revocation_reported: AtomicBool::new(false),
        })
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    pub async fn handle_command(&self, cmd_id: &str, params: Option<&Value>) -> StatusCode {
        tracing::info!("Media player command: {} {:?}", cmd_id, params);
        match self.dispatch(cmd_id, params).await {
            Ok(()) => StatusCode::Ok,
            Err(e @ Error::TierRestricted(_)) => {
                tracing::info!("{} - acknowledged for Free user (display only)", e);
                StatusCode::from(&e)
            }
            Err(e) => {
                tracing::warn!("Media player command {} failed: {}", cmd_id, e);
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
            cmd::ON => return self.set_power(true).await,
            cmd::OFF => return self.set_power(false).await,
            _ => {}
        }

        if !self.premium && PREMIUM_COMMANDS.contains(&cmd_id) {
            return Err(Error::TierRestricted(cmd_id.to_string()));
        }

        match cmd_id {
            cmd::PLAY_PAUSE => upstream(cmd_id, self.client.play_pause().await),
            cmd::NEXT => upstream(cmd_id, self.client.next_track().await),
            cmd::PREVIOUS => upstream(cmd_id, self.client.previous_track().await),
            cmd::VOLUME => {
                let volume = params
                    .and_then(|p| p.get("volume"))
                    .and_then(numeric)
                    .ok_or_else(|| Error::Validation("numeric 'volume' required".to_string()))?;
                self.apply_volume(volume).await
            }
            cmd::VOLUME_UP => self.apply_volume(self.current_volume() + VOLUME_STEP).await,
            cmd::VOLUME_DOWN => self.apply_volume(self.current_volume() - VOLUME_STEP).await,
            other => {
                tracing::debug!("Ignoring media player command {}", other);
                Ok(())
            }
        }
    }

    /// ON/OFF map to play/pause for Premium and are a no-op otherwise.
    async fn set_power(&self, on: bool) -> Result<()> {
        if !self.premium {
            tracing::info!(
                "{} command acknowledged for Free user (display only)",
                if on { "ON" } else { "OFF" }
            );
            return Ok(());
        }

        let (ok, state) = if on {
            (self.client.play().await, EntityState::Playing)
        } else {
            (self.client.pause().await, EntityState::Paused)
        };
        upstream(if on { cmd::ON } else { cmd::OFF }, ok)?;
        self.publish(AttributeMap::from_iter([(attr::STATE.to_string(), state.into())]));
        Ok(())
    }

    async fn apply_volume(&self, volume: i64) -> Result<()> {
        let volume = crate::api::clamp_volume(volume);
        upstream(cmd::VOLUME, self.client.set_volume(i64::from(volume)).await)?;
        self.publish(AttributeMap::from_iter([(
            attr::VOLUME.to_string(),
            Value::from(volume),
        )]));
        Ok(())
    }

    fn current_volume(&self) -> i64 {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(attr::VOLUME)
            .and_then(Value::as_i64)
            .unwrap_or(i64::from(DEFAULT_VOLUME))
    }

    /// Start the now-playing loop unless it is already running.
    pub async fn start_polling(self: &Arc<Self>) {
        let mut poller = self.poller.lock().await;
        if poller.as_ref().is_some_and(Poller::is_running) {
            return;
        }

        let player = Arc::downgrade(self);
        *poller = Some(Poller::spawn(
            "Spotify",
            self.client.polling_interval(),
            move || {
                let player = player.clone();
                async move {
                    if let Some(player) = player.upgrade() {
                        player.poll_once().await;
                    }
                }
            },
        ));
    }

    pub async fn stop_polling(&self) {
        let poller = self.poller.lock().await.take();
        if let Some(poller) = poller {
            poller.stop().await;
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .await
            .as_ref()
            .is_some_and(Poller::is_running)
    }

    /// One polling tick: fetch now-playing and publish what changed.
    pub async fn poll_once(&self) {
        if self.client.is_authenticated() {
            match self.client.now_playing().await {
                Some(snapshot) => self.publish(snapshot_attributes(&snapshot)),
                None => self.clear_track(),
            }
        } else {
            tracing::debug!("Polling skipped: client not authenticated");
        }
        self.check_revocation();
    }

    fn check_revocation(&self) {
        if !self.client.is_revoked() {
            self.revocation_reported.store(false, Ordering::SeqCst);
            return;
        }
        if !self.revocation_reported.swap(true, Ordering::SeqCst) {
            tracing::error!("Spotify refresh token was rejected, re-run setup to authorize again");
            self.hub.set_device_state(DeviceState::Error);
        }
    }

    fn clear_track(&self) {
        let is_off = self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(attr::STATE)
            .is_some_and(|state| *state == Value::from(EntityState::Off));
        if !is_off {
            self.publish(cleared_attributes());
            tracing::debug!("Cleared current track information");
        }
    }

    /// Send the attributes that differ from what was last published.
    fn publish(&self, attributes: AttributeMap) {
        let mut changed = AttributeMap::new();
        {
            let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
            for (key, value) in attributes {
                if published.get(&key) != Some(&value) {
                    published.insert(key.clone(), value.clone());
                    changed.insert(key, value);
                }
            }
        }

        if !changed.is_empty() {
            tracing::debug!(
                "Updated media player attributes: {}",
                serde_json::Value::Object(changed.clone())
            );
            self.hub.update_attributes(ENTITY_ID, changed);
        }
    }
}

fn upstream(cmd_id: &str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Upstream(cmd_id.to_string()))
    }
}

fn numeric(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn definition(premium: bool) -> EntityDefinition {
    let mut features = vec![
        Feature::OnOff,
        Feature::MediaDuration,
        Feature::MediaPosition,
        Feature::MediaTitle,
        Feature::MediaArtist,
        Feature::MediaAlbum,
        Feature::MediaImageUrl,
        Feature::MediaType,
    ];
    if premium {
        features.extend([
            Feature::PlayPause,
            Feature::Next,
            Feature::Previous,
            Feature::Volume,
            Feature::VolumeUpDown,
        ]);
    }

    let mut attributes = cleared_attributes();
    attributes.insert(attr::VOLUME.to_string(), Value::from(DEFAULT_VOLUME));
    attributes.insert(attr::MUTED.to_string(), Value::Bool(false));

    EntityDefinition {
        entity_id: ENTITY_ID.to_string(),
        entity_type: EntityType::MediaPlayer,
        name: NAME.to_string(),
        features,
        attributes,
        options: None,
    }
}

fn cleared_attributes() -> AttributeMap {
    AttributeMap::from_iter([
        (attr::STATE.to_string(), EntityState::Off.into()),
        (attr::MEDIA_TITLE.to_string(), Value::from("")),
        (attr::MEDIA_ARTIST.to_string(), Value::from("")),
        (attr::MEDIA_ALBUM.to_string(), Value::from("")),
        (attr::MEDIA_DURATION.to_string(), Value::from(0)),
        (attr::MEDIA_POSITION.to_string(), Value::from(0)),
        (attr::MEDIA_IMAGE_URL.to_string(), Value::from("")),
    ])
}

fn snapshot_attributes(snapshot: &PlaybackSnapshot) -> AttributeMap {
    let state = if snapshot.is_playing {
        EntityState::Playing
    } else {
        EntityState::Paused
    };
    let mut attributes = AttributeMap::from_iter([
        (attr::STATE.to_string(), state.into()),
        (attr::MEDIA_TITLE.to_string(), Value::from(snapshot.title.as_str())),
        (attr::MEDIA_ARTIST.to_string(), Value::from(snapshot.artist_line())),
        (attr::MEDIA_ALBUM.to_string(), Value::from(snapshot.album.as_str())),
        (attr::MEDIA_DURATION.to_string(), Value::from(snapshot.duration_secs())),
        (attr::MEDIA_POSITION.to_string(), Value::from(snapshot.position_secs())),
        (
            attr::MEDIA_IMAGE_URL.to_string(),
            Value::from(snapshot.image_url.as_deref().unwrap_or_default()),
        ),
    ]);
    if let Some(volume) = snapshot.volume_percent {
        attributes.insert(attr::VOLUME.to_string(), Value::from(volume));
        attributes.insert(attr::MUTED.to_string(), Value::Bool(volume == 0));
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::client_for;
    use crate::auth::TokenStore;
    use crate::hub::testing::RecordingHub;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn player(
        server: &MockServer,
        dir: &tempfile::TempDir,
        premium: bool,
    ) -> (Arc<MediaPlayer>, Arc<RecordingHub>) {
        let client = client_for(server, dir, false).await;
        client.store().set_premium(premium).unwrap();
        let hub = Arc::new(RecordingHub::default());
        (MediaPlayer::new(client, hub.clone()), hub)
    }

    fn attributes(player: &MediaPlayer) -> AttributeMap {
        player.published.lock().unwrap().clone()
    }

    fn track(position_ms: u64) -> serde_json::Value {
        json!({
            "is_playing": true,
            "progress_ms": position_ms,
            "item": {
                "name": "Hyperballad",
                "duration_ms": 321_000,
                "artists": [{"name": "Björk"}],
                "album": {"name": "Post", "images": [{"url": "https://i.scdn.co/post"}]}
            }
        })
    }

    async fn mount_volume(server: &MockServer, expected: &str) {
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/volume"))
            .and(query_param("volume_percent", expected))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_definition_by_tier() {
        let free = definition(false);
        assert!(free.has_feature(Feature::MediaTitle));
        assert!(!free.has_feature(Feature::Next));
        assert_eq!(free.attributes[attr::STATE], json!("OFF"));
        assert_eq!(free.attributes[attr::VOLUME], json!(50));
        assert_eq!(free.attributes[attr::MUTED], json!(false));

        let premium = definition(true);
        for feature in [
            Feature::PlayPause,
            Feature::Next,
            Feature::Previous,
            Feature::Volume,
            Feature::VolumeUpDown,
        ] {
            assert!(premium.has_feature(feature));
        }
    }

    #[tokio::test]
    async fn test_free_tier_next_is_acknowledged_without_upstream_call() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, hub) = player(&server, &dir, false).await;

        assert_eq!(player.handle_command(cmd::NEXT, None).await, StatusCode::Ok);
        assert_eq!(player.handle_command(cmd::ON, None).await, StatusCode::Ok);
        assert_eq!(
            player.handle_command(cmd::VOLUME, Some(&json!({"volume": 10}))).await,
            StatusCode::Ok
        );
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(hub.updates().is_empty());
    }

    #[tokio::test]
    async fn test_premium_transport_commands_reach_upstream() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, _hub) = player(&server, &dir, true).await;

        Mock::given(method("POST"))
            .and(path("/v1/me/player/next"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_playing": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/me/player/previous"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(player.handle_command(cmd::NEXT, None).await, StatusCode::Ok);
        assert_eq!(player.handle_command(cmd::PLAY_PAUSE, None).await, StatusCode::Ok);
        assert_eq!(
            player.handle_command(cmd::PREVIOUS, None).await,
            StatusCode::ServerError
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_is_service_unavailable() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, _hub) = player(&server, &dir, true).await;
        player.client.store().clear_tokens().unwrap();

        assert_eq!(
            player.handle_command(cmd::PLAY_PAUSE, None).await,
            StatusCode::ServiceUnavailable
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_volume_steps_clamp_at_bounds() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, hub) = player(&server, &dir, true).await;

        mount_volume(&server, "98").await;
        mount_volume(&server, "100").await;
        mount_volume(&server, "3").await;
        mount_volume(&server, "0").await;

        let volume = |v: i64| json!({ "volume": v });
        assert_eq!(player.handle_command(cmd::VOLUME, Some(&volume(98))).await, StatusCode::Ok);
        assert_eq!(player.handle_command(cmd::VOLUME_UP, None).await, StatusCode::Ok);
        assert_eq!(attributes(&player)[attr::VOLUME], json!(100));

        assert_eq!(player.handle_command(cmd::VOLUME, Some(&volume(3))).await, StatusCode::Ok);
        assert_eq!(player.handle_command(cmd::VOLUME_DOWN, None).await, StatusCode::Ok);
        assert_eq!(attributes(&player)[attr::VOLUME], json!(0));

        let published: Vec<_> = hub
            .updates()
            .into_iter()
            .map(|(_, attrs)| attrs[attr::VOLUME].clone())
            .collect();
        assert_eq!(published, vec![json!(98), json!(100), json!(3), json!(0)]);
    }

    #[tokio::test]
    async fn test_volume_requires_numeric_parameter() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, _hub) = player(&server, &dir, true).await;

        assert_eq!(player.handle_command(cmd::VOLUME, None).await, StatusCode::BadRequest);
        assert_eq!(
            player.handle_command(cmd::VOLUME, Some(&json!({"volume": "loud"}))).await,
            StatusCode::BadRequest
        );
        assert_eq!(
            player.handle_command(cmd::VOLUME, Some(&json!({"level": 10}))).await,
            StatusCode::BadRequest
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_volume_is_not_published() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, hub) = player(&server, &dir, true).await;

        Mock::given(method("PUT"))
            .and(path("/v1/me/player/volume"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(
            player.handle_command(cmd::VOLUME, Some(&json!({"volume": 70}))).await,
            StatusCode::ServerError
        );
        assert!(hub.updates().is_empty());
        assert_eq!(attributes(&player)[attr::VOLUME], json!(50));
    }

    #[tokio::test]
    async fn test_premium_power_maps_to_play_pause() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, hub) = player(&server, &dir, true).await;

        Mock::given(method("PUT"))
            .and(path("/v1/me/player/play"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(player.handle_command(cmd::ON, None).await, StatusCode::Ok);
        assert_eq!(attributes(&player)[attr::STATE], json!("PLAYING"));
        assert_eq!(player.handle_command(cmd::OFF, None).await, StatusCode::ServerError);
        assert_eq!(attributes(&player)[attr::STATE], json!("PLAYING"));
        assert_eq!(hub.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_is_ignored() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, _hub) = player(&server, &dir, true).await;

        assert_eq!(player.handle_command("select_source", None).await, StatusCode::Ok);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_polling_publishes_only_changes() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, hub) = player(&server, &dir, false).await;

        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track(10_000)))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track(15_000)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        player.poll_once().await;
        let updates = hub.updates();
        assert_eq!(updates.len(), 1);
        let (entity_id, first) = &updates[0];
        assert_eq!(entity_id, ENTITY_ID);
        assert_eq!(first[attr::STATE], json!("PLAYING"));
        assert_eq!(first[attr::MEDIA_TITLE], json!("Hyperballad"));
        assert_eq!(first[attr::MEDIA_ARTIST], json!("Björk"));
        assert_eq!(first[attr::MEDIA_DURATION], json!(321));
        assert_eq!(first[attr::MEDIA_POSITION], json!(10));
        assert_eq!(first[attr::MEDIA_IMAGE_URL], json!("https://i.scdn.co/post"));
        // currently-playing carries no device, so volume is left alone.
        assert!(!first.contains_key(attr::VOLUME));

        // Identical snapshot: nothing to send.
        player.poll_once().await;
        assert_eq!(hub.updates().len(), 1);

        player.poll_once().await;
        let updates = hub.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[1].1,
            AttributeMap::from_iter([(attr::MEDIA_POSITION.to_string(), json!(15))])
        );

        // Nothing playing: cleared once.
        player.poll_once().await;
        player.poll_once().await;
        let updates = hub.updates();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].1[attr::STATE], json!("OFF"));
        assert_eq!(updates[2].1[attr::MEDIA_TITLE], json!(""));
    }

    #[tokio::test]
    async fn test_idle_account_does_not_clear_when_already_off() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, hub) = player(&server, &dir, false).await;

        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        player.poll_once().await;
        assert!(hub.updates().is_empty());
    }

    #[tokio::test]
    async fn test_revocation_reported_once() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, &dir, true).await;
        let hub = Arc::new(RecordingHub::default());
        let player = MediaPlayer::new(client, hub.clone());

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .expect(1)
            .mount(&server)
            .await;

        player.poll_once().await;
        player.poll_once().await;
        assert_eq!(hub.states(), vec![DeviceState::Error]);
    }

    #[tokio::test]
    async fn test_start_polling_is_idempotent() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let (player, _hub) = player(&server, &dir, false).await;

        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        player.start_polling().await;
        player.start_polling().await;
        assert!(player.is_polling().await);

        player.stop_polling().await;
        assert!(!player.is_polling().await);
        // Stopping twice is harmless.
        player.stop_polling().await;
    }
}
