//! Player endpoints (/me/player)

use reqwest::Method;

use super::client::{ApiResponse, SpotifyClient};
use crate::models::{PlaybackSnapshot, PlaybackState, PlayerResponse};

/// Clamp a requested volume into the range the API accepts.
pub fn clamp_volume(percent: i64) -> u8 {
    // In range after the clamp, so the cast cannot truncate.
    percent.clamp(0, 100) as u8
}

impl SpotifyClient {
    /// Track currently loaded on the active device, if any.
    ///
    /// An idle account and a failed request both yield `None`.
    pub async fn now_playing(&self) -> Option<PlaybackSnapshot> {
        let body = self
            .authenticated_request(Method::GET, "/me/player/currently-playing", &[])
            .await
            .into_json()?;
        PlaybackSnapshot::from_player(parse_player(body)?)
    }

    /// Transport and device state, `None` when no device is active.
    pub async fn playback_state(&self) -> Option<PlaybackState> {
        let body = self
            .authenticated_request(Method::GET, "/me/player", &[])
            .await
            .into_json()?;
        parse_player(body).map(PlaybackState::from)
    }

    pub async fn play(&self) -> bool {
        self.player_command(Method::PUT, "/me/player/play", &[]).await
    }

    pub async fn pause(&self) -> bool {
        self.player_command(Method::PUT, "/me/player/pause", &[]).await
    }

    /// Toggle: one read of the player state, then play or pause.
    pub async fn play_pause(&self) -> bool {
        let Some(state) = self.playback_state().await else {
            return false;
        };
        if state.is_playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    pub async fn next_track(&self) -> bool {
        self.player_command(Method::POST, "/me/player/next", &[]).await
    }

    pub async fn previous_track(&self) -> bool {
        self.player_command(Method::POST, "/me/player/previous", &[]).await
    }

    /// Set device volume; out-of-range values are clamped, not rejected.
    pub async fn set_volume(&self, percent: i64) -> bool {
        let percent = clamp_volume(percent);
        self.player_command(
            Method::PUT,
            "/me/player/volume",
            &[("volume_percent", percent.to_string())],
        )
        .await
    }

    async fn player_command(&self, method: Method, path: &str, query: &[(&str, String)]) -> bool {
        self.authenticated_request(method, path, query)
            .await
            .is_success()
    }
}

fn parse_player(body: serde_json::Value) -> Option<PlayerResponse> {
    serde_json::from_value(body)
        .map_err(|e| tracing::warn!("Unexpected player payload: {}", e))
        .ok()
}
