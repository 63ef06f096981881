//! Player payloads from the Web API and the records the driver works with

use serde::Deserialize;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_DEVICE: &str = "Unknown";
pub const DEFAULT_VOLUME: u8 = 50;

/// Body of `/me/player` and `/me/player/currently-playing`.
///
/// The second endpoint omits `device`; podcast episodes omit `artists` and
/// `album`. Any field may also arrive as an explicit `null`, so everything
/// is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlayerResponse {
    pub is_playing: Option<bool>,
    pub progress_ms: Option<u64>,
    pub item: Option<TrackItem>,
    pub device: Option<DeviceInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackItem {
    pub name: Option<String>,
    pub duration_ms: Option<u64>,
    pub artists: Option<Vec<ArtistRef>>,
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArtistRef {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AlbumRef {
    pub name: Option<String>,
    pub images: Option<Vec<ImageRef>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub name: Option<String>,
    pub volume_percent: Option<u8>,
    pub supports_volume: Option<bool>,
}

/// What is playing right now, produced fresh on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: u64,
    pub position_ms: u64,
    pub image_url: Option<String>,
    /// Only known when the payload carried a device.
    pub volume_percent: Option<u8>,
    pub device_name: Option<String>,
}

impl PlaybackSnapshot {
    /// `None` when nothing is loaded on any device.
    pub fn from_player(resp: PlayerResponse) -> Option<Self> {
        let item = resp.item?;
        let (album, image_url) = match item.album {
            Some(album) => (
                album.name.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
                album
                    .images
                    .into_iter()
                    .flatten()
                    .find_map(|img| img.url),
            ),
            None => (UNKNOWN_ALBUM.to_string(), None),
        };

        Some(Self {
            is_playing: resp.is_playing.unwrap_or(false),
            title: item.name.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artists: item
                .artists
                .into_iter()
                .flatten()
                .filter_map(|a| a.name)
                .collect(),
            album,
            duration_ms: item.duration_ms.unwrap_or(0),
            position_ms: resp.progress_ms.unwrap_or(0),
            image_url,
            volume_percent: resp.device.as_ref().and_then(|d| d.volume_percent),
            device_name: resp.device.and_then(|d| d.name),
        })
    }

    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }

    pub fn position_secs(&self) -> u64 {
        self.position_ms / 1000
    }
}

/// Active device and transport state from `/me/player`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub volume_percent: u8,
    pub device_name: String,
    pub supports_volume: bool,
}

impl From<PlayerResponse> for PlaybackState {
    fn from(resp: PlayerResponse) -> Self {
        let device = resp.device.unwrap_or_default();
        Self {
            is_playing: resp.is_playing.unwrap_or(false),
            volume_percent: device.volume_percent.unwrap_or(DEFAULT_VOLUME),
            device_name: device.name.unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
            supports_volume: device.supports_volume.unwrap_or(false),
        }
    }
}
