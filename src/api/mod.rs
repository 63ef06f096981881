//! API client module for the Spotify Web API

pub mod client;
mod player;

pub use client::{AuthStatus, SpotifyClient};
pub use player::clamp_volume;
