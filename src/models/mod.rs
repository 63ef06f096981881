//! Data models for Web API payloads

mod playback;

pub use playback::*;
