//! Entity controllers exposed to the hub

pub mod media_player;
mod poller;
pub mod remote;

pub use media_player::MediaPlayer;
pub use remote::Remote;
