//! Hub-facing model
//!
//! The remote-control hub's SDK owns the wire protocol. The driver only
//! needs its vocabulary (entities, attribute deltas, setup messages, status
//! codes) and somewhere to send updates, which is the [`Hub`] trait.

pub mod entity;
pub mod setup;

pub use entity::{EntityDefinition, EntityType, Feature};
pub use setup::{SetupAction, SetupErrorKind, SetupMessage};

use serde::Serialize;

/// Attribute deltas keyed by attribute name.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// Result of a command handler, as understood by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    BadRequest,
    ServerError,
    NotImplemented,
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::ServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
        }
    }
}

/// Integration-level state shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    Connected,
    Connecting,
    Disconnected,
    Error,
}

/// Sink for everything the driver publishes to the hub.
pub trait Hub: Send + Sync {
    fn set_device_state(&self, state: DeviceState);
    /// Make an entity available for the operator to configure.
    fn register_entity(&self, entity: &EntityDefinition);
    fn update_attributes(&self, entity_id: &str, attributes: AttributeMap);
}

/// Hub that only logs, used when running the driver from the command line.
#[derive(Debug, Default)]
pub struct LoggingHub;

impl Hub for LoggingHub {
    fn set_device_state(&self, state: DeviceState) {
        tracing::info!("Device state: {:?}", state);
    }

    fn register_entity(&self, entity: &EntityDefinition) {
        match serde_json::to_string(entity) {
            Ok(json) => tracing::info!("Entity available: {}", json),
            Err(e) => tracing::warn!("Entity {} not serializable: {}", entity.entity_id, e),
        }
    }

    fn update_attributes(&self, entity_id: &str, attributes: AttributeMap) {
        tracing::info!(
            "{} <- {}",
            entity_id,
            serde_json::Value::Object(attributes)
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Hub that records everything it is sent.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHub {
        pub states: Mutex<Vec<DeviceState>>,
        pub entities: Mutex<Vec<EntityDefinition>>,
        pub updates: Mutex<Vec<(String, AttributeMap)>>,
    }

    impl RecordingHub {
        pub fn updates(&self) -> Vec<(String, AttributeMap)> {
            self.updates.lock().unwrap().clone()
        }

        pub fn states(&self) -> Vec<DeviceState> {
            self.states.lock().unwrap().clone()
        }

        pub fn entity_ids(&self) -> Vec<String> {
            self.entities
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.entity_id.clone())
                .collect()
        }
    }

    impl Hub for RecordingHub {
        fn set_device_state(&self, state: DeviceState) {
            self.states.lock().unwrap().push(state);
        }

        fn register_entity(&self, entity: &EntityDefinition) {
            self.entities.lock().unwrap().push(entity.clone());
        }

        fn update_attributes(&self, entity_id: &str, attributes: AttributeMap) {
            self.updates
                .lock()
                .unwrap()
                .push((entity_id.to_string(), attributes));
        }
    }
}
