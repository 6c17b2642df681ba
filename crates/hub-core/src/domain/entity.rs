//! Protocol-level entities.
//!
//! One configured device may back several entities on the hub.  A network
//! media device, for example, shows up both as a `media_player` (playback
//! state, volume) and as a `remote` (raw button commands), and both share the
//! device's configured id as their base id.

use serde::{Deserialize, Serialize};

/// Entity kinds the driver can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    MediaPlayer,
    Remote,
    Button,
    Sensor,
}

impl EntityType {
    /// Wire name of the entity kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::MediaPlayer => "media_player",
            EntityType::Remote => "remote",
            EntityType::Button => "button",
            EntityType::Sensor => "sensor",
        }
    }

    /// The `state` attribute value that marks this entity kind as gone.
    ///
    /// Returns `None` for kinds that carry no availability state; the
    /// broadcaster skips those.
    pub fn unavailable_state(self) -> Option<&'static str> {
        match self {
            EntityType::MediaPlayer | EntityType::Remote | EntityType::Button => {
                Some("UNAVAILABLE")
            }
            EntityType::Sensor => None,
        }
    }
}

/// A concrete entity resolved from a configured device's base id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_id: String,
    pub entity_type: EntityType,
}

impl EntityRef {
    pub fn new(entity_id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
        }
    }
}
