//! Configured devices.
//!
//! A [`ConfigurationItem`] describes one physical device the user has set up.
//! The [`Configuration`] is the ordered collection the configuration store
//! persists.  Entity ids are compared case-insensitively everywhere: the hub
//! may echo an id back with different casing than the driver stored it.
//!
//! Uniqueness of entity ids is the store's responsibility.  The lookups here
//! report duplicates instead of silently picking one, because a duplicate
//! means the persisted data is already inconsistent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lookup failures on a [`Configuration`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No item carries the requested entity id.
    #[error("no configured entity with id '{0}'")]
    NotFound(String),

    /// More than one item carries the requested entity id.
    #[error("{count} configured entities share id '{entity_id}'")]
    Ambiguous { entity_id: String, count: usize },
}

/// Persisted record of one configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationItem {
    /// Unique (case-insensitive) identifier; the base id of every entity the
    /// device exposes.
    pub entity_id: String,
    /// Display name chosen by the user.
    pub entity_name: String,
    /// Hostname or IP address of the device.
    pub host: String,
    /// Driver-specific settings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

impl ConfigurationItem {
    /// Creates an item with no driver-specific settings.
    pub fn new(
        entity_id: impl Into<String>,
        entity_name: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_name: entity_name.into(),
            host: host.into(),
            settings: BTreeMap::new(),
        }
    }

    /// Returns `true` when this item's id equals `entity_id`, ignoring case.
    pub fn matches(&self, entity_id: &str) -> bool {
        self.entity_id.eq_ignore_ascii_case(entity_id)
    }
}

/// Ordered collection of configured devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub entities: Vec<ConfigurationItem>,
}

impl Configuration {
    pub fn new(entities: Vec<ConfigurationItem>) -> Self {
        Self { entities }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns the first item matching `entity_id`.
    pub fn find(&self, entity_id: &str) -> Option<&ConfigurationItem> {
        self.entities.iter().find(|item| item.matches(entity_id))
    }

    /// Returns the one item matching `entity_id`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::NotFound`] when nothing matches and
    /// [`ConfigurationError::Ambiguous`] when two or more items match.
    pub fn find_single(&self, entity_id: &str) -> Result<&ConfigurationItem, ConfigurationError> {
        let mut matches = self.entities.iter().filter(|item| item.matches(entity_id));
        let first = matches
            .next()
            .ok_or_else(|| ConfigurationError::NotFound(entity_id.to_string()))?;
        let extra = matches.count();
        if extra > 0 {
            return Err(ConfigurationError::Ambiguous {
                entity_id: entity_id.to_string(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    /// Inserts `item`, replacing any item with the same id.
    pub fn upsert(&mut self, item: ConfigurationItem) {
        match self.entities.iter_mut().find(|e| e.matches(&item.entity_id)) {
            Some(existing) => *existing = item,
            None => self.entities.push(item),
        }
    }

    /// Removes every item matching `entity_id` and returns how many were removed.
    pub fn remove(&mut self, entity_id: &str) -> usize {
        let before = self.entities.len();
        self.entities.retain(|item| !item.matches(entity_id));
        before - self.entities.len()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
