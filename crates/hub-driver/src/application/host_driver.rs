//! Bundled driver for devices reached by host name or IP address.
//!
//! Each configured device exposes a media player (`<id>`) and a remote
//! (`<id>_remote`).  The device id is derived from the host so the same
//! device added twice updates its existing entry instead of duplicating it.

use std::sync::Arc;

use async_trait::async_trait;
use hub_core::protocol::messages::SetDriverUserDataMsg;
use hub_core::{
    ConfigurationItem, EntityRef, EntityType, SettingField, SettingsPage, SetupResult,
};
use tracing::{info, warn};

use crate::application::ports::{ConfigurationStore, EntityResolver, SetupHandlers};

pub const FIELD_NAME: &str = "name";
pub const FIELD_HOST: &str = "host";

pub struct HostDeviceDriver {
    store: Arc<dyn ConfigurationStore>,
}

impl HostDeviceDriver {
    pub fn new(store: Arc<dyn ConfigurationStore>) -> Self {
        Self { store }
    }
}

/// `"Living-Room.local"` → `"living_room_local"`.
pub fn entity_id_for_host(host: &str) -> String {
    host.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Trimmed, non-empty form value.
fn field<'a>(msg: &'a SetDriverUserDataMsg, id: &str) -> Option<&'a str> {
    msg.input(id).map(str::trim).filter(|value| !value.is_empty())
}

fn text(value: &str) -> SettingField {
    SettingField::Text {
        value: value.to_string(),
    }
}

#[async_trait]
impl SetupHandlers for HostDeviceDriver {
    fn new_entity_page(&self) -> SettingsPage {
        SettingsPage::new("Add a network device")
            .with(FIELD_NAME, "Device name", text(""))
            .with(FIELD_HOST, "Host name or IP address", text(""))
    }

    fn reconfigure_page(&self, item: &ConfigurationItem) -> SettingsPage {
        SettingsPage::new(format!("Configure {}", item.entity_name))
            .with(
                "entity_id",
                "Device id",
                SettingField::Label {
                    value: item.entity_id.clone(),
                },
            )
            .with(FIELD_NAME, "Device name", text(&item.entity_name))
            .with(FIELD_HOST, "Host name or IP address", text(&item.host))
    }

    async fn on_confirm(&self, socket_id: &str, msg: &SetDriverUserDataMsg) -> anyhow::Result<SetupResult> {
        info!(socket_id, confirm = ?msg.confirm, "setup confirmed");
        Ok(SetupResult::Finalized)
    }

    async fn on_new_entity_data(
        &self,
        socket_id: &str,
        msg: &SetDriverUserDataMsg,
    ) -> anyhow::Result<SetupResult> {
        let (Some(name), Some(host)) = (field(msg, FIELD_NAME), field(msg, FIELD_HOST)) else {
            warn!(socket_id, "new device submitted without name or host");
            return Ok(SetupResult::Error);
        };

        let entity_id = entity_id_for_host(host);
        let mut configuration = self.store.get().await?;
        configuration.upsert(ConfigurationItem::new(entity_id.clone(), name, host));
        self.store.update(configuration).await?;

        info!(socket_id, %entity_id, host, "device added");
        Ok(SetupResult::Finalized)
    }

    async fn on_reconfigured_data(
        &self,
        socket_id: &str,
        msg: &SetDriverUserDataMsg,
        item: &ConfigurationItem,
    ) -> anyhow::Result<SetupResult> {
        let mut updated = item.clone();
        if let Some(name) = field(msg, FIELD_NAME) {
            updated.entity_name = name.to_string();
        }
        if let Some(host) = field(msg, FIELD_HOST) {
            updated.host = host.to_string();
        }

        let mut configuration = self.store.get().await?;
        if configuration.find(&item.entity_id).is_none() {
            warn!(socket_id, entity_id = %item.entity_id, "device vanished while reconfiguring");
            return Ok(SetupResult::Error);
        }
        configuration.upsert(updated);
        self.store.update(configuration).await?;

        info!(socket_id, entity_id = %item.entity_id, "device reconfigured");
        Ok(SetupResult::Finalized)
    }
}

impl EntityResolver for HostDeviceDriver {
    fn resolve_entities(&self, entity_base_id: &str) -> Vec<EntityRef> {
        vec![
            EntityRef::new(entity_base_id, EntityType::MediaPlayer),
            EntityRef::new(format!("{entity_base_id}_remote"), EntityType::Remote),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use hub_core::Configuration;

    use super::*;
    use crate::application::ports::{MockConfigurationStore, StoreError};

    fn input(pairs: &[(&str, &str)]) -> SetDriverUserDataMsg {
        SetDriverUserDataMsg::with_input(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_entity_id_for_host_normalises() {
        assert_eq!(entity_id_for_host("Living-Room.local"), "living_room_local");
        assert_eq!(entity_id_for_host(" 10.0.0.5 "), "10_0_0_5");
    }

    #[test]
    fn test_reconfigure_page_is_prefilled() {
        let driver = HostDeviceDriver::new(Arc::new(MockConfigurationStore::new()));
        let item = ConfigurationItem::new("tv", "TV", "10.0.0.5");

        let page = driver.reconfigure_page(&item);

        assert_eq!(page.setting(FIELD_NAME).unwrap().field, text("TV"));
        assert_eq!(page.setting(FIELD_HOST).unwrap().field, text("10.0.0.5"));
    }

    #[test]
    fn test_resolve_entities_yields_player_and_remote() {
        let driver = HostDeviceDriver::new(Arc::new(MockConfigurationStore::new()));

        let entities = driver.resolve_entities("tv");

        assert_eq!(
            entities,
            [
                EntityRef::new("tv", EntityType::MediaPlayer),
                EntityRef::new("tv_remote", EntityType::Remote),
            ]
        );
    }

    #[tokio::test]
    async fn test_new_entity_data_upserts_and_persists() {
        // Arrange
        let mut store = MockConfigurationStore::new();
        store
            .expect_get()
            .returning(|| Ok(Configuration::new(vec![ConfigurationItem::new("amp", "Amp", "amp")])));
        store
            .expect_update()
            .times(1)
            .withf(|c| c.len() == 2 && c.find("10_0_0_5").map(|i| i.entity_name.as_str()) == Some("TV"))
            .returning(|_| Ok(()));
        let driver = HostDeviceDriver::new(Arc::new(store));

        // Act
        let outcome = driver
            .on_new_entity_data("a", &input(&[("name", "TV"), ("host", "10.0.0.5")]))
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, SetupResult::Finalized);
    }

    #[tokio::test]
    async fn test_new_entity_data_without_host_is_error() {
        // Arrange: a store with no expectations panics if touched
        let driver = HostDeviceDriver::new(Arc::new(MockConfigurationStore::new()));

        // Act
        let outcome = driver
            .on_new_entity_data("a", &input(&[("name", "TV"), ("host", "  ")]))
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, SetupResult::Error);
    }

    #[tokio::test]
    async fn test_new_entity_data_propagates_store_failure() {
        let mut store = MockConfigurationStore::new();
        store
            .expect_get()
            .returning(|| Err(StoreError::Parse("broken".into())));
        let driver = HostDeviceDriver::new(Arc::new(store));

        let result = driver
            .on_new_entity_data("a", &input(&[("name", "TV"), ("host", "tv")]))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reconfigured_data_keeps_unsubmitted_fields() {
        // Arrange
        let item = ConfigurationItem::new("tv", "TV", "10.0.0.5");
        let stored = item.clone();
        let mut store = MockConfigurationStore::new();
        store
            .expect_get()
            .returning(move || Ok(Configuration::new(vec![stored.clone()])));
        store
            .expect_update()
            .times(1)
            .withf(|c| {
                let item = c.find("tv").unwrap();
                item.entity_name == "Bedroom TV" && item.host == "10.0.0.5"
            })
            .returning(|_| Ok(()));
        let driver = HostDeviceDriver::new(Arc::new(store));

        // Act
        let outcome = driver
            .on_reconfigured_data("a", &input(&[("name", "Bedroom TV")]), &item)
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, SetupResult::Finalized);
    }
}
