//! Recording test doubles shared by the unit tests of this layer.

use std::sync::Mutex;

use async_trait::async_trait;
use hub_core::protocol::messages::SetDriverUserDataMsg;
use hub_core::{
    ConfigurationItem, EntityRef, EntityType, OutboundMessage, SettingField, SettingsPage,
    SetupResult,
};

use crate::application::ports::{EntityResolver, ResponseSender, SendError, SetupHandlers};

/// Records every message instead of writing it to a socket.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    fail: bool,
}

impl RecordingSender {
    /// A sender whose every send fails with [`SendError::Closed`].
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, socket_id: &str) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|(socket, _)| socket == socket_id)
            .map(|(_, message)| message)
            .collect()
    }

    /// `msg` names of everything sent to `socket_id`, in order.
    pub fn msgs_to(&self, socket_id: &str) -> Vec<String> {
        self.sent_to(socket_id)
            .iter()
            .map(|message| message.msg().to_string())
            .collect()
    }
}

#[async_trait]
impl ResponseSender for RecordingSender {
    async fn send(&self, socket_id: &str, message: OutboundMessage) -> Result<(), SendError> {
        if self.fail {
            return Err(SendError::Closed(socket_id.to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((socket_id.to_string(), message));
        Ok(())
    }
}

/// Media player plus remote per device.
pub struct PairResolver;

impl EntityResolver for PairResolver {
    fn resolve_entities(&self, entity_base_id: &str) -> Vec<EntityRef> {
        vec![
            EntityRef::new(entity_base_id, EntityType::MediaPlayer),
            EntityRef::new(format!("{entity_base_id}_remote"), EntityType::Remote),
        ]
    }
}

/// Handlers that return a fixed outcome and count their invocations.
pub struct ScriptedHandlers {
    pub outcome: SetupResult,
    pub calls: Mutex<Vec<&'static str>>,
}

impl ScriptedHandlers {
    pub fn returning(outcome: SetupResult) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SetupHandlers for ScriptedHandlers {
    fn new_entity_page(&self) -> SettingsPage {
        SettingsPage::new("New device").with("name", "Name", SettingField::Text { value: String::new() })
    }

    fn reconfigure_page(&self, item: &ConfigurationItem) -> SettingsPage {
        SettingsPage::new(format!("Configure {}", item.entity_name))
    }

    async fn on_confirm(&self, _: &str, _: &SetDriverUserDataMsg) -> anyhow::Result<SetupResult> {
        self.calls.lock().unwrap().push("confirm");
        Ok(self.outcome)
    }

    async fn on_new_entity_data(&self, _: &str, _: &SetDriverUserDataMsg) -> anyhow::Result<SetupResult> {
        self.calls.lock().unwrap().push("new_entity");
        Ok(self.outcome)
    }

    async fn on_reconfigured_data(
        &self,
        _: &str,
        _: &SetDriverUserDataMsg,
        _: &ConfigurationItem,
    ) -> anyhow::Result<SetupResult> {
        self.calls.lock().unwrap().push("reconfigured");
        Ok(self.outcome)
    }
}
