//! Shared doubles for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hub_core::protocol::messages::SetDriverUserDataMsg;
use hub_core::{Configuration, OutboundMessage};
use hub_driver::application::host_driver::HostDeviceDriver;
use hub_driver::application::ports::{
    ConfigurationStore, EntityResolver, ResponseSender, SendError, SetupHandlers, StoreError,
};
use hub_driver::application::session_registry::SessionRegistry;
use hub_driver::application::setup_flow::SetupFlow;
use hub_driver::infrastructure::storage::MemoryConfigurationStore;

/// Log shared by the sender and the store so tests can check interleaving.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct JournalSender {
    journal: Journal,
    sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl JournalSender {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_to(&self, socket_id: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(socket, _)| socket == socket_id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ResponseSender for JournalSender {
    async fn send(&self, socket_id: &str, message: OutboundMessage) -> Result<(), SendError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("send:{socket_id}:{}", message.msg()));
        self.sent
            .lock()
            .unwrap()
            .push((socket_id.to_string(), message));
        Ok(())
    }
}

pub struct JournalStore {
    journal: Journal,
    inner: MemoryConfigurationStore,
}

impl JournalStore {
    pub fn new(journal: Journal, configuration: Configuration) -> Self {
        Self {
            journal,
            inner: MemoryConfigurationStore::new(configuration),
        }
    }

    /// Current contents, bypassing the journal.
    pub async fn inner_get(&self) -> Configuration {
        self.inner.get().await.unwrap()
    }
}

#[async_trait]
impl ConfigurationStore for JournalStore {
    async fn get(&self) -> Result<Configuration, StoreError> {
        self.inner.get().await
    }

    async fn update(&self, configuration: Configuration) -> Result<(), StoreError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("update:{}", configuration.len()));
        self.inner.update(configuration).await
    }
}

pub struct Harness {
    pub flow: SetupFlow,
    pub sender: Arc<JournalSender>,
    pub store: Arc<JournalStore>,
    pub journal: Journal,
}

impl Harness {
    pub fn new(configuration: Configuration) -> Self {
        let journal: Journal = Arc::default();
        let sender = Arc::new(JournalSender::new(Arc::clone(&journal)));
        let store = Arc::new(JournalStore::new(Arc::clone(&journal), configuration));
        let driver = Arc::new(HostDeviceDriver::new(
            Arc::clone(&store) as Arc<dyn ConfigurationStore>
        ));
        let flow = SetupFlow::new(
            Arc::new(SessionRegistry::new()),
            Arc::clone(&store) as Arc<dyn ConfigurationStore>,
            Arc::clone(&sender) as Arc<dyn ResponseSender>,
            Arc::clone(&driver) as Arc<dyn SetupHandlers>,
            driver as Arc<dyn EntityResolver>,
        );
        Self {
            flow,
            sender,
            store,
            journal,
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

pub fn input(pairs: &[(&str, &str)]) -> SetDriverUserDataMsg {
    SetDriverUserDataMsg::with_input(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    )
}

/// Status code of the response, `None` for events.
pub fn status(message: &OutboundMessage) -> Option<u16> {
    match message {
        OutboundMessage::Response(response) => Some(response.code),
        OutboundMessage::Event(_) => None,
    }
}
