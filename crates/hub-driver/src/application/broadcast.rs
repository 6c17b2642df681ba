//! Entity-unavailable broadcaster.
//!
//! When a device is deleted (or every device is reset) the hub must stop
//! showing its entities as usable.  For each entity the device backs, the
//! broadcaster sends an `entity_change` event setting the state to that
//! kind's "unavailable" value.  Kinds without such a state are skipped.
//!
//! Recipients are the socket that triggered the change plus every other
//! socket that subscribed to entity events.  All sends are issued
//! concurrently and awaited together; the broadcast returns once every one
//! of them has completed.

use std::sync::Arc;

use futures_util::future::try_join_all;
use hub_core::protocol::messages::Event;
use hub_core::OutboundMessage;
use tracing::debug;

use crate::application::ports::{EntityResolver, ResponseSender, SendError};
use crate::application::session_registry::SessionRegistry;

pub struct UnavailableBroadcaster {
    resolver: Arc<dyn EntityResolver>,
    sender: Arc<dyn ResponseSender>,
    registry: Arc<SessionRegistry>,
}

impl UnavailableBroadcaster {
    pub fn new(
        resolver: Arc<dyn EntityResolver>,
        sender: Arc<dyn ResponseSender>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            resolver,
            sender,
            registry,
        }
    }

    /// Marks every entity of one device unavailable.  Returns the number of
    /// messages sent.
    pub async fn broadcast(&self, entity_base_id: &str, socket_id: &str) -> Result<usize, SendError> {
        self.broadcast_all([entity_base_id], socket_id).await
    }

    /// Marks every entity of several devices unavailable in one fan-out.
    pub async fn broadcast_all<'a, I>(&self, entity_base_ids: I, socket_id: &str) -> Result<usize, SendError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let recipients = self.recipients(socket_id);
        let mut sends = Vec::new();

        for base_id in entity_base_ids {
            for entity in self.resolver.resolve_entities(base_id) {
                let Some(state) = entity.entity_type.unavailable_state() else {
                    debug!(
                        entity_id = %entity.entity_id,
                        entity_type = entity.entity_type.as_str(),
                        "entity kind has no unavailable state, skipping"
                    );
                    continue;
                };
                let message = OutboundMessage::from(Event::entity_state(&entity, state));
                for recipient in &recipients {
                    sends.push((recipient.as_str(), message.clone()));
                }
            }
        }

        let count = sends.len();
        let sender = self.sender.as_ref();
        try_join_all(
            sends
                .into_iter()
                .map(|(recipient, message)| sender.send(recipient, message)),
        )
        .await?;

        debug!(count, socket_id, "entity-unavailable broadcast sent");
        Ok(count)
    }

    /// Triggering socket first, then the other subscribers.
    fn recipients(&self, socket_id: &str) -> Vec<String> {
        let mut recipients = vec![socket_id.to_string()];
        recipients.extend(
            self.registry
                .subscribed_sockets()
                .into_iter()
                .filter(|subscriber| subscriber != socket_id),
        );
        recipients
    }
}
