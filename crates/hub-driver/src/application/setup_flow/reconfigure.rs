//! Reconfiguration actions: what happens after the user picked a device and
//! one of add / configure / delete / reset.

use hub_core::protocol::messages::{Event, Response, SetupChange};
use hub_core::{SetupAction, SetupResult, SetupStep};
use tracing::{info, warn};

use super::SetupFlow;
use crate::application::error::SetupError;

/// Form field holding the selected device id.
pub const FIELD_CHOICE: &str = "choice";
/// Form field holding the selected action.
pub const FIELD_ACTION: &str = "action";

impl SetupFlow {
    /// Runs one reconfiguration action against `target`.
    ///
    /// The request is acknowledged and the target recorded before the action
    /// is even parsed; finalization later sends a second acknowledgment for
    /// the same request.
    pub(super) async fn handle_action(
        &self,
        socket_id: &str,
        req_id: u32,
        action: &str,
        target: &str,
    ) -> Result<SetupResult, SetupError> {
        self.send(socket_id, Response::ack(req_id)).await?;
        self.registry.set_reconfigure_target(socket_id, target);

        let Some(action) = SetupAction::parse(action) else {
            warn!(socket_id, action, "unknown reconfiguration action");
            return Ok(SetupResult::Error);
        };
        info!(socket_id, action = action.as_str(), target, "reconfiguration action");

        match action {
            SetupAction::Add => {
                let page = self.enter_new_entity(socket_id);
                self.send(socket_id, Event::setup_change(SetupChange::waiting_for_input(page)))
                    .await?;
                Ok(SetupResult::Handled)
            }

            SetupAction::Configure => {
                let configuration = self.store.get().await?;
                let item = configuration.find_single(target)?;
                let page = self.handlers.reconfigure_page(item);

                // An abort racing this request has already dropped the step.
                if !self.registry.compare_and_set_step(
                    socket_id,
                    SetupStep::ReconfigureEntity,
                    SetupStep::SaveReconfiguredEntity,
                ) {
                    return Err(SetupError::InvalidStep);
                }
                self.send(socket_id, Event::setup_change(SetupChange::waiting_for_input(page)))
                    .await?;
                Ok(SetupResult::Handled)
            }

            SetupAction::Delete => {
                let mut configuration = self.store.get().await?;
                let entity_id = configuration.find_single(target)?.entity_id.clone();
                configuration.remove(&entity_id);

                // Entities go unavailable before the store forgets the device.
                self.broadcaster.broadcast(&entity_id, socket_id).await?;
                self.store.update(configuration).await?;
                info!(socket_id, %entity_id, "device deleted");
                Ok(SetupResult::Finalized)
            }

            SetupAction::Reset => {
                let mut configuration = self.store.get().await?;
                let entity_ids: Vec<String> = configuration
                    .entities
                    .iter()
                    .map(|item| item.entity_id.clone())
                    .collect();

                self.broadcaster
                    .broadcast_all(entity_ids.iter().map(String::as_str), socket_id)
                    .await?;
                configuration.clear();
                self.store.update(configuration).await?;
                info!(socket_id, devices = entity_ids.len(), "configuration reset");
                Ok(SetupResult::Finalized)
            }
        }
    }
}
