//! The setup conversation.
//!
//! A setup attempt on one socket moves through a small state machine stored
//! in the [`SessionRegistry`]:
//!
//! ```text
//!   setup_driver (reconfigure=false) ──▶ NewEntity ───────────────┐
//!                                                                 │ submit
//!   setup_driver (reconfigure=true)  ──▶ ReconfigureEntity        ▼
//!                                          │  add ──▶ NewEntity   finish
//!                                          │  configure ──▶ SaveReconfiguredEntity ──▶ finish
//!                                          │  delete / reset ──▶ finish
//! ```
//!
//! [`SetupFlow::start_setup`] chooses the first prompt.
//! [`SetupFlow::handle_user_data`] receives every later submission, sends a
//! provisional "in progress" event, routes it by step, and closes the attempt
//! with [`SetupFlow::finish`] unless the handler kept it open.
//!
//! Every failure inside the dispatcher is turned into an error response on
//! the originating request; nothing propagates to the transport.

mod reconfigure;

use std::sync::Arc;

use hub_core::protocol::messages::{Event, Response, SetDriverUserDataMsg, SetupChange};
use hub_core::{
    Configuration, DropdownItem, OutboundMessage, SettingField, SettingsPage,
    SetupAction, SetupResult, SetupStep,
};
use tracing::{debug, error, info, warn};

use crate::application::broadcast::UnavailableBroadcaster;
use crate::application::error::SetupError;
use crate::application::ports::{
    ConfigurationStore, EntityResolver, ResponseSender, SendError, SetupHandlers,
};
use crate::application::session_registry::SessionRegistry;

pub use reconfigure::{FIELD_ACTION, FIELD_CHOICE};

pub struct SetupFlow {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ConfigurationStore>,
    sender: Arc<dyn ResponseSender>,
    handlers: Arc<dyn SetupHandlers>,
    broadcaster: UnavailableBroadcaster,
}

impl SetupFlow {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn ConfigurationStore>,
        sender: Arc<dyn ResponseSender>,
        handlers: Arc<dyn SetupHandlers>,
        resolver: Arc<dyn EntityResolver>,
    ) -> Self {
        let broadcaster =
            UnavailableBroadcaster::new(resolver, Arc::clone(&sender), Arc::clone(&registry));
        Self {
            registry,
            store,
            sender,
            handlers,
            broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    // ── Entry point ───────────────────────────────────────────────────────────

    /// Begins a setup attempt and returns the first prompt.
    ///
    /// With `reconfigure` set and at least one configured device the prompt
    /// is the device/action picker; otherwise it is the driver's new-device
    /// form.  The caller delivers the prompt.
    pub async fn start_setup(
        &self,
        socket_id: &str,
        reconfigure: bool,
    ) -> Result<SettingsPage, SetupError> {
        if !reconfigure {
            info!(socket_id, "starting new-device setup");
            return Ok(self.enter_new_entity(socket_id));
        }

        let configuration = self.store.get().await?;
        if configuration.is_empty() {
            info!(socket_id, "nothing configured yet, falling back to new-device setup");
            return Ok(self.enter_new_entity(socket_id));
        }

        self.registry
            .set_step(socket_id, SetupStep::ReconfigureEntity);
        info!(
            socket_id,
            devices = configuration.len(),
            "starting reconfiguration"
        );
        Ok(action_page(&configuration))
    }

    /// Moves the socket to the new-device step and returns its form.
    fn enter_new_entity(&self, socket_id: &str) -> SettingsPage {
        self.registry.set_step(socket_id, SetupStep::NewEntity);
        self.handlers.new_entity_page()
    }

    // ── Submissions ───────────────────────────────────────────────────────────

    /// Handles one `set_driver_user_data` request.
    ///
    /// Never fails: any error is reported to the hub as an error response
    /// carrying `req_id`.
    pub async fn handle_user_data(&self, socket_id: &str, req_id: u32, msg: &SetDriverUserDataMsg) {
        if let Err(err) = self.dispatch_user_data(socket_id, req_id, msg).await {
            self.reply_error(socket_id, req_id, &err).await;
        }
    }

    async fn dispatch_user_data(
        &self,
        socket_id: &str,
        req_id: u32,
        msg: &SetDriverUserDataMsg,
    ) -> Result<(), SetupError> {
        let step = self
            .registry
            .step(socket_id)
            .ok_or(SetupError::StepNotFound)?;

        if msg.confirm.is_none() && msg.input_values.is_none() {
            return Err(SetupError::MissingInput);
        }

        self.send(socket_id, Event::setup_change(SetupChange::in_progress()))
            .await?;

        let outcome = if msg.confirm.is_some() {
            self.handlers
                .on_confirm(socket_id, msg)
                .await
                .map_err(SetupError::Handler)?
        } else {
            self.route_input(socket_id, req_id, step, msg).await?
        };

        debug!(socket_id, req_id, ?step, ?outcome, "setup submission handled");

        match outcome {
            SetupResult::Handled => {}
            SetupResult::Finalized | SetupResult::Error => {
                self.registry.clear_step(socket_id);
                self.finish(socket_id, outcome == SetupResult::Finalized, req_id)
                    .await?;
            }
        }
        Ok(())
    }

    async fn route_input(
        &self,
        socket_id: &str,
        req_id: u32,
        step: SetupStep,
        msg: &SetDriverUserDataMsg,
    ) -> Result<SetupResult, SetupError> {
        match step {
            SetupStep::NewEntity => self
                .handlers
                .on_new_entity_data(socket_id, msg)
                .await
                .map_err(SetupError::Handler),

            SetupStep::ReconfigureEntity => {
                let target = msg.input(FIELD_CHOICE).ok_or(SetupError::InvalidStep)?;
                let action = msg.input(FIELD_ACTION).unwrap_or_default();
                self.handle_action(socket_id, req_id, action, target).await
            }

            SetupStep::SaveReconfiguredEntity => {
                let target = self
                    .registry
                    .reconfigure_target(socket_id)
                    .ok_or(SetupError::ReconfigureTargetMissing)?;

                // Re-read: the device may have been deleted from another socket
                // since the reconfigure form was shown.
                let configuration = self.store.get().await?;
                let item = configuration
                    .find(&target)
                    .ok_or_else(|| SetupError::EntityNotFound(target.clone()))?;

                self.handlers
                    .on_reconfigured_data(socket_id, msg, item)
                    .await
                    .map_err(SetupError::Handler)
            }
        }
    }

    // ── Finalization ──────────────────────────────────────────────────────────

    /// Closes a setup attempt: forgets the reconfigure target, then sends the
    /// acknowledgment and the terminal event concurrently.
    pub async fn finish(&self, socket_id: &str, success: bool, req_id: u32) -> Result<(), SendError> {
        self.registry.clear_reconfigure_target(socket_id);

        tokio::try_join!(
            self.send(socket_id, Response::ack(req_id)),
            self.send(socket_id, Event::setup_change(SetupChange::finished(success))),
        )?;

        info!(socket_id, success, "setup finished");
        Ok(())
    }

    /// Drops the socket's setup attempt after the hub aborted it.
    pub fn abort(&self, socket_id: &str) {
        let step = self.registry.clear_step(socket_id);
        self.registry.clear_reconfigure_target(socket_id);
        self.registry.cancel_repeat(socket_id);
        info!(socket_id, ?step, "setup aborted");
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Logs `err` and answers `req_id` with its error payload.
    pub async fn reply_error(&self, socket_id: &str, req_id: u32, err: &SetupError) {
        if err.is_client_error() {
            warn!(socket_id, req_id, error = %err, "setup request rejected");
        } else {
            error!(socket_id, req_id, error = %err, "setup request failed");
        }

        let response = Response::error(req_id, err.error_payload());
        if let Err(send_err) = self.send(socket_id, response).await {
            warn!(socket_id, req_id, error = %send_err, "could not deliver error response");
        }
    }

    async fn send(&self, socket_id: &str, message: impl Into<OutboundMessage>) -> Result<(), SendError> {
        self.sender.send(socket_id, message.into()).await
    }
}

/// Device picker plus action picker shown when reconfiguring.
fn action_page(configuration: &Configuration) -> SettingsPage {
    let devices: Vec<DropdownItem> = configuration
        .entities
        .iter()
        .map(|item| {
            DropdownItem::new(
                item.entity_id.clone(),
                format!("{} ({})", item.entity_name, item.host),
            )
        })
        .collect();
    let selected = devices
        .first()
        .map(|item| item.id.clone())
        .unwrap_or_default();

    let actions = SetupAction::ALL
        .iter()
        .map(|action| DropdownItem::new(action.as_str(), action.label()))
        .collect();

    SettingsPage::new("Configured devices")
        .with(
            FIELD_CHOICE,
            "Device",
            SettingField::Dropdown {
                value: selected,
                items: devices,
            },
        )
        .with(
            FIELD_ACTION,
            "Action",
            SettingField::Dropdown {
                value: SetupAction::Configure.as_str().to_string(),
                items: actions,
            },
        )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
