//! Maps decoded inbound frames onto the setup flow and the small set of
//! non-setup requests every driver must answer.

use std::sync::Arc;

use hub_core::protocol::messages::{
    DriverEvent, DriverRequest, ErrorPayload, Event, Response, SetupChange, SetupDriverMsg,
};
use hub_core::{Inbound, OutboundMessage};
use tracing::{debug, info, warn};

use crate::application::ports::{ResponseSender, SendError};
use crate::application::session_registry::SessionRegistry;
use crate::application::setup_flow::SetupFlow;

/// Device state reported for `get_device_state`.
const DEVICE_CONNECTED: &str = "CONNECTED";

pub struct RequestRouter {
    flow: Arc<SetupFlow>,
    registry: Arc<SessionRegistry>,
    sender: Arc<dyn ResponseSender>,
    driver_id: String,
    driver_version: String,
}

impl RequestRouter {
    pub fn new(
        flow: Arc<SetupFlow>,
        sender: Arc<dyn ResponseSender>,
        driver_id: impl Into<String>,
        driver_version: impl Into<String>,
    ) -> Self {
        let registry = Arc::clone(flow.registry());
        Self {
            flow,
            registry,
            sender,
            driver_id: driver_id.into(),
            driver_version: driver_version.into(),
        }
    }

    /// Handles one inbound frame to completion.
    pub async fn route(&self, socket_id: &str, inbound: Inbound) {
        match inbound {
            Inbound::Request { id, request } => self.handle_request(socket_id, id, request).await,
            Inbound::Event(event) => self.handle_event(socket_id, event),
        }
    }

    async fn handle_request(&self, socket_id: &str, req_id: u32, request: DriverRequest) {
        debug!(socket_id, req_id, msg = request.name(), "request received");

        let result = match request {
            DriverRequest::SetupDriver(msg) => self.setup_driver(socket_id, req_id, &msg).await,

            DriverRequest::SetDriverUserData(msg) => {
                self.flow.handle_user_data(socket_id, req_id, &msg).await;
                Ok(())
            }

            DriverRequest::SubscribeEvents(_) => {
                self.registry.set_subscribed(socket_id, true);
                self.send(socket_id, Response::ack(req_id)).await
            }

            DriverRequest::UnsubscribeEvents(_) => {
                self.registry.set_subscribed(socket_id, false);
                self.send(socket_id, Response::ack(req_id)).await
            }

            DriverRequest::GetDriverVersion => {
                let response =
                    Response::driver_version(req_id, &self.driver_id, &self.driver_version);
                self.send(socket_id, response).await
            }

            DriverRequest::GetDeviceState => self.device_state(socket_id, req_id).await,

            DriverRequest::Unsupported(name) => {
                warn!(socket_id, req_id, msg = %name, "unsupported request");
                let payload = ErrorPayload::bad_request(format!("unsupported request: {name}"));
                self.send(socket_id, Response::error(req_id, payload)).await
            }

            DriverRequest::Malformed { msg, reason } => {
                warn!(socket_id, req_id, %msg, %reason, "malformed request payload");
                let payload = ErrorPayload::bad_request(format!("invalid {msg} payload: {reason}"));
                self.send(socket_id, Response::error(req_id, payload)).await
            }
        };

        if let Err(err) = result {
            warn!(socket_id, req_id, error = %err, "failed to send response");
        }
    }

    async fn setup_driver(&self, socket_id: &str, req_id: u32, msg: &SetupDriverMsg) -> Result<(), SendError> {
        match self.flow.start_setup(socket_id, msg.reconfigure).await {
            Ok(page) => {
                self.send(socket_id, Response::ack(req_id)).await?;
                self.send(socket_id, Event::setup_change(SetupChange::waiting_for_input(page)))
                    .await
            }
            Err(err) => {
                self.flow.reply_error(socket_id, req_id, &err).await;
                Ok(())
            }
        }
    }

    async fn device_state(&self, socket_id: &str, req_id: u32) -> Result<(), SendError> {
        self.send(socket_id, Response::ack(req_id)).await?;
        self.send(socket_id, Event::device_state(DEVICE_CONNECTED)).await
    }

    fn handle_event(&self, socket_id: &str, event: DriverEvent) {
        match event {
            DriverEvent::AbortDriverSetup => self.flow.abort(socket_id),
            DriverEvent::Other(name) => {
                info!(socket_id, msg = %name, "ignoring event");
            }
        }
    }

    async fn send(&self, socket_id: &str, message: impl Into<OutboundMessage>) -> Result<(), SendError> {
        self.sender.send(socket_id, message.into()).await
    }
}

#[cfg(test)]
mod tests {
    use hub_core::protocol::messages::{SetDriverUserDataMsg, SubscribeEventsMsg};
    use hub_core::{SetupResult, SetupStep};

    use super::*;
    use crate::application::ports::{MockConfigurationStore, SetupHandlers};
    use crate::application::testing::{PairResolver, RecordingSender, ScriptedHandlers};

    fn router() -> (RequestRouter, Arc<RecordingSender>) {
        let sender = Arc::new(RecordingSender::default());
        let flow = Arc::new(SetupFlow::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(MockConfigurationStore::new()),
            Arc::clone(&sender) as Arc<dyn ResponseSender>,
            Arc::new(ScriptedHandlers::returning(SetupResult::Finalized)) as Arc<dyn SetupHandlers>,
            Arc::new(PairResolver),
        ));
        let router = RequestRouter::new(
            flow,
            Arc::clone(&sender) as Arc<dyn ResponseSender>,
            "test-driver",
            "1.2.3",
        );
        (router, sender)
    }

    fn request(id: u32, request: DriverRequest) -> Inbound {
        Inbound::Request { id, request }
    }

    #[tokio::test]
    async fn test_setup_driver_acks_then_prompts() {
        // Arrange
        let (router, sender) = router();

        // Act
        router
            .route("a", request(1, DriverRequest::SetupDriver(SetupDriverMsg::default())))
            .await;

        // Assert
        assert_eq!(sender.msgs_to("a"), ["result", "driver_setup_change"]);
        match &sender.sent_to("a")[1] {
            OutboundMessage::Event(event) => {
                assert_eq!(event.msg_data["state"], "WAIT_USER_ACTION");
                assert_eq!(event.msg_data["require_user_action"]["input"]["title"], "New device");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(router.registry.step("a"), Some(SetupStep::NewEntity));
    }

    #[tokio::test]
    async fn test_set_driver_user_data_reaches_dispatcher() {
        let (router, sender) = router();

        router
            .route(
                "a",
                request(2, DriverRequest::SetDriverUserData(SetDriverUserDataMsg::with_confirm(true))),
            )
            .await;

        // No step registered: the dispatcher answers 404
        let sent = sender.sent_to("a");
        assert!(matches!(&sent[0], OutboundMessage::Response(r) if r.code == 404 && r.req_id == 2));
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe_toggle_flag() {
        // Arrange
        let (router, sender) = router();

        // Act / Assert
        router
            .route("a", request(3, DriverRequest::SubscribeEvents(SubscribeEventsMsg::default())))
            .await;
        assert!(router.registry.is_subscribed("a"));

        router
            .route("a", request(4, DriverRequest::UnsubscribeEvents(SubscribeEventsMsg::default())))
            .await;
        assert!(!router.registry.is_subscribed("a"));
        assert_eq!(sender.msgs_to("a"), ["result", "result"]);
    }

    #[tokio::test]
    async fn test_get_driver_version_reports_configured_identity() {
        let (router, sender) = router();

        router.route("a", request(5, DriverRequest::GetDriverVersion)).await;

        match &sender.sent_to("a")[0] {
            OutboundMessage::Response(r) => {
                assert_eq!(r.msg, "driver_version");
                assert_eq!(r.msg_data["name"], "test-driver");
                assert_eq!(r.msg_data["version"]["driver"], "1.2.3");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_device_state_acks_and_reports_connected() {
        let (router, sender) = router();

        router.route("a", request(6, DriverRequest::GetDeviceState)).await;

        assert_eq!(sender.msgs_to("a"), ["result", "device_state"]);
    }

    #[tokio::test]
    async fn test_unsupported_request_is_bad_request() {
        let (router, sender) = router();

        router
            .route("a", request(7, DriverRequest::Unsupported("entity_command".into())))
            .await;

        let sent = sender.sent_to("a");
        assert!(matches!(&sent[0], OutboundMessage::Response(r) if r.code == 400));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request_with_same_id() {
        let (router, sender) = router();

        router
            .route(
                "a",
                request(
                    8,
                    DriverRequest::Malformed {
                        msg: "set_driver_user_data".into(),
                        reason: "invalid type: string \"yes\", expected a boolean".into(),
                    },
                ),
            )
            .await;

        let sent = sender.sent_to("a");
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], OutboundMessage::Response(r) if r.code == 400 && r.req_id == 8));
        assert_eq!(router.registry.step("a"), None);
    }

    #[tokio::test]
    async fn test_abort_event_clears_step() {
        // Arrange
        let (router, sender) = router();
        router
            .route("a", request(1, DriverRequest::SetupDriver(SetupDriverMsg::default())))
            .await;

        // Act
        router
            .route("a", Inbound::Event(DriverEvent::AbortDriverSetup))
            .await;

        // Assert: nothing sent in reply to an event
        assert_eq!(router.registry.step("a"), None);
        assert_eq!(sender.sent_to("a").len(), 2);
    }
}
