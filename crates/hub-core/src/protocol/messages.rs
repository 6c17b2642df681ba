//! Message types for the hub-facing WebSocket protocol.
//!
//! # Envelopes
//!
//! Every frame is a JSON object whose `"kind"` field says what it is:
//!
//! ```json
//! {"kind":"req","id":7,"msg":"setup_driver","msg_data":{"reconfigure":true}}
//! {"kind":"resp","req_id":7,"code":200,"msg":"result","msg_data":{}}
//! {"kind":"event","msg":"driver_setup_change","cat":"DEVICE","msg_data":{...}}
//! ```
//!
//! Requests flow hub → driver and each gets exactly one matching response
//! (`req_id` echoes `id`).  Events flow in either direction and are never
//! answered.
//!
//! Only the messages the setup handshake needs are typed here; everything
//! else decodes to an `Unsupported`/`Other` variant carrying its name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::entity::EntityRef;
use crate::domain::settings::SettingsPage;

// ── Message names ─────────────────────────────────────────────────────────────

pub const MSG_SETUP_DRIVER: &str = "setup_driver";
pub const MSG_SET_DRIVER_USER_DATA: &str = "set_driver_user_data";
pub const MSG_SUBSCRIBE_EVENTS: &str = "subscribe_events";
pub const MSG_UNSUBSCRIBE_EVENTS: &str = "unsubscribe_events";
pub const MSG_GET_DRIVER_VERSION: &str = "get_driver_version";
pub const MSG_GET_DEVICE_STATE: &str = "get_device_state";
pub const MSG_ABORT_DRIVER_SETUP: &str = "abort_driver_setup";

pub const MSG_RESULT: &str = "result";
pub const MSG_DRIVER_VERSION: &str = "driver_version";
pub const MSG_DRIVER_SETUP_CHANGE: &str = "driver_setup_change";
pub const MSG_ENTITY_CHANGE: &str = "entity_change";
pub const MSG_DEVICE_STATE: &str = "device_state";

/// Status code of a successful response.
pub const CODE_OK: u16 = 200;
/// Malformed request or invalid setup state.
pub const CODE_BAD_REQUEST: u16 = 400;
/// Missing setup step or entity.
pub const CODE_NOT_FOUND: u16 = 404;

// ── Hub → driver ──────────────────────────────────────────────────────────────

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A request that must be answered with a response carrying `id`.
    Request { id: u32, request: DriverRequest },
    /// A fire-and-forget event from the hub.
    Event(DriverEvent),
}

/// Typed requests the driver understands.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverRequest {
    SetupDriver(SetupDriverMsg),
    SetDriverUserData(SetDriverUserDataMsg),
    SubscribeEvents(SubscribeEventsMsg),
    UnsubscribeEvents(SubscribeEventsMsg),
    GetDriverVersion,
    GetDeviceState,
    /// Any request name not listed above.
    Unsupported(String),
    /// A known request whose `msg_data` has the wrong shape.
    Malformed { msg: String, reason: String },
}

impl DriverRequest {
    /// Wire name, for log messages.
    pub fn name(&self) -> &str {
        match self {
            DriverRequest::SetupDriver(_) => MSG_SETUP_DRIVER,
            DriverRequest::SetDriverUserData(_) => MSG_SET_DRIVER_USER_DATA,
            DriverRequest::SubscribeEvents(_) => MSG_SUBSCRIBE_EVENTS,
            DriverRequest::UnsubscribeEvents(_) => MSG_UNSUBSCRIBE_EVENTS,
            DriverRequest::GetDriverVersion => MSG_GET_DRIVER_VERSION,
            DriverRequest::GetDeviceState => MSG_GET_DEVICE_STATE,
            DriverRequest::Unsupported(name) => name,
            DriverRequest::Malformed { msg, .. } => msg,
        }
    }
}

/// Typed events the driver understands.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// The user cancelled the setup flow on the hub.
    AbortDriverSetup,
    Other(String),
}

/// `setup_driver` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupDriverMsg {
    /// `true` when the user opened setup for an already configured driver.
    #[serde(default)]
    pub reconfigure: bool,
    /// Values from the driver's initial setup form, if it declares one.
    #[serde(default)]
    pub setup_data: HashMap<String, String>,
}

/// `set_driver_user_data` payload.
///
/// By protocol contract exactly one of `confirm` and `input_values` is set.
/// Both being absent is a client error the dispatcher reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDriverUserDataMsg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_values: Option<HashMap<String, String>>,
}

impl SetDriverUserDataMsg {
    pub fn with_input(values: HashMap<String, String>) -> Self {
        Self {
            confirm: None,
            input_values: Some(values),
        }
    }

    pub fn with_confirm(confirm: bool) -> Self {
        Self {
            confirm: Some(confirm),
            input_values: None,
        }
    }

    /// Returns a submitted value by field id.
    pub fn input(&self, key: &str) -> Option<&str> {
        self.input_values
            .as_ref()
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }
}

/// `subscribe_events` / `unsubscribe_events` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeEventsMsg {
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

// ── Driver → hub ──────────────────────────────────────────────────────────────

/// Anything the driver sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Response(Response),
    Event(Event),
}

impl OutboundMessage {
    /// Wire name, for log messages.
    pub fn msg(&self) -> &str {
        match self {
            OutboundMessage::Response(r) => &r.msg,
            OutboundMessage::Event(e) => &e.msg,
        }
    }
}

impl From<Response> for OutboundMessage {
    fn from(value: Response) -> Self {
        OutboundMessage::Response(value)
    }
}

impl From<Event> for OutboundMessage {
    fn from(value: Event) -> Self {
        OutboundMessage::Event(value)
    }
}

/// Answer to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub kind: String,
    pub req_id: u32,
    pub code: u16,
    pub msg: String,
    #[serde(default)]
    pub msg_data: Value,
}

/// Two-field error body carried by 400/404 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: CODE_BAD_REQUEST.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: CODE_NOT_FOUND.to_string(),
            message: message.into(),
        }
    }

    /// Numeric status for the response envelope.  Unparseable codes map to 400.
    pub fn status(&self) -> u16 {
        self.code.parse().unwrap_or(CODE_BAD_REQUEST)
    }
}

impl Response {
    fn new(req_id: u32, code: u16, msg: &str, msg_data: Value) -> Self {
        Self {
            kind: "resp".to_string(),
            req_id,
            code,
            msg: msg.to_string(),
            msg_data,
        }
    }

    /// Plain acknowledgment of a request.
    pub fn ack(req_id: u32) -> Self {
        Self::new(req_id, CODE_OK, MSG_RESULT, json!({}))
    }

    pub fn error(req_id: u32, payload: ErrorPayload) -> Self {
        let code = payload.status();
        Self::new(req_id, code, MSG_RESULT, json!(payload))
    }

    pub fn driver_version(req_id: u32, name: &str, version: &str) -> Self {
        Self::new(
            req_id,
            CODE_OK,
            MSG_DRIVER_VERSION,
            json!({ "name": name, "version": { "driver": version } }),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// Unsolicited notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub msg: String,
    pub cat: String,
    #[serde(default)]
    pub msg_data: Value,
}

impl Event {
    fn new(msg: &str, cat: &str, msg_data: Value) -> Self {
        Self {
            kind: "event".to_string(),
            msg: msg.to_string(),
            cat: cat.to_string(),
            msg_data,
        }
    }

    pub fn setup_change(change: SetupChange) -> Self {
        Self::new(MSG_DRIVER_SETUP_CHANGE, "DEVICE", json!(change))
    }

    /// `entity_change` event setting the entity's `state` attribute.
    pub fn entity_state(entity: &EntityRef, state: &str) -> Self {
        Self::new(
            MSG_ENTITY_CHANGE,
            "ENTITY",
            json!({
                "entity_type": entity.entity_type,
                "entity_id": entity.entity_id,
                "attributes": { "state": state },
            }),
        )
    }

    pub fn device_state(state: &str) -> Self {
        Self::new(MSG_DEVICE_STATE, "DEVICE", json!({ "state": state }))
    }
}

/// Phase of a `driver_setup_change` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupEventType {
    Setup,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupState {
    /// Work in progress.
    Setup,
    WaitUserAction,
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireUserAction {
    pub input: SettingsPage,
}

/// `driver_setup_change` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupChange {
    pub event_type: SetupEventType,
    pub state: SetupState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_user_action: Option<RequireUserAction>,
}

impl SetupChange {
    /// Provisional signal sent before a submission is processed.
    pub fn in_progress() -> Self {
        Self {
            event_type: SetupEventType::Setup,
            state: SetupState::Setup,
            require_user_action: None,
        }
    }

    pub fn waiting_for_input(page: SettingsPage) -> Self {
        Self {
            event_type: SetupEventType::Setup,
            state: SetupState::WaitUserAction,
            require_user_action: Some(RequireUserAction { input: page }),
        }
    }

    /// Terminal signal closing a setup attempt.
    pub fn finished(success: bool) -> Self {
        Self {
            event_type: SetupEventType::Stop,
            state: if success { SetupState::Ok } else { SetupState::Error },
            require_user_action: None,
        }
    }
}
