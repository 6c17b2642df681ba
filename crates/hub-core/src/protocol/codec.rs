//! JSON frame codec.
//!
//! Decoding happens in two stages.  First the envelope (`kind`, `id`, `msg`,
//! `msg_data`) is parsed without looking at the payload; then `msg` selects
//! the payload type and `msg_data` is deserialized into it.  This keeps an
//! unknown message name from being a decode error: the host answers it with
//! a 400 instead of dropping the frame.  The same holds for a known request
//! whose payload has the wrong shape, since its id is already known.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::protocol::messages::{
    DriverEvent, DriverRequest, Inbound, OutboundMessage, MSG_ABORT_DRIVER_SETUP,
    MSG_GET_DEVICE_STATE, MSG_GET_DRIVER_VERSION, MSG_SETUP_DRIVER, MSG_SET_DRIVER_USER_DATA,
    MSG_SUBSCRIBE_EVENTS, MSG_UNSUBSCRIBE_EVENTS,
};

/// Errors that can occur while decoding or encoding frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame is not a JSON object with the envelope fields.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The `kind` field is neither `req` nor `event`.
    #[error("unsupported message kind: {0}")]
    UnknownKind(String),

    /// A request frame has no numeric `id`.
    #[error("request '{0}' has no id")]
    MissingRequestId(String),

    #[error("failed to serialize frame: {0}")]
    Serialize(String),
}

/// Envelope of an inbound frame, payload left untouched.
#[derive(Debug, Deserialize)]
struct RawFrame {
    kind: String,
    #[serde(default)]
    id: Option<u32>,
    msg: String,
    #[serde(default)]
    msg_data: Value,
}

/// Decodes one inbound text frame.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the text is not a valid envelope, the kind is
/// unknown or a request lacks its id.  A request payload of the wrong shape
/// decodes to [`DriverRequest::Malformed`].
///
/// # Examples
///
/// ```rust
/// use hub_core::protocol::{decode_inbound, DriverRequest, Inbound};
///
/// let frame = r#"{"kind":"req","id":1,"msg":"setup_driver","msg_data":{"reconfigure":true}}"#;
/// let Inbound::Request { id, request } = decode_inbound(frame).unwrap() else {
///     panic!("expected a request");
/// };
/// assert_eq!(id, 1);
/// assert!(matches!(request, DriverRequest::SetupDriver(m) if m.reconfigure));
/// ```
pub fn decode_inbound(text: &str) -> Result<Inbound, ProtocolError> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFrame(e.to_string()))?;

    match raw.kind.as_str() {
        "req" => {
            let id = raw
                .id
                .ok_or_else(|| ProtocolError::MissingRequestId(raw.msg.clone()))?;
            trace!(id, msg = %raw.msg, "decoded request envelope");
            let request = decode_request(&raw.msg, raw.msg_data);
            Ok(Inbound::Request { id, request })
        }
        "event" => Ok(Inbound::Event(match raw.msg.as_str() {
            MSG_ABORT_DRIVER_SETUP => DriverEvent::AbortDriverSetup,
            _ => DriverEvent::Other(raw.msg),
        })),
        other => Err(ProtocolError::UnknownKind(other.to_string())),
    }
}

/// Serializes an outbound message to a JSON text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if serialization fails.
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

fn decode_request(msg: &str, msg_data: Value) -> DriverRequest {
    let decoded = match msg {
        MSG_SETUP_DRIVER => payload(msg_data).map(DriverRequest::SetupDriver),
        MSG_SET_DRIVER_USER_DATA => payload(msg_data).map(DriverRequest::SetDriverUserData),
        MSG_SUBSCRIBE_EVENTS => payload(msg_data).map(DriverRequest::SubscribeEvents),
        MSG_UNSUBSCRIBE_EVENTS => payload(msg_data).map(DriverRequest::UnsubscribeEvents),
        MSG_GET_DRIVER_VERSION => Ok(DriverRequest::GetDriverVersion),
        MSG_GET_DEVICE_STATE => Ok(DriverRequest::GetDeviceState),
        other => Ok(DriverRequest::Unsupported(other.to_string())),
    };

    decoded.unwrap_or_else(|e| {
        debug!(msg, error = %e, "request payload has the wrong shape");
        DriverRequest::Malformed {
            msg: msg.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Deserializes `msg_data`, treating an absent payload as an empty object.
fn payload<T: DeserializeOwned>(msg_data: Value) -> Result<T, serde_json::Error> {
    let msg_data = if msg_data.is_null() {
        Value::Object(Map::new())
    } else {
        msg_data
    };
    serde_json::from_value(msg_data)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
