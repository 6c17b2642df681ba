//! Protocol module containing the JSON envelopes and the frame codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_inbound, encode_outbound, ProtocolError};
pub use messages::*;
