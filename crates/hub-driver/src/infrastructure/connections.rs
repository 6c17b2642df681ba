//! Socket-id → writer channel table.
//!
//! Each WebSocket session registers an mpsc channel under its socket id; a
//! writer task drains the channel into the socket.  Because one channel
//! carries everything for a socket, messages sent one after another arrive
//! in that order, while sends from different tasks never block each other
//! on the socket itself.  A socket whose queue stays full for longer than
//! the send timeout fails the send instead of holding up the caller.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use hub_core::{encode_outbound, OutboundMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{trace, warn};

use crate::application::ports::{ResponseSender, SendError};

/// Outbound frames buffered per socket before senders wait.
const OUTBOUND_BUFFER: usize = 64;

/// How long a send may wait for room in a full outbound queue.
const SEND_TIMEOUT: Duration = Duration::from_secs(2);

pub struct ConnectionHub {
    connections: DashMap<String, mpsc::Sender<String>>,
    send_timeout: Duration,
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::with_send_timeout(SEND_TIMEOUT)
    }
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_send_timeout(send_timeout: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            send_timeout,
        }
    }

    /// Registers a socket and returns the receiving end of its writer channel.
    pub fn register(&self, socket_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        self.connections.insert(socket_id.to_string(), tx);
        rx
    }

    pub fn unregister(&self, socket_id: &str) {
        self.connections.remove(socket_id);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[async_trait]
impl ResponseSender for ConnectionHub {
    async fn send(&self, socket_id: &str, message: OutboundMessage) -> Result<(), SendError> {
        let text = encode_outbound(&message)?;

        // Clone the sender out so no map guard is held across the await.
        let tx = self
            .connections
            .get(socket_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SendError::UnknownSocket(socket_id.to_string()))?;

        trace!(socket_id, msg = message.msg(), "queueing outbound frame");
        tx.send_timeout(text, self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => {
                    warn!(socket_id, "outbound queue full, dropping frame");
                    SendError::Stalled(socket_id.to_string())
                }
                SendTimeoutError::Closed(_) => SendError::Closed(socket_id.to_string()),
            })
    }
}
