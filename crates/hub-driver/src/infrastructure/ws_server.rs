//! WebSocket server: accept loop and per-connection task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket session and giving
//!    it a fresh socket id.
//! 3. Running three pieces per session:
//!    - a **reader** task that decodes inbound text frames,
//!    - a **writer** task that drains the socket's outbound channel,
//!    - the **request loop** (the session task itself) that hands decoded
//!      frames to the [`RequestRouter`] one at a time.
//! 4. Tearing the session down on disconnect: the connection's
//!    `CancellationToken` is cancelled, which also abandons any request still
//!    being processed, and every registry entry of the socket is removed.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Ordering (for beginners)
//!
//! Requests from one socket are processed strictly one after another, so the
//! setup state of a socket only ever has a single writer.  Different sockets
//! run on different Tokio tasks and proceed in parallel.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use hub_core::{decode_inbound, Inbound};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::host_driver::HostDeviceDriver;
use crate::application::ports::{
    ConfigurationStore, EntityResolver, ResponseSender, SetupHandlers,
};
use crate::application::router::RequestRouter;
use crate::application::session_registry::SessionRegistry;
use crate::application::setup_flow::SetupFlow;
use crate::domain::config::DriverConfig;
use crate::infrastructure::connections::ConnectionHub;

/// How long `accept()` may block before the `running` flag is re-checked.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Decoded frames buffered per socket while a request is being processed.
const INBOUND_BUFFER: usize = 32;

/// Everything a session task needs, shared across all sessions.
struct ServerContext {
    hub: Arc<ConnectionHub>,
    router: Arc<RequestRouter>,
    registry: Arc<SessionRegistry>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound, not yet running, driver server.
pub struct DriverServer {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl DriverServer {
    /// Binds the listener and wires the bundled host-device driver to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound (port in use, no
    /// permission).
    pub async fn bind(config: &DriverConfig, store: Arc<dyn ConfigurationStore>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.ws_bind_addr)
            .await
            .with_context(|| format!("failed to bind WebSocket listener on {}", config.ws_bind_addr))?;

        let registry = Arc::new(SessionRegistry::new());
        let hub = Arc::new(ConnectionHub::new());
        let sender: Arc<dyn ResponseSender> = Arc::clone(&hub) as Arc<dyn ResponseSender>;
        let driver = Arc::new(HostDeviceDriver::new(Arc::clone(&store)));

        let flow = Arc::new(SetupFlow::new(
            Arc::clone(&registry),
            store,
            Arc::clone(&sender),
            Arc::clone(&driver) as Arc<dyn SetupHandlers>,
            driver as Arc<dyn EntityResolver>,
        ));
        let router = Arc::new(RequestRouter::new(
            flow,
            sender,
            &config.driver_id,
            &config.driver_version,
        ));

        Ok(Self {
            listener,
            ctx: Arc::new(ServerContext {
                hub,
                router,
                registry,
            }),
        })
    }

    /// Actual bound address; differs from the configured one when port 0
    /// was requested.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.ctx.registry)
    }

    pub fn connections(&self) -> Arc<ConnectionHub> {
        Arc::clone(&self.ctx.hub)
    }

    /// Accepts hub connections until `running` is set to `false`.
    pub async fn run(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        info!("hub driver listening on {}", self.local_addr()?);

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    debug!("new connection from {peer_addr}");
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, ctx).await;
                    });
                }
                Ok(Err(e)) => {
                    error!("accept error: {e}");
                }
                Err(_) => {
                    // No connection within the poll window; re-check `running`.
                }
            }
        }

        Ok(())
    }
}

/// Binds and runs a server in one call.
pub async fn run_server(
    config: DriverConfig,
    store: Arc<dyn ConfigurationStore>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    DriverServer::bind(&config, store).await?.run(running).await
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<ServerContext>) {
    match run_session(stream, peer_addr, ctx).await {
        Ok(()) => info!("session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(raw_stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<ServerContext>) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let socket_id = Uuid::new_v4().to_string();
    info!(%socket_id, %peer_addr, "hub connected");

    let (ws_tx, ws_rx) = ws_stream.split();
    let outbound_rx = ctx.hub.register(&socket_id);
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<Inbound>(INBOUND_BUFFER);
    let cancel = CancellationToken::new();

    let writer = tokio::spawn(write_frames(ws_tx, outbound_rx, cancel.clone()));
    let reader = tokio::spawn(read_frames(
        ws_rx,
        inbound_tx,
        cancel.clone(),
        socket_id.clone(),
    ));

    loop {
        let inbound = tokio::select! {
            _ = cancel.cancelled() => break,
            next = inbound_rx.recv() => match next {
                Some(inbound) => inbound,
                None => break,
            },
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%socket_id, "connection closed while a request was in flight");
                break;
            }
            () = ctx.router.route(&socket_id, inbound) => {}
        }
    }

    cancel.cancel();
    ctx.hub.unregister(&socket_id);
    ctx.registry.remove_session(&socket_id);

    let _ = reader.await;
    let _ = writer.await;
    info!(%socket_id, "hub disconnected");
    Ok(())
}

/// Decodes text frames and queues them for the request loop.  Cancels the
/// connection when the stream ends.
async fn read_frames<S>(
    mut ws_rx: S,
    inbound_tx: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
    socket_id: String,
) where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = ws_rx.next() => frame,
        };

        match frame {
            Some(Ok(WsMessage::Text(text))) => match decode_inbound(&text) {
                Ok(inbound) => {
                    if inbound_tx.send(inbound).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(%socket_id, error = %e, "dropping undecodable frame"),
            },
            Some(Ok(WsMessage::Close(_))) | None => {
                debug!(%socket_id, "peer closed the connection");
                break;
            }
            Some(Ok(WsMessage::Binary(_))) => {
                debug!(%socket_id, "ignoring binary frame");
            }
            // Ping / Pong are answered by tungstenite itself.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(%socket_id, "WebSocket read error: {e}");
                break;
            }
        }
    }

    cancel.cancel();
}

/// Drains the socket's outbound channel into the WebSocket.
async fn write_frames<S>(mut ws_tx: S, mut outbound_rx: mpsc::Receiver<String>, cancel: CancellationToken)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    loop {
        let text = tokio::select! {
            _ = cancel.cancelled() => break,
            next = outbound_rx.recv() => match next {
                Some(text) => text,
                None => break,
            },
        };

        if let Err(e) = ws_tx.send(WsMessage::Text(text)).await {
            debug!("WebSocket write failed: {e}");
            break;
        }
    }

    cancel.cancel();
    let _ = ws_tx.close().await;
}
