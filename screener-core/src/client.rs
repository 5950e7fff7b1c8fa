//! WebSocket client owning a single streaming connection.
//!
//! One connection per start: `Closed` and `Errored` are both terminal and the
//! client never retries in-process. Recovery from a dead feed is the engine's
//! reload cycle, not a reconnect loop here.

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::ScreenerError;
use crate::types::RawUpdate;

/// Connection lifecycle states reported by the client.
///
/// `Idle -> Connecting -> Open -> {Closed, Errored}`; the two end states are
/// terminal and both read as disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionStatus {
    /// The connectivity flag consumed by the presentation layer
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }

    /// Whether the client is done with this connection
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Closed | ConnectionStatus::Errored)
    }
}

/// WebSocket client for screener updates
pub struct StreamClient {
    config: StreamConfig,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Spawn the connection task.
    ///
    /// Returns a handle for teardown plus receivers for decoded updates and
    /// status transitions. Frames that fail to decode are dropped inside the
    /// task and never surface on the update channel.
    pub fn start(
        self,
    ) -> (
        StreamHandle,
        mpsc::Receiver<RawUpdate>,
        mpsc::Receiver<ConnectionStatus>,
    ) {
        let (update_tx, update_rx) = mpsc::channel(self.config.channel_buffer);
        let (status_tx, status_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_connection(
            self.config,
            update_tx,
            status_tx,
            shutdown_rx,
        ));

        (
            StreamHandle {
                shutdown: shutdown_tx,
                task: Some(task),
            },
            update_rx,
            status_rx,
        )
    }
}

/// Teardown handle for a running connection
pub struct StreamHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Idempotent teardown.
    ///
    /// Signals the connection task and waits for it to finish, so no update
    /// or status is delivered after this returns.
    pub async fn close(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Decode one text frame into a [`RawUpdate`].
///
/// Malformed JSON and unsafe symbol tokens are both decode failures; callers
/// drop them here so the snapshot store only ever sees well-formed updates.
pub(crate) fn decode_frame(text: &str) -> Result<RawUpdate, ScreenerError> {
    let update: RawUpdate = serde_json::from_str(text)?;
    if !update.has_valid_symbol() {
        return Err(ScreenerError::InvalidSymbol(update.symbol.to_string()));
    }
    Ok(update)
}

async fn run_connection(
    config: StreamConfig,
    update_tx: mpsc::Sender<RawUpdate>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let _ = status_tx.send(ConnectionStatus::Connecting).await;

    let connected = tokio::select! {
        biased;
        _ = shutdown_rx.changed() => {
            let _ = status_tx.send(ConnectionStatus::Closed).await;
            return;
        }
        connected = connect_async(&config.url) => connected,
    };

    let mut ws_stream = match connected {
        Ok((ws_stream, _)) => {
            info!("Connected to screener feed at {}", config.url);
            let _ = status_tx.send(ConnectionStatus::Open).await;
            ws_stream
        }
        Err(e) => {
            warn!("Failed to connect to {}: {}", config.url, e);
            let _ = status_tx.send(ConnectionStatus::Errored).await;
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                debug!("Stream client shutting down");
                let _ = status_tx.send(ConnectionStatus::Closed).await;
                return;
            }
            msg = ws_stream.next() => {
                let Some(msg) = msg else {
                    info!("Feed stream ended");
                    let _ = status_tx.send(ConnectionStatus::Closed).await;
                    return;
                };

                match msg {
                    Ok(Message::Text(text)) => match decode_frame(&text) {
                        Ok(update) => {
                            if update_tx.send(update).await.is_err() {
                                debug!("Update receiver dropped, stopping client");
                                let _ = status_tx.send(ConnectionStatus::Closed).await;
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Dropping undecodable frame: {}", e);
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Server closed connection");
                        let _ = status_tx.send(ConnectionStatus::Closed).await;
                        return;
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                        // Heartbeat messages - tungstenite handles these automatically
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error: {}", e);
                        let _ = status_tx.send(ConnectionStatus::Errored).await;
                        return;
                    }
                }
            }
        }
    }
}
