//! Single-writer engine behind the presentation contract.
//!
//! All snapshot mutation happens inside one task, serialized through a single
//! `select!` loop over shutdown, reload fires, connection status, and decoded
//! updates. Presentation code reads through [`EngineHandle`] and can never
//! write market data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use smol_str::SmolStr;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::{ConnectionStatus, StreamClient};
use crate::config::EngineConfig;
use crate::lifecycle::{ReloadFired, ReloadTimer};
use crate::project::{SortMode, project};
use crate::snapshot::Snapshot;
use crate::types::SymbolRecord;

/// State shared between the engine task and presentation readers.
///
/// Market data has exactly one writer (the engine task); `sort_mode` is the
/// UI's own knob and stored here only so the projection can read it.
#[derive(Debug)]
struct Shared {
    snapshot: Snapshot,
    connected: bool,
    sort_mode: SortMode,
    last_update: Option<DateTime<Utc>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            snapshot: Snapshot::new(),
            connected: false,
            sort_mode: SortMode::default(),
            last_update: None,
        }
    }
}

/// Running engine session: owns the connection, the snapshot, and the reload
/// timer. Dropping it (or calling [`Engine::shutdown`]) releases all three.
pub struct Engine {
    handle: EngineHandle,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start a session: connect to the feed, fold updates into the snapshot,
    /// and arm the one-shot reload timer.
    pub fn start(config: EngineConfig) -> Self {
        let shared = Arc::new(RwLock::new(Shared::new()));
        let (revision_tx, revision_rx) = watch::channel(0u64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_engine(
            config,
            Arc::clone(&shared),
            revision_tx,
            shutdown_rx,
        ));

        Self {
            handle: EngineHandle {
                shared,
                revision: revision_rx,
            },
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Reader handle for the presentation layer
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Tear the session down: close the connection, cancel the pending
    /// reload, and wait for the engine task to finish. Idempotent. No
    /// snapshot mutation can happen after this returns, buffered frames
    /// included.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Cloneable read-side handle consumed by the presentation layer.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<RwLock<Shared>>,
    revision: watch::Receiver<u64>,
}

impl EngineHandle {
    /// Clone of the current snapshot; mutating it cannot affect the engine
    pub fn snapshot(&self) -> Snapshot {
        self.shared.read().snapshot.clone()
    }

    /// Whether the streaming connection is currently open
    pub fn connectivity(&self) -> bool {
        self.shared.read().connected
    }

    pub fn sort_mode(&self) -> SortMode {
        self.shared.read().sort_mode
    }

    /// Set the row ordering. UI-owned; never touches market data.
    pub fn set_sort_mode(&self, mode: SortMode) {
        self.shared.write().sort_mode = mode;
    }

    /// Ordered rows under the current sort mode
    pub fn rows(&self) -> Vec<(SmolStr, SymbolRecord)> {
        let state = self.shared.read();
        project(&state.snapshot, state.sort_mode)
    }

    /// Wall-clock time of the last applied update in this session
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.shared.read().last_update
    }

    /// Change notification: the value increments on every snapshot or
    /// connectivity change, including the wholesale clear on reload.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }
}

fn bump(revision: &watch::Sender<u64>) {
    revision.send_modify(|rev| *rev += 1);
}

async fn run_engine(
    config: EngineConfig,
    shared: Arc<RwLock<Shared>>,
    revision: watch::Sender<u64>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (reload_tx, mut reload_rx) = mpsc::channel(1);

    let mut timer = ReloadTimer::schedule(config.reload_interval, reload_tx.clone());
    let (mut stream, mut updates, mut statuses) =
        StreamClient::new(config.stream.clone()).start();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                stream.close().await;
                timer.cancel();
                shared.write().connected = false;
                bump(&revision);
                debug!("Engine shut down");
                return;
            }
            Some(ReloadFired) = reload_rx.recv() => {
                info!("Reload interval elapsed, rebuilding session");
                stream.close().await;
                {
                    let mut state = shared.write();
                    state.snapshot.clear();
                    state.connected = false;
                    state.last_update = None;
                }
                bump(&revision);

                (stream, updates, statuses) =
                    StreamClient::new(config.stream.clone()).start();
                timer = ReloadTimer::schedule(config.reload_interval, reload_tx.clone());
            }
            Some(status) = statuses.recv() => {
                // Transport events only toggle connectivity; the snapshot is
                // never cleared here
                shared.write().connected = status.is_open();
                bump(&revision);
            }
            Some(update) = updates.recv() => {
                {
                    let mut state = shared.write();
                    state.snapshot.apply_update(&update);
                    state.last_update = Some(Utc::now());
                }
                bump(&revision);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::{accept_async, tungstenite::Message};

    fn frame(symbol: &str, price: f64) -> String {
        format!(
            r#"{{"symbol":"{symbol}","price":{price},"volume24h":150000000.0,"priceChange":1.0,"maxDensity":500000.0,"side":"ask","timesMore":3.0}}"#
        )
    }

    /// Serve one feed connection per accept; each sends `frames` then parks.
    async fn spawn_feed(frames_per_conn: Vec<Vec<String>>, conns: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for frames in frames_per_conn {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                conns.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut ws_stream = accept_async(stream).await.unwrap();
                    for f in frames {
                        let _ = ws_stream.send(Message::text(f)).await;
                    }
                    while let Some(msg) = ws_stream.next().await {
                        if msg.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        format!("ws://{}", addr)
    }

    /// Wait on the revision channel until `pred` holds or the deadline passes.
    async fn wait_until(
        handle: &EngineHandle,
        mut pred: impl FnMut(&EngineHandle) -> bool,
    ) -> bool {
        let mut revision = handle.subscribe();
        let deadline = tokio::time::sleep(Duration::from_secs(5));
        tokio::pin!(deadline);

        loop {
            if pred(handle) {
                return true;
            }
            tokio::select! {
                _ = &mut deadline => return false,
                changed = revision.changed() => {
                    if changed.is_err() {
                        return pred(handle);
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_engine_folds_stream_last_update_wins() {
        let conns = Arc::new(AtomicUsize::new(0));
        let url = spawn_feed(
            vec![vec![
                frame("BTCUSDT", 97_000.0),
                frame("ETHUSDT", 3_500.0),
                frame("BTCUSDT", 97_100.0),
            ]],
            Arc::clone(&conns),
        )
        .await;

        let mut engine = Engine::start(EngineConfig::new(url));
        let handle = engine.handle();

        assert!(
            wait_until(&handle, |h| {
                h.snapshot()
                    .get("BTCUSDT")
                    .is_some_and(|r| r.price == 97_100.0)
            })
            .await
        );

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("ETHUSDT").unwrap().price, 3_500.0);
        assert!(handle.connectivity());
        assert!(handle.last_update().is_some());

        engine.shutdown().await;
        assert!(!handle.connectivity());
    }

    #[tokio::test]
    async fn test_shutdown_stops_snapshot_mutation() {
        let conns = Arc::new(AtomicUsize::new(0));
        let url = spawn_feed(
            vec![vec![frame("BTCUSDT", 97_000.0)]],
            Arc::clone(&conns),
        )
        .await;

        let mut engine = Engine::start(EngineConfig::new(url));
        let handle = engine.handle();

        assert!(wait_until(&handle, |h| h.snapshot().len() == 1).await);

        engine.shutdown().await;
        engine.shutdown().await;

        let before = handle.snapshot();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.snapshot(), before);
    }

    #[tokio::test]
    async fn test_reload_clears_and_rebuilds_session() {
        let conns = Arc::new(AtomicUsize::new(0));
        let url = spawn_feed(
            vec![
                vec![frame("BTCUSDT", 97_000.0)],
                vec![frame("BTCUSDT", 98_000.0)],
            ],
            Arc::clone(&conns),
        )
        .await;

        let mut engine = Engine::start(
            EngineConfig::new(url).with_reload_interval(Duration::from_millis(200)),
        );
        let handle = engine.handle();

        // First session
        assert!(
            wait_until(&handle, |h| {
                h.snapshot()
                    .get("BTCUSDT")
                    .is_some_and(|r| r.price == 97_000.0)
            })
            .await
        );

        // After the reload fires, the snapshot is rebuilt from a fresh
        // connection rather than patched in place
        assert!(
            wait_until(&handle, |h| {
                h.snapshot()
                    .get("BTCUSDT")
                    .is_some_and(|r| r.price == 98_000.0)
            })
            .await
        );
        assert_eq!(conns.load(Ordering::SeqCst), 2);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_sort_mode_is_ui_owned_and_projection_follows() {
        let conns = Arc::new(AtomicUsize::new(0));
        let url = spawn_feed(
            vec![vec![
                frame("ETHUSDT", 3_500.0),
                frame("BTCUSDT", 97_000.0),
                frame("ADAUSDT", 1.2),
            ]],
            Arc::clone(&conns),
        )
        .await;

        let mut engine = Engine::start(EngineConfig::new(url));
        let handle = engine.handle();

        assert!(wait_until(&handle, |h| h.snapshot().len() == 3).await);

        let arrival: Vec<String> =
            handle.rows().iter().map(|(s, _)| s.to_string()).collect();
        assert_eq!(arrival, vec!["ETHUSDT", "BTCUSDT", "ADAUSDT"]);

        handle.set_sort_mode(SortMode::Alphabetical);
        let sorted: Vec<String> =
            handle.rows().iter().map(|(s, _)| s.to_string()).collect();
        assert_eq!(sorted, vec!["ADAUSDT", "BTCUSDT", "ETHUSDT"]);

        // Toggling back restores arrival order; the snapshot was untouched
        handle.set_sort_mode(SortMode::InsertionOrder);
        let restored: Vec<String> =
            handle.rows().iter().map(|(s, _)| s.to_string()).collect();
        assert_eq!(restored, arrival);

        engine.shutdown().await;
    }
}
