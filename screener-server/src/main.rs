use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rand::Rng;
use screener_core::{RawUpdate, Side};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::broadcast,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Symbol universe for the synthetic feed: (symbol, base price, base 24h volume)
const SYMBOLS: [(&str, f64, f64); 12] = [
    ("BTCUSDT", 97_000.0, 28_000_000_000.0),
    ("ETHUSDT", 3_500.0, 14_000_000_000.0),
    ("SOLUSDT", 210.0, 3_800_000_000.0),
    ("ADAUSDT", 1.15, 900_000_000.0),
    ("XRPUSDT", 2.40, 4_100_000_000.0),
    ("DOGEUSDT", 0.38, 2_300_000_000.0),
    ("LINKUSDT", 24.0, 700_000_000.0),
    ("AVAXUSDT", 42.0, 520_000_000.0),
    ("DOTUSDT", 8.3, 310_000_000.0),
    ("TONUSDT", 5.6, 240_000_000.0),
    ("ARBUSDT", 0.92, 180_000_000.0),
    ("PEPEUSDT", 0.000021, 1_100_000_000.0),
];

#[tokio::main]
async fn main() {
    init_logging();

    info!("Starting screener feed server");

    // Broadcast channel of pre-serialized frames
    // Configurable buffer size via SCREENER_BUFFER_SIZE env var (default: 10,000)
    let buffer_size = std::env::var("SCREENER_BUFFER_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000);

    info!("Broadcast buffer size: {}", buffer_size);
    let (tx, _rx) = broadcast::channel::<String>(buffer_size);
    let tx = Arc::new(tx);

    // Start WebSocket server
    // Configurable via SCREENER_WS_ADDR env var (default: 0.0.0.0:9001)
    let server_addr_str =
        std::env::var("SCREENER_WS_ADDR").unwrap_or_else(|_| "0.0.0.0:9001".to_string());
    let server_addr = server_addr_str
        .parse::<SocketAddr>()
        .unwrap_or_else(|_| "0.0.0.0:9001".parse().unwrap());
    let tx_clone = tx.clone();
    tokio::spawn(async move {
        start_websocket_server(server_addr, tx_clone).await;
    });

    info!("Feed server listening on ws://{}", server_addr);

    // Synthesize one update per tick
    // Configurable via SCREENER_TICK_MS env var (default: 250)
    let tick_ms = std::env::var("SCREENER_TICK_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(250);

    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    loop {
        interval.tick().await;

        let update = synth_update(&mut rand::rng());
        match serde_json::to_string(&update) {
            Ok(json) => {
                // Errors just mean no receivers are connected yet
                let _ = tx.send(json);
                debug!(
                    "Broadcast {} @ {} to {} clients",
                    update.symbol,
                    update.price,
                    tx.receiver_count()
                );
            }
            Err(e) => {
                warn!("Failed to serialize update: {}", e);
            }
        }
    }
}

/// Build one randomized per-symbol update around its base price/volume
fn synth_update(rng: &mut impl Rng) -> RawUpdate {
    let (symbol, base_price, base_volume) = SYMBOLS[rng.random_range(0..SYMBOLS.len())];

    let times_more = round1(rng.random_range(0.5..6.5));
    let volume_24h = base_volume * rng.random_range(0.8..1.2);
    let max_density = volume_24h * rng.random_range(0.0005..0.01);
    // Half of the frames carry the extended schema fields
    let extended = rng.random_bool(0.5);

    RawUpdate {
        symbol: symbol.into(),
        price: base_price * rng.random_range(0.98..1.02),
        volume_24h,
        price_change: round1(rng.random_range(-6.0..6.0)),
        max_density,
        side: if rng.random_bool(0.5) {
            Side::Bid
        } else {
            Side::Ask
        },
        times_more,
        percent: extended.then(|| round1(max_density / volume_24h * 100.0)),
        is_high_density: extended.then(|| times_more > 4.0),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Start WebSocket server that broadcasts updates to connected clients
async fn start_websocket_server(addr: SocketAddr, tx: Arc<broadcast::Sender<String>>) {
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind WebSocket server");

    info!("WebSocket server bound to {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from {}", peer_addr);
        let tx = tx.clone();
        tokio::spawn(handle_client(stream, peer_addr, tx));
    }
}

/// Handle individual WebSocket client connection
async fn handle_client(stream: TcpStream, peer_addr: SocketAddr, tx: Arc<broadcast::Sender<String>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", peer_addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut rx = tx.subscribe();

    // Forward broadcast frames to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(json) => {
                    if ws_sender.send(Message::text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Client fell behind; skip ahead rather than disconnect
                    warn!("Client {} lagged, skipped {} frames", peer_addr, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Broadcast channel closed for {}", peer_addr);
                    break;
                }
            }
        }
    });

    // Drain incoming messages (ping/pong, close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {
                    debug!("Received ping from {}", peer_addr);
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", peer_addr, e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either direction to finish
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
    }

    info!("WebSocket connection closed for {}", peer_addr);
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
