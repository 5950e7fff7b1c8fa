/// Screener Core - Stream-to-view state synchronisation
///
/// This library keeps a live, keyed snapshot of per-symbol market state in
/// sync with a streaming feed:
/// - Wire and derived data types for screener updates
/// - WebSocket client with single-connection lifecycle semantics
/// - Last-value-wins snapshot store keyed by symbol
/// - Ordered projection for rendering, with a UI-owned sort mode
/// - One-shot reload timer driving periodic full session rebuilds
/// - The engine tying all of it together behind a read-only handle
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod project;
pub mod snapshot;
pub mod types;

// Re-export commonly used types for convenience
pub use client::{ConnectionStatus, StreamClient, StreamHandle};
pub use config::{EngineConfig, StreamConfig};
pub use engine::{Engine, EngineHandle};
pub use error::ScreenerError;
pub use format::{LARGE_VOLUME_THRESHOLD, classify_large_volume, format_magnitude};
pub use lifecycle::{DEFAULT_RELOAD_INTERVAL, ReloadFired, ReloadTimer};
pub use project::{SortMode, project};
pub use snapshot::Snapshot;
pub use types::{RawUpdate, Side, SymbolRecord};
