/// Configuration for the streaming connection and the engine lifecycle.
use std::time::Duration;

use crate::lifecycle::DEFAULT_RELOAD_INTERVAL;

/// Streaming connection configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket feed URL, fixed at startup
    pub url: String,
    /// Buffer size of the decoded-update channel
    pub channel_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9001".to_string(),
            channel_buffer: 1000,
        }
    }
}

impl StreamConfig {
    /// Create a new configuration with a custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the decoded-update channel buffer size
    pub fn with_channel_buffer(mut self, size: usize) -> Self {
        self.channel_buffer = size;
        self
    }
}

/// Engine configuration: connection plus the full-reload interval
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Streaming connection settings
    pub stream: StreamConfig,
    /// How long a session lives before the engine tears it down and rebuilds
    pub reload_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            reload_interval: DEFAULT_RELOAD_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with a custom feed URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            stream: StreamConfig::new(url),
            ..Default::default()
        }
    }

    /// Set the session reload interval
    pub fn with_reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = interval;
        self
    }

    /// Set the decoded-update channel buffer size
    pub fn with_channel_buffer(mut self, size: usize) -> Self {
        self.stream.channel_buffer = size;
        self
    }
}
