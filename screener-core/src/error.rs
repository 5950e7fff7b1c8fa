use thiserror::Error;

/// All errors generated in `screener-core`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenerError {
    /// Connection refused, dropped, or errored. Surfaced to consumers only as
    /// a connectivity change; never retried by the client itself.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A frame is not well-formed `RawUpdate` JSON. Dropped at the client
    /// boundary so it can never corrupt the snapshot.
    #[error("failed to decode frame: {0}")]
    Decode(String),

    /// Frame decoded, but the symbol is not a URL-embeddable token.
    #[error("rejected symbol token: {0:?}")]
    InvalidSymbol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ScreenerError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for ScreenerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_from_serde() {
        let err = serde_json::from_str::<crate::types::RawUpdate>("{").unwrap_err();
        assert!(matches!(ScreenerError::from(err), ScreenerError::Decode(_)));
    }
}
