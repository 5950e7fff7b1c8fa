/// Core data types for the screener feed.
///
/// These types match the JSON message format pushed by the feed server: one
/// frame per symbol per send, camelCase field names, no ordering guarantee
/// across symbols.
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::format::{classify_large_volume, format_magnitude};

/// Side of the resting density behind an update.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Convert to display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }

    /// Check if the density sits on the bid side
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if the density sits on the ask side
    pub fn is_ask(&self) -> bool {
        matches!(self, Side::Ask)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-symbol market snapshot as it arrives on the wire.
///
/// `percent` and `is_high_density` only exist on newer feed versions and stay
/// absent here when the server omits them. Unknown extra fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawUpdate {
    /// Instrument symbol (e.g., "BTCUSDT"); keys the snapshot
    pub symbol: SmolStr,
    /// Last traded price
    pub price: f64,
    /// Rolling 24h traded volume, raw quote units
    pub volume_24h: f64,
    /// Price change over the feed's reference window, in percent
    pub price_change: f64,
    /// Size of the largest resting density, raw quote units
    pub max_density: f64,
    /// Which book side the density sits on
    pub side: Side,
    /// Density size as a multiple of the symbol's average
    pub times_more: f64,
    /// Density-to-volume ratio, newer feeds only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    /// Server-side high-density flag, newer feeds only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_high_density: Option<bool>,
}

impl RawUpdate {
    /// A symbol is accepted only as a non-empty ASCII `[A-Za-z0-9_-]` token.
    ///
    /// The presentation layer splices symbols into outbound chart URLs, so
    /// anything outside that alphabet is rejected at the decode boundary.
    pub fn has_valid_symbol(&self) -> bool {
        !self.symbol.is_empty()
            && self
                .symbol
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }
}

/// Presentation-ready state stored per symbol.
///
/// Derived from exactly one [`RawUpdate`]: the display strings are always the
/// formatter's output of the last-received raw values, never a blend of old
/// and new fields.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    pub symbol: SmolStr,
    pub price: f64,
    pub price_change: f64,
    pub side: Side,
    /// Formatted `max_density` (e.g., "2.3M")
    pub max_density_display: String,
    /// Formatted `volume_24h`
    pub volume_24h_display: String,
    pub times_more: f64,
    /// `volume_24h > 100_000_000`, evaluated on the raw value at update time
    pub large_volume: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_high_density: Option<bool>,
}

impl SymbolRecord {
    /// Derive the stored record from a single wire update.
    pub fn from_update(raw: &RawUpdate) -> Self {
        Self {
            symbol: raw.symbol.clone(),
            price: raw.price,
            price_change: raw.price_change,
            side: raw.side,
            max_density_display: format_magnitude(raw.max_density),
            volume_24h_display: format_magnitude(raw.volume_24h),
            times_more: raw.times_more,
            large_volume: classify_large_volume(raw.volume_24h),
            percent: raw.percent,
            is_high_density: raw.is_high_density,
        }
    }

    /// Density multiplier worth highlighting
    pub fn is_hot(&self) -> bool {
        self.times_more > 2.0
    }

    /// Density multiplier worth a background highlight
    pub fn is_extreme(&self) -> bool {
        self.times_more > 4.0
    }

    /// Whether the price change reads as positive
    pub fn is_positive_change(&self) -> bool {
        self.price_change > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(symbol: &str) -> RawUpdate {
        RawUpdate {
            symbol: SmolStr::new(symbol),
            price: 42.5,
            volume_24h: 120_000_000.0,
            price_change: -1.2,
            side: Side::Ask,
            max_density: 2_340_000.0,
            times_more: 3.0,
            percent: None,
            is_high_density: None,
        }
    }

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Bid.to_string(), "bid");
        assert_eq!(Side::Ask.to_string(), "ask");
        assert!(Side::Bid.is_bid());
        assert!(!Side::Bid.is_ask());
    }

    #[test]
    fn test_raw_update_decodes_legacy_schema() {
        // Older feed shape: no percent, no isHighDensity, extra unknown field
        let json = r#"{
            "symbol": "BTCUSDT",
            "price": 97000.5,
            "volume24h": 1500000000.0,
            "priceChange": 2.4,
            "maxDensity": 2340000.0,
            "side": "bid",
            "timesMore": 5.0,
            "serverRevision": 3
        }"#;

        let update: RawUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.symbol, "BTCUSDT");
        assert_eq!(update.side, Side::Bid);
        assert_eq!(update.percent, None);
        assert_eq!(update.is_high_density, None);
    }

    #[test]
    fn test_raw_update_decodes_extended_schema() {
        let json = r#"{
            "symbol": "ETHUSDT",
            "price": 3500.0,
            "volume24h": 90000000.0,
            "priceChange": -0.7,
            "maxDensity": 800000.0,
            "side": "ask",
            "timesMore": 1.5,
            "percent": 0.9,
            "isHighDensity": true
        }"#;

        let update: RawUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.percent, Some(0.9));
        assert_eq!(update.is_high_density, Some(true));
    }

    #[test]
    fn test_raw_update_rejects_missing_required_field() {
        let json = r#"{"symbol": "BTCUSDT", "price": 1.0}"#;
        assert!(serde_json::from_str::<RawUpdate>(json).is_err());
    }

    #[test]
    fn test_symbol_token_validation() {
        assert!(update("BTCUSDT").has_valid_symbol());
        assert!(update("1000PEPE_USDT-PERP").has_valid_symbol());
        assert!(!update("").has_valid_symbol());
        assert!(!update("BTC/USDT").has_valid_symbol());
        assert!(!update("btc usdt").has_valid_symbol());
    }

    #[test]
    fn test_record_derivation_formats_last_raw_values() {
        let raw = update("SOLUSDT");
        let record = SymbolRecord::from_update(&raw);

        assert_eq!(record.max_density_display, "2.3M");
        assert_eq!(record.volume_24h_display, "120.0M");
        assert!(record.large_volume);
        assert!(record.is_hot());
        assert!(!record.is_extreme());
        assert!(!record.is_positive_change());
    }

    #[test]
    fn test_absent_optionals_stay_absent_in_serialized_record() {
        let record = SymbolRecord::from_update(&update("BTCUSDT"));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("percent").is_none());
        assert!(json.get("isHighDensity").is_none());
    }
}
