/// Pure display-scaling helpers shared by the snapshot store and the UI.
///
/// These are total functions: any `f64` input produces a string or a flag
/// without panicking.

/// 24h volume above which a cell is flagged as large (raw, pre-format value).
pub const LARGE_VOLUME_THRESHOLD: f64 = 100_000_000.0;

/// Scale a raw magnitude into a compact suffixed string.
///
/// Values at or above 1e9/1e6/1e3 are divided down and rendered with one
/// decimal plus a `B`/`M`/`K` suffix; everything else renders with two
/// decimals. Negative and NaN values fail every threshold comparison and
/// fall through to the two-decimal branch.
pub fn format_magnitude(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.1}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.2}")
    }
}

/// Whether a 24h volume counts as large, evaluated on the unformatted value.
pub fn classify_large_volume(volume_24h: f64) -> bool {
    volume_24h > LARGE_VOLUME_THRESHOLD
}
