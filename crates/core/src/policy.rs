//! Table-size policy for character generation.

/// Smallest roster worth generating. Requests below are raised, not refused.
pub const MIN_PLAYERS: u8 = 3;
/// Largest roster; requests above are lowered, not refused.
pub const MAX_PLAYERS: u8 = 6;
/// Roster size when the caller does not say.
pub const DEFAULT_PLAYERS: u8 = 4;

/// Clamp a requested party size into the supported range.
///
/// Out-of-range requests are silently adjusted rather than rejected; the
/// generation flow should never stall over a table-size preference.
pub fn clamp_player_count(requested: Option<i64>) -> u8 {
    requested
        .unwrap_or(i64::from(DEFAULT_PLAYERS))
        .clamp(i64::from(MIN_PLAYERS), i64::from(MAX_PLAYERS)) as u8
}
