//! Session statistics and readout parsing
//!
//! The page shows running brick/chest totals as plain text. Reads can land
//! mid-update, so we keep high-water marks instead of trusting each read.

use serde::{Deserialize, Serialize};

/// Totals for one automation session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Rounds started by the autopilot
    pub games: u32,
    /// Bricks destroyed (page counter high-water mark)
    pub bricks: u32,
    /// Chests opened (page counter high-water mark)
    pub chests: u32,
}

impl SessionStats {
    /// Fold in a brick counter reading; returns true if it changed
    pub fn observe_bricks(&mut self, value: u32) -> bool {
        raise(&mut self.bricks, value)
    }

    /// Fold in a chest counter reading; returns true if it changed
    pub fn observe_chests(&mut self, value: u32) -> bool {
        raise(&mut self.chests, value)
    }

    pub fn record_game(&mut self) {
        self.games = self.games.saturating_add(1);
    }
}

#[inline]
fn raise(slot: &mut u32, value: u32) -> bool {
    if value > *slot {
        *slot = value;
        true
    } else {
        false
    }
}

/// Leading integer of a counter's text, `parseInt` style
pub fn parse_counter(text: &str) -> Option<u32> {
    let trimmed = text.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Wallet text with every non-numeric character stripped, then the leading
/// float of what remains (`parseFloat` style, trailing junk ignored)
pub fn parse_balance(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let bytes = cleaned.as_bytes();

    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    cleaned[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_never_decrease() {
        let mut stats = SessionStats::default();
        assert!(stats.observe_bricks(12));
        assert!(!stats.observe_bricks(3)); // mid-update read
        assert!(!stats.observe_bricks(12));
        assert!(stats.observe_bricks(13));
        assert_eq!(stats.bricks, 13);

        assert!(stats.observe_chests(2));
        assert!(!stats.observe_chests(0));
        assert_eq!(stats.chests, 2);
    }

    #[test]
    fn test_record_game() {
        let mut stats = SessionStats::default();
        stats.record_game();
        stats.record_game();
        assert_eq!(stats.games, 2);
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("42"), Some(42));
        assert_eq!(parse_counter("  17 bricks"), Some(17));
        assert_eq!(parse_counter("+3"), Some(3));
        assert_eq!(parse_counter("x5"), None);
        assert_eq!(parse_counter(""), None);
    }

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance("1,234.5 coins"), Some(1234.5));
        assert_eq!(parse_balance("Balance: -20"), Some(-20.0));
        assert_eq!(parse_balance("n/a"), None);
    }

    #[test]
    fn test_parse_balance_ignores_trailing_text() {
        assert_eq!(parse_balance("42.00 pts."), Some(42.0));
        assert_eq!(parse_balance("Balance 12.5 (today -2)"), Some(12.5));
        assert_eq!(parse_balance("7. coins"), Some(7.0));
        assert_eq!(parse_balance(".5"), Some(0.5));
        assert_eq!(parse_balance("-."), None);
    }
}
