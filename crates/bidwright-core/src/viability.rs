//! Quick bid/no-bid viability heuristic.
//!
//! A coarse score from three inputs a bid manager knows before reading the
//! full tender. No model call; used for triage lists.

const DEFAULT_VALUE: f64 = 50_000.0;
const DEFAULT_COMPETITORS: f64 = 3.0;

/// Score a bid opportunity on a 10–98 scale.
///
/// `value` and `competitors` arrive as free text from forms; anything that
/// doesn't parse falls back to a mid-sized, three-bidder contract.
pub fn bid_viability(value: Option<&str>, complexity: &str, competitors: Option<&str>) -> u8 {
    let (value, competitors) = match (parse_or(value, 0.0), parse_or(competitors, DEFAULT_COMPETITORS)) {
        (Some(v), Some(c)) => (v, c),
        _ => (DEFAULT_VALUE, DEFAULT_COMPETITORS),
    };

    let mut score = 100.0;
    if complexity.trim().eq_ignore_ascii_case("high") {
        score -= 20.0;
    }
    if competitors > 5.0 {
        score -= 20.0;
    }
    if value < 10_000.0 {
        score -= 10.0;
    }

    (score - competitors * 2.0).clamp(10.0, 98.0) as u8
}

/// `None` input means "not supplied" and yields the default; unparsable text yields `None`.
fn parse_or(raw: Option<&str>, default: f64) -> Option<f64> {
    match raw.map(str::trim) {
        None | Some("") => Some(default),
        Some(s) => s.replace([',', '£', '$', '€'], "").parse().ok(),
    }
}
