//! Foundational low-level utilities shared across Gambit crates.
//!
//! Provides wall-clock helpers used by rate limiting and event logs, and the
//! name normalization rules every store lookup relies on.

pub mod names;
pub mod time_utils;

pub use names::{collapse_whitespace, name_key, names_match, strip_target_parens};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, elapsed_seconds};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_utils_round_trip_bounds() {
        let now_s = current_unix_timestamp();
        let now_ms = current_unix_timestamp_ms();
        let now_ms_s = now_ms / 1_000;
        assert!(now_ms_s >= now_s);
        assert!(now_ms_s <= now_s.saturating_add(1));
    }

    #[test]
    fn elapsed_seconds_saturates_when_clock_goes_backwards() {
        assert_eq!(elapsed_seconds(100, 160), 60);
        assert_eq!(elapsed_seconds(160, 100), 0);
    }

    #[test]
    fn unit_strip_target_parens_handles_multiword_targets() {
        assert_eq!(strip_target_parens("(more poop)"), "more poop");
        assert_eq!(strip_target_parens("poop"), "poop");
    }

    #[test]
    fn unit_names_match_ignores_ascii_case() {
        assert!(names_match("Poop", "pOOp"));
        assert!(!names_match("poop", "poops"));
        assert_eq!(name_key("  Brad Johns "), "brad johns");
    }

    #[test]
    fn unit_collapse_whitespace_joins_multiline_help() {
        assert_eq!(
            collapse_whitespace("spot command -\n    lend  karma"),
            "spot command - lend karma"
        );
    }
}
