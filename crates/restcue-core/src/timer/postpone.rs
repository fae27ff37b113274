//! Postponement offer lists.
//!
//! Users type the offers as a comma separated list of seconds. The stored
//! form has no spaces (`60,300,900`); the display form uses `", "`.

use std::collections::BTreeSet;

pub const DEFAULT_POSTPONE_DURATIONS_SECONDS: [u32; 4] = [60, 300, 600, 1800];
pub const DEFAULT_POSTPONE_DURATION_SECONDS: u32 = 60;

const FULL_WIDTH_COMMA: char = '\u{FF0C}';

fn parse_tokens(raw: &str) -> BTreeSet<u32> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c == FULL_WIDTH_COMMA { ',' } else { c })
        .filter(|c| !c.is_whitespace())
        .collect();

    cleaned
        .split(',')
        .filter_map(|token| token.parse::<i64>().ok())
        .filter(|&value| value > 0)
        .filter_map(|value| u32::try_from(value).ok())
        .collect()
}

fn join(values: impl IntoIterator<Item = u32>, separator: &str) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Canonical storage form: positive, distinct, ascending, no spaces.
///
/// Tokens that are not positive integers are dropped.
pub fn normalize_postpone_durations(raw: &str) -> String {
    join(parse_tokens(raw), ",")
}

/// Parse user input, falling back to `fallback` and then to the built-in
/// defaults when nothing usable remains.
pub fn parse_postpone_durations(raw: Option<&str>, fallback: &[u32]) -> Vec<u32> {
    let parsed = parse_tokens(raw.unwrap_or_default());
    if !parsed.is_empty() {
        return parsed.into_iter().collect();
    }

    let fallback: BTreeSet<u32> = fallback.iter().copied().filter(|&v| v > 0).collect();
    if fallback.is_empty() {
        DEFAULT_POSTPONE_DURATIONS_SECONDS.to_vec()
    } else {
        fallback.into_iter().collect()
    }
}

/// Parse user input without any fallback.
pub fn parse_postpone_durations_or_empty(raw: &str) -> Vec<u32> {
    parse_tokens(raw).into_iter().collect()
}

/// Display form, e.g. `60, 300, 600`.
pub fn format_postpone_durations(values: &[u32]) -> String {
    let stored = join(values.iter().copied(), ",");
    join(
        parse_postpone_durations(Some(&stored), &DEFAULT_POSTPONE_DURATIONS_SECONDS),
        ", ",
    )
}
