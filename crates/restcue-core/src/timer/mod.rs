pub mod engine;
mod postpone;
mod preferences;
mod state;

pub use postpone::{
    format_postpone_durations, normalize_postpone_durations, parse_postpone_durations,
    parse_postpone_durations_or_empty, DEFAULT_POSTPONE_DURATIONS_SECONDS,
    DEFAULT_POSTPONE_DURATION_SECONDS,
};
pub use preferences::{
    BreakPreferences, DEFAULT_PRE_BREAK_BIG_CONTENT, DEFAULT_PRE_BREAK_BIG_TITLE,
    DEFAULT_PRE_BREAK_NOTIFICATION_SECONDS, DEFAULT_PRE_BREAK_SMALL_CONTENT,
    DEFAULT_PRE_BREAK_SMALL_TITLE, DEFAULT_TOP_FLASH_BIG_TEXT, DEFAULT_TOP_FLASH_SECONDS,
    DEFAULT_TOP_FLASH_SMALL_TEXT,
};
pub use state::{BreakPhase, BreakState, PauseReason, SessionMode};
