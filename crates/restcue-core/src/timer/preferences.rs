//! Break preferences.
//!
//! The engine reads these on every transition and never mutates them.
//! All durations are whole seconds.

use serde::{Deserialize, Serialize};

use super::postpone::DEFAULT_POSTPONE_DURATIONS_SECONDS;

pub const DEFAULT_TOP_FLASH_SECONDS: u32 = 8;
pub const DEFAULT_PRE_BREAK_NOTIFICATION_SECONDS: u32 = 30;
pub const DEFAULT_TOP_FLASH_SMALL_TEXT: &str = "Break is coming, please wrap up";
pub const DEFAULT_TOP_FLASH_BIG_TEXT: &str = "Big break is coming, please wrap up";
pub const DEFAULT_PRE_BREAK_SMALL_TITLE: &str = "Small break is coming";
pub const DEFAULT_PRE_BREAK_SMALL_CONTENT: &str = "Please wrap up current work.";
pub const DEFAULT_PRE_BREAK_BIG_TITLE: &str = "Big break is coming";
pub const DEFAULT_PRE_BREAK_BIG_CONTENT: &str = "Please wrap up current work.";

/// Break cadence and prompt configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPreferences {
    /// Seconds between breaks while not paused.
    #[serde(default = "default_small_every")]
    pub small_every: u32,
    /// Full-screen seconds of a small break.
    #[serde(default = "default_small_for")]
    pub small_for: u32,
    /// Every Nth cycle is a big break. 0 disables big breaks.
    #[serde(default = "default_big_after")]
    pub big_after: u32,
    /// Full-screen seconds of a big break.
    #[serde(default = "default_big_for")]
    pub big_for: u32,
    /// Seconds of the pre-break prompt. 0 skips the prompt.
    #[serde(default = "default_flash_for")]
    pub flash_for: u32,
    #[serde(default = "default_true")]
    pub top_flash_enabled: bool,
    #[serde(default = "default_top_flash_small_text")]
    pub top_flash_small_text: String,
    #[serde(default = "default_top_flash_big_text")]
    pub top_flash_big_text: String,
    #[serde(default)]
    pub pre_break_notification_enabled: bool,
    #[serde(default = "default_pre_break_lead")]
    pub pre_break_notification_lead_seconds: u32,
    #[serde(default = "default_pre_break_small_title")]
    pub pre_break_notification_small_title: String,
    #[serde(default = "default_pre_break_small_content")]
    pub pre_break_notification_small_content: String,
    #[serde(default = "default_pre_break_big_title")]
    pub pre_break_notification_big_title: String,
    #[serde(default = "default_pre_break_big_content")]
    pub pre_break_notification_big_content: String,
    /// Postponement offers, ascending and distinct.
    #[serde(default = "default_postpone_for")]
    pub postpone_for: Vec<u32>,
    /// Resuming after at least this many paused seconds restarts the
    /// countdown. 0 disables.
    #[serde(default)]
    pub reset_interval_after_pause: u32,
    /// Resuming after at least this many paused seconds restarts the
    /// big-break cadence. 0 disables.
    #[serde(default)]
    pub reset_cycle_after_pause: u32,
}

fn default_small_every() -> u32 {
    20 * 60
}
fn default_small_for() -> u32 {
    20
}
fn default_big_after() -> u32 {
    3
}
fn default_big_for() -> u32 {
    60
}
fn default_flash_for() -> u32 {
    DEFAULT_TOP_FLASH_SECONDS
}
fn default_true() -> bool {
    true
}
fn default_top_flash_small_text() -> String {
    DEFAULT_TOP_FLASH_SMALL_TEXT.into()
}
fn default_top_flash_big_text() -> String {
    DEFAULT_TOP_FLASH_BIG_TEXT.into()
}
fn default_pre_break_lead() -> u32 {
    DEFAULT_PRE_BREAK_NOTIFICATION_SECONDS
}
fn default_pre_break_small_title() -> String {
    DEFAULT_PRE_BREAK_SMALL_TITLE.into()
}
fn default_pre_break_small_content() -> String {
    DEFAULT_PRE_BREAK_SMALL_CONTENT.into()
}
fn default_pre_break_big_title() -> String {
    DEFAULT_PRE_BREAK_BIG_TITLE.into()
}
fn default_pre_break_big_content() -> String {
    DEFAULT_PRE_BREAK_BIG_CONTENT.into()
}
fn default_postpone_for() -> Vec<u32> {
    DEFAULT_POSTPONE_DURATIONS_SECONDS.to_vec()
}

impl Default for BreakPreferences {
    fn default() -> Self {
        Self {
            small_every: default_small_every(),
            small_for: default_small_for(),
            big_after: default_big_after(),
            big_for: default_big_for(),
            flash_for: default_flash_for(),
            top_flash_enabled: true,
            top_flash_small_text: default_top_flash_small_text(),
            top_flash_big_text: default_top_flash_big_text(),
            pre_break_notification_enabled: false,
            pre_break_notification_lead_seconds: default_pre_break_lead(),
            pre_break_notification_small_title: default_pre_break_small_title(),
            pre_break_notification_small_content: default_pre_break_small_content(),
            pre_break_notification_big_title: default_pre_break_big_title(),
            pre_break_notification_big_content: default_pre_break_big_content(),
            postpone_for: default_postpone_for(),
            reset_interval_after_pause: 0,
            reset_cycle_after_pause: 0,
        }
    }
}

impl BreakPreferences {
    /// Full-screen duration for a break of the given size.
    pub fn full_screen_seconds(&self, big: bool) -> u32 {
        if big { self.big_for } else { self.small_for }
    }

    /// Whether breaks open with a prompt stage.
    pub fn prompt_enabled(&self) -> bool {
        self.top_flash_enabled && self.flash_for > 0
    }

    /// Whether the given cycle number (1-based) is a big break.
    pub fn is_big_cycle(&self, cycle: u32) -> bool {
        self.big_after > 0 && cycle % self.big_after == 0
    }

    /// Clamp values the engine relies on and canonicalize the offer list.
    pub fn sanitized(mut self) -> Self {
        self.small_every = self.small_every.max(1);
        self.postpone_for = super::postpone::parse_postpone_durations(
            None,
            &self.postpone_for,
        );
        self
    }
}
