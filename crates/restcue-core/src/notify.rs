//! Values derived for notifications and overlays.
//!
//! Presentation collaborators render from a [`BreakState`] plus the active
//! [`BreakPreferences`]; the helpers here keep them from re-deriving engine
//! rules (break cadence, remaining time) on their own.

use serde::{Deserialize, Serialize};

use crate::timer::{
    BreakPhase, BreakPreferences, BreakState, SessionMode, DEFAULT_PRE_BREAK_BIG_CONTENT,
    DEFAULT_PRE_BREAK_BIG_TITLE, DEFAULT_PRE_BREAK_SMALL_CONTENT, DEFAULT_PRE_BREAK_SMALL_TITLE,
    DEFAULT_TOP_FLASH_BIG_TEXT, DEFAULT_TOP_FLASH_SMALL_TEXT,
};

/// Whether the break after the current countdown will be a big one.
pub fn is_next_break_big(state: &BreakState, preferences: &BreakPreferences) -> bool {
    preferences.is_big_cycle(state.break_cycle_count.saturating_add(1))
}

/// Seconds until the next break starts.
///
/// During a break this is the rest of the current break plus a full
/// interval.
pub fn seconds_until_next_break(state: &BreakState, preferences: &BreakPreferences) -> u32 {
    if state.mode != SessionMode::Break {
        return state.seconds_to_next_break;
    }

    let current_break_remaining = match state.phase {
        Some(BreakPhase::Prompt) => preferences
            .flash_for
            .saturating_sub(state.prompt_seconds_elapsed)
            .saturating_add(preferences.full_screen_seconds(state.is_big_break)),
        Some(BreakPhase::FullScreen) | Some(BreakPhase::Post) => state.break_seconds_remaining,
        None => 0,
    };

    current_break_remaining.saturating_add(preferences.small_every)
}

/// `MM:SS`, minutes unbounded.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Banner text shown during the prompt stage.
pub fn prompt_text(state: &BreakState, preferences: &BreakPreferences) -> String {
    let (text, fallback) = if state.is_big_break {
        (&preferences.top_flash_big_text, DEFAULT_TOP_FLASH_BIG_TEXT)
    } else {
        (&preferences.top_flash_small_text, DEFAULT_TOP_FLASH_SMALL_TEXT)
    };
    non_blank_or(text, fallback)
}

fn non_blank_or(text: &str, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

/// Heads-up shown shortly before a break starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreBreakNotice {
    pub big: bool,
    pub title: String,
    pub content: String,
    pub seconds_to_next_break: u32,
}

/// Emits at most one [`PreBreakNotice`] per upcoming cycle.
#[derive(Debug, Clone, Default)]
pub struct PreBreakNotifier {
    last_notified_cycle: Option<u32>,
}

impl PreBreakNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest state. Returns a notice when one is due.
    pub fn observe(
        &mut self,
        state: &BreakState,
        preferences: &BreakPreferences,
    ) -> Option<PreBreakNotice> {
        if !preferences.pre_break_notification_enabled {
            self.last_notified_cycle = None;
            return None;
        }
        if state.mode != SessionMode::Normal {
            return None;
        }

        let lead = preferences.pre_break_notification_lead_seconds.clamp(1, 3600);
        let remaining = state.seconds_to_next_break;
        if remaining == 0 || remaining > lead {
            return None;
        }

        let next_cycle = state.break_cycle_count.saturating_add(1);
        if self.last_notified_cycle == Some(next_cycle) {
            return None;
        }
        self.last_notified_cycle = Some(next_cycle);

        let big = is_next_break_big(state, preferences);
        let (title, title_fallback, content, content_fallback) = if big {
            (
                &preferences.pre_break_notification_big_title,
                DEFAULT_PRE_BREAK_BIG_TITLE,
                &preferences.pre_break_notification_big_content,
                DEFAULT_PRE_BREAK_BIG_CONTENT,
            )
        } else {
            (
                &preferences.pre_break_notification_small_title,
                DEFAULT_PRE_BREAK_SMALL_TITLE,
                &preferences.pre_break_notification_small_content,
                DEFAULT_PRE_BREAK_SMALL_CONTENT,
            )
        };
        let content = non_blank_or(content, content_fallback);

        Some(PreBreakNotice {
            big,
            title: non_blank_or(title, title_fallback),
            content: format!("{content} ({})", format_clock(remaining)),
            seconds_to_next_break: remaining,
        })
    }
}

/// Decides when the persistent status notification needs a refresh.
///
/// Time is passed in as elapsed seconds of whatever monotonic clock the
/// caller uses.
#[derive(Debug, Clone, Default)]
pub struct NotificationThrottle {
    last: Option<(BreakState, BreakPreferences, u32)>,
    last_at_secs: u64,
}

impl NotificationThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records the state when a refresh is due.
    pub fn should_refresh(
        &mut self,
        state: &BreakState,
        preferences: &BreakPreferences,
        normal_interval_secs: u32,
        now_secs: u64,
    ) -> bool {
        let interval = normal_interval_secs.clamp(1, 600);
        let due = self.is_due(state, preferences, interval, now_secs);
        if due {
            self.last = Some((state.clone(), preferences.clone(), interval));
            self.last_at_secs = now_secs;
        }
        due
    }

    fn is_due(
        &self,
        state: &BreakState,
        preferences: &BreakPreferences,
        interval: u32,
        now_secs: u64,
    ) -> bool {
        let Some((previous, previous_preferences, previous_interval)) = &self.last else {
            return true;
        };

        if previous_preferences != preferences || *previous_interval != interval {
            return true;
        }
        if previous.mode != state.mode
            || previous.phase != state.phase
            || previous.is_big_break != state.is_big_break
            || previous.break_cycle_count != state.break_cycle_count
            || previous.completed_small_breaks != state.completed_small_breaks
            || previous.completed_big_breaks != state.completed_big_breaks
        {
            return true;
        }
        if state.mode == SessionMode::Normal
            && state.seconds_to_next_break > previous.seconds_to_next_break.saturating_add(1)
        {
            return true;
        }

        match state.mode {
            SessionMode::Normal => {
                now_secs.saturating_sub(self.last_at_secs) >= u64::from(interval)
            }
            SessionMode::Break => true,
            SessionMode::Paused => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{engine, PauseReason};

    fn prefs() -> BreakPreferences {
        BreakPreferences {
            small_every: 100,
            small_for: 20,
            big_after: 2,
            big_for: 60,
            flash_for: 8,
            ..Default::default()
        }
    }

    #[test]
    fn next_break_big_follows_cycle_count() {
        let prefs = prefs();
        let state = BreakState::initial(&prefs);
        assert!(!is_next_break_big(&state, &prefs));

        let after_one = BreakState {
            break_cycle_count: 1,
            ..state
        };
        assert!(is_next_break_big(&after_one, &prefs));

        let no_big = BreakPreferences {
            big_after: 0,
            ..prefs
        };
        assert!(!is_next_break_big(&after_one, &no_big));
    }

    #[test]
    fn seconds_until_next_break_covers_each_phase() {
        let prefs = prefs();
        let state = BreakState::initial(&prefs);
        assert_eq!(seconds_until_next_break(&state, &prefs), 100);

        let prompt = engine::request_break_now(&state, &prefs, false);
        let prompt = engine::tick(&prompt, &prefs);
        assert_eq!(seconds_until_next_break(&prompt, &prefs), 7 + 20 + 100);

        let big_prompt = engine::request_break_now(&state, &prefs, true);
        assert_eq!(seconds_until_next_break(&big_prompt, &prefs), 8 + 60 + 100);

        let full = BreakState {
            phase: Some(BreakPhase::FullScreen),
            break_seconds_remaining: 12,
            ..prompt
        };
        assert_eq!(seconds_until_next_break(&full, &prefs), 112);
    }

    #[test]
    fn clock_format_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(6000), "100:00");
    }

    #[test]
    fn prompt_text_falls_back_when_blank() {
        let prefs = BreakPreferences {
            top_flash_big_text: "  ".into(),
            ..prefs()
        };
        let big = BreakState {
            is_big_break: true,
            ..BreakState::initial(&prefs)
        };
        assert_eq!(prompt_text(&big, &prefs), DEFAULT_TOP_FLASH_BIG_TEXT);
        let small = BreakState::initial(&prefs);
        assert_eq!(prompt_text(&small, &prefs), prefs.top_flash_small_text);
    }

    #[test]
    fn pre_break_notice_fires_once_per_cycle() {
        let prefs = BreakPreferences {
            pre_break_notification_enabled: true,
            pre_break_notification_lead_seconds: 30,
            pre_break_notification_small_title: String::new(),
            ..prefs()
        };
        let mut notifier = PreBreakNotifier::new();

        let far = BreakState {
            seconds_to_next_break: 31,
            ..BreakState::initial(&prefs)
        };
        assert!(notifier.observe(&far, &prefs).is_none());

        let near = BreakState {
            seconds_to_next_break: 30,
            ..far.clone()
        };
        let notice = notifier.observe(&near, &prefs).unwrap();
        assert!(!notice.big);
        assert_eq!(notice.title, DEFAULT_PRE_BREAK_SMALL_TITLE);
        let expected = format!("{DEFAULT_PRE_BREAK_SMALL_CONTENT} (00:30)");
        assert_eq!(notice.content, expected);

        let nearer = BreakState {
            seconds_to_next_break: 29,
            ..far.clone()
        };
        assert!(notifier.observe(&nearer, &prefs).is_none());

        let next_cycle = BreakState {
            break_cycle_count: 1,
            seconds_to_next_break: 10,
            ..far
        };
        let notice = notifier.observe(&next_cycle, &prefs).unwrap();
        assert!(notice.big);
    }

    #[test]
    fn pre_break_notice_disabled_by_default() {
        let prefs = prefs();
        let mut notifier = PreBreakNotifier::new();
        let near = BreakState {
            seconds_to_next_break: 5,
            ..BreakState::initial(&prefs)
        };
        assert!(notifier.observe(&near, &prefs).is_none());
    }

    #[test]
    fn throttle_refreshes_on_structure_and_interval() {
        let prefs = prefs();
        let mut throttle = NotificationThrottle::new();
        let state = BreakState::initial(&prefs);

        assert!(throttle.should_refresh(&state, &prefs, 60, 0));
        let ticked = engine::tick(&state, &prefs);
        assert!(!throttle.should_refresh(&ticked, &prefs, 60, 1));
        assert!(throttle.should_refresh(&ticked, &prefs, 60, 60));

        let in_break = engine::request_break_now(&ticked, &prefs, false);
        assert!(throttle.should_refresh(&in_break, &prefs, 60, 61));
        let next_tick = engine::tick(&in_break, &prefs);
        assert!(throttle.should_refresh(&next_tick, &prefs, 60, 62));
    }

    #[test]
    fn throttle_skips_paused_but_catches_countdown_jumps() {
        let prefs = prefs();
        let mut throttle = NotificationThrottle::new();
        let state = BreakState {
            seconds_to_next_break: 10,
            ..BreakState::initial(&prefs)
        };
        assert!(throttle.should_refresh(&state, &prefs, 60, 0));

        let postponed = engine::postpone_break_for_seconds(&state, 300);
        assert!(throttle.should_refresh(&postponed, &prefs, 60, 1));

        let paused = engine::set_pause_reason(&postponed, PauseReason::OnBattery, true, &prefs);
        assert!(throttle.should_refresh(&paused, &prefs, 60, 2));
        let still_paused = engine::tick(&paused, &prefs);
        assert!(!throttle.should_refresh(&still_paused, &prefs, 60, 500));
    }
}
