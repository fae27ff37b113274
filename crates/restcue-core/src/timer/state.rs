//! Break session state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::preferences::BreakPreferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Counting down to the next break.
    #[default]
    Normal,
    /// Suspended by one or more pause reasons.
    Paused,
    /// A break is in progress.
    Break,
}

/// Stage of a break. Only meaningful while the mode is `Break`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPhase {
    Prompt,
    FullScreen,
    Post,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    Idle,
    OnBattery,
    AppOpen,
    Sleep,
}

impl std::str::FromStr for PauseReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle" => Ok(PauseReason::Idle),
            "on_battery" | "battery" => Ok(PauseReason::OnBattery),
            "app_open" | "app" => Ok(PauseReason::AppOpen),
            "sleep" => Ok(PauseReason::Sleep),
            other => Err(format!("unknown pause reason: {other}")),
        }
    }
}

/// Complete engine state.
///
/// Replaced wholesale by every engine transition, never edited in place by
/// callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakState {
    pub mode: SessionMode,
    pub phase: Option<BreakPhase>,
    /// Zero throughout a break.
    pub seconds_to_next_break: u32,
    pub seconds_since_last_break: u32,
    pub seconds_paused: u32,
    /// Number of breaks started so far, small or big.
    pub break_cycle_count: u32,
    pub is_big_break: bool,
    pub prompt_seconds_elapsed: u32,
    /// Nonzero only during the full-screen and post stages.
    pub break_seconds_remaining: u32,
    pub pause_reasons: BTreeSet<PauseReason>,
    /// Set iff `mode` is `Paused`; never `Paused` itself.
    pub mode_before_pause: Option<SessionMode>,
    pub completed_small_breaks: u32,
    pub completed_big_breaks: u32,
}

impl BreakState {
    /// Fresh state counting down a full interval.
    pub fn initial(preferences: &BreakPreferences) -> Self {
        Self {
            mode: SessionMode::Normal,
            phase: None,
            seconds_to_next_break: preferences.small_every,
            seconds_since_last_break: 0,
            seconds_paused: 0,
            break_cycle_count: 0,
            is_big_break: false,
            prompt_seconds_elapsed: 0,
            break_seconds_remaining: 0,
            pause_reasons: BTreeSet::new(),
            mode_before_pause: None,
            completed_small_breaks: 0,
            completed_big_breaks: 0,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.mode == SessionMode::Paused
    }

    pub fn in_break(&self) -> bool {
        self.mode == SessionMode::Break
    }

    pub fn completed_breaks(&self) -> u32 {
        self.completed_small_breaks + self.completed_big_breaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_seeds_countdown_from_interval() {
        let prefs = BreakPreferences {
            small_every: 42,
            ..Default::default()
        };
        let state = BreakState::initial(&prefs);
        assert_eq!(state.mode, SessionMode::Normal);
        assert_eq!(state.phase, None);
        assert_eq!(state.seconds_to_next_break, 42);
        assert!(state.pause_reasons.is_empty());
        assert_eq!(state.mode_before_pause, None);
    }

    #[test]
    fn pause_reason_parses_aliases() {
        let app: PauseReason = "APP".parse().unwrap();
        assert_eq!(app, PauseReason::AppOpen);
        let battery: PauseReason = "on_battery".parse().unwrap();
        assert_eq!(battery, PauseReason::OnBattery);
        assert!("lunch".parse::<PauseReason>().is_err());
    }

    #[test]
    fn state_serializes_with_snake_case_enums() {
        let state = BreakState::initial(&BreakPreferences::default());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["mode"], "normal");
        assert_eq!(json["phase"], serde_json::Value::Null);
    }
}
