//! Events describing observable break transitions.
//!
//! The scheduler publishes whole snapshots; consumers that react to
//! transitions (overlays, notifications, the CLI output) derive events by
//! diffing consecutive states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::prompt_text;
use crate::timer::{BreakPhase, BreakPreferences, BreakState, PauseReason, SessionMode};

/// Observable change between two consecutive break states.
/// Overlays and notifications react to these; `StateSnapshot` carries the
/// full state for consumers that only redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    BreakPrompted {
        big: bool,
        /// Banner text for the prompt stage.
        text: String,
        at: DateTime<Utc>,
    },
    FullScreenStarted {
        big: bool,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// Break ran to completion and was counted.
    BreakFinished {
        big: bool,
        completed_small_breaks: u32,
        completed_big_breaks: u32,
        at: DateTime<Utc>,
    },
    /// Break ended without being counted (postponed or disabled).
    BreakAborted {
        big: bool,
        seconds_to_next_break: u32,
        at: DateTime<Utc>,
    },
    Paused {
        reasons: Vec<PauseReason>,
        at: DateTime<Utc>,
    },
    Resumed {
        mode: SessionMode,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: BreakState,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Events implied by moving from `prev` to `next`, in the order a
    /// consumer should apply them. Empty when nothing structural changed.
    pub fn diff(
        prev: &BreakState,
        next: &BreakState,
        preferences: &BreakPreferences,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();

        if prev.is_paused() && !next.is_paused() {
            events.push(Event::Resumed {
                mode: next.mode,
                at,
            });
        }

        let was_in_break = break_underway(prev);
        let now_in_break = break_underway(next);

        if was_in_break && !now_in_break {
            if next.completed_breaks() > prev.completed_breaks() {
                events.push(Event::BreakFinished {
                    big: prev.is_big_break,
                    completed_small_breaks: next.completed_small_breaks,
                    completed_big_breaks: next.completed_big_breaks,
                    at,
                });
            } else {
                events.push(Event::BreakAborted {
                    big: prev.is_big_break,
                    seconds_to_next_break: next.seconds_to_next_break,
                    at,
                });
            }
        }

        if next.in_break() {
            let phase_changed = !was_in_break || prev.phase != next.phase;
            if phase_changed {
                match next.phase {
                    Some(BreakPhase::Prompt) => {
                        events.push(Event::BreakPrompted {
                            big: next.is_big_break,
                            text: prompt_text(next, preferences),
                            at,
                        });
                    }
                    Some(BreakPhase::FullScreen) => {
                        events.push(Event::FullScreenStarted {
                            big: next.is_big_break,
                            duration_secs: next.break_seconds_remaining,
                            at,
                        });
                    }
                    Some(BreakPhase::Post) | None => {}
                }
            }
        }

        if !prev.is_paused() && next.is_paused() {
            events.push(Event::Paused {
                reasons: next.pause_reasons.iter().copied().collect(),
                at,
            });
        }

        events
    }

    pub fn snapshot(state: &BreakState, at: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            state: state.clone(),
            at,
        }
    }
}

/// In a break, or paused out of one.
fn break_underway(state: &BreakState) -> bool {
    state.in_break() || (state.is_paused() && state.mode_before_pause == Some(SessionMode::Break))
}
