//! Break engine.
//!
//! Pure transition functions over [`BreakState`]. Nothing here reads a
//! clock or keeps state of its own: the caller advances time by calling
//! [`tick`] once per elapsed second and feeds user commands and pause
//! signals through the other functions.
//!
//! ## State Transitions
//!
//! ```text
//! Normal -> Break(Prompt -> FullScreen [-> Post]) -> Normal
//!    \           |
//!     +-> Paused <+   (resumes to the mode active before the pause)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let prefs = BreakPreferences::default();
//! let mut state = BreakState::initial(&prefs);
//! // Once per second:
//! state = engine::tick(&state, &prefs);
//! ```

use super::postpone::DEFAULT_POSTPONE_DURATION_SECONDS;
use super::preferences::BreakPreferences;
use super::state::{BreakPhase, BreakState, PauseReason, SessionMode};

/// Advance exactly one second.
pub fn tick(state: &BreakState, preferences: &BreakPreferences) -> BreakState {
    match state.mode {
        SessionMode::Normal => tick_normal(state, preferences),
        SessionMode::Paused => BreakState {
            seconds_paused: state.seconds_paused.saturating_add(1),
            ..state.clone()
        },
        SessionMode::Break => tick_break(state, preferences),
    }
}

/// Toggle one pause reason.
///
/// A non-empty reason set pauses the session, except that `Idle` alone
/// never interrupts a running break. An empty set resumes to the mode that
/// was active before the pause.
pub fn set_pause_reason(
    state: &BreakState,
    reason: PauseReason,
    active: bool,
    preferences: &BreakPreferences,
) -> BreakState {
    let mut reasons = state.pause_reasons.clone();
    if active {
        reasons.insert(reason);
    } else {
        reasons.remove(&reason);
    }

    if !reasons.is_empty() {
        let only_idle = reasons.iter().all(|r| *r == PauseReason::Idle);
        if state.is_paused() || (state.in_break() && only_idle) {
            return BreakState {
                pause_reasons: reasons,
                ..state.clone()
            };
        }

        return BreakState {
            mode: SessionMode::Paused,
            mode_before_pause: Some(state.mode),
            pause_reasons: reasons,
            seconds_paused: 0,
            ..state.clone()
        };
    }

    if !state.is_paused() {
        return BreakState {
            pause_reasons: reasons,
            ..state.clone()
        };
    }

    let resumed_mode = match state.mode_before_pause {
        Some(SessionMode::Paused) | None => SessionMode::Normal,
        Some(mode) => mode,
    };
    let mut resumed = BreakState {
        mode: resumed_mode,
        mode_before_pause: None,
        pause_reasons: reasons,
        ..state.clone()
    };
    if resumed_mode == SessionMode::Normal {
        apply_long_pause_resets(&mut resumed, state.seconds_paused, preferences);
    }
    resumed.seconds_paused = 0;
    resumed
}

/// Start a break immediately. `force_big` overrides the cadence.
pub fn request_break_now(
    state: &BreakState,
    preferences: &BreakPreferences,
    force_big: bool,
) -> BreakState {
    start_break(state, preferences, force_big)
}

/// Postpone by the first configured offer.
pub fn postpone_break(state: &BreakState, preferences: &BreakPreferences) -> BreakState {
    let seconds = preferences
        .postpone_for
        .first()
        .copied()
        .unwrap_or(DEFAULT_POSTPONE_DURATION_SECONDS);
    postpone_break_for_seconds(state, seconds)
}

/// Postpone the next break by at least `seconds` (clamped to 1).
///
/// Outside a break the countdown is never shortened. During a break the
/// break is abandoned and the countdown restarts from `seconds`.
pub fn postpone_break_for_seconds(state: &BreakState, seconds: u32) -> BreakState {
    let seconds = seconds.max(1);
    if !state.in_break() {
        return BreakState {
            seconds_to_next_break: state.seconds_to_next_break.max(seconds),
            ..state.clone()
        };
    }

    BreakState {
        mode: SessionMode::Normal,
        phase: None,
        is_big_break: false,
        prompt_seconds_elapsed: 0,
        break_seconds_remaining: 0,
        seconds_to_next_break: seconds,
        ..state.clone()
    }
}

/// Send a running break back to its prompt stage.
pub fn interrupt_break(state: &BreakState) -> BreakState {
    if !state.in_break() {
        return state.clone();
    }

    BreakState {
        phase: Some(BreakPhase::Prompt),
        prompt_seconds_elapsed: 0,
        break_seconds_remaining: 0,
        seconds_to_next_break: 0,
        ..state.clone()
    }
}

/// Conclude a break that sits in its post stage.
pub fn exit_post_break(state: &BreakState, preferences: &BreakPreferences) -> BreakState {
    if !state.in_break() || state.phase != Some(BreakPhase::Post) {
        return state.clone();
    }
    finish_cycle(state, preferences)
}

// ── Internal ─────────────────────────────────────────────────────────

fn tick_normal(state: &BreakState, preferences: &BreakPreferences) -> BreakState {
    let next = BreakState {
        seconds_to_next_break: state.seconds_to_next_break.saturating_sub(1),
        seconds_since_last_break: state.seconds_since_last_break.saturating_add(1),
        ..state.clone()
    };

    if next.seconds_to_next_break == 0 {
        start_break(&next, preferences, false)
    } else {
        next
    }
}

fn tick_break(state: &BreakState, preferences: &BreakPreferences) -> BreakState {
    match state.phase {
        Some(BreakPhase::Prompt) => {
            let elapsed = state.prompt_seconds_elapsed.saturating_add(1);
            let flash_done = elapsed >= preferences.flash_for.max(1);
            let idle = state.pause_reasons.contains(&PauseReason::Idle);
            if flash_done || idle || !preferences.top_flash_enabled {
                BreakState {
                    phase: Some(BreakPhase::FullScreen),
                    prompt_seconds_elapsed: elapsed,
                    break_seconds_remaining: preferences.full_screen_seconds(state.is_big_break),
                    ..state.clone()
                }
            } else {
                BreakState {
                    prompt_seconds_elapsed: elapsed,
                    ..state.clone()
                }
            }
        }
        Some(BreakPhase::FullScreen) => {
            let remaining = state.break_seconds_remaining.saturating_sub(1);
            if remaining == 0 {
                finish_cycle(state, preferences)
            } else {
                BreakState {
                    break_seconds_remaining: remaining,
                    ..state.clone()
                }
            }
        }
        Some(BreakPhase::Post) => finish_cycle(state, preferences),
        None => state.clone(),
    }
}

fn start_break(
    state: &BreakState,
    preferences: &BreakPreferences,
    force_big: bool,
) -> BreakState {
    let cycle = state.break_cycle_count.saturating_add(1);
    let big = force_big || preferences.is_big_cycle(cycle);

    if !preferences.prompt_enabled() {
        return BreakState {
            mode: SessionMode::Break,
            phase: Some(BreakPhase::FullScreen),
            is_big_break: big,
            prompt_seconds_elapsed: 0,
            break_seconds_remaining: preferences.full_screen_seconds(big),
            break_cycle_count: cycle,
            seconds_to_next_break: 0,
            ..state.clone()
        };
    }

    BreakState {
        mode: SessionMode::Break,
        phase: Some(BreakPhase::Prompt),
        is_big_break: big,
        prompt_seconds_elapsed: 0,
        break_seconds_remaining: 0,
        break_cycle_count: cycle,
        seconds_to_next_break: 0,
        ..state.clone()
    }
}

fn finish_cycle(state: &BreakState, preferences: &BreakPreferences) -> BreakState {
    let (small, big) = if state.is_big_break { (0, 1) } else { (1, 0) };
    BreakState {
        mode: SessionMode::Normal,
        phase: None,
        seconds_to_next_break: preferences.small_every,
        seconds_since_last_break: 0,
        is_big_break: false,
        prompt_seconds_elapsed: 0,
        break_seconds_remaining: 0,
        completed_small_breaks: state.completed_small_breaks.saturating_add(small),
        completed_big_breaks: state.completed_big_breaks.saturating_add(big),
        ..state.clone()
    }
}

fn apply_long_pause_resets(
    state: &mut BreakState,
    paused_for: u32,
    preferences: &BreakPreferences,
) {
    let reset_interval = preferences.reset_interval_after_pause;
    let reset_cycle = preferences.reset_cycle_after_pause;

    if reset_interval > 0 && paused_for >= reset_interval {
        state.seconds_to_next_break = preferences.small_every;
    }
    if reset_cycle > 0 && paused_for >= reset_cycle {
        state.break_cycle_count = 0;
        state.seconds_to_next_break = preferences.small_every;
    }
}
