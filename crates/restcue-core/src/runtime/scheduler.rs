//! Break scheduler.
//!
//! Owns the single [`RuntimeSnapshot`] and is the only writer of it. A
//! spawned driver task advances the engine once per second while the
//! scheduler is enabled; user commands and pause signals may arrive from any
//! task at any time and are serialized with the ticks through one lock.
//!
//! Every applied transition is published on a broadcast channel while the
//! lock is still held, so subscribers see snapshots in generation order.
//!
//! # Example
//!
//! ```no_run
//! use restcue_core::{BreakScheduler, Config};
//!
//! # async fn example() -> Result<(), restcue_core::SchedulerError> {
//! let scheduler = BreakScheduler::from_config(&Config::default());
//! let mut updates = scheduler.subscribe();
//! scheduler.start().await;
//! while let Ok(snapshot) = updates.recv().await {
//!     println!("{:?}", snapshot.state.mode);
//! #   break;
//! }
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::snapshot::RuntimeSnapshot;
use crate::error::SchedulerError;
use crate::storage::{AppSettings, Config, MAX_OVERLAY_TRANSPARENCY_PERCENT};
use crate::timer::{engine, BreakPreferences, BreakState, PauseReason, SessionMode};

/// Period of the driver.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const CHANNEL_CAPACITY: usize = 256;

struct Shared {
    current: Mutex<RuntimeSnapshot>,
    updates: broadcast::Sender<RuntimeSnapshot>,
}

struct Driver {
    handle: JoinHandle<()>,
    cancellation: CancellationToken,
}

/// Stateful coordinator around the pure break engine.
pub struct BreakScheduler {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl BreakScheduler {
    pub fn new(preferences: BreakPreferences, settings: AppSettings) -> Self {
        Self::with_snapshot(RuntimeSnapshot::new(preferences, settings))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_snapshot(RuntimeSnapshot::from_config(config))
    }

    /// Resume from a previously captured snapshot.
    pub fn with_snapshot(snapshot: RuntimeSnapshot) -> Self {
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                current: Mutex::new(snapshot),
                updates,
            }),
            driver: Mutex::new(None),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the one-second driver. Calling it again while running is a no-op.
    pub async fn start(&self) {
        let mut driver = self.driver.lock().await;
        if driver.as_ref().is_some_and(|d| !d.handle.is_finished()) {
            debug!("break scheduler already running");
            return;
        }

        let cancellation = CancellationToken::new();
        let shared = self.shared.clone();
        let cancel = cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::drive(shared, cancel).await;
        });

        *driver = Some(Driver {
            handle,
            cancellation,
        });
        info!("break scheduler started");
    }

    /// Cancel the driver and wait for it to finish.
    ///
    /// Once this returns no further tick is applied.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let Some(driver) = self.driver.lock().await.take() else {
            return Err(SchedulerError::NotRunning);
        };

        driver.cancellation.cancel();
        driver.handle.await?;
        info!("break scheduler stopped");
        Ok(())
    }

    /// Stop the driver if it runs and release the scheduler.
    pub async fn dispose(self) {
        match self.stop().await {
            Ok(()) | Err(SchedulerError::NotRunning) => {}
            Err(err) => debug!(error = %err, "driver ended abnormally during dispose"),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.driver
            .lock()
            .await
            .as_ref()
            .is_some_and(|d| !d.handle.is_finished())
    }

    async fn drive(shared: Arc<Shared>, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let mut current = shared.current.lock().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    if !current.settings.enabled {
                        continue;
                    }
                    let next = engine::tick(&current.state, &current.preferences);
                    trace!(
                        seconds_to_next_break = next.seconds_to_next_break,
                        "tick"
                    );
                    Shared::replace_state(&shared.updates, &mut current, next);
                }
            }
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeSnapshot> {
        self.shared.updates.subscribe()
    }

    pub async fn snapshot(&self) -> RuntimeSnapshot {
        self.shared.current.lock().await.clone()
    }

    pub async fn state(&self) -> BreakState {
        self.shared.current.lock().await.state.clone()
    }

    // ── Break controls (ignored while disabled) ──────────────────────

    pub async fn request_break_now(&self, force_big: bool) -> RuntimeSnapshot {
        self.apply_enabled(|s| {
            engine::request_break_now(&s.state, &s.preferences, force_big)
        })
        .await
    }

    pub async fn postpone(&self) -> RuntimeSnapshot {
        self.apply_enabled(|s| engine::postpone_break(&s.state, &s.preferences))
            .await
    }

    pub async fn postpone_for_seconds(&self, seconds: u32) -> RuntimeSnapshot {
        self.apply_enabled(|s| engine::postpone_break_for_seconds(&s.state, seconds))
            .await
    }

    pub async fn interrupt_break(&self) -> RuntimeSnapshot {
        self.apply_enabled(|s| engine::interrupt_break(&s.state))
            .await
    }

    pub async fn exit_post_break(&self) -> RuntimeSnapshot {
        self.apply_enabled(|s| engine::exit_post_break(&s.state, &s.preferences))
            .await
    }

    pub async fn set_pause_reason(&self, reason: PauseReason, active: bool) -> RuntimeSnapshot {
        self.apply_enabled(|s| {
            engine::set_pause_reason(&s.state, reason, active, &s.preferences)
        })
        .await
    }

    /// Screen lock pauses with `Sleep`; unlocking always restarts a full
    /// countdown.
    pub async fn set_screen_locked(&self, locked: bool) -> RuntimeSnapshot {
        self.apply_enabled(|s| {
            let sleep = PauseReason::Sleep;
            let next = engine::set_pause_reason(&s.state, sleep, locked, &s.preferences);
            if locked || next.mode != SessionMode::Normal {
                next
            } else {
                BreakState {
                    seconds_to_next_break: s.preferences.small_every,
                    ..next
                }
            }
        })
        .await
    }

    /// Toggle the `AppOpen` reason. Activation is ignored unless pausing in
    /// listed apps is turned on.
    pub async fn set_app_pause_active(&self, active: bool) -> RuntimeSnapshot {
        self.apply_enabled(|s| app_pause(s, active)).await
    }

    /// Report the current foreground application, or `None` when unknown.
    ///
    /// The monitored-app lookup and the resulting transition happen under
    /// the same lock, so a concurrent settings change cannot slip between
    /// them.
    pub async fn set_foreground_app(&self, app_id: Option<&str>) -> RuntimeSnapshot {
        self.apply_enabled(|s| {
            let listed = app_id.is_some_and(|id| s.settings.should_pause_for_app(id));
            app_pause(s, listed)
        })
        .await
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Turn the scheduler on or off.
    ///
    /// Disabling drops any break or pause in progress and leaves at least a
    /// full interval on the countdown. Enabling refills a countdown that had
    /// already run out.
    pub async fn set_enabled(&self, enabled: bool) -> RuntimeSnapshot {
        self.apply(|s| {
            s.settings.enabled = enabled;
            if enabled {
                if s.state.seconds_to_next_break == 0 {
                    s.state.seconds_to_next_break = s.preferences.small_every;
                }
                return;
            }
            let countdown = s.state.seconds_to_next_break;
            s.state = BreakState {
                mode: SessionMode::Normal,
                phase: None,
                is_big_break: false,
                prompt_seconds_elapsed: 0,
                break_seconds_remaining: 0,
                seconds_paused: 0,
                pause_reasons: Default::default(),
                mode_before_pause: None,
                seconds_to_next_break: countdown.max(s.preferences.small_every),
                ..s.state.clone()
            };
        })
        .await
    }

    /// Replace the preferences. A running countdown may shrink to the new
    /// interval but never grows.
    pub async fn update_preferences(&self, preferences: BreakPreferences) -> RuntimeSnapshot {
        let preferences = preferences.sanitized();
        self.apply(|s| {
            let countdown = s.state.seconds_to_next_break;
            s.state.seconds_to_next_break = countdown.min(preferences.small_every);
            s.preferences = preferences;
        })
        .await
    }

    /// Replace preferences and flags in one step, as when settings are
    /// reloaded from storage.
    pub async fn restore(&self, config: Config) -> RuntimeSnapshot {
        let config = config.sanitized();
        self.apply(|s| {
            let countdown = s.state.seconds_to_next_break;
            s.state.seconds_to_next_break = countdown.min(config.breaks.small_every);
            s.preferences = config.breaks;
            s.settings = config.app;
        })
        .await
    }

    pub async fn set_pause_in_listed_apps(&self, enabled: bool) -> RuntimeSnapshot {
        self.apply(|s| {
            s.settings.pause_in_listed_apps = enabled;
            if !enabled && s.state.pause_reasons.contains(&PauseReason::AppOpen) {
                s.state = app_pause(s, false);
            }
        })
        .await
    }

    pub async fn set_monitored_apps(&self, apps: impl Into<String>) -> RuntimeSnapshot {
        let apps = apps.into();
        self.apply(|s| s.settings.monitored_apps = apps).await
    }

    pub async fn set_auto_start_on_boot(&self, enabled: bool) -> RuntimeSnapshot {
        self.apply(|s| s.settings.auto_start_on_boot = enabled)
            .await
    }

    pub async fn set_persistent_notification_enabled(&self, enabled: bool) -> RuntimeSnapshot {
        self.apply(|s| s.settings.persistent_notification_enabled = enabled)
            .await
    }

    pub async fn set_overlay_transparency_percent(&self, percent: u8) -> RuntimeSnapshot {
        self.apply(|s| {
            s.settings.overlay_transparency_percent = percent.min(MAX_OVERLAY_TRANSPARENCY_PERCENT)
        })
        .await
    }

    pub async fn set_overlay_background_uri(&self, uri: impl Into<String>) -> RuntimeSnapshot {
        let uri = uri.into();
        self.apply(|s| s.settings.overlay_background_uri = uri)
            .await
    }

    pub async fn set_onboarding_completed(&self, completed: bool) -> RuntimeSnapshot {
        self.apply(|s| s.settings.onboarding_completed = completed)
            .await
    }

    pub async fn set_exclude_from_recents(&self, exclude: bool) -> RuntimeSnapshot {
        self.apply(|s| s.settings.exclude_from_recents = exclude)
            .await
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn apply(&self, update: impl FnOnce(&mut RuntimeSnapshot)) -> RuntimeSnapshot {
        let mut current = self.shared.current.lock().await;
        let previous_state = current.state.clone();
        update(&mut *current);
        Shared::log_transition(&previous_state, &current.state);
        let _ = self.shared.updates.send(current.clone());
        current.clone()
    }

    async fn apply_enabled(
        &self,
        transition: impl FnOnce(&RuntimeSnapshot) -> BreakState,
    ) -> RuntimeSnapshot {
        let mut current = self.shared.current.lock().await;
        if !current.settings.enabled {
            debug!("break scheduler disabled, ignoring command");
            return current.clone();
        }
        let next = transition(&*current);
        Shared::replace_state(&self.shared.updates, &mut current, next);
        current.clone()
    }
}

/// Next state after toggling `AppOpen`. Activation is ignored unless pausing
/// in listed apps is turned on.
fn app_pause(current: &RuntimeSnapshot, active: bool) -> BreakState {
    if active && !current.settings.pause_in_listed_apps {
        return current.state.clone();
    }
    let reason = PauseReason::AppOpen;
    engine::set_pause_reason(&current.state, reason, active, &current.preferences)
}

impl Shared {
    fn replace_state(
        updates: &broadcast::Sender<RuntimeSnapshot>,
        current: &mut RuntimeSnapshot,
        next: BreakState,
    ) {
        Self::log_transition(&current.state, &next);
        current.state = next;
        // No receivers is fine; the state is still stored.
        let _ = updates.send(current.clone());
    }

    fn log_transition(previous: &BreakState, next: &BreakState) {
        if previous.mode != next.mode || previous.phase != next.phase {
            debug!(
                from_mode = ?previous.mode,
                to_mode = ?next.mode,
                from_phase = ?previous.phase,
                to_phase = ?next.phase,
                big = next.is_big_break,
                cycle = next.break_cycle_count,
                "break state transition"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::BreakPhase;

    fn prefs() -> BreakPreferences {
        BreakPreferences {
            small_every: 5,
            small_for: 3,
            big_after: 2,
            big_for: 6,
            flash_for: 2,
            ..Default::default()
        }
    }

    fn scheduler() -> BreakScheduler {
        BreakScheduler::new(prefs(), AppSettings::default())
    }

    #[tokio::test]
    async fn break_controls_are_ignored_while_disabled() {
        let scheduler = scheduler();
        scheduler.set_enabled(false).await;

        let snap = scheduler.request_break_now(true).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);

        let snap = scheduler.set_pause_reason(PauseReason::AppOpen, true).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);
        assert!(snap.state.pause_reasons.is_empty());
    }

    #[tokio::test]
    async fn disabling_mid_break_resets_to_full_interval() {
        let scheduler = scheduler();
        let snap = scheduler.request_break_now(false).await;
        assert_eq!(snap.state.mode, SessionMode::Break);
        assert_eq!(snap.state.seconds_to_next_break, 0);

        let snap = scheduler.set_enabled(false).await;
        assert!(!snap.settings.enabled);
        assert_eq!(snap.state.mode, SessionMode::Normal);
        assert_eq!(snap.state.phase, None);
        assert_eq!(snap.state.seconds_to_next_break, 5);
        assert_eq!(snap.state.break_cycle_count, 1);
    }

    #[tokio::test]
    async fn disabling_while_paused_clears_reasons() {
        let scheduler = scheduler();
        scheduler.set_pause_reason(PauseReason::OnBattery, true).await;

        let snap = scheduler.set_enabled(false).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);
        assert!(snap.state.pause_reasons.is_empty());
        assert_eq!(snap.state.mode_before_pause, None);
    }

    #[tokio::test]
    async fn enabling_refills_only_an_exhausted_countdown() {
        let scheduler = BreakScheduler::with_snapshot(RuntimeSnapshot {
            state: BreakState {
                seconds_to_next_break: 0,
                ..BreakState::initial(&prefs())
            },
            preferences: prefs(),
            settings: AppSettings {
                enabled: false,
                ..Default::default()
            },
        });
        let snap = scheduler.set_enabled(true).await;
        assert_eq!(snap.state.seconds_to_next_break, 5);

        scheduler.postpone_for_seconds(60).await;
        let snap = scheduler.set_enabled(true).await;
        assert_eq!(snap.state.seconds_to_next_break, 60);
    }

    #[tokio::test]
    async fn shrinking_interval_caps_countdown() {
        let scheduler = scheduler();
        scheduler.postpone_for_seconds(100).await;

        let shorter = BreakPreferences {
            small_every: 30,
            ..prefs()
        };
        let snap = scheduler.update_preferences(shorter).await;
        assert_eq!(snap.state.seconds_to_next_break, 30);

        let longer = BreakPreferences {
            small_every: 300,
            ..prefs()
        };
        let snap = scheduler.update_preferences(longer).await;
        assert_eq!(snap.state.seconds_to_next_break, 30);
    }

    #[tokio::test]
    async fn unlocking_screen_restarts_countdown() {
        let scheduler = BreakScheduler::with_snapshot(RuntimeSnapshot {
            state: BreakState {
                seconds_to_next_break: 2,
                ..BreakState::initial(&prefs())
            },
            preferences: prefs(),
            settings: AppSettings::default(),
        });

        let snap = scheduler.set_screen_locked(true).await;
        assert_eq!(snap.state.mode, SessionMode::Paused);
        assert!(snap.state.pause_reasons.contains(&PauseReason::Sleep));

        let snap = scheduler.set_screen_locked(false).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);
        assert_eq!(snap.state.seconds_to_next_break, 5);
    }

    #[tokio::test]
    async fn app_pause_requires_listed_apps_flag() {
        let scheduler = scheduler();
        scheduler.set_monitored_apps("org.video").await;

        let snap = scheduler.set_foreground_app(Some("org.video")).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);

        scheduler.set_pause_in_listed_apps(true).await;
        let snap = scheduler.set_foreground_app(Some("org.video")).await;
        assert_eq!(snap.state.mode, SessionMode::Paused);

        let snap = scheduler.set_foreground_app(Some("org.mail")).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);

        scheduler.set_foreground_app(Some("org.video")).await;
        let snap = scheduler.set_pause_in_listed_apps(false).await;
        assert_eq!(snap.state.mode, SessionMode::Normal);
    }

    #[tokio::test]
    async fn foreground_app_publishes_one_snapshot() {
        let scheduler = scheduler();
        scheduler.set_monitored_apps("org.video").await;
        scheduler.set_pause_in_listed_apps(true).await;
        let mut rx = scheduler.subscribe();

        let snap = scheduler.set_foreground_app(Some("org.video")).await;
        assert_eq!(snap.state.mode, SessionMode::Paused);

        let published = rx.try_recv().unwrap();
        assert_eq!(published, snap);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn overlay_transparency_is_clamped() {
        let scheduler = scheduler();
        let snap = scheduler.set_overlay_transparency_percent(255).await;
        assert_eq!(snap.settings.overlay_transparency_percent, 90);
    }

    #[tokio::test]
    async fn flag_setters_apply_while_disabled() {
        let scheduler = scheduler();
        scheduler.set_enabled(false).await;
        scheduler.set_overlay_background_uri("file:///tmp/bg.png").await;
        scheduler.set_onboarding_completed(true).await;
        let snap = scheduler.set_exclude_from_recents(true).await;

        assert_eq!(snap.settings.overlay_background_uri, "file:///tmp/bg.png");
        assert!(snap.settings.onboarding_completed);
        assert!(snap.settings.exclude_from_recents);
        assert!(!snap.settings.enabled);
    }

    #[tokio::test]
    async fn restore_replaces_settings_and_caps_countdown() {
        let scheduler = scheduler();
        let mut config = Config::default();
        config.breaks.small_every = 2;
        config.app.auto_start_on_boot = true;

        let snap = scheduler.restore(config).await;
        assert_eq!(snap.preferences.small_every, 2);
        assert!(snap.settings.auto_start_on_boot);
        assert_eq!(snap.state.seconds_to_next_break, 2);
    }

    #[tokio::test]
    async fn commands_publish_snapshots_in_order() {
        let scheduler = scheduler();
        let mut rx = scheduler.subscribe();

        scheduler.request_break_now(false).await;
        scheduler.interrupt_break().await;
        scheduler.postpone_for_seconds(42).await;

        let requested = rx.recv().await.unwrap();
        assert_eq!(requested.state.phase, Some(BreakPhase::Prompt));
        let interrupted = rx.recv().await.unwrap();
        assert_eq!(interrupted.state.phase, Some(BreakPhase::Prompt));
        let last = rx.recv().await.unwrap();
        assert_eq!(last.state.mode, SessionMode::Normal);
        assert_eq!(last.state.seconds_to_next_break, 42);
    }

    #[tokio::test]
    async fn stop_without_start_reports_not_running() {
        let scheduler = scheduler();
        assert_eq!(scheduler.stop().await, Err(SchedulerError::NotRunning));
    }
}
