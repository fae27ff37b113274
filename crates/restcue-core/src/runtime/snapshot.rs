//! Snapshot published by the scheduler after every transition.

use serde::{Deserialize, Serialize};

use crate::storage::{AppSettings, Config};
use crate::timer::{BreakPreferences, BreakState};

/// Everything a presentation collaborator needs to render one moment.
///
/// Published by [`super::BreakScheduler`] after every applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    pub state: BreakState,
    pub preferences: BreakPreferences,
    pub settings: AppSettings,
}

impl RuntimeSnapshot {
    pub fn new(preferences: BreakPreferences, settings: AppSettings) -> Self {
        let preferences = preferences.sanitized();
        Self {
            state: BreakState::initial(&preferences),
            preferences,
            settings: settings.sanitized(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.breaks.clone(), config.app.clone())
    }

    /// Persistable part of the snapshot.
    pub fn to_config(&self) -> Config {
        Config {
            breaks: self.preferences.clone(),
            app: self.settings.clone(),
        }
    }
}
