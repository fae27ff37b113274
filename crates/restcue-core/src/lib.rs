//! # Restcue Core Library
//!
//! Break-reminder scheduling: a countdown to the next break, a two-stage
//! break (prompt banner, then full-screen rest) with a small/big cadence,
//! postponement, and pausing on external signals. The CLI binary and any
//! overlay front end are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: pure transition functions over [`BreakState`]; the
//!   caller advances time one second per [`timer::engine::tick`]
//! - **Runtime**: [`BreakScheduler`] owns the live state, drives the
//!   one-second tick and publishes [`RuntimeSnapshot`]s to subscribers
//! - **Storage**: TOML-based configuration
//! - **Notify**: derived values for notifications and overlays
//!
//! ## Key Components
//!
//! - [`BreakScheduler`]: Owned runtime driver
//! - [`BreakPreferences`]: Break cadence and presentation settings
//! - [`Config`]: Application configuration management
//! - [`Event`]: Observable transitions between states

pub mod error;
pub mod events;
pub mod notify;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, Result, SchedulerError};
pub use events::Event;
pub use notify::{NotificationThrottle, PreBreakNotice, PreBreakNotifier};
pub use runtime::{BreakScheduler, RuntimeSnapshot};
pub use storage::{AppSettings, Config};
pub use timer::{
    format_postpone_durations, normalize_postpone_durations, parse_postpone_durations,
    parse_postpone_durations_or_empty, BreakPhase, BreakPreferences, BreakState, PauseReason,
    SessionMode,
};
