mod scheduler;
mod snapshot;

pub use scheduler::{BreakScheduler, TICK_PERIOD};
pub use snapshot::RuntimeSnapshot;
