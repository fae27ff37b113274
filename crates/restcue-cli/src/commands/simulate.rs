use chrono::{Duration, Utc};
use clap::Args;
use restcue_core::notify::{format_clock, seconds_until_next_break, PreBreakNotifier};
use restcue_core::timer::engine;
use restcue_core::{BreakPreferences, BreakState, Config, Event};

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of one-second ticks to replay
    #[arg(long, default_value = "3600")]
    ticks: u32,
    /// Start from the saved configuration instead of the defaults
    #[arg(long)]
    from_config: bool,
    /// Override the interval between breaks (seconds)
    #[arg(long)]
    small_every: Option<u32>,
    /// Override the small break length (seconds)
    #[arg(long)]
    small_for: Option<u32>,
    /// Override how many breaks make a cycle ending in a big break
    #[arg(long)]
    big_after: Option<u32>,
    /// Override the big break length (seconds)
    #[arg(long)]
    big_for: Option<u32>,
    /// Override the prompt length (seconds)
    #[arg(long)]
    flash_for: Option<u32>,
    /// Print every state instead of only transitions
    #[arg(long)]
    snapshots: bool,
}

impl SimulateArgs {
    fn preferences(&self) -> BreakPreferences {
        let base = if self.from_config {
            Config::load_or_default().breaks
        } else {
            BreakPreferences::default()
        };
        BreakPreferences {
            small_every: self.small_every.unwrap_or(base.small_every),
            small_for: self.small_for.unwrap_or(base.small_for),
            big_after: self.big_after.unwrap_or(base.big_after),
            big_for: self.big_for.unwrap_or(base.big_for),
            flash_for: self.flash_for.unwrap_or(base.flash_for),
            ..base
        }
        .sanitized()
    }
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let preferences = args.preferences();
    let started = Utc::now();
    let mut state = BreakState::initial(&preferences);
    let mut notifier = PreBreakNotifier::new();

    for second in 1..=args.ticks {
        let at = started + Duration::seconds(i64::from(second));
        let next = engine::tick(&state, &preferences);

        if let Some(notice) = notifier.observe(&next, &preferences) {
            println!("{}", serde_json::to_string(&notice)?);
        }
        if args.snapshots {
            println!("{}", serde_json::to_string(&Event::snapshot(&next, at))?);
        } else {
            for event in Event::diff(&state, &next, &preferences, at) {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        state = next;
    }

    eprintln!(
        "after {}s: {} small / {} big breaks, next break in {}",
        args.ticks,
        state.completed_small_breaks,
        state.completed_big_breaks,
        format_clock(seconds_until_next_break(&state, &preferences)),
    );
    Ok(())
}
