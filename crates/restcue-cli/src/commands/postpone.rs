use clap::Subcommand;
use restcue_core::timer::DEFAULT_POSTPONE_DURATIONS_SECONDS;
use restcue_core::{
    format_postpone_durations, normalize_postpone_durations, parse_postpone_durations,
};

#[derive(Subcommand)]
pub enum PostponeAction {
    /// Canonical form of a comma-separated list of seconds
    Normalize {
        /// Raw list, e.g. "300, 60,abc,60"
        raw: String,
    },
    /// Parse a list into offers, falling back to the defaults when empty
    Parse {
        raw: Option<String>,
        /// Print as JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the default offers
    Defaults,
}

pub fn run(action: PostponeAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PostponeAction::Normalize { raw } => {
            println!("{}", normalize_postpone_durations(&raw));
        }
        PostponeAction::Parse { raw, json } => {
            let offers =
                parse_postpone_durations(raw.as_deref(), &DEFAULT_POSTPONE_DURATIONS_SECONDS);
            if json {
                println!("{}", serde_json::to_string(&offers)?);
            } else {
                println!("{}", format_postpone_durations(&offers));
            }
        }
        PostponeAction::Defaults => {
            let offers = format_postpone_durations(&DEFAULT_POSTPONE_DURATIONS_SECONDS);
            println!("{offers}");
        }
    }
    Ok(())
}
