use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use clap::Args;
use restcue_core::notify::{NotificationThrottle, PreBreakNotifier};
use restcue_core::{BreakScheduler, Config, Event, PauseReason, Result, RuntimeSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Print a full snapshot line whenever the status line would refresh
    #[arg(long)]
    status: bool,
    /// Do not write changed settings back to the config file
    #[arg(long)]
    no_save: bool,
}

/// One line of stdin input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Break { big: bool },
    Postpone(Option<u32>),
    Interrupt,
    ExitPost,
    Pause(PauseReason),
    Resume(PauseReason),
    Lock,
    Unlock,
    Foreground(Option<String>),
    Enable,
    Disable,
    Status,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };
    let arg = words.next();

    let command = match verb {
        "break" => Command::Break {
            big: arg == Some("big"),
        },
        "postpone" => match arg {
            Some(secs) => Command::Postpone(Some(
                secs.parse().map_err(|_| format!("invalid seconds: {secs}"))?,
            )),
            None => Command::Postpone(None),
        },
        "interrupt" => Command::Interrupt,
        "exit-post" => Command::ExitPost,
        "pause" | "resume" => {
            let reason: PauseReason = arg
                .ok_or_else(|| format!("{verb} needs a reason"))?
                .parse()?;
            if verb == "pause" {
                Command::Pause(reason)
            } else {
                Command::Resume(reason)
            }
        }
        "lock" => Command::Lock,
        "unlock" => Command::Unlock,
        "foreground" => Command::Foreground(arg.map(str::to_string)),
        "enable" => Command::Enable,
        "disable" => Command::Disable,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_scheduler(args));
    // A stdin read still parked on the blocking pool must not hold the
    // process open.
    runtime.shutdown_background();
    Ok(result?)
}

async fn run_scheduler(args: RunArgs) -> Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "falling back to default configuration");
        Config::default()
    });
    let save_path = if args.no_save {
        None
    } else {
        match Config::path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "settings will not be saved");
                None
            }
        }
    };

    let scheduler = BreakScheduler::from_config(&config);
    let updates = scheduler.subscribe();
    let initial = scheduler.snapshot().await;
    let writer = SettingsWriter::new(save_path, initial.to_config());
    let printer = tokio::spawn(print_updates(updates, initial, args.status, writer));

    scheduler.start().await;
    info!("reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        apply(&scheduler, command).await?;
    }

    // Dropping the last handle closes the channel; the printer then drains
    // what was already published and returns.
    scheduler.dispose().await;
    if let Err(e) = printer.await {
        warn!(error = %e, "output task ended abnormally");
    }
    Ok(())
}

async fn apply(scheduler: &BreakScheduler, command: Command) -> Result<()> {
    match command {
        Command::Break { big } => {
            scheduler.request_break_now(big).await;
        }
        Command::Postpone(Some(secs)) => {
            scheduler.postpone_for_seconds(secs).await;
        }
        Command::Postpone(None) => {
            scheduler.postpone().await;
        }
        Command::Interrupt => {
            scheduler.interrupt_break().await;
        }
        Command::ExitPost => {
            scheduler.exit_post_break().await;
        }
        Command::Pause(reason) => {
            scheduler.set_pause_reason(reason, true).await;
        }
        Command::Resume(reason) => {
            scheduler.set_pause_reason(reason, false).await;
        }
        Command::Lock => {
            scheduler.set_screen_locked(true).await;
        }
        Command::Unlock => {
            scheduler.set_screen_locked(false).await;
        }
        Command::Foreground(app) => {
            scheduler.set_foreground_app(app.as_deref()).await;
        }
        Command::Enable => {
            scheduler.set_enabled(true).await;
        }
        Command::Disable => {
            scheduler.set_enabled(false).await;
        }
        Command::Status => {
            let snapshot = scheduler.snapshot().await;
            let event = Event::snapshot(&snapshot.state, Utc::now());
            println!("{}", serde_json::to_string(&event)?);
        }
        Command::Quit => {}
    }
    Ok(())
}

/// Writes settings back to the config file as soon as they change.
///
/// Ticks only move the break state, so most snapshots leave the persisted
/// part untouched and are skipped.
struct SettingsWriter {
    path: Option<PathBuf>,
    last: Config,
}

impl SettingsWriter {
    fn new(path: Option<PathBuf>, last: Config) -> Self {
        Self { path, last }
    }

    /// A failed write is logged once per change and does not stop the
    /// scheduler.
    fn observe(&mut self, snapshot: &RuntimeSnapshot) {
        let Some(path) = &self.path else {
            return;
        };
        let config = snapshot.to_config();
        if config == self.last {
            return;
        }
        match config.save_to(path) {
            Ok(()) => debug!(path = %path.display(), "settings saved"),
            Err(e) => warn!(error = %e, "failed to persist settings"),
        }
        self.last = config;
    }
}

async fn print_updates(
    mut updates: broadcast::Receiver<RuntimeSnapshot>,
    initial: RuntimeSnapshot,
    status: bool,
    mut writer: SettingsWriter,
) {
    let started = Instant::now();
    let mut previous = initial.state;
    let mut notifier = PreBreakNotifier::new();
    let mut throttle = NotificationThrottle::new();

    loop {
        let snapshot = match updates.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "output fell behind, some updates were dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let at = Utc::now();
        writer.observe(&snapshot);

        for event in Event::diff(&previous, &snapshot.state, &snapshot.preferences, at) {
            print_json(&event);
        }
        if let Some(notice) = notifier.observe(&snapshot.state, &snapshot.preferences) {
            print_json(&notice);
        }
        if status
            && snapshot.settings.persistent_notification_enabled
            && throttle.should_refresh(
                &snapshot.state,
                &snapshot.preferences,
                snapshot.settings.persistent_notification_update_seconds,
                started.elapsed().as_secs(),
            )
        {
            print_json(&Event::snapshot(&snapshot.state, at));
        }

        previous = snapshot.state;
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode output line"),
    }
}
