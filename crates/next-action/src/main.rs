//! CLI entry point for next-action.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};

use anyhow::{Result, bail};
use clap::Parser;
use next_action_app::{Config, ConfigOverrides, SyncService};
use next_action_core::InboxMode;
use next_action_store_todoist::TodoistStore;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use daemon::Schedule;

mod daemon;

/// Keeps a next-action label on the actionable tasks of a Todoist account.
#[derive(Parser, Debug)]
#[command(
    name = "next-action",
    version,
    about = "next-action: GTD next-action labelling for Todoist projects"
)]
struct Cli {
    /// Path to the TOML config file (defaults to the user config dir).
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Todoist API token.
    #[arg(short = 'a', long, env = "TODOIST_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Name of the next-action label.
    #[arg(short = 'l', long)]
    label: Option<String>,

    /// Label added to tasks that carry no location label.
    #[arg(long)]
    everywhere_label: Option<String>,

    /// First character of location label names.
    #[arg(long)]
    location_prefix: Option<char>,

    /// Seconds to wait between syncs.
    #[arg(short = 'd', long)]
    delay: Option<u64>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Inbox handling: parallel, serial or none.
    #[arg(long)]
    inbox: Option<InboxMode>,

    /// Suffix marking a project or task as parallel.
    #[arg(long)]
    parallel_suffix: Option<char>,

    /// Suffix marking a project or task as serial.
    #[arg(long)]
    serial_suffix: Option<char>,

    /// Hide tasks due this many days out or later (0 disables).
    #[arg(long, allow_negative_numbers = true)]
    hide_future: Option<i64>,

    /// Hide dated tasks that have no explicit mode.
    #[arg(long)]
    hide_scheduled: bool,

    /// Remove the label from projects that are not managed.
    #[arg(long)]
    remove_label: bool,

    /// Run a single sync and exit.
    #[arg(long)]
    onetime: bool,

    /// Priority given to tasks when they become next actions (1-4).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    priority: Option<u8>,

    /// Sync endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,
}

impl Cli {
    fn into_parts(self) -> (Option<PathBuf>, ConfigOverrides) {
        let overrides = ConfigOverrides {
            api_key: self.api_key,
            label: self.label,
            everywhere_label: self.everywhere_label,
            location_prefix: self.location_prefix,
            delay: self.delay,
            debug: self.debug,
            inbox: self.inbox,
            parallel_suffix: self.parallel_suffix,
            serial_suffix: self.serial_suffix,
            hide_future: self.hide_future,
            hide_scheduled: self.hide_scheduled,
            remove_label: self.remove_label,
            onetime: self.onetime,
            priority: self.priority,
            endpoint: self.endpoint,
        };
        (self.config, overrides)
    }
}

fn main() -> Result<()> {
    let (config_path, overrides) = Cli::parse().into_parts();
    let config = load_config(config_path)?.with_overrides(overrides)?;

    install_tracing(config.debug);

    let store = TodoistStore::new(config.api_key()?, config.endpoint.clone())?;
    let mut service = SyncService::start(store, &config.label_names(), config.reconcile_options()?)?;
    info!(label = %service.labels().marker, inbox = %config.inbox, "Watching Todoist account");

    let shutdown = shutdown_channel();
    daemon::run(&mut service, Schedule::from(&config), &shutdown)?;
    Ok(())
}

fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    match explicit {
        Some(path) if !path.exists() => bail!("config file {} does not exist", path.display()),
        Some(path) => Config::from_file(path),
        None => Config::default_path().map_or_else(|| Ok(Config::default()), Config::from_file),
    }
}

fn install_tracing(debug: bool) {
    // RUST_LOG is honoured; the default level is INFO, or DEBUG with --debug.
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}

fn shutdown_channel() -> Receiver<()> {
    let (tx, rx) = mpsc::channel();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = tx.send(());
    }) {
        warn!(error = %err, "Could not install Ctrl-C handler");
    }
    rx
}
