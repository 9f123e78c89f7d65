//! # costline
//!
//! Entry points invoked by the host agent:
//!
//! - `costline hook <action>` per lifecycle event, payload on stdin
//! - `costline status` per render tick, payload on stdin, breakdown JSON on stdout
//!
//! Both exit 0 on every recoverable failure so the host is never disrupted.

#![deny(unsafe_code)]

use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use costline_attribution::{AttributionService, ServiceConfig};
use costline_core::constants::{NAME, VERSION};
use costline_core::logging::init_subscriber;
use costline_settings::{CostlineSettings, load_settings_from_path, settings_path};
use costline_store::FileStateStore;
use tracing::{debug, warn};

/// Per-context cost attribution for agent sessions.
#[derive(Parser, Debug)]
#[command(
    name = NAME,
    version = VERSION,
    about = "Per-context cost attribution for agent sessions"
)]
struct Cli {
    /// Settings file (defaults to `~/.costline/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Directory for session records (overrides settings).
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Handle a host lifecycle hook (`tool_use`, `tool_result`, `subagent_stop`).
    Hook {
        /// Hook action name.
        action: String,
    },
    /// Record the session's cumulative cost and print its breakdown.
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.settings.clone().unwrap_or_else(settings_path);
    let (settings, settings_error) = match load_settings_from_path(&path) {
        Ok(settings) => (settings, None),
        Err(error) => (CostlineSettings::default(), Some(error)),
    };
    init_subscriber(&settings.logging.level);
    if let Some(error) = settings_error {
        warn!(path = %path.display(), %error, "failed to load settings, using defaults");
    }

    let service = build_service(&settings, cli.state_dir);
    match cli.command {
        Command::Hook { action } => {
            run_hook(&service, &action);
            Ok(())
        }
        Command::Status => run_status(&service),
    }
}

fn build_service(settings: &CostlineSettings, state_dir: Option<PathBuf>) -> AttributionService {
    let dir = state_dir.unwrap_or_else(|| settings.state_dir());
    debug!(dir = %dir.display(), "using state directory");
    AttributionService::new(
        Arc::new(FileStateStore::new(dir)),
        ServiceConfig::from(settings),
    )
}

/// Read stdin unless it is a terminal (no payload piped in).
fn read_payload() -> Option<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut payload = String::new();
    match stdin.read_to_string(&mut payload) {
        Ok(_) => Some(payload),
        Err(error) => {
            warn!(%error, "failed to read stdin");
            None
        }
    }
}

fn run_hook(service: &AttributionService, action: &str) {
    let Some(payload) = read_payload() else {
        return;
    };
    costline_hooks::handle_hook(service, action, &payload);
}

fn run_status(service: &AttributionService) -> Result<()> {
    let payload = read_payload().unwrap_or_default();
    let breakdown = costline_hooks::handle_status(service, &payload);
    let line = serde_json::to_string(&breakdown).context("Failed to encode breakdown")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").context("Failed to write breakdown")?;
    Ok(())
}
