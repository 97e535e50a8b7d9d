//! teamwatch - Monitoring dashboard for multi-agent teams
//!
//! Reads team rosters, tasks, and inboxes from `~/.claude/` and prints the
//! derived views as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # List teams with their health
//! teamwatch teams
//!
//! # Full snapshot of one team
//! teamwatch snapshot my-team
//!
//! # Only the ranked action queue
//! teamwatch queue my-team
//!
//! # Who joined, talked, worked and was shut down, per agent
//! teamwatch agent-timeline my-team
//!
//! # Requests still waiting on an answer, grouped by conversation
//! teamwatch messages my-team --unresolved --group-by-pair
//!
//! # Re-print the snapshot whenever the team's files change
//! teamwatch watch my-team
//!
//! # Read state from somewhere other than ~/.claude
//! teamwatch --claude-home /srv/agents teams
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use teamwatch_core::watcher::{TeamEvent, TeamWatcher, WatcherConfig};
use teamwatch_core::{
    LogGuard, MonitorConfig, TeamwatchError, init_logging, log_team_event, validate_identifier,
};
use teamwatch_insights::{MessageQuery, SeenPermissions, TeamMonitor};
use tracing::{error, info, warn};

/// Monitoring dashboard for multi-agent teams
///
/// Computes an action queue, a health score, agent activity and message
/// views from the team files agents write under ~/.claude/.
#[derive(Parser, Debug)]
#[command(name = "teamwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.teamwatch/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.teamwatch/config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the agent state tree, overrides config and CLAUDE_HOME
    #[arg(long)]
    claude_home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every team with task counts and health
    Teams,

    /// Full derived snapshot of a team
    Snapshot { team: String },

    /// Ranked action queue for a team
    Queue { team: String },

    /// Health score breakdown for a team
    Health { team: String },

    /// Per-agent activity for a team
    Activity { team: String },

    /// Per-agent lifecycle lanes (joins, messages, tasks, shutdowns)
    AgentTimeline { team: String },

    /// Message feed for a team
    Messages {
        team: String,

        /// Only requests still waiting on a response
        #[arg(long)]
        unresolved: bool,

        /// Group messages by agent pair
        #[arg(long)]
        group_by_pair: bool,
    },

    /// Print a fresh snapshot whenever the team's files change
    Watch { team: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            if let Some(hint) = e.guidance() {
                eprintln!("{}", hint);
            }
            return ExitCode::from(1);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("teamwatch error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e
                .downcast_ref::<TeamwatchError>()
                .and_then(|te| te.guidance())
            {
                eprintln!("{}", hint);
            }
            eprintln!("Logs: {}", guard.log_dir().display());
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> teamwatch_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose)
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config =
        MonitorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(home) = &cli.claude_home {
        config = config.with_claude_home(home);
    }
    info!(claude_home = %config.claude_home.display(), "configuration loaded");
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let mut monitor = TeamMonitor::new(config.clone());
    let now = chrono::Utc::now();

    match cli.command {
        Command::Teams => print_json(&monitor.summaries(now)?),
        Command::Snapshot { team } => print_json(&monitor.require_snapshot(&team, now)?),
        Command::Queue { team } => print_json(&monitor.require_snapshot(&team, now)?.action_queue),
        Command::Health { team } => print_json(&monitor.require_snapshot(&team, now)?.health),
        Command::Activity { team } => print_json(&monitor.require_snapshot(&team, now)?.activity),
        Command::AgentTimeline { team } => {
            let timeline = monitor
                .agent_timeline(&team, now)?
                .ok_or_else(|| TeamwatchError::TeamNotFound { team: team.clone() })?;
            print_json(&timeline)
        }
        Command::Messages {
            team,
            unresolved,
            group_by_pair,
        } => {
            let query = MessageQuery {
                unresolved,
                group_by_pair,
            };
            print_json(&monitor.messages(&team, query)?)
        }
        Command::Watch { team } => {
            validate_identifier(&team, "team name")?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(watch(monitor, config, team))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Re-render on every change batch and on each poll tick, until Ctrl-C.
///
/// The tick keeps idle durations moving when no files change.
async fn watch(mut monitor: TeamMonitor, config: MonitorConfig, team: String) -> Result<()> {
    let watcher_config = WatcherConfig::from_monitor_config(&config).with_team_filter(team.clone());
    let (_watcher, mut events) =
        TeamWatcher::with_config(watcher_config).context("Failed to start file watcher")?;

    let mut seen = SeenPermissions::new();
    let mut ticker = tokio::time::interval(config.poll_interval());

    log_team_event!(team, "watch_started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            event = events.recv() => match event {
                Some(TeamEvent::Changed { paths, .. }) => {
                    log_team_event!(team, "files_changed", paths = paths.len());
                }
                Some(TeamEvent::Error { error }) => {
                    warn!("watch error: {}", error);
                    continue;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping watch");
                break;
            }
        }

        let now = chrono::Utc::now();
        let snapshot = match monitor.snapshot(&team, now) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                warn!(team = %team, "team has no readable config yet");
                continue;
            }
            Err(e) if e.is_recoverable() => {
                warn!(team = %team, "retrying after read error: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for perm in seen.observe(&snapshot.pending_permissions) {
            log_team_event!(
                team,
                "permission_requested",
                request_id = %perm.request_id,
                tool = %perm.tool_name,
                agent = %perm.agent_name
            );
        }

        print_json(&snapshot)?;
    }

    log_team_event!(team, "watch_stopped");
    Ok(())
}
