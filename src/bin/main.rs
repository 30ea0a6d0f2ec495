use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agent_follow::config::defaults::default_config_toml;
use agent_follow::config::{FollowConfig, SettingsEventKind, load_settings};
use agent_follow::{AgentEvent, EditorHost, FollowError, FollowResult, MemoryHost, Session};
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;

const LOG_TARGET: &str = "agent_follow::cli";

/// Extra time granted after the last timer is due, before effects are printed.
const REPLAY_GRACE: Duration = Duration::from_millis(50);

/// Follow an agent's edits: locate them, preview pending changes, highlight applied ones
#[derive(Parser)]
#[command(name = "agent-follow")]
#[command(version)]
#[command(about = "Follow an agent's edits: locate them, preview pending changes, highlight applied ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay agent events (one JSON object per line) against an in-memory editor
    Replay {
        /// File with one event per line
        events: PathBuf,

        /// Project root: relative paths resolve against it and its config is loaded
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Inspect or generate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the default configuration as TOML
    Init,
    /// Print the effective configuration after merging all layers
    Show {
        /// Project root containing agent-follow.toml
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay { events, root } => replay(&events, root.as_deref()).await,
        Commands::Config {
            command: ConfigCommands::Init,
        } => default_config_toml().map(|toml| print!("{}", toml)),
        Commands::Config {
            command: ConfigCommands::Show { root },
        } => show_config(root.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn replay(events: &Path, root: Option<&Path>) -> FollowResult<()> {
    let loaded = load_settings(root);
    loaded.log_events();
    let settings = loaded.settings;

    let host = Arc::new(match root {
        Some(root) => MemoryHost::with_root(root),
        None => MemoryHost::new(),
    });
    let session = Session::new(host.clone(), settings.clone(), Handle::current());

    let reader = BufReader::new(File::open(events)?);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = match AgentEvent::from_json(&line) {
            Ok(event) => event,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "Skipping line {}: {}", index + 1, err);
                continue;
            }
        };

        // The in-memory editor applies writes itself before they are highlighted.
        if let AgentEvent::FileWrite {
            path,
            content: Some(content),
            ..
        } = &event
            && let Some(resolved) = host.resolve_path(path)
        {
            host.open_text(resolved, content.clone());
        }

        let outcome = session.handle(event);
        log::info!(target: LOG_TARGET, "Line {}: {:?}", index + 1, outcome);
        tokio::task::yield_now().await;
    }

    let last_settle = settings.settle_delays.iter().max().copied();
    let wait = settings.debounce_delay + last_settle.unwrap_or_default() + REPLAY_GRACE;
    tokio::time::sleep(wait).await;

    for effect in host.take_effects() {
        println!("{}", serde_json::to_string(&effect)?);
    }
    println!(
        "{}",
        serde_json::json!({ "previews": session.preview_count() })
    );
    session.close();
    Ok(())
}

fn show_config(root: Option<&Path>) -> FollowResult<()> {
    let loaded = load_settings(root);
    for event in &loaded.events {
        let level = match event.kind {
            SettingsEventKind::Info => "info",
            SettingsEventKind::Warning => "warning",
        };
        eprintln!("{}: {}", level, event.message);
    }
    let rendered = toml::to_string_pretty(&FollowConfig::from(&loaded.settings))
        .map_err(|err| FollowError::config(err.to_string()))?;
    print!("{}", rendered);
    Ok(())
}
