//! bonito-offline - drive the Bonito guide offline cache from a shell.
//!
//! Each invocation builds a worker for the configured cache version on top of
//! the on-disk partitions and delivers a single event to it.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bonito_offline_core::config::BACKGROUND_SYNC_TAG;
use bonito_offline_core::{CacheConfig, Destination};

/// Log file prefix inside the log directory
const LOG_FILE_NAME: &str = "bonito-offline.log";

#[derive(Parser, Debug)]
#[command(name = "bonito-offline", version, about = "Offline cache for the Bonito guide")]
pub struct Cli {
    /// Origin serving the app shell (e.g. https://guia.example)
    #[arg(long, env = "BONITO_ORIGIN", global = true)]
    pub origin: Option<String>,

    /// Cache version; partitions are named after it
    #[arg(long = "cache-version", env = "BONITO_CACHE_VERSION", global = true)]
    pub cache_version: Option<String>,

    /// Config file (default: ~/.config/bonito-offline/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Partition directory (default: ~/.cache/bonito-offline/<product>)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Worker(WorkerCommand),
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Commands delivered to a cache worker.
#[derive(Subcommand, Debug)]
pub enum WorkerCommand {
    /// Install this version (precache core files) and activate it
    Install,
    /// Delete every partition not belonging to this version
    Activate,
    /// Serve a request through the cache and print the body
    Fetch {
        /// Root-relative path, e.g. /api/attractions
        path: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Declared resource type (image, script, style, document, ...)
        #[arg(long, default_value = "empty")]
        destination: Destination,
    },
    /// Run a background sync
    Sync {
        #[arg(default_value = BACKGROUND_SYNC_TAG)]
        tag: String,
    },
    /// Build the notification for a push payload
    Push {
        /// JSON payload, e.g. '{"title":"Bonito","body":"..."}'
        payload: Option<String>,
    },
    /// Resolve a notification click
    Click {
        /// Action id ("open", "close"); omitted means the default tap
        action: Option<String>,
    },
    /// List partitions, entry counts and ages
    Status,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: u8, log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // RUST_LOG wins over -v
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr_layer).init();
            None
        }
    }
}

/// Config file, then environment/flags on top.
fn load_config(cli: &Cli) -> Result<CacheConfig> {
    let mut config = match &cli.config {
        Some(path) => CacheConfig::load_from(path)?,
        None => CacheConfig::load()?,
    };
    if let Some(origin) = &cli.origin {
        config.origin = origin.clone();
    }
    if let Some(version) = &cli.cache_version {
        config.version = version.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_dir.as_ref());

    let config = load_config(&cli)?;
    let cache_dir = match &cli.cache_dir {
        Some(dir) => dir.clone(),
        None => config.cache_dir()?,
    };
    info!(version = %config.version, origin = %config.origin, cache_dir = %cache_dir.display(), "bonito-offline starting");

    match cli.command {
        Command::Config { save } => commands::show_config(&config, save, cli.config.as_deref()),
        Command::Worker(command) => commands::run(command, config, cache_dir).await,
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn test_parse_fetch_with_destination() {
        let cli = Cli::try_parse_from([
            "bonito-offline",
            "--cache-version",
            "1.2.0",
            "fetch",
            "/photos/1",
            "--destination",
            "image",
        ])
        .unwrap();
        assert_eq!(cli.cache_version.as_deref(), Some("1.2.0"));
        match cli.command {
            Command::Worker(WorkerCommand::Fetch { path, method, destination }) => {
                assert_eq!(path, "/photos/1");
                assert_eq!(method, "GET");
                assert_eq!(destination, Destination::Image);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_sync_defaults_to_attractions_tag() {
        let cli = Cli::try_parse_from(["bonito-offline", "sync"]).unwrap();
        match cli.command {
            Command::Worker(WorkerCommand::Sync { tag }) => assert_eq!(tag, "background-sync-attractions"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_save() {
        let cli = Cli::try_parse_from(["bonito-offline", "config", "--save"]).unwrap();
        assert!(matches!(cli.command, Command::Config { save: true }));
    }

    #[test]
    fn test_config_save_writes_to_given_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let args: Vec<OsString> = vec![
            "bonito-offline".into(),
            "--config".into(),
            path.clone().into_os_string(),
            "--cache-version".into(),
            "3.0.0".into(),
            "config".into(),
            "--save".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = load_config(&cli).unwrap();

        match cli.command {
            Command::Config { save } => commands::show_config(&config, save, cli.config.as_deref()).unwrap(),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(CacheConfig::load_from(&path).unwrap().version, "3.0.0");
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "bonito-offline",
            "--config",
            "/nonexistent/bonito/config.json",
            "--origin",
            "https://guia.example",
            "status",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.origin, "https://guia.example");
        assert_eq!(config.product, "ecoexpedicoes");
    }
}
