//! Sentinel-X console binary.
//!
//! `sentinel-console` opens the live dashboard; `sentinel-console fetch
//! <view>` performs one fetch for a view and prints the payload;
//! `sentinel-console views` lists the view catalog.

mod config;
mod console;
mod panels;

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sentinel_refresh::{Compositor, RefreshSettings, ViewPoller};
use sentinel_telemetry::{HttpTelemetryClient, TelemetryClient, ViewCatalog, ViewId};

use crate::config::{CliOverrides, ConsoleConfig};

#[derive(Parser, Debug)]
#[command(
    name = "sentinel-console",
    version,
    about = "Live terminal dashboard for the Sentinel-X monitoring API"
)]
struct Cli {
    /// Path to a TOML config file (default: <config_dir>/sentinel/console.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8000/api/v1.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Shared refresh interval in milliseconds.
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Start with live refresh paused.
    #[arg(long)]
    paused: bool,

    /// View to open first.
    #[arg(long, value_name = "VIEW")]
    view: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Open the live dashboard (default).
    Console,
    /// Fetch one view once and print its payload as JSON.
    Fetch {
        /// View name, e.g. `network`.
        view: String,
    },
    /// List every view with its endpoint and cadence.
    Views,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_url: self.base_url.clone(),
            interval_ms: self.interval_ms,
            paused: self.paused,
            view: self.view.clone(),
        }
    }
}

enum LogTarget {
    Stderr,
    File(File),
    Discard,
}

fn init_logging(level: &str, target: LogTarget) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match target {
        LogTarget::Stderr => fmt.with_writer(std::io::stderr).init(),
        LogTarget::File(file) => fmt.with_ansi(false).with_writer(Mutex::new(file)).init(),
        LogTarget::Discard => fmt.with_writer(std::io::sink).init(),
    }
}

/// `<data_dir>/sentinel/console.log`, opened for append. The TUI owns the
/// terminal, so logs must not reach stderr while it runs.
fn open_log_file() -> Option<(PathBuf, File)> {
    let dir = dirs::data_dir()?.join("sentinel");
    std::fs::create_dir_all(&dir).ok()?;
    let path = dir.join("console.log");
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
    Some((path, file))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConsoleConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    config.apply_overrides(&cli.overrides());
    config.validate()?;

    let command = cli.command.clone().unwrap_or(Command::Console);
    match command {
        Command::Console => {
            match open_log_file() {
                Some((path, file)) => {
                    init_logging(&config.log.level, LogTarget::File(file));
                    tracing::info!(path = %path.display(), "Logging to file");
                }
                None => init_logging(&config.log.level, LogTarget::Discard),
            }
            run_console(&config)
        }
        Command::Fetch { view } => {
            init_logging(&config.log.level, LogTarget::Stderr);
            let view: ViewId = view.parse().map_err(anyhow::Error::msg)?;
            run_fetch(&config, view).await
        }
        Command::Views => {
            print_views(&config);
            Ok(())
        }
    }
}

fn build_client(config: &ConsoleConfig) -> Arc<dyn TelemetryClient> {
    Arc::new(HttpTelemetryClient::new(
        config.api.base_url.clone(),
        config.request_timeout(),
    ))
}

fn run_console(config: &ConsoleConfig) -> anyhow::Result<()> {
    let settings = Arc::new(RefreshSettings::new(config.refresh_config()?));
    let compositor = Compositor::with_initial_view(
        ViewCatalog::default(),
        build_client(config),
        settings,
        config.initial_view()?,
    )?;
    tracing::info!(
        base_url = %config.api.base_url,
        interval_ms = config.refresh.interval_ms,
        live = config.refresh.live,
        "Starting console"
    );
    console::run_console(
        compositor,
        config.api.base_url.clone(),
        config.frame_interval(),
    )
}

/// One paused session: a single fetch, then print the payload.
async fn run_fetch(config: &ConsoleConfig, view: ViewId) -> anyhow::Result<()> {
    let catalog = ViewCatalog::default();
    let descriptor = catalog
        .get(view)
        .cloned()
        .with_context(|| format!("view '{view}' is not in the catalog"))?;
    if !descriptor.is_polled() {
        anyhow::bail!("view '{view}' is a static panel and has nothing to fetch");
    }
    let endpoint = descriptor.endpoint.clone().unwrap_or_default();

    let poller = ViewPoller::new(descriptor, build_client(config))?;
    poller.start(config.refresh_config()?.with_live(false));

    let snapshot = loop {
        let snapshot = poller.snapshot();
        if !snapshot.in_flight {
            break snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    poller.stop();

    if let Some(error) = snapshot.state.last_error {
        anyhow::bail!("fetch of {endpoint} for view '{view}' failed: {error}");
    }
    let payload = snapshot
        .state
        .payload
        .with_context(|| format!("fetch of {endpoint} returned nothing"))?;
    println!("{}", payload.to_pretty_string());
    Ok(())
}

fn print_views(config: &ConsoleConfig) {
    let Ok(refresh) = config.refresh_config() else {
        return;
    };
    println!("{:<12} {:<22} {:<28} CADENCE", "VIEW", "LABEL", "ENDPOINT");
    for view in ViewCatalog::default().iter() {
        let endpoint = view.endpoint.as_deref().unwrap_or("(static)");
        let cadence = if view.is_polled() {
            format!("{} ms", refresh.interval_for(view).as_millis())
        } else {
            "-".to_string()
        };
        println!(
            "{:<12} {:<22} {:<28} {}",
            view.id.as_str(),
            view.id.label(),
            endpoint,
            cadence
        );
    }
}
