//! # nixie-settings: Nixie Clock Settings Page
//!
//! A terminal settings page for the ESP32 nixie clock. Reads the clock's
//! configuration over its HTTP API, edits Wi-Fi, time and backlight settings,
//! drives the backlight color live from a color wheel and posts the result
//! back.
//!
//! ## Usage
//!   nixie-settings                          # Launch TUI against the saved device
//!   nixie-settings --device 10.0.0.7        # Use (and remember) another clock
//!   nixie-settings color 255 120 0          # One-shot commands, no TUI
//!   nixie-settings mode spectrum
//!   nixie-settings show | apply <file.json> | reboot

mod app;
mod config;
mod controller;
mod device;
mod form;
mod record;
mod sync;
#[cfg(test)]
mod testing;
mod ui;
mod wheel;

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{ClientConfig, config_path, log_path};
use crate::controller::PageController;
use crate::device::{DeviceApi, HttpDevice};
use crate::form::timezone_options;
use crate::record::{ConfigRecord, LedMode, Rgb};

// ═══════════════════════════════════════════════════════════════════════════════
//  Command Line
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "nixie-settings", version, about = "Settings page for the nixie clock")]
struct Args {
    /// Clock address, e.g. 192.168.4.1 or http://clock.local
    #[arg(short, long)]
    device: Option<String>,

    /// Config file [default: ~/.config/nixie-settings/config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the clock's current configuration
    Show,
    /// Set the backlight color
    Color { r: u8, g: u8, b: u8 },
    /// Switch the LED mode
    Mode { mode: LedMode },
    /// Post a full configuration read from a JSON file
    Apply { file: PathBuf },
    /// Reboot the clock
    Reboot,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Logging
// ═══════════════════════════════════════════════════════════════════════════════

fn init_logging(level: Option<&str>, to_file: bool) -> Result<()> {
    let filter = match level {
        Some(l) => EnvFilter::try_new(l).with_context(|| format!("invalid log filter '{l}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // The TUI owns the terminal, so the page logs to a file
    if to_file {
        let path = log_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let file = open_log(&path)?;
        builder.with_writer(Arc::new(file)).with_ansi(false).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

/// Each page session starts a fresh log.
fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Entrypoint
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref(), args.command.is_none())?;

    let cfg_path = args.config.clone().unwrap_or_else(config_path);
    let cfg = ClientConfig::load(&cfg_path);
    let address = args.device.clone().unwrap_or_else(|| cfg.device.clone());
    let device = HttpDevice::new(&address, cfg.request_timeout())?;
    info!(device = %device.base(), "using clock");

    match args.command {
        Some(cmd) => run_headless(&device, cmd).await,
        None => run_page(device, args.device, cfg, cfg_path).await,
    }
}

async fn run_page(
    device: HttpDevice,
    explicit: Option<String>,
    cfg: ClientConfig,
    cfg_path: PathBuf,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let label = device.base().to_string();
    let page = PageController::new(
        Arc::new(device),
        timezone_options(&cfg.timezones),
        cfg.timing(),
        tx,
    );
    let mut app = App::new(page, label);

    // An explicitly given clock becomes the default once it answers
    if let Some(addr) = explicit
        && addr != cfg.device
    {
        let remembered = ClientConfig {
            device: addr,
            ..cfg
        };
        app.remember_device(remembered, cfg_path);
    }

    let terminal = ratatui::init();
    let result = app.run(terminal, rx).await;
    ratatui::restore();
    result
}

/// One device call, printed to stdout. Failures propagate to a non-zero exit.
async fn run_headless<D: DeviceApi>(device: &D, cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::Show => {
            let record = device.fetch_config().await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Cmd::Color { r, g, b } => {
            let rgb = Rgb::new(r, g, b);
            device.push_color(rgb).await?;
            println!("nixie-settings: color → {rgb}");
        }
        Cmd::Mode { mode } => {
            device.push_mode(mode).await?;
            println!("nixie-settings: LED mode → {mode}");
        }
        Cmd::Apply { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let record: ConfigRecord = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            device.save_config(&record).await?;
            println!("nixie-settings: settings saved from {}", file.display());
        }
        Cmd::Reboot => {
            let reply = device.reboot().await?;
            println!("nixie-settings: {}", reply.trim());
        }
    }
    Ok(())
}
