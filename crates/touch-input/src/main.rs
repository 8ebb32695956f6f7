//! touch-input — entry point.
//!
//! Opens one Linux input device, decodes its record stream into pointer and
//! multi-touch events, and prints each event as one JSON object per line on
//! stdout.  Diagnostics go to stderr through `tracing`.
//!
//! # Usage
//!
//! ```text
//! touch-input [OPTIONS]
//!
//! Options:
//!   -d, --device <NAME>     Node (event3) or device name
//!   -c, --config <PATH>     Config file [default: ~/.config/touch-input/config.toml]
//!       --mode <MODE>       pointer | touch
//!       --layout <LAYOUT>   compact | wide | native
//!       --class <CLASS>     Force pointer | multitouch
//!       --slots <N>         Force the slot count
//!       --log-level <LVL>   error | warn | info | debug | trace
//!       --list              List input devices and exit
//!       --write-config      Save the merged settings to the config file and exit
//! ```
//!
//! CLI flags override the config file; `RUST_LOG` overrides the log level.
//!
//! # Threads (for beginners)
//!
//! The dispatch loop blocks inside `epoll_wait`, so it runs on its own named
//! OS thread ("touch-session") instead of inside the async runtime.  The
//! runtime only waits for either the session result or Ctrl+C.  On Ctrl+C the
//! shutdown flag is raised and the process exits, which releases the device.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use touch_core::{RecordLayout, TouchEvent};
use touch_input::application::session::{DeviceSession, DispatchMode, SessionOptions};
use touch_input::infrastructure::driver::evdev::{list_devices, EvdevConfig, EvdevDriver};
use touch_input::infrastructure::driver::DeviceClass;
use touch_input::infrastructure::storage::config::{
    default_config_path, load_config, save_config, TouchConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Decode a Linux input device into pointer and multi-touch events.
#[derive(Debug, Parser)]
#[command(
    name = "touch-input",
    about = "Decode evdev pointer and multi-touch input into JSON events",
    version
)]
struct Cli {
    /// Device node (`event3`) or device name to open.
    #[arg(short, long, env = "TOUCH_INPUT_DEVICE")]
    device: Option<String>,

    /// Path to the TOML config file.
    #[arg(short, long, env = "TOUCH_INPUT_CONFIG")]
    config: Option<PathBuf>,

    /// Dispatch mode: `pointer` or `touch`.
    #[arg(long)]
    mode: Option<DispatchMode>,

    /// Record layout: `compact` (16 bytes), `wide` (24 bytes) or `native`.
    #[arg(long)]
    layout: Option<RecordLayout>,

    /// Force the device class instead of probing it.
    #[arg(long)]
    class: Option<DeviceClass>,

    /// Force the multi-touch slot count instead of probing it.
    #[arg(long)]
    slots: Option<usize>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "TOUCH_INPUT_LOG")]
    log_level: Option<String>,

    /// List input devices and exit.
    #[arg(long)]
    list: bool,

    /// Save the config file with the given flags applied, then exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Applies the flags that were given on top of `config`.
    fn apply_to(&self, config: &mut TouchConfig) {
        if let Some(device) = &self.device {
            config.device.name = device.clone();
        }
        if let Some(mode) = self.mode {
            config.device.mode = mode;
        }
        if let Some(layout) = self.layout {
            config.device.layout = Some(layout);
        }
        if let Some(class) = self.class {
            config.device.class = Some(class);
        }
        if let Some(slots) = self.slots {
            config.device.slots = Some(slots);
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// The `--config` path, else the platform default if one exists.
fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(|| default_config_path().ok())
}

fn load(cli: &Cli) -> anyhow::Result<TouchConfig> {
    // No home directory and no --config: run on defaults.
    let Some(path) = config_path(cli) else {
        return Ok(TouchConfig::default());
    };
    load_config(&path).with_context(|| format!("failed to load config from {}", path.display()))
}

/// Saves `config` to the resolved config path and returns that path.
fn write_config(cli: &Cli, config: &TouchConfig) -> anyhow::Result<PathBuf> {
    let path = config_path(cli)
        .context("no config path: pass --config or set HOME / XDG_CONFIG_HOME")?;
    save_config(&path, config)
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    Ok(path)
}

fn print_event(event: &TouchEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("failed to serialize event: {e}"),
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load(&cli)?;
    cli.apply_to(&mut config);

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if cli.write_config {
        let path = write_config(&cli, &config)?;
        info!("wrote config to {}", path.display());
        return Ok(());
    }

    if cli.list {
        for entry in list_devices().context("failed to enumerate input devices")? {
            println!("{}\t{}", entry.node, entry.name);
        }
        return Ok(());
    }

    // ── Open device ───────────────────────────────────────────────────────────
    let driver = EvdevDriver::open(&EvdevConfig {
        name: config.device.name.clone(),
        class: config.device.class,
        slots: config.device.slots,
    })
    .with_context(|| format!("failed to open input device '{}'", config.device.name))?;

    let options = SessionOptions {
        layout: config.device.record_layout(),
    };
    let session = DeviceSession::open(driver, options).context("failed to start session")?;
    let shutdown = session.shutdown_handle();
    let mode = config.device.mode;

    info!(device = session.name(), ?mode, "touch-input starting");

    // ── Session thread ────────────────────────────────────────────────────────
    let (result_tx, result_rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("touch-session".to_string())
        .spawn(move || {
            let result = session.run(mode, |_, event| print_event(&event));
            // The receiver is gone only if main already returned.
            let _ = result_tx.send(result);
        })
        .context("failed to spawn session thread")?;

    tokio::select! {
        result = result_rx => {
            let stats = result
                .context("session thread exited without a result")?
                .context("dispatch loop failed")?;
            info!(
                records = stats.records,
                events = stats.events,
                rejected = stats.rejected,
                "touch-input stopped"
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("received Ctrl+C, shutting down");
            shutdown.request();
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_without_flags_leaves_config_untouched() {
        // Arrange
        let cli = Cli::parse_from(["touch-input"]);
        let mut config = TouchConfig::default();

        // Act
        cli.apply_to(&mut config);

        // Assert
        assert_eq!(config, TouchConfig::default());
        assert!(!cli.list);
    }

    #[test]
    fn test_cli_flags_override_config() {
        // Arrange
        let cli = Cli::parse_from([
            "touch-input",
            "--device",
            "event7",
            "--mode",
            "pointer",
            "--layout",
            "compact",
            "--class",
            "multitouch",
            "--slots",
            "5",
            "--log-level",
            "trace",
        ]);
        let mut config = TouchConfig::default();

        // Act
        cli.apply_to(&mut config);

        // Assert
        assert_eq!(config.device.name, "event7");
        assert_eq!(config.device.mode, DispatchMode::Pointer);
        assert_eq!(config.device.layout, Some(RecordLayout::Compact));
        assert_eq!(config.device.class, Some(DeviceClass::Multitouch));
        assert_eq!(config.device.slots, Some(5));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let result = Cli::try_parse_from(["touch-input", "--mode", "gesture"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_uses_explicit_config_path() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device]\nname = \"event9\"\n").expect("write");
        let cli = Cli::parse_from(["touch-input", "--config", path.to_str().expect("utf-8")]);

        // Act
        let config = load(&cli).expect("load");

        // Assert
        assert_eq!(config.device.name, "event9");
    }

    #[test]
    fn test_write_config_saves_merged_settings() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("touch-input").join("config.toml");
        let cli = Cli::parse_from([
            "touch-input",
            "--config",
            path.to_str().expect("utf-8"),
            "--device",
            "event4",
            "--layout",
            "wide",
            "--write-config",
        ]);
        let mut config = load(&cli).expect("load defaults");
        cli.apply_to(&mut config);

        // Act
        let written = write_config(&cli, &config).expect("write");

        // Assert
        assert!(cli.write_config);
        assert_eq!(written, path);
        let reloaded = load(&cli).expect("reload");
        assert_eq!(reloaded.device.name, "event4");
        assert_eq!(reloaded.device.layout, Some(RecordLayout::Wide));
    }
}
