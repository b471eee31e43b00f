//! Multitag positioning runner
//!
//! Runs the positioning loop against the simulated transport and writes
//! telemetry as JSON lines on stdout. Logs go to stderr.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use multitag_positioning::hardware::{SimulatedTransport, SimulationConfig};
use multitag_positioning::utils::{AppConfig, ModeConfig};
use multitag_positioning::{CancellationToken, DeviceId, JsonLinesSink, PositioningScheduler};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Publish,
    Latency,
}

impl From<CliMode> for ModeConfig {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Publish => ModeConfig::Publish,
            CliMode::Latency => ModeConfig::Latency,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "multitag-positioning", version, about = "Poll UWB tags for positions")]
struct Cli {
    /// JSON configuration file; built-in defaults when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,

    /// Stop after this many polling cycles
    #[arg(short = 'n', long)]
    cycles: Option<u64>,

    /// Override the configured run mode
    #[arg(long, value_enum)]
    mode: Option<CliMode>,

    /// Simulator seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Simulated tag that never answers (hex id or "local"), repeatable
    #[arg(long, value_parser = parse_device_id)]
    unreachable: Vec<DeviceId>,

    /// Simulated tag whose fixes always fail (hex id or "local"), repeatable
    #[arg(long, value_parser = parse_device_id)]
    failing: Vec<DeviceId>,

    /// Probability that any simulated fix fails
    #[arg(long, default_value_t = 0.0)]
    failure_probability: f64,
}

fn parse_device_id(value: &str) -> Result<DeviceId, String> {
    if value.eq_ignore_ascii_case("local") {
        return Ok(DeviceId::Local);
    }
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16)
        .map(DeviceId::Remote)
        .map_err(|e| format!("invalid device id '{}': {}", value, e))
}

/// Ctrl-C stops the loop after the request in flight instead of killing it
fn install_interrupt_handler(cancel: &CancellationToken) -> anyhow::Result<()> {
    let handle = cancel.clone();
    ctrlc::set_handler(move || {
        if handle.is_cancelled() {
            std::process::exit(130);
        }
        handle.cancel();
    })
    .context("installing Ctrl-C handler")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.write_default_config {
        AppConfig::default()
            .save_to_file(path)
            .with_context(|| format!("writing default config to {}", path.display()))?;
        info!(path = %path.display(), "default configuration written");
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };

    if cli.config.is_none() || cli.mode.is_some() {
        if let Some(mode) = cli.mode {
            config.mode = mode.into();
        }
        let validation = config.validate();
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error.into());
        }
    }

    if !(0.0..=1.0).contains(&cli.failure_probability) {
        bail!("failure probability must be between 0 and 1");
    }

    let simulation = SimulationConfig {
        seed: cli.seed,
        failure_probability: cli.failure_probability,
        unreachable: cli.unreachable.iter().copied().collect::<HashSet<_>>(),
        failing: cli.failing.iter().copied().collect::<HashSet<_>>(),
        ..SimulationConfig::default()
    };

    info!(
        tags = config.tags.len(),
        anchors = config.anchors.len(),
        mode = ?config.mode,
        "starting multitag positioning"
    );

    let mut scheduler = PositioningScheduler::new(
        config.scheduler_settings(),
        SimulatedTransport::new(simulation),
        config.error_decoder(),
        JsonLinesSink::stdout(),
    );

    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel)?;
    let totals = match cli.cycles {
        Some(cycles) => scheduler.run_cycles(cycles, &cancel),
        None => scheduler.run_forever(&cancel),
    };

    if totals.cycles > 0 && totals.fixes == 0 {
        warn!("no tag produced a fix");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_id() {
        assert_eq!(parse_device_id("0x1000"), Ok(DeviceId::Remote(0x1000)));
        assert_eq!(parse_device_id("6a2f"), Ok(DeviceId::Remote(0x6a2f)));
        assert_eq!(parse_device_id("LOCAL"), Ok(DeviceId::Local));
        assert!(parse_device_id("0x10000").is_err());
    }

    #[test]
    fn test_interrupt_handler_installs_once() {
        let cancel = CancellationToken::new();
        assert!(install_interrupt_handler(&cancel).is_ok());
        assert!(!cancel.is_cancelled());
        assert!(install_interrupt_handler(&cancel).is_err());
    }

    #[test]
    fn test_cli_parses_repeated_devices() {
        let cli = Cli::parse_from([
            "multitag-positioning",
            "--cycles",
            "5",
            "--unreachable",
            "0x1002",
            "--failing",
            "0x1001",
            "--failing",
            "local",
            "--mode",
            "latency",
        ]);
        assert_eq!(cli.cycles, Some(5));
        assert_eq!(cli.unreachable, vec![DeviceId::Remote(0x1002)]);
        assert_eq!(cli.failing, vec![DeviceId::Remote(0x1001), DeviceId::Local]);
        assert!(matches!(cli.mode, Some(CliMode::Latency)));
    }
}
