//! procclock entry point.
//!
//! Validates the target and budget, calibrates the clock, installs the
//! interrupt handler and hands over to the duty-cycle scheduler.

use anyhow::{Context, Result};
use clap::Parser;
use procclock_common::budget::{validate_pid, ExecutionBudget};
use procclock_common::config::ProcclockConfig;
use procclock_common::error::ProcclockError;
use procclock_runtime::calibrator::{warn_if_imprecise, Calibrator};
use procclock_runtime::dispatcher::{ProcessControl, SignalDispatcher};
use procclock_runtime::interrupt::install_interrupt_handler;
use procclock_runtime::realtime::init_realtime;
use procclock_runtime::scheduler::{DutyCycleScheduler, RunOutcome};
use procclock_runtime::target::TargetProcess;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// procclock command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "procclock",
    about = "Throttle a process by periodically sending SIGSTOP and SIGCONT",
    version,
    long_about = None
)]
struct Args {
    /// Process ID of the target.
    #[arg(value_name = "PID", allow_negative_numbers = true)]
    pid: i64,

    /// Microseconds the target may run per cycle.
    #[arg(value_name = "US", allow_negative_numbers = true)]
    on_duration_us: i64,

    /// Cycles per second (below 500000).
    #[arg(value_name = "HZ", allow_negative_numbers = true)]
    frequency_hz: i64,

    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many ticks, leaving the target running (0 = never).
    #[arg(long, value_name = "N")]
    max_ticks: Option<u64>,

    /// Number of calibration rounds (overrides config file).
    #[arg(long, value_name = "N")]
    iterations: Option<u32>,

    /// Enable real-time scheduling for procclock itself.
    #[arg(long)]
    realtime: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(&args.log_level);

    match run(&args) {
        Ok(outcome) => {
            info!(?outcome, "procclock finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the specified log level.
///
/// All output goes to stderr; colours only on a terminal.
fn init_logging(level: &str) {
    let filter = format!("procclock={level},procclock_runtime={level},procclock_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

/// Validate, calibrate, and throttle until the target is lost or the tick limit hits.
fn run(args: &Args) -> Result<RunOutcome> {
    let config = load_config(args)?;
    config.validate()?;

    let pid = validate_pid(args.pid)?;
    let budget = ExecutionBudget::new(args.on_duration_us, args.frequency_hz)?;
    probe_target(pid)?;

    info!(
        pid,
        on_duration_us = budget.on_duration_us(),
        frequency_hz = budget.frequency_hz(),
        period_us = budget.period_us(),
        "Target validated"
    );

    init_realtime(&config.realtime).context("Failed to initialize real-time scheduling")?;

    let tick = Calibrator::from_config(&config.calibration).calibrate()?;
    warn_if_imprecise(&budget, &tick);

    // Shared with the SIGINT handler for the rest of the process lifetime
    let target: &'static TargetProcess = Box::leak(Box::new(TargetProcess::new(pid)));
    install_interrupt_handler(target)?;

    let mut scheduler =
        DutyCycleScheduler::with_defaults(target, budget, tick).with_config(&config.scheduler);
    Ok(scheduler.run())
}

/// Check that the target exists before doing anything else.
fn probe_target(pid: i32) -> Result<(), ProcclockError> {
    SignalDispatcher.probe(pid).map_err(|e| {
        if e.is_target_gone() {
            ProcclockError::Validation(format!("process ID {pid} not found"))
        } else {
            ProcclockError::Validation(e.to_string())
        }
    })
}

/// Load configuration from file or use defaults, then apply flag overrides.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `PROCCLOCK_CONFIG_PATH` environment variable
/// 3. `/etc/procclock/config.toml` (system path)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<ProcclockConfig> {
    let mut config = load_config_file(args.config.as_ref())?;

    if let Some(max_ticks) = args.max_ticks {
        config.scheduler.max_ticks = max_ticks;
    }
    if let Some(iterations) = args.iterations {
        config.calibration.iterations = iterations;
    }
    if args.realtime {
        config.realtime.enabled = true;
    }

    Ok(config)
}

fn load_config_file(cli_path: Option<&PathBuf>) -> Result<ProcclockConfig> {
    if let Some(config_path) = cli_path {
        info!(?config_path, "Loading config from command-line argument");
        return ProcclockConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("PROCCLOCK_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from PROCCLOCK_CONFIG_PATH");
            return ProcclockConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from PROCCLOCK_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "PROCCLOCK_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let system_path = PathBuf::from("/etc/procclock/config.toml");
    if system_path.exists() {
        info!(?system_path, "Loading config from system path");
        return ProcclockConfig::from_file(&system_path)
            .with_context(|| format!("Failed to load config from {system_path:?}"));
    }

    Ok(ProcclockConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["procclock", "1234", "50000", "10"]);
        assert_eq!(args.pid, 1234);
        assert_eq!(args.on_duration_us, 50_000);
        assert_eq!(args.frequency_hz, 10);
        assert!(args.config.is_none());
        assert!(!args.realtime);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_negative_values_reach_validation() {
        let args = Args::parse_from(["procclock", "1234", "-5", "10"]);
        assert_eq!(args.on_duration_us, -5);
        assert!(ExecutionBudget::new(args.on_duration_us, args.frequency_hz).is_err());
    }

    #[test]
    fn test_missing_arguments_rejected() {
        let err = Args::try_parse_from(["procclock", "1234", "100"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_flag_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[calibration]\niterations = 10\n\n[scheduler]\nmax_ticks = 5").unwrap();
        let path = file.path().to_str().unwrap();

        let args = Args::parse_from([
            "procclock",
            "1",
            "100",
            "10",
            "--config",
            path,
            "--max-ticks",
            "99",
            "--realtime",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.calibration.iterations, 10);
        assert_eq!(config.scheduler.max_ticks, 99);
        assert!(config.realtime.enabled);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["procclock", "1", "100", "10", "-c", "/nonexistent/procclock.toml"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_probe_target() {
        let own = i32::try_from(std::process::id()).unwrap();
        assert!(probe_target(own).is_ok());
        assert!(matches!(
            probe_target(i32::MAX - 1),
            Err(ProcclockError::Validation(msg)) if msg.contains("not found")
        ));
    }
}
