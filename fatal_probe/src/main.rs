//! # Fatal Probe
//!
//! Exercises the fatal error handler registry end to end:
//!
//! 1. loads `[shared]` / `[fatal_error]` settings (defaults when no file),
//! 2. initialises the process-wide registry and installs the crash trap,
//! 3. registers a few subsystem handlers,
//! 4. either previews the crash report on stdout (`--crash none`) or kills
//!    itself with `SIGABRT` / `SIGSEGV` so the trap writes the real report
//!    to stderr.

mod subsystems;

use clap::{Parser, ValueEnum};
use fatal::config::{ConfigError, ConfigLoader, LogLevel};
use fatal::fatal::ProbeConfig;
use fatal_handler::{
    FatalErrorHandler, FdSink, StaticTextHandler, global, register_fatal_error_handler,
    remove_fatal_error_handler, trap,
};
use nix::sys::signal::{self, Signal};
use std::path::{Path, PathBuf};
use std::process;
use subsystems::RequestCounter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// How the probe ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CrashMode {
    /// Print the crash report to stdout and exit normally.
    None,
    /// Call `abort()`.
    Abort,
    /// Raise `SIGSEGV`.
    Segv,
}

/// Fatal Probe: crash diagnostics demonstrator
#[derive(Parser, Debug)]
#[command(name = "fatal_probe")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Registers subsystem crash handlers and dumps or crashes on demand")]
struct Args {
    /// Path to the probe configuration TOML. Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of simulated requests before the probe ends.
    #[arg(long, default_value_t = 3)]
    requests: u64,

    /// How to end the run.
    #[arg(long, value_enum, default_value_t = CrashMode::None)]
    crash: CrashMode,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Fatal Probe v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Fatal Probe shutdown complete");
}

fn load_config(path: Option<&Path>) -> Result<ProbeConfig, ConfigError> {
    let config = match path {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: &ProbeConfig) -> Result<(), Box<dyn std::error::Error>> {
    global::init(&config.fatal_error);

    if config.fatal_error.install_signal_trap {
        trap::install(&config.fatal_error.signals)?;
    } else {
        warn!("crash trap disabled by configuration");
    }

    let startup = StaticTextHandler::new_static("startup", "startup: in progress\n");
    let identity = subsystems::identity(&config.shared, process::id());
    let summary = subsystems::config_summary(&config.fatal_error);
    let requests = RequestCounter::new();

    // SAFETY: each handler is removed below before it goes out of scope;
    // the crash modes terminate the process while they are still alive.
    unsafe {
        register_fatal_error_handler(&startup);
        register_fatal_error_handler(&identity);
        register_fatal_error_handler(&summary);
        register_fatal_error_handler(&requests);
    }
    remove_fatal_error_handler(&startup);
    info!(service = %config.shared.service_name, "startup complete");

    for _ in 0..args.requests {
        let served = requests.record();
        debug!(served, "request handled");
    }

    match args.crash {
        CrashMode::None => trap::write_report(&mut FdSink::stdout(), "dry run"),
        CrashMode::Abort => {
            warn!("aborting on request");
            process::abort();
        }
        CrashMode::Segv => {
            warn!("raising SIGSEGV on request");
            signal::raise(Signal::SIGSEGV)?;
        }
    }

    let handlers: [&dyn FatalErrorHandler; 3] = [&identity, &summary, &requests];
    for handler in handlers {
        remove_fatal_error_handler(handler);
    }

    if trap::is_installed() {
        trap::uninstall()?;
    }
    Ok(())
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
