//! The main entry point to the application.

#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic
)]

mod brightness;
mod command;
mod commands;
mod config;
mod context;
mod device;
mod media;
mod player;
mod playlist;
mod server;
mod sink;
mod source;
mod verbosity;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, io, panic};

use clap::Parser as _;
use colored::Colorize as _;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::context::Context;
use crate::verbosity::{Verbosity, VerbosityLevel};

#[derive(Debug, clap::Parser)]
#[clap(
    about = "Play WW animations and GIFs on LED matrices and sACN fixtures",
    version
)]
struct Parser {
    #[clap(subcommand)]
    subcommand: commands::Subcommand,

    /// Path to the configuration file.
    #[clap(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[clap(flatten)]
    verbosity: Verbosity,
}

fn main() -> ExitCode {
    try_main().unwrap_or_else(|err| {
        let mut stderr = io::stderr().lock();
        _ = writeln!(stderr, "{}", "ww-player failed".bold().red());

        for cause in err.chain() {
            _ = writeln!(stderr, "  {}: {}", "Cause".bold(), cause);
        }

        ExitCode::FAILURE
    })
}

fn try_main() -> anyhow::Result<ExitCode> {
    setup_panic_hook();

    let args = Parser::parse();
    let config_path = args.config.unwrap_or_else(Config::default_path);

    // A broken config file is reported by the command that needs it, not here.
    let config = Config::from_file(&config_path).ok();
    let level = args
        .verbosity
        .level()
        .or_else(|| config.as_ref().and_then(Config::log_level))
        .unwrap_or_default();
    setup_tracing(level);

    let mut ctx = Context::new(config_path).with_level(level);
    ctx.config = config;
    args.subcommand.run(&mut ctx).map(|()| ExitCode::SUCCESS)
}

fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        original_hook(panic_info);

        let package_name = env!("CARGO_PKG_NAME");
        let operating_system = env::consts::OS;
        let architecture = env::consts::ARCH;
        let package_version = env!("CARGO_PKG_VERSION");
        let args = env::args().collect::<Vec<_>>();

        eprintln!();
        eprintln!("------------------------------------------------------------------------------");
        eprintln!("{package_name} has panicked. This is a bug. Please report it to the");
        eprintln!("maintainers along with the details below.");
        eprintln!();
        eprintln!("If you can reliably reproduce this panic, include the reproduction steps");
        eprintln!("and re-run with the RUST_BACKTRACE=1 environment variable set. Please include");
        eprintln!("the backtrace in your report.");
        eprintln!();
        eprintln!("Platform: {operating_system} {architecture}");
        eprintln!("Version: {package_version}");
        eprintln!("Args: {args:?}");
        eprintln!("------------------------------------------------------------------------------");
    }));
}

fn setup_tracing(level: VerbosityLevel) {
    use tracing_subscriber::prelude::*;

    let level_filter = level.level_filter();
    let filter = EnvFilter::new(format!(
        "ww={level_filter},{}={level_filter}",
        env!("CARGO_CRATE_NAME")
    ));

    let registry = tracing_subscriber::registry().with(filter);

    if level.is_trace() {
        let subscriber = registry.with(
            tracing_subscriber::fmt::layer()
                .event_format(tracing_subscriber::fmt::format().pretty())
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_writer(io::stderr),
        );

        subscriber.init();
    } else {
        let subscriber = registry.with(tracing_subscriber::fmt::layer().with_writer(io::stderr));

        subscriber.init();
    }
}
