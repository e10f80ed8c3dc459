//! Main application entry point and high-level flow coordination.
//!
//! This module orchestrates the application lifecycle after command-line
//! argument parsing is complete:
//!
//! 1. Argument parsing and early exit for help/version
//! 2. Configuration loading and validation
//! 3. Signal handler installation (stop flag, online/offline toggle)
//! 4. Source stack construction via the resolver builder
//! 5. The polling loop: resolve, report, sleep, repeat
//! 6. Graceful cleanup on shutdown

use anyhow::Result;
use std::time::Duration;

use geolocr::args::{self, CliAction, ParsedArgs};
use geolocr::config::Config;
use geolocr::constants::EXIT_FAILURE;
use geolocr::location::Resolver;
use geolocr::signals::{SignalState, setup_signal_handler};
use geolocr::{log_block_start, log_decorated, log_end, log_indented, log_pipe, log_version};
use geolocr::{log_error_exit, log_warning};

fn main() {
    let parsed = ParsedArgs::parse(std::env::args().skip(1));
    match parsed.action {
        CliAction::ShowHelp => args::print_help(),
        CliAction::ShowVersion => args::print_version(),
        CliAction::ShowHelpDueToError => {
            args::print_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            once,
            offline,
            config_dir,
        } => {
            if let Err(e) = run(debug_enabled, once, offline, config_dir.as_deref()) {
                log_pipe!();
                log_error_exit!("{e:#}");
                std::process::exit(EXIT_FAILURE);
            }
        }
    }
}

fn run(debug_enabled: bool, once: bool, offline: bool, config_dir: Option<&str>) -> Result<()> {
    log_version!();

    let config = Config::load(config_dir)?;
    config.log_summary();
    if offline {
        log_indented!("Starting offline, network lookups suspended");
    }

    let signals = setup_signal_handler(!offline)?;
    let mut resolver = Resolver::from_config(&config, &signals)?;

    while signals.is_running() {
        if debug_enabled {
            log_block_start!("Resolving location");
        }

        match resolver.resolve() {
            Some(resolved) => {
                log_block_start!("Location: {} via {}", resolved.reading, resolved.source);
                log_indented!("Resolved at {}", resolved.timestamp.format("%H:%M:%S"));
            }
            None => {
                if once {
                    log_pipe!();
                    log_warning!("No location could be determined");
                } else if debug_enabled {
                    log_decorated!("No location this cycle");
                }
            }
        }

        if once {
            break;
        }
        sleep_while_running(&signals, Duration::from_secs(config.poll_interval()));
    }

    log_block_start!("Shutting down geolocr");
    log_end!();
    Ok(())
}

/// Sleep for the polling interval in short slices so a stop signal is
/// honored promptly.
fn sleep_while_running(signals: &SignalState, interval: Duration) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = interval;
    while signals.is_running() && remaining > Duration::ZERO {
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
}
