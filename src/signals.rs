//! Signal handling for the polling loop.
//!
//! A dedicated listener thread converts process signals into shared atomic
//! flags: termination signals clear the `running` flag (which the GPS wait
//! loop and the main loop both poll), while SIGUSR1/SIGUSR2 toggle the
//! `online` flag that gates the network-backed lookup sources.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

/// Flags shared between the signal listener and the resolving thread.
#[derive(Clone)]
pub struct SignalState {
    /// Cleared when the process should shut down.
    pub running: Arc<AtomicBool>,
    /// Cleared when network lookups should be suppressed (offline mode).
    pub online: Arc<AtomicBool>,
}

impl SignalState {
    pub fn new(online: bool) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Install the signal listener thread and return the shared flags.
///
/// SIGTERM, SIGINT and SIGHUP request shutdown. SIGUSR1 switches to offline
/// mode, SIGUSR2 back to online, so a session manager can park the network
/// sources without stopping the process.
pub fn setup_signal_handler(online: bool) -> Result<SignalState> {
    let state = SignalState::new(online);
    let thread_state = state.clone();

    let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP, SIGUSR1, SIGUSR2])
        .context("Failed to install signal handlers")?;

    thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGTERM | SIGINT | SIGHUP => {
                    thread_state.running.store(false, Ordering::SeqCst);
                    break;
                }
                SIGUSR1 => {
                    log_pipe!();
                    log_info!("Going offline, network lookups suspended");
                    thread_state.online.store(false, Ordering::SeqCst);
                }
                SIGUSR2 => {
                    log_pipe!();
                    log_info!("Back online, network lookups resumed");
                    thread_state.online.store(true, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    });

    Ok(state)
}
