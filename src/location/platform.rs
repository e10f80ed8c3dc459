//! Platform location source: cached fix from the host OS location service.
//!
//! The OS framework binding sits behind [`PlatformFixProvider`]. One provider
//! variant exists per supported platform and is selected once at startup;
//! hosts without a binding get a source that always yields `None`. The source
//! never blocks waiting for a fix, it only reports whatever the platform has
//! cached.

use super::reading::{Reading, SourceKind};
use super::resolver::LocationSource;

/// Last-known fix as reported by a platform location framework.
///
/// Course and speed use the platform's negative-sentinel convention:
/// a value below zero means "not available".
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformFix {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f64,
    pub altitude: f64,
    pub course: f64,
    pub speed: f64,
}

/// Binding to a platform location framework.
pub trait PlatformFixProvider {
    /// Begin a location session. Called once, lazily, on first acquire.
    fn start_updates(&mut self);

    /// The framework's cached last-known fix, if it has one yet.
    fn last_fix(&mut self) -> Option<PlatformFix>;
}

pub struct PlatformLocationSource {
    provider: Option<Box<dyn PlatformFixProvider>>,
    started: bool,
}

impl PlatformLocationSource {
    /// Select the provider variant for the current host.
    ///
    /// No binding ships for Linux; the macOS CoreLocation and Windows
    /// Location Services slots plug in here when their bindings are present.
    pub fn detect() -> Self {
        log_debug!("Platform location services not available on this host");
        Self {
            provider: None,
            started: false,
        }
    }

    /// Build the source around an explicit provider binding.
    pub fn with_provider(provider: Box<dyn PlatformFixProvider>) -> Self {
        Self {
            provider: Some(provider),
            started: false,
        }
    }
}

impl LocationSource for PlatformLocationSource {
    fn kind(&self) -> SourceKind {
        SourceKind::PlatformLocation
    }

    fn acquire(&mut self) -> Option<Reading> {
        let provider = self.provider.as_mut()?;

        if !self.started {
            provider.start_updates();
            self.started = true;
        }

        let Some(fix) = provider.last_fix() else {
            log_debug!("Platform location services could not find a location");
            return None;
        };

        let heading = (fix.course >= 0.0).then_some(fix.course);
        let speed = (fix.speed >= 0.0).then_some(fix.speed);

        Some(
            Reading::checked(fix.latitude, fix.longitude)?
                .with_accuracy(Some(fix.horizontal_accuracy))
                .with_altitude(Some(fix.altitude))
                .with_heading(heading)
                .with_speed(speed),
        )
    }
}
