//! Command-line argument parsing and processing.
//!
//! This module handles parsing of command-line arguments and provides a clean
//! interface for the main application logic. It supports the standard help,
//! version, and debug flags while gracefully handling unknown options.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the polling loop with these settings
    Run {
        debug_enabled: bool,
        /// Resolve once, print the result, exit
        once: bool,
        /// Start in offline mode (network lookups suspended)
        offline: bool,
        config_dir: Option<String>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    ///
    /// # Returns
    /// ParsedArgs containing the determined action
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut once = false;
        let mut offline = false;
        let mut config_dir: Option<String> = None;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_ref() {
                "-h" | "--help" => return ParsedArgs { action: CliAction::ShowHelp },
                "-V" | "--version" => {
                    return ParsedArgs {
                        action: CliAction::ShowVersion,
                    };
                }
                "-d" | "--debug" => debug_enabled = true,
                "--once" => once = true,
                "--offline" => offline = true,
                "-c" | "--config-dir" => match iter.next() {
                    Some(dir) => config_dir = Some(dir.as_ref().to_string()),
                    None => {
                        log_warning!("--config-dir requires a directory argument");
                        return ParsedArgs {
                            action: CliAction::ShowHelpDueToError,
                        };
                    }
                },
                unknown => {
                    log_warning!("Unknown option: {unknown}");
                    return ParsedArgs {
                        action: CliAction::ShowHelpDueToError,
                    };
                }
            }
        }

        ParsedArgs {
            action: CliAction::Run {
                debug_enabled,
                once,
                offline,
                config_dir,
            },
        }
    }
}

/// Print usage information.
pub fn print_help() {
    log_version!();
    log_block_start!("Usage: geolocr [OPTIONS]");
    log_indented!("-h, --help            Show this help message");
    log_indented!("-V, --version         Show version information");
    log_indented!("-d, --debug           Log every resolution cycle, not just fixes");
    log_indented!("    --once            Resolve a single time and exit");
    log_indented!("    --offline         Start with network lookups suspended");
    log_indented!("-c, --config-dir DIR  Read geolocr.toml from DIR");
    log_block_start!("Signals");
    log_indented!("SIGUSR1               Suspend network lookups (offline)");
    log_indented!("SIGUSR2               Resume network lookups (online)");
    log_indented!("SIGTERM/SIGINT        Shut down");
    log_end!();
}

/// Print version information.
pub fn print_version() {
    log_version!();
    log_indented!("Best-effort device geolocation via GPS, platform services, WiFi and IP lookup");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_runs_with_defaults() {
        let parsed = ParsedArgs::parse(Vec::<String>::new());
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: false,
                once: false,
                offline: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn flags_are_recognized() {
        let parsed = ParsedArgs::parse(["--debug", "--once", "--offline"]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: true,
                once: true,
                offline: true,
                config_dir: None,
            }
        );
    }

    #[test]
    fn config_dir_takes_an_argument() {
        let parsed = ParsedArgs::parse(["--config-dir", "/tmp/geolocr"]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: false,
                once: false,
                offline: false,
                config_dir: Some("/tmp/geolocr".to_string()),
            }
        );
    }

    #[test]
    fn missing_config_dir_argument_is_an_error() {
        let parsed = ParsedArgs::parse(["--config-dir"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn unknown_option_shows_help() {
        let parsed = ParsedArgs::parse(["--frobnicate"]);
        assert_eq!(parsed.action, CliAction::ShowHelpDueToError);
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(ParsedArgs::parse(["-h"]).action, CliAction::ShowHelp);
        assert_eq!(ParsedArgs::parse(["--version"]).action, CliAction::ShowVersion);
    }
}
