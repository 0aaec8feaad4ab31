//! Command-line interface
//!
//! Mirrors the teacher's `a3s-power` CLI shape (`clap` derive, one flat
//! `Cli` struct) rather than its subcommand shape, since spec §6 defines
//! only flags, not verbs.

use clap::Parser;
use std::path::PathBuf;

/// LTI / bus bridge — authenticated HTTPS-to-bus publish and durable
/// webhook subscriptions.
#[derive(Debug, Parser)]
#[command(name = "lti-bus-bridge", version, about)]
pub struct Cli {
    /// Path to the credential configuration file (JSON with `//`/`/* */` comments)
    #[arg(long, value_name = "PATH")]
    pub configfile: Option<PathBuf>,

    /// Path to the durable subscription state file
    #[arg(long, value_name = "PATH")]
    pub subscriptions_file: Option<PathBuf>,

    /// Path to a log file; if unset, logs go to stderr only
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// Minimum log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8443)]
    pub port: u16,

    /// PEM-encoded TLS certificate chain
    #[arg(long, value_name = "PATH")]
    pub tls_cert: PathBuf,

    /// PEM-encoded TLS private key
    #[arg(long, value_name = "PATH")]
    pub tls_key: PathBuf,
}

/// `--loglevel {critical|error|warning|info|debug}` (spec §6).
///
/// `tracing` has no `CRITICAL` level, so `critical` maps onto `ERROR` —
/// recorded as an Open Question resolution in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl Cli {
    /// Default credential config path: `$HOME/.ssh/ltibridge.cnf` (spec §6).
    pub fn resolve_configfile(&self) -> PathBuf {
        self.configfile.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".ssh")
                .join("ltibridge.cnf")
        })
    }

    /// Default subscription file: `<installdir>/subscriptions/lti_bus_subscriptions.json` (spec §6).
    pub fn resolve_subscriptions_file(&self) -> PathBuf {
        self.subscriptions_file.clone().unwrap_or_else(|| {
            PathBuf::from("subscriptions").join("lti_bus_subscriptions.json")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loglevel_maps_critical_to_error_directive() {
        assert_eq!(LogLevel::Critical.as_filter_directive(), "error");
        assert_eq!(LogLevel::Debug.as_filter_directive(), "debug");
    }

    #[test]
    fn resolve_configfile_respects_explicit_path() {
        let cli = Cli {
            configfile: Some(PathBuf::from("/tmp/custom.cnf")),
            subscriptions_file: None,
            logfile: None,
            loglevel: LogLevel::Info,
            host: "0.0.0.0".into(),
            port: 8443,
            tls_cert: PathBuf::from("cert.pem"),
            tls_key: PathBuf::from("key.pem"),
        };
        assert_eq!(cli.resolve_configfile(), PathBuf::from("/tmp/custom.cnf"));
    }

    #[test]
    fn resolve_subscriptions_file_has_a_default() {
        let cli = Cli {
            configfile: None,
            subscriptions_file: None,
            logfile: None,
            loglevel: LogLevel::Info,
            host: "0.0.0.0".into(),
            port: 8443,
            tls_cert: PathBuf::from("cert.pem"),
            tls_key: PathBuf::from("key.pem"),
        };
        assert_eq!(
            cli.resolve_subscriptions_file(),
            PathBuf::from("subscriptions/lti_bus_subscriptions.json")
        );
    }
}
