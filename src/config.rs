//! Resolved runtime configuration
//!
//! Bundles the CLI-resolved paths, bind address, and TLS material into a
//! single struct, mirroring `a3s-power`'s `PowerConfig` (a plain struct
//! built once at startup, no hot reload).

use crate::cli::{Cli, LogLevel};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub configfile: PathBuf,
    pub subscriptions_file: PathBuf,
    pub logfile: Option<PathBuf>,
    pub loglevel: LogLevel,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
}

impl BridgeConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            port: cli.port,
            configfile: cli.resolve_configfile(),
            subscriptions_file: cli.resolve_subscriptions_file(),
            logfile: cli.logfile.clone(),
            loglevel: cli.loglevel,
            tls_cert: cli.tls_cert.clone(),
            tls_key: cli.tls_key.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
