//! Process configuration, parsed from command-line flags.

use clap::Parser;

use crate::constants::{DEFAULT_BACKLOG, DEFAULT_BIND_ADDR, DEFAULT_CREDENTIALS_DB, DEFAULT_DOCUMENTS_DIR, DEFAULT_PORT};

/// Collaborative text editor server core.
#[derive(Debug, Clone, Parser)]
#[command(name = "scriptorium-server", version, about)]
pub struct Config {
    /// Address to bind the listening socket to.
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Accept-queue backlog hint passed to the listener.
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Directory documents are read from and written to.
    #[arg(long, default_value = DEFAULT_DOCUMENTS_DIR)]
    pub documents_dir: String,

    /// Path to the credential store database.
    #[arg(long, default_value = DEFAULT_CREDENTIALS_DB)]
    pub credentials_db: String,

    /// Increase log verbosity; repeatable (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// The `RUST_LOG` default directive implied by `-v` flags, used when
    /// the environment doesn't already set one.
    pub fn default_log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
