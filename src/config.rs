use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::loader::DEFAULT_SOURCE;
use crate::presenter::PAGE_SIZE;

/// Superstore orders dashboard with spreadsheet export.
#[derive(Parser, Debug, Clone)]
#[command(name = "dashboard", version)]
pub struct Config {
    /// CSV to load at startup: an http(s) URL or a local .csv path
    #[arg(long, env = "DASHBOARD_SOURCE", default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// Address the web server listens on
    #[arg(long, env = "DASHBOARD_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Grid rows per page
    #[arg(long, env = "DASHBOARD_PAGE_SIZE", default_value_t = PAGE_SIZE)]
    pub page_size: usize,

    /// Directory served under /static
    #[arg(long, env = "DASHBOARD_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Verbose logging unless RUST_LOG says otherwise
    #[arg(long, env = "DASHBOARD_DEBUG")]
    pub debug: bool,
}

impl Config {
    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }

    pub fn default_log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
