//! CLI argument definitions for the Carelink client.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Carelink - a conversational client for a remote care assistant.
#[derive(Parser, Debug)]
#[command(name = "carelink", version, about)]
pub struct CliArgs {
    /// Identity to open the session as.
    #[arg(short = 'u', long = "user")]
    pub user: String,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the assistant server.
    #[arg(short = 's', long = "server")]
    pub server: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CARELINK_CONFIG env var > ~/.carelink/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CARELINK_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the assistant server base URL.
    ///
    /// Priority: --server flag > CARELINK_SERVER env var > config file value.
    pub fn resolve_server(&self, config_url: &str) -> String {
        if let Some(ref url) = self.server {
            return url.clone();
        }
        if let Ok(url) = std::env::var("CARELINK_SERVER") {
            return url;
        }
        config_url.to_string()
    }

}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".carelink").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".carelink").join("config.toml");
    }
    PathBuf::from("config.toml")
}
