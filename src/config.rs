//! Configuration resolution
//!
//! Every setting resolves once at startup, in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file (~/.config/caseload/config.toml)
//! 4. Compiled default
//!
//! The resolved values (including the auth toggle) are injected into
//! `AppState`; nothing re-reads the environment per request.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 5850;

#[derive(Debug, Parser)]
#[command(name = "caseload", about = "Therapy caseload service")]
pub struct Cli {
    /// Directory holding the SQLite database
    #[arg(long, env = "CASELOAD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "CASELOAD_PORT")]
    pub port: Option<u16>,

    /// Disable the authentication guard (development only)
    #[arg(long)]
    pub auth_disabled: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an admin user account
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

/// Optional config file contents
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    port: Option<u16>,
    auth_disabled: Option<bool>,
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub auth_disabled: bool,
}

impl ServerConfig {
    pub fn resolve(cli: &Cli) -> Self {
        let file = load_config_file();

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| file.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);

        // CLI flag wins; AUTH_DISABLED env accepts the usual truthy spellings
        let auth_disabled = cli.auth_disabled
            || env_flag("AUTH_DISABLED").unwrap_or_else(|| file.auth_disabled.unwrap_or(false));

        ServerConfig {
            data_dir,
            port,
            auth_disabled,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("caseload.db")
    }
}

/// Parse a boolean-like environment variable (1/true/yes/on)
fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn load_config_file() -> FileConfig {
    let Some(path) = dirs::config_dir().map(|d| d.join("caseload").join("config.toml")) else {
        return FileConfig::default();
    };
    if !path.exists() {
        return FileConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                FileConfig::default()
            }
        },
        Err(e) => {
            warn!("Could not read config file {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("caseload"))
        .unwrap_or_else(|| PathBuf::from("./caseload_data"))
}
