//! Command module - Strategy pattern for CLI commands.
//!
//! Each command is a separate module implementing the `CommandExecutor` trait.

mod decode;
mod encode;
mod moves;

pub use decode::DecodeCommand;
pub use encode::EncodeCommand;
pub use moves::MovesCommand;

use std::path::Path;

use anyhow::{Context, Result};

use chesshide::{Authorization, StegoConfig};

/// Trait for command execution - Strategy pattern.
///
/// Each command struct holds its parsed arguments and implements
/// this trait to define its execution logic.
pub trait CommandExecutor {
    /// Executes the command with its parsed arguments.
    fn execute(&self) -> Result<()>;
}

/// Loads the codec configuration, or the defaults when no path is given.
fn load_config(path: Option<&Path>) -> Result<StegoConfig> {
    match path {
        Some(path) => StegoConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(StegoConfig::default()),
    }
}

/// The CLI user is always authorized; the wallet only labels log lines.
fn authorization(wallet: Option<&str>) -> Authorization {
    match wallet {
        Some(wallet) => Authorization::for_wallet(wallet),
        None => Authorization::granted(),
    }
}

/// Current Unix time in seconds.
fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
