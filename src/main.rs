//! Chesshide - Hide bytes in chess games
//!
//! A CLI tool for chess-move steganography.
//! The payload becomes an ordinary PGN game; only the game is transmitted.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CommandExecutor, DecodeCommand, EncodeCommand, MovesCommand};

/// Chesshide - Hide bytes in chess games
///
/// Every ply of the generated game encodes one mixed-radix digit of the
/// payload. An optional passphrase shuffles the move order per ply.
#[derive(Parser)]
#[command(name = "chesshide")]
#[command(version)]
#[command(about = "Hide data in legal chess games and recover it from the PGN")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a message or file into a PGN game
    Encode(EncodeCommand),

    /// Decode the payload hidden in a PGN game
    Decode(DecodeCommand),

    /// List the legal moves of a position in encoding order
    Moves(MovesCommand),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Encode(cmd) => cmd.verbose,
            Commands::Decode(cmd) => cmd.verbose,
            Commands::Moves(_) => false,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.verbose());

    match &cli.command {
        Commands::Encode(cmd) => cmd.execute(),
        Commands::Decode(cmd) => cmd.execute(),
        Commands::Moves(cmd) => cmd.execute(),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("chesshide=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
