//! Decode command - recover the payload hidden in a PGN game.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::Args;

use chesshide::{decode_with_config, DecoderConfig, Ledger, Transcript};

use super::{authorization, load_config, unix_now, CommandExecutor};

/// Decode the payload hidden in a PGN game.
///
/// Use -o/--output to write raw bytes to a file (required for binary data).
/// Without -o, output is printed as text (lossy UTF-8 conversion) or, with
/// --base64, as base64.
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// PGN file holding the game
    #[arg(short, long)]
    pub input: PathBuf,

    /// Passphrase used when encoding
    #[arg(short, long)]
    pub passphrase: Option<String>,

    /// TOML configuration file (must match the encoder's format settings)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ledger file to check the game against before decoding
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Output file for decoded data (required for binary data)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the payload as base64 instead of text
    #[arg(long, conflicts_with = "output")]
    pub base64: bool,

    /// Wallet identifier attached to log lines
    #[arg(long)]
    pub wallet: Option<String>,

    /// Verbose output (per-ply debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommandExecutor for DecodeCommand {
    fn execute(&self) -> Result<()> {
        let pgn = fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;

        if let Some(path) = &self.ledger {
            self.check_ledger(path, &pgn)?;
        }

        let config = DecoderConfig {
            stego: load_config(self.config.as_deref())?,
            now: None,
        };
        let auth = authorization(self.wallet.as_deref());
        let decoded = decode_with_config(&pgn, self.passphrase.as_deref(), &auth, &config)
            .context("Decoding failed")?;

        if self.verbose {
            eprintln!(
                "Decoded {} bytes from {} plies ({} trailing)",
                decoded.message.len(),
                decoded.plies_used,
                decoded.trailing_plies
            );
        }

        if let Some(path) = &self.output {
            fs::write(path, &decoded.message)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Decoded {} bytes to {}", decoded.message.len(), path.display());
        } else if self.base64 {
            println!("{}", BASE64.encode(&decoded.message));
        } else {
            println!("{}", decoded.as_text());
        }
        Ok(())
    }
}

impl DecodeCommand {
    /// Settles due expiries, verifies the chain and checks the game
    /// against its registered block.
    fn check_ledger(&self, path: &Path, pgn: &str) -> Result<()> {
        let now = unix_now();
        let mut ledger = Ledger::load(path)
            .with_context(|| format!("Failed to load ledger {}", path.display()))?;
        if ledger.process_expired(now) > 0 {
            ledger
                .save(path)
                .with_context(|| format!("Failed to write ledger {}", path.display()))?;
        }
        ledger.verify_chain().context("Ledger integrity check failed")?;

        let transcript = Transcript::from_pgn(pgn).context("Failed to parse PGN")?;
        match ledger.check_game(&transcript, now).context("Ledger check failed")? {
            Some(index) if self.verbose => eprintln!("Game matches ledger block {}", index),
            Some(_) => {}
            None => eprintln!("Warning: game carries no ledger reference"),
        }
        Ok(())
    }
}
