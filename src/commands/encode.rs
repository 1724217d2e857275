//! Encode command - hide a message or file in a chess game.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use chesshide::{encode_with_config, EncoderConfig, Ledger};

use super::{authorization, load_config, unix_now, CommandExecutor};

/// Encode a message or file into a PGN game.
///
/// The payload is read from --message, --file, or stdin (in that order).
/// The PGN is written to --output or printed to stdout.
#[derive(Args, Debug)]
pub struct EncodeCommand {
    /// Text message to encode (mutually exclusive with --file)
    #[arg(short, long, conflicts_with = "file")]
    pub message: Option<String>,

    /// Binary file to encode (mutually exclusive with --message)
    #[arg(short, long, conflicts_with = "message")]
    pub file: Option<PathBuf>,

    /// Passphrase that shuffles the move order (decoder needs the same one)
    #[arg(short, long)]
    pub passphrase: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra PGN header, e.g. --header "White=Kasparov, Garry" (repeatable)
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,

    /// Message expiration time
    /// Relative: "+30m" (30 minutes), "+24h" (24 hours), "+7d" (7 days), "+1w" (1 week)
    /// Absolute: "2025-12-31" or "2025-12-31T23:59:59"
    /// After expiration, decode refuses the game
    #[arg(long)]
    pub expires: Option<String>,

    /// Number of filler plies appended after the payload
    #[arg(long)]
    pub filler: Option<usize>,

    /// Ledger file to register the game in (created if missing)
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Output PGN file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Wallet identifier attached to log lines
    #[arg(long)]
    pub wallet: Option<String>,

    /// Verbose output (per-ply debug logging and a capacity report)
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommandExecutor for EncodeCommand {
    fn execute(&self) -> Result<()> {
        let payload = self.read_payload()?;

        let mut stego = load_config(self.config.as_deref())?;
        for header in &self.headers {
            let (key, value) = parse_header(header)?;
            stego.headers.insert(key, value);
        }
        if let Some(filler) = self.filler {
            stego.filler_plies = filler;
        }

        let expires_at = match &self.expires {
            Some(exp_str) => {
                let ts = parse_expiration(exp_str).with_context(|| {
                    format!(
                        "Invalid expiration format: '{}'. Use '+30m', '+24h', '+7d', or '2025-12-31'",
                        exp_str
                    )
                })?;
                if self.verbose {
                    let remaining = ts.saturating_sub(unix_now());
                    eprintln!(
                        "Game expires in {}h {}m (timestamp: {})",
                        remaining / 3600,
                        (remaining % 3600) / 60,
                        ts
                    );
                }
                Some(ts)
            }
            None => None,
        };

        let config = EncoderConfig { stego, expires_at };
        let auth = authorization(self.wallet.as_deref());
        let mut encoded = encode_with_config(&payload, self.passphrase.as_deref(), &auth, &config)
            .context("Encoding failed")?;

        if let Some(path) = &self.ledger {
            let now = unix_now();
            let mut ledger = Ledger::open(path, now)
                .with_context(|| format!("Failed to open ledger {}", path.display()))?;
            let index = ledger.register_game(&mut encoded.transcript, config.expires_at, now);
            encoded.pgn = encoded.transcript.to_pgn();
            ledger
                .save(path)
                .with_context(|| format!("Failed to write ledger {}", path.display()))?;
            eprintln!("Registered as block {} in {}", index, path.display());
        }

        if self.verbose {
            let report = &encoded.report;
            eprintln!("Payload: {} bytes ({} framed bits)", payload.len(), report.frame_bits);
            eprintln!(
                "Plies: {} total, {} informative, {} forced, {} filler",
                report.plies, report.informative_plies, report.forced_plies, report.filler_plies
            );
            eprintln!("Capacity used: {:.1} bits", report.bits_carried);
            eprintln!("Attempt: {}", report.attempt + 1);
        }

        match &self.output {
            Some(path) => {
                fs::write(path, &encoded.pgn)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("Game written to {}", path.display());
            }
            None => print!("{}", encoded.pgn),
        }
        Ok(())
    }
}

impl EncodeCommand {
    fn read_payload(&self) -> Result<Vec<u8>> {
        if let Some(message) = &self.message {
            return Ok(message.as_bytes().to_vec());
        }
        if let Some(path) = &self.file {
            return fs::read(path).with_context(|| format!("Failed to read {}", path.display()));
        }
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read payload from stdin")?;
        Ok(buffer)
    }
}

/// Splits `KEY=VALUE`.
fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid header '{}': expected KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        bail!("Invalid header name '{}'", key);
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parses an expiration string into a Unix timestamp.
///
/// Supported formats:
/// - Relative: "+30m" (30 minutes), "+24h" (24 hours), "+7d" (7 days), "+1w" (1 week)
/// - Absolute: "2025-12-31" or "2025-12-31T23:59:59"
///
/// Returns None if parsing fails.
fn parse_expiration(expires: &str) -> Option<u64> {
    let expires = expires.trim();

    if let Some(relative) = expires.strip_prefix('+') {
        let suffix = relative.chars().last()?;
        let value: u64 = relative[..relative.len() - suffix.len_utf8()].parse().ok()?;

        let unit: u64 = match suffix {
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            _ => return None,
        };

        return value.checked_mul(unit)?.checked_add(unix_now());
    }

    let (date, time) = match expires.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (expires, None),
    };

    let date_parts: Vec<u32> = date.split('-').filter_map(|s| s.parse().ok()).collect();
    let &[year, month, day] = date_parts.as_slice() else {
        return None;
    };
    if year < 1970 || !(1..=12).contains(&month) || day == 0 || day > 31 {
        return None;
    }

    let (hour, minute, second) = match time {
        Some(time) => {
            let time_parts: Vec<u32> = time.split(':').filter_map(|s| s.parse().ok()).collect();
            if time_parts.len() < 2 {
                return None;
            }
            (time_parts[0], time_parts[1], time_parts.get(2).copied().unwrap_or(0))
        }
        None => (23, 59, 59),
    };

    let mut days: u64 = 0;
    for y in 1970..year {
        days += if is_leap_year(y) { 366 } else { 365 };
    }

    let month_days = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    for m in 1..month {
        days += month_days[(m - 1) as usize];
        if m == 2 && is_leap_year(year) {
            days += 1;
        }
    }
    days += (day - 1) as u64;

    Some(days * 86400 + hour as u64 * 3600 + minute as u64 * 60 + second as u64)
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
