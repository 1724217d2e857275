//! Payload encoding into a chess game.
//!
//! This module orchestrates the encoding process:
//! 1. Check authorization and payload size
//! 2. Frame the payload (length, message, optional integrity tag)
//! 3. At each ply, turn the next mixed-radix digit into a move through the
//!    keystream permutation of the canonical legal move order
//! 4. If the game ends before the frame is written, retry with the next
//!    attempt's move order
//! 5. Append filler plies
//! 6. Fill in PGN headers and render the transcript

use tracing::{debug, info};

use crate::chess::Outcome;
use crate::codec::SymbolEncoder;
use crate::config::StegoConfig;
use crate::driver::{Authorization, EncodingContext, Phase, Termination};
use crate::error::StegoError;
use crate::keystream::{integrity_tag, FillerSelector};
use crate::transcript::{Transcript, EXPIRY_HEADER, ROUND_HEADER};

/// Configuration for the encoder.
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    pub stego: StegoConfig,
    /// Self-destruct time written to the `ExpiryTime` header (Unix seconds).
    pub expires_at: Option<u64>,
}

/// Statistics about one encode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeReport {
    /// Plies played, filler included.
    pub plies: usize,
    /// Plies that carried a digit.
    pub informative_plies: usize,
    /// Plies with a single legal move.
    pub forced_plies: usize,
    pub filler_plies: usize,
    /// Bits framed: length prefix, message and tag.
    pub frame_bits: usize,
    /// Information capacity of the informative plies, `sum(log2(radix))`.
    pub bits_carried: f64,
    /// Zero-based attempt whose game was kept.
    pub attempt: u32,
}

/// Result of encoding a payload.
#[derive(Debug, Clone)]
pub struct EncodedGame {
    pub transcript: Transcript,
    /// The transcript as PGN text; this is what gets transmitted.
    pub pgn: String,
    pub report: EncodeReport,
}

/// Encodes `payload` with the default configuration.
pub fn encode(
    payload: &[u8],
    passphrase: Option<&str>,
    authorization: &Authorization,
) -> Result<EncodedGame, StegoError> {
    encode_with_config(payload, passphrase, authorization, &EncoderConfig::default())
}

/// Encodes `payload` with custom configuration.
pub fn encode_with_config(
    payload: &[u8],
    passphrase: Option<&str>,
    authorization: &Authorization,
    config: &EncoderConfig,
) -> Result<EncodedGame, StegoError> {
    authorization.require()?;
    let stego = &config.stego;
    stego.validate()?;

    if payload.len() > stego.max_payload_len {
        return Err(StegoError::InsufficientCapacity(format!(
            "payload of {} bytes exceeds maximum of {}",
            payload.len(),
            stego.max_payload_len
        )));
    }

    let start = stego.start_position()?;
    let last_attempt = stego.max_attempts - 1;
    let mut attempt = 0;
    let (ctx, report) = loop {
        let mut ctx =
            EncodingContext::for_attempt(start.clone(), passphrase, attempt, authorization);
        ctx.transition(Phase::Encoding);

        match encode_plies(&mut ctx, payload, passphrase, stego) {
            Ok(mut report) => {
                report.attempt = attempt;
                break (ctx, report);
            }
            Err(StegoError::InsufficientCapacity(reason)) if attempt < last_attempt => {
                debug!(attempt, %reason, "game ended early, retrying");
                attempt += 1;
            }
            Err(err) => return Err(ctx.fail(err)),
        }
    };

    finish(ctx, report, payload.len(), config, authorization)
}

fn finish(
    mut ctx: EncodingContext,
    report: EncodeReport,
    payload_len: usize,
    config: &EncoderConfig,
    authorization: &Authorization,
) -> Result<EncodedGame, StegoError> {
    let outcome = ctx.outcome();
    write_headers(ctx.transcript_mut(), outcome, report.attempt, config);
    ctx.transition(Phase::Terminated(Termination::Success));

    info!(
        wallet = authorization.wallet.as_deref().unwrap_or("-"),
        bytes = payload_len,
        plies = report.plies,
        forced = report.forced_plies,
        attempt = report.attempt,
        "encoded payload"
    );

    let transcript = ctx.into_transcript();
    let pgn = transcript.to_pgn();
    Ok(EncodedGame {
        transcript,
        pgn,
        report,
    })
}

fn encode_plies(
    ctx: &mut EncodingContext,
    payload: &[u8],
    passphrase: Option<&str>,
    config: &StegoConfig,
) -> Result<EncodeReport, StegoError> {
    let tag = config
        .integrity_tag
        .then(|| integrity_tag(passphrase, payload));
    let mut symbols = SymbolEncoder::new(payload, tag);

    let mut report = EncodeReport {
        frame_bits: SymbolEncoder::frame_bits(payload.len(), tag.is_some()),
        ..Default::default()
    };

    while !symbols.is_done() {
        if ctx.ply_count() >= config.ply_budget {
            return Err(StegoError::InsufficientCapacity(format!(
                "ply budget of {} exhausted with {} digits emitted",
                config.ply_budget,
                symbols.digits_emitted()
            )));
        }
        if let Some(outcome) = ctx.outcome() {
            return Err(StegoError::InsufficientCapacity(format!(
                "game ended by {} after {} plies",
                outcome,
                ctx.ply_count()
            )));
        }

        let set = ctx.legal_moves()?;
        let radix = set.count();
        let Some(digit) = symbols.next_digit(radix) else {
            break;
        };
        let step = ctx.play_rank(&set, digit)?;

        if step.is_forced() {
            report.forced_plies += 1;
        } else {
            report.informative_plies += 1;
            report.bits_carried += (radix as f64).log2();
        }
    }

    let mut filler = FillerSelector::new(passphrase);
    for _ in 0..config.filler_plies {
        if ctx.outcome().is_some() {
            break;
        }
        let set = ctx.legal_moves()?;
        let pick = filler.pick(set.count());
        ctx.play_rank(&set, pick)?;
        report.filler_plies += 1;
    }

    report.plies = ctx.ply_count();
    Ok(report)
}

fn write_headers(
    transcript: &mut Transcript,
    outcome: Option<Outcome>,
    attempt: u32,
    config: &EncoderConfig,
) {
    for (key, value) in &config.stego.headers {
        transcript.set_header(key, value);
    }

    // Round always carries the attempt, over any configured value.
    transcript.set_header(ROUND_HEADER, &(attempt + 1).to_string());

    let result = outcome.map(|o| o.result_token()).unwrap_or("*");
    transcript.set_header("Result", result);

    if let Some(expires_at) = config.expires_at {
        transcript.set_header(EXPIRY_HEADER, &expires_at.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_simple() {
        let encoded = encode(b"hi", None, &Authorization::granted()).unwrap();
        assert!(!encoded.transcript.is_empty());
        assert!(encoded.pgn.contains("1. "));
        assert_eq!(encoded.report.frame_bits, 48);
        assert!(encoded.report.bits_carried > 47.99);
        assert_eq!(encoded.report.plies, encoded.transcript.len());
    }

    #[test]
    fn test_encode_not_authorized() {
        let result = encode(b"hi", None, &Authorization::denied());
        assert!(matches!(result, Err(StegoError::NotAuthorized(_))));
    }

    #[test]
    fn test_encode_deterministic() {
        let a = encode(b"same", Some("pw"), &Authorization::granted()).unwrap();
        let b = encode(b"same", Some("pw"), &Authorization::granted()).unwrap();
        assert_eq!(a.pgn, b.pgn);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let config = EncoderConfig {
            stego: StegoConfig {
                max_payload_len: 4,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = encode_with_config(b"12345", None, &Authorization::granted(), &config);
        assert!(matches!(result, Err(StegoError::InsufficientCapacity(_))));
    }

    #[test]
    fn test_encode_ply_budget() {
        let config = EncoderConfig {
            stego: StegoConfig {
                ply_budget: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = encode_with_config(b"hello", None, &Authorization::granted(), &config);
        assert!(matches!(result, Err(StegoError::InsufficientCapacity(_))));
    }

    #[test]
    fn test_encode_from_terminal_position() {
        let config = EncoderConfig {
            stego: StegoConfig {
                start_fen: Some("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = encode_with_config(b"x", None, &Authorization::granted(), &config);
        assert!(matches!(result, Err(StegoError::InsufficientCapacity(_))));
    }

    #[test]
    fn test_retry_after_repetition() {
        // Zero digits pick the lowest-ranked move each ply, and the first
        // move order walks a knight back and forth into a threefold draw.
        let payload = [0u8; 10];
        let single = EncoderConfig {
            stego: StegoConfig {
                max_attempts: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        match encode_with_config(&payload, None, &Authorization::granted(), &single) {
            Err(StegoError::InsufficientCapacity(reason)) => {
                assert!(reason.contains("threefold repetition"), "{}", reason)
            }
            other => panic!("expected InsufficientCapacity, got {:?}", other),
        }

        let encoded = encode(&payload, None, &Authorization::granted()).unwrap();
        assert!(encoded.report.attempt >= 1);
        let round = (encoded.report.attempt + 1).to_string();
        assert_eq!(encoded.transcript.header(ROUND_HEADER), Some(round.as_str()));
    }

    #[test]
    fn test_round_header_overrides_config() {
        let mut stego = StegoConfig::default();
        stego.headers.insert("Round".to_string(), "7".to_string());
        let config = EncoderConfig {
            stego,
            ..Default::default()
        };
        let encoded = encode_with_config(b"x", None, &Authorization::granted(), &config).unwrap();
        assert_eq!(encoded.report.attempt, 0);
        assert!(encoded.pgn.contains("[Round \"1\"]"));
    }

    #[test]
    fn test_headers_written() {
        let mut stego = StegoConfig {
            filler_plies: 2,
            ..Default::default()
        };
        stego.headers.insert("Event".to_string(), "Casual Game".to_string());
        let config = EncoderConfig {
            stego,
            expires_at: Some(4_102_444_800),
        };
        let encoded = encode_with_config(b"x", None, &Authorization::granted(), &config).unwrap();
        assert_eq!(encoded.transcript.header("Event"), Some("Casual Game"));
        assert_eq!(encoded.transcript.header(EXPIRY_HEADER), Some("4102444800"));
        assert!(encoded.pgn.contains("[ExpiryTime \"4102444800\"]"));
        assert_eq!(encoded.report.filler_plies, 2);
    }
}
