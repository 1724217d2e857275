//! Payload decoding from a chess game.
//!
//! This module orchestrates the decoding process:
//! 1. Check authorization and the self-destruct header
//! 2. Replay the transcript from its start position, under the keystream
//!    of the attempt named by the `Round` header
//! 3. Recover each ply's rank through the inverse keystream permutation
//! 4. Rebuild the frame and verify the optional integrity tag
//!
//! Plies after the last frame field are filler and are ignored.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::codec::{CodecError, SymbolDecoder};
use crate::config::StegoConfig;
use crate::driver::{Authorization, EncodingContext, Phase, Termination};
use crate::error::StegoError;
use crate::keystream::integrity_tag;
use crate::transcript::{Transcript, EXPIRY_HEADER, ROUND_HEADER};

/// Configuration for the decoder.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    pub stego: StegoConfig,
    /// Clock override for expiry checks (Unix seconds); system time if unset.
    pub now: Option<u64>,
}

/// Result of decoding a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub message: Vec<u8>,
    /// Plies read up to the end of the frame.
    pub plies_used: usize,
    /// Plies after the frame.
    pub trailing_plies: usize,
}

impl DecodedPayload {
    /// The message as text, replacing invalid UTF-8.
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

/// Decodes a PGN document with the default configuration.
pub fn decode(
    pgn: &str,
    passphrase: Option<&str>,
    authorization: &Authorization,
) -> Result<DecodedPayload, StegoError> {
    decode_with_config(pgn, passphrase, authorization, &DecoderConfig::default())
}

/// Decodes a PGN document with custom configuration.
pub fn decode_with_config(
    pgn: &str,
    passphrase: Option<&str>,
    authorization: &Authorization,
    config: &DecoderConfig,
) -> Result<DecodedPayload, StegoError> {
    authorization.require()?;
    let transcript = Transcript::from_pgn(pgn)?;
    decode_transcript(&transcript, passphrase, authorization, config)
}

/// Decodes an already parsed transcript.
pub fn decode_transcript(
    transcript: &Transcript,
    passphrase: Option<&str>,
    authorization: &Authorization,
    config: &DecoderConfig,
) -> Result<DecodedPayload, StegoError> {
    authorization.require()?;
    check_expiry(transcript, config.now)?;
    let stego = &config.stego;
    stego.validate()?;

    let attempt = attempt_of(transcript);
    let mut ctx = EncodingContext::for_attempt(
        transcript.start().clone(),
        passphrase,
        attempt,
        authorization,
    );
    ctx.transition(Phase::Decoding);

    let payload = match decode_plies(&mut ctx, transcript, passphrase, stego) {
        Ok(payload) => payload,
        Err(err) => return Err(ctx.fail(err)),
    };
    ctx.transition(Phase::Terminated(Termination::Success));

    info!(
        wallet = authorization.wallet.as_deref().unwrap_or("-"),
        bytes = payload.message.len(),
        plies = payload.plies_used,
        trailing = payload.trailing_plies,
        "decoded payload"
    );
    Ok(payload)
}

fn decode_plies(
    ctx: &mut EncodingContext,
    transcript: &Transcript,
    passphrase: Option<&str>,
    config: &StegoConfig,
) -> Result<DecodedPayload, StegoError> {
    let keyed = passphrase.is_some_and(|p| !p.is_empty());
    let mut symbols = SymbolDecoder::new(config.max_payload_len, config.integrity_tag);

    for ply in transcript.plies() {
        if symbols.is_done() {
            break;
        }
        let step = ctx
            .observe(&ply.mv)
            .map_err(|e| StegoError::CorruptTranscript(e.to_string()))?;
        symbols
            .push(step.rank, step.radix)
            .map_err(|e| framing_error(e, keyed))?;
    }

    let plies_used = ctx.ply_count();
    let frame = symbols.finish().map_err(|e| framing_error(e, keyed))?;

    if config.integrity_tag {
        let expected = integrity_tag(passphrase, &frame.message);
        if frame.tag != Some(expected) {
            let reason = "integrity tag mismatch".to_string();
            return Err(if keyed {
                StegoError::WrongPassphrase(reason)
            } else {
                StegoError::CorruptTranscript(reason)
            });
        }
    }

    debug!(plies_used, total = transcript.len(), "frame complete");
    Ok(DecodedPayload {
        message: frame.message,
        plies_used,
        trailing_plies: transcript.len() - plies_used,
    })
}

/// Encoding attempt named by the `Round` header; the first attempt when
/// the header is missing or not a positive integer.
fn attempt_of(transcript: &Transcript) -> u32 {
    transcript
        .header(ROUND_HEADER)
        .and_then(|round| round.trim().parse::<u32>().ok())
        .and_then(|round| round.checked_sub(1))
        .unwrap_or(0)
}

/// Framing failures point at the passphrase when one was supplied.
fn framing_error(err: CodecError, keyed: bool) -> StegoError {
    if keyed {
        StegoError::WrongPassphrase(format!("{} (or the transcript is corrupt)", err))
    } else {
        StegoError::from(err)
    }
}

fn check_expiry(transcript: &Transcript, now: Option<u64>) -> Result<(), StegoError> {
    let Some(raw) = transcript.header(EXPIRY_HEADER) else {
        return Ok(());
    };
    let expires_at: u64 = raw.trim().parse().map_err(|_| {
        StegoError::CorruptTranscript(format!("invalid {} header '{}'", EXPIRY_HEADER, raw))
    })?;
    let now = now.unwrap_or_else(unix_now);
    if now > expires_at {
        return Err(StegoError::Expired(format!(
            "expired at {}, now {}",
            expires_at, now
        )));
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Position;
    use crate::encoder::{encode, encode_with_config, EncoderConfig};

    #[test]
    fn test_decode_roundtrip() {
        let auth = Authorization::granted();
        let encoded = encode(b"attack at dawn", Some("pw"), &auth).unwrap();
        let decoded = decode(&encoded.pgn, Some("pw"), &auth).unwrap();
        assert_eq!(decoded.message, b"attack at dawn");
        assert_eq!(decoded.as_text(), "attack at dawn");
        assert_eq!(decoded.trailing_plies, 0);
    }

    #[test]
    fn test_decode_not_authorized() {
        let encoded = encode(b"x", None, &Authorization::granted()).unwrap();
        let result = decode(&encoded.pgn, None, &Authorization::denied());
        assert!(matches!(result, Err(StegoError::NotAuthorized(_))));
    }

    #[test]
    fn test_decode_expired() {
        let auth = Authorization::granted();
        let config = EncoderConfig {
            expires_at: Some(1_000),
            ..Default::default()
        };
        let encoded = encode_with_config(b"x", None, &auth, &config).unwrap();

        let before = DecoderConfig {
            now: Some(999),
            ..Default::default()
        };
        assert!(decode_with_config(&encoded.pgn, None, &auth, &before).is_ok());

        let after = DecoderConfig {
            now: Some(1_001),
            ..Default::default()
        };
        assert!(matches!(
            decode_with_config(&encoded.pgn, None, &auth, &after),
            Err(StegoError::Expired(_))
        ));
    }

    #[test]
    fn test_round_header_selects_attempt() {
        let mut transcript = Transcript::new(Position::starting());
        assert_eq!(attempt_of(&transcript), 0);
        for (round, attempt) in [("1", 0), ("3", 2), (" 12 ", 11), ("?", 0), ("0", 0), ("2.1", 0)] {
            transcript.set_header(ROUND_HEADER, round);
            assert_eq!(attempt_of(&transcript), attempt, "round {:?}", round);
        }
    }

    #[test]
    fn test_decode_truncated() {
        let auth = Authorization::granted();
        let result = decode("[Event \"?\"]\n\n1. e4 e5 *\n", None, &auth);
        assert!(matches!(result, Err(StegoError::CorruptTranscript(_))));
    }

    #[test]
    fn test_decode_ignores_filler() {
        let auth = Authorization::granted();
        let config = EncoderConfig {
            stego: StegoConfig {
                filler_plies: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        let encoded = encode_with_config(b"pad", None, &auth, &config).unwrap();
        let decoded = decode(&encoded.pgn, None, &auth).unwrap();
        assert_eq!(decoded.message, b"pad");
        assert_eq!(decoded.trailing_plies, encoded.report.filler_plies);
    }

    #[test]
    fn test_integrity_tag_wrong_passphrase() {
        let auth = Authorization::granted();
        let stego = StegoConfig {
            integrity_tag: true,
            ..Default::default()
        };
        let enc_config = EncoderConfig {
            stego: stego.clone(),
            ..Default::default()
        };
        let dec_config = DecoderConfig {
            stego,
            ..Default::default()
        };
        let encoded = encode_with_config(b"tagged", Some("right"), &auth, &enc_config).unwrap();

        let ok = decode_with_config(&encoded.pgn, Some("right"), &auth, &dec_config).unwrap();
        assert_eq!(ok.message, b"tagged");

        let wrong = decode_with_config(&encoded.pgn, Some("wrong"), &auth, &dec_config);
        assert!(matches!(wrong, Err(StegoError::WrongPassphrase(_))));
    }
}
