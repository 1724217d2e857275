//! Integration tests for Chesshide
//!
//! Features:
//! - Round trips with and without passphrase
//! - Forced plies (a single legal move) carry no data
//! - Tampering the length field is detected; tampering the message field
//!   is detected exactly when the value leaves its field width
//! - Capacity limits, retried attempts, authorization and expiry

use chesshide::chess::{apply_move, generate_legal, Position};
use chesshide::config::DEFAULT_MAX_PAYLOAD_LEN;
use chesshide::{
    decode, decode_transcript, decode_with_config, encode, encode_with_config, Authorization,
    DecoderConfig, EncoderConfig, LegalMoveSet, StegoConfig, StegoError, Transcript,
};

fn auth() -> Authorization {
    Authorization::granted()
}

/// Test basic encode/decode roundtrip
#[test]
fn test_encode_decode_roundtrip() {
    let message = b"The eagle lands at midnight";

    let encoded = encode(message, None, &auth()).unwrap();
    let decoded = decode(&encoded.pgn, None, &auth()).unwrap();

    assert_eq!(decoded.message, message);
    assert_eq!(decoded.plies_used, encoded.transcript.len());
}

/// Test roundtrip with a passphrase-shuffled move order
#[test]
fn test_roundtrip_with_passphrase() {
    let message = b"shuffled ranks";

    let encoded = encode(message, Some("correct horse"), &auth()).unwrap();
    let decoded = decode(&encoded.pgn, Some("correct horse"), &auth()).unwrap();

    assert_eq!(decoded.message, message);
}

/// Test binary payloads, including zero and 0xFF bytes
#[test]
fn test_binary_payload_roundtrip() {
    let data: Vec<u8> = vec![0x00, 0xFF, 0x00, 0x10, 0x80, 0x7F, 0xFF, 0xFF, 0x00];

    let encoded = encode(&data, Some("bin"), &auth()).unwrap();
    let decoded = decode(&encoded.pgn, Some("bin"), &auth()).unwrap();

    assert_eq!(decoded.message, data);
}

/// Test empty payload: only the length field is written
#[test]
fn test_empty_payload() {
    let encoded = encode(b"", None, &auth()).unwrap();
    assert!(!encoded.transcript.is_empty());
    assert_eq!(encoded.report.frame_bits, 32);

    let decoded = decode(&encoded.pgn, None, &auth()).unwrap();
    assert!(decoded.message.is_empty());
}

/// Test that the same payload gives different games under different passphrases
#[test]
fn test_passphrase_changes_game() {
    let message = b"same message";

    let a = encode(message, Some("alpha"), &auth()).unwrap();
    let b = encode(message, Some("beta"), &auth()).unwrap();
    let plain = encode(message, None, &auth()).unwrap();

    assert_ne!(a.pgn, b.pgn);
    assert_ne!(a.pgn, plain.pgn);
}

/// Test that a wrong passphrase fails or decodes to something else
#[test]
fn test_wrong_passphrase() {
    let message = b"for your eyes only";
    let encoded = encode(message, Some("right"), &auth()).unwrap();

    match decode(&encoded.pgn, Some("wrong"), &auth()) {
        Ok(decoded) => assert_ne!(decoded.message, message),
        Err(err) => assert!(matches!(err, StegoError::WrongPassphrase(_))),
    }

    match decode(&encoded.pgn, None, &auth()) {
        Ok(decoded) => assert_ne!(decoded.message, message),
        Err(err) => assert!(matches!(err, StegoError::CorruptTranscript(_))),
    }
}

/// Test the concrete single-byte scenario is reproducible move for move
#[test]
fn test_single_byte_scenario() {
    let first = encode(&[0x41], None, &auth()).unwrap();
    let second = encode(&[0x41], None, &auth()).unwrap();
    assert_eq!(first.pgn, second.pgn);

    // Length digit 1 of radix 20 picks the second canonical move (b1c3);
    // the following zero digits pick the first canonical move.
    assert!(first.pgn.contains("1. Nc3 a5 2. Rb1"), "{}", first.pgn);

    let decoded = decode(&first.pgn, None, &auth()).unwrap();
    assert_eq!(decoded.message, vec![0x41]);
}

/// Test that forced plies are played but carry nothing
#[test]
fn test_forced_ply_roundtrip() {
    // White is in check from the a1 rook and can only play Kh2.
    let fen = "k7/7R/8/8/PPPP4/4n3/8/r6K w - - 0 1";
    let start = Position::from_fen(fen).unwrap();
    assert_eq!(generate_legal(&start).len(), 1);

    let config = EncoderConfig {
        stego: StegoConfig {
            start_fen: Some(fen.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let encoded = encode_with_config(b"forced", None, &auth(), &config).unwrap();

    assert_eq!(encoded.transcript.plies()[0].mv.uci(), "h1h2");
    assert!(encoded.report.forced_plies >= 1);
    assert!(encoded.pgn.contains("[FEN \"k7/7R/8/8/PPPP4/4n3/8/r6K w - - 0 1\"]"));

    let decoded = decode(&encoded.pgn, None, &auth()).unwrap();
    assert_eq!(decoded.message, b"forced");
}

/// Rebuilds `transcript` up to `index`, then plays the move of canonical
/// rank `rank` at that ply.
fn with_ply_replaced(transcript: &Transcript, index: usize, rank: usize) -> Transcript {
    let plies = transcript.plies();
    let mut tampered = Transcript::new(transcript.start().clone());
    for ply in &plies[..index] {
        tampered.push(&ply.mv).unwrap();
    }
    let set = LegalMoveSet::of(&plies[index].position).unwrap();
    tampered.push(&set.move_at(rank).unwrap()).unwrap();
    tampered
}

/// Index of the ply that completes the 32-bit length field.
fn length_field_end(transcript: &Transcript) -> usize {
    let mut reach: u128 = 1;
    for (i, ply) in transcript.plies().iter().enumerate() {
        let radix = LegalMoveSet::of(&ply.position).unwrap().count() as u128;
        if radix > 1 {
            reach *= radix;
            if reach >= 1 << 32 {
                return i;
            }
        }
    }
    panic!("length field never completes");
}

fn canonical_rank(transcript: &Transcript, index: usize) -> usize {
    let ply = &transcript.plies()[index];
    LegalMoveSet::of(&ply.position).unwrap().rank_of(&ply.mv).unwrap()
}

fn decode_plain(transcript: &Transcript) -> Result<Vec<u8>, StegoError> {
    decode_transcript(transcript, None, &auth(), &DecoderConfig::default()).map(|d| d.message)
}

/// Test that tampering the top digit of the length field is always detected
#[test]
fn test_length_field_tamper_is_corrupt() {
    let encoded = encode(b"tamper me", None, &auth()).unwrap();
    assert_eq!(encoded.report.attempt, 0);
    let transcript = &encoded.transcript;

    // A 9-byte length fits the first digit, so the top digit is zero and
    // any other move scales the declared length by the whole place value.
    let end = length_field_end(transcript);
    assert!(end > 0);
    assert_eq!(canonical_rank(transcript, end), 0);

    match decode_plain(&with_ply_replaced(transcript, end, 1)) {
        Err(StegoError::CorruptTranscript(reason)) => {
            assert!(reason.contains("exceeds maximum"), "{}", reason)
        }
        other => panic!("expected CorruptTranscript, got {:?}", other),
    }

    let count = LegalMoveSet::of(&transcript.plies()[end].position).unwrap().count();
    match decode_plain(&with_ply_replaced(transcript, end, count - 1)) {
        Err(StegoError::CorruptTranscript(reason)) => {
            assert!(reason.contains("overflowed"), "{}", reason)
        }
        other => panic!("expected CorruptTranscript, got {:?}", other),
    }
}

/// Test the exact split between a silently different payload and a
/// detected overflow when the last message digit is changed
#[test]
fn test_message_field_tamper_condition() {
    // All-ones value: lowering the top digit stays in range, raising it
    // always exceeds 2^48 - 1.
    let message = [0xFFu8; 6];
    let encoded = encode(&message, None, &auth()).unwrap();
    assert_eq!(encoded.report.attempt, 0);
    let transcript = &encoded.transcript;
    let last = transcript.len() - 1;
    let top = canonical_rank(transcript, last);
    let count = LegalMoveSet::of(&transcript.plies()[last].position).unwrap().count();
    assert!(top > 0 && top + 1 < count);

    for rank in 0..top {
        let decoded = decode_plain(&with_ply_replaced(transcript, last, rank)).unwrap();
        assert_eq!(decoded.len(), message.len());
        assert_ne!(decoded, message);
    }
    assert_eq!(decode_plain(&with_ply_replaced(transcript, last, top)).unwrap(), message);
    for rank in top + 1..count {
        match decode_plain(&with_ply_replaced(transcript, last, rank)) {
            Err(StegoError::CorruptTranscript(reason)) => {
                assert!(reason.contains("overflowed"), "{}", reason)
            }
            other => panic!("rank {}: expected CorruptTranscript, got {:?}", rank, other),
        }
    }
}

/// Test that a truncated game cannot be decoded
#[test]
fn test_truncated_game() {
    let encoded = encode(b"cut short", None, &auth()).unwrap();
    let plies = encoded.transcript.plies();

    let mut truncated = Transcript::new(encoded.transcript.start().clone());
    for ply in &plies[..plies.len() / 2] {
        truncated.push(&ply.mv).unwrap();
    }

    let result = decode_transcript(&truncated, None, &auth(), &DecoderConfig::default());
    assert!(matches!(result, Err(StegoError::CorruptTranscript(_))));
}

/// Test the exact capacity boundary of the default configuration
#[test]
fn test_default_capacity_boundary() {
    let max = StegoConfig::default().max_payload_len;
    assert_eq!(max, DEFAULT_MAX_PAYLOAD_LEN);

    let fits = vec![0x5Au8; max];
    let encoded = encode(&fits, None, &auth()).unwrap();
    let decoded = decode(&encoded.pgn, None, &auth()).unwrap();
    assert_eq!(decoded.message, fits);

    let keyed = encode(&fits, Some("boundary"), &auth()).unwrap();
    let decoded = decode(&keyed.pgn, Some("boundary"), &auth()).unwrap();
    assert_eq!(decoded.message, fits);

    let too_big = vec![0x5Au8; max + 1];
    let result = encode(&too_big, None, &auth());
    assert!(matches!(result, Err(StegoError::InsufficientCapacity(_))));
}

/// Test the capacity boundary of a custom limit
#[test]
fn test_capacity_boundary() {
    let config = EncoderConfig {
        stego: StegoConfig {
            max_payload_len: 16,
            ..Default::default()
        },
        ..Default::default()
    };

    let fits = [0x5Au8; 16];
    let encoded = encode_with_config(&fits, None, &auth(), &config).unwrap();
    let dec_config = DecoderConfig {
        stego: config.stego.clone(),
        ..Default::default()
    };
    let decoded = decode_with_config(&encoded.pgn, None, &auth(), &dec_config).unwrap();
    assert_eq!(decoded.message, fits);

    let too_big = [0x5Au8; 17];
    let result = encode_with_config(&too_big, None, &auth(), &config);
    assert!(matches!(result, Err(StegoError::InsufficientCapacity(_))));
}

/// Test that a game cut short by a draw is retried under a new move order
#[test]
fn test_early_draw_is_retried() {
    let payload = [0u8; 10];
    let encoded = encode(&payload, None, &auth()).unwrap();
    assert!(encoded.report.attempt > 0);

    let decoded = decode(&encoded.pgn, None, &auth()).unwrap();
    assert_eq!(decoded.message, payload);

    // Without the Round header the decoder assumes the first attempt.
    let mut stripped = Transcript::new(encoded.transcript.start().clone());
    for mv in encoded.transcript.moves() {
        stripped.push(mv).unwrap();
    }
    assert_ne!(decode_plain(&stripped).ok(), Some(payload.to_vec()));
}

/// Test that a decoder with a smaller limit rejects the declared length
#[test]
fn test_declared_length_over_limit() {
    let encoded = encode(&[7u8; 40], None, &auth()).unwrap();
    let config = DecoderConfig {
        stego: StegoConfig {
            max_payload_len: 8,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = decode_with_config(&encoded.pgn, None, &auth(), &config);
    assert!(matches!(result, Err(StegoError::CorruptTranscript(_))));
}

/// Test authorization is required in both directions
#[test]
fn test_not_authorized() {
    let denied = Authorization::denied();
    assert!(matches!(
        encode(b"x", None, &denied),
        Err(StegoError::NotAuthorized(_))
    ));

    let encoded = encode(b"x", None, &Authorization::for_wallet("0xfeed")).unwrap();
    assert!(matches!(
        decode(&encoded.pgn, None, &denied),
        Err(StegoError::NotAuthorized(_))
    ));
}

/// Test the self-destruct header
#[test]
fn test_expired_game() {
    let config = EncoderConfig {
        expires_at: Some(1_700_000_000),
        ..Default::default()
    };
    let encoded = encode_with_config(b"old news", None, &auth(), &config).unwrap();

    let later = DecoderConfig {
        now: Some(1_700_000_001),
        ..Default::default()
    };
    assert!(matches!(
        decode_with_config(&encoded.pgn, None, &auth(), &later),
        Err(StegoError::Expired(_))
    ));
}

/// Test filler plies and custom headers survive a PGN round trip
#[test]
fn test_filler_and_headers() {
    let mut stego = StegoConfig {
        filler_plies: 6,
        integrity_tag: true,
        ..Default::default()
    };
    stego.headers.insert("Event".to_string(), "Spring Open".to_string());
    stego.headers.insert("White".to_string(), "Morphy, Paul".to_string());

    let config = EncoderConfig {
        stego: stego.clone(),
        ..Default::default()
    };
    let encoded = encode_with_config(b"with filler", Some("pw"), &auth(), &config).unwrap();

    let reparsed = Transcript::from_pgn(&encoded.pgn).unwrap();
    assert_eq!(reparsed.header("Event"), Some("Spring Open"));
    assert_eq!(reparsed.header("White"), Some("Morphy, Paul"));
    assert_eq!(reparsed.len(), encoded.transcript.len());

    let dec_config = DecoderConfig {
        stego,
        ..Default::default()
    };
    let decoded = decode_with_config(&encoded.pgn, Some("pw"), &auth(), &dec_config).unwrap();
    assert_eq!(decoded.message, b"with filler");
    assert_eq!(decoded.trailing_plies, encoded.report.filler_plies);
}

/// Test that a game played from the standard start replays as legal chess
#[test]
fn test_transcript_is_legal_game() {
    let encoded = encode(b"legal", Some("k"), &auth()).unwrap();
    let mut position = encoded.transcript.start().clone();
    for ply in encoded.transcript.plies() {
        assert_eq!(ply.position, position);
        position = apply_move(&position, &ply.mv).unwrap();
    }
    assert_eq!(&position, encoded.transcript.final_position());
}

/// Test that legal move order is stable across calls
#[test]
fn test_legal_move_order_deterministic() {
    let position = Position::starting();
    let first = LegalMoveSet::of(&position).unwrap();
    for _ in 0..1000 {
        assert_eq!(LegalMoveSet::of(&position).unwrap(), first);
    }
}

/// Test decoding a hand-written PGN with annotations
#[test]
fn test_decode_annotated_pgn() {
    let encoded = encode(b"notes", None, &auth()).unwrap();
    let mut annotated = String::new();
    for (i, ply) in encoded.transcript.plies().iter().enumerate() {
        if i % 2 == 0 {
            annotated.push_str(&format!("{}. ", i / 2 + 1));
        }
        annotated.push_str(&ply.san);
        annotated.push_str(" {comment} $1 ");
    }
    annotated.push('*');

    let decoded = decode(&annotated, None, &auth()).unwrap();
    assert_eq!(decoded.message, b"notes");
}

/// Test that a registered game decodes and is checked against its block
#[test]
fn test_ledger_registered_game() {
    use chesshide::{Ledger, LedgerError};

    let now = 1_767_225_600;
    let mut ledger = Ledger::new(1, now);
    let mut encoded = encode(b"on the record", None, &auth()).unwrap();
    let index = ledger.register_game(&mut encoded.transcript, Some(now + 60), now);
    let pgn = encoded.transcript.to_pgn();
    assert!(pgn.contains(&format!("[BlockchainRef \"{}\"]", index)));

    let received = Transcript::from_pgn(&pgn).unwrap();
    assert!(ledger.verify_chain().is_ok());
    assert_eq!(ledger.check_game(&received, now).unwrap(), Some(index));
    assert_eq!(decode(&pgn, None, &auth()).unwrap().message, b"on the record");

    // Swapping the final move keeps a legal game but breaks the match.
    let last = received.len() - 1;
    let swap = if canonical_rank(&received, last) == 0 { 1 } else { 0 };
    let mut tampered = with_ply_replaced(&received, last, swap);
    for (key, value) in received.headers() {
        tampered.set_header(key, value);
    }
    assert!(matches!(
        ledger.check_game(&tampered, now),
        Err(LedgerError::Tampered(i)) if i == index
    ));

    assert_eq!(ledger.process_expired(now + 61), 1);
    assert!(matches!(
        ledger.check_game(&received, now + 61),
        Err(LedgerError::Expired(_))
    ));
}
