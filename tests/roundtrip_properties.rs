//! Property-based round-trip tests.
//!
//! ## Test Categories
//! 1. **Round trip**: any payload up to the default limit encodes and
//!    decodes bit-exactly
//! 2. **Passphrase binding**: the game depends on the passphrase
//! 3. **Codec**: mixed-radix framing over arbitrary radix schedules

use chesshide::codec::{SymbolDecoder, SymbolEncoder};
use chesshide::config::DEFAULT_MAX_PAYLOAD_LEN;
use chesshide::{decode, encode, Authorization};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_roundtrip_without_passphrase(
        payload in prop::collection::vec(any::<u8>(), 0..=DEFAULT_MAX_PAYLOAD_LEN),
    ) {
        let auth = Authorization::granted();
        let encoded = encode(&payload, None, &auth).unwrap();

        let decoded = decode(&encoded.pgn, None, &auth).unwrap();
        prop_assert_eq!(decoded.message, payload);
    }

    #[test]
    fn prop_roundtrip_with_passphrase(
        payload in prop::collection::vec(any::<u8>(), 0..=DEFAULT_MAX_PAYLOAD_LEN),
        passphrase in "[a-zA-Z0-9]{1,16}",
    ) {
        let auth = Authorization::granted();
        let encoded = encode(&payload, Some(passphrase.as_str()), &auth).unwrap();

        let decoded = decode(&encoded.pgn, Some(passphrase.as_str()), &auth).unwrap();
        prop_assert_eq!(decoded.message, payload);
    }

    #[test]
    fn prop_codec_roundtrip(
        message in prop::collection::vec(any::<u8>(), 0..64),
        radices in prop::collection::vec(1usize..60, 1..16),
        tagged in any::<bool>(),
    ) {
        // A schedule of only forced plies never makes progress.
        prop_assume!(radices.iter().any(|&r| r > 1));

        let tag = tagged.then_some([0xDE, 0xAD, 0xBE, 0xEF]);
        let mut enc = SymbolEncoder::new(&message, tag);
        let mut dec = SymbolDecoder::new(64, tagged);

        for &radix in radices.iter().cycle() {
            let Some(digit) = enc.next_digit(radix) else { break };
            prop_assert!(digit < radix.max(1));
            dec.push(digit, radix).unwrap();
        }

        prop_assert!(dec.is_done());
        prop_assert_eq!(enc.digits_emitted(), dec.digits_consumed());
        let frame = dec.finish().unwrap();
        prop_assert_eq!(frame.message, message);
        prop_assert_eq!(frame.tag, tag);
    }
}

#[test]
fn test_distinct_passphrases_distinct_games() {
    let auth = Authorization::granted();
    let games: Vec<String> = ["a", "b", "c", "d"]
        .iter()
        .map(|p| encode(b"payload", Some(p), &auth).unwrap().pgn)
        .collect();

    for i in 0..games.len() {
        for j in i + 1..games.len() {
            assert_ne!(games[i], games[j]);
        }
    }
}
