//! # Chesshide - Hide bytes in chess games
//!
//! Chesshide hides an arbitrary payload inside a sequence of legal chess
//! moves and recovers it bit-exactly from the game's PGN transcript.
//!
//! ## Overview
//!
//! - At every ply the legal moves are put in a **canonical order**
//!   (`from`, `to`, promotion piece), so both sides agree on what each move
//!   index means without any side channel
//! - The payload is framed as a 32-bit length followed by the message and
//!   written as a **mixed-radix number**: each ply contributes one digit
//!   whose radix is that ply's legal move count
//! - Forced plies (a single legal move) carry nothing and are skipped
//! - An optional **passphrase** shuffles each ply's move order through an
//!   HKDF-seeded ChaCha20 keystream; the same game decodes to something else
//!   (or fails) without it
//! - The output is an ordinary PGN file with a believable header block
//!
//! ## Example Usage
//!
//! ```rust
//! use chesshide::{decode, encode, Authorization};
//!
//! let auth = Authorization::granted();
//!
//! let encoded = encode(b"meet at the park", Some("secret"), &auth).unwrap();
//! println!("{}", encoded.pgn);
//!
//! let decoded = decode(&encoded.pgn, Some("secret"), &auth).unwrap();
//! assert_eq!(decoded.message, b"meet at the park");
//! ```
//!
//! ## Modules
//!
//! - [`chess`]: Rules of chess (positions, legal moves, SAN, outcomes)
//! - [`index`]: Canonical move ordering and rank lookup
//! - [`codec`]: Mixed-radix framing of the payload
//! - [`keystream`]: Passphrase-derived move-order permutation
//! - [`transcript`]: PGN import and export
//! - [`encoder`] / [`decoder`]: The two directions of the driver
//! - [`config`]: TOML configuration
//! - [`ledger`]: Hash-chained registry of published games

/// Size of the big-endian length prefix (in bytes).
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Size of the optional integrity tag (in bytes).
pub const TAG_BYTES: usize = 4;

pub mod chess;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod index;
pub mod keystream;
pub mod ledger;
pub mod transcript;

// Re-export commonly used types at the crate root
pub use chess::{ChessError, Move, Position};
pub use codec::CodecError;
pub use config::{ConfigError, StegoConfig};
pub use decoder::{decode, decode_transcript, decode_with_config, DecodedPayload, DecoderConfig};
pub use driver::{Authorization, EncodingContext, Phase, Termination};
pub use encoder::{encode, encode_with_config, EncodeReport, EncodedGame, EncoderConfig};
pub use error::StegoError;
pub use index::{legal_moves, IndexError, LegalMoveSet};
pub use keystream::Keystream;
pub use ledger::{Ledger, LedgerError};
pub use transcript::{Transcript, TranscriptError};
