//! Error taxonomy of the steganographic driver.

use thiserror::Error;

use crate::chess::ChessError;
use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::index::IndexError;
use crate::transcript::TranscriptError;

/// Errors returned by [`encode`](crate::encode) and [`decode`](crate::decode).
///
/// Every variant carries a human-readable reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Terminal position: {0}")]
    TerminalPosition(String),

    #[error("Move not in legal set: {0}")]
    MoveNotInSet(String),

    #[error("Rank out of range: {0}")]
    RankOutOfRange(String),

    #[error("Insufficient capacity: {0}")]
    InsufficientCapacity(String),

    #[error("Corrupt transcript: {0}")]
    CorruptTranscript(String),

    #[error("Wrong passphrase: {0}")]
    WrongPassphrase(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Message expired: {0}")]
    Expired(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ChessError> for StegoError {
    fn from(err: ChessError) -> Self {
        match err {
            ChessError::IllegalMove { .. } => StegoError::IllegalMove(err.to_string()),
            ChessError::TerminalPosition { .. } => StegoError::TerminalPosition(err.to_string()),
            ChessError::InvalidFen(_) => StegoError::Config(err.to_string()),
            ChessError::InvalidSan(_) => StegoError::CorruptTranscript(err.to_string()),
        }
    }
}

impl From<IndexError> for StegoError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::MoveNotInSet(_) => StegoError::MoveNotInSet(err.to_string()),
            IndexError::RankOutOfRange { .. } => StegoError::RankOutOfRange(err.to_string()),
        }
    }
}

impl From<CodecError> for StegoError {
    fn from(err: CodecError) -> Self {
        StegoError::CorruptTranscript(err.to_string())
    }
}

impl From<TranscriptError> for StegoError {
    fn from(err: TranscriptError) -> Self {
        StegoError::CorruptTranscript(err.to_string())
    }
}

impl From<ConfigError> for StegoError {
    fn from(err: ConfigError) -> Self {
        StegoError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chess_errors_keep_kind() {
        let err: StegoError = ChessError::TerminalPosition { checkmate: true }.into();
        assert!(matches!(err, StegoError::TerminalPosition(_)));

        let err: StegoError = ChessError::IllegalMove {
            mv: "e2e5".into(),
            fen: "startpos".into(),
        }
        .into();
        assert!(matches!(err, StegoError::IllegalMove(ref r) if r.contains("e2e5")));
    }

    #[test]
    fn test_codec_errors_are_corruption() {
        let err: StegoError = CodecError::Truncated.into();
        assert!(matches!(err, StegoError::CorruptTranscript(_)));
    }

    #[test]
    fn test_index_errors_keep_kind() {
        let err: StegoError = IndexError::RankOutOfRange { rank: 3, count: 2 }.into();
        assert_eq!(
            err.to_string(),
            "Rank out of range: Rank 3 out of range for 2 legal moves"
        );
    }
}
