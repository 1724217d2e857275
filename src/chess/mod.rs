//! Game-state engine: the rules of chess.
//!
//! This module provides:
//! - Board primitives (squares, pieces, moves)
//! - Immutable positions with FEN import/export
//! - Legal move generation in canonical order
//! - SAN formatting and parsing
//! - Game lines with checkmate, stalemate and draw detection

pub mod game;
pub mod movegen;
pub mod position;
pub mod san;
pub mod types;

pub use game::{Game, Outcome};
pub use movegen::{apply_move, generate_legal};
pub use position::{CastlingRights, Position, STARTING_FEN};
pub use san::{parse_san, san_body, to_san};
pub use types::{Color, Move, MoveFlags, Piece, PieceKind, Square};

use thiserror::Error;

/// Errors raised by the rules engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("Illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },

    #[error("No legal moves (checkmate: {checkmate})")]
    TerminalPosition { checkmate: bool },

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid SAN '{0}'")]
    InvalidSan(String),
}
