//! Move-space indexer.
//!
//! Assigns every legal move of a position a rank in `0..count`, using the
//! canonical order `(from, to, promotion)`. The order depends on the
//! position alone, so encoder and decoder always agree on the radix and
//! on which move a rank stands for.

use thiserror::Error;

use crate::chess::{generate_legal, ChessError, Move, Position};

/// Errors from rank lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Move {0} is not in the legal move set")]
    MoveNotInSet(String),

    #[error("Rank {rank} out of range for {count} legal moves")]
    RankOutOfRange { rank: usize, count: usize },
}

/// Legal moves of `position` in canonical order; shorthand for
/// [`LegalMoveSet::of`].
pub fn legal_moves(position: &Position) -> Result<LegalMoveSet, ChessError> {
    LegalMoveSet::of(position)
}

/// The legal moves of one position in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMoveSet {
    moves: Vec<Move>,
}

impl LegalMoveSet {
    /// Legal moves of `position`.
    ///
    /// Fails with [`ChessError::TerminalPosition`] when there are none.
    pub fn of(position: &Position) -> Result<Self, ChessError> {
        let moves = generate_legal(position);
        if moves.is_empty() {
            return Err(ChessError::TerminalPosition {
                checkmate: position.in_check(),
            });
        }
        Ok(Self { moves })
    }

    /// Number of legal moves: the radix of this ply.
    pub fn count(&self) -> usize {
        self.moves.len()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// True when the ply is forced and carries no information.
    pub fn is_forced(&self) -> bool {
        self.moves.len() == 1
    }

    pub fn move_at(&self, rank: usize) -> Result<Move, IndexError> {
        self.moves
            .get(rank)
            .copied()
            .ok_or(IndexError::RankOutOfRange {
                rank,
                count: self.moves.len(),
            })
    }

    /// Rank of `mv`, matched on squares and promotion.
    pub fn rank_of(&self, mv: &Move) -> Result<usize, IndexError> {
        self.moves
            .iter()
            .position(|m| m.same_action(mv))
            .ok_or_else(|| IndexError::MoveNotInSet(mv.uci()))
    }

    pub fn contains(&self, mv: &Move) -> bool {
        self.rank_of(mv).is_ok()
    }
}
