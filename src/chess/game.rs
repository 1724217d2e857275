//! A linear game: position, move history, repetition tracking and outcome.

use super::movegen::apply_move;
use super::position::{Position, RepetitionKey};
use super::types::{Color, Move};
use super::ChessError;
use crate::index::LegalMoveSet;

/// Why a game is over.
///
/// Draw outcomes are only used to bound game length; the codec treats
/// them like terminal positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    FiftyMoveRule,
    ThreefoldRepetition,
    InsufficientMaterial,
}

impl Outcome {
    /// PGN result token.
    pub fn result_token(&self) -> &'static str {
        match self {
            Outcome::Checkmate {
                winner: Color::White,
            } => "1-0",
            Outcome::Checkmate {
                winner: Color::Black,
            } => "0-1",
            _ => "1/2-1/2",
        }
    }

    pub fn is_draw(&self) -> bool {
        !matches!(self, Outcome::Checkmate { .. })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Checkmate { winner } => write!(f, "checkmate, {:?} wins", winner),
            Outcome::Stalemate => write!(f, "stalemate"),
            Outcome::FiftyMoveRule => write!(f, "fifty-move rule"),
            Outcome::ThreefoldRepetition => write!(f, "threefold repetition"),
            Outcome::InsufficientMaterial => write!(f, "insufficient material"),
        }
    }
}

/// One game line from a start position.
#[derive(Debug, Clone)]
pub struct Game {
    start: Position,
    position: Position,
    moves: Vec<Move>,
    history: Vec<RepetitionKey>,
}

impl Game {
    pub fn new(start: Position) -> Self {
        let history = vec![start.repetition_key()];
        Self {
            position: start.clone(),
            start,
            moves: Vec::new(),
            history,
        }
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    /// Legal moves of the current position.
    pub fn legal_moves(&self) -> Result<LegalMoveSet, ChessError> {
        LegalMoveSet::of(&self.position)
    }

    /// Plays a legal move. Returns the move as generated by the engine.
    pub fn play(&mut self, mv: &Move) -> Result<Move, ChessError> {
        let next = apply_move(&self.position, mv)?;
        let played = self
            .legal_moves()?
            .moves()
            .iter()
            .copied()
            .find(|m| m.same_action(mv))
            .unwrap_or(*mv);
        self.history.push(next.repetition_key());
        self.moves.push(played);
        self.position = next;
        Ok(played)
    }

    /// How often the current position has occurred so far.
    pub fn repetitions(&self) -> usize {
        let current = self.position.repetition_key();
        self.history.iter().filter(|k| **k == current).count()
    }

    /// The outcome if the game is over, checking mate and stalemate
    /// first, then the draw rules.
    pub fn outcome(&self) -> Option<Outcome> {
        if let Err(ChessError::TerminalPosition { checkmate }) = self.legal_moves() {
            return Some(if checkmate {
                Outcome::Checkmate {
                    winner: self.position.side_to_move().opposite(),
                }
            } else {
                Outcome::Stalemate
            });
        }
        if self.position.halfmove_clock() >= 100 {
            return Some(Outcome::FiftyMoveRule);
        }
        if self.repetitions() >= 3 {
            return Some(Outcome::ThreefoldRepetition);
        }
        if self.position.is_insufficient_material() {
            return Some(Outcome::InsufficientMaterial);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::san::parse_san;

    fn play_all(game: &mut Game, sans: &[&str]) {
        for san in sans {
            let mv = parse_san(game.position(), san).unwrap();
            game.play(&mv).unwrap();
        }
    }

    #[test]
    fn test_fools_mate_outcome() {
        let mut game = Game::new(Position::starting());
        play_all(&mut game, &["f3", "e5", "g4", "Qh4"]);
        assert_eq!(
            game.outcome(),
            Some(Outcome::Checkmate {
                winner: Color::Black
            })
        );
        assert_eq!(game.outcome().unwrap().result_token(), "0-1");
    }

    #[test]
    fn test_stalemate() {
        let game = Game::new(Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap());
        assert_eq!(game.outcome(), Some(Outcome::Stalemate));
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new(Position::starting());
        play_all(&mut game, &["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1"]);
        assert_eq!(game.outcome(), None);
        play_all(&mut game, &["Ng8"]);
        assert_eq!(game.repetitions(), 3);
        assert_eq!(game.outcome(), Some(Outcome::ThreefoldRepetition));
    }

    #[test]
    fn test_fifty_move_rule() {
        let game = Game::new(Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 100 80").unwrap());
        assert_eq!(game.outcome(), Some(Outcome::FiftyMoveRule));
    }

    #[test]
    fn test_insufficient_material() {
        let game = Game::new(Position::from_fen("4k3/8/8/8/8/8/8/4KB2 w - - 0 1").unwrap());
        assert_eq!(game.outcome(), Some(Outcome::InsufficientMaterial));
    }

    #[test]
    fn test_illegal_play_leaves_game_untouched() {
        let mut game = Game::new(Position::starting());
        assert!(game.play(&Move::parse_uci("e2e5").unwrap()).is_err());
        assert_eq!(game.ply_count(), 0);
        assert_eq!(game.position(), &Position::starting());
    }
}
