//! Standard algebraic notation (SAN).
//!
//! Formatting follows the PGN export rules: minimal disambiguation
//! (file, then rank, then both), `x` for captures, `=Q` for promotions,
//! `O-O` / `O-O-O` for castling and `+` / `#` suffixes.

use super::movegen::generate_legal;
use super::position::Position;
use super::types::{Move, PieceKind};
use super::ChessError;

/// SAN of `mv` in `position`, including the check or mate suffix.
pub fn to_san(position: &Position, mv: &Move) -> String {
    let legal = generate_legal(position);
    let mut san = san_body(position, mv, &legal);

    let next = position.play_unchecked(mv);
    if next.in_check() {
        if generate_legal(&next).is_empty() {
            san.push('#');
        } else {
            san.push('+');
        }
    }
    san
}

/// SAN without check/mate suffix. `legal` must be the legal moves of
/// `position`; it is only used for disambiguation.
pub fn san_body(position: &Position, mv: &Move, legal: &[Move]) -> String {
    if mv.flags.castle {
        return if mv.to.file() == 6 {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        };
    }

    let kind = position
        .piece_at(mv.from)
        .map(|p| p.kind)
        .unwrap_or(PieceKind::Pawn);
    let mut san = String::new();

    if kind == PieceKind::Pawn {
        if mv.flags.capture {
            san.push(mv.from.file_char());
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(p) = mv.promotion {
            san.push('=');
            san.push(p.letter());
        }
        return san;
    }

    san.push(kind.letter());

    let rivals: Vec<&Move> = legal
        .iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && position.piece_at(other.from).map(|p| p.kind) == Some(kind)
        })
        .collect();

    if !rivals.is_empty() {
        let file_unique = rivals.iter().all(|o| o.from.file() != mv.from.file());
        let rank_unique = rivals.iter().all(|o| o.from.rank() != mv.from.rank());
        if file_unique {
            san.push(mv.from.file_char());
        } else if rank_unique {
            san.push(mv.from.rank_char());
        } else {
            san.push(mv.from.file_char());
            san.push(mv.from.rank_char());
        }
    }

    if mv.flags.capture {
        san.push('x');
    }
    san.push_str(&mv.to.to_string());
    san
}

/// Resolves a SAN token (or UCI coordinates) to a legal move.
///
/// Accepts trailing `+`, `#`, `!`, `?` annotations, `0-0` castling
/// spelling, and promotions written with or without `=`.
pub fn parse_san(position: &Position, text: &str) -> Result<Move, ChessError> {
    let legal = generate_legal(position);
    let wanted = normalize(text);
    if wanted.is_empty() {
        return Err(ChessError::InvalidSan(text.to_string()));
    }

    if let Some(mv) = legal
        .iter()
        .find(|mv| normalize(&san_body(position, mv, &legal)) == wanted)
    {
        return Ok(*mv);
    }

    if let Some(uci) = Move::parse_uci(&text.to_ascii_lowercase()) {
        if let Some(mv) = legal.iter().find(|mv| mv.same_action(&uci)) {
            return Ok(*mv);
        }
    }

    Err(ChessError::InvalidSan(text.to_string()))
}

fn normalize(text: &str) -> String {
    let trimmed = text.trim_end_matches(['+', '#', '!', '?']);
    trimmed
        .replace("0-0-0", "O-O-O")
        .replace("0-0", "O-O")
        .chars()
        .filter(|&c| c != '=')
        .collect()
}
