//! Legal move generation.
//!
//! Pseudo-legal moves are produced piece by piece, then each candidate is
//! played on a copy of the position and dropped if it leaves the mover's
//! king attacked. This covers pins, discovered checks and en-passant
//! exposures without special cases. The result is sorted into canonical
//! order `(from, to, promotion)`.

use super::position::{king_steps, knight_steps, Position, BISHOP_DIRS, ROOK_DIRS};
use super::types::{Color, Move, MoveFlags, Piece, PieceKind, Square};
use super::ChessError;

/// All legal moves of `position` in canonical order.
pub fn generate_legal(position: &Position) -> Vec<Move> {
    let mover = position.side_to_move();
    let mut moves: Vec<Move> = generate_pseudo_legal(position)
        .into_iter()
        .filter(|mv| !position.play_unchecked(mv).is_in_check(mover))
        .collect();
    moves.sort_by_key(|mv| mv.sort_key());
    moves
}

/// Plays `mv` on `position` if it is legal, returning the new position.
///
/// Matching is on squares and promotion only; the engine supplies the
/// flags of the generated move.
pub fn apply_move(position: &Position, mv: &Move) -> Result<Position, ChessError> {
    let legal = generate_legal(position)
        .into_iter()
        .find(|m| m.same_action(mv))
        .ok_or_else(|| ChessError::IllegalMove {
            mv: mv.uci(),
            fen: position.to_fen(),
        })?;
    Ok(position.play_unchecked(&legal))
}

fn generate_pseudo_legal(position: &Position) -> Vec<Move> {
    let mover = position.side_to_move();
    let mut out = Vec::with_capacity(64);

    for (from, piece) in position.pieces() {
        if piece.color != mover {
            continue;
        }
        match piece.kind {
            PieceKind::Pawn => pawn_moves(position, from, mover, &mut out),
            PieceKind::Knight => step_moves(position, from, mover, knight_steps(), &mut out),
            PieceKind::Bishop => slide_moves(position, from, mover, &BISHOP_DIRS, &mut out),
            PieceKind::Rook => slide_moves(position, from, mover, &ROOK_DIRS, &mut out),
            PieceKind::Queen => {
                slide_moves(position, from, mover, &ROOK_DIRS, &mut out);
                slide_moves(position, from, mover, &BISHOP_DIRS, &mut out);
            }
            PieceKind::King => {
                step_moves(position, from, mover, king_steps(), &mut out);
                castle_moves(position, from, mover, &mut out);
            }
        }
    }
    out
}

fn push_target(position: &Position, from: Square, to: Square, mover: Color, out: &mut Vec<Move>) -> bool {
    match position.piece_at(to) {
        None => {
            out.push(Move::new(from, to));
            true
        }
        Some(p) if p.color != mover => {
            let mut mv = Move::new(from, to);
            mv.flags.capture = true;
            out.push(mv);
            false
        }
        Some(_) => false,
    }
}

fn step_moves(position: &Position, from: Square, mover: Color, steps: &[(i8, i8)], out: &mut Vec<Move>) {
    for &(df, dr) in steps {
        if let Some(to) = from.offset(df, dr) {
            push_target(position, from, to, mover, out);
        }
    }
}

fn slide_moves(position: &Position, from: Square, mover: Color, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
    for &(df, dr) in dirs {
        let mut cur = from.offset(df, dr);
        while let Some(to) = cur {
            if !push_target(position, from, to, mover, out) {
                break;
            }
            cur = to.offset(df, dr);
        }
    }
}

fn push_pawn(from: Square, to: Square, flags: MoveFlags, out: &mut Vec<Move>) {
    if to.rank() == 0 || to.rank() == 7 {
        for kind in PieceKind::PROMOTIONS {
            out.push(Move {
                from,
                to,
                promotion: Some(kind),
                flags,
            });
        }
    } else {
        out.push(Move {
            from,
            to,
            promotion: None,
            flags,
        });
    }
}

fn pawn_moves(position: &Position, from: Square, mover: Color, out: &mut Vec<Move>) {
    let dir = mover.forward();
    let start_rank = if mover == Color::White { 1 } else { 6 };

    if let Some(one) = from.offset(0, dir) {
        if position.piece_at(one).is_none() {
            push_pawn(from, one, MoveFlags::default(), out);
            if from.rank() == start_rank {
                if let Some(two) = one.offset(0, dir) {
                    if position.piece_at(two).is_none() {
                        let flags = MoveFlags {
                            double_push: true,
                            ..MoveFlags::default()
                        };
                        out.push(Move {
                            from,
                            to: two,
                            promotion: None,
                            flags,
                        });
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = from.offset(df, dir) else {
            continue;
        };
        match position.piece_at(to) {
            Some(p) if p.color != mover => {
                let flags = MoveFlags {
                    capture: true,
                    ..MoveFlags::default()
                };
                push_pawn(from, to, flags, out);
            }
            None if position.en_passant() == Some(to) => {
                let flags = MoveFlags {
                    capture: true,
                    en_passant: true,
                    ..MoveFlags::default()
                };
                out.push(Move {
                    from,
                    to,
                    promotion: None,
                    flags,
                });
            }
            _ => {}
        }
    }
}

fn castle_moves(position: &Position, from: Square, mover: Color, out: &mut Vec<Move>) {
    let rank = mover.home_rank();
    let home = Square::new(4, rank);
    if home != Some(from) || position.is_attacked(from, mover.opposite()) {
        return;
    }
    let rook = Some(Piece::new(mover, PieceKind::Rook));
    let rights = position.castling();

    // (rook file, squares that must be empty, squares the king crosses, king target file)
    let sides: [(bool, u8, &[u8], &[u8], u8); 2] = [
        (rights.kingside(mover), 7, &[5, 6], &[5, 6], 6),
        (rights.queenside(mover), 0, &[1, 2, 3], &[3, 2], 2),
    ];

    for (allowed, rook_file, empty, crossed, target_file) in sides {
        if !allowed {
            continue;
        }
        let rook_sq = Square::new(rook_file, rank);
        if rook_sq.and_then(|sq| position.piece_at(sq)) != rook {
            continue;
        }
        let path_clear = empty
            .iter()
            .filter_map(|&f| Square::new(f, rank))
            .all(|sq| position.piece_at(sq).is_none());
        if !path_clear {
            continue;
        }
        let safe = crossed
            .iter()
            .filter_map(|&f| Square::new(f, rank))
            .all(|sq| !position.is_attacked(sq, mover.opposite()));
        if !safe {
            continue;
        }
        if let Some(to) = Square::new(target_file, rank) {
            out.push(Move {
                from,
                to,
                promotion: None,
                flags: MoveFlags {
                    castle: true,
                    ..MoveFlags::default()
                },
            });
        }
    }
}
