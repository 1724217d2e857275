//! Position snapshots, FEN and attack detection.

use super::types::{Color, Move, Piece, PieceKind, Square};
use super::ChessError;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_STEPS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub(crate) const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub(crate) const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub(crate) fn knight_steps() -> &'static [(i8, i8); 8] {
    &KNIGHT_STEPS
}

pub(crate) fn king_steps() -> &'static [(i8, i8); 8] {
    &KING_STEPS
}

/// Castling availability for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights {
    pub white_king: bool,
    pub white_queen: bool,
    pub black_king: bool,
    pub black_queen: bool,
}

impl CastlingRights {
    pub fn all() -> Self {
        Self {
            white_king: true,
            white_queen: true,
            black_king: true,
            black_queen: true,
        }
    }

    pub fn kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_king,
            Color::Black => self.black_king,
        }
    }

    pub fn queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queen,
            Color::Black => self.black_queen,
        }
    }

    fn clear_color(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_king = false;
                self.white_queen = false;
            }
            Color::Black => {
                self.black_king = false;
                self.black_queen = false;
            }
        }
    }

    /// Drops any right whose rook or king home square was touched.
    fn touch(&mut self, sq: Square) {
        match sq {
            Square::H1 => self.white_king = false,
            Square::A1 => self.white_queen = false,
            Square::H8 => self.black_king = false,
            Square::A8 => self.black_queen = false,
            Square::E1 => self.clear_color(Color::White),
            Square::E8 => self.clear_color(Color::Black),
            _ => {}
        }
    }

    fn to_fen(self) -> String {
        let mut s = String::new();
        if self.white_king {
            s.push('K');
        }
        if self.white_queen {
            s.push('Q');
        }
        if self.black_king {
            s.push('k');
        }
        if self.black_queen {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// The part of a position that decides threefold repetition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepetitionKey {
    board: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
}

/// An immutable chess position.
///
/// Positions are never mutated across plies: [`Position::play_unchecked`]
/// and the checked `apply_move` both return a fresh value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl Position {
    /// The standard starting position.
    pub fn starting() -> Self {
        const BACK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut board = [None; 64];
        for (file, &kind) in BACK.iter().enumerate() {
            board[file] = Some(Piece::new(Color::White, kind));
            board[8 + file] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board[48 + file] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board[56 + file] = Some(Piece::new(Color::Black, kind));
        }

        Self {
            board,
            side_to_move: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parses a FEN string. Clock fields are optional and default to `0 1`.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let invalid = |why: &str| ChessError::InvalidFen(format!("{}: {}", why, fen));
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(invalid("expected 4 to 6 fields"));
        }

        let mut board = [None; 64];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid("expected 8 ranks"));
        }
        for (i, row) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file: u8 = 0;
            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 || skip > 8 {
                        return Err(invalid("bad empty-square count"));
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(c).ok_or_else(|| invalid("bad piece letter"))?;
                    let sq = Square::new(file, rank).ok_or_else(|| invalid("rank overflow"))?;
                    board[sq.index()] = Some(piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(invalid("rank overflow"));
                }
            }
            if file != 8 {
                return Err(invalid("short rank"));
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(invalid("bad side to move")),
        };

        let mut castling = CastlingRights::default();
        if fields[2] != "-" {
            for c in fields[2].chars() {
                match c {
                    'K' => castling.white_king = true,
                    'Q' => castling.white_queen = true,
                    'k' => castling.black_king = true,
                    'q' => castling.black_queen = true,
                    _ => return Err(invalid("bad castling field")),
                }
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            s => Some(Square::parse(s).ok_or_else(|| invalid("bad en-passant square"))?),
        };

        let halfmove_clock = match fields.get(4) {
            Some(s) => s.parse().map_err(|_| invalid("bad halfmove clock"))?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(s) => s.parse().map_err(|_| invalid("bad fullmove number"))?,
            None => 1,
        };

        let position = Self {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        };
        position.validate().map_err(|why| invalid(why))?;
        Ok(position)
    }

    /// Sanity checks a parsed position: one king each, no pawns on the
    /// back ranks, side not to move is not in check.
    fn validate(&self) -> Result<(), &'static str> {
        for color in [Color::White, Color::Black] {
            let kings = self
                .pieces()
                .filter(|(_, p)| p.color == color && p.kind == PieceKind::King)
                .count();
            if kings != 1 {
                return Err("each side needs exactly one king");
            }
        }
        if self
            .pieces()
            .any(|(sq, p)| p.kind == PieceKind::Pawn && (sq.rank() == 0 || sq.rank() == 7))
        {
            return Err("pawn on a back rank");
        }
        if self.is_in_check(self.side_to_move.opposite()) {
            return Err("side not to move is in check");
        }
        Ok(())
    }

    /// Serializes to FEN.
    pub fn to_fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.board[(rank * 8 + file) as usize] {
                    Some(p) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(p.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }

        let side = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };
        let ep = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            out,
            side,
            self.castling.to_fen(),
            ep,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.index()]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Occupied squares with their pieces, in square order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.board[sq.index()].map(|p| (sq, p)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.color == color && p.kind == PieceKind::King)
            .map(|(sq, _)| sq)
    }

    /// True if `color`'s king is attacked.
    pub fn is_in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(k) => self.is_attacked(k, color.opposite()),
            None => false,
        }
    }

    /// True if the side to move is in check.
    pub fn in_check(&self) -> bool {
        self.is_in_check(self.side_to_move)
    }

    /// True iff `target` is attacked by any piece of color `by`.
    pub fn is_attacked(&self, target: Square, by: Color) -> bool {
        // Pawns attack diagonally forward, so look one rank "behind" target.
        let back = -by.forward();
        for df in [-1, 1] {
            if let Some(sq) = target.offset(df, back) {
                if self.board[sq.index()] == Some(Piece::new(by, PieceKind::Pawn)) {
                    return true;
                }
            }
        }

        for &(df, dr) in knight_steps() {
            if let Some(sq) = target.offset(df, dr) {
                if self.board[sq.index()] == Some(Piece::new(by, PieceKind::Knight)) {
                    return true;
                }
            }
        }

        for &(df, dr) in king_steps() {
            if let Some(sq) = target.offset(df, dr) {
                if self.board[sq.index()] == Some(Piece::new(by, PieceKind::King)) {
                    return true;
                }
            }
        }

        self.ray_hits(target, by, &ROOK_DIRS, PieceKind::Rook)
            || self.ray_hits(target, by, &BISHOP_DIRS, PieceKind::Bishop)
    }

    /// Walks each ray from `target` to the first blocker and checks
    /// whether it is a `by`-colored slider of `kind` or a queen.
    fn ray_hits(&self, target: Square, by: Color, dirs: &[(i8, i8)], kind: PieceKind) -> bool {
        for &(df, dr) in dirs {
            let mut cur = target.offset(df, dr);
            while let Some(sq) = cur {
                if let Some(p) = self.board[sq.index()] {
                    if p.color == by && (p.kind == kind || p.kind == PieceKind::Queen) {
                        return true;
                    }
                    break;
                }
                cur = sq.offset(df, dr);
            }
        }
        false
    }

    /// Plays a move without checking legality.
    ///
    /// The move must come from the pseudo-legal generator for this
    /// position; flags drive the special cases (castling rook hop,
    /// en-passant victim removal, double-push target square).
    pub(crate) fn play_unchecked(&self, mv: &Move) -> Position {
        let mut next = self.clone();
        let mover = self.side_to_move;
        let piece = match self.board[mv.from.index()] {
            Some(p) => p,
            None => return next,
        };

        let mut captured = self.board[mv.to.index()].is_some();
        if mv.flags.en_passant {
            if let Some(victim) = Square::new(mv.to.file(), mv.from.rank()) {
                next.board[victim.index()] = None;
                captured = true;
            }
        }

        next.board[mv.from.index()] = None;
        next.board[mv.to.index()] = Some(match mv.promotion {
            Some(kind) => Piece::new(mover, kind),
            None => piece,
        });

        if mv.flags.castle {
            let rank = mover.home_rank();
            let (rook_from, rook_to) = if mv.to.file() == 6 { (7, 5) } else { (0, 3) };
            if let (Some(rf), Some(rt)) = (Square::new(rook_from, rank), Square::new(rook_to, rank)) {
                next.board[rt.index()] = next.board[rf.index()].take();
            }
        }

        next.castling.touch(mv.from);
        next.castling.touch(mv.to);

        next.en_passant = if mv.flags.double_push {
            mv.from.offset(0, mover.forward())
        } else {
            None
        };

        if piece.kind == PieceKind::Pawn || captured {
            next.halfmove_clock = 0;
        } else {
            next.halfmove_clock = self.halfmove_clock + 1;
        }
        if mover == Color::Black {
            next.fullmove_number = self.fullmove_number + 1;
        }
        next.side_to_move = mover.opposite();
        next
    }

    /// Key for repetition detection. The en-passant square only counts
    /// when a pawn of the side to move stands ready to capture on it.
    pub fn repetition_key(&self) -> RepetitionKey {
        let en_passant = self.en_passant.filter(|&ep| {
            let back = -self.side_to_move.forward();
            [-1, 1].iter().any(|&df| {
                ep.offset(df, back).and_then(|sq| self.board[sq.index()])
                    == Some(Piece::new(self.side_to_move, PieceKind::Pawn))
            })
        });
        RepetitionKey {
            board: self.board,
            side_to_move: self.side_to_move,
            castling: self.castling,
            en_passant,
        }
    }

    /// True when neither side can possibly deliver mate: bare kings,
    /// a single minor piece, or only same-colored bishops.
    pub fn is_insufficient_material(&self) -> bool {
        let mut knights = 0;
        let mut light_bishops = 0;
        let mut dark_bishops = 0;
        for (sq, p) in self.pieces() {
            match p.kind {
                PieceKind::King => {}
                PieceKind::Knight => knights += 1,
                PieceKind::Bishop if sq.is_dark() => dark_bishops += 1,
                PieceKind::Bishop => light_bishops += 1,
                _ => return false,
            }
        }
        let minors = knights + light_bishops + dark_bishops;
        minors <= 1 || (knights == 0 && (light_bishops == 0 || dark_bishops == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_fen_roundtrip() {
        let start = Position::starting();
        assert_eq!(start.to_fen(), STARTING_FEN);
        assert_eq!(Position::from_fen(STARTING_FEN).unwrap(), start);
    }

    #[test]
    fn test_fen_optional_clocks() {
        let pos = Position::from_fen("8/8/8/8/8/8/8/K6k w - -").unwrap();
        assert_eq!(pos.halfmove_clock(), 0);
        assert_eq!(pos.fullmove_number(), 1);
    }

    #[test]
    fn test_invalid_fen_rejected() {
        assert!(Position::from_fen("").is_err());
        assert!(Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(Position::from_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
        assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        // Black king in check with white to move.
        assert!(Position::from_fen("k7/8/8/8/8/8/8/R6K w - - 0 1").is_err());
    }

    #[test]
    fn test_attacks() {
        let pos = Position::from_fen("4k3/8/8/3q4/8/8/8/4K3 w - - 0 1").unwrap();
        let d5 = Square::parse("d5").unwrap();
        assert!(pos.is_attacked(Square::parse("d1").unwrap(), Color::Black));
        assert!(pos.is_attacked(Square::parse("a2").unwrap(), Color::Black));
        assert!(!pos.is_attacked(Square::parse("e1").unwrap(), Color::Black));
        assert!(!pos.is_attacked(d5, Color::White));
    }

    #[test]
    fn test_pawn_attack_direction() {
        let pos = Position::from_fen("4k3/8/8/8/3p4/8/8/4K3 w - - 0 1").unwrap();
        assert!(pos.is_attacked(Square::parse("e3").unwrap(), Color::Black));
        assert!(!pos.is_attacked(Square::parse("e5").unwrap(), Color::Black));
    }

    #[test]
    fn test_insufficient_material() {
        assert!(Position::from_fen("8/8/8/8/8/8/8/K6k w - - 0 1").unwrap().is_insufficient_material());
        assert!(Position::from_fen("8/8/8/8/8/8/8/KN5k w - - 0 1").unwrap().is_insufficient_material());
        assert!(!Position::from_fen("KR6/8/8/8/8/8/8/7k w - - 0 1").unwrap().is_insufficient_material());
        assert!(!Position::from_fen("8/8/8/8/8/8/8/KNN4k w - - 0 1").unwrap().is_insufficient_material());
        assert!(!Position::starting().is_insufficient_material());
    }
}
