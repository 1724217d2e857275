//! Game transcripts and PGN import/export.
//!
//! This module provides:
//! - [`Transcript`]: start position, plies and PGN headers
//! - PGN export with the Seven Tag Roster and 80-column movetext
//! - Tolerant PGN import (comments, NAGs, variations and move numbers are
//!   skipped)

use std::fmt;

use thiserror::Error;

use crate::chess::{
    apply_move, generate_legal, parse_san, to_san, ChessError, Color, Move, Position, STARTING_FEN,
};

/// Header names of the Seven Tag Roster, in export order.
pub const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Header carrying the self-destruct time (Unix seconds).
pub const EXPIRY_HEADER: &str = "ExpiryTime";

/// Roster header holding the 1-based encoding attempt.
pub const ROUND_HEADER: &str = "Round";

/// Headers describing the start position; always derived from it.
const POSITION_HEADERS: [&str; 2] = ["SetUp", "FEN"];

const MAX_LINE: usize = 80;

/// Errors that can occur while reading a PGN transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("PGN parse error: {0}")]
    Parse(String),

    #[error("Ply {ply}: {source}")]
    Chess {
        ply: usize,
        #[source]
        source: ChessError,
    },
}

/// One recorded half-move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ply {
    /// Position the move was played in.
    pub position: Position,
    pub mv: Move,
    pub san: String,
}

/// A finished or in-progress game record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    headers: Vec<(String, String)>,
    start: Position,
    current: Position,
    plies: Vec<Ply>,
}

impl Transcript {
    pub fn new(start: Position) -> Self {
        Self {
            headers: Vec::new(),
            current: start.clone(),
            start,
            plies: Vec::new(),
        }
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    /// Position after the last ply.
    pub fn final_position(&self) -> &Position {
        &self.current
    }

    pub fn plies(&self) -> &[Ply] {
        &self.plies
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    pub fn moves(&self) -> impl Iterator<Item = &Move> + '_ {
        self.plies.iter().map(|p| &p.mv)
    }

    /// Appends a legal move played from the current position.
    pub fn push(&mut self, mv: &Move) -> Result<(), ChessError> {
        let next = apply_move(&self.current, mv)?;
        // Recover engine flags so SAN sees captures and castling.
        let mv = generate_legal(&self.current)
            .into_iter()
            .find(|m| m.same_action(mv))
            .unwrap_or(*mv);
        let san = to_san(&self.current, &mv);
        let position = std::mem::replace(&mut self.current, next);
        self.plies.push(Ply { position, mv, san });
        Ok(())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Sets a header, replacing any existing value.
    pub fn set_header(&mut self, key: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove_header(&mut self, key: &str) -> Option<String> {
        let at = self.headers.iter().position(|(k, _)| k == key)?;
        Some(self.headers.remove(at).1)
    }

    /// The `Result` header, `*` if unset.
    pub fn result(&self) -> &str {
        self.header("Result").unwrap_or("*")
    }

    /// Renders the transcript as PGN.
    pub fn to_pgn(&self) -> String {
        let mut out = String::new();

        for key in SEVEN_TAG_ROSTER {
            let value = match (key, self.header(key)) {
                (_, Some(v)) => v,
                ("Date", None) => "????.??.??",
                ("Result", None) => "*",
                _ => "?",
            };
            push_header(&mut out, key, value);
        }

        let custom_start = self.start.to_fen() != STARTING_FEN;
        if custom_start {
            push_header(&mut out, "SetUp", "1");
            push_header(&mut out, "FEN", &self.start.to_fen());
        }

        for (key, value) in &self.headers {
            let skip = SEVEN_TAG_ROSTER.contains(&key.as_str())
                || POSITION_HEADERS.contains(&key.as_str());
            if !skip {
                push_header(&mut out, key, value);
            }
        }
        out.push('\n');

        let mut tokens = Vec::with_capacity(self.plies.len() * 3 / 2 + 1);
        for (i, ply) in self.plies.iter().enumerate() {
            let number = ply.position.fullmove_number();
            match ply.position.side_to_move() {
                Color::White => tokens.push(format!("{}.", number)),
                Color::Black if i == 0 => tokens.push(format!("{}...", number)),
                Color::Black => {}
            }
            tokens.push(ply.san.clone());
        }
        tokens.push(self.result().to_string());

        let mut line = String::new();
        for token in tokens {
            if !line.is_empty() && line.len() + 1 + token.len() > MAX_LINE {
                out.push_str(&line);
                out.push('\n');
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&token);
        }
        out.push_str(&line);
        out.push('\n');
        out
    }

    /// Parses the first game of a PGN document and replays its moves.
    pub fn from_pgn(text: &str) -> Result<Self, TranscriptError> {
        let (headers, movetext) = split_headers(text)?;

        let start = match headers.iter().find(|(k, _)| k == "FEN") {
            Some((_, fen)) => Position::from_fen(fen)
                .map_err(|source| TranscriptError::Chess { ply: 0, source })?,
            None => Position::starting(),
        };

        let mut transcript = Transcript::new(start);
        for (key, value) in headers {
            transcript.set_header(&key, &value);
        }

        for (i, san) in movetext_tokens(&movetext)?.iter().enumerate() {
            let ply = i + 1;
            let mv = parse_san(transcript.final_position(), san)
                .map_err(|source| TranscriptError::Chess { ply, source })?;
            transcript
                .push(&mv)
                .map_err(|source| TranscriptError::Chess { ply, source })?;
        }
        Ok(transcript)
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pgn())
    }
}

fn push_header(out: &mut String, key: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    out.push_str(&format!("[{} \"{}\"]\n", key, escaped));
}

/// Splits leading `[Key "Value"]` lines from the movetext.
fn split_headers(text: &str) -> Result<(Vec<(String, String)>, String), TranscriptError> {
    let mut headers = Vec::new();
    let mut movetext = String::new();
    let mut in_headers = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if in_headers {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('[') {
                headers.push(parse_header_line(trimmed)?);
                continue;
            }
            in_headers = false;
        }
        if trimmed.starts_with('[') && !movetext.trim().is_empty() {
            // Next game begins; only the first one is read.
            break;
        }
        movetext.push_str(line);
        movetext.push('\n');
    }
    Ok((headers, movetext))
}

fn parse_header_line(line: &str) -> Result<(String, String), TranscriptError> {
    let bad = || TranscriptError::Parse(format!("malformed header: {}", line));
    let inner = line
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(bad)?
        .trim();
    let (key, rest) = inner.split_once(char::is_whitespace).ok_or_else(bad)?;
    let quoted = rest
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(bad)?;

    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }
    Ok((key.to_string(), value))
}

/// SAN tokens of the main line.
fn movetext_tokens(movetext: &str) -> Result<Vec<String>, TranscriptError> {
    let mut cleaned = String::with_capacity(movetext.len());
    let mut chars = movetext.chars().peekable();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(TranscriptError::Parse("unterminated comment".to_string()));
                }
                cleaned.push(' ');
            }
            ';' => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                cleaned.push(' ');
            }
            '(' => {
                depth += 1;
                cleaned.push(' ');
            }
            ')' => {
                if depth == 0 {
                    return Err(TranscriptError::Parse("unbalanced ')'".to_string()));
                }
                depth -= 1;
                cleaned.push(' ');
            }
            _ if depth > 0 => {}
            _ => cleaned.push(c),
        }
    }
    if depth != 0 {
        return Err(TranscriptError::Parse("unterminated variation".to_string()));
    }

    let mut tokens = Vec::new();
    for raw in cleaned.split_whitespace() {
        if matches!(raw, "1-0" | "0-1" | "1/2-1/2" | "*") {
            break;
        }
        if raw.starts_with('$') {
            continue;
        }
        // Strip a leading move number such as "12." or "12..." (possibly glued to the move).
        let token = raw.trim_start_matches(|c: char| c.is_ascii_digit());
        let token = if token.len() < raw.len() && token.starts_with('.') {
            token.trim_start_matches('.')
        } else {
            raw
        };
        if !token.is_empty() {
            tokens.push(token.to_string());
        }
    }
    Ok(tokens)
}
