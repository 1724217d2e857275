//! Steganographic driver: authorization gate and per-call encoding context.
//!
//! Both directions walk the same game ply by ply. At every ply the context
//! draws the keystream permutation for that ply's legal move count, so the
//! encoder (rank -> move) and decoder (move -> rank) stay in lockstep even
//! across forced plies.

use std::fmt;

use tracing::{debug, info, warn};

use crate::chess::{Game, Move, Outcome, Position};
use crate::error::StegoError;
use crate::index::LegalMoveSet;
use crate::keystream::Keystream;
use crate::transcript::Transcript;

/// Authorization decision supplied by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorization {
    pub authorized: bool,
    /// Wallet identifier used to attribute log lines.
    pub wallet: Option<String>,
}

impl Authorization {
    pub fn granted() -> Self {
        Self {
            authorized: true,
            wallet: None,
        }
    }

    pub fn for_wallet(wallet: impl Into<String>) -> Self {
        Self {
            authorized: true,
            wallet: Some(wallet.into()),
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    /// Fails with [`StegoError::NotAuthorized`] unless authorized.
    pub fn require(&self) -> Result<(), StegoError> {
        if self.authorized {
            Ok(())
        } else {
            warn!(wallet = self.wallet_label(), "rejected unauthorized request");
            Err(StegoError::NotAuthorized(
                "wallet connection required".to_string(),
            ))
        }
    }

    fn wallet_label(&self) -> &str {
        self.wallet.as_deref().unwrap_or("-")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Success,
    Failure,
}

/// Lifecycle of one encode or decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Encoding,
    Decoding,
    Terminated(Termination),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Encoding => write!(f, "encoding"),
            Phase::Decoding => write!(f, "decoding"),
            Phase::Terminated(Termination::Success) => write!(f, "terminated(success)"),
            Phase::Terminated(Termination::Failure) => write!(f, "terminated(failure)"),
        }
    }
}

/// Result of stepping one ply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlyStep {
    pub mv: Move,
    /// Rank after the keystream permutation.
    pub rank: usize,
    /// Legal move count of the ply.
    pub radix: usize,
}

impl PlyStep {
    pub fn is_forced(&self) -> bool {
        self.radix <= 1
    }
}

/// Per-call state: the game, its transcript, the keystream and the phase.
#[derive(Debug, Clone)]
pub struct EncodingContext {
    game: Game,
    transcript: Transcript,
    keystream: Keystream,
    phase: Phase,
    wallet: Option<String>,
}

impl EncodingContext {
    pub fn new(start: Position, passphrase: Option<&str>, authorization: &Authorization) -> Self {
        Self::for_attempt(start, passphrase, 0, authorization)
    }

    /// Context whose keystream belongs to encoding attempt `attempt`.
    pub fn for_attempt(
        start: Position,
        passphrase: Option<&str>,
        attempt: u32,
        authorization: &Authorization,
    ) -> Self {
        Self {
            game: Game::new(start.clone()),
            transcript: Transcript::new(start),
            keystream: Keystream::for_attempt(passphrase, attempt),
            phase: Phase::Idle,
            wallet: authorization.wallet.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ply_count(&self) -> usize {
        self.game.ply_count()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.game.outcome()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    pub fn legal_moves(&self) -> Result<LegalMoveSet, StegoError> {
        Ok(self.game.legal_moves()?)
    }

    /// Moves to `next`, logging the transition.
    pub fn transition(&mut self, next: Phase) {
        info!(
            wallet = self.wallet_label(),
            from = %self.phase,
            to = %next,
            plies = self.game.ply_count(),
            "phase transition"
        );
        self.phase = next;
    }

    /// Terminates with failure and hands back `err`.
    pub fn fail(&mut self, err: StegoError) -> StegoError {
        warn!(wallet = self.wallet_label(), error = %err, "operation failed");
        self.transition(Phase::Terminated(Termination::Failure));
        err
    }

    /// Plays the move that `rank` stands for under this ply's permutation.
    pub fn play_rank(&mut self, set: &LegalMoveSet, rank: usize) -> Result<PlyStep, StegoError> {
        let radix = set.count();
        let perm = self.keystream.permutation(radix);
        let index = perm
            .canonical_index(rank)
            .ok_or_else(|| StegoError::RankOutOfRange(format!("rank {} of {}", rank, radix)))?;
        let mv = set.move_at(index)?;
        self.commit(mv)?;
        debug!(
            wallet = self.wallet_label(),
            ply = self.game.ply_count(),
            radix,
            rank,
            mv = %mv,
            "played"
        );
        Ok(PlyStep { mv, rank, radix })
    }

    /// Replays an observed move and recovers its rank.
    pub fn observe(&mut self, mv: &Move) -> Result<PlyStep, StegoError> {
        let set = self.legal_moves()?;
        let radix = set.count();
        let perm = self.keystream.permutation(radix);
        let index = set.rank_of(mv)?;
        let rank = perm
            .rank_of_canonical(index)
            .ok_or_else(|| StegoError::RankOutOfRange(format!("index {} of {}", index, radix)))?;
        let mv = set.move_at(index)?;
        self.commit(mv)?;
        debug!(
            wallet = self.wallet_label(),
            ply = self.game.ply_count(),
            radix,
            rank,
            mv = %mv,
            "observed"
        );
        Ok(PlyStep { mv, rank, radix })
    }

    fn commit(&mut self, mv: Move) -> Result<(), StegoError> {
        self.game.play(&mv)?;
        self.transcript.push(&mv)?;
        Ok(())
    }

    fn wallet_label(&self) -> &str {
        self.wallet.as_deref().unwrap_or("-")
    }
}
