//! Append-only ledger of published games.
//!
//! Each registered PGN is sealed in a block that links to its predecessor
//! by SHA-256 hash and is mined until the hash starts with `difficulty`
//! zero hex digits. A game that was registered carries a `BlockchainRef`
//! header naming its block, which lets the reader check that the game was
//! not edited after publication.
//!
//! Expiry is recorded per block as a pending transaction. Once due, the
//! block's game can no longer be retrieved, but the block itself stays in
//! the chain so the hashes keep verifying.
//!
//! The ledger is stored as TOML:
//!
//! ```toml
//! difficulty = 2
//! expired = [3]
//!
//! [[blocks]]
//! index = 0
//! timestamp = 1767225600
//! pgn = "Genesis Block"
//! previous_hash = "0"
//! nonce = 41
//! hash = "00a1..."
//!
//! [[expiries]]
//! block = 4
//! expires_at = 1767312000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::transcript::{Transcript, TranscriptError};

/// Header naming the block a game was registered in.
pub const LEDGER_REF_HEADER: &str = "BlockchainRef";

/// Leading zero hex digits required of every block hash.
pub const DEFAULT_DIFFICULTY: usize = 2;

const GENESIS_DATA: &str = "Genesis Block";
const GENESIS_PREVIOUS: &str = "0";

/// Errors that can occur when using the ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Block {0} does not exist")]
    NotFound(u64),

    #[error("Block {0} has expired")]
    Expired(u64),

    #[error("Chain broken at block {index}: {reason}")]
    BrokenChain { index: u64, reason: String },

    #[error("Game differs from the one registered in block {0}")]
    Tampered(u64),

    #[error("Invalid BlockchainRef header '{0}'")]
    InvalidReference(String),

    #[error("Registered game is unreadable: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// One sealed entry of the chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    /// Unix seconds at registration.
    pub timestamp: u64,
    pub pgn: String,
    pub previous_hash: String,
    pub nonce: u64,
    /// Hex SHA-256 over every other field.
    pub hash: String,
}

impl Block {
    fn new(index: u64, timestamp: u64, pgn: &str, previous_hash: &str) -> Self {
        let mut block = Self {
            index,
            timestamp,
            pgn: pgn.to_string(),
            previous_hash: previous_hash.to_string(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Hashes the block contents, each variable-length field length-prefixed.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update((self.pgn.len() as u64).to_be_bytes());
        hasher.update(self.pgn.as_bytes());
        hasher.update((self.previous_hash.len() as u64).to_be_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Bumps the nonce until the hash meets `difficulty`.
    fn mine(&mut self, difficulty: usize) {
        while !meets_difficulty(&self.hash, difficulty) {
            self.nonce += 1;
            self.hash = self.compute_hash();
        }
        debug!(index = self.index, nonce = self.nonce, "mined block");
    }
}

fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// A pending self-destruct for one block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub block: u64,
    /// Unix seconds after which the block's game is withheld.
    pub expires_at: u64,
}

/// The chain of registered games plus its expiry bookkeeping.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ledger {
    pub difficulty: usize,
    /// Blocks whose expiry has been processed.
    #[serde(default)]
    expired: Vec<u64>,
    blocks: Vec<Block>,
    #[serde(default)]
    expiries: Vec<Expiry>,
}

impl Ledger {
    /// Creates a ledger holding only the mined genesis block.
    pub fn new(difficulty: usize, now: u64) -> Self {
        let mut genesis = Block::new(0, now, GENESIS_DATA, GENESIS_PREVIOUS);
        genesis.mine(difficulty);
        Self {
            difficulty,
            expired: Vec::new(),
            blocks: vec![genesis],
            expiries: Vec::new(),
        }
    }

    /// Loads a ledger from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let content = fs::read_to_string(path)?;
        let ledger: Ledger = toml::from_str(&content)?;
        Ok(ledger)
    }

    /// Loads the ledger at `path`, or starts a new one if the file is missing.
    pub fn open(path: &Path, now: u64) -> Result<Self, LedgerError> {
        if !path.exists() {
            info!(path = %path.display(), "starting new ledger");
            return Ok(Self::new(DEFAULT_DIFFICULTY, now));
        }
        Self::load(path)
    }

    /// Writes the ledger to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A ledger always holds its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Seals `pgn` in a new block and returns its index.
    pub fn register(&mut self, pgn: &str, expires_at: Option<u64>, now: u64) -> u64 {
        let (index, previous_hash) = match self.blocks.last() {
            Some(last) => (last.index + 1, last.hash.clone()),
            None => (0, GENESIS_PREVIOUS.to_string()),
        };
        let mut block = Block::new(index, now, pgn, &previous_hash);
        block.mine(self.difficulty);
        self.blocks.push(block);

        if let Some(expires_at) = expires_at {
            self.expiries.push(Expiry {
                block: index,
                expires_at,
            });
        }
        info!(index, expires_at = ?expires_at, "registered game");
        index
    }

    /// Registers the transcript's PGN, then tags the transcript with the
    /// block reference.
    pub fn register_game(
        &mut self,
        transcript: &mut Transcript,
        expires_at: Option<u64>,
        now: u64,
    ) -> u64 {
        transcript.remove_header(LEDGER_REF_HEADER);
        let index = self.register(&transcript.to_pgn(), expires_at, now);
        transcript.set_header(LEDGER_REF_HEADER, &index.to_string());
        index
    }

    /// Checks every hash, every link and the proof of work.
    pub fn verify_chain(&self) -> Result<(), LedgerError> {
        let mut previous_hash = GENESIS_PREVIOUS;
        for (position, block) in self.blocks.iter().enumerate() {
            let broken = |reason: &str| LedgerError::BrokenChain {
                index: block.index,
                reason: reason.to_string(),
            };
            if block.index != position as u64 {
                return Err(broken("index out of sequence"));
            }
            if block.previous_hash != previous_hash {
                return Err(broken("previous hash does not match"));
            }
            if block.hash != block.compute_hash() {
                return Err(broken("hash does not match contents"));
            }
            if !meets_difficulty(&block.hash, self.difficulty) {
                return Err(broken("hash misses the difficulty target"));
            }
            previous_hash = &block.hash;
        }
        Ok(())
    }

    /// Returns the game of block `index` unless it is missing or expired.
    ///
    /// The genesis block holds no game.
    pub fn retrieve(&self, index: u64, now: u64) -> Result<&str, LedgerError> {
        let block = match self.blocks.get(index as usize) {
            Some(block) if index > 0 => block,
            _ => return Err(LedgerError::NotFound(index)),
        };
        let due = self
            .expiries
            .iter()
            .any(|e| e.block == index && now > e.expires_at);
        if due || self.expired.contains(&index) {
            return Err(LedgerError::Expired(index));
        }
        Ok(&block.pgn)
    }

    /// Settles every due expiry and returns how many fired.
    pub fn process_expired(&mut self, now: u64) -> usize {
        let (due, pending): (Vec<Expiry>, Vec<Expiry>) = std::mem::take(&mut self.expiries)
            .into_iter()
            .partition(|e| now > e.expires_at);
        self.expiries = pending;

        for expiry in &due {
            if !self.expired.contains(&expiry.block) {
                self.expired.push(expiry.block);
            }
            info!(index = expiry.block, "block expired");
        }
        due.len()
    }

    /// Checks a game against the block its `BlockchainRef` header names.
    ///
    /// Returns `Ok(None)` for a game that carries no reference.
    pub fn check_game(
        &self,
        transcript: &Transcript,
        now: u64,
    ) -> Result<Option<u64>, LedgerError> {
        let Some(raw) = transcript.header(LEDGER_REF_HEADER) else {
            return Ok(None);
        };
        let index: u64 = raw
            .trim()
            .parse()
            .map_err(|_| LedgerError::InvalidReference(raw.to_string()))?;

        let mut registered = Transcript::from_pgn(self.retrieve(index, now)?)?;
        registered.remove_header(LEDGER_REF_HEADER);
        let mut presented = transcript.clone();
        presented.remove_header(LEDGER_REF_HEADER);

        if presented.to_pgn() != registered.to_pgn() {
            return Err(LedgerError::Tampered(index));
        }
        debug!(index, "game matches its block");
        Ok(Some(index))
    }
}
