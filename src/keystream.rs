//! Passphrase-derived move-order permutation.
//!
//! This module provides:
//! - A per-game keystream that shuffles each ply's canonical move order
//! - The optional integrity tag bound to the passphrase
//! - The filler-move selector used after the payload
//!
//! Without a passphrase the first encoding attempt uses the identity
//! permutation, so ranks map straight onto the canonical order. Retried
//! attempts always shuffle.

use hkdf::Hkdf;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::TAG_BYTES;

/// HKDF salt for the move-order permutation.
pub const SALT_PERMUTE: &[u8] = b"CHESSHIDE-PERMUTE-V1";

/// HKDF salt for the integrity tag key.
pub const SALT_TAG: &[u8] = b"CHESSHIDE-TAG-V1";

/// HKDF salt for filler move selection.
pub const SALT_FILLER: &[u8] = b"CHESSHIDE-FILLER-V1";

/// A permutation of `0..n`: position `rank` holds the canonical index it
/// stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    order: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            order: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Canonical index encoded by `rank`.
    pub fn canonical_index(&self, rank: usize) -> Option<usize> {
        self.order.get(rank).copied()
    }

    /// Rank that maps to canonical index `index`.
    pub fn rank_of_canonical(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&i| i == index)
    }
}

/// Stateful source of per-ply permutations.
///
/// Encoder and decoder must request a permutation for every ply, forced
/// plies included, to stay in lockstep.
#[derive(Debug, Clone)]
pub struct Keystream {
    rng: Option<ChaCha20Rng>,
    plies: usize,
}

impl Keystream {
    /// Keystream for `passphrase`; `None` or an empty passphrase gives
    /// identity permutations.
    pub fn from_passphrase(passphrase: Option<&str>) -> Self {
        Self::for_attempt(passphrase, 0)
    }

    /// Keystream of encoding attempt `attempt`.
    ///
    /// Attempt 0 is the plain passphrase keystream. Later attempts mix the
    /// attempt number into the seed and are always keyed, so an attempt
    /// without passphrase still yields a fresh move order.
    pub fn for_attempt(passphrase: Option<&str>, attempt: u32) -> Self {
        let passphrase = passphrase.unwrap_or_default();
        let rng = if attempt == 0 {
            (!passphrase.is_empty())
                .then(|| ChaCha20Rng::from_seed(derive_seed(passphrase.as_bytes(), SALT_PERMUTE)))
        } else {
            let seed = derive_seed_with_info(
                passphrase.as_bytes(),
                SALT_PERMUTE,
                &attempt_info(attempt),
            );
            Some(ChaCha20Rng::from_seed(seed))
        };
        Self { rng, plies: 0 }
    }

    pub fn is_keyed(&self) -> bool {
        self.rng.is_some()
    }

    /// Number of permutations drawn so far.
    pub fn plies(&self) -> usize {
        self.plies
    }

    /// Permutation for the next ply, over `n` legal moves.
    pub fn permutation(&mut self, n: usize) -> Permutation {
        self.plies += 1;
        let mut perm = Permutation::identity(n);
        if let Some(rng) = self.rng.as_mut() {
            perm.order.shuffle(rng);
        }
        perm
    }
}

/// Picks filler moves after the payload.
///
/// Keyed by the passphrase when present; otherwise seeded from a fixed
/// label so output stays reproducible.
#[derive(Debug, Clone)]
pub struct FillerSelector {
    rng: ChaCha20Rng,
}

impl FillerSelector {
    pub fn new(passphrase: Option<&str>) -> Self {
        let input = passphrase.unwrap_or_default();
        Self {
            rng: ChaCha20Rng::from_seed(derive_seed(input.as_bytes(), SALT_FILLER)),
        }
    }

    /// Index in `0..n`.
    pub fn pick(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }
}

/// 32-bit integrity tag over the framed payload.
///
/// First bytes of SHA-256 over a passphrase-derived key, the 4-byte
/// big-endian length and the message.
pub fn integrity_tag(passphrase: Option<&str>, message: &[u8]) -> [u8; TAG_BYTES] {
    let key = passphrase
        .filter(|p| !p.is_empty())
        .map(|p| derive_seed(p.as_bytes(), SALT_TAG));

    let mut hasher = Sha256::new();
    if let Some(key) = key {
        hasher.update(key);
    }
    hasher.update((message.len() as u32).to_be_bytes());
    hasher.update(message);
    let digest = hasher.finalize();

    let mut tag = [0u8; TAG_BYTES];
    tag.copy_from_slice(&digest[..TAG_BYTES]);
    tag
}

/// Derives a 32-byte seed using HKDF-SHA256.
fn derive_seed(input: &[u8], salt: &[u8]) -> [u8; 32] {
    derive_seed_with_info(input, salt, b"seed")
}

fn derive_seed_with_info(input: &[u8], salt: &[u8], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(salt), input);
    let mut output = [0u8; 32];
    hk.expand(info, &mut output)
        .expect("HKDF expand should not fail");
    output
}

/// HKDF info for attempt `n`: `seed` followed by the big-endian attempt.
fn attempt_info(attempt: u32) -> [u8; 8] {
    let mut info = [0u8; 8];
    info[..4].copy_from_slice(b"seed");
    info[4..].copy_from_slice(&attempt.to_be_bytes());
    info
}
