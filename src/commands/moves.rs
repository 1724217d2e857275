//! Moves command - show the encoding order of a position's legal moves.

use anyhow::{Context, Result};
use clap::Args;

use chesshide::chess::{to_san, STARTING_FEN};
use chesshide::{Keystream, LegalMoveSet, Position};

use super::CommandExecutor;

/// List the legal moves of a position as the encoder ranks them.
///
/// Without a passphrase this is the canonical (from, to, promotion) order.
/// With one, the order is the keystream permutation for the first ply.
#[derive(Args, Debug)]
pub struct MovesCommand {
    /// Position in FEN (standard start position if omitted)
    #[arg(long, default_value = STARTING_FEN)]
    pub fen: String,

    /// Passphrase whose first-ply permutation to apply
    #[arg(short, long)]
    pub passphrase: Option<String>,
}

impl CommandExecutor for MovesCommand {
    fn execute(&self) -> Result<()> {
        let position = Position::from_fen(&self.fen).context("Invalid FEN")?;
        let set = LegalMoveSet::of(&position).context("Position has no legal moves")?;

        let mut keystream = Keystream::from_passphrase(self.passphrase.as_deref());
        let perm = keystream.permutation(set.count());

        println!("{} legal moves", set.count());
        for rank in 0..set.count() {
            let index = perm
                .canonical_index(rank)
                .context("Permutation shorter than move list")?;
            let mv = set.move_at(index)?;
            println!("{:>3}  {:<6} {}", rank, mv.uci(), to_san(&position, &mv));
        }
        Ok(())
    }
}
