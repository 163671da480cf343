//! Winner selection.
//!
//! The seed for a draw is only fixed at finalization: it hashes the entropy
//! accumulated by every purchase of the round with block data of the
//! finalizing transaction. A ticket index is taken uniformly from
//! `[0, total_tickets)` and mapped onto the participants in purchase order,
//! so a buyer holding `k` of `n` tickets wins with probability `k / n`.
//!
//! Block data can still be influenced by the block proposer. Chains with a
//! verifiable randomness beacon should provide their own [`EntropySource`].

use cosmwasm_std::{Addr, Binary, Env};
use sha2::{Digest, Sha256};

use crate::state::Round;

pub trait EntropySource {
    fn seed(&self, env: &Env, round: &Round) -> [u8; 32];
}

/// Seed derived from the round's purchase entropy and the current block.
pub struct BlockEntropy;

impl EntropySource for BlockEntropy {
    fn seed(&self, env: &Env, round: &Round) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(round.entropy.as_slice());
        hasher.update(round.id.to_be_bytes());
        hasher.update(round.total_tickets.to_be_bytes());
        hash_block(&mut hasher, env);
        hasher.finalize().into()
    }
}

fn hash_block(hasher: &mut Sha256, env: &Env) {
    hasher.update(env.block.chain_id.as_bytes());
    hasher.update(env.block.height.to_be_bytes());
    hasher.update(env.block.time.nanos().to_be_bytes());
    if let Some(tx) = &env.transaction {
        hasher.update(tx.index.to_be_bytes());
    }
    hasher.update(env.contract.address.as_str().as_bytes());
}

/// Initial entropy of a freshly opened round.
pub fn round_entropy(env: &Env, round_id: u64) -> Binary {
    let mut hasher = Sha256::new();
    hasher.update(round_id.to_be_bytes());
    hash_block(&mut hasher, env);
    Binary::from(hasher.finalize().as_slice())
}

/// Folds a purchase into the running entropy of the round.
pub fn mix_purchase(entropy: &Binary, env: &Env, buyer: &Addr, count: u64) -> Binary {
    let mut hasher = Sha256::new();
    hasher.update(entropy.as_slice());
    hasher.update(buyer.as_str().as_bytes());
    hasher.update(count.to_be_bytes());
    hash_block(&mut hasher, env);
    Binary::from(hasher.finalize().as_slice())
}

/// Maps a seed onto `[0, total_tickets)`. `total_tickets` must be non-zero.
pub fn ticket_index(seed: &[u8; 32], total_tickets: u64) -> u64 {
    let mut word = [0u8; 16];
    word.copy_from_slice(&seed[..16]);
    (u128::from_be_bytes(word) % u128::from(total_tickets)) as u64
}

/// Walks the participants in purchase order and returns the one whose
/// ticket range contains `index`.
pub fn select_winner(entries: &[(Addr, u64)], index: u64) -> Option<&Addr> {
    let mut cumulative = 0u64;
    for (participant, tickets) in entries {
        cumulative = cumulative.saturating_add(*tickets);
        if cumulative > index {
            return Some(participant);
        }
    }
    None
}
