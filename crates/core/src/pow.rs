//! Proof-of-work primitives: the difficulty predicate and the hash template
//! that mining loops evaluate.
//!
//! A hash meets difficulty `d` when its 64-digit hex form begins with at
//! least `d` `'0'` characters. Difficulty 0 accepts every hash and 64 accepts
//! only the zero hash, so valid difficulties are `0..=MAX_DIFFICULTY`.

use crate::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

/// Highest meaningful difficulty: every hex digit zero.
pub const MAX_DIFFICULTY: u32 = Hash::HEX_LEN as u32;

/// Whether `hash` satisfies `difficulty`.
pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    hash.leading_zero_nibbles() >= difficulty
}

/// A block's hash input with everything except the nonce already absorbed.
///
/// Evaluating a nonce clones the Blake3 state on the stack and feeds it the
/// eight nonce bytes, so the search loop never touches the heap.
#[derive(Clone)]
pub struct HashTemplate {
    prefix: blake3::Hasher,
}

impl HashTemplate {
    pub fn new(prefix: blake3::Hasher) -> Self {
        Self { prefix }
    }

    /// Hash of the template completed with `nonce`.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let mut hasher = self.prefix.clone();
        hasher.update(&nonce.to_le_bytes());
        hasher.finalize().into()
    }
}

/// Outcome of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub hash: Hash,
    /// Number of nonces evaluated, including the winner.
    pub attempts: u64,
}

/// Nonce iterator shared by the sequential and parallel searches.
///
/// Visits `start, start + step, start + 2*step, ...` until `start` wraps.
#[derive(Debug, Clone, Copy)]
pub struct NonceRange {
    pub start: u64,
    pub step: u64,
}

impl NonceRange {
    pub const SEQUENTIAL: Self = Self { start: 0, step: 1 };
}

/// Search `range` for the first nonce whose hash meets `difficulty`.
///
/// `stop` is polled before each nonce; it is given the next candidate so a
/// caller can abandon nonces past a known better answer. Returns `Err` with
/// the number of attempts made when stopped or when the nonce space runs out.
pub fn search<F>(
    template: &HashTemplate,
    difficulty: u32,
    range: NonceRange,
    mut stop: F,
) -> Result<Solution, u64>
where
    F: FnMut(u64) -> bool,
{
    let mut nonce = range.start;
    let mut attempts = 0u64;
    loop {
        if stop(nonce) {
            return Err(attempts);
        }
        let hash = template.hash_with_nonce(nonce);
        attempts += 1;
        if meets_difficulty(&hash, difficulty) {
            return Ok(Solution {
                nonce,
                hash,
                attempts,
            });
        }
        nonce = match nonce.checked_add(range.step) {
            Some(next) => next,
            None => return Err(attempts),
        };
    }
}

/// Convenience stop condition driven by a cancellation flag.
pub fn cancelled_by(flag: &AtomicBool) -> impl FnMut(u64) -> bool + '_ {
    move |_| flag.load(Ordering::Relaxed)
}
