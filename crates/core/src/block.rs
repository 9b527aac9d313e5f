//! Blocks and their proof-of-work identity.

use crate::hash::Hash;
use crate::pow::{self, HashTemplate, NonceRange, Solution, MAX_DIFFICULTY};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while constructing a block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid difficulty {difficulty} (maximum {max})")]
    InvalidDifficulty { difficulty: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, BlockError>;

/// A batch of records sealed by proof-of-work.
///
/// A block starts unmined (`block_hash` is `None`) and becomes mined once a
/// nonce is found; mining is the only mutation after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    prev_hash: Hash,
    block_hash: Option<Hash>,
    records: Vec<Record>,
    /// Unix timestamp in seconds, set once at construction.
    timestamp: u64,
    nonce: u64,
    difficulty: u32,
}

impl Block {
    /// Create an unmined block stamped with the current time.
    pub fn new(records: Vec<Record>, prev_hash: Hash, difficulty: u32) -> Result<Self> {
        Self::with_timestamp(records, prev_hash, difficulty, current_timestamp())
    }

    /// Create an unmined block with an explicit timestamp.
    pub fn with_timestamp(
        records: Vec<Record>,
        prev_hash: Hash,
        difficulty: u32,
        timestamp: u64,
    ) -> Result<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(BlockError::InvalidDifficulty {
                difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        debug!(
            records = records.len(),
            prev = %prev_hash,
            difficulty,
            "created block"
        );
        Ok(Self {
            prev_hash,
            block_hash: None,
            records,
            timestamp,
            nonce: 0,
            difficulty,
        })
    }

    /// First block of a chain: no records, zero predecessor.
    pub fn genesis(difficulty: u32) -> Result<Self> {
        Self::new(Vec::new(), Hash::ZERO, difficulty)
    }

    pub fn prev_hash(&self) -> Hash {
        self.prev_hash
    }

    /// The mined hash, or `None` while unmined.
    pub fn block_hash(&self) -> Option<Hash> {
        self.block_hash
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Transfer records, in block order.
    pub fn transactions(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_transfer())
    }

    /// Agreement records, in block order.
    pub fn contracts(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_agreement())
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn is_mined(&self) -> bool {
        self.block_hash.is_some()
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash == Hash::ZERO
    }

    /// Digest committing to every record in order.
    pub fn records_digest(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.records.len() as u64).to_le_bytes());
        for record in &self.records {
            hasher.update(record.hash().as_bytes());
        }
        hasher.finalize().into()
    }

    /// Everything the block hash commits to, except the nonce.
    ///
    /// Layout: prev hash, timestamp (LE), difficulty (LE), records digest.
    /// The nonce (LE) is appended last.
    pub fn hash_template(&self) -> HashTemplate {
        let mut prefix = blake3::Hasher::new();
        prefix.update(self.prev_hash.as_bytes());
        prefix.update(&self.timestamp.to_le_bytes());
        prefix.update(&self.difficulty.to_le_bytes());
        prefix.update(self.records_digest().as_bytes());
        HashTemplate::new(prefix)
    }

    /// Hash of the block at its current nonce.
    pub fn generate_hash(&self) -> Hash {
        self.hash_template().hash_with_nonce(self.nonce)
    }

    /// Search for a nonce meeting the difficulty, starting from 0.
    ///
    /// Runs until a solution is found. Mining an already mined block returns
    /// its stored hash.
    pub fn mine_block(&mut self) -> Hash {
        let never = AtomicBool::new(false);
        match self.mine_block_until(&never) {
            Some(hash) => hash,
            // Only reached when no u64 nonce satisfies the difficulty.
            None => self.generate_hash(),
        }
    }

    /// Like [`Block::mine_block`], but gives up when `cancel` is set.
    ///
    /// Returns `None` when cancelled; the block then stays unmined.
    pub fn mine_block_until(&mut self, cancel: &AtomicBool) -> Option<Hash> {
        if let Some(hash) = self.block_hash {
            return Some(hash);
        }
        let template = self.hash_template();
        match pow::search(
            &template,
            self.difficulty,
            NonceRange::SEQUENTIAL,
            pow::cancelled_by(cancel),
        ) {
            Ok(solution) => Some(self.seal(solution)),
            Err(attempts) => {
                debug!(attempts, "mining stopped before a solution was found");
                None
            }
        }
    }

    /// Record a solution found by an external search.
    ///
    /// Returns `None` if the solution does not reproduce from this block's
    /// contents or does not meet its difficulty.
    pub fn apply_solution(&mut self, solution: Solution) -> Option<Hash> {
        if self.block_hash.is_some() {
            return self.block_hash;
        }
        let hash = self.hash_template().hash_with_nonce(solution.nonce);
        if hash != solution.hash || !pow::meets_difficulty(&hash, self.difficulty) {
            return None;
        }
        Some(self.seal(solution))
    }

    fn seal(&mut self, solution: Solution) -> Hash {
        self.nonce = solution.nonce;
        self.block_hash = Some(solution.hash);
        info!(
            nonce = solution.nonce,
            hash = %solution.hash,
            attempts = solution.attempts,
            difficulty = self.difficulty,
            "mined block"
        );
        solution.hash
    }

    /// Check that the stored hash is reproduced by the stored nonce and meets
    /// the difficulty. False for unmined blocks.
    pub fn verify_pow(&self) -> bool {
        match self.block_hash {
            Some(stored) => {
                stored == self.generate_hash() && pow::meets_difficulty(&stored, self.difficulty)
            }
            None => false,
        }
    }
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
