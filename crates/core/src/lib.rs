//! Core ledger primitives for powledger.
//!
//! This crate provides the integrity layer of a single-node ledger:
//! - Blake3 hashing
//! - Ed25519 key material, signing and verification
//! - Fixed-point amounts
//! - Signed records (transfers and contract agreements)
//! - Blocks sealed by proof-of-work
//! - Wallets that own keys and issue signed records

pub mod amount;
pub mod block;
pub mod crypto;
pub mod hash;
pub mod pow;
pub mod record;
pub mod wallet;

// Re-export commonly used types at the crate root
pub use amount::{Amount, AmountError};
pub use block::{Block, BlockError};
pub use crypto::{CryptoError, Keypair, PublicKey, Signature};
pub use hash::{hash, hash_concat, Hash, H256};
pub use pow::{meets_difficulty, HashTemplate, NonceRange, Solution, MAX_DIFFICULTY};
pub use record::{Contract, Record, RecordKind, Transaction};
pub use wallet::Wallet;
