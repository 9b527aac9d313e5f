//! Proof-of-work mining and validation for powledger.
//!
//! This crate provides:
//! - A multi-threaded, cancellable miner that finds the same nonce as the
//!   sequential search in `powledger-core`
//! - Record validation against registered wallet keys
//! - Block validation (work, parent link, records) and whole-chain checks
//!
//! # Example
//!
//! ```rust,no_run
//! use powledger_consensus::{BlockValidator, KeyRegistry, Miner, MiningConfig};
//! use powledger_core::{Amount, Block, Hash, Wallet};
//!
//! let mut alice = Wallet::new("alice").unwrap();
//! let mut registry = KeyRegistry::new();
//! registry.register(alice.id(), *alice.public_key());
//!
//! let tx = alice.send_funds("bob", Amount::from_whole(10).unwrap()).unwrap();
//! let mut block = Block::new(vec![tx], Hash::ZERO, 3).unwrap();
//!
//! let outcome = Miner::new(MiningConfig::default()).mine(&mut block);
//! assert!(outcome.is_mined());
//!
//! BlockValidator::validate_chain(&[block], &registry).unwrap();
//! ```

pub mod miner;
pub mod validator;

// Re-export commonly used types
pub use miner::{Miner, MiningConfig, MiningOutcome};
pub use validator::{BlockValidator, KeyRegistry, RecordValidator, ValidationError};
