//! Record and block admission rules.
//!
//! Validity of records is a yes/no fact on the core types; the validators here
//! turn those facts into typed errors for whatever assembles the chain.

use powledger_core::{Block, Hash, PublicKey, Record};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown sender: {0}")]
    UnknownSender(String),

    #[error("record from {sender} with nonce {nonce} is malformed")]
    MalformedRecord { sender: String, nonce: u64 },

    #[error("record from {sender} with nonce {nonce} has an invalid signature")]
    InvalidSignature { sender: String, nonce: u64 },

    #[error("block is not mined")]
    NotMined,

    #[error("block hash does not match its contents")]
    HashMismatch,

    #[error("block hash does not meet difficulty {difficulty}")]
    InsufficientWork { difficulty: u32 },

    #[error("block prev_hash mismatch (expected {expected}, got {got})")]
    InvalidPrevHash { expected: Hash, got: Hash },

    #[error("duplicate record in block")]
    DuplicateRecord,

    #[error("empty chain")]
    EmptyChain,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Public keys of known wallets, by wallet id.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: HashMap<String, PublicKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the public key for a wallet id.
    pub fn register(&mut self, id: impl Into<String>, public_key: PublicKey) {
        self.keys.insert(id.into(), public_key);
    }

    pub fn get(&self, id: &str) -> Option<&PublicKey> {
        self.keys.get(id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Record validator.
pub struct RecordValidator;

impl RecordValidator {
    /// Check structure and signature of a record against its sender's key.
    pub fn validate(record: &Record, registry: &KeyRegistry) -> Result<()> {
        let public_key = registry
            .get(&record.sender)
            .ok_or_else(|| ValidationError::UnknownSender(record.sender.clone()))?;

        if !record.is_well_formed() {
            return Err(ValidationError::MalformedRecord {
                sender: record.sender.clone(),
                nonce: record.nonce,
            });
        }

        if !record.verify(public_key) {
            return Err(ValidationError::InvalidSignature {
                sender: record.sender.clone(),
                nonce: record.nonce,
            });
        }

        Ok(())
    }
}

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Re-derive the block hash from the stored nonce and check the work.
    pub fn validate_pow(block: &Block) -> Result<()> {
        let stored = block.block_hash().ok_or(ValidationError::NotMined)?;

        if block.generate_hash() != stored {
            return Err(ValidationError::HashMismatch);
        }

        if !powledger_core::meets_difficulty(&stored, block.difficulty()) {
            return Err(ValidationError::InsufficientWork {
                difficulty: block.difficulty(),
            });
        }

        Ok(())
    }

    /// Validate every record and reject duplicates.
    pub fn validate_records(block: &Block, registry: &KeyRegistry) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for record in block.records() {
            if !seen.insert(record.hash()) {
                return Err(ValidationError::DuplicateRecord);
            }
            RecordValidator::validate(record, registry)?;
        }
        Ok(())
    }

    /// Validate that the block builds on `parent_hash`.
    pub fn validate_extends_parent(block: &Block, parent_hash: Hash) -> Result<()> {
        if block.prev_hash() != parent_hash {
            return Err(ValidationError::InvalidPrevHash {
                expected: parent_hash,
                got: block.prev_hash(),
            });
        }
        Ok(())
    }

    /// Full block validation (work + parent link + records).
    pub fn validate_full(block: &Block, parent_hash: Hash, registry: &KeyRegistry) -> Result<()> {
        Self::validate_pow(block)?;
        Self::validate_extends_parent(block, parent_hash)?;
        Self::validate_records(block, registry)?;
        Ok(())
    }

    /// Validate a whole chain, genesis first.
    ///
    /// The first block must point at the zero hash and each later block at
    /// its predecessor's mined hash.
    pub fn validate_chain(blocks: &[Block], registry: &KeyRegistry) -> Result<()> {
        if blocks.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        let mut parent = Hash::ZERO;
        for (height, block) in blocks.iter().enumerate() {
            Self::validate_full(block, parent, registry)?;
            debug!(height, prev = %parent, "validated block");
            parent = block.block_hash().ok_or(ValidationError::NotMined)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powledger_core::{Amount, Wallet};

    fn setup() -> (Wallet, Wallet, KeyRegistry) {
        let alice = Wallet::new("alice").unwrap();
        let bob = Wallet::new("bob").unwrap();
        let mut registry = KeyRegistry::new();
        registry.register(alice.id(), *alice.public_key());
        registry.register(bob.id(), *bob.public_key());
        (alice, bob, registry)
    }

    fn five() -> Amount {
        Amount::from_whole(5).unwrap()
    }

    #[test]
    fn test_valid_record() {
        let (mut alice, bob, registry) = setup();
        let tx = alice.send_funds(bob.id(), five()).unwrap();
        assert!(RecordValidator::validate(&tx, &registry).is_ok());
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let (_, _, registry) = setup();
        let mut carol = Wallet::new("carol").unwrap();
        let tx = carol.send_funds("bob", five()).unwrap();
        assert_eq!(
            RecordValidator::validate(&tx, &registry),
            Err(ValidationError::UnknownSender("carol".into()))
        );
    }

    #[test]
    fn test_unsigned_record_rejected() {
        let (_, _, registry) = setup();
        let tx = Record::transfer("alice", "bob", five(), 1);
        assert!(matches!(
            RecordValidator::validate(&tx, &registry),
            Err(ValidationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_malformed_record_rejected() {
        let (mut alice, _, registry) = setup();
        let tx = alice.send_funds("bob", Amount::ZERO).unwrap();
        assert!(matches!(
            RecordValidator::validate(&tx, &registry),
            Err(ValidationError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_impersonation_rejected() {
        let (_, mut bob, registry) = setup();
        // Bob signs a record claiming to come from Alice.
        let mut tx = bob.send_funds("bob", five()).unwrap();
        tx.sender = "alice".into();
        assert!(matches!(
            RecordValidator::validate(&tx, &registry),
            Err(ValidationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_unmined_block_rejected() {
        let block = Block::genesis(1).unwrap();
        assert_eq!(
            BlockValidator::validate_pow(&block),
            Err(ValidationError::NotMined)
        );
    }

    #[test]
    fn test_block_validation() {
        let (mut alice, bob, registry) = setup();
        let tx = alice.send_funds(bob.id(), five()).unwrap();
        let parent = Hash::from_bytes([0xAA; 32]);

        let mut block = Block::new(vec![tx], parent, 1).unwrap();
        block.mine_block();

        assert!(BlockValidator::validate_full(&block, parent, &registry).is_ok());
        assert!(matches!(
            BlockValidator::validate_extends_parent(&block, Hash::ZERO),
            Err(ValidationError::InvalidPrevHash { .. })
        ));
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let (mut alice, bob, registry) = setup();
        let tx = alice.send_funds(bob.id(), five()).unwrap();

        let mut block = Block::new(vec![tx.clone(), tx], Hash::ZERO, 0).unwrap();
        block.mine_block();

        assert_eq!(
            BlockValidator::validate_records(&block, &registry),
            Err(ValidationError::DuplicateRecord)
        );
    }

    #[test]
    fn test_empty_chain_rejected() {
        let registry = KeyRegistry::new();
        assert_eq!(
            BlockValidator::validate_chain(&[], &registry),
            Err(ValidationError::EmptyChain)
        );
    }
}
