//! Signed ledger records: value transfers and contract agreements.
//!
//! Transfers and contracts share one type. They differ only in their
//! [`RecordKind`]: an agreement carries contract terms, and each kind has its
//! own structural validity rule. Signing, verification and hashing are the
//! same for both.

use crate::amount::Amount;
use crate::crypto::{Keypair, PublicKey, Result, Signature};
use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a record states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// A plain value transfer.
    Transfer,
    /// A contract between sender and receiver with free-form terms.
    Agreement { terms: String },
}

/// An authenticated statement of transfer or agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,
    /// Sender's wallet id.
    pub sender: String,
    /// Receiver's wallet id.
    pub receiver: String,
    pub amount: Amount,
    /// Per-record counter, distinct from the block mining nonce.
    pub nonce: u64,
    /// `None` until [`Record::sign`] is called.
    pub signature: Option<Signature>,
}

/// The signed fields of a record, in signing order.
#[derive(Serialize)]
struct CanonicalPayload<'a> {
    kind: u8,
    sender: &'a str,
    receiver: &'a str,
    amount: u64,
    terms: Option<&'a str>,
    nonce: u64,
}

/// A value transfer; see [`Record::transfer`].
pub type Transaction = Record;

/// A contract agreement; see [`Record::agreement`].
pub type Contract = Record;

impl Record {
    pub fn transfer(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Amount,
        nonce: u64,
    ) -> Self {
        Self {
            kind: RecordKind::Transfer,
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            nonce,
            signature: None,
        }
    }

    pub fn agreement(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Amount,
        terms: impl Into<String>,
        nonce: u64,
    ) -> Self {
        Self {
            kind: RecordKind::Agreement {
                terms: terms.into(),
            },
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            nonce,
            signature: None,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self.kind, RecordKind::Transfer)
    }

    pub fn is_agreement(&self) -> bool {
        matches!(self.kind, RecordKind::Agreement { .. })
    }

    pub fn terms(&self) -> Option<&str> {
        match &self.kind {
            RecordKind::Transfer => None,
            RecordKind::Agreement { terms } => Some(terms),
        }
    }

    /// The exact bytes that are signed and verified.
    ///
    /// Fields are encoded with bincode in a fixed order: kind tag, sender,
    /// receiver, amount in minor units, terms, nonce. Strings carry a length
    /// prefix, so no two distinct records share a payload.
    pub fn canonical_payload(&self) -> Vec<u8> {
        let payload = CanonicalPayload {
            kind: match self.kind {
                RecordKind::Transfer => 0,
                RecordKind::Agreement { .. } => 1,
            },
            sender: &self.sender,
            receiver: &self.receiver,
            amount: self.amount.minor_units(),
            terms: self.terms(),
            nonce: self.nonce,
        };
        // Serializing plain integers and strings into a Vec cannot fail.
        bincode::serialize(&payload).unwrap_or_default()
    }

    /// Sign the record, replacing any previous signature.
    pub fn sign(&mut self, keypair: &Keypair) -> Result<()> {
        let signature = keypair.sign(&self.canonical_payload())?;
        debug!(
            sender = %self.sender,
            nonce = self.nonce,
            key = %keypair.public_key().fingerprint(),
            "signed record"
        );
        self.signature = Some(signature);
        Ok(())
    }

    /// Create a signed record.
    pub fn signed(mut self, keypair: &Keypair) -> Result<Self> {
        self.sign(keypair)?;
        Ok(self)
    }

    /// Check the signature against `public_key`. Unsigned records never verify.
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        match &self.signature {
            Some(signature) => public_key.verify(&self.canonical_payload(), signature),
            None => false,
        }
    }

    /// Structural checks for the record's kind.
    pub fn is_well_formed(&self) -> bool {
        if self.sender.is_empty() || self.receiver.is_empty() {
            return false;
        }
        match &self.kind {
            RecordKind::Transfer => !self.amount.is_zero(),
            RecordKind::Agreement { terms } => !terms.is_empty(),
        }
    }

    /// Well-formed and signed by the holder of `public_key`.
    pub fn is_valid(&self, public_key: &PublicKey) -> bool {
        self.is_well_formed() && self.verify(public_key)
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Length of the stored signature in bytes; zero when unsigned.
    pub fn signature_len(&self) -> usize {
        self.signature.map_or(0, |_| Signature::LENGTH)
    }

    /// Hash of the full record, signature included.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).unwrap_or_default();
        hash(&encoded)
    }
}
