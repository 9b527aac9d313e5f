//! Wallets: key ownership and record issuance.

use crate::amount::Amount;
use crate::crypto::{Keypair, PublicKey, Result};
use crate::record::{Contract, Record, RecordKind, Transaction};
use std::fmt;

/// An identity holding one keypair.
///
/// The wallet is the only owner of its private key; records leave it already
/// signed. The balance is what this wallet has observed, not chain state.
pub struct Wallet {
    id: String,
    keypair: Keypair,
    balance: Amount,
    /// Nonce of the last issued record.
    nonce: u64,
}

impl Wallet {
    /// Create a wallet with a freshly generated keypair.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        Ok(Self::with_keypair(id, Keypair::generate()?))
    }

    /// Create a wallet around an existing keypair.
    pub fn with_keypair(id: impl Into<String>, keypair: Keypair) -> Self {
        Self {
            id: id.into(),
            keypair,
            balance: Amount::ZERO,
            nonce: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keypair.public_key()
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Nonce the next issued record will carry.
    pub fn next_nonce(&self) -> u64 {
        self.nonce + 1
    }

    /// Issue a signed transfer to `receiver`.
    pub fn send_funds(&mut self, receiver: &str, amount: Amount) -> Result<Transaction> {
        let record = Record::transfer(self.id.clone(), receiver, amount, self.next_nonce());
        self.issue(record)
    }

    /// Issue a signed contract agreement with `receiver`.
    pub fn propose_contract(
        &mut self,
        receiver: &str,
        amount: Amount,
        terms: impl Into<String>,
    ) -> Result<Contract> {
        let record = Record::agreement(self.id.clone(), receiver, amount, terms, self.next_nonce());
        self.issue(record)
    }

    fn issue(&mut self, record: Record) -> Result<Record> {
        let record = record.signed(&self.keypair)?;
        self.nonce = record.nonce;
        Ok(record)
    }

    /// Apply observed transfers to the local balance.
    ///
    /// Incoming transfers credit, outgoing ones debit (floored at zero).
    /// Agreements move no funds and are skipped.
    pub fn update_balance<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a Record>,
    {
        for record in records {
            if record.kind != RecordKind::Transfer {
                continue;
            }
            if record.receiver == self.id {
                self.balance = self.balance.saturating_add(record.amount);
            }
            if record.sender == self.id {
                self.balance = self.balance.saturating_sub(record.amount);
            }
        }
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("id", &self.id)
            .field("public_key", self.public_key())
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_funds_signs_with_wallet_key() {
        let mut alice = Wallet::new("alice").unwrap();
        let bob = Wallet::new("bob").unwrap();

        let tx = alice
            .send_funds(bob.id(), Amount::from_whole(10).unwrap())
            .unwrap();

        assert_eq!(tx.sender, "alice");
        assert_eq!(tx.receiver, "bob");
        assert_eq!(tx.nonce, 1);
        assert!(tx.is_signed());
        assert!(tx.is_valid(alice.public_key()));
        assert!(!tx.is_valid(bob.public_key()));
    }

    #[test]
    fn test_nonces_increase() {
        let mut alice = Wallet::new("alice").unwrap();
        let one = Amount::from_whole(1).unwrap();

        let first = alice.send_funds("bob", one).unwrap();
        let second = alice.propose_contract("bob", one, "rent").unwrap();

        assert_eq!(first.nonce, 1);
        assert_eq!(second.nonce, 2);
        assert_eq!(alice.next_nonce(), 3);
        assert!(second.is_valid(alice.public_key()));
    }

    #[test]
    fn test_update_balance() {
        let mut alice = Wallet::new("alice").unwrap();
        let mut bob = Wallet::new("bob").unwrap();
        let ten = Amount::from_whole(10).unwrap();
        let four = Amount::from_whole(4).unwrap();

        let records = vec![
            Record::transfer("mint", "alice", ten, 1),
            alice.send_funds("bob", four).unwrap(),
            alice.propose_contract("bob", ten, "lease").unwrap(),
        ];

        alice.update_balance(&records);
        bob.update_balance(&records);

        assert_eq!(alice.balance(), Amount::from_whole(6).unwrap());
        assert_eq!(bob.balance(), four);
    }

    #[test]
    fn test_debug_hides_private_key() {
        let wallet = Wallet::new("alice").unwrap();
        let debug = format!("{wallet:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("signing_key"));
    }
}
