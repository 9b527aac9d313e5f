//! Ed25519 key material for signing and verifying ledger records.
//!
//! Keys are 256-bit Ed25519 keys. Messages are never signed directly: the
//! signer and the verifier both sign/check the Blake3 digest of the message
//! bytes. Signatures are deterministic per key, and verification uses the
//! strict (non-malleable) check.

use crate::hash::hash;
use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature")]
    InvalidSignature,
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LENGTH]);

mod signature_serde {
    use super::SIGNATURE_LENGTH;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; SIGNATURE_LENGTH], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde::Serialize::serialize(bytes.as_slice(), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; SIGNATURE_LENGTH], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice())
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        signature_serde::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Signature(signature_serde::deserialize(deserializer)?))
    }
}

impl Signature {
    pub const LENGTH: usize = SIGNATURE_LENGTH;

    /// Build a signature from untrusted bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        <[u8; SIGNATURE_LENGTH]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

/// The shareable half of a keypair.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "public_key_serde")] VerifyingKey);

mod public_key_serde {
    use ed25519_dalek::VerifyingKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(key: &VerifyingKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        key.to_bytes().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<VerifyingKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        VerifyingKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl PublicKey {
    /// Parse an encoded public key. Points that do not decompress are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr = <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Short identifier for log lines.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0.as_bytes()[..6])
    }

    /// Check `signature` over the digest of `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let digest = hash(message);
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0.verify_strict(digest.as_bytes(), &sig).is_ok()
    }

    /// Like [`PublicKey::verify`], for signature bytes of unknown shape.
    /// Any malformed input yields `false`.
    pub fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(sig) => self.verify(message, &sig),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

/// An owned Ed25519 keypair.
///
/// The signing half is zeroized when the keypair is dropped and there is no
/// accessor that hands it out.
pub struct Keypair {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Keypair {
    /// Key size in bits.
    pub const KEY_BITS: usize = SECRET_KEY_LENGTH * 8;

    /// Generate a new keypair from OS entropy.
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let keypair = Self::from_seed(&seed);
        seed.fill(0);
        Ok(keypair)
    }

    /// Restore a keypair from a 32-byte private key.
    pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
        let seed = <[u8; SECRET_KEY_LENGTH]>::try_from(bytes)
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_seed(&seed))
    }

    fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let public_key = PublicKey(signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign the digest of `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let digest = hash(message);
        self.signing_key
            .try_sign(digest.as_bytes())
            .map(|sig| Signature(sig.to_bytes()))
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::generate().unwrap();
        let sig = kp.sign(b"pay bob 10").unwrap();
        assert!(kp.public_key().verify(b"pay bob 10", &sig));
    }

    #[test]
    fn test_signatures_are_deterministic() {
        let kp = Keypair::generate().unwrap();
        assert_eq!(kp.sign(b"same").unwrap(), kp.sign(b"same").unwrap());
    }

    #[test]
    fn test_wrong_message_fails() {
        let kp = Keypair::generate().unwrap();
        let sig = kp.sign(b"hello").unwrap();
        assert!(!kp.public_key().verify(b"world", &sig));
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = Keypair::generate().unwrap();
        let kp2 = Keypair::generate().unwrap();
        let sig = kp1.sign(b"hello").unwrap();
        assert!(!kp2.public_key().verify(b"hello", &sig));
    }

    #[test]
    fn test_verify_bytes_rejects_malformed_signatures() {
        let kp = Keypair::generate().unwrap();
        let sig = kp.sign(b"msg").unwrap();

        assert!(kp.public_key().verify_bytes(b"msg", sig.as_bytes()));
        assert!(!kp.public_key().verify_bytes(b"msg", &[]));
        assert!(!kp.public_key().verify_bytes(b"msg", &sig.as_bytes()[..63]));
        assert!(!kp.public_key().verify_bytes(b"msg", &[0xff; 64]));
    }

    #[test]
    fn test_public_key_from_bytes() {
        let kp = Keypair::generate().unwrap();
        let bytes = kp.public_key().to_bytes();
        assert_eq!(&PublicKey::from_bytes(&bytes).unwrap(), kp.public_key());
        assert!(matches!(
            PublicKey::from_bytes(&bytes[..31]),
            Err(CryptoError::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_keypair_from_private_key() {
        let seed = [7u8; 32];
        let kp1 = Keypair::from_private_key(&seed).unwrap();
        let kp2 = Keypair::from_private_key(&seed).unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());

        assert!(matches!(
            Keypair::from_private_key(&seed[..16]),
            Err(CryptoError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_key_size() {
        assert_eq!(Keypair::KEY_BITS, 256);
    }
}
