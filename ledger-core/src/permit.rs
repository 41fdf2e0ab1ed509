//! Signature-based permits
//!
//! This module provides:
//! - Ed25519 key pair generation and signing
//! - SHA-256 permit digests over canonical bincode bytes
//! - `SignedPermit` encoding for transport inside swap requests
//!
//! A permit lets an owner authorize a spender in the same transaction that
//! spends the allowance, instead of a separate approve call.

use crate::{
    types::{Address, Amount},
    Error, Result,
};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain separator mixed into every permit digest
const PERMIT_DOMAIN: &[u8] = b"ledger-core/permit/v1";

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Ledger address controlled by this key
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_bytes(self.signing_key.sign(message).to_bytes())
    }
}

/// Digital signature (Ed25519)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Verify signature
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> bool {
        let signature = DalekSignature::from_bytes(&self.bytes);

        let verifying_key = match VerifyingKey::from_bytes(public_key) {
            Ok(key) => key,
            Err(_) => return false,
        };

        verifying_key.verify(message, &signature).is_ok()
    }
}

/// Allowance grant signed by the asset owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    /// Asset the allowance applies to
    pub asset: Address,
    /// Owner granting the allowance
    pub owner: Address,
    /// Spender receiving the allowance
    pub spender: Address,
    /// Allowance value
    pub value: Amount,
    /// Owner's current permit nonce
    pub nonce: u64,
    /// Last valid second (unix)
    pub deadline: u64,
}

impl Permit {
    /// Digest that the owner signs
    pub fn digest(&self) -> Result<[u8; 32]> {
        let canonical = bincode::serialize(self)?;
        let mut hasher = Sha256::new();
        hasher.update(PERMIT_DOMAIN);
        hasher.update(&canonical);
        Ok(hasher.finalize().into())
    }

    /// Sign with the owner's key
    pub fn sign(self, keypair: &KeyPair) -> Result<SignedPermit> {
        let digest = self.digest()?;
        Ok(SignedPermit {
            signature: keypair.sign(&digest),
            public_key: keypair.public_key(),
            permit: self,
        })
    }
}

/// Permit plus the owner's public key and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPermit {
    /// Signed permit body
    pub permit: Permit,
    /// Signer's public key
    pub public_key: [u8; 32],
    /// Signature over `permit.digest()`
    pub signature: Signature,
}

impl SignedPermit {
    /// Check that the signer owns `permit.owner` and the signature is valid
    pub fn verify(&self) -> Result<()> {
        if Address::from_public_key(&self.public_key) != self.permit.owner {
            return Err(Error::InvalidPermit(format!(
                "signer does not control owner {}",
                self.permit.owner
            )));
        }

        let digest = self.permit.digest()?;
        if !self.signature.verify(&digest, &self.public_key) {
            return Err(Error::SignatureError("invalid permit signature".to_string()));
        }
        Ok(())
    }

    /// Encode for transport
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from transport bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| Error::InvalidPermit(format!("malformed permit data: {}", e)))
    }
}
