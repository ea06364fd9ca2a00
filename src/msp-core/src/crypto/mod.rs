//! Pluggable cryptographic backend.
//!
//! The CA client and identity manager only ever see the [`CryptoSuite`]
//! trait; [`SoftwareCryptoSuite`] is the file-keystore-backed P-256
//! implementation selected at construction time. Private key material never
//! leaves the suite: callers hold an opaque [`KeyRef`] and ask the suite to
//! sign with it.

use crate::error::crypto::CryptoError;
use std::fmt;

pub mod software;

pub use software::SoftwareCryptoSuite;

/// Subject key identifier: SHA-256 of the uncompressed public key point.
/// Also the name under which the suite's key store files the private key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ski([u8; 32]);

impl Ski {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Ski(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Ski {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Ski {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ski({})", self.to_hex())
    }
}

/// Opaque handle to a private key resolvable by the crypto suite that issued
/// it. Carries no key material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRef {
    ski: Ski,
}

impl KeyRef {
    pub(crate) fn new(ski: Ski) -> Self {
        KeyRef { ski }
    }

    pub fn ski(&self) -> &Ski {
        &self.ski
    }
}

pub trait CryptoSuite: Send + Sync {
    /// Generates and persists a fresh P-256 key pair.
    fn key_gen(&self) -> Result<KeyRef, CryptoError>;

    /// Resolves a previously generated key by its SKI.
    fn get_key(&self, ski: &Ski) -> Result<KeyRef, CryptoError>;

    /// Uncompressed SEC1 public key point for the given key.
    fn public_key(&self, key: &KeyRef) -> Result<Vec<u8>, CryptoError>;

    /// Signs a 32-byte digest, returning a DER-encoded ECDSA signature.
    fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verifies a DER-encoded ECDSA signature over a 32-byte digest against
    /// an uncompressed SEC1 public key point.
    fn verify(&self, public_key: &[u8], digest: &[u8], signature: &[u8])
        -> Result<bool, CryptoError>;

    /// SHA-256 of the message.
    fn hash(&self, message: &[u8]) -> [u8; 32];

    /// Builds a PEM-encoded PKCS#10 certificate signing request binding the
    /// given key to `common_name`.
    fn create_csr(&self, key: &KeyRef, common_name: &str) -> Result<String, CryptoError>;
}
