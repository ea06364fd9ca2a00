//! Signing identities and their construction from stored credentials.

use crate::crypto::software::ski_from_public_point;
use crate::crypto::{CryptoSuite, KeyRef, Ski};
use crate::error::crypto::CryptoError;
use crate::error::endpoint::EndpointError;
use crate::error::identity::IdentityError;
use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

pub mod identity_manager;
pub mod user_store;

pub use identity_manager::IdentityManager;
pub use user_store::{CertFileUserStore, InMemoryUserStore, UserStore};

/// Unique key for a stored identity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityIdentifier {
    pub msp_id: String,
    pub id: String,
}

impl IdentityIdentifier {
    pub fn new(msp_id: impl Into<String>, id: impl Into<String>) -> Self {
        IdentityIdentifier {
            msp_id: msp_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for IdentityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.msp_id)
    }
}

/// The persisted form of an enrolled identity: identifier plus PEM
/// enrollment certificate. The private key is never part of this record; it
/// is re-resolved through the crypto suite by the SKI recovered from the
/// certificate's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub id: IdentityIdentifier,
    pub enrollment_certificate: Vec<u8>,
}

/// A validated signing identity. Sign/verify delegate to the crypto suite
/// holding the private key; `User` itself carries no key material and every
/// caller gets an independent copy.
#[derive(Clone)]
pub struct User {
    id: IdentityIdentifier,
    enrollment_certificate: Vec<u8>,
    key: KeyRef,
    crypto_suite: Arc<dyn CryptoSuite>,
}

impl User {
    pub(crate) fn new(
        id: IdentityIdentifier,
        enrollment_certificate: Vec<u8>,
        key: KeyRef,
        crypto_suite: Arc<dyn CryptoSuite>,
    ) -> Self {
        User {
            id,
            enrollment_certificate,
            key,
            crypto_suite,
        }
    }

    pub fn identifier(&self) -> &IdentityIdentifier {
        &self.id
    }

    pub fn msp_id(&self) -> &str {
        &self.id.msp_id
    }

    pub fn name(&self) -> &str {
        &self.id.id
    }

    pub fn enrollment_certificate(&self) -> &[u8] {
        &self.enrollment_certificate
    }

    pub fn key_ref(&self) -> &KeyRef {
        &self.key
    }

    /// Signs a message (hashed by the suite) with this identity's key.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let digest = self.crypto_suite.hash(message);
        self.crypto_suite.sign(&self.key, &digest)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let digest = self.crypto_suite.hash(message);
        let public_key = self.crypto_suite.public_key(&self.key)?;
        self.crypto_suite.verify(&public_key, &digest, signature)
    }

    pub fn public_key(&self) -> Result<Vec<u8>, CryptoError> {
        self.crypto_suite.public_key(&self.key)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User").field("id", &self.id).finish()
    }
}

/// Public key point and SKI recovered from an enrollment certificate.
pub(crate) struct DecodedCertificate {
    pub public_point: Vec<u8>,
    pub ski: Ski,
}

pub(crate) fn decode_enrollment_certificate(
    cert: &[u8],
) -> Result<DecodedCertificate, IdentityError> {
    let der = pem::parse(cert)
        .map_err(|err| IdentityError::DecodeCertificateFailed(EndpointError::MalformedPem(err)))?
        .contents;
    let (_, x509) = X509Certificate::from_der(&der).map_err(|err| {
        IdentityError::DecodeCertificateFailed(EndpointError::MalformedCertificate(err))
    })?;

    let point = x509.public_key().subject_public_key.data.to_vec();
    // Reject anything that is not a P-256 point before deriving an SKI.
    VerifyingKey::from_sec1_bytes(&point).map_err(|_| IdentityError::UnsupportedPublicKey)?;

    let ski = ski_from_public_point(&point);
    Ok(DecodedCertificate {
        public_point: point,
        ski,
    })
}
