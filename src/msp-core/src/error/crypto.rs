use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("failed to create key store directory {0}")]
    CreateKeyStoreFailed(PathBuf, #[source] crate::error::fs::FsError),

    #[error("no key found for SKI {0}")]
    KeyNotFound(String),

    #[error("failed to decode private key {0}")]
    DecodePrivateKeyFailed(PathBuf, #[source] p256::pkcs8::Error),

    #[error("failed to encode generated private key")]
    EncodePrivateKeyFailed(#[source] p256::pkcs8::Error),

    #[error("failed to persist private key {0}")]
    PersistKeyFailed(PathBuf, #[source] crate::error::fs::FsError),

    #[error("failed to read key store")]
    ReadKeyStoreFailed(#[source] crate::error::fs::FsError),

    #[error("signing failed for SKI {0}")]
    SignFailed(String, #[source] p256::ecdsa::Error),

    #[error("signature bytes are not valid DER ECDSA")]
    MalformedSignature(#[source] p256::ecdsa::Error),

    #[error("public key bytes are not a valid P-256 point")]
    MalformedPublicKey(#[source] p256::ecdsa::Error),

    #[error("failed to build certificate signing request")]
    CsrGenerationFailed(#[source] rcgen::Error),
}
