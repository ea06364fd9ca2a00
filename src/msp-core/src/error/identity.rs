use crate::identity::IdentityIdentifier;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// No credential exists in the store for the requested identifier.
    #[error("user not found")]
    UserNotFound(IdentityIdentifier),

    #[error("failed to load credential for '{id}'")]
    LoadCredentialFailed {
        id: IdentityIdentifier,
        #[source]
        source: crate::error::store::UserStoreError,
    },

    #[error("failed to store credential for '{id}'")]
    StoreCredentialFailed {
        id: IdentityIdentifier,
        #[source]
        source: crate::error::store::UserStoreError,
    },

    #[error("enrollment certificate is not a valid X.509 certificate")]
    DecodeCertificateFailed(#[source] crate::error::endpoint::EndpointError),

    #[error("enrollment certificate does not carry a P-256 public key")]
    UnsupportedPublicKey,

    /// The certificate's public key does not match the key the crypto suite
    /// resolves for its SKI.
    #[error("certificate public key does not match the stored private key for '{0}'")]
    CertKeyMismatch(IdentityIdentifier),

    #[error("failed to resolve private key for '{id}'")]
    ResolveKeyFailed {
        id: IdentityIdentifier,
        #[source]
        source: crate::error::crypto::CryptoError,
    },
}
