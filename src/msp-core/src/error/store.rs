use crate::identity::IdentityIdentifier;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserStoreError {
    /// No credential is stored under the given identifier.
    #[error("user not found")]
    UserNotFound(IdentityIdentifier),

    #[error("failed to create credential store directory")]
    CreateStoreDirFailed(#[source] crate::error::fs::FsError),

    #[error("failed to read stored credential for '{id}'")]
    ReadCredentialFailed {
        id: IdentityIdentifier,
        #[source]
        source: crate::error::fs::FsError,
    },

    #[error("failed to write credential for '{id}'")]
    WriteCredentialFailed {
        id: IdentityIdentifier,
        #[source]
        source: crate::error::fs::FsError,
    },

    #[error("failed to delete credential for '{id}'")]
    DeleteCredentialFailed {
        id: IdentityIdentifier,
        #[source]
        source: crate::error::fs::FsError,
    },
}
