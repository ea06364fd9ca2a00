use crate::error::crypto::CryptoError;
use crate::error::identity::IdentityError;
use crate::error::store::UserStoreError;
use crate::error::transport::TransportError;
use thiserror::Error;

/// Failure decoding a CA response body into its expected shape.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("CA response is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("CA reported failure: {0}")]
    CaFailure(String),

    #[error("CA response is missing field '{0}'")]
    MissingField(&'static str),

    #[error("CA response field '{field}' is not valid base64")]
    InvalidBase64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("CA response certificate is malformed")]
    InvalidCertificate(#[source] crate::error::endpoint::EndpointError),
}

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("enrollment ID required")]
    EnrollmentIdRequired,

    #[error("enrollment secret required")]
    EnrollmentSecretRequired,

    #[error("failed to generate enrollment key")]
    KeyGenFailed(#[source] CryptoError),

    #[error("failed to build certificate signing request")]
    CsrFailed(#[source] CryptoError),

    #[error("failed to encode enrollment request")]
    EncodeRequestFailed(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode enrollment response")]
    Response(#[source] ResponseError),

    /// The issued certificate failed the certificate/key consistency check.
    #[error("issued certificate failed validation")]
    Validation(#[source] IdentityError),

    #[error("failed to persist enrolled identity")]
    StoreFailed(#[source] UserStoreError),
}

#[derive(Error, Debug)]
pub enum ReenrollError {
    #[error("user name missing")]
    UserNameMissing,

    /// No prior enrollment exists under this name.
    #[error("no enrolled identity for '{0}'")]
    UserNotFound(String),

    #[error("failed to load the identity to reenroll")]
    LoadIdentityFailed(#[source] IdentityError),

    #[error("failed to generate reenrollment key")]
    KeyGenFailed(#[source] CryptoError),

    #[error("failed to build certificate signing request")]
    CsrFailed(#[source] CryptoError),

    #[error("failed to encode reenrollment request")]
    EncodeRequestFailed(#[source] serde_json::Error),

    #[error("failed to sign reenrollment request")]
    SignFailed(#[source] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode reenrollment response")]
    Response(#[source] ResponseError),

    #[error("reissued certificate failed validation")]
    Validation(#[source] IdentityError),

    #[error("failed to persist reenrolled identity")]
    StoreFailed(#[source] UserStoreError),
}

#[derive(Error, Debug)]
pub enum RegisterError {
    /// Distinguished sentinel: no registrar is configured for this CA, or the
    /// configured registrar cannot be resolved. Checked before the request is
    /// validated.
    #[error("CA registrar not found")]
    RegistrarNotFound,

    #[error("registration name required")]
    NameRequired,

    /// The registrar is configured but its bootstrap enrollment failed.
    #[error("failed to enroll CA registrar")]
    RegistrarEnrollFailed(#[source] Box<EnrollError>),

    #[error("failed to load CA registrar identity")]
    RegistrarLoadFailed(#[source] IdentityError),

    #[error("failed to encode registration request")]
    EncodeRequestFailed(#[source] serde_json::Error),

    #[error("failed to sign registration request")]
    SignFailed(#[source] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode registration response")]
    Response(#[source] ResponseError),
}

#[derive(Error, Debug)]
pub enum RevokeError {
    /// Same sentinel semantics as [`RegisterError::RegistrarNotFound`].
    #[error("CA registrar not found")]
    RegistrarNotFound,

    #[error("failed to enroll CA registrar")]
    RegistrarEnrollFailed(#[source] Box<EnrollError>),

    #[error("failed to load CA registrar identity")]
    RegistrarLoadFailed(#[source] IdentityError),

    #[error("failed to encode revocation request")]
    EncodeRequestFailed(#[source] serde_json::Error),

    #[error("failed to sign revocation request")]
    SignFailed(#[source] CryptoError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode revocation response")]
    Response(#[source] ResponseError),
}
