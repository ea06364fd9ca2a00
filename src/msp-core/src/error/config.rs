use thiserror::Error;

/// A single configuration lookup that did not produce a value.
#[derive(Error, Debug)]
pub enum ConfigLookupError {
    #[error("no CA associated with organization '{0}'")]
    CaNotFound(String),

    #[error("organization '{0}' is not present in the network config")]
    OrganizationNotFound(String),

    #[error("no CAs configured for organization '{0}'")]
    NoCasConfigured(String),

    #[error("{0}")]
    Other(String),
}

/// Errors resolving the CA client's configuration at construction time.
///
/// The lookups happen in a fixed order (CA config, server certs, client cert,
/// client key) and each failure names the lookup that failed.
#[derive(Error, Debug)]
pub enum CaClientCreateError {
    #[error("failed to resolve CA config for organization '{org}'")]
    CaConfigFailed {
        org: String,
        #[source]
        source: ConfigLookupError,
    },

    #[error("failed to resolve CA server TLS certs for organization '{org}'")]
    CaServerCertsFailed {
        org: String,
        #[source]
        source: ConfigLookupError,
    },

    #[error("failed to resolve CA client TLS cert for organization '{org}'")]
    CaClientCertFailed {
        org: String,
        #[source]
        source: ConfigLookupError,
    },

    #[error("failed to resolve CA client TLS key for organization '{org}'")]
    CaClientKeyFailed {
        org: String,
        #[source]
        source: ConfigLookupError,
    },

    #[error("failed to resolve MSP ID for organization '{org}'")]
    MspIdFailed {
        org: String,
        #[source]
        source: ConfigLookupError,
    },

    #[error("failed to load CA server certificate")]
    LoadServerCertFailed(#[source] crate::error::endpoint::EndpointError),

    #[error("failed to load CA client TLS material")]
    LoadClientTlsFailed(#[source] crate::error::endpoint::EndpointError),

    #[error("failed to build the CA transport")]
    BuildTransportFailed(#[source] crate::error::transport::TransportError),
}
