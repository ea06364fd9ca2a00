use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("no TLS certificate bytes: both pem and path are empty")]
    NoCertBytes,

    #[error("failed to read TLS certificate file {0}")]
    ReadCertFileFailed(PathBuf, #[source] crate::error::fs::FsError),

    #[error("TLS certificate bytes are not valid PEM")]
    MalformedPem(#[source] pem::PemError),

    #[error("TLS certificate is not a valid X.509 certificate")]
    MalformedCertificate(#[source] x509_parser::nom::Err<x509_parser::error::X509Error>),
}
