//! Endpoint address helpers and TLS certificate configuration.
//!
//! Addresses in the network config may carry an explicit scheme
//! (`http(s)://` for the CA REST endpoints, `grpc(s)://` for peer/orderer
//! endpoints). An explicit scheme always decides whether the connection is
//! TLS-secured; a scheme-less address falls back to a caller-supplied
//! default.

use crate::error::endpoint::EndpointError;
use std::path::PathBuf;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

/// Whether the given address carries a scheme that forces TLS.
pub fn is_tls_enabled(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("grpcs://")
}

/// Strips a recognized gRPC scheme from the address. `http://`/`https://`
/// prefixes are kept intact: for those the HTTP transport owns scheme
/// handling itself.
pub fn to_address(url: &str) -> &str {
    if let Some(stripped) = url.strip_prefix("grpcs://") {
        stripped
    } else if let Some(stripped) = url.strip_prefix("grpc://") {
        stripped
    } else {
        url
    }
}

/// Whether a connection to `url` should attempt TLS. An explicit secure or
/// insecure scheme wins; a scheme-less address returns `default_secured`
/// unchanged.
pub fn attempt_secured(url: &str, default_secured: bool) -> bool {
    if is_tls_enabled(url) {
        true
    } else if url.starts_with("http://") || url.starts_with("grpc://") {
        false
    } else {
        default_secured
    }
}

/// A TLS certificate reference from the network config: either inline PEM
/// content or a path to a PEM file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub path: String,
    pub pem: String,
}

impl TlsConfig {
    pub fn from_pem(pem: impl Into<String>) -> Self {
        TlsConfig {
            path: String::new(),
            pem: pem.into(),
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        TlsConfig {
            path: path.into(),
            pem: String::new(),
        }
    }

    /// Raw certificate bytes: the inline PEM string verbatim if present,
    /// otherwise the file contents, otherwise empty. This is a pass-through;
    /// validity is checked only by [`TlsConfig::tls_cert`].
    pub fn bytes(&self) -> Result<Vec<u8>, EndpointError> {
        if !self.pem.is_empty() {
            Ok(self.pem.clone().into_bytes())
        } else if !self.path.is_empty() {
            let path = PathBuf::from(&self.path);
            crate::fs::read(&path).map_err(|err| EndpointError::ReadCertFileFailed(path, err))
        } else {
            Ok(vec![])
        }
    }

    /// Parses the configured bytes as an X.509 certificate and returns its
    /// DER encoding. Fails on empty or malformed input.
    pub fn tls_cert(&self) -> Result<Vec<u8>, EndpointError> {
        let bytes = self.bytes()?;
        if bytes.is_empty() {
            return Err(EndpointError::NoCertBytes);
        }
        let der = pem::parse(&bytes)
            .map_err(EndpointError::MalformedPem)?
            .contents;
        X509Certificate::from_der(&der).map_err(EndpointError::MalformedCertificate)?;
        Ok(der)
    }
}
