//! Typed network configuration.
//!
//! Parsing config files into these types is the config loader's job, outside
//! this crate; the core consumes an already-parsed [`NetworkConfig`] (or any
//! other [`CaClientConfig`] implementation) and never defaults a missing
//! value silently.

use crate::error::config::ConfigLookupError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub mod endpoint;

use endpoint::TlsConfig;

/// Credentials of the identity authorized to register and revoke on behalf
/// of an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollCredentials {
    pub enroll_id: String,
    #[serde(default)]
    pub enroll_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaConfig {
    pub url: String,
    #[serde(default)]
    pub ca_name: String,
    /// Server certificates the client pins when TLS is attempted.
    #[serde(default)]
    pub tls_ca_certs: Vec<TlsCertConfig>,
    #[serde(default)]
    pub client_cert: TlsCertConfig,
    #[serde(default)]
    pub client_key: TlsCertConfig,
    #[serde(default)]
    pub registrar: Option<EnrollCredentials>,
}

/// Serde-friendly mirror of [`TlsConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TlsCertConfig {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub pem: String,
}

impl From<TlsCertConfig> for TlsConfig {
    fn from(value: TlsCertConfig) -> Self {
        TlsConfig {
            path: value.path,
            pem: value.pem,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub msp_id: String,
    /// Names of CA entries, in preference order.
    #[serde(default)]
    pub certificate_authorities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub organizations: BTreeMap<String, OrganizationConfig>,
    #[serde(default)]
    pub certificate_authorities: BTreeMap<String, CaConfig>,
    /// Directory backing the file credential store.
    pub credential_store_path: PathBuf,
    /// Directory backing the software crypto suite's key store.
    pub key_store_path: PathBuf,
}

/// The configuration lookups the CA client performs at construction time.
/// Kept as a trait so tests can exercise each failing lookup independently.
pub trait CaClientConfig: Send + Sync {
    fn ca_config(&self, org: &str) -> Result<CaConfig, ConfigLookupError>;
    fn ca_server_certs(&self, org: &str) -> Result<Vec<TlsConfig>, ConfigLookupError>;
    fn ca_client_cert(&self, org: &str) -> Result<TlsConfig, ConfigLookupError>;
    fn ca_client_key(&self, org: &str) -> Result<TlsConfig, ConfigLookupError>;
    fn msp_id(&self, org: &str) -> Result<String, ConfigLookupError>;
}

impl NetworkConfig {
    // Config files commonly mix the display and key casing of org names.
    fn organization(&self, org: &str) -> Result<&OrganizationConfig, ConfigLookupError> {
        self.organizations
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(org))
            .map(|(_, cfg)| cfg)
            .ok_or_else(|| ConfigLookupError::OrganizationNotFound(org.to_string()))
    }
}

impl CaClientConfig for NetworkConfig {
    fn ca_config(&self, org: &str) -> Result<CaConfig, ConfigLookupError> {
        let org_config = self.organization(org)?;
        let ca_name = org_config
            .certificate_authorities
            .first()
            .ok_or_else(|| ConfigLookupError::NoCasConfigured(org.to_string()))?;
        self.certificate_authorities
            .get(ca_name)
            .cloned()
            .ok_or_else(|| ConfigLookupError::CaNotFound(ca_name.clone()))
    }

    fn ca_server_certs(&self, org: &str) -> Result<Vec<TlsConfig>, ConfigLookupError> {
        let ca = self.ca_config(org)?;
        Ok(ca.tls_ca_certs.into_iter().map(TlsConfig::from).collect())
    }

    fn ca_client_cert(&self, org: &str) -> Result<TlsConfig, ConfigLookupError> {
        let ca = self.ca_config(org)?;
        Ok(ca.client_cert.into())
    }

    fn ca_client_key(&self, org: &str) -> Result<TlsConfig, ConfigLookupError> {
        let ca = self.ca_config(org)?;
        Ok(ca.client_key.into())
    }

    fn msp_id(&self, org: &str) -> Result<String, ConfigLookupError> {
        Ok(self.organization(org)?.msp_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> NetworkConfig {
        let mut organizations = BTreeMap::new();
        organizations.insert(
            "Org1".to_string(),
            OrganizationConfig {
                msp_id: "Org1MSP".to_string(),
                certificate_authorities: vec!["ca.org1".to_string()],
            },
        );
        organizations.insert(
            "Org2".to_string(),
            OrganizationConfig {
                msp_id: "Org2MSP".to_string(),
                certificate_authorities: vec![],
            },
        );
        let mut certificate_authorities = BTreeMap::new();
        certificate_authorities.insert(
            "ca.org1".to_string(),
            CaConfig {
                url: "http://localhost:8054".to_string(),
                ..CaConfig::default()
            },
        );
        NetworkConfig {
            organizations,
            certificate_authorities,
            credential_store_path: PathBuf::from("/tmp/msp-store"),
            key_store_path: PathBuf::from("/tmp/msp-keys"),
        }
    }

    #[test]
    fn ca_config_lookup_is_case_insensitive() {
        let config = sample_config();
        assert!(config.ca_config("org1").is_ok());
        assert!(config.ca_config("ORG1").is_ok());
    }

    #[test]
    fn org_without_cas_is_reported() {
        let config = sample_config();
        let err = config.ca_config("Org2").unwrap_err();
        assert!(err.to_string().contains("no CAs configured"));
    }

    #[test]
    fn unknown_org_is_reported() {
        let config = sample_config();
        assert!(matches!(
            config.ca_config("Org3"),
            Err(ConfigLookupError::OrganizationNotFound(_))
        ));
    }
}
