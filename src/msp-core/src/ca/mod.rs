//! Client for a certificate authority's REST protocol.
//!
//! One [`CaClient`] serves one organization's CA. Enrollment authenticates
//! with the one-time secret over basic auth; reenroll, register, and revoke
//! authenticate with a token signed by an already-enrolled identity.
//!
//! Issued certificates are validated against the key store before anything
//! is persisted, so a bad CA response leaves the credential store untouched.

use crate::config::endpoint::TlsConfig;
use crate::config::{CaClientConfig, CaConfig, EnrollCredentials};
use crate::crypto::CryptoSuite;
use crate::error::ca::{EnrollError, ReenrollError, RegisterError, RevokeError};
use crate::error::config::CaClientCreateError;
use crate::error::identity::IdentityError;
use crate::identity::{IdentityIdentifier, IdentityManager, User, UserData};
use slog::{debug, info, Logger};
use std::sync::Arc;

pub mod api;
pub mod transport;

pub use api::{
    Attribute, RegistrationRequest, RevocationRequest, RevocationResponse, RevokedCert,
};
pub use transport::{Authorization, CaRequest, CaTransport, HttpTransport, Operation, RequestContext};

pub struct CaClient {
    org_name: String,
    msp_id: String,
    ca_name: String,
    registrar: Option<EnrollCredentials>,
    identity_manager: Arc<IdentityManager>,
    crypto_suite: Arc<dyn CryptoSuite>,
    transport: Arc<dyn CaTransport>,
    logger: Logger,
}

impl std::fmt::Debug for CaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaClient")
            .field("org_name", &self.org_name)
            .field("msp_id", &self.msp_id)
            .field("ca_name", &self.ca_name)
            .finish()
    }
}

/// Configuration resolved at construction time, in a fixed lookup order so
/// a broken config fails on the first missing piece.
struct ResolvedConfig {
    ca: CaConfig,
    server_certs: Vec<TlsConfig>,
    client_cert: TlsConfig,
    client_key: TlsConfig,
    msp_id: String,
}

fn resolve_config(
    org_name: &str,
    config: &dyn CaClientConfig,
) -> Result<ResolvedConfig, CaClientCreateError> {
    let ca = config
        .ca_config(org_name)
        .map_err(|source| CaClientCreateError::CaConfigFailed {
            org: org_name.to_string(),
            source,
        })?;
    let server_certs =
        config
            .ca_server_certs(org_name)
            .map_err(|source| CaClientCreateError::CaServerCertsFailed {
                org: org_name.to_string(),
                source,
            })?;
    let client_cert =
        config
            .ca_client_cert(org_name)
            .map_err(|source| CaClientCreateError::CaClientCertFailed {
                org: org_name.to_string(),
                source,
            })?;
    let client_key =
        config
            .ca_client_key(org_name)
            .map_err(|source| CaClientCreateError::CaClientKeyFailed {
                org: org_name.to_string(),
                source,
            })?;
    let msp_id = config
        .msp_id(org_name)
        .map_err(|source| CaClientCreateError::MspIdFailed {
            org: org_name.to_string(),
            source,
        })?;
    Ok(ResolvedConfig {
        ca,
        server_certs,
        client_cert,
        client_key,
        msp_id,
    })
}

impl CaClient {
    /// Builds a client with an HTTPS transport derived from the config's TLS
    /// material.
    pub fn new(
        org_name: &str,
        config: &dyn CaClientConfig,
        identity_manager: Arc<IdentityManager>,
        crypto_suite: Arc<dyn CryptoSuite>,
        logger: Logger,
    ) -> Result<Self, CaClientCreateError> {
        let resolved = resolve_config(org_name, config)?;

        let server_cert_bytes = resolved
            .server_certs
            .iter()
            .map(TlsConfig::bytes)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CaClientCreateError::LoadServerCertFailed)?;
        let client_cert_bytes = resolved
            .client_cert
            .bytes()
            .map_err(CaClientCreateError::LoadClientTlsFailed)?;
        let client_key_bytes = resolved
            .client_key
            .bytes()
            .map_err(CaClientCreateError::LoadClientTlsFailed)?;

        let urls = vec![resolved.ca.url.clone()];
        let transport = HttpTransport::new(
            &urls,
            &server_cert_bytes,
            &client_cert_bytes,
            &client_key_bytes,
        )
        .map_err(CaClientCreateError::BuildTransportFailed)?;

        Ok(Self::from_resolved(
            org_name,
            resolved,
            identity_manager,
            crypto_suite,
            Arc::new(transport),
            logger,
        ))
    }

    /// Builds a client over a caller-supplied transport. Configuration is
    /// resolved exactly as [`CaClient::new`] does.
    pub fn with_transport(
        org_name: &str,
        config: &dyn CaClientConfig,
        identity_manager: Arc<IdentityManager>,
        crypto_suite: Arc<dyn CryptoSuite>,
        transport: Arc<dyn CaTransport>,
        logger: Logger,
    ) -> Result<Self, CaClientCreateError> {
        let resolved = resolve_config(org_name, config)?;
        Ok(Self::from_resolved(
            org_name,
            resolved,
            identity_manager,
            crypto_suite,
            transport,
            logger,
        ))
    }

    fn from_resolved(
        org_name: &str,
        resolved: ResolvedConfig,
        identity_manager: Arc<IdentityManager>,
        crypto_suite: Arc<dyn CryptoSuite>,
        transport: Arc<dyn CaTransport>,
        logger: Logger,
    ) -> Self {
        CaClient {
            org_name: org_name.to_string(),
            msp_id: resolved.msp_id,
            ca_name: resolved.ca.ca_name,
            registrar: resolved.ca.registrar,
            identity_manager,
            crypto_suite,
            transport,
            logger,
        }
    }

    pub fn org_name(&self) -> &str {
        &self.org_name
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Enrolls `enrollment_id` with the CA: generates a fresh key pair,
    /// submits a CSR authenticated by the one-time `secret`, validates the
    /// issued certificate against the generated key, and persists the
    /// credential. On any failure the store is left untouched.
    pub async fn enroll(
        &self,
        enrollment_id: &str,
        secret: &str,
        ctx: &RequestContext,
    ) -> Result<(), EnrollError> {
        if enrollment_id.is_empty() {
            return Err(EnrollError::EnrollmentIdRequired);
        }
        if secret.is_empty() {
            return Err(EnrollError::EnrollmentSecretRequired);
        }

        let key = self.crypto_suite.key_gen().map_err(EnrollError::KeyGenFailed)?;
        let csr = self
            .crypto_suite
            .create_csr(&key, enrollment_id)
            .map_err(EnrollError::CsrFailed)?;
        let body = serde_json::to_vec(&api::EnrollmentRequestBody {
            certificate_request: &csr,
            caname: &self.ca_name,
        })
        .map_err(EnrollError::EncodeRequestFailed)?;

        debug!(
            self.logger,
            "enrolling '{}' with CA '{}'", enrollment_id, self.ca_name
        );
        let request = CaRequest {
            operation: Operation::Enroll,
            body,
            authorization: Authorization::Basic {
                user: enrollment_id.to_string(),
                secret: secret.to_string(),
            },
        };
        let response = self.transport.send(&request, ctx).await?;
        let certificate = api::decode_enrollment(&response).map_err(EnrollError::Response)?;

        let user_data = UserData {
            id: IdentityIdentifier::new(&self.msp_id, enrollment_id),
            enrollment_certificate: certificate,
        };
        match self.identity_manager.create_identity(&user_data) {
            Ok(_) => {
                info!(self.logger, "enrolled '{}'", user_data.id);
                Ok(())
            }
            Err(IdentityError::StoreCredentialFailed { source, .. }) => {
                Err(EnrollError::StoreFailed(source))
            }
            Err(err) => Err(EnrollError::Validation(err)),
        }
    }

    /// Reenrolls an existing identity: the current certificate authenticates
    /// the request, a fresh key pair backs the new certificate, and the
    /// stored credential is replaced only after the reissued certificate
    /// validates.
    pub async fn reenroll(&self, name: &str, ctx: &RequestContext) -> Result<(), ReenrollError> {
        if name.is_empty() {
            return Err(ReenrollError::UserNameMissing);
        }

        let id = IdentityIdentifier::new(&self.msp_id, name);
        let user = self
            .identity_manager
            .get_signing_identity(&id)
            .map_err(|err| match err {
                IdentityError::UserNotFound(_) => ReenrollError::UserNotFound(name.to_string()),
                other => ReenrollError::LoadIdentityFailed(other),
            })?;

        let key = self
            .crypto_suite
            .key_gen()
            .map_err(ReenrollError::KeyGenFailed)?;
        let csr = self
            .crypto_suite
            .create_csr(&key, name)
            .map_err(ReenrollError::CsrFailed)?;
        let body = serde_json::to_vec(&api::EnrollmentRequestBody {
            certificate_request: &csr,
            caname: &self.ca_name,
        })
        .map_err(ReenrollError::EncodeRequestFailed)?;
        let token = api::auth_token(
            user.enrollment_certificate(),
            self.crypto_suite.as_ref(),
            user.key_ref(),
            &body,
        )
        .map_err(ReenrollError::SignFailed)?;

        debug!(self.logger, "reenrolling '{}'", id);
        let request = CaRequest {
            operation: Operation::Reenroll,
            body,
            authorization: Authorization::Token(token),
        };
        let response = self.transport.send(&request, ctx).await?;
        let certificate = api::decode_enrollment(&response).map_err(ReenrollError::Response)?;

        let user_data = UserData {
            id,
            enrollment_certificate: certificate,
        };
        match self.identity_manager.create_identity(&user_data) {
            Ok(_) => {
                info!(self.logger, "reenrolled '{}'", user_data.id);
                Ok(())
            }
            Err(IdentityError::StoreCredentialFailed { source, .. }) => {
                Err(ReenrollError::StoreFailed(source))
            }
            Err(err) => Err(ReenrollError::Validation(err)),
        }
    }

    /// Registers a new identity with the CA on the registrar's authority and
    /// returns the enrollment secret (the caller's if one was supplied, the
    /// CA-generated one otherwise). The registrar is resolved before the
    /// request is validated.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
        ctx: &RequestContext,
    ) -> Result<String, RegisterError> {
        let registrar = self.registrar(ctx).await.map_err(|err| match err {
            RegistrarError::NotFound => RegisterError::RegistrarNotFound,
            RegistrarError::Load(err) => RegisterError::RegistrarLoadFailed(err),
            RegistrarError::Enroll(err) => RegisterError::RegistrarEnrollFailed(err),
        })?;

        if request.name.is_empty() {
            return Err(RegisterError::NameRequired);
        }

        let attrs = request
            .attributes
            .iter()
            .map(|attr| api::WireAttribute {
                name: &attr.key,
                value: &attr.value,
            })
            .collect();
        let ca_name = if request.ca_name.is_empty() {
            &self.ca_name
        } else {
            &request.ca_name
        };
        let body = serde_json::to_vec(&api::RegistrationRequestBody {
            id: &request.name,
            identity_type: &request.r#type,
            secret: request.secret.as_deref(),
            max_enrollments: request.max_enrollments,
            affiliation: &request.affiliation,
            attrs,
            caname: ca_name,
        })
        .map_err(RegisterError::EncodeRequestFailed)?;
        let token = api::auth_token(
            registrar.enrollment_certificate(),
            self.crypto_suite.as_ref(),
            registrar.key_ref(),
            &body,
        )
        .map_err(RegisterError::SignFailed)?;

        debug!(self.logger, "registering '{}'", request.name);
        let wire_request = CaRequest {
            operation: Operation::Register,
            body,
            authorization: Authorization::Token(token),
        };
        let response = self.transport.send(&wire_request, ctx).await?;
        let secret = api::decode_registration(&response).map_err(RegisterError::Response)?;
        info!(self.logger, "registered '{}'", request.name);
        Ok(secret)
    }

    /// Revokes a certificate or identity on the registrar's authority and
    /// returns the CA's revocation result. Target validation is the CA's
    /// job; only the registrar is resolved locally.
    pub async fn revoke(
        &self,
        request: &RevocationRequest,
        ctx: &RequestContext,
    ) -> Result<RevocationResponse, RevokeError> {
        let registrar = self.registrar(ctx).await.map_err(|err| match err {
            RegistrarError::NotFound => RevokeError::RegistrarNotFound,
            RegistrarError::Load(err) => RevokeError::RegistrarLoadFailed(err),
            RegistrarError::Enroll(err) => RevokeError::RegistrarEnrollFailed(err),
        })?;

        let ca_name = if request.ca_name.is_empty() {
            &self.ca_name
        } else {
            &request.ca_name
        };
        let body = serde_json::to_vec(&api::RevocationRequestBody {
            id: &request.name,
            serial: &request.serial,
            aki: &request.aki,
            reason: &request.reason,
            caname: ca_name,
        })
        .map_err(RevokeError::EncodeRequestFailed)?;
        let token = api::auth_token(
            registrar.enrollment_certificate(),
            self.crypto_suite.as_ref(),
            registrar.key_ref(),
            &body,
        )
        .map_err(RevokeError::SignFailed)?;

        debug!(self.logger, "revoking '{}'", request.name);
        let wire_request = CaRequest {
            operation: Operation::Revoke,
            body,
            authorization: Authorization::Token(token),
        };
        let response = self.transport.send(&wire_request, ctx).await?;
        let revocation = api::decode_revocation(&response).map_err(RevokeError::Response)?;
        info!(
            self.logger,
            "revoked {} certificate(s) for '{}'",
            revocation.revoked_certs.len(),
            request.name
        );
        Ok(revocation)
    }

    /// Resolves the registrar's signing identity. A registrar that is
    /// configured with a secret but not yet enrolled is bootstrap-enrolled
    /// on first use.
    async fn registrar(&self, ctx: &RequestContext) -> Result<User, RegistrarError> {
        let credentials = match &self.registrar {
            Some(credentials) if !credentials.enroll_id.is_empty() => credentials.clone(),
            _ => return Err(RegistrarError::NotFound),
        };

        let id = IdentityIdentifier::new(&self.msp_id, &credentials.enroll_id);
        match self.identity_manager.get_signing_identity(&id) {
            Ok(user) => Ok(user),
            Err(IdentityError::UserNotFound(_)) => {
                if credentials.enroll_secret.is_empty() {
                    return Err(RegistrarError::NotFound);
                }
                self.enroll(&credentials.enroll_id, &credentials.enroll_secret, ctx)
                    .await
                    .map_err(|err| RegistrarError::Enroll(Box::new(err)))?;
                self.identity_manager
                    .get_signing_identity(&id)
                    .map_err(RegistrarError::Load)
            }
            Err(other) => Err(RegistrarError::Load(other)),
        }
    }
}

enum RegistrarError {
    NotFound,
    Load(IdentityError),
    Enroll(Box<EnrollError>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, OrganizationConfig};
    use crate::crypto::SoftwareCryptoSuite;
    use crate::error::config::ConfigLookupError;
    use crate::error::transport::TransportError;
    use crate::identity::{InMemoryUserStore, UserStore};
    use crate::test_fixture::{discard_logger, MockCaTransport};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    const REGISTRAR: &str = "admin";
    const REGISTRAR_SECRET: &str = "adminpw";

    fn network_config(registrar: Option<EnrollCredentials>) -> NetworkConfig {
        let mut organizations = BTreeMap::new();
        organizations.insert(
            "Org1".to_string(),
            OrganizationConfig {
                msp_id: "Org1MSP".to_string(),
                certificate_authorities: vec!["ca.org1".to_string()],
            },
        );
        let mut certificate_authorities = BTreeMap::new();
        certificate_authorities.insert(
            "ca.org1".to_string(),
            CaConfig {
                url: "https://ca.org1.example.com:7054".to_string(),
                ca_name: "ca-org1".to_string(),
                registrar,
                ..CaConfig::default()
            },
        );
        NetworkConfig {
            organizations,
            certificate_authorities,
            credential_store_path: PathBuf::from("unused"),
            key_store_path: PathBuf::from("unused"),
        }
    }

    fn registrar_credentials() -> EnrollCredentials {
        EnrollCredentials {
            enroll_id: REGISTRAR.to_string(),
            enroll_secret: REGISTRAR_SECRET.to_string(),
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<dyn UserStore>,
        transport: Arc<MockCaTransport>,
        client: CaClient,
    }

    fn fixture_with(
        registrar: Option<EnrollCredentials>,
        transport: Arc<MockCaTransport>,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let suite: Arc<dyn CryptoSuite> =
            Arc::new(SoftwareCryptoSuite::new(dir.path().join("keystore")).unwrap());
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let manager = Arc::new(IdentityManager::new(
            "Org1MSP",
            Arc::clone(&store),
            Arc::clone(&suite),
            discard_logger(),
        ));
        let config = network_config(registrar);
        let client = CaClient::with_transport(
            "Org1",
            &config,
            manager,
            suite,
            Arc::clone(&transport) as Arc<dyn CaTransport>,
            discard_logger(),
        )
        .unwrap();
        Fixture {
            _dir: dir,
            store,
            transport,
            client,
        }
    }

    fn fixture(registrar: Option<EnrollCredentials>) -> Fixture {
        fixture_with(registrar, Arc::new(MockCaTransport::new()))
    }

    #[tokio::test]
    async fn enroll_rejects_empty_id_without_network() {
        let f = fixture(None);
        let ctx = RequestContext::new();
        assert!(matches!(
            f.client.enroll("", "secret", &ctx).await,
            Err(EnrollError::EnrollmentIdRequired)
        ));
        assert!(matches!(
            f.client.enroll("alice", "", &ctx).await,
            Err(EnrollError::EnrollmentSecretRequired)
        ));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn enroll_persists_validated_credential() {
        let f = fixture(None);
        f.client
            .enroll("alice", "alicepw", &RequestContext::new())
            .await
            .unwrap();

        let id = IdentityIdentifier::new("Org1MSP", "alice");
        let stored = f.store.load(&id).unwrap();
        assert!(stored
            .enrollment_certificate
            .starts_with(b"-----BEGIN CERTIFICATE-----"));
        assert_eq!(f.transport.calls(), 1);
    }

    #[tokio::test]
    async fn enroll_failure_leaves_store_untouched() {
        let transport = Arc::new(MockCaTransport::new().failing("enrollment refused"));
        let f = fixture_with(None, transport);
        let err = f
            .client
            .enroll("alice", "alicepw", &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollError::Response(_)));

        let id = IdentityIdentifier::new("Org1MSP", "alice");
        assert!(!f.store.exists(&id).unwrap());
    }

    #[tokio::test]
    async fn reenroll_requires_a_name() {
        let f = fixture(None);
        let err = f
            .client
            .reenroll("", &RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "user name missing");
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn reenroll_unknown_user_is_not_found() {
        let f = fixture(None);
        assert!(matches!(
            f.client.reenroll("ghost", &RequestContext::new()).await,
            Err(ReenrollError::UserNotFound(name)) if name == "ghost"
        ));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn reenroll_replaces_the_stored_certificate() {
        let f = fixture(None);
        let ctx = RequestContext::new();
        f.client.enroll("alice", "alicepw", &ctx).await.unwrap();

        let id = IdentityIdentifier::new("Org1MSP", "alice");
        let first = f.store.load(&id).unwrap().enrollment_certificate;

        f.client.reenroll("alice", &ctx).await.unwrap();
        let second = f.store.load(&id).unwrap().enrollment_certificate;
        assert_ne!(first, second);
        assert_eq!(f.transport.calls(), 2);
    }

    #[tokio::test]
    async fn register_without_registrar_is_sentinel_for_any_request() {
        let f = fixture(None);
        let ctx = RequestContext::new();

        // Registrar is checked before the request, so an empty and a fully
        // formed request fail identically.
        let empty = f
            .client
            .register(&RegistrationRequest::default(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(empty, RegisterError::RegistrarNotFound));

        let full = f
            .client
            .register(
                &RegistrationRequest {
                    name: "bob".to_string(),
                    r#type: "client".to_string(),
                    affiliation: "org1.dept1".to_string(),
                    attributes: vec![Attribute::new("role", "auditor")],
                    max_enrollments: 3,
                    secret: None,
                    ca_name: String::new(),
                },
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(full, RegisterError::RegistrarNotFound));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn register_validates_name_after_registrar() {
        let f = fixture(Some(registrar_credentials()));
        let err = f
            .client
            .register(&RegistrationRequest::default(), &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::NameRequired));
        // The registrar bootstrap enrollment is the only exchange.
        assert_eq!(f.transport.calls(), 1);
    }

    #[tokio::test]
    async fn register_returns_the_enrollment_secret() {
        let f = fixture(Some(registrar_credentials()));
        let secret = f
            .client
            .register(
                &RegistrationRequest {
                    name: "bob".to_string(),
                    r#type: "client".to_string(),
                    max_enrollments: -1,
                    ..RegistrationRequest::default()
                },
                &RequestContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(secret, "mockSecretValue");
        // Bootstrap enrollment of the registrar plus the registration.
        assert_eq!(f.transport.calls(), 2);
    }

    #[tokio::test]
    async fn register_reuses_an_enrolled_registrar() {
        let f = fixture(Some(registrar_credentials()));
        let ctx = RequestContext::new();
        f.client
            .enroll(REGISTRAR, REGISTRAR_SECRET, &ctx)
            .await
            .unwrap();

        f.client
            .register(
                &RegistrationRequest {
                    name: "bob".to_string(),
                    ..RegistrationRequest::default()
                },
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(f.transport.calls(), 2);
    }

    #[tokio::test]
    async fn registrar_without_secret_and_unenrolled_is_sentinel() {
        let f = fixture(Some(EnrollCredentials {
            enroll_id: REGISTRAR.to_string(),
            enroll_secret: String::new(),
        }));
        let err = f
            .client
            .register(
                &RegistrationRequest {
                    name: "bob".to_string(),
                    ..RegistrationRequest::default()
                },
                &RequestContext::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::RegistrarNotFound));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn revoke_without_registrar_is_sentinel() {
        let f = fixture(None);
        let err = f
            .client
            .revoke(&RevocationRequest::default(), &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RevokeError::RegistrarNotFound));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn revoke_returns_the_decoded_revocation() {
        let f = fixture(Some(registrar_credentials()));
        let revocation = f
            .client
            .revoke(
                &RevocationRequest {
                    name: "bob".to_string(),
                    reason: "keycompromise".to_string(),
                    ..RevocationRequest::default()
                },
                &RequestContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(revocation.revoked_certs.len(), 1);
        assert!(!revocation.crl.is_empty());
    }

    #[tokio::test]
    async fn revoke_rejects_malformed_crl() {
        let transport = Arc::new(MockCaTransport::new().with_malformed_crl());
        let f = fixture_with(Some(registrar_credentials()), transport);
        let err = f
            .client
            .revoke(
                &RevocationRequest {
                    name: "bob".to_string(),
                    ..RevocationRequest::default()
                },
                &RequestContext::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RevokeError::Response(_)));
    }

    #[tokio::test]
    async fn cancelled_context_fails_without_reaching_the_ca() {
        let f = fixture(None);
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = f
            .client
            .enroll("alice", "alicepw", &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnrollError::Transport(TransportError::Cancelled)
        ));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn timeout_is_distinct_from_cancellation() {
        let transport = Arc::new(MockCaTransport::new().with_delay(Duration::from_secs(5)));
        let f = fixture_with(None, transport);
        let ctx = RequestContext::with_timeout(Duration::from_millis(20));
        let err = f
            .client
            .enroll("alice", "alicepw", &ctx)
            .await
            .unwrap_err();
        match err {
            EnrollError::Transport(ref transport_err) => {
                assert!(matches!(transport_err, TransportError::TimedOut));
                assert!(!transport_err.is_cancelled());
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_mid_flight_interrupts_the_exchange() {
        let transport = Arc::new(MockCaTransport::new().with_delay(Duration::from_secs(5)));
        let f = fixture_with(None, transport);
        let ctx = RequestContext::new();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = f
            .client
            .enroll("alice", "alicepw", &ctx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnrollError::Transport(TransportError::Cancelled)
        ));
    }

    // Construction-time config lookups fail in a fixed order; each stage
    // maps to its own error variant.
    struct FailingConfig {
        fail_at: Stage,
    }

    #[derive(PartialEq)]
    enum Stage {
        CaConfig,
        ServerCerts,
        ClientCert,
        ClientKey,
        MspId,
    }

    impl FailingConfig {
        fn fail(&self, stage: Stage) -> Result<(), ConfigLookupError> {
            if self.fail_at == stage {
                Err(ConfigLookupError::Other("lookup failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl CaClientConfig for FailingConfig {
        fn ca_config(&self, _org: &str) -> Result<CaConfig, ConfigLookupError> {
            self.fail(Stage::CaConfig)?;
            Ok(CaConfig {
                url: "https://ca.example.com:7054".to_string(),
                ..CaConfig::default()
            })
        }

        fn ca_server_certs(
            &self,
            _org: &str,
        ) -> Result<Vec<crate::config::endpoint::TlsConfig>, ConfigLookupError> {
            self.fail(Stage::ServerCerts)?;
            Ok(vec![])
        }

        fn ca_client_cert(
            &self,
            _org: &str,
        ) -> Result<crate::config::endpoint::TlsConfig, ConfigLookupError> {
            self.fail(Stage::ClientCert)?;
            Ok(crate::config::endpoint::TlsConfig::default())
        }

        fn ca_client_key(
            &self,
            _org: &str,
        ) -> Result<crate::config::endpoint::TlsConfig, ConfigLookupError> {
            self.fail(Stage::ClientKey)?;
            Ok(crate::config::endpoint::TlsConfig::default())
        }

        fn msp_id(&self, _org: &str) -> Result<String, ConfigLookupError> {
            self.fail(Stage::MspId)?;
            Ok("Org1MSP".to_string())
        }
    }

    fn try_build(fail_at: Stage) -> CaClientCreateError {
        let dir = tempfile::tempdir().unwrap();
        let suite: Arc<dyn CryptoSuite> =
            Arc::new(SoftwareCryptoSuite::new(dir.path().join("keystore")).unwrap());
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let manager = Arc::new(IdentityManager::new(
            "Org1MSP",
            store,
            Arc::clone(&suite),
            discard_logger(),
        ));
        CaClient::with_transport(
            "Org1",
            &FailingConfig { fail_at },
            manager,
            suite,
            Arc::new(MockCaTransport::new()),
            discard_logger(),
        )
        .unwrap_err()
    }

    #[test]
    fn construction_reports_the_failing_lookup() {
        assert!(matches!(
            try_build(Stage::CaConfig),
            CaClientCreateError::CaConfigFailed { .. }
        ));
        assert!(matches!(
            try_build(Stage::ServerCerts),
            CaClientCreateError::CaServerCertsFailed { .. }
        ));
        assert!(matches!(
            try_build(Stage::ClientCert),
            CaClientCreateError::CaClientCertFailed { .. }
        ));
        assert!(matches!(
            try_build(Stage::ClientKey),
            CaClientCreateError::CaClientKeyFailed { .. }
        ));
        assert!(matches!(
            try_build(Stage::MspId),
            CaClientCreateError::MspIdFailed { .. }
        ));
    }

    #[test]
    fn construction_surfaces_missing_ca_list() {
        let mut config = network_config(None);
        config
            .organizations
            .get_mut("Org1")
            .unwrap()
            .certificate_authorities
            .clear();

        let dir = tempfile::tempdir().unwrap();
        let suite: Arc<dyn CryptoSuite> =
            Arc::new(SoftwareCryptoSuite::new(dir.path().join("keystore")).unwrap());
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let manager = Arc::new(IdentityManager::new(
            "Org1MSP",
            store,
            Arc::clone(&suite),
            discard_logger(),
        ));
        let err = CaClient::with_transport(
            "Org1",
            &config,
            manager,
            suite,
            Arc::new(MockCaTransport::new()),
            discard_logger(),
        )
        .unwrap_err();
        match err {
            CaClientCreateError::CaConfigFailed { source, .. } => {
                assert!(source.to_string().contains("no CAs configured"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
