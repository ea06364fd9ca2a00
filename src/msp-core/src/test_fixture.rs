//! Shared test fixtures: a discard logger, an in-process CA that issues
//! real certificates from CSRs, and a mock transport speaking the CA's
//! JSON protocol.

use crate::ca::transport::{CaRequest, CaTransport, Operation, RequestContext};
use crate::error::transport::TransportError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn discard_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

/// A self-signed CA that signs submitted CSRs, so issued certificates carry
/// the requester's real public key and survive certificate/key validation.
pub struct MockCa {
    key: rcgen::KeyPair,
    cert: rcgen::Certificate,
}

impl MockCa {
    pub fn new() -> Self {
        let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "mock-ca");
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let cert = params.self_signed(&key).unwrap();
        MockCa { key, cert }
    }

    /// Issues a PEM certificate for the given PEM CSR.
    pub fn issue_certificate(&self, csr_pem: &str) -> String {
        rcgen::CertificateSigningRequestParams::from_pem(csr_pem)
            .expect("valid CSR")
            .signed_by(&self.cert, &self.key)
            .expect("CSR signing")
            .pem()
    }
}

impl Default for MockCa {
    fn default() -> Self {
        Self::new()
    }
}

enum ResponseMode {
    Normal,
    Failing(String),
    MalformedCrl,
}

/// In-memory [`CaTransport`]: answers the CA protocol without a network,
/// counting exchanges so tests can assert which paths never reach the CA.
pub struct MockCaTransport {
    ca: MockCa,
    calls: AtomicUsize,
    delay: Option<Duration>,
    mode: ResponseMode,
}

impl MockCaTransport {
    pub fn new() -> Self {
        MockCaTransport {
            ca: MockCa::new(),
            calls: AtomicUsize::new(0),
            delay: None,
            mode: ResponseMode::Normal,
        }
    }

    /// Every exchange is answered with a CA failure envelope.
    pub fn failing(mut self, message: &str) -> Self {
        self.mode = ResponseMode::Failing(message.to_string());
        self
    }

    /// Revocation responses carry a CRL that is not valid base64.
    pub fn with_malformed_crl(mut self) -> Self {
        self.mode = ResponseMode::MalformedCrl;
        self
    }

    /// Every exchange stalls this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of exchanges that reached the mock CA.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, request: &CaRequest) -> Vec<u8> {
        if let ResponseMode::Failing(message) = &self.mode {
            let envelope = json!({
                "success": false,
                "errors": [ { "code": 71, "message": message } ],
            });
            return serde_json::to_vec(&envelope).unwrap();
        }

        let result = match request.operation {
            Operation::Enroll | Operation::Reenroll => {
                let body: Value =
                    serde_json::from_slice(&request.body).expect("request body is JSON");
                let csr = body
                    .get("certificate_request")
                    .and_then(Value::as_str)
                    .expect("certificate_request present");
                let cert_pem = self.ca.issue_certificate(csr);
                json!({ "Cert": base64::encode(cert_pem) })
            }
            Operation::Register => json!({ "secret": "mockSecretValue" }),
            Operation::Revoke => match self.mode {
                ResponseMode::MalformedCrl => json!({ "CRL": "%%%not-base64%%%" }),
                _ => json!({
                    "RevokedCerts": [ { "Serial": "8f2e63a1", "AKI": "ab01cd23" } ],
                    "CRL": base64::encode(b"mock-crl"),
                }),
            },
        };
        serde_json::to_vec(&json!({ "success": true, "result": result })).unwrap()
    }
}

impl Default for MockCaTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaTransport for MockCaTransport {
    async fn send(
        &self,
        request: &CaRequest,
        ctx: &RequestContext,
    ) -> Result<Vec<u8>, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            let stall = tokio::time::sleep(delay);
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(TransportError::Cancelled),
                result = async {
                    match ctx.timeout() {
                        Some(deadline) => tokio::time::timeout(deadline, stall)
                            .await
                            .map_err(|_| TransportError::TimedOut),
                        None => {
                            stall.await;
                            Ok(())
                        }
                    }
                } => result?,
            }
        }

        Ok(self.answer(request))
    }
}
