//! CA protocol request/response types and response decoding.
//!
//! The CA speaks JSON over HTTP. Every response is wrapped in an envelope
//! (`success`, `result`, `errors`); decoding peels the envelope first and
//! surfaces CA-reported failures as [`ResponseError::CaFailure`].

use crate::crypto::{CryptoSuite, KeyRef};
use crate::error::ca::ResponseError;
use crate::error::crypto::CryptoError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to register a new identity, signed by the registrar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Required; rejected before any network call when empty.
    pub name: String,
    pub r#type: String,
    pub affiliation: String,
    /// Ordered; the CA evaluates attributes in the order given.
    pub attributes: Vec<Attribute>,
    pub max_enrollments: i32,
    /// One-time enrollment secret. When absent the CA generates one and
    /// returns it.
    pub secret: Option<String>,
    /// Overrides the client's configured CA name when non-empty.
    pub ca_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Request to revoke a certificate or an identity's certificates. The target
/// is either `name` or the `serial`/`aki` pair; a request identifying
/// neither is answered (and refused) by the CA, not pre-validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevocationRequest {
    pub name: String,
    pub serial: String,
    pub aki: String,
    pub reason: String,
    /// Overrides the client's configured CA name when non-empty.
    pub ca_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedCert {
    pub serial: String,
    pub aki: String,
}

/// Decoded revocation result: which certificates the CA revoked, plus the
/// CRL it issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationResponse {
    pub revoked_certs: Vec<RevokedCert>,
    pub crl: Vec<u8>,
}

#[derive(Serialize)]
pub(crate) struct EnrollmentRequestBody<'a> {
    pub certificate_request: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub caname: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RegistrationRequestBody<'a> {
    pub id: &'a str,
    #[serde(rename = "type", skip_serializing_if = "str::is_empty")]
    pub identity_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<&'a str>,
    pub max_enrollments: i32,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub affiliation: &'a str,
    pub attrs: Vec<WireAttribute<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub caname: &'a str,
}

#[derive(Serialize)]
pub(crate) struct WireAttribute<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RevocationRequestBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub serial: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub aki: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub reason: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub caname: &'a str,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    errors: Vec<EnvelopeMessage>,
}

#[derive(Deserialize)]
struct EnvelopeMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Peels the response envelope, returning the `result` value or the CA's
/// reported errors.
pub(crate) fn decode_envelope(bytes: &[u8]) -> Result<Value, ResponseError> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(ResponseError::InvalidJson)?;
    if !envelope.success {
        let message = if envelope.errors.is_empty() {
            "unspecified CA failure".to_string()
        } else {
            envelope
                .errors
                .iter()
                .map(|e| format!("[{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ")
        };
        return Err(ResponseError::CaFailure(message));
    }
    envelope
        .result
        .ok_or(ResponseError::MissingField("result"))
}

/// Decodes an enroll/reenroll response into the issued PEM certificate.
pub(crate) fn decode_enrollment(bytes: &[u8]) -> Result<Vec<u8>, ResponseError> {
    let result = decode_envelope(bytes)?;
    let cert_b64 = result
        .get("Cert")
        .and_then(Value::as_str)
        .ok_or(ResponseError::MissingField("Cert"))?;
    base64::decode(cert_b64).map_err(|source| ResponseError::InvalidBase64 {
        field: "Cert",
        source,
    })
}

/// Decodes a register response into the CA-issued enrollment secret.
pub(crate) fn decode_registration(bytes: &[u8]) -> Result<String, ResponseError> {
    let result = decode_envelope(bytes)?;
    result
        .get("secret")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ResponseError::MissingField("secret"))
}

/// Decodes a revoke response. Malformed CRL bytes are an error, never
/// silently dropped.
pub(crate) fn decode_revocation(bytes: &[u8]) -> Result<RevocationResponse, ResponseError> {
    let result = decode_envelope(bytes)?;

    let mut revoked_certs = Vec::new();
    if let Some(entries) = result.get("RevokedCerts").and_then(Value::as_array) {
        for entry in entries {
            revoked_certs.push(RevokedCert {
                serial: entry
                    .get("Serial")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                aki: entry
                    .get("AKI")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    let crl = match result.get("CRL").and_then(Value::as_str) {
        Some(crl_b64) if !crl_b64.is_empty() => {
            base64::decode(crl_b64).map_err(|source| ResponseError::InvalidBase64 {
                field: "CRL",
                source,
            })?
        }
        _ => Vec::new(),
    };

    Ok(RevocationResponse { revoked_certs, crl })
}

/// Builds the CA's token authorization header value: the caller's
/// certificate and an ECDSA signature over `b64(body).b64(cert)`, proving
/// possession of the certificate's key.
pub(crate) fn auth_token(
    certificate: &[u8],
    crypto_suite: &dyn CryptoSuite,
    key: &KeyRef,
    body: &[u8],
) -> Result<String, CryptoError> {
    let b64_cert = base64::encode(certificate);
    let b64_body = base64::encode(body);
    let payload = format!("{b64_body}.{b64_cert}");
    let digest = crypto_suite.hash(payload.as_bytes());
    let signature = crypto_suite.sign(key, &digest)?;
    Ok(format!("{}.{}", b64_cert, base64::encode(signature)))
}
