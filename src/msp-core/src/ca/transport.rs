//! Transport contract between the CA client and the wire.
//!
//! The CA client builds requests and decodes responses; a [`CaTransport`]
//! only moves bytes. [`HttpTransport`] is the production implementation;
//! tests substitute their own.

use crate::error::transport::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Cancellation and deadline scope for a single CA exchange. Cloning shares
/// the underlying token, so a context canceled in one place fails the
/// exchange everywhere it is observed.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        RequestContext {
            token: CancellationToken::new(),
            timeout: Some(timeout),
        }
    }

    /// Cancels every exchange observing this context. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// A context canceled when either this one or the parent is.
    pub fn child(&self) -> Self {
        RequestContext {
            token: self.token.child_token(),
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Enroll,
    Reenroll,
    Register,
    Revoke,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Operation::Enroll => "enroll",
            Operation::Reenroll => "reenroll",
            Operation::Register => "register",
            Operation::Revoke => "revoke",
        }
    }
}

/// How a request proves who is asking.
#[derive(Debug, Clone)]
pub enum Authorization {
    /// Enrollment: HTTP basic auth with the one-time secret.
    Basic { user: String, secret: String },
    /// Everything else: certificate-plus-signature token header.
    Token(String),
}

#[derive(Debug, Clone)]
pub struct CaRequest {
    pub operation: Operation,
    pub body: Vec<u8>,
    pub authorization: Authorization,
}

#[async_trait]
pub trait CaTransport: Send + Sync {
    /// Sends one request and returns the raw response body. Respects the
    /// context: a canceled context fails with [`TransportError::Cancelled`]
    /// without touching the network, an elapsed deadline with
    /// [`TransportError::TimedOut`].
    async fn send(&self, request: &CaRequest, ctx: &RequestContext)
        -> Result<Vec<u8>, TransportError>;
}

/// HTTPS transport to one or more CA endpoints. Endpoints are tried in
/// order; the first CA that answers wins, and the last endpoint's error is
/// returned when none does.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: Vec<Url>,
}

impl HttpTransport {
    /// Builds the transport. Server certificates pin the CA's TLS roots;
    /// a client certificate/key pair, when both are present, enables mutual
    /// TLS.
    pub fn new(
        urls: &[String],
        server_certs: &[Vec<u8>],
        client_cert: &[u8],
        client_key: &[u8],
    ) -> Result<Self, TransportError> {
        if urls.is_empty() {
            return Err(TransportError::NoEndpoints);
        }
        let endpoints = urls
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|source| TransportError::InvalidUrl {
                    url: raw.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = reqwest::Client::builder().use_rustls_tls();
        for cert in server_certs.iter().filter(|c| !c.is_empty()) {
            let cert =
                reqwest::Certificate::from_pem(cert).map_err(TransportError::BuildClientFailed)?;
            builder = builder.add_root_certificate(cert);
        }
        if !client_cert.is_empty() && !client_key.is_empty() {
            let mut identity_pem = Vec::with_capacity(client_key.len() + client_cert.len() + 1);
            identity_pem.extend_from_slice(client_key);
            identity_pem.push(b'\n');
            identity_pem.extend_from_slice(client_cert);
            let identity = reqwest::Identity::from_pem(&identity_pem)
                .map_err(TransportError::BuildClientFailed)?;
            builder = builder.identity(identity);
        }
        let client = builder.build().map_err(TransportError::BuildClientFailed)?;

        Ok(HttpTransport { client, endpoints })
    }

    fn request_url(endpoint: &Url, operation: Operation) -> String {
        format!(
            "{}/api/v1/{}",
            endpoint.as_str().trim_end_matches('/'),
            operation.path()
        )
    }

    async fn send_to(
        &self,
        endpoint: &Url,
        request: &CaRequest,
    ) -> Result<Vec<u8>, TransportError> {
        let url = Self::request_url(endpoint, request.operation);
        let mut builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.body.clone());
        builder = match &request.authorization {
            Authorization::Basic { user, secret } => builder.basic_auth(user, Some(secret)),
            Authorization::Token(token) => {
                builder.header(reqwest::header::AUTHORIZATION, token.clone())
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::Endpoint {
                endpoint: url.clone(),
                source,
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::ReadBodyFailed {
                endpoint: url.clone(),
                source,
            })?;
        // The CA reports failures inside a JSON envelope, usually with a
        // non-2xx status; hand a non-empty body back for envelope decoding.
        if body.is_empty() && !status.is_success() {
            return Err(TransportError::HttpStatus {
                endpoint: url,
                status: status.as_u16(),
            });
        }
        Ok(body.to_vec())
    }

    async fn exchange(&self, request: &CaRequest) -> Result<Vec<u8>, TransportError> {
        let mut last_err = TransportError::NoEndpoints;
        for endpoint in &self.endpoints {
            match self.send_to(endpoint, request).await {
                Ok(body) => return Ok(body),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl CaTransport for HttpTransport {
    async fn send(
        &self,
        request: &CaRequest,
        ctx: &RequestContext,
    ) -> Result<Vec<u8>, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let exchange = self.exchange(request);
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(TransportError::Cancelled),
            result = async {
                match ctx.timeout() {
                    Some(deadline) => tokio::time::timeout(deadline, exchange)
                        .await
                        .unwrap_or(Err(TransportError::TimedOut)),
                    None => exchange.await,
                }
            } => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_paths() {
        assert_eq!(Operation::Enroll.path(), "enroll");
        assert_eq!(Operation::Revoke.path(), "revoke");
    }

    #[test]
    fn request_url_joins_without_duplicate_slash() {
        let endpoint = Url::parse("https://ca.org1.example.com:7054/").unwrap();
        assert_eq!(
            HttpTransport::request_url(&endpoint, Operation::Enroll),
            "https://ca.org1.example.com:7054/api/v1/enroll"
        );
    }

    #[test]
    fn rejects_empty_endpoint_list() {
        assert!(matches!(
            HttpTransport::new(&[], &[], &[], &[]),
            Err(TransportError::NoEndpoints)
        ));
    }

    #[test]
    fn rejects_malformed_url() {
        let urls = vec!["://nope".to_string()];
        assert!(matches!(
            HttpTransport::new(&urls, &[], &[], &[]),
            Err(TransportError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_context_fails_before_network() {
        let urls = vec!["https://ca.example.com:7054".to_string()];
        let transport = HttpTransport::new(&urls, &[], &[], &[]).unwrap();
        let ctx = RequestContext::new();
        ctx.cancel();
        let request = CaRequest {
            operation: Operation::Enroll,
            body: b"{}".to_vec(),
            authorization: Authorization::Basic {
                user: "admin".to_string(),
                secret: "adminpw".to_string(),
            },
        };
        let err = transport.send(&request, &ctx).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn child_context_observes_parent_cancellation() {
        let parent = RequestContext::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
        child.cancelled().await;
    }
}
