use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// The request context was canceled before or during the exchange.
    #[error("request context canceled")]
    Cancelled,

    /// The context deadline elapsed before the CA responded.
    #[error("request to CA timed out")]
    TimedOut,

    #[error("request to CA endpoint '{endpoint}' failed")]
    Endpoint {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("CA endpoint '{endpoint}' returned HTTP status {status}")]
    HttpStatus { endpoint: String, status: u16 },

    /// The CA answered but reported a protocol-level failure.
    #[error("CA at '{endpoint}' refused the request: {message}")]
    CaRefused { endpoint: String, message: String },

    #[error("no CA endpoints available")]
    NoEndpoints,

    #[error("invalid CA endpoint URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client")]
    BuildClientFailed(#[source] reqwest::Error),

    #[error("failed to read CA response body from '{endpoint}'")]
    ReadBodyFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// True for the cancellation sub-kind, which callers must be able to
    /// distinguish from timeouts and CA failures.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}
