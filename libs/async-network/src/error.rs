use std::time::Duration;
use thiserror::Error;

/// Boxed error carried by transport failures and by hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of URL construction failures.
///
/// Provides programmatic matching without relying on message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUrlKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL has no scheme; usually a relative path sent without a base URL
    MissingScheme,
    /// URL is missing required host/authority component
    MissingAuthority,
}

/// Errors produced while sending a [`Request`](crate::Request).
///
/// Hook failures ([`Encrypt`](Self::Encrypt), [`Decrypt`](Self::Decrypt)) are
/// transparent: `Display` and `source()` are those of the hook's own error,
/// which can be recovered with `downcast_ref`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NetworkError {
    /// Transport produced neither a response nor an error
    #[error("transport returned neither a response nor an error")]
    WrongResponse,

    /// Transport produced a response that is not an HTTP response
    #[error("transport response is not an HTTP response")]
    ResponseNotHttp,

    /// Request URL (after base URL resolution) is not a valid absolute URL
    ///
    /// Use the `kind` field for programmatic matching; `reason` is for logs only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The resolved URL that failed validation
        url: String,
        /// Structured failure classification
        kind: InvalidUrlKind,
        /// Diagnostic message (unstable format)
        reason: String,
    },

    /// URL scheme rejected (non-HTTP scheme, or `http` under `TlsOnly`)
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Wire request could not be assembled
    #[error("Request build error: {0}")]
    RequestBuild(#[from] http::Error),

    /// Request parameters could not be encoded
    #[error("Parameter encoding failed: {0}")]
    ParamsEncode(#[source] BoxError),

    /// Exchange did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport error (network, connection, DNS, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// Default transport was built outside a tokio runtime
    #[error("no tokio runtime available to drive the transport")]
    RuntimeUnavailable,

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] BoxError),

    /// Response body exceeded the transport's size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Failure raised by the configured [`Encryptor`](crate::Encryptor)
    #[error(transparent)]
    Encrypt(BoxError),

    /// Failure raised by the configured [`Decryptor`](crate::Decryptor)
    #[error(transparent)]
    Decrypt(BoxError),

    /// Response data could not be decoded into the requested model
    #[error("Model decoding failed: {0}")]
    Decode(#[source] serde_json::Error),
}
