use crate::error::NetworkError;
use crate::request::RawRequest;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Status and headers of an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpMetadata {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Response metadata reported by a transport.
#[derive(Debug, Clone)]
pub enum TransportResponse {
    Http(HttpMetadata),
    /// Anything that is not an HTTP response (e.g. a `file://` or FTP result).
    Other { description: String },
}

/// Bytes and metadata of one completed exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub body: Bytes,
    pub response: TransportResponse,
}

impl Exchange {
    /// Exchange carrying an HTTP response.
    #[must_use]
    pub fn http(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            response: TransportResponse::Http(HttpMetadata { status, headers }),
        }
    }
}

/// Performs the actual network exchange for a [`RawRequest`].
///
/// `Ok(None)` means the transport produced neither a response nor an error;
/// [`Networking`](crate::Networking) reports it as
/// [`NetworkError::WrongResponse`]. Transport failures are returned as-is.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: RawRequest) -> Result<Option<Exchange>, NetworkError>;
}
