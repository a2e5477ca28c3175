use crate::builder::HyperTransportBuilder;
use crate::config::TransportSecurity;
use crate::error::NetworkError;
use crate::request::RawRequest;
use crate::transport::{Exchange, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use http_body_util::{BodyExt, Full};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tower::buffer::Buffer;
use tower::{Service, ServiceExt};

/// Type-erased response body (raw or decompressed).
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Future of the inner service stack
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<ResponseBody>, NetworkError>> + Send>>;

/// Buffered tower stack shared by all clones of a transport
pub type BufferedService = Buffer<http::Request<Full<Bytes>>, ServiceFuture>;

/// Default [`Transport`] over hyper, rustls and a tower middleware stack.
///
/// The stack applies the request timeout, a default `User-Agent`, response
/// decompression (gzip, br, deflate) and redirect following. The whole
/// exchange, including reading the body, is bounded by the resource timeout,
/// and the decompressed body is bounded by `max_body_size`.
///
/// `HyperTransport` is `Clone + Send + Sync`; clones share one connection
/// pool through an internal `tower::buffer::Buffer`.
#[derive(Clone)]
pub struct HyperTransport {
    pub(crate) service: BufferedService,
    pub(crate) max_body_size: usize,
    pub(crate) resource_timeout: Duration,
    pub(crate) transport_security: TransportSecurity,
}

impl HyperTransport {
    /// Transport with default configuration.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error outside a tokio runtime or if TLS initialization fails
    pub fn new() -> Result<Self, NetworkError> {
        HyperTransportBuilder::new().build()
    }

    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    fn check_scheme(&self, uri: &Uri) -> Result<(), NetworkError> {
        match uri.scheme_str() {
            Some("http") if self.transport_security == TransportSecurity::TlsOnly => {
                Err(NetworkError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
                })
            }
            Some("http" | "https") => Ok(()),
            Some(scheme) => Err(NetworkError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            None => Err(NetworkError::InvalidScheme {
                scheme: String::new(),
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    async fn perform(&self, request: RawRequest) -> Result<Exchange, NetworkError> {
        self.check_scheme(&request.uri)?;

        let mut builder = http::Request::builder()
            .method(request.method)
            .uri(request.uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        let request = builder.body(Full::new(request.body.unwrap_or_default()))?;

        let mut service = self.service.clone();
        let response = service
            .ready()
            .await
            .map_err(map_buffer_error)?
            .call(request)
            .await
            .map_err(map_buffer_error)?;

        let (parts, body) = response.into_parts();
        let body = read_body_limited(body, self.max_body_size).await?;
        Ok(Exchange::http(parts.status, parts.headers, body))
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn exchange(&self, request: RawRequest) -> Result<Option<Exchange>, NetworkError> {
        tokio::time::timeout(self.resource_timeout, self.perform(request))
            .await
            .map_err(|_| NetworkError::Timeout(self.resource_timeout))?
            .map(Some)
    }
}

/// Buffer errors are either the inner service's `NetworkError` or a dead worker.
fn map_buffer_error(err: tower::BoxError) -> NetworkError {
    match err.downcast::<NetworkError>() {
        Ok(err) => *err,
        Err(err) => {
            tracing::error!(
                error = %err,
                "buffer worker closed unexpectedly; transport unavailable"
            );
            NetworkError::Transport(err)
        }
    }
}

/// Collect `body`, failing as soon as it exceeds `limit` bytes.
///
/// The limit applies to decompressed bytes.
async fn read_body_limited(body: ResponseBody, limit: usize) -> Result<Bytes, NetworkError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(NetworkError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            let actual = collected.len() + chunk.len();
            if actual > limit {
                return Err(NetworkError::BodyTooLarge { limit, actual });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
