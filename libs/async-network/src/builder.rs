use crate::client::{BufferedService, HyperTransport, ResponseBody};
use crate::config::{HyperTransportConfig, NetworkingConfig, TlsRootConfig, TransportSecurity};
use crate::error::NetworkError;
use crate::tls;
use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::FollowRedirectLayer;
use tower_http::follow_redirect::policy::Limited;
use tower_http::set_header::SetRequestHeaderLayer;

/// Requests that may queue for the buffer worker at once.
const BUFFER_CAPACITY: usize = 1024;

/// Builder for [`HyperTransport`].
#[must_use]
pub struct HyperTransportBuilder {
    config: HyperTransportConfig,
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self {
            config: HyperTransportConfig::default(),
        }
    }

    pub fn with_config(config: HyperTransportConfig) -> Self {
        Self { config }
    }

    /// Builder whose timeouts come from the orchestrator configuration.
    pub fn from_networking(config: &NetworkingConfig) -> Self {
        Self::with_config(HyperTransportConfig::from_networking(config))
    }

    /// Timeout for receiving the response head
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Timeout for the whole exchange, body included
    pub fn resource_timeout(mut self, timeout: Duration) -> Self {
        self.config.resource_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Use `TransportSecurity::AllowInsecureHttp` only for testing with mock servers.
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Allow plain HTTP connections (for testing only).
    ///
    /// Only available in debug builds or with the `allow-insecure-http`
    /// feature, so release binaries cannot switch TLS off by accident.
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "async_network::security",
            "allow_insecure_http() called - HTTP traffic will NOT be encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Build the transport.
    ///
    /// Must be called inside a tokio runtime: the request buffer spawns its
    /// worker task here.
    ///
    /// # Errors
    ///
    /// - `RuntimeUnavailable` when called outside a tokio runtime
    /// - `InvalidHeaderValue` if the user agent is not a valid header value
    /// - `Tls` if the TLS connector cannot be initialized
    pub fn build(self) -> Result<HyperTransport, NetworkError> {
        // Buffer spawns its worker task on the current runtime.
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(NetworkError::RuntimeUnavailable);
        }
        let config = self.config;
        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only for testing with mock servers"
            );
        }

        let user_agent = HeaderValue::from_str(&config.user_agent)?;
        let https = tls::https_connector(config.tls_roots, config.transport)?;
        let hyper_client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https);

        // Request flow: Timeout -> User-Agent -> Decompression -> FollowRedirect -> hyper
        let request_timeout = config.request_timeout;
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(request_timeout))
            .layer(SetRequestHeaderLayer::if_not_present(USER_AGENT, user_agent))
            .layer(DecompressionLayer::new())
            .layer(FollowRedirectLayer::with_policy(Limited::new(
                config.max_redirects,
            )))
            .service(hyper_client)
            .map_response(box_response_body)
            .map_err(move |e: tower::BoxError| map_tower_error(e, request_timeout))
            .boxed_clone();

        let service: BufferedService = Buffer::new(service, BUFFER_CAPACITY);

        Ok(HyperTransport {
            service,
            max_body_size: config.max_body_size,
            resource_timeout: config.resource_timeout,
            transport_security: config.transport,
        })
    }
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn map_tower_error(err: tower::BoxError, timeout: Duration) -> NetworkError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return NetworkError::Timeout(timeout);
    }
    match err.downcast::<NetworkError>() {
        Ok(err) => *err,
        Err(other) => NetworkError::Transport(other),
    }
}

fn box_response_body<B>(response: http::Response<B>) -> http::Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    http::Response::from_parts(parts, body.map_err(Into::into).boxed())
}
