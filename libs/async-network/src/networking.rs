use crate::builder::HyperTransportBuilder;
use crate::config::NetworkingConfig;
use crate::error::NetworkError;
use crate::hooks::{Decryptor, Encryptor, Passthrough};
use crate::log::{self, LogSink, TracingLogSink};
use crate::model::ModelType;
use crate::request::{Request, epoch_millis};
use crate::response::Response;
use crate::transport::{Transport, TransportResponse};
use std::sync::Arc;
use std::time::Duration;

/// Drives a [`Request`] through encrypt, transport, decrypt, decode and log.
///
/// Configuration, hooks, transport and log sink are fixed at construction.
/// `Networking` is `Clone + Send + Sync`; clones share everything, so one
/// instance can serve any number of concurrent sends.
///
/// # Example
///
/// ```ignore
/// let networking = Networking::builder()
///     .base_url("https://api.example.com/v1")
///     .time_out(Duration::from_secs(5))
///     .build()?;
///
/// let response = networking
///     .send(&Request::get("/users").data_key("data.rows").model::<Vec<User>>())
///     .await?;
/// let users = response.model::<Vec<User>>();
/// ```
#[derive(Clone)]
pub struct Networking {
    config: Arc<NetworkingConfig>,
    transport: Arc<dyn Transport>,
    encryptor: Arc<dyn Encryptor>,
    decryptor: Arc<dyn Decryptor>,
    log_sink: Arc<dyn LogSink>,
}

impl Networking {
    pub fn builder() -> NetworkingBuilder {
        NetworkingBuilder::new()
    }

    #[must_use]
    pub fn config(&self) -> &NetworkingConfig {
        &self.config
    }

    /// Send `request` and return the response.
    ///
    /// Any HTTP status yields `Ok`; use [`Response::succeed`] to classify it.
    /// The decrypt hook and model decoding only run for successful statuses,
    /// and a model that fails to decode is simply left absent. The caller's
    /// request is not modified; the returned response carries a copy with
    /// `start` and the raw request filled in.
    ///
    /// # Errors
    ///
    /// - URL or header errors from building the raw request
    /// - `Encrypt` / `Decrypt` with the hook's own error
    /// - Whatever the transport reports (`Timeout`, `Transport`, `Tls`, ...)
    /// - `WrongResponse` if the transport produced nothing
    /// - `ResponseNotHttp` if the transport response is not HTTP
    pub async fn send(&self, request: &Request) -> Result<Response, NetworkError> {
        let mut request = request.clone();
        match self.perform(&mut request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if request.is_print_log() {
                    self.emit_error(&request, &err);
                }
                Err(err)
            }
        }
    }

    async fn perform(&self, request: &mut Request) -> Result<Response, NetworkError> {
        let raw = request.to_raw(&self.config.base_url)?;
        request.stamp_start();
        request.set_raw_request(raw.clone());

        let raw = self.encryptor.encrypt(raw).map_err(NetworkError::Encrypt)?;
        request.set_raw_request(raw.clone());

        let exchange = self
            .transport
            .exchange(raw)
            .await?
            .ok_or(NetworkError::WrongResponse)?;
        let TransportResponse::Http(metadata) = exchange.response else {
            return Err(NetworkError::ResponseNotHttp);
        };

        let mut response = Response::new(request.clone(), exchange.body, metadata);
        if response.succeed() {
            response = self
                .decryptor
                .decrypt(response)
                .map_err(NetworkError::Decrypt)?;
            if let Err(err) = response.decode_model() {
                tracing::debug!(
                    url = %request.url(),
                    model = response.request().decode_target().map(ModelType::name),
                    error = %err,
                    "response data did not match the requested model"
                );
            }
        }

        if request.is_print_log() {
            self.log_sink
                .emit(&log::response_transcript(request, &response));
        }
        Ok(response)
    }

    /// Error transcripts are rendered now and emitted from a detached task.
    fn emit_error(&self, request: &Request, err: &NetworkError) {
        let elapsed = request.start().map_or(-1, |start| epoch_millis() - start);
        let transcript = log::error_transcript(request, elapsed, err);
        let sink = Arc::clone(&self.log_sink);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            drop(handle.spawn(async move { sink.emit(&transcript) }));
        } else {
            sink.emit(&transcript);
        }
    }
}

/// Builder for [`Networking`].
///
/// Without an explicit transport, [`build`](Self::build) creates a
/// [`HyperTransport`](crate::HyperTransport) using the configured timeouts.
#[must_use]
pub struct NetworkingBuilder {
    config: NetworkingConfig,
    transport: Option<Arc<dyn Transport>>,
    encryptor: Option<Arc<dyn Encryptor>>,
    decryptor: Option<Arc<dyn Decryptor>>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl NetworkingBuilder {
    pub fn new() -> Self {
        Self::with_config(NetworkingConfig::default())
    }

    pub fn with_config(config: NetworkingConfig) -> Self {
        Self {
            config,
            transport: None,
            encryptor: None,
            decryptor: None,
            log_sink: None,
        }
    }

    /// Prefix for relative request URLs
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Per-request timeout of the default transport
    pub fn time_out(mut self, timeout: Duration) -> Self {
        self.config.time_out = timeout;
        self
    }

    /// Whole-exchange timeout of the default transport
    pub fn resource_time_out(mut self, timeout: Duration) -> Self {
        self.config.resource_time_out = timeout;
        self
    }

    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Hook applied to every raw request before it reaches the transport.
    pub fn encryptor(mut self, encryptor: impl Encryptor + 'static) -> Self {
        self.encryptor = Some(Arc::new(encryptor));
        self
    }

    /// Hook applied to every response with a 2xx status.
    pub fn decryptor(mut self, decryptor: impl Decryptor + 'static) -> Self {
        self.decryptor = Some(Arc::new(decryptor));
        self
    }

    /// Destination of transcripts (default: [`TracingLogSink`]).
    pub fn log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    /// # Errors
    ///
    /// Only fails while creating the default transport:
    /// - `RuntimeUnavailable` when called outside a tokio runtime
    /// - `Tls` if the TLS connector cannot be initialized
    pub fn build(self) -> Result<Networking, NetworkError> {
        let transport: Arc<dyn Transport> = if let Some(transport) = self.transport {
            transport
        } else {
            Arc::new(HyperTransportBuilder::from_networking(&self.config).build()?)
        };
        Ok(Networking {
            config: Arc::new(self.config),
            transport,
            encryptor: self.encryptor.unwrap_or_else(|| Arc::new(Passthrough)),
            decryptor: self.decryptor.unwrap_or_else(|| Arc::new(Passthrough)),
            log_sink: self
                .log_sink
                .unwrap_or_else(|| Arc::new(TracingLogSink)),
        })
    }
}

impl Default for NetworkingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::transport::Exchange;
    use crate::request::RawRequest;
    use async_trait::async_trait;
    use http::{HeaderMap, StatusCode};

    struct Fixed(StatusCode);

    #[async_trait]
    impl Transport for Fixed {
        async fn exchange(&self, _: RawRequest) -> Result<Option<Exchange>, NetworkError> {
            Ok(Some(Exchange::http(self.0, HeaderMap::new(), "{}")))
        }
    }

    #[test]
    fn test_builder_config() {
        let networking = Networking::builder()
            .base_url("https://api.example.com")
            .time_out(Duration::from_secs(3))
            .resource_time_out(Duration::from_secs(30))
            .transport(Fixed(StatusCode::OK))
            .build()
            .unwrap();

        let config = networking.config();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.time_out, Duration::from_secs(3));
        assert_eq!(config.resource_time_out, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_default_transport_is_built() {
        let networking = NetworkingBuilder::with_config(NetworkingConfig::default())
            .build()
            .unwrap();
        assert_eq!(networking.config().time_out, Duration::from_secs(10));
    }

    #[test]
    fn test_default_transport_outside_runtime_is_error() {
        let result = Networking::builder().build();
        assert!(matches!(result, Err(NetworkError::RuntimeUnavailable)));
    }

    #[test]
    fn test_explicit_transport_builds_outside_runtime() {
        assert!(Networking::builder().transport(Fixed(StatusCode::OK)).build().is_ok());
    }

    #[tokio::test]
    async fn test_send_does_not_touch_callers_request() {
        let networking = Networking::builder()
            .base_url("https://api.example.com")
            .transport(Fixed(StatusCode::OK))
            .build()
            .unwrap();

        let request = Request::get("/ping");
        let response = networking.send(&request).await.unwrap();

        assert!(request.start().is_none());
        assert!(request.raw_request().is_none());
        assert!(response.request().start().is_some());
        assert_eq!(
            response.request().raw_request().unwrap().uri.to_string(),
            "https://api.example.com/ping"
        );
    }

    #[test]
    fn test_networking_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Networking>();
    }
}
