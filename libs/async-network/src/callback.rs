use crate::error::{BoxError, NetworkError};
use crate::request::RawRequest;
use crate::transport::{Exchange, Transport, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;

type Outcome = Result<Option<Exchange>, NetworkError>;

/// One-shot handle through which a callback-style transport reports its result.
///
/// Dropping the handle without calling [`complete`](Self::complete) counts as
/// "nothing was produced".
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Outcome>,
}

impl Completion {
    /// Report the result of the exchange.
    ///
    /// Data together with a response is a success, even if `error` is also
    /// set. Otherwise `error` is a transport failure. With neither, the
    /// exchange produced nothing.
    pub fn complete(
        self,
        data: Option<Bytes>,
        response: Option<TransportResponse>,
        error: Option<BoxError>,
    ) {
        let outcome = match (data, response, error) {
            (Some(body), Some(response), _) => Ok(Some(Exchange { body, response })),
            (_, _, Some(error)) => Err(NetworkError::Transport(error)),
            _ => Ok(None),
        };
        self.deliver(outcome);
    }

    /// Report a completed exchange.
    pub fn respond(self, exchange: Exchange) {
        self.deliver(Ok(Some(exchange)));
    }

    /// Report a transport failure.
    pub fn fail(self, error: impl Into<BoxError>) {
        self.deliver(Err(NetworkError::Transport(error.into())));
    }

    fn deliver(self, outcome: Outcome) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!("exchange completed after the caller stopped waiting");
        }
    }
}

/// Adapts a completion-callback transport to [`Transport`].
///
/// The handler receives the raw request and a [`Completion`]; it may finish
/// synchronously or move the handle into a task and finish later.
///
/// ```ignore
/// let transport = CallbackTransport::new(|request: RawRequest, done: Completion| {
///     legacy_client.start(request, move |data, response, error| {
///         done.complete(data, response, error);
///     });
/// });
/// ```
pub struct CallbackTransport<F> {
    handler: F,
}

impl<F> CallbackTransport<F>
where
    F: Fn(RawRequest, Completion) + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Transport for CallbackTransport<F>
where
    F: Fn(RawRequest, Completion) + Send + Sync,
{
    async fn exchange(&self, request: RawRequest) -> Result<Option<Exchange>, NetworkError> {
        let (tx, rx) = oneshot::channel();
        (self.handler)(request, Completion { tx });
        rx.await.unwrap_or(Ok(None))
    }
}
