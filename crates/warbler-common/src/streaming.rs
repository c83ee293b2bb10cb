//! Streaming delivery of newline-delimited JSON messages
//!
//! A streaming query opens one long-lived response body and hands it to a
//! [`StreamConsumer`], which frames the body, decodes each data message into
//! an [`Envelope`] and passes it to a caller-supplied [`StreamHandler`].
//!
//! Delivery is strictly sequential: the consumer awaits the handler before
//! reading the next frame, so handler invocations happen in arrival order and
//! never overlap. The handler's [`StreamOutcome`] decides whether the stream
//! continues, stops cleanly, or fails with the handler's own error.
//!
//! The consumer never reconnects. Transient transport failures are returned
//! to the caller, who may start a fresh invocation.

mod consumer;
mod frame;

use std::future::Future;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ClientError, DecodeError};
use crate::stream::StreamError;

pub use consumer::{ConsumerState, StreamConsumer};
pub use frame::{Frame, FrameReader};

/// Default upper bound on a single frame, in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Default upper bound on an error body read from a rejected stream request.
pub const DEFAULT_MAX_ERROR_BODY: usize = 64 * 1024;

/// Tuning for a streaming invocation.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
#[builder(start_fn = new)]
pub struct StreamOptions {
    /// Largest frame accepted before the stream is aborted
    #[builder(default = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Largest error body read when the server rejects the stream request
    #[builder(default = DEFAULT_MAX_ERROR_BODY)]
    pub max_error_body: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new().build()
    }
}

/// A decoded data message together with the bytes it was decoded from
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    raw: Bytes,
    message: T,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode a data frame payload.
    pub fn decode(raw: Bytes) -> Result<Self, DecodeError> {
        let message = serde_json::from_slice(&raw)?;
        Ok(Self { raw, message })
    }
}

impl<T> Envelope<T> {
    /// The decoded message
    pub fn message(&self) -> &T {
        &self.message
    }

    /// The raw JSON the message was decoded from
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Decode the raw bytes again into a different shape, borrowing from the envelope.
    pub fn decode_as<'a, U: Deserialize<'a>>(&'a self) -> Result<U, DecodeError> {
        Ok(serde_json::from_slice(&self.raw)?)
    }

    /// Split into raw bytes and message
    pub fn into_parts(self) -> (Bytes, T) {
        (self.raw, self.message)
    }
}

/// What a handler wants to happen after it has seen a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome<E> {
    /// Read the next frame
    Continue,
    /// Close the stream and return successfully
    Stop,
    /// Close the stream and return this error
    Fail(E),
}

/// How a streaming invocation ended successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The handler asked to stop
    Stopped,
    /// The server ended the stream
    Closed,
}

/// Caller logic invoked once per delivered message.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait StreamHandler<T> {
    /// Error type the handler can fail with
    type Error;

    /// Handle one decoded data message.
    fn on_message(
        &mut self,
        envelope: &Envelope<T>,
    ) -> impl Future<Output = StreamOutcome<Self::Error>>;

    /// Observe a provider error delivered on the stream.
    ///
    /// Called for advisory and fatal errors alike. A fatal error ends the
    /// stream with [`StreamingError::Api`] once this returns, whatever the
    /// outcome; for advisory errors the outcome decides.
    fn on_api_error(&mut self, error: &ApiError) -> impl Future<Output = StreamOutcome<Self::Error>> {
        let _ = error;
        async { StreamOutcome::Continue }
    }
}

/// Adapter turning a synchronous closure into a [`StreamHandler`].
pub struct HandlerFn<F, E> {
    f: F,
    _error: PhantomData<fn() -> E>,
}

/// Wrap a closure as a [`StreamHandler`].
///
/// ```
/// use warbler_common::streaming::{handler_fn, HandlerFn, StreamOutcome, Envelope};
///
/// let mut seen = 0;
/// let _handler: HandlerFn<_, std::convert::Infallible> = handler_fn(move |_msg: &Envelope<serde_json::Value>| {
///     seen += 1;
///     if seen == 3 { StreamOutcome::<std::convert::Infallible>::Stop } else { StreamOutcome::Continue }
/// });
/// ```
pub fn handler_fn<F, E>(f: F) -> HandlerFn<F, E> {
    HandlerFn {
        f,
        _error: PhantomData,
    }
}

impl<T, E, F> StreamHandler<T> for HandlerFn<F, E>
where
    F: FnMut(&Envelope<T>) -> StreamOutcome<E> + Send,
    E: Send,
{
    type Error = E;

    fn on_message(
        &mut self,
        envelope: &Envelope<T>,
    ) -> impl Future<Output = StreamOutcome<E>> + Send {
        std::future::ready((self.f)(envelope))
    }
}

impl<T, H> StreamHandler<T> for &mut H
where
    H: StreamHandler<T> + Send,
{
    type Error = H::Error;

    fn on_message(
        &mut self,
        envelope: &Envelope<T>,
    ) -> impl Future<Output = StreamOutcome<H::Error>> + Send {
        (**self).on_message(envelope)
    }

    fn on_api_error(
        &mut self,
        error: &ApiError,
    ) -> impl Future<Output = StreamOutcome<H::Error>> + Send {
        (**self).on_api_error(error)
    }
}

/// Stops the stream once the inner handler has seen `limit` messages.
pub struct Limit<H> {
    inner: H,
    remaining: usize,
}

impl<H> Limit<H> {
    /// Deliver at most `limit` messages to `inner`.
    pub fn new(inner: H, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }

    /// Recover the inner handler
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<T, H> StreamHandler<T> for Limit<H>
where
    H: StreamHandler<T> + Send,
    T: Sync,
{
    type Error = H::Error;

    async fn on_message(&mut self, envelope: &Envelope<T>) -> StreamOutcome<H::Error> {
        if self.remaining == 0 {
            return StreamOutcome::Stop;
        }
        self.remaining -= 1;
        match self.inner.on_message(envelope).await {
            StreamOutcome::Continue if self.remaining == 0 => StreamOutcome::Stop,
            outcome => outcome,
        }
    }

    async fn on_api_error(&mut self, error: &ApiError) -> StreamOutcome<H::Error> {
        self.inner.on_api_error(error).await
    }
}

/// Why a streaming invocation failed.
///
/// `E` is the handler's own error type, returned unchanged in
/// [`StreamingError::Handler`].
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum StreamingError<E: std::fmt::Debug + std::fmt::Display> {
    /// The stream request failed or was rejected before any frame arrived
    #[error("failed to open stream: {0}")]
    #[diagnostic(code(warbler::streaming::connect))]
    Connect(
        #[source]
        #[diagnostic_source]
        ClientError,
    ),

    /// Reading or framing the body failed
    #[error("stream failed: {0}")]
    #[diagnostic(code(warbler::streaming::stream))]
    Stream(#[source] StreamError),

    /// A data message did not match the expected shape
    #[error("failed to decode message: {0}")]
    #[diagnostic(code(warbler::streaming::decode))]
    Decode(#[source] DecodeError),

    /// The provider sent a fatal error on the stream
    #[error("stream ended by provider: {0}")]
    #[diagnostic(code(warbler::streaming::api))]
    Api(#[source] ApiError),

    /// The caller's cancellation signal fired
    #[error("stream cancelled")]
    #[diagnostic(code(warbler::streaming::cancelled))]
    Cancelled,

    /// The handler failed
    #[error("stream handler failed: {0}")]
    #[diagnostic(code(warbler::streaming::handler))]
    Handler(E),
}

impl<E: std::fmt::Debug + std::fmt::Display> StreamingError<E> {
    /// True for [`StreamingError::Cancelled`]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True if a fresh invocation might succeed (transport read failures)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Stream(e) => e.is_transient(),
            Self::Connect(ClientError::Transport(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Full {
        data: Inner,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        id: String,
        text: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct IdOnly<'a> {
        #[serde(borrow)]
        data: IdInner<'a>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct IdInner<'a> {
        id: &'a str,
    }

    #[test]
    fn envelope_keeps_raw_for_reprojection() {
        let raw = Bytes::from_static(br#"{"data":{"id":"42","text":"hi"}}"#);
        let env: Envelope<Full> = Envelope::decode(raw.clone()).unwrap();
        assert_eq!(env.message().data.text, "hi");
        assert_eq!(env.raw(), &raw);

        let projected: IdOnly<'_> = env.decode_as().unwrap();
        assert_eq!(projected.data.id, "42");
    }

    #[test]
    fn envelope_decode_reports_shape_mismatch() {
        let raw = Bytes::from_static(br#"{"data":{"id":42}}"#);
        assert!(Envelope::<Full>::decode(raw).is_err());
    }

    #[test]
    fn stream_options_defaults() {
        let opts = StreamOptions::default();
        assert_eq!(opts.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(opts.max_error_body, DEFAULT_MAX_ERROR_BODY);

        let opts = StreamOptions::new().max_frame_size(512).build();
        assert_eq!(opts.max_frame_size, 512);
    }

    #[tokio::test]
    async fn limit_stops_after_n_messages() {
        let raw = Bytes::from_static(br#"{"data":{"id":"1","text":"a"}}"#);
        let env: Envelope<Full> = Envelope::decode(raw).unwrap();
        let inner = handler_fn(|_: &Envelope<Full>| StreamOutcome::<String>::Continue);
        let mut limited = Limit::new(inner, 2);

        assert_eq!(limited.on_message(&env).await, StreamOutcome::Continue);
        assert_eq!(limited.on_message(&env).await, StreamOutcome::Stop);
    }
}
