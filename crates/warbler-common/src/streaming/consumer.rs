use std::fmt::{Debug, Display};

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::frame::{Frame, FrameReader};
use super::{Envelope, StreamEnd, StreamHandler, StreamOptions, StreamOutcome, StreamingError};
use crate::error::{ApiError, ClientError, TransportError};
use crate::http_client::HttpClientExt;
use crate::stream::ByteStream;

/// Lifecycle of a [`StreamConsumer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Not yet started
    Idle,
    /// Waiting for the byte source
    Connecting,
    /// Reading frames and dispatching messages
    Receiving,
    /// Ended because the handler asked to stop
    Stopped,
    /// Ended with an error or cancellation
    Failed,
    /// Ended because the server closed the stream
    Closed,
}

/// Runs exactly one streaming invocation.
///
/// The consumer is consumed by [`run`](Self::run) or [`consume`](Self::consume),
/// so a finished consumer can never re-enter `Receiving`. The byte source is
/// closed exactly once on every exit path.
#[derive(Debug)]
pub struct StreamConsumer {
    options: StreamOptions,
    state: ConsumerState,
    delivered: u64,
}

impl StreamConsumer {
    /// New consumer in the `Idle` state.
    pub fn new(options: StreamOptions) -> Self {
        Self {
            options,
            state: ConsumerState::Idle,
            delivered: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Open the stream with `client` and deliver its messages to `handler`.
    ///
    /// Non-success replies are read (up to `max_error_body` bytes) and
    /// surfaced as [`StreamingError::Connect`], carrying the provider's error
    /// document when the body holds one.
    #[tracing::instrument(level = "debug", skip_all, fields(uri = %request.uri()))]
    pub async fn run<C, T, H>(
        mut self,
        client: &C,
        request: http::Request<Vec<u8>>,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, StreamingError<H::Error>>
    where
        C: HttpClientExt + Sync,
        T: DeserializeOwned,
        H: StreamHandler<T>,
        H::Error: Debug + Display,
    {
        self.transition(ConsumerState::Connecting);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.transition(ConsumerState::Failed);
                return Err(StreamingError::Cancelled);
            }
            response = client.send_http_streaming(request) => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.transition(ConsumerState::Failed);
                return Err(StreamingError::Connect(
                    TransportError::Other(Box::new(e)).into(),
                ));
            }
        };

        let (parts, body) = response.into_parts();
        if !parts.status.is_success() {
            tracing::warn!(status = %parts.status, "stream request rejected");
            let limit = self.options.max_error_body;
            let error = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                buffer = read_error_body(body, limit) => Some(buffer),
            };
            self.transition(ConsumerState::Failed);
            return match error {
                None => Err(StreamingError::Cancelled),
                Some(buffer) => Err(StreamingError::Connect(ClientError::from_reply(
                    parts.status,
                    buffer.freeze(),
                ))),
            };
        }

        self.consume(body, handler, cancel).await
    }

    /// Deliver the messages of an already open byte source to `handler`.
    pub async fn consume<T, H>(
        mut self,
        source: ByteStream,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, StreamingError<H::Error>>
    where
        T: DeserializeOwned,
        H: StreamHandler<T>,
        H::Error: Debug + Display,
    {
        let mut reader = FrameReader::new(source, self.options.max_frame_size);
        self.transition(ConsumerState::Receiving);

        let result = self.receive(&mut reader, handler, cancel).await;
        reader.close();

        match &result {
            Ok(StreamEnd::Stopped) => self.transition(ConsumerState::Stopped),
            Ok(StreamEnd::Closed) => self.transition(ConsumerState::Closed),
            Err(e) => {
                tracing::debug!(error = %e, "stream failed");
                self.transition(ConsumerState::Failed);
            }
        }
        result
    }

    async fn receive<T, H>(
        &mut self,
        reader: &mut FrameReader,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, StreamingError<H::Error>>
    where
        T: DeserializeOwned,
        H: StreamHandler<T>,
        H::Error: Debug + Display,
    {
        loop {
            if cancel.is_cancelled() {
                return Err(StreamingError::Cancelled);
            }
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamingError::Cancelled),
                frame = reader.next_frame() => frame,
            };

            let outcome = match frame.map_err(StreamingError::Stream)? {
                None => return Ok(StreamEnd::Closed),
                Some(Frame::KeepAlive) => {
                    tracing::trace!("keep-alive");
                    continue;
                }
                Some(Frame::Error(raw)) => {
                    let error = ApiError::from_slice(&raw).map_err(StreamingError::Decode)?;
                    let fatal = error.is_fatal();
                    if fatal {
                        tracing::debug!(error = %error, "fatal provider error on stream");
                    } else {
                        tracing::warn!(error = %error, "provider error on stream");
                    }
                    let outcome = handler.on_api_error(&error).await;
                    if fatal {
                        return Err(StreamingError::Api(error));
                    }
                    outcome
                }
                Some(Frame::Data(raw)) => {
                    let envelope = Envelope::<T>::decode(raw).map_err(StreamingError::Decode)?;
                    self.delivered += 1;
                    tracing::trace!(delivered = self.delivered, "message");
                    handler.on_message(&envelope).await
                }
            };

            match outcome {
                StreamOutcome::Continue => {}
                StreamOutcome::Stop => return Ok(StreamEnd::Stopped),
                StreamOutcome::Fail(e) => return Err(StreamingError::Handler(e)),
            }
        }
    }

    fn transition(&mut self, next: ConsumerState) {
        tracing::debug!(from = ?self.state, to = ?next, delivered = self.delivered, "stream state");
        self.state = next;
    }
}

async fn read_error_body(mut body: ByteStream, limit: usize) -> BytesMut {
    let mut buffer = BytesMut::new();
    while buffer.len() < limit {
        match body.next_chunk().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(limit - buffer.len());
                buffer.extend_from_slice(&chunk[..take]);
            }
            Some(Err(_)) | None => break,
        }
    }
    body.close();
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{StreamError, StreamErrorKind};
    use bytes::Bytes;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Msg {
        data: Data,
    }

    #[derive(Debug, Deserialize)]
    struct Data {
        id: String,
    }

    fn source(lines: &[&'static str]) -> ByteStream {
        let chunks: Vec<Result<Bytes, StreamError>> = lines
            .iter()
            .map(|l| Ok(Bytes::from_static(l.as_bytes())))
            .collect();
        ByteStream::new(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn delivers_in_order_and_closes() {
        let mut seen = Vec::new();
        let mut handler = super::super::handler_fn(|env: &Envelope<Msg>| {
            seen.push(env.message().data.id.clone());
            StreamOutcome::<String>::Continue
        });
        let end = StreamConsumer::new(StreamOptions::default())
            .consume::<Msg, _>(
                source(&["{\"data\":{\"id\":\"1\"}}\n\r\n", "{\"data\":{\"id\":\"2\"}}\n"]),
                &mut handler,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(end, StreamEnd::Closed);
        assert_eq!(seen, ["1", "2"]);
    }

    #[tokio::test]
    async fn decode_failure_is_fatal() {
        let mut handler =
            super::super::handler_fn(|_: &Envelope<Msg>| StreamOutcome::<String>::Continue);
        let err = StreamConsumer::new(StreamOptions::default())
            .consume::<Msg, _>(
                source(&["{\"data\":{\"id\":7}}\n"]),
                &mut handler,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StreamingError::Decode(_)));
    }

    #[tokio::test]
    async fn already_cancelled_token_stops_before_reading() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut handler =
            super::super::handler_fn(|_: &Envelope<Msg>| StreamOutcome::<String>::Continue);
        let err = StreamConsumer::new(StreamOptions::default())
            .consume::<Msg, _>(source(&["{\"data\":{\"id\":\"1\"}}\n"]), &mut handler, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn transport_error_is_surfaced_not_retried() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"data\":{\"id\":\"1\"}}\n")),
            Err(StreamError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ];
        let mut count = 0;
        let mut handler = super::super::handler_fn(|_: &Envelope<Msg>| {
            count += 1;
            StreamOutcome::<String>::Continue
        });
        let err = StreamConsumer::new(StreamOptions::default())
            .consume::<Msg, _>(
                ByteStream::new(futures::stream::iter(chunks)),
                &mut handler,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_transient());
        match err {
            StreamingError::Stream(e) => assert_eq!(e.kind(), &StreamErrorKind::Transport),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(count, 1);
    }
}
