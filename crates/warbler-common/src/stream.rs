//! Stream abstractions for HTTP response bodies

use std::error::Error;
use std::fmt;

use bytes::Bytes;
use n0_future::Stream;
use n0_future::stream::Boxed;

/// Boxed error type for streaming operations
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Failure of the byte source or of the framing on top of it.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{kind}{}", .source.as_ref().map(|s| format!(": {s}")).unwrap_or_default())]
#[diagnostic(code(warbler::stream::source))]
pub struct StreamError {
    kind: StreamErrorKind,
    #[source]
    source: Option<BoxError>,
}

/// Categories of streaming errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Network or I/O error (connection reset, timeout)
    Transport,
    /// Stream or connection closed
    Closed,
    /// Protocol violation or framing error (malformed or oversized frame)
    Protocol,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "byte source failed",
            Self::Closed => "byte source closed",
            Self::Protocol => "malformed stream",
        })
    }
}

impl StreamError {
    /// Error of `kind`, optionally caused by `source`.
    pub fn new(kind: StreamErrorKind, source: Option<BoxError>) -> Self {
        Self { kind, source }
    }

    /// What went wrong
    pub fn kind(&self) -> &StreamErrorKind {
        &self.kind
    }

    /// Whether a fresh invocation might succeed where this one failed.
    ///
    /// Only transport failures qualify; framing errors will recur.
    pub fn is_transient(&self) -> bool {
        self.kind == StreamErrorKind::Transport
    }

    /// The source ended the connection unexpectedly.
    pub fn closed() -> Self {
        Self::new(StreamErrorKind::Closed, None)
    }

    /// The byte source failed with `source`.
    pub fn transport(source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(StreamErrorKind::Transport, Some(Box::new(source)))
    }

    /// The bytes received violate the stream framing.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Protocol, Some(msg.into().into()))
    }

    /// A frame that is not valid JSON.
    pub fn malformed(source: serde_json::Error) -> Self {
        Self::new(StreamErrorKind::Protocol, Some(Box::new(source)))
    }
}

/// Owned byte source for a streaming response body.
///
/// Holding the value keeps the underlying connection open; [`ByteStream::close`]
/// (or dropping it) releases it.
pub struct ByteStream {
    inner: Boxed<Result<Bytes, StreamError>>,
}

impl ByteStream {
    /// Create a new byte stream from any compatible stream
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StreamError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Pull the next chunk from the source.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, StreamError>> {
        use n0_future::StreamExt;
        self.inner.next().await
    }

    /// Release the underlying connection.
    pub fn close(self) {
        tracing::trace!("closing byte stream");
        drop(self.inner);
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}
