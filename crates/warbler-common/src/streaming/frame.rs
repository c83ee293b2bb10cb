//! Newline-delimited JSON framing with keep-alive lines

use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::stream::{ByteStream, StreamError};

/// One delimited unit read from a streaming body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A data message; the payload has trailing whitespace removed
    Data(Bytes),
    /// A whitespace-only line sent to prove the connection is alive
    KeepAlive,
    /// A provider error document
    Error(Bytes),
}

impl Frame {
    /// Classify one line read from the stream.
    ///
    /// Whitespace-only lines are keep-alives. Anything else must be a JSON
    /// object. Objects without `data` that carry `errors`, or a problem
    /// `title` and `type`, are error documents.
    pub fn classify(line: Bytes) -> Result<Self, StreamError> {
        let end = line
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        if end == 0 {
            return Ok(Frame::KeepAlive);
        }
        let payload = line.slice(..end);

        #[derive(Deserialize)]
        struct Probe {
            #[serde(default)]
            data: Option<IgnoredAny>,
            #[serde(default)]
            errors: Option<IgnoredAny>,
            #[serde(default)]
            title: Option<IgnoredAny>,
            #[serde(default, rename = "type")]
            problem_type: Option<IgnoredAny>,
        }

        let probe: Probe = serde_json::from_slice(&payload).map_err(StreamError::malformed)?;
        let problem = probe.title.is_some() && probe.problem_type.is_some();
        if probe.data.is_none() && (probe.errors.is_some() || problem) {
            Ok(Frame::Error(payload))
        } else {
            Ok(Frame::Data(payload))
        }
    }
}

/// Splits a [`ByteStream`] into [`Frame`]s.
///
/// Never retries: read errors from the source are returned as-is. A line
/// longer than `max_frame_size` is a protocol error, raised as soon as the
/// buffered partial line exceeds the bound.
#[derive(Debug)]
pub struct FrameReader {
    source: ByteStream,
    buffer: BytesMut,
    scanned: usize,
    max_frame_size: usize,
    exhausted: bool,
}

impl FrameReader {
    /// Wrap a byte source.
    pub fn new(source: ByteStream, max_frame_size: usize) -> Self {
        Self {
            source,
            buffer: BytesMut::new(),
            scanned: 0,
            max_frame_size,
            exhausted: false,
        }
    }

    /// Read the next frame, or `None` once the source has ended.
    ///
    /// Cancel safe: bytes already pulled from the source stay buffered if the
    /// returned future is dropped.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, StreamError> {
        loop {
            if let Some(line) = self.split_line()? {
                return Frame::classify(line).map(Some);
            }
            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                // unterminated final line
                let rest = self.buffer.split().freeze();
                self.scanned = 0;
                return Frame::classify(rest).map(Some);
            }
            match self.source.next_chunk().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(e),
                None => self.exhausted = true,
            }
        }
    }

    /// Release the byte source. Consumes the reader.
    pub fn close(self) {
        self.source.close();
    }

    fn split_line(&mut self) -> Result<Option<Bytes>, StreamError> {
        match self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                if end > self.max_frame_size {
                    return Err(self.too_large(end));
                }
                let mut line = self.buffer.split_to(end + 1);
                line.truncate(end);
                self.scanned = 0;
                Ok(Some(line.freeze()))
            }
            None => {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_frame_size {
                    return Err(self.too_large(self.buffer.len()));
                }
                Ok(None)
            }
        }
    }

    fn too_large(&self, len: usize) -> StreamError {
        StreamError::protocol(format!(
            "frame of at least {} bytes exceeds limit of {} bytes",
            len, self.max_frame_size
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamErrorKind;

    fn reader(chunks: &[&'static str], max: usize) -> FrameReader {
        let items: Vec<Result<Bytes, StreamError>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        FrameReader::new(ByteStream::new(futures::stream::iter(items)), max)
    }

    #[tokio::test]
    async fn frames_split_across_chunks() {
        let mut r = reader(&["{\"data\":{\"id\":", "\"1\"}}\r\n\r\n{\"data\":", "{\"id\":\"2\"}}\n"], 1024);

        assert_eq!(
            r.next_frame().await.unwrap(),
            Some(Frame::Data(Bytes::from_static(br#"{"data":{"id":"1"}}"#)))
        );
        assert_eq!(r.next_frame().await.unwrap(), Some(Frame::KeepAlive));
        assert_eq!(
            r.next_frame().await.unwrap(),
            Some(Frame::Data(Bytes::from_static(br#"{"data":{"id":"2"}}"#)))
        );
        assert_eq!(r.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn error_documents_are_classified() {
        let mut r = reader(
            &[
                "{\"errors\":[{\"title\":\"operational-disconnect\"}]}\n",
                "{\"data\":{\"id\":\"1\"},\"errors\":[{\"title\":\"partial\"}]}\n",
            ],
            1024,
        );
        assert!(matches!(r.next_frame().await.unwrap(), Some(Frame::Error(_))));
        assert!(matches!(r.next_frame().await.unwrap(), Some(Frame::Data(_))));
    }

    #[test]
    fn bare_problem_document_is_an_error_frame() {
        let line = Bytes::from_static(
            br#"{"title":"ConnectionException","detail":"This stream is currently at the maximum allowed connection limit.","type":"https://api.twitter.com/2/problems/streaming-connection"}"#,
        );
        assert!(matches!(Frame::classify(line), Ok(Frame::Error(_))));
        let titled_data = Bytes::from_static(br#"{"title":"not a problem","id":"7"}"#);
        assert!(matches!(Frame::classify(titled_data), Ok(Frame::Data(_))));
    }

    #[tokio::test]
    async fn unterminated_last_line_is_delivered() {
        let mut r = reader(&["{\"data\":1}"], 1024);
        assert!(matches!(r.next_frame().await.unwrap(), Some(Frame::Data(_))));
        assert_eq!(r.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_partial_line_fails_before_newline() {
        let mut r = reader(&["{\"data\":\"0123456789", "0123456789\"}"], 16);
        let err = r.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), &StreamErrorKind::Protocol);
    }

    #[tokio::test]
    async fn malformed_json_is_a_protocol_error() {
        let mut r = reader(&["not json\n"], 1024);
        let err = r.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), &StreamErrorKind::Protocol);
    }

    #[tokio::test]
    async fn read_errors_pass_through() {
        let items = vec![
            Ok(Bytes::from_static(b"\r\n")),
            Err(StreamError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ];
        let mut r = FrameReader::new(ByteStream::new(futures::stream::iter(items)), 1024);
        assert_eq!(r.next_frame().await.unwrap(), Some(Frame::KeepAlive));
        let err = r.next_frame().await.unwrap_err();
        assert!(err.is_transient());
    }
}
