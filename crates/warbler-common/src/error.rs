//! Errors of REST calls and provider error documents

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Client error type wrapping all possible error conditions of a REST call
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ClientError {
    /// The call never produced a reply
    #[error("request failed: {0}")]
    #[diagnostic(code(warbler::client::transport))]
    Transport(
        #[from]
        #[diagnostic_source]
        TransportError,
    ),

    /// The query could not be encoded
    #[error("{0}")]
    #[diagnostic(code(warbler::client::encode))]
    Encode(
        #[from]
        #[diagnostic_source]
        EncodeError,
    ),

    /// The reply did not have the expected shape
    #[error("{0}")]
    #[diagnostic(code(warbler::client::decode))]
    Decode(
        #[from]
        #[diagnostic_source]
        DecodeError,
    ),

    /// HTTP error response that did not carry a provider error document
    #[error("{0}")]
    #[diagnostic(code(warbler::client::http))]
    Http(
        #[from]
        #[diagnostic_source]
        HttpError,
    ),

    /// Structured error reported by the provider
    #[error("rejected by provider: {0}")]
    #[diagnostic(code(warbler::client::api))]
    Api(
        #[from]
        #[diagnostic_source]
        ApiError,
    ),
}

/// Failures below the HTTP reply: connecting, timing out, building the request
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TransportError {
    /// Could not reach the API host
    #[error("could not connect: {0}")]
    Connect(String),

    /// Request timed out
    #[error("timed out")]
    Timeout,

    /// The HTTP request could not be built (bad URI, header value, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Other transport error
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Error type for encoding request parameters and bodies
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EncodeError {
    /// Parameters could not be form-encoded
    #[error("could not encode parameters: {0}")]
    Query(
        #[from]
        #[source]
        serde_html_form::ser::Error,
    ),
    /// The JSON body could not be serialized
    #[error("could not encode JSON body: {0}")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// A reply body that does not decode into the expected type
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    /// Malformed JSON or an unexpected shape
    #[error("could not decode reply: {0}")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// HTTP error response (non-2xx status codes without a decodable error document)
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct HttpError {
    /// HTTP status code
    pub status: StatusCode,
    /// Reply body, kept for diagnostics
    pub body: Option<Bytes>,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unexpected status {}", self.status)?;
        match self.body.as_deref().map(std::str::from_utf8) {
            Some(Ok(text)) if !text.trim().is_empty() => write!(f, ": {}", text.trim()),
            _ => Ok(()),
        }
    }
}

/// Result of a REST call
pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Error for a non-success reply: the provider's error document when the
    /// body holds one, a bare [`HttpError`] otherwise.
    pub fn from_reply(status: StatusCode, body: Bytes) -> Self {
        match ApiError::from_slice(&body) {
            Ok(error) => error.with_status(status).into(),
            Err(_) => HttpError {
                status,
                body: Some(body),
            }
            .into(),
        }
    }

    /// The provider error, if this is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "reqwest-client")]
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() || e.is_request() {
            Self::InvalidRequest(e.to_string())
        } else {
            Self::Other(Box::new(e))
        }
    }
}

/// Broad classification of a provider-reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Request quota exhausted (rate limit or usage cap)
    RateLimited,
    /// Credentials missing, invalid, or revoked
    Unauthorized,
    /// Credentials valid but not permitted to access the resource
    Forbidden,
    /// Requested resource does not exist
    NotFound,
    /// Request rejected as malformed or invalid
    Invalid,
    /// Server closed a stream (operational disconnect, connection limits)
    Disconnect,
    /// Anything not recognised above
    Other,
}

impl ApiErrorKind {
    /// Whether an error of this kind must end a streaming invocation.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden | Self::Disconnect)
    }

    fn from_status(status: StatusCode) -> Option<Self> {
        Some(match status.as_u16() {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 422 => Self::Invalid,
            429 => Self::RateLimited,
            _ => return None,
        })
    }

    // Legacy (1.1) numeric error codes.
    fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            32 | 89 | 99 | 135 | 215 | 326 => Self::Unauthorized,
            64 | 87 | 93 | 179 | 220 | 261 => Self::Forbidden,
            34 | 50 | 63 | 144 => Self::NotFound,
            88 | 185 => Self::RateLimited,
            44 | 186 | 187 | 324 | 325 => Self::Invalid,
            _ => return None,
        })
    }

    // Problem document `type` URIs and titles.
    fn from_problem(problem: &str) -> Option<Self> {
        let tail = problem.rsplit('/').next().unwrap_or(problem);
        Some(match tail.to_ascii_lowercase().replace(' ', "-").as_str() {
            "unauthorized" | "not-authorized" | "authentication-error" => Self::Unauthorized,
            "forbidden" | "client-forbidden" | "not-authorized-for-resource"
            | "not-authorized-for-field" => Self::Forbidden,
            "resource-not-found" | "not-found" => Self::NotFound,
            "usage-capped" | "too-many-requests" | "rate-limit-exceeded" => Self::RateLimited,
            "invalid-request" | "invalid-rules" | "rule-cap" | "duplicate-rules" => Self::Invalid,
            "operational-disconnect" | "connectionexception" | "streaming-connection" => {
                Self::Disconnect
            }
            _ => return None,
        })
    }
}

/// One entry of a provider error document.
///
/// Covers both the legacy `{"code", "message"}` shape and problem entries
/// carrying `title`, `detail`, `type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorDetail {
    /// Legacy numeric error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Legacy error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<SmolStr>,
    /// Short problem title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    /// Human-readable problem detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Problem type URI
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<SmolStr>,
    /// Disconnect reason reported on streams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnect_type: Option<SmolStr>,
}

impl ErrorDetail {
    /// Classify this entry on its own.
    pub fn kind(&self) -> ApiErrorKind {
        if self.disconnect_type.is_some() {
            return ApiErrorKind::Disconnect;
        }
        self.code
            .and_then(ApiErrorKind::from_code)
            .or_else(|| {
                self.problem_type
                    .as_deref()
                    .and_then(ApiErrorKind::from_problem)
            })
            .or_else(|| self.title.as_deref().and_then(ApiErrorKind::from_problem))
            .unwrap_or(ApiErrorKind::Other)
    }

    fn summary(&self) -> &str {
        self.detail
            .as_deref()
            .or(self.message.as_deref())
            .or(self.title.as_deref())
            .unwrap_or("unspecified error")
    }
}

/// Structured error document returned by the provider.
///
/// Decoded from non-success REST replies and from error frames delivered
/// mid-stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, thiserror::Error, miette::Diagnostic)]
pub struct ApiError {
    /// Individual errors, in the order reported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDetail>,
    /// Top-level problem title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    /// Top-level problem detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Top-level problem type URI
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<SmolStr>,
    /// HTTP status this error arrived with (context only; not serialized)
    #[serde(skip)]
    pub status: Option<StatusCode>,
}

impl ApiError {
    /// Decode an error document, rejecting documents that carry no error information.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        let error: Self = serde_json::from_slice(body)?;
        if error.is_empty() {
            return Err(DecodeError::Json(serde::de::Error::custom(
                "document contains no error information",
            )));
        }
        Ok(error)
    }

    /// Attach the HTTP status the error was returned with.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// True if the document names no error at all.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
            && self.title.is_none()
            && self.detail.is_none()
            && self.problem_type.is_none()
    }

    /// Classify the error.
    ///
    /// The HTTP status wins when it is recognised; otherwise the first entry
    /// or the top-level problem fields decide.
    pub fn kind(&self) -> ApiErrorKind {
        if let Some(kind) = self.status.and_then(ApiErrorKind::from_status) {
            return kind;
        }
        let top = ErrorDetail {
            title: self.title.clone(),
            detail: self.detail.clone(),
            problem_type: self.problem_type.clone(),
            ..Default::default()
        };
        self.errors
            .iter()
            .map(ErrorDetail::kind)
            .find(|k| *k != ApiErrorKind::Other)
            .unwrap_or_else(|| top.kind())
    }

    /// Whether this error must end a streaming invocation.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.kind())?;
        if let Some(title) = &self.title {
            write!(f, ": {}", title)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, e.summary())?;
            if let Some(code) = e.code {
                write!(f, " (code {})", code)?;
            }
        }
        if let Some(status) = self.status {
            write!(f, " (status={})", status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_rate_limit_document() {
        let body = br#"{"errors":[{"code":88,"message":"Rate limit exceeded"}]}"#;
        let err = ApiError::from_slice(body).unwrap();
        assert_eq!(err.kind(), ApiErrorKind::RateLimited);
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("Rate limit exceeded"));
    }

    #[test]
    fn problem_document_uses_status_first() {
        let body = br#"{"title":"Unauthorized","type":"about:blank","status":401,"detail":"Unauthorized"}"#;
        let err = ApiError::from_slice(body)
            .unwrap()
            .with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert!(err.is_fatal());
    }

    #[test]
    fn stream_disconnect_is_fatal() {
        let body = br#"{"errors":[{"title":"operational-disconnect","disconnect_type":"UpstreamOperationalDisconnect","detail":"This stream has been disconnected upstream for operational reasons.","type":"https://api.twitter.com/2/problems/operational-disconnect"}]}"#;
        let err = ApiError::from_slice(body).unwrap();
        assert_eq!(err.kind(), ApiErrorKind::Disconnect);
        assert!(err.is_fatal());
    }

    #[test]
    fn unknown_problem_is_advisory() {
        let body = br#"{"errors":[{"title":"Something odd","detail":"ignore me"}]}"#;
        let err = ApiError::from_slice(body).unwrap();
        assert_eq!(err.kind(), ApiErrorKind::Other);
        assert!(!err.is_fatal());
    }

    #[test]
    fn reply_without_document_is_http_error() {
        let err = ClientError::from_reply(
            StatusCode::BAD_GATEWAY,
            Bytes::from_static(b"<html>bad gateway</html>"),
        );
        assert!(matches!(err, ClientError::Http(HttpError { status, .. }) if status == StatusCode::BAD_GATEWAY));

        let err = ClientError::from_reply(
            StatusCode::TOO_MANY_REQUESTS,
            Bytes::from_static(br#"{"title":"Too Many Requests","detail":"Too Many Requests","type":"about:blank","status":429}"#),
        );
        assert_eq!(err.api_error().unwrap().kind(), ApiErrorKind::RateLimited);
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(ApiError::from_slice(b"{}").is_err());
        assert!(ApiError::from_slice(b"not json").is_err());
    }
}
