//! Transport, streaming and pagination core for the warbler API client

#![warn(missing_docs)]
pub use bytes;
pub use smol_str;
pub use tokio_util::sync::CancellationToken;
pub use url;

/// Client handle that builds, sends and decodes calls.
pub mod client;
pub mod error;
/// HTTP client abstraction used by warbler crates.
pub mod http_client;
pub mod pagination;
pub mod params;
pub mod query;
/// Byte sources for streaming response bodies.
pub mod stream;
pub mod streaming;

pub use client::{ApiClient, AuthorizationToken, CallOptions};
pub use error::{ApiError, ApiErrorKind, ClientError, ClientResult};
pub use http_client::{HttpClient, HttpClientExt};
pub use pagination::{PageCursor, PageReply, Paged, PagedQuery};
pub use params::Params;
pub use query::{ApiRequest, Body, Query, StreamQuery};
pub use stream::{ByteStream, StreamError, StreamErrorKind};
pub use streaming::{
    Envelope, Limit, StreamEnd, StreamHandler, StreamOptions, StreamOutcome, StreamingError,
    handler_fn,
};
