//! Shared client handle driving queries over an [`HttpClient`]

use std::fmt::{Debug, Display};

use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{ClientError, ClientResult, TransportError};
use crate::http_client::{HttpClient, HttpClientExt};
use crate::query::{ApiRequest, Body, Query, StreamQuery};
use crate::streaming::{StreamConsumer, StreamEnd, StreamHandler, StreamOptions, StreamingError};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

/// Authorization token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationToken {
    /// OAuth 2 bearer token (app-only or user context)
    Bearer(SmolStr),
}

/// Options applied to every call made through an [`ApiClient`].
#[derive(Debug, Default, Clone)]
pub struct CallOptions {
    /// Optional Authorization to apply
    pub auth: Option<AuthorizationToken>,
    /// Extra headers to attach to each request.
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

/// Immutable handle around a transport, shared by all queries.
///
/// Cloning is as cheap as cloning the transport; independent streaming
/// invocations may run concurrently on clones or on a shared reference.
///
/// ```no_run
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// use warbler_common::client::{ApiClient, AuthorizationToken};
/// use warbler_common::params::Params;
/// use warbler_common::query::ApiRequest;
///
/// let client = ApiClient::new(reqwest::Client::new())
///     .auth(AuthorizationToken::Bearer("token".into()));
/// let body = client
///     .call_raw(&ApiRequest::get("2/tweets/20", Params::new()))
///     .await?;
/// println!("{}", String::from_utf8_lossy(&body));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient<C> {
    http: C,
    base: Url,
    opts: CallOptions,
    stream_options: StreamOptions,
}

impl<C> ApiClient<C> {
    /// Client talking to [`DEFAULT_BASE_URL`].
    pub fn new(http: C) -> Self {
        Self::with_base(http, Url::parse(DEFAULT_BASE_URL).expect("valid url"))
    }

    /// Client talking to `base`.
    pub fn with_base(http: C, base: Url) -> Self {
        Self {
            http,
            base,
            opts: CallOptions::default(),
            stream_options: StreamOptions::default(),
        }
    }

    /// Authorize every call with `token`.
    pub fn auth(mut self, token: AuthorizationToken) -> Self {
        self.opts.auth = Some(token);
        self
    }

    /// Attach `name: value` to every call.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.opts.extra_headers.push((name, value));
        self
    }

    /// Replace the per-call options wholesale.
    pub fn with_options(mut self, opts: CallOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Tuning for streaming invocations.
    pub fn stream_options(mut self, options: StreamOptions) -> Self {
        self.stream_options = options;
        self
    }

    /// The underlying transport
    pub fn http(&self) -> &C {
        &self.http
    }

    /// Base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Per-call options
    pub fn options(&self) -> &CallOptions {
        &self.opts
    }

    /// Build the HTTP request for `req`.
    ///
    /// The endpoint path is appended to the base path with a single `/`.
    /// Parameters go in the body for [`Body::Form`] and in the query string
    /// otherwise.
    pub fn build_request(&self, req: &ApiRequest) -> ClientResult<http::Request<Vec<u8>>> {
        let mut url = self.base.clone();
        let mut path = url.path().trim_end_matches('/').to_owned();
        path.push('/');
        path.push_str(req.path.trim_start_matches('/'));
        url.set_path(&path);

        let encoded = req.params.encode()?;
        if matches!(req.body, Body::Form) || encoded.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&encoded));
        }

        let mut builder = http::Request::builder()
            .method(req.method.clone())
            .uri(url.as_str())
            .header(ACCEPT, "application/json");

        if let Some(token) = &self.opts.auth {
            let hv = match token {
                AuthorizationToken::Bearer(t) => HeaderValue::from_str(&format!("Bearer {}", t)),
            }
            .map_err(|e| {
                TransportError::InvalidRequest(format!("Invalid authorization token: {}", e))
            })?;
            builder = builder.header(AUTHORIZATION, hv);
        }
        for (name, value) in &self.opts.extra_headers {
            builder = builder.header(name, value);
        }

        let body = match &req.body {
            Body::None => Vec::new(),
            Body::Form => {
                builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
                encoded.into_bytes()
            }
            Body::Json(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                bytes.clone()
            }
        };

        builder
            .body(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()).into())
    }
}

impl<C: HttpClient> ApiClient<C> {
    /// Issue one call and return the raw body of a successful reply.
    pub async fn call_raw(&self, req: &ApiRequest) -> ClientResult<Bytes> {
        let request = self.build_request(req)?;
        let response = self
            .http
            .send_http(request)
            .await
            .map_err(|e| TransportError::Other(Box::new(e)))?;

        let status = response.status();
        let body = Bytes::from(response.into_body());
        if status.is_success() {
            return Ok(body);
        }
        tracing::warn!(%status, path = %req.path, "request rejected");
        Err(ClientError::from_reply(status, body))
    }

    /// Issue exactly one call for `query` and decode its reply.
    ///
    /// The query observes the decoded reply before it is returned, which is
    /// how paged queries advance their cursor.
    #[tracing::instrument(level = "debug", skip_all, fields(path))]
    pub async fn invoke<Q: Query>(&self, query: &mut Q) -> ClientResult<Q::Reply> {
        let request = query.request()?;
        tracing::Span::current().record("path", request.path.as_str());

        let body = self.call_raw(&request).await?;
        let reply = query.decode_reply(&body)?;
        query.observe_reply(&reply);
        Ok(reply)
    }
}

impl<C: HttpClientExt + Sync> ApiClient<C> {
    /// Open the stream for `query` and deliver its messages to `handler`
    /// until the handler stops, the server closes the stream, an
    /// unrecoverable error occurs or `cancel` fires.
    #[tracing::instrument(level = "debug", skip_all, fields(path))]
    pub async fn stream<Q, H>(
        &self,
        query: &Q,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, StreamingError<H::Error>>
    where
        Q: StreamQuery,
        H: StreamHandler<Q::Message>,
        H::Error: Debug + Display,
    {
        let request = query
            .request()
            .map_err(|e| StreamingError::Connect(e.into()))?;
        tracing::Span::current().record("path", request.path.as_str());

        let http_request = self
            .build_request(&request)
            .map_err(StreamingError::Connect)?;
        StreamConsumer::new(self.stream_options.clone())
            .run::<C, Q::Message, H>(&self.http, http_request, handler, cancel)
            .await
    }
}
