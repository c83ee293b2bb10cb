//! Transport boundary: whole-body calls and open response bodies

use std::future::Future;
use std::sync::Arc;

use crate::stream::ByteStream;
#[cfg(feature = "reqwest-client")]
use crate::stream::StreamError;

/// HTTP client trait for sending raw HTTP requests.
///
/// Authentication, connection retries and proxying belong to the
/// implementation; the API layer only builds requests and reads replies.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait HttpClient {
    /// Error type returned by the HTTP client
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send an HTTP request and return the complete response.
    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>>;
}

/// Extension trait for HTTP clients that can hand back an open response body
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait HttpClientExt: HttpClient {
    /// Send HTTP request and return the status and headers with a streaming body
    fn send_http_streaming(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = Result<http::Response<ByteStream>, Self::Error>>;
}

// Status, version and headers of a reqwest reply, with the body left behind.
#[cfg(feature = "reqwest-client")]
fn reply_head(reply: &reqwest::Response) -> http::Response<()> {
    let mut head = http::Response::new(());
    *head.status_mut() = reply.status();
    *head.version_mut() = reply.version();
    *head.headers_mut() = reply.headers().clone();
    head
}

#[cfg(feature = "reqwest-client")]
impl HttpClient for reqwest::Client {
    type Error = reqwest::Error;

    async fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
        let reply = self.execute(reqwest::Request::try_from(request)?).await?;
        let head = reply_head(&reply);
        let body = reply.bytes().await?;
        Ok(head.map(|()| body.to_vec()))
    }
}

#[cfg(feature = "reqwest-client")]
impl HttpClientExt for reqwest::Client {
    async fn send_http_streaming(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<ByteStream>, Self::Error> {
        use futures::TryStreamExt;

        let reply = self.execute(reqwest::Request::try_from(request)?).await?;
        let head = reply_head(&reply);
        let chunks = reply.bytes_stream().map_err(StreamError::transport);
        Ok(head.map(|()| ByteStream::new(chunks)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<T: HttpClient + Sync> HttpClient for Arc<T> {
    type Error = T::Error;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>> + Send
    {
        self.as_ref().send_http(request)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<T: HttpClientExt + Sync> HttpClientExt for Arc<T> {
    fn send_http_streaming(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = Result<http::Response<ByteStream>, Self::Error>> + Send {
        self.as_ref().send_http_streaming(request)
    }
}
