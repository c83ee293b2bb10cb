//! The query contract shared by one-shot, paged and streaming calls
//!
//! A query value knows how to describe its call as an [`ApiRequest`] and how
//! to decode the reply. [`crate::client::ApiClient`] drives the rest: it builds
//! the HTTP request, sends it through the transport and maps failures into
//! [`crate::error::ClientError`].

use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use smol_str::SmolStr;

use crate::error::{DecodeError, EncodeError};
use crate::params::Params;

/// Request body of an [`ApiRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body; parameters go in the query string
    #[default]
    None,
    /// Parameters are sent form-encoded in the body
    Form,
    /// Serialized JSON body; parameters stay in the query string
    Json(Vec<u8>),
}

/// Description of one API call, relative to the client's base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path, e.g. `2/tweets/search/recent`
    pub path: SmolStr,
    /// Query or form parameters
    pub params: Params,
    /// Body encoding
    pub body: Body,
}

impl ApiRequest {
    /// GET `path` with `params` in the query string.
    pub fn get(path: impl Into<SmolStr>, params: Params) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            params,
            body: Body::None,
        }
    }

    /// DELETE `path` with `params` in the query string.
    pub fn delete(path: impl Into<SmolStr>, params: Params) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            params,
            body: Body::None,
        }
    }

    /// POST `path` with `params` form-encoded in the body.
    pub fn post_form(path: impl Into<SmolStr>, params: Params) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            params,
            body: Body::Form,
        }
    }

    /// POST `path` with a JSON body; `params` stay in the query string.
    pub fn post_json<B: Serialize>(
        path: impl Into<SmolStr>,
        params: Params,
        body: &B,
    ) -> Result<Self, EncodeError> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            params,
            body: Body::Json(serde_json::to_vec(body)?),
        })
    }
}

/// A query issuing exactly one call and decoding exactly one reply.
pub trait Query {
    /// Decoded reply
    type Reply: DeserializeOwned;

    /// Build the request for the next call.
    fn request(&self) -> Result<ApiRequest, EncodeError>;

    /// Decode a successful reply body.
    fn decode_reply(&self, body: &[u8]) -> Result<Self::Reply, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Observe a decoded reply before it is returned to the caller.
    ///
    /// Stateful queries (paged ones) update themselves here.
    fn observe_reply(&mut self, reply: &Self::Reply) {
        let _ = reply;
    }
}

/// A query answered by a long-lived stream of messages.
pub trait StreamQuery {
    /// One decoded data message
    type Message: DeserializeOwned;

    /// Build the request that opens the stream.
    fn request(&self) -> Result<ApiRequest, EncodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        id: String,
    }

    struct Single {
        seen: usize,
    }

    impl Query for Single {
        type Reply = Echo;

        fn request(&self) -> Result<ApiRequest, EncodeError> {
            Ok(ApiRequest::delete("2/users/1/likes/2", Params::new()))
        }

        fn observe_reply(&mut self, _reply: &Echo) {
            self.seen += 1;
        }
    }

    #[test]
    fn default_decode_is_json() {
        let query = Single { seen: 0 };
        let reply = query.decode_reply(br#"{"id":"9"}"#).unwrap();
        assert_eq!(reply, Echo { id: "9".into() });
        assert!(matches!(
            query.decode_reply(b"<html>"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn observe_hook_sees_replies() {
        let mut query = Single { seen: 0 };
        let reply = query.decode_reply(br#"{"id":"9"}"#).unwrap();
        query.observe_reply(&reply);
        assert_eq!(query.seen, 1);
        assert_eq!(query.request().unwrap().method, Method::DELETE);
    }

    #[test]
    fn json_body_is_serialized_up_front() {
        let req = ApiRequest::post_json(
            "2/tweets/search/stream/rules",
            Params::new(),
            &serde_json::json!({"add": [{"value": "cats"}]}),
        )
        .unwrap();
        assert_eq!(req.body, Body::Json(br#"{"add":[{"value":"cats"}]}"#.to_vec()));
        assert_eq!(ApiRequest::get("x", Params::new()).body, Body::None);
    }
}
