//! Tweet search, lookup and streams (v2)

use std::fmt::{Debug, Display};

use chrono::{DateTime, SecondsFormat, Utc};
use smol_str::SmolStr;
use warbler_common::error::EncodeError;
use warbler_common::http_client::HttpClientExt;
use warbler_common::{
    ApiClient, ApiRequest, CancellationToken, Limit, Paged, PagedQuery, Params, Query, StreamEnd,
    StreamHandler, StreamQuery, StreamingError,
};

use crate::fields::{self, Fields};
use crate::types::{StreamMessage, TweetsReply};

/// Options for [`search_recent`].
#[derive(Debug, Clone, Default, bon::Builder)]
#[builder(start_fn = new)]
pub struct SearchOpts {
    /// Results per page (10 to 100); server default when unset
    pub max_results: Option<u32>,
    /// Oldest creation time to match (inclusive)
    pub start_time: Option<DateTime<Utc>>,
    /// Newest creation time to match (exclusive)
    pub end_time: Option<DateTime<Utc>>,
    /// Only tweets with IDs greater than this
    #[builder(into)]
    pub since_id: Option<SmolStr>,
    /// Only tweets with IDs smaller than this
    #[builder(into)]
    pub until_id: Option<SmolStr>,
    /// Optional fields and expansions
    #[builder(default)]
    pub optional: Vec<Fields>,
}

/// Options for [`lookup`].
#[derive(Debug, Clone, Default)]
pub struct LookupOpts {
    /// Optional fields and expansions
    pub optional: Vec<Fields>,
}

/// Options for the tweet streams.
#[derive(Debug, Clone, Default, bon::Builder)]
#[builder(start_fn = new)]
pub struct StreamOpts {
    /// Stop after this many messages were delivered; zero means no limit
    pub max_results: Option<usize>,
    /// Optional fields and expansions
    #[builder(default)]
    pub optional: Vec<Fields>,
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Query for tweets from the last seven days matching a search query.
#[derive(Debug, Clone)]
pub struct SearchRecent {
    query: String,
    opts: SearchOpts,
}

impl Query for SearchRecent {
    type Reply = TweetsReply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        params.set("query", self.query.as_str());
        let opts = &self.opts;
        if let Some(n) = opts.max_results {
            params.set("max_results", n.to_string());
        }
        if let Some(t) = &opts.start_time {
            params.set("start_time", timestamp(t));
        }
        if let Some(t) = &opts.end_time {
            params.set("end_time", timestamp(t));
        }
        if let Some(id) = &opts.since_id {
            params.set("since_id", id.as_str());
        }
        if let Some(id) = &opts.until_id {
            params.set("until_id", id.as_str());
        }
        fields::apply(&opts.optional, &mut params);
        Ok(ApiRequest::get("2/tweets/search/recent", params))
    }
}

impl PagedQuery for SearchRecent {
    const PAGE_TOKEN_PARAM: &'static str = "next_token";
}

/// Search recent tweets. Each invocation fetches the following page.
///
/// API: `2/tweets/search/recent`
pub fn search_recent(query: impl Into<String>, opts: SearchOpts) -> Paged<SearchRecent> {
    Paged::new(SearchRecent {
        query: query.into(),
        opts,
    })
}

/// Query for tweets by ID.
#[derive(Debug, Clone)]
pub struct Lookup {
    ids: Vec<SmolStr>,
    opts: LookupOpts,
}

impl Query for Lookup {
    type Reply = TweetsReply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        params.add("ids", self.ids.iter().map(SmolStr::as_str));
        fields::apply(&self.opts.optional, &mut params);
        Ok(ApiRequest::get("2/tweets", params))
    }
}

/// Look up tweets by ID.
///
/// API: `2/tweets`
pub fn lookup<I>(ids: I, opts: LookupOpts) -> Lookup
where
    I: IntoIterator,
    I::Item: Into<SmolStr>,
{
    Lookup {
        ids: ids.into_iter().map(Into::into).collect(),
        opts,
    }
}

/// A tweet stream: the 1% sample or the rule-filtered stream.
#[derive(Debug, Clone)]
pub struct TweetStream {
    path: &'static str,
    opts: StreamOpts,
}

impl StreamQuery for TweetStream {
    type Message = StreamMessage;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        fields::apply(&self.opts.optional, &mut params);
        Ok(ApiRequest::get(self.path, params))
    }
}

impl TweetStream {
    /// Deliver messages to `handler` until it stops, `max_results` messages
    /// were delivered, the server closes the stream or `cancel` fires.
    pub async fn run<C, H>(
        &self,
        client: &ApiClient<C>,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, StreamingError<H::Error>>
    where
        C: HttpClientExt + Sync,
        H: StreamHandler<StreamMessage> + Send,
        H::Error: Debug + Display,
    {
        match self.opts.max_results.filter(|&n| n > 0) {
            Some(limit) => {
                tracing::debug!(path = self.path, limit, "limiting stream delivery");
                let mut limited = Limit::new(handler, limit);
                client.stream(self, &mut limited, cancel).await
            }
            None => client.stream(self, handler, cancel).await,
        }
    }
}

/// Stream a small random sample of all public tweets.
///
/// API: `2/tweets/sample/stream`
pub fn sample_stream(opts: StreamOpts) -> TweetStream {
    TweetStream {
        path: "2/tweets/sample/stream",
        opts,
    }
}

/// Stream tweets matching the rules installed with [`crate::rules::update`].
///
/// API: `2/tweets/search/stream`
pub fn search_stream(opts: StreamOpts) -> TweetStream {
    TweetStream {
        path: "2/tweets/search/stream",
        opts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Expansions, TweetFields};
    use chrono::TimeZone;

    #[test]
    fn search_request_carries_options() {
        let opts = SearchOpts::new()
            .max_results(50)
            .start_time(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
            .since_id("100")
            .optional(vec![
                TweetFields {
                    created_at: true,
                    ..Default::default()
                }
                .into(),
                Expansions {
                    author_id: true,
                    ..Default::default()
                }
                .into(),
            ])
            .build();
        let query = search_recent("from:rustlang", opts);
        let req = query.request().unwrap();

        assert_eq!(req.path, "2/tweets/search/recent");
        assert_eq!(req.params.get("query").unwrap(), ["from:rustlang"]);
        assert_eq!(req.params.get("max_results").unwrap(), ["50"]);
        assert_eq!(req.params.get("start_time").unwrap(), ["2024-03-01T12:00:00Z"]);
        assert_eq!(req.params.get("since_id").unwrap(), ["100"]);
        assert_eq!(req.params.get("expansions").unwrap(), ["author_id"]);
        assert!(req.params.get("next_token").is_none());
    }

    #[test]
    fn lookup_joins_ids() {
        let req = lookup(["20", "21"], LookupOpts::default()).request().unwrap();
        assert_eq!(req.params.encode().unwrap(), "ids=20%2C21");
    }
}
