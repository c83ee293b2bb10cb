//! User, home and mentions timelines (v1.1)

use bytes::Bytes;
use smol_str::SmolStr;
use warbler_common::error::{DecodeError, EncodeError};
use warbler_common::{ApiRequest, Params, Query};

use crate::fields::TweetFields;
use crate::legacy::LegacyTweet;
use crate::status::StatusReply;

/// Options for timeline queries
#[derive(Debug, Clone, Default)]
pub struct TimelineOpts {
    /// Look the user up by ID instead of by screen name.
    pub by_id: bool,
    /// Maximum number of tweets (server limit 200); server default when unset.
    pub max_results: Option<u32>,
    /// Leave replies out.
    pub exclude_replies: bool,
    /// Include native retweets.
    pub include_retweets: bool,
    /// Include entities; also selects the `entities` field.
    pub include_entities: bool,
    /// Only tweets with IDs greater than this.
    pub since_id: Option<SmolStr>,
    /// Only tweets with IDs smaller than or equal to this.
    pub until_id: Option<SmolStr>,
    /// Optional fields to report
    pub optional: TweetFields,
}

/// Query for a timeline
#[derive(Debug, Clone)]
pub struct TimelineQuery {
    request: ApiRequest,
    fields: TweetFields,
}

impl Query for TimelineQuery {
    type Reply = StatusReply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        Ok(self.request.clone())
    }

    fn decode_reply(&self, body: &[u8]) -> Result<StatusReply, DecodeError> {
        let tweets: Vec<LegacyTweet> = serde_json::from_slice(body)?;
        Ok(StatusReply {
            data: Bytes::copy_from_slice(body),
            tweets: tweets
                .into_iter()
                .map(|t| t.into_tweet(&self.fields))
                .collect(),
        })
    }
}

fn timeline(user: &str, kind: &str, opts: TimelineOpts) -> TimelineQuery {
    let mut params = Params::new();
    let key = if opts.by_id { "user_id" } else { "screen_name" };
    params
        .set(key, user)
        .set("trim_user", "true")
        .set("tweet_mode", "extended");

    let mut fields = opts.optional;
    if let Some(n) = opts.max_results {
        params.set("count", n.to_string());
    }
    if opts.exclude_replies {
        params.set("exclude_replies", "true");
    }
    if opts.include_retweets {
        params.set("include_rts", "true");
    }
    if opts.include_entities {
        params.set("include_entities", "true");
        fields.entities = true;
    }
    if let Some(id) = &opts.since_id {
        params.set("since_id", id.as_str());
    }
    if let Some(id) = &opts.until_id {
        params.set("max_id", id.as_str());
    }

    TimelineQuery {
        request: ApiRequest::get(format!("1.1/statuses/{kind}_timeline.json"), params),
        fields,
    }
}

/// Tweets posted by a user.
///
/// API: `1.1/statuses/user_timeline.json`
pub fn user(user: &str, opts: TimelineOpts) -> TimelineQuery {
    timeline(user, "user", opts)
}

/// The user's home timeline. Requires user-context authorization.
///
/// API: `1.1/statuses/home_timeline.json`
pub fn home(user: &str, opts: TimelineOpts) -> TimelineQuery {
    timeline(user, "home", opts)
}

/// Tweets mentioning the user. Requires user-context authorization.
///
/// API: `1.1/statuses/mentions_timeline.json`
pub fn mentions(user: &str, opts: TimelineOpts) -> TimelineQuery {
    timeline(user, "mentions", opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_to_v11_params() {
        let query = user(
            "12",
            TimelineOpts {
                by_id: true,
                max_results: Some(20),
                include_entities: true,
                until_id: Some("900".into()),
                ..Default::default()
            },
        );
        let req = query.request().unwrap();
        assert_eq!(req.path, "1.1/statuses/user_timeline.json");
        assert_eq!(req.params.get("user_id").unwrap(), ["12"]);
        assert!(req.params.get("screen_name").is_none());
        assert_eq!(req.params.get("count").unwrap(), ["20"]);
        assert_eq!(req.params.get("max_id").unwrap(), ["900"]);
        assert!(query.fields.entities);
    }

    #[test]
    fn decodes_a_list_of_legacy_tweets() {
        let query = mentions("rustlang", TimelineOpts::default());
        let body = br#"[{"id_str":"1","full_text":"one"},{"id_str":"2","full_text":"two","entities":{"hashtags":[]}}]"#;
        let reply = query.decode_reply(body).unwrap();
        let texts: Vec<&str> = reply.tweets.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert!(reply.tweets[1].entities.is_none());
    }
}
