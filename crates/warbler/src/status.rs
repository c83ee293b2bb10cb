//! Posting, deleting, retweeting and liking tweets (v1.1)
//!
//! These calls require user-context authorization. Replies are converted to
//! the v2 [`Tweet`] shape.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use warbler_common::error::{DecodeError, EncodeError};
use warbler_common::{ApiRequest, Params, Query};

use crate::fields::TweetFields;
use crate::legacy::LegacyTweet;
use crate::types::Tweet;

/// Options for [`create`]
#[derive(Debug, Clone, Default)]
pub struct CreateOpts {
    /// Record the update as a reply to this tweet. Ignored by the server
    /// unless the text mentions that tweet's author.
    pub in_reply_to: Option<SmolStr>,
    /// Let the server fill in the reply target and mentions.
    pub auto_populate_reply: bool,
    /// User IDs to leave out when mentions are filled in.
    pub auto_exclude_mentions: Vec<SmolStr>,
    /// Optional fields to report on the resulting tweet
    pub optional: TweetFields,
}

/// Options for the modification calls
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Optional fields to report on the resulting tweet
    pub optional: TweetFields,
}

/// Reply to status and timeline queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    /// Raw reply body
    #[serde(skip)]
    pub data: Bytes,
    /// Resulting tweets, converted to the v2 shape
    pub tweets: Vec<Tweet>,
}

/// Query posting or modifying a single tweet
#[derive(Debug, Clone)]
pub struct StatusQuery {
    request: ApiRequest,
    fields: TweetFields,
}

impl Query for StatusQuery {
    type Reply = StatusReply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        Ok(self.request.clone())
    }

    fn decode_reply(&self, body: &[u8]) -> Result<StatusReply, DecodeError> {
        let tweet: LegacyTweet = serde_json::from_slice(body)?;
        Ok(StatusReply {
            data: Bytes::copy_from_slice(body),
            tweets: vec![tweet.into_tweet(&self.fields)],
        })
    }
}

/// Post a tweet with the given text.
///
/// API: `1.1/statuses/update.json`
pub fn create(text: impl Into<String>, opts: CreateOpts) -> StatusQuery {
    let text: String = text.into();
    let mut params = Params::new();
    params
        .set("status", text)
        .set("trim_user", "true")
        .set("tweet_mode", "extended");
    if let Some(id) = &opts.in_reply_to {
        params.set("in_reply_to_status_id", id.as_str());
    }
    if opts.auto_populate_reply {
        params.set("auto_populate_reply_metadata", "true");
        if !opts.auto_exclude_mentions.is_empty() {
            params.add(
                "exclude_reply_user_ids",
                opts.auto_exclude_mentions.iter().map(SmolStr::as_str),
            );
        }
    }
    StatusQuery {
        request: ApiRequest::post_form("1.1/statuses/update.json", params),
        fields: opts.optional,
    }
}

// The tweet ID is part of the path for these.
fn modify(path: &str, id: &str, opts: Options) -> StatusQuery {
    let mut params = Params::new();
    params.set("trim_user", "true");
    StatusQuery {
        request: ApiRequest::post_form(format!("{path}/{id}.json"), params),
        fields: opts.optional,
    }
}

/// Delete a tweet.
///
/// API: `1.1/statuses/destroy/:id.json`
pub fn delete(id: &str, opts: Options) -> StatusQuery {
    modify("1.1/statuses/destroy", id, opts)
}

/// Retweet a tweet.
///
/// API: `1.1/statuses/retweet/:id.json`
pub fn retweet(id: &str, opts: Options) -> StatusQuery {
    modify("1.1/statuses/retweet", id, opts)
}

/// Undo a retweet.
///
/// API: `1.1/statuses/unretweet/:id.json`
pub fn unretweet(id: &str, opts: Options) -> StatusQuery {
    modify("1.1/statuses/unretweet", id, opts)
}

fn favorite(path: &str, id: &str, opts: Options) -> StatusQuery {
    let mut params = Params::new();
    params.set("id", id).set(
        "include_entities",
        if opts.optional.entities { "true" } else { "false" },
    );
    StatusQuery {
        request: ApiRequest::post_form(path, params),
        fields: opts.optional,
    }
}

/// Like a tweet.
///
/// API: `1.1/favorites/create.json`
pub fn like(id: &str, opts: Options) -> StatusQuery {
    favorite("1.1/favorites/create.json", id, opts)
}

/// Undo a like.
///
/// API: `1.1/favorites/destroy.json`
pub fn unlike(id: &str, opts: Options) -> StatusQuery {
    favorite("1.1/favorites/destroy.json", id, opts)
}
