//! Response shapes for the v2 API
//!
//! Only the fields a client commonly needs are typed; everything else can be
//! read by re-decoding the raw reply (see [`warbler_common::Envelope::decode_as`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use warbler_common::PageReply;
use warbler_common::error::ErrorDetail;

/// Named counters reported under `public_metrics` and friends.
///
/// Keys are the constants in [`metrics`].
pub type Metrics = BTreeMap<SmolStr, u64>;

/// Metric names reported in a [`Metrics`] map.
///
/// Visibility of each metric is noted beside it.
pub mod metrics {
    #![allow(missing_docs)]

    pub const FOLLOWERS_COUNT: &str = "followers_count"; // public
    pub const FOLLOWING_COUNT: &str = "following_count"; // public
    pub const IMPRESSION_COUNT: &str = "impression_count"; // non-public, organic, promoted
    pub const LIKE_COUNT: &str = "like_count"; // public, organic, promoted
    pub const LISTED_COUNT: &str = "listed_count"; // public
    pub const QUOTE_COUNT: &str = "quote_count"; // public
    pub const REPLY_COUNT: &str = "reply_count"; // public, organic, promoted
    pub const RETWEET_COUNT: &str = "retweet_count"; // public, organic, promoted
    pub const TWEET_COUNT: &str = "tweet_count"; // public
    pub const URL_LINK_CLICKS: &str = "url_link_clicks"; // non-public, organic, promoted
    pub const USER_PROFILE_CLICKS: &str = "user_profile_clicks"; // non-public, organic, promoted
    pub const VIEW_COUNT: &str = "view_count"; // public, organic, promoted

    // Video view quartiles. Non-public, organic, promoted.
    pub const PLAYBACK_0_COUNT: &str = "playback_0_count";
    pub const PLAYBACK_25_COUNT: &str = "playback_25_count";
    pub const PLAYBACK_50_COUNT: &str = "playback_50_count";
    pub const PLAYBACK_75_COUNT: &str = "playback_75_count";
    pub const PLAYBACK_100_COUNT: &str = "playback_100_count";
}

/// A tweet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    /// Tweet ID
    pub id: SmolStr,
    /// Full text
    pub text: String,
    /// Author's user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<SmolStr>,
    /// ID of the tweet that started the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<SmolStr>,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// User ID this tweet replies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to_user_id: Option<SmolStr>,
    /// Detected language (BCP47)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<SmolStr>,
    /// Sensitive content flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possibly_sensitive: Option<bool>,
    /// Posting client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Who may reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_settings: Option<SmolStr>,
    /// Public engagement counters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<Metrics>,
    /// Tweets this tweet quotes, retweets or replies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_tweets: Vec<ReferencedTweet>,
    /// Media keys and poll IDs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    /// Hashtags, mentions, URLs and annotations, untyped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<serde_json::Value>,
}

/// Reference from one tweet to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedTweet {
    /// `retweeted`, `quoted` or `replied_to`
    #[serde(rename = "type")]
    pub kind: SmolStr,
    /// Referenced tweet ID
    pub id: SmolStr,
}

/// Attachments of a tweet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    /// Keys of attached media, resolved under `includes.media`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_keys: Vec<SmolStr>,
    /// IDs of attached polls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poll_ids: Vec<SmolStr>,
}

/// A user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: SmolStr,
    /// Display name
    pub name: String,
    /// Handle, without the `@`
    pub username: SmolStr,
    /// Account creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Profile bio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// ID of the pinned tweet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_tweet_id: Option<SmolStr>,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    /// Whether tweets are protected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    /// Follower and tweet counters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<Metrics>,
    /// Profile URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Verified badge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// A media attachment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    /// Media key
    pub media_key: SmolStr,
    /// `photo`, `video` or `animated_gif`
    #[serde(rename = "type")]
    pub media_type: SmolStr,
    /// Direct URL (photos)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Still frame URL (videos)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
    /// Width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Length of videos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Accessibility description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// Objects pulled in by expansions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Includes {
    /// Referenced tweets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tweets: Vec<Tweet>,
    /// Authors and mentioned users
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,
    /// Attached media
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
}

/// Reply metadata, including the continuation token of paged replies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Number of results in this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u64>,
    /// Highest ID in this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_id: Option<SmolStr>,
    /// Lowest ID in this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<SmolStr>,
    /// Token for the following page; absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<SmolStr>,
    /// Token for the preceding page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_token: Option<SmolStr>,
}

/// A filtered-stream rule a delivered tweet matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    /// Rule ID
    pub id: SmolStr,
    /// Rule tag, if one was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Reply carrying a list of tweets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetsReply {
    /// Matching tweets; absent when nothing matched
    #[serde(default)]
    pub data: Vec<Tweet>,
    /// Expanded objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Includes>,
    /// Counts and continuation token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Per-item errors of a partially successful reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDetail>,
}

impl PageReply for TweetsReply {
    fn next_token(&self) -> Option<&str> {
        self.meta.as_ref()?.next_token.as_deref()
    }
}

/// One message delivered on a tweet stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// The tweet
    pub data: Tweet,
    /// Expanded objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Includes>,
    /// Filtered-stream rules the tweet matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matching_rules: Vec<MatchingRule>,
    /// Partial errors reported alongside the tweet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_page_decodes_with_token() {
        let body = r#"{
            "data": [{"id": "1", "text": "hi", "author_id": "9", "created_at": "2020-05-15T16:03:42.000Z",
                      "public_metrics": {"retweet_count": 2, "like_count": 5}}],
            "includes": {"users": [{"id": "9", "name": "Nine", "username": "nine"}]},
            "meta": {"result_count": 1, "newest_id": "1", "oldest_id": "1", "next_token": "b26v89c19zqg8o3fo7"}
        }"#;
        let reply: TweetsReply = serde_json::from_str(body).unwrap();
        assert_eq!(reply.next_token(), Some("b26v89c19zqg8o3fo7"));
        let tweet = &reply.data[0];
        assert_eq!(tweet.author_id.as_deref(), Some("9"));
        assert_eq!(tweet.public_metrics.as_ref().unwrap()[metrics::LIKE_COUNT], 5);
        assert_eq!(
            tweet.created_at.unwrap().to_rfc3339(),
            "2020-05-15T16:03:42+00:00"
        );
        assert_eq!(reply.includes.unwrap().users[0].username, "nine");
    }

    #[test]
    fn empty_result_has_no_token() {
        let reply: TweetsReply = serde_json::from_str(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(reply.data.is_empty());
        assert_eq!(reply.next_token(), None);
    }
}
