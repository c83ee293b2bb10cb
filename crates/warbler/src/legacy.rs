//! v1.1 tweet and user shapes, and their conversion to the v2 shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use smol_str::SmolStr;

use crate::fields::TweetFields;
use crate::types::{Metrics, ReferencedTweet, Tweet, metrics};

const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Parse v1.1 timestamps such as `Wed Oct 10 20:19:24 +0000 2018`.
pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    DateTime::parse_from_str(&raw, DATE_FORMAT)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LegacyUser {
    pub id_str: SmolStr,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LegacyTweet {
    pub id_str: SmolStr,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_date")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<LegacyUser>,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<SmolStr>,
    #[serde(default)]
    pub in_reply_to_user_id_str: Option<SmolStr>,
    #[serde(default)]
    pub quoted_status_id_str: Option<SmolStr>,
    #[serde(default)]
    pub retweeted_status: Option<Box<LegacyTweet>>,
    #[serde(default)]
    pub lang: Option<SmolStr>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub possibly_sensitive: Option<bool>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub quote_count: Option<u64>,
    #[serde(default)]
    pub entities: Option<serde_json::Value>,
}

impl LegacyTweet {
    /// Convert to the v2 shape, keeping only the optional fields selected in `fields`.
    pub fn into_tweet(self, fields: &TweetFields) -> Tweet {
        let mut tweet = Tweet {
            id: self.id_str,
            text: self.full_text.or(self.text).unwrap_or_default(),
            ..Default::default()
        };
        if fields.author_id {
            tweet.author_id = self.user.map(|u| u.id_str);
        }
        if fields.created_at {
            tweet.created_at = self.created_at;
        }
        if fields.in_reply_to_user_id {
            tweet.in_reply_to_user_id = self.in_reply_to_user_id_str;
        }
        if fields.language {
            tweet.lang = self.lang;
        }
        if fields.source {
            tweet.source = self.source;
        }
        if fields.possibly_sensitive {
            tweet.possibly_sensitive = self.possibly_sensitive;
        }
        if fields.entities {
            tweet.entities = self.entities;
        }
        if fields.public_metrics {
            let counts = [
                (metrics::RETWEET_COUNT, self.retweet_count),
                (metrics::LIKE_COUNT, self.favorite_count),
                (metrics::REPLY_COUNT, self.reply_count),
                (metrics::QUOTE_COUNT, self.quote_count),
            ];
            let metrics: Metrics = counts
                .into_iter()
                .filter_map(|(name, n)| Some((SmolStr::new_static(name), n?)))
                .collect();
            tweet.public_metrics = Some(metrics);
        }
        if fields.referenced_tweets {
            let refs = [
                ("replied_to", self.in_reply_to_status_id_str),
                ("quoted", self.quoted_status_id_str),
                ("retweeted", self.retweeted_status.map(|t| t.id_str)),
            ];
            tweet.referenced_tweets = refs
                .into_iter()
                .filter_map(|(kind, id)| {
                    Some(ReferencedTweet {
                        kind: SmolStr::new_static(kind),
                        id: id?,
                    })
                })
                .collect();
        }
        tweet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        "id": 1050118621198921728,
        "id_str": "1050118621198921728",
        "full_text": "To make room for more expression, we will now count all emojis as equal",
        "truncated": false,
        "user": {"id": 6253282, "id_str": "6253282", "screen_name": "TwitterAPI"},
        "in_reply_to_status_id_str": null,
        "quoted_status_id_str": "1050118621198921700",
        "retweet_count": 161,
        "favorite_count": 296,
        "lang": "en"
    }"#;

    #[test]
    fn conversion_honours_selected_fields() {
        let legacy: LegacyTweet = serde_json::from_str(SAMPLE).unwrap();
        let bare = legacy.clone().into_tweet(&TweetFields::default());
        assert_eq!(bare.id, "1050118621198921728");
        assert!(bare.text.starts_with("To make room"));
        assert_eq!(bare.author_id, None);
        assert_eq!(bare.created_at, None);

        let full = legacy.into_tweet(&TweetFields {
            author_id: true,
            created_at: true,
            language: true,
            public_metrics: true,
            referenced_tweets: true,
            ..Default::default()
        });
        assert_eq!(full.author_id.as_deref(), Some("6253282"));
        assert_eq!(
            full.created_at.unwrap().to_rfc3339(),
            "2018-10-10T20:19:24+00:00"
        );
        assert_eq!(full.lang.as_deref(), Some("en"));
        let m = full.public_metrics.unwrap();
        assert_eq!(m[metrics::LIKE_COUNT], 296);
        assert!(!m.contains_key(metrics::QUOTE_COUNT));
        assert_eq!(full.referenced_tweets.len(), 1);
        assert_eq!(full.referenced_tweets[0].kind, "quoted");
    }

    #[test]
    fn bad_timestamp_is_a_decode_error() {
        let body = r#"{"id_str": "1", "text": "x", "created_at": "yesterday"}"#;
        assert!(serde_json::from_str::<LegacyTweet>(body).is_err());
    }
}
