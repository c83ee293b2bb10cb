//! Optional response fields and expansions
//!
//! The provider omits most object fields unless they are asked for. Each
//! selector type below is a set of flags for one parameter; [`Fields`] is the
//! closed set of selectors a query accepts.

use warbler_common::Params;

macro_rules! field_set {
    (
        $(#[$meta:meta])*
        $name:ident as $variant:ident => $label:literal {
            $( $(#[$fmeta:meta])* $field:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[doc = concat!("Wire name `", $wire, "`")]
                pub $field: bool,
            )+
        }

        impl $name {
            /// Parameter name this selector is sent as
            pub const LABEL: &'static str = $label;

            /// Wire names of the selected fields, in declaration order.
            pub fn values(&self) -> Vec<&'static str> {
                let mut out = Vec::new();
                $( if self.$field { out.push($wire); } )+
                out
            }

            /// True if no field is selected
            pub fn is_empty(&self) -> bool {
                $( !self.$field )&&+
            }
        }

        impl From<$name> for Fields {
            fn from(value: $name) -> Self {
                Fields::$variant(value)
            }
        }
    };
}

/// A selector of optional fields for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fields {
    /// `tweet.fields`
    Tweet(TweetFields),
    /// `user.fields`
    User(UserFields),
    /// `expansions`
    Expansions(Expansions),
    /// `media.fields`
    Media(MediaFields),
}

impl Fields {
    /// Parameter name
    pub fn label(&self) -> &'static str {
        match self {
            Fields::Tweet(_) => TweetFields::LABEL,
            Fields::User(_) => UserFields::LABEL,
            Fields::Expansions(_) => Expansions::LABEL,
            Fields::Media(_) => MediaFields::LABEL,
        }
    }

    /// Selected wire names
    pub fn values(&self) -> Vec<&'static str> {
        match self {
            Fields::Tweet(f) => f.values(),
            Fields::User(f) => f.values(),
            Fields::Expansions(f) => f.values(),
            Fields::Media(f) => f.values(),
        }
    }
}

/// Add every non-empty selector in `fields` to `params`.
///
/// Selectors sharing a label are merged into one comma-separated parameter.
pub fn apply(fields: &[Fields], params: &mut Params) {
    for f in fields {
        let values = f.values();
        if !values.is_empty() {
            params.add(f.label(), values);
        }
    }
}

field_set! {
    /// Optional tweet fields
    TweetFields as Tweet => "tweet.fields" {
        attachments => "attachments",
        author_id => "author_id",
        context_annotations => "context_annotations",
        conversation_id => "conversation_id",
        created_at => "created_at",
        entities => "entities",
        geo => "geo",
        in_reply_to_user_id => "in_reply_to_user_id",
        language => "lang",
        non_public_metrics => "non_public_metrics",
        organic_metrics => "organic_metrics",
        possibly_sensitive => "possibly_sensitive",
        promoted_metrics => "promoted_metrics",
        public_metrics => "public_metrics",
        referenced_tweets => "referenced_tweets",
        reply_settings => "reply_settings",
        source => "source",
        withheld => "withheld",
    }
}

field_set! {
    /// Optional user fields
    UserFields as User => "user.fields" {
        created_at => "created_at",
        description => "description",
        entities => "entities",
        location => "location",
        pinned_tweet_id => "pinned_tweet_id",
        profile_image_url => "profile_image_url",
        protected => "protected",
        public_metrics => "public_metrics",
        url => "url",
        verified => "verified",
        withheld => "withheld",
    }
}

field_set! {
    /// Object expansions; expanded objects are reported under `includes`
    Expansions as Expansions => "expansions" {
        /// The tweet's author
        author_id => "author_id",
        /// Tweets this tweet references (retweet, quote, reply)
        referenced_tweet_id => "referenced_tweets.id",
        /// The author of the tweet this one replies to
        in_reply_to => "in_reply_to_user_id",
        /// Attached media
        media_keys => "attachments.media_keys",
        /// Attached poll
        poll_id => "attachments.poll_ids",
        /// Tagged place
        place_id => "geo.place_id",
        /// Mentioned users
        mention_username => "entities.mentions.username",
        /// Authors of referenced tweets
        referenced_author_id => "referenced_tweets.id.author_id",
        /// A user's pinned tweet
        pinned_tweet_id => "pinned_tweet_id",
        /// A list's owner
        owner_id => "owner_id",
    }
}

field_set! {
    /// Optional media fields
    MediaFields as Media => "media.fields" {
        alt_text => "alt_text",
        duration_ms => "duration_ms",
        height => "height",
        media_key => "media_key",
        non_public_metrics => "non_public_metrics",
        organic_metrics => "organic_metrics",
        preview_image_url => "preview_image_url",
        promoted_metrics => "promoted_metrics",
        public_metrics => "public_metrics",
        media_type => "type",
        url => "url",
        width => "width",
    }
}
