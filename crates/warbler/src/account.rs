//! The authenticated account (v1.1)

use chrono::{DateTime, Utc};
use serde::Deserialize;
use smol_str::SmolStr;
use warbler_common::error::EncodeError;
use warbler_common::{ApiRequest, Params, Query};

/// Options for [`verify_credentials`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialsOpts {
    /// Include entities in the embedded status
    pub include_entities: bool,
    /// Leave out the latest status
    pub skip_status: bool,
    /// Report the account's email address (needs elevated app permissions)
    pub include_email: bool,
}

/// The authenticated account
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Account {
    /// User ID
    pub id_str: SmolStr,
    /// Display name
    pub name: String,
    /// Handle, without the `@`
    pub screen_name: SmolStr,
    /// Account creation time
    #[serde(default, deserialize_with = "crate::legacy::deserialize_date")]
    pub created_at: Option<DateTime<Utc>>,
    /// Profile bio
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form location
    #[serde(default)]
    pub location: Option<String>,
    /// Profile URL
    #[serde(default)]
    pub url: Option<String>,
    /// Account language
    #[serde(default)]
    pub lang: Option<SmolStr>,
    /// Email address, when requested and permitted
    #[serde(default)]
    pub email: Option<String>,
    /// Whether tweets are protected
    #[serde(default)]
    pub protected: bool,
    /// Verified badge
    #[serde(default)]
    pub verified: bool,
    /// Followers
    #[serde(default)]
    pub followers_count: u64,
    /// Accounts followed
    #[serde(default)]
    pub friends_count: u64,
    /// Lists the account is on
    #[serde(default)]
    pub listed_count: u64,
    /// Likes
    #[serde(default)]
    pub favourites_count: u64,
    /// Tweets, including retweets
    #[serde(default)]
    pub statuses_count: u64,
    /// Avatar URL
    #[serde(default)]
    pub profile_image_url_https: Option<String>,
    /// Latest status, in v1.1 shape
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

/// Query for the authenticated account
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyCredentials {
    opts: CredentialsOpts,
}

impl Query for VerifyCredentials {
    type Reply = Account;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        for (name, on) in [
            ("include_entities", self.opts.include_entities),
            ("skip_status", self.opts.skip_status),
            ("include_email", self.opts.include_email),
        ] {
            if on {
                params.set(name, "true");
            }
        }
        Ok(ApiRequest::get("1.1/account/verify_credentials.json", params))
    }
}

/// Check the credentials and report the account they belong to.
///
/// API: `1.1/account/verify_credentials.json`
pub fn verify_credentials(opts: CredentialsOpts) -> VerifyCredentials {
    VerifyCredentials { opts }
}
