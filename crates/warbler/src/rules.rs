//! Filtered-stream rules (v2)
//!
//! Rules decide which tweets [`crate::tweets::search_stream`] delivers.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use warbler_common::error::{EncodeError, ErrorDetail};
use warbler_common::{ApiRequest, Params, Query};

const RULES_PATH: &str = "2/tweets/search/stream/rules";

/// A rule to install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSpec {
    /// Filter query, e.g. `cat has:images lang:en`
    pub value: String,
    /// Label echoed back in `matching_rules`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl RuleSpec {
    /// Untagged rule
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: None,
        }
    }

    /// Tagged rule
    pub fn tagged(value: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: Some(tag.into()),
        }
    }
}

/// A rule change: either additions or deletions, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rules {
    /// Install these rules
    Adds(Vec<RuleSpec>),
    /// Delete the rules with these IDs
    Deletes(Vec<SmolStr>),
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum RulesBody<'a> {
    Add(&'a [RuleSpec]),
    Delete { ids: &'a [SmolStr] },
}

/// An installed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule ID
    pub id: SmolStr,
    /// Filter query
    pub value: String,
    /// Rule tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Counts reported by a rule change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesSummary {
    /// Rules created
    #[serde(default)]
    pub created: u32,
    /// Rules rejected on creation
    #[serde(default)]
    pub not_created: u32,
    /// Rules deleted
    #[serde(default)]
    pub deleted: u32,
    /// Rules that could not be deleted
    #[serde(default)]
    pub not_deleted: u32,
    /// Valid rules (dry runs)
    #[serde(default)]
    pub valid: u32,
    /// Invalid rules (dry runs)
    #[serde(default)]
    pub invalid: u32,
}

/// Rule reply metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesMeta {
    /// Server time the reply was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent: Option<String>,
    /// Number of rules returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u32>,
    /// Present on rule changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RulesSummary>,
}

/// Reply to [`get`] and [`update`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesReply {
    /// Installed (or just created) rules
    #[serde(default)]
    pub data: Vec<Rule>,
    /// Counts and timing
    #[serde(default)]
    pub meta: RulesMeta,
    /// Per-rule errors (duplicates, invalid syntax)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorDetail>,
}

/// Query listing installed rules
#[derive(Debug, Clone, Default)]
pub struct GetRules {
    ids: Vec<SmolStr>,
}

impl Query for GetRules {
    type Reply = RulesReply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        if !self.ids.is_empty() {
            params.add("ids", self.ids.iter().map(SmolStr::as_str));
        }
        Ok(ApiRequest::get(RULES_PATH, params))
    }
}

/// List installed rules; all of them when `ids` is empty.
///
/// API: `GET 2/tweets/search/stream/rules`
pub fn get<I>(ids: I) -> GetRules
where
    I: IntoIterator,
    I::Item: Into<SmolStr>,
{
    GetRules {
        ids: ids.into_iter().map(Into::into).collect(),
    }
}

/// Query changing the installed rules
#[derive(Debug, Clone)]
pub struct UpdateRules {
    rules: Rules,
    dry_run: bool,
}

impl UpdateRules {
    /// Validate the change without applying it.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

impl Query for UpdateRules {
    type Reply = RulesReply;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        if self.dry_run {
            params.set("dry_run", "true");
        }
        let body = match &self.rules {
            Rules::Adds(specs) => RulesBody::Add(specs),
            Rules::Deletes(ids) => RulesBody::Delete { ids },
        };
        ApiRequest::post_json(RULES_PATH, params, &body)
    }
}

/// Add or delete filtered-stream rules.
///
/// API: `POST 2/tweets/search/stream/rules`
pub fn update(rules: Rules) -> UpdateRules {
    UpdateRules {
        rules,
        dry_run: false,
    }
}
