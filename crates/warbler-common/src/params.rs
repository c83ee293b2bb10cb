//! Request parameters

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::error::EncodeError;

/// Query or form parameters for one API call.
///
/// Each name maps to one or more values; multiple values are sent as a
/// single comma-separated parameter, which is how the provider expects
/// list-valued options such as `tweet.fields` or `ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<SmolStr, Vec<String>>);

impl Params {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any values of `name` with `value`.
    pub fn set(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), vec![value.into()]);
        self
    }

    /// Append values to `name`.
    pub fn add<I, V>(&mut self, name: impl Into<SmolStr>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.0
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Values of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Remove `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(name)
    }

    /// True if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(name, joined value)` pairs in name order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, String)> {
        self.0
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.as_str(), values.join(",")))
    }

    /// Encode as `application/x-www-form-urlencoded`.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let pairs: Vec<(&str, String)> = self.pairs().collect();
        Ok(serde_html_form::to_string(&pairs)?)
    }
}

impl<K: Into<SmolStr>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.add(k, [v]);
        }
        params
    }
}
