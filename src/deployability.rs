// SPDX-License-Identifier: MPL-2.0

//! Deployability facts: where a prefab can be deployed.
//!
//! The same ordered string map serves two roles. Attached to a reference it is a filter, such
//! as `{"arch": "amd64"}`. Attached to a blueprint it is the context the prefab was built for.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered key/value deployability facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deployability(IndexMap<String, String>);

impl Deployability {
    /// No facts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fact, keeping the position of a key already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder flavour of [insert](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value of a fact.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether no fact is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of facts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Facts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether a target described by `context` passes this filter.
    ///
    /// Keys the context does not mention do not reject.
    pub fn admits(&self, context: &Deployability) -> bool {
        self.iter()
            .all(|(key, wanted)| context.get(key).map_or(true, |actual| actual == wanted))
    }

    /// One-line JSON object.
    pub fn to_json(&self) -> String {
        serde_json::Value::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect(),
        )
        .to_string()
    }

    /// Parse a JSON object of strings.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Deployability {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
