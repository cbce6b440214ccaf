//! Keyword-style options passed through read/create/delete/list
//!
//! Keys prefixed with `backend.` reach only the storage primitive, keys
//! prefixed with `parser.` reach only the decode/encode step, and unprefixed
//! keys reach both. A prefixed key overrides an unprefixed key of the same
//! name on its side.

use std::collections::BTreeMap;

use crate::error::{CabinetError, Result};

pub const BACKEND_PREFIX: &str = "backend.";
pub const PARSER_PREFIX: &str = "parser.";

/// Ordered string options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(BTreeMap<String, String>);

/// Options split by destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedOptions {
    pub backend: Options,
    pub parser: Options,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Read a boolean option; absent means `false`
    pub fn flag(&self, key: &str) -> std::result::Result<bool, String> {
        match self.get(key) {
            None => Ok(false),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(format!("'{key}' expects a boolean, got '{value}'")),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Split options between the backend primitive and the parser step
    pub fn route(&self) -> RoutedOptions {
        let mut routed = RoutedOptions::default();

        for (key, value) in self.iter() {
            if !key.starts_with(BACKEND_PREFIX) && !key.starts_with(PARSER_PREFIX) {
                routed.backend.insert(key, value);
                routed.parser.insert(key, value);
            }
        }
        for (key, value) in self.iter() {
            if let Some(key) = key.strip_prefix(BACKEND_PREFIX) {
                routed.backend.insert(key, value);
            } else if let Some(key) = key.strip_prefix(PARSER_PREFIX) {
                routed.parser.insert(key, value);
            }
        }

        routed
    }

    /// Parse a `key=value` pair as given on a command line
    pub fn parse_pair(pair: &str) -> Result<(String, String)> {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(CabinetError::invalid_argument(format!(
                "expected key=value, got '{pair}'"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Options {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
