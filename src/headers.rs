//! Per-job header materialization
//!
//! Jobs carry their headers as a compact `Name:Value;Name:Value` string.
//! The colon splits on its first occurrence only, so values may contain
//! further colons once parsed, but there is no escaping: a `;` always ends
//! the pair.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

const PAIR_SEPARATOR: char = ';';
const NAME_SEPARATOR: char = ':';

/// Ordered set of headers parsed from a job's header spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    /// Parse a header spec.
    ///
    /// Pairs without a colon are skipped. `Content-Type` is always dropped
    /// because the caller fixes the body's content type.
    pub fn parse(spec: &str) -> Self {
        let entries = spec
            .split(PAIR_SEPARATOR)
            .filter(|pair| !pair.trim().is_empty())
            .filter_map(|pair| pair.split_once(NAME_SEPARATOR))
            .map(|(name, value)| (name.trim(), value.trim()))
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Self { entries }
    }

    pub fn from_optional(spec: Option<&str>) -> Self {
        spec.map(Self::parse).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// First value for `name`, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Convert into a request header map.
    ///
    /// Entries that are not legal HTTP header names or values are logged and
    /// left out instead of failing the request.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());

        for (name, value) in &self.entries {
            let parsed_name = HeaderName::from_bytes(name.as_bytes());
            let parsed_value = HeaderValue::from_bytes(value.as_bytes());

            match (parsed_name, parsed_value) {
                (Ok(name), Ok(value)) => {
                    map.append(name, value);
                }
                _ => warn!(header = %name, "Skipping header with invalid name or value"),
            }
        }

        map
    }
}
