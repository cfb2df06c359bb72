//! Decoded view of an incoming request.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Request path and query parameters, decoded once at the edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    path: String,
    parameters: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, parameters: BTreeMap<String, String>) -> Self {
        Self {
            path: path.into(),
            parameters,
        }
    }

    /// Build a context from a request target such as `/img.png?w=10&h=20`.
    ///
    /// The path is percent-decoded. In the query string `+` stands for a
    /// space, later duplicates win and names without `=` get an empty value.
    pub fn from_uri(uri: &str) -> Self {
        let (raw_path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let path = decode(raw_path, false);
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            path
        };

        let mut parameters = BTreeMap::new();
        for pair in query.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode(name, true);
            if name.is_empty() {
                continue;
            }
            parameters.insert(name, decode(value, true));
        }

        Self { path, parameters }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

fn decode(raw: &str, plus_as_space: bool) -> String {
    let raw: Cow<'_, str> = if plus_as_space && raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        // Invalid UTF-8 after decoding; keep the raw text
        Err(_) => raw.into_owned(),
    }
}
