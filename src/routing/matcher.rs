//! Route template parsing and path matching.
//!
//! # Responsibilities
//! - Parse `/literal/{param}` templates into segments
//! - Compare a request path against a template, segment by segment
//! - Extract every named parameter (percent-decoded)
//!
//! # Design Decisions
//! - Positional comparison, never substring search: a literal that also occurs
//!   inside a parameter value cannot shift the extraction
//! - Segment counts must agree; a trailing slash is its own (empty) segment
//! - Placeholders never match an empty segment
//! - No regex, no wildcards

use std::fmt;

use percent_encoding::percent_decode_str;

/// One `/`-separated piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly (case-sensitive).
    Literal(String),
    /// Captures the request segment under this name. An empty name (`{}`)
    /// matches but is not captured.
    Param(String),
}

/// A parsed route template such as `/users/{id}/posts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template. Parsing never fails: anything that is not a
    /// `{...}` segment is taken literally.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = split_segments(&raw)
            .map(|segment| {
                match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => Segment::Param(name.to_string()),
                    None => Segment::Literal(segment.to_string()),
                }
            })
            .collect();
        Self { raw, segments }
    }

    /// The template exactly as registered.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the captured placeholders, in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) if !name.is_empty() => Some(name.as_str()),
            _ => None,
        })
    }

    /// Number of literal segments; used to rank competing matches.
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match `path` against this template.
    ///
    /// Returns the extracted parameters on a match, `None` otherwise.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut params = Params::default();
        let mut actual = split_segments(path);

        for expected in &self.segments {
            let segment = actual.next()?;
            match expected {
                Segment::Literal(literal) => {
                    if literal != segment {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if segment.is_empty() {
                        return None;
                    }
                    if !name.is_empty() {
                        let value = percent_decode_str(segment).decode_utf8_lossy();
                        params.insert(name.clone(), value.into_owned());
                    }
                }
            }
        }

        // Left-over request segments mean the path is longer than the template.
        if actual.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_segments(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Parameters extracted from a matched path, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Value captured for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // A repeated name keeps the later value.
    fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
