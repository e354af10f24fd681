use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentTypeError {
    #[error("invalid content type '{input}': {reason}")]
    Invalid { input: String, reason: String },
}

/// A media type with optional parameters.
///
/// Equality is structural: the essence and parameter names are compared
/// case-insensitively, parameter values exactly, and parameter order does
/// not matter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentType {
    essence: String,
    params: BTreeMap<String, String>,
}

impl ContentType {
    /// Build a content type from an essence without parameters.
    pub fn new(essence: &str) -> Self {
        Self::with_params(essence, &[])
    }

    /// Build a content type from an essence and a set of parameters.
    pub fn with_params(essence: &str, params: &[(&str, &str)]) -> Self {
        Self {
            essence: essence.trim().to_ascii_lowercase(),
            params: params
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), (*value).to_string()))
                .collect(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, ContentTypeError> {
        let media: mime::Mime = input.trim().parse().map_err(|e: mime::FromStrError| {
            ContentTypeError::Invalid {
                input: input.to_string(),
                reason: e.to_string(),
            }
        })?;

        let params = media
            .params()
            .map(|(name, value)| (name.as_str().to_ascii_lowercase(), unquote(value.as_str())))
            .collect();

        Ok(Self {
            essence: media.essence_str().to_ascii_lowercase(),
            params,
        })
    }

    /// `type/subtype` without parameters
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when both share an essence, ignoring parameters.
    pub fn same_essence(&self, other: &ContentType) -> bool {
        self.essence == other.essence
    }
}

fn unquote(value: &str) -> String {
    match value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_string(),
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)?;
        for (name, value) in &self.params {
            if is_token(value) {
                write!(f, ";{}={}", name, value)?;
            } else {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, ";{}=\"{}\"", name, escaped)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ContentType {
    type Err = ContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentType {
    type Error = ContentTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        value.to_string()
    }
}
