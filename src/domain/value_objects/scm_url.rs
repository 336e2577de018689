//! Symbolic `scm:` repository URLs

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Literal prefix of every symbolic repository URL
pub const SCM_URL_PREFIX: &str = "scm:";

/// Delimiters allowed between the provider id and the specific part
pub const SCM_URL_DELIMITERS: [char; 2] = [':', '|'];

/// Reasons a symbolic URL is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScmUrlError {
    /// No URL was given
    #[error("The SCM URL is missing")]
    Missing,

    /// The URL lacks the `scm:` prefix
    #[error("The SCM URL must start with 'scm:': {0}")]
    MissingPrefix(String),

    /// Nothing between the prefix and the delimiter
    #[error("The SCM URL does not name a provider: {0}")]
    MissingProvider(String),

    /// The provider id starts with something other than a letter
    #[error("The provider id must start with a letter, found '{found}' in {url}")]
    InvalidProviderStart {
        /// Rejected URL
        url: String,
        /// Offending first character
        found: char,
    },

    /// The provider id ends in a character that is not a delimiter
    #[error("The provider id must be followed by ':' or '|', found '{found}' in {url}")]
    InvalidDelimiter {
        /// Rejected URL
        url: String,
        /// Character found where a delimiter was expected
        found: char,
    },

    /// The provider id runs to the end of the URL
    #[error("No delimiter after the provider id in {0}")]
    MissingDelimiter(String),
}

/// A parsed `scm:<provider><delimiter><specific-part>` URL
///
/// Parsing is pure: the same input always yields the same value and no
/// provider is consulted. Whether the specific part is acceptable (including an
/// empty one) is up to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScmUrl {
    provider: String,
    delimiter: char,
    specific_part: String,
}

impl ScmUrl {
    /// Parse a symbolic repository URL
    pub fn parse(url: &str) -> Result<Self, ScmUrlError> {
        let rest = url
            .strip_prefix(SCM_URL_PREFIX)
            .ok_or_else(|| ScmUrlError::MissingPrefix(url.to_string()))?;

        let mut chars = rest.char_indices();
        match chars.next() {
            None => return Err(ScmUrlError::MissingProvider(url.to_string())),
            Some((_, c)) if c.is_ascii_alphabetic() => {}
            Some((_, c)) if SCM_URL_DELIMITERS.contains(&c) => {
                return Err(ScmUrlError::MissingProvider(url.to_string()))
            }
            Some((_, found)) => {
                return Err(ScmUrlError::InvalidProviderStart {
                    url: url.to_string(),
                    found,
                })
            }
        }

        for (index, c) in chars {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                continue;
            }
            if SCM_URL_DELIMITERS.contains(&c) {
                return Ok(Self {
                    provider: rest[..index].to_string(),
                    delimiter: c,
                    specific_part: rest[index + c.len_utf8()..].to_string(),
                });
            }
            return Err(ScmUrlError::InvalidDelimiter {
                url: url.to_string(),
                found: c,
            });
        }

        Err(ScmUrlError::MissingDelimiter(url.to_string()))
    }

    /// Parse an optional URL; `None` is rejected like any malformed input
    pub fn parse_optional(url: Option<&str>) -> Result<Self, ScmUrlError> {
        url.ok_or(ScmUrlError::Missing).and_then(Self::parse)
    }

    /// Provider id
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Delimiter chosen by the caller
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Everything after the delimiter
    pub fn specific_part(&self) -> &str {
        &self.specific_part
    }

    /// Split the specific part on the caller's delimiter
    pub fn split_specific(&self) -> Vec<&str> {
        self.specific_part.split(self.delimiter).collect()
    }
}

impl fmt::Display for ScmUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            SCM_URL_PREFIX, self.provider, self.delimiter, self.specific_part
        )
    }
}

impl TryFrom<&str> for ScmUrl {
    type Error = ScmUrlError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for ScmUrl {
    type Error = ScmUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
