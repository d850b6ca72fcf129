//! Resource URIs and URI patterns.
//!
//! A pattern is `scheme://` plus a path whose tail may be a glob: `*` matches
//! within one path segment, `**` matches across segments. Matching a
//! concrete URI against a set of patterns is scheme-exact; among glob
//! candidates the selection order is exact path, then longest literal
//! prefix, then registration order (decided by the caller).

use crate::error::{McpError, McpResult, RegistryError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref SCHEME_RE: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*$").unwrap();
}

/// A concrete resource URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri(String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scheme component, if the URI has the `scheme://` form.
    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once("://").map(|(scheme, _)| scheme)
    }

    /// Path component after `scheme://`.
    pub fn path(&self) -> Option<&str> {
        self.0.split_once("://").map(|(_, path)| path)
    }

    pub fn validate(&self) -> McpResult<()> {
        let Some((scheme, _)) = self.0.split_once("://") else {
            return Err(McpError::invalid_params(format!(
                "URI '{}' must have the form scheme://path",
                self.0
            )));
        };
        if !SCHEME_RE.is_match(scheme) {
            return Err(McpError::invalid_params(format!(
                "URI '{}' has an invalid scheme",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Self {
        Uri::new(s)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Uri::new(s)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A compiled URI pattern: scheme, literal prefix, and an optional glob tail.
#[derive(Debug, Clone)]
pub struct UriPattern {
    source: String,
    scheme: String,
    /// Path up to the first glob character.
    literal_prefix: String,
    /// Compiled matcher for the whole path; `None` for literal patterns.
    glob: Option<Regex>,
}

impl UriPattern {
    /// Compile a pattern string such as `note://notes/**` or `file://config`.
    pub fn compile(pattern: &str) -> McpResult<Self> {
        let Some((scheme, path)) = pattern.split_once("://") else {
            return Err(McpError::Registry(RegistryError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "missing scheme separator '://'".to_string(),
            }));
        };
        if !SCHEME_RE.is_match(scheme) {
            return Err(McpError::Registry(RegistryError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "invalid scheme".to_string(),
            }));
        }

        let literal_prefix: String = path
            .chars()
            .take_while(|&c| c != '*')
            .collect();

        let glob = if path.contains('*') {
            Some(compile_glob(path).map_err(|reason| {
                McpError::Registry(RegistryError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason,
                })
            })?)
        } else {
            None
        };

        Ok(Self {
            source: pattern.to_string(),
            scheme: scheme.to_string(),
            literal_prefix,
            glob,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn literal_prefix(&self) -> &str {
        &self.literal_prefix
    }

    /// Whether the pattern has no glob tail.
    pub fn is_literal(&self) -> bool {
        self.glob.is_none()
    }

    /// Match a concrete URI against this pattern. Scheme must be exact.
    pub fn matches(&self, uri: &Uri) -> bool {
        let Some((scheme, path)) = uri.as_str().split_once("://") else {
            return false;
        };
        if scheme != self.scheme {
            return false;
        }
        match &self.glob {
            None => path == self.literal_prefix,
            Some(glob) => glob.is_match(path),
        }
    }

    /// Whether the URI's path equals the pattern's path exactly (no glob
    /// involvement). Used as the top selection criterion.
    pub fn is_exact_match(&self, uri: &Uri) -> bool {
        self.is_literal() && self.matches(uri)
    }
}

/// Translate a path glob into an anchored regex: `**` crosses segment
/// boundaries, `*` stays within one segment, everything else is literal.
fn compile_glob(path: &str) -> Result<Regex, String> {
    let mut regex = String::from("^");
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).map_err(|e| e.to_string())
}

/// Select the best-matching pattern for `uri` among `patterns`, which must be
/// in registration order. Selection: exact path match, then longest literal
/// prefix, then earliest registration.
pub fn select_pattern<'a, T>(
    patterns: impl Iterator<Item = (&'a UriPattern, T)>,
    uri: &Uri,
) -> Option<T> {
    let mut best: Option<(&UriPattern, T)> = None;
    for (pattern, value) in patterns {
        if !pattern.matches(uri) {
            continue;
        }
        let candidate_rank = (
            pattern.is_exact_match(uri),
            pattern.literal_prefix().len(),
        );
        let replace = match &best {
            None => true,
            Some((current, _)) => {
                let current_rank = (current.is_exact_match(uri), current.literal_prefix().len());
                // Strictly better only; ties keep the earlier registration.
                candidate_rank > current_rank
            }
        };
        if replace {
            best = Some((pattern, value));
        }
    }
    best.map(|(_, value)| value)
}
