//! Route templates
//!
//! A template is a path with optional query bindings:
//!
//! ```text
//! /your-documents/view-doc?canisterId=(:canister)&callerId=:caller&documentId=:id
//! ```
//!
//! - `:name` as a whole path segment captures that segment
//! - `key=:name` requires a non-empty `key` query parameter
//! - `key=(:name)` captures `key` when present
//!
//! Query parameters the template does not mention are ignored, and their
//! order in the url does not matter.

use std::collections::BTreeMap;

use axum::extract::Query;
use axum::http::Uri;
use regex::Regex;
use thiserror::Error;

/// Variables captured by a successful match, by name
pub type Captures = BTreeMap<String, String>;

/// Malformed route template. Raised when route tables are built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("route template must start with '/': {0}")]
    NotAbsolute(String),

    #[error("invalid variable name {name:?} in {template}")]
    InvalidName { template: String, name: String },

    #[error("malformed query binding {binding:?} in {template}")]
    InvalidBinding { template: String, binding: String },

    #[error("variable {name} bound twice in {template}")]
    DuplicateName { template: String, name: String },

    #[error("route template {template} did not compile: {reason}")]
    Regex { template: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryBinding {
    key: String,
    name: String,
    optional: bool,
}

/// A compiled route template
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    path: Regex,
    path_names: Vec<String>,
    query: Vec<QueryBinding>,
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl RoutePattern {
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let (path_part, query_part) = match template.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (template, None),
        };

        if !path_part.starts_with('/') {
            return Err(PatternError::NotAbsolute(template.to_string()));
        }

        let mut names: Vec<String> = Vec::new();
        let mut claim = |name: &str| -> Result<String, PatternError> {
            if !valid_name(name) {
                return Err(PatternError::InvalidName {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            if names.iter().any(|n| n == name) {
                return Err(PatternError::DuplicateName {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            names.push(name.to_string());
            Ok(name.to_string())
        };

        let mut source = String::from("^");
        let mut path_names = Vec::new();
        for segment in path_part.split('/').skip(1) {
            source.push('/');
            match segment.strip_prefix(':') {
                Some(name) => {
                    let name = claim(name)?;
                    source.push_str(&format!("(?P<{}>[^/]+)", name));
                    path_names.push(name);
                }
                None => source.push_str(&regex::escape(segment)),
            }
        }
        // Tolerate one trailing slash
        if !source.ends_with('/') {
            source.push_str("/?");
        }
        source.push('$');

        let path = Regex::new(&source).map_err(|e| PatternError::Regex {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        let mut query = Vec::new();
        for binding in query_part.into_iter().flat_map(|q| q.split('&')) {
            let malformed = || PatternError::InvalidBinding {
                template: template.to_string(),
                binding: binding.to_string(),
            };
            let (key, target) = binding.split_once('=').ok_or_else(malformed)?;
            if key.is_empty() {
                return Err(malformed());
            }
            let (name, optional) = if let Some(inner) =
                target.strip_prefix("(:").and_then(|t| t.strip_suffix(')'))
            {
                (inner, true)
            } else if let Some(inner) = target.strip_prefix(':') {
                (inner, false)
            } else {
                return Err(malformed());
            };
            query.push(QueryBinding {
                key: key.to_string(),
                name: claim(name)?,
                optional,
            });
        }

        Ok(RoutePattern {
            template: template.to_string(),
            path,
            path_names,
            query,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Matches a parsed uri. Query values arrive percent-decoded.
    pub fn match_uri(&self, uri: &Uri) -> Option<Captures> {
        let found = self.path.captures(uri.path())?;

        let mut captures = Captures::new();
        for name in &self.path_names {
            let value = found.name(name)?;
            captures.insert(name.clone(), value.as_str().to_string());
        }

        if self.query.is_empty() {
            return Some(captures);
        }

        let Query(params) = Query::<BTreeMap<String, String>>::try_from_uri(uri).ok()?;
        for binding in &self.query {
            match params.get(&binding.key) {
                Some(value) if !value.is_empty() => {
                    captures.insert(binding.name.clone(), value.clone());
                }
                _ if binding.optional => {}
                _ => return None,
            }
        }

        Some(captures)
    }

    /// Matches a raw `path?query` string. Unparsable urls match nothing.
    pub fn match_url(&self, url: &str) -> Option<Captures> {
        let uri: Uri = url.parse().ok()?;
        self.match_uri(&uri)
    }
}
