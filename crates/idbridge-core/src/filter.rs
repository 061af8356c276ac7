//! Group-filter resolution.
//!
//! The filter arrives as a free-form list of strings; each entry may itself
//! be a newline- or comma-separated list. Normalization splits on newline,
//! then on comma, trims each fragment, drops empties, and lower-cases the
//! rest into a token set. A source group is in scope when its email or its
//! name matches a token.

use crate::source::SourceError;
use std::collections::BTreeSet;

/// Normalized set of group-filter tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilter {
    tokens: BTreeSet<String>,
}

impl GroupFilter {
    /// Normalize raw filter entries into a token set.
    ///
    /// An empty token set is a configuration error.
    pub fn parse(entries: &[String]) -> Result<Self, SourceError> {
        let mut tokens = BTreeSet::new();
        for entry in entries {
            for line in entry.split('\n') {
                for fragment in line.split(',') {
                    let token = fragment.trim();
                    if !token.is_empty() {
                        tokens.insert(token.to_lowercase());
                    }
                }
            }
        }
        if tokens.is_empty() {
            return Err(SourceError::Config(
                "could not resolve filter content to groups".to_string(),
            ));
        }
        Ok(Self { tokens })
    }

    /// Whether a group with this name and email is in scope.
    pub fn matches(&self, name: &str, email: &str) -> bool {
        self.tokens.contains(&email.to_lowercase()) || self.tokens.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate the normalized tokens in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}
