//! Placeholder resolution over a chain of providers
//!
//! A [`PropertyResolver`] wraps one provider plus an optional delegate resolver.
//! Key lookup checks the resolver's own provider first and then walks the
//! delegates. Values found are themselves expanded against the resolver the
//! resolution started from, so a property may reference other properties.
//! Expansion tracks the keys currently being expanded and fails on a repeat.

use super::provider::{ConfigurationProperty, ConfigurationPropertyProvider};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Couldn't find configuration property value for key ${{{key}}}")]
    Missing { key: String },

    #[error("Cyclic property definition: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([^{}]+)\}").unwrap_or_else(|e| unreachable!("placeholder pattern: {}", e))
    })
}

/// Read-only property lookup, as exposed to other artifacts and callers
pub trait ConfigurationProperties: Send + Sync {
    /// Fully resolved value of `key`, or `None` if it cannot be resolved
    fn resolve_property(&self, key: &str) -> Option<String>;
}

pub struct PropertyResolver {
    provider: Arc<dyn ConfigurationPropertyProvider>,
    parent: Option<Arc<PropertyResolver>>,
}

impl PropertyResolver {
    /// Bottom of a chain
    pub fn new(provider: Arc<dyn ConfigurationPropertyProvider>) -> Self {
        Self {
            provider,
            parent: None,
        }
    }

    /// A resolver whose provider takes precedence over everything in `parent`
    pub fn wrap(parent: Arc<PropertyResolver>, provider: Arc<dyn ConfigurationPropertyProvider>) -> Self {
        Self {
            provider,
            parent: Some(parent),
        }
    }

    pub fn parent(&self) -> Option<&Arc<PropertyResolver>> {
        self.parent.as_ref()
    }

    /// Provider descriptions from highest to lowest precedence
    pub fn describe_chain(&self) -> Vec<String> {
        let mut descriptions = vec![self.provider.description().to_string()];
        let mut current = self.parent.as_deref();
        while let Some(resolver) = current {
            descriptions.push(resolver.provider.description().to_string());
            current = resolver.parent.as_deref();
        }
        descriptions
    }

    /// Raw property for `key` from the most specific provider that has it
    pub fn lookup(&self, key: &str) -> Option<ConfigurationProperty> {
        let mut current = Some(self);
        while let Some(resolver) = current {
            if let Some(property) = resolver.provider.configuration_property(key) {
                return Some(property);
            }
            current = resolver.parent.as_deref();
        }
        None
    }

    pub fn is_placeholder(text: &str) -> bool {
        placeholder_regex().is_match(text)
    }

    /// Replace every `${key}` occurrence in `raw`
    pub fn resolve_value(&self, raw: &str) -> Result<String, PropertyError> {
        let mut expanding = Vec::new();
        self.expand(raw, &mut expanding)
    }

    /// Resolve a single key as if it were written `${key}`
    pub fn resolve_key(&self, key: &str) -> Result<String, PropertyError> {
        let mut expanding = Vec::new();
        self.expand_key(key, &mut expanding)
    }

    fn expand(&self, raw: &str, expanding: &mut Vec<String>) -> Result<String, PropertyError> {
        if !raw.contains("${") {
            return Ok(raw.to_string());
        }

        let mut resolved = String::with_capacity(raw.len());
        let mut last = 0;
        for captures in placeholder_regex().captures_iter(raw) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            resolved.push_str(&raw[last..whole.start()]);
            resolved.push_str(&self.expand_key(key.as_str().trim(), expanding)?);
            last = whole.end();
        }
        resolved.push_str(&raw[last..]);
        Ok(resolved)
    }

    fn expand_key(&self, key: &str, expanding: &mut Vec<String>) -> Result<String, PropertyError> {
        if expanding.iter().any(|k| k == key) {
            let mut chain = expanding.clone();
            chain.push(key.to_string());
            return Err(PropertyError::Cycle { chain });
        }

        let property = self.lookup(key).ok_or_else(|| PropertyError::Missing {
            key: key.to_string(),
        })?;
        trace!(key, source = %property.source, "Resolved configuration property");

        expanding.push(key.to_string());
        let value = self.expand(&property.raw_value, expanding);
        expanding.pop();
        value
    }
}

impl ConfigurationProperties for PropertyResolver {
    fn resolve_property(&self, key: &str) -> Option<String> {
        self.resolve_key(key).ok()
    }
}

impl std::fmt::Debug for PropertyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyResolver")
            .field("chain", &self.describe_chain())
            .finish()
    }
}
