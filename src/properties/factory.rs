//! In-config property providers
//!
//! Some top-level declarations define property sources themselves (for example a
//! `configuration-properties` element pointing at a file). The host registers a
//! factory per supported identifier; the builder converts each matching
//! declaration into [`ConfigurationParameters`] and asks the factory for a
//! provider before any other parameter is resolved.

use super::provider::{ConfigurationPropertyProvider, MapPropertiesProvider};
use super::resource::ResourceProvider;
use crate::models::{well_known, ComponentIdentifier};
use crate::{ModelError, Result};
use anyhow::{anyhow, bail, Context};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved parameters of a provider declaration; nested elements become groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationParameters {
    simple: IndexMap<String, String>,
    complex: Vec<(ComponentIdentifier, ConfigurationParameters)>,
}

impl ConfigurationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simple_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.simple.insert(name.into(), value.into());
        self
    }

    pub fn with_complex_parameter(mut self, identifier: ComponentIdentifier, parameters: ConfigurationParameters) -> Self {
        self.complex.push((identifier, parameters));
        self
    }

    pub fn simple_parameter(&self, name: &str) -> Option<&str> {
        self.simple.get(name).map(String::as_str)
    }

    pub fn simple_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.simple.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn complex_parameters<'a>(
        &'a self,
        identifier: &'a ComponentIdentifier,
    ) -> impl Iterator<Item = &'a ConfigurationParameters> + 'a {
        self.complex
            .iter()
            .filter(move |(id, _)| id == identifier)
            .map(|(_, parameters)| parameters)
    }
}

pub trait ConfigurationPropertiesProviderFactory: Send + Sync {
    fn supported_component_identifier(&self) -> ComponentIdentifier;

    fn create_provider(
        &self,
        parameters: &ConfigurationParameters,
        resources: &dyn ResourceProvider,
    ) -> anyhow::Result<Arc<dyn ConfigurationPropertyProvider>>;
}

/// Provider factories keyed by the identifier they handle
#[derive(Default, Clone)]
pub struct ProviderFactoryRegistry {
    factories: HashMap<ComponentIdentifier, Arc<dyn ConfigurationPropertiesProviderFactory>>,
}

impl ProviderFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `configuration-properties` factory
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            well_known::configuration_properties(),
            Arc::new(PropertiesFileProviderFactory),
        );
        registry
    }

    /// Register a factory; two factories for one identifier is a configuration error
    pub fn register(&mut self, factory: Arc<dyn ConfigurationPropertiesProviderFactory>) -> Result<()> {
        let identifier = factory.supported_component_identifier();
        if self.factories.contains_key(&identifier) {
            return Err(ModelError::ProviderFailure {
                message: format!("Multiple configuration providers for component: {}", identifier),
                component: identifier,
            });
        }
        self.factories.insert(identifier, factory);
        Ok(())
    }

    pub fn get(&self, identifier: &ComponentIdentifier) -> Option<&Arc<dyn ConfigurationPropertiesProviderFactory>> {
        self.factories.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ProviderFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Handles `core:configuration-properties file="..."`
///
/// `.toml` resources are flattened into dotted keys; anything else is read in
/// `.properties` syntax: `key=value`, `key: value` or `key value` entries,
/// `#` and `!` comments, `\` line continuations and `\t`, `\n`, `\uXXXX`
/// style escapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesFileProviderFactory;

impl ConfigurationPropertiesProviderFactory for PropertiesFileProviderFactory {
    fn supported_component_identifier(&self) -> ComponentIdentifier {
        well_known::configuration_properties()
    }

    fn create_provider(
        &self,
        parameters: &ConfigurationParameters,
        resources: &dyn ResourceProvider,
    ) -> anyhow::Result<Arc<dyn ConfigurationPropertyProvider>> {
        let file = parameters
            .simple_parameter("file")
            .ok_or_else(|| anyhow!("Required parameter 'file' is missing"))?;
        let Some(bytes) = resources.resource(file) else {
            bail!("Couldn't find configuration properties file {}", file);
        };
        let content = String::from_utf8(bytes)
            .with_context(|| format!("Configuration properties file {} is not valid UTF-8", file))?;

        let values = if file.ends_with(".toml") {
            parse_toml_properties(&content).with_context(|| format!("Invalid TOML in {}", file))?
        } else {
            parse_properties(&content).with_context(|| format!("Invalid properties file {}", file))?
        };

        Ok(Arc::new(MapPropertiesProvider::new(
            format!("configuration-properties - file: {}", file),
            values,
        )))
    }
}

fn parse_properties(content: &str) -> anyhow::Result<Vec<(String, String)>> {
    let mut values = Vec::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key).with_context(|| format!("Line {}", index + 1))?;
        let value = unescape(value).with_context(|| format!("Line {}", index + 1))?;
        values.push((key, value));
    }
    Ok(values)
}

/// An odd run of trailing backslashes joins the next line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// The key ends at the first unescaped `=`, `:` or whitespace
fn split_entry(line: &str) -> (&str, &str) {
    const BLANK: [char; 3] = [' ', '\t', '\x0c'];

    let mut escaped = false;
    let mut key_end = line.len();
    for (position, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || BLANK.contains(&c) {
            key_end = position;
            break;
        }
    }

    let rest = line[key_end..].trim_start_matches(BLANK);
    let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
    (&line[..key_end], rest.trim_start_matches(BLANK))
}

fn unescape(raw: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

/// Decode the digits after `\u`, joining UTF-16 surrogate pairs
fn unicode_escape(chars: &mut std::str::Chars<'_>) -> anyhow::Result<char> {
    let high = hex4(chars)?;
    if !(0xD800..=0xDBFF).contains(&high) {
        return char::from_u32(high).ok_or_else(|| anyhow!("Invalid \\u{:04X} escape", high));
    }

    let mut lookahead = chars.clone();
    if lookahead.next() != Some('\\') || lookahead.next() != Some('u') {
        bail!("Unpaired surrogate \\u{:04X}", high);
    }
    let low = hex4(&mut lookahead)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        bail!("Unpaired surrogate \\u{:04X}", high);
    }
    *chars = lookahead;
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).ok_or_else(|| anyhow!("Invalid surrogate pair \\u{:04X}\\u{:04X}", high, low))
}

fn hex4(chars: &mut std::str::Chars<'_>) -> anyhow::Result<u32> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Malformed \\uXXXX escape: \\u{}", digits);
    }
    Ok(u32::from_str_radix(&digits, 16)?)
}

fn parse_toml_properties(content: &str) -> anyhow::Result<Vec<(String, String)>> {
    let table: toml::Table = toml::from_str(content)?;
    let mut values = Vec::new();
    flatten_toml("", &toml::Value::Table(table), &mut values);
    Ok(values)
}

fn flatten_toml(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml(&path, nested, out);
            }
        }
        toml::Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_toml(&format!("{}[{}]", prefix, index), item, out);
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
