//! Configuration property providers
//!
//! Each provider answers key lookups from one source. Providers never resolve
//! placeholders themselves; they hand back the raw value and the resolver chain
//! expands it.

use super::resolver::ConfigurationProperties;
use super::resource::ResourceProvider;
use crate::models::{well_known, ConfigFile, SourceLocation, NAME_ATTRIBUTE, VALUE_ATTRIBUTE};
use crate::{ModelError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Key prefix answered by the external file provider, e.g. `${file::banner.txt}`
pub const FILE_KEY_PREFIX: &str = "file::";

/// A raw property value and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationProperty {
    pub source: String,
    pub key: String,
    pub raw_value: String,
}

impl ConfigurationProperty {
    pub fn new(source: impl Into<String>, key: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            key: key.into(),
            raw_value: raw_value.into(),
        }
    }
}

pub trait ConfigurationPropertyProvider: Send + Sync {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty>;

    fn description(&self) -> &str;
}

impl fmt::Debug for dyn ConfigurationPropertyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigurationPropertyProvider({})", self.description())
    }
}

/// Key/value pairs from a map, used for deployment overrides and property files
#[derive(Debug, Clone)]
pub struct MapPropertiesProvider {
    description: String,
    values: HashMap<String, String>,
}

impl MapPropertiesProvider {
    pub fn new<I, K, V>(description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            description: description.into(),
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigurationPropertyProvider for MapPropertiesProvider {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty> {
        self.values
            .get(key)
            .map(|value| ConfigurationProperty::new(self.description.as_str(), key, value.as_str()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Process environment variables, snapshotted at construction
#[derive(Debug, Clone)]
pub struct EnvironmentPropertiesProvider {
    inner: MapPropertiesProvider,
}

impl EnvironmentPropertiesProvider {
    pub fn from_process() -> Self {
        Self::from_map(std::env::vars())
    }

    pub fn from_map<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: MapPropertiesProvider::new("Environment properties", values),
        }
    }
}

impl ConfigurationPropertyProvider for EnvironmentPropertiesProvider {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty> {
        self.inner.configuration_property(key)
    }

    fn description(&self) -> &str {
        self.inner.description()
    }
}

/// `global-property` declarations found at the top level of the config files
#[derive(Debug, Clone, Default)]
pub struct GlobalPropertiesProvider {
    properties: HashMap<String, ConfigurationProperty>,
}

impl GlobalPropertiesProvider {
    /// Collect every top-level `global-property`; later files override earlier ones
    pub fn from_config_files(config_files: &[ConfigFile]) -> Result<Self> {
        let global_property = well_known::global_property();
        let mut properties = HashMap::new();

        for config_file in config_files {
            let Some(root) = config_file.root_line() else {
                continue;
            };

            for line in root
                .children
                .iter()
                .filter(|line| line.component_identifier() == global_property)
            {
                let location = SourceLocation::new(config_file.file_name.as_str(), line.line_number);
                let (Some(key), Some(raw_value)) =
                    (line.attribute(NAME_ATTRIBUTE), line.attribute(VALUE_ATTRIBUTE))
                else {
                    return Err(ModelError::structural(
                        "global-property must declare both 'name' and 'value'",
                        Some(&location),
                    ));
                };

                let source = format!(
                    "global-property - file: {} - lineNumber {}",
                    config_file.file_name, line.line_number
                );
                properties.insert(
                    key.to_string(),
                    ConfigurationProperty::new(source, key, raw_value),
                );
            }
        }

        Ok(Self { properties })
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl ConfigurationPropertyProvider for GlobalPropertiesProvider {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty> {
        self.properties.get(key).cloned()
    }

    fn description(&self) -> &str {
        "Global properties"
    }
}

/// Properties inherited from a parent artifact, such as a domain
pub struct ParentArtifactProvider {
    parent: Arc<dyn ConfigurationProperties>,
}

impl ParentArtifactProvider {
    pub fn new(parent: Arc<dyn ConfigurationProperties>) -> Self {
        Self { parent }
    }
}

impl ConfigurationPropertyProvider for ParentArtifactProvider {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty> {
        self.parent
            .resolve_property(key)
            .map(|value| ConfigurationProperty::new(self.description(), key, value))
    }

    fn description(&self) -> &str {
        "Parent artifact properties"
    }
}

/// Answers `file::<resource>` keys with the resource content
pub struct FilePropertiesProvider {
    resources: Arc<dyn ResourceProvider>,
    description: String,
}

impl FilePropertiesProvider {
    pub fn new(resources: Arc<dyn ResourceProvider>, description: impl Into<String>) -> Self {
        Self {
            resources,
            description: description.into(),
        }
    }
}

impl ConfigurationPropertyProvider for FilePropertiesProvider {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty> {
        let location = key.strip_prefix(FILE_KEY_PREFIX)?;
        let content = self.resources.resource(location)?;
        match String::from_utf8(content) {
            Ok(value) => Some(ConfigurationProperty::new(self.description.as_str(), key, value)),
            Err(e) => {
                warn!(resource = location, error = %e, "Resource is not valid UTF-8");
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Several providers consulted in order; the first with the key wins
pub struct CompositePropertiesProvider {
    providers: Vec<Arc<dyn ConfigurationPropertyProvider>>,
}

impl CompositePropertiesProvider {
    pub fn new(providers: Vec<Arc<dyn ConfigurationPropertyProvider>>) -> Self {
        Self { providers }
    }
}

impl ConfigurationPropertyProvider for CompositePropertiesProvider {
    fn configuration_property(&self, key: &str) -> Option<ConfigurationProperty> {
        self.providers
            .iter()
            .find_map(|provider| provider.configuration_property(key))
    }

    fn description(&self) -> &str {
        "Configuration properties providers"
    }
}
