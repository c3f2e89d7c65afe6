//! Host settings for the model builder
//!
//! Settings live in `~/.config/appmodel/settings.toml`. A missing file means
//! defaults; a file that exists but does not parse is an error.

use super::loader::DirectoryResourceProvider;
use crate::models::{
    BuildingDefinition, ComponentIdentifier, InvalidIdentifier, KnownTypes, StaticBuildingDefinitionRegistry,
    TypeDefinition, TypeRef,
};
use crate::services::{ApplicationModelBuilder, ReaderOptions};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid building definition for {identifier}: {message}")]
    InvalidDefinition { identifier: String, message: String },
}

/// One `[[definitions]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionSettings {
    /// `namespace:name`, or a bare name in the core namespace
    pub identifier: String,
    #[serde(default)]
    pub registration_name: Option<String>,
    #[serde(default)]
    pub named: bool,
    /// Fixed runtime type
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    /// Attribute naming the runtime type, usually `class`
    #[serde(default)]
    pub type_attribute: Option<String>,
}

impl DefinitionSettings {
    fn to_definition(&self) -> Result<(ComponentIdentifier, BuildingDefinition), SettingsError> {
        let invalid = |message: String| SettingsError::InvalidDefinition {
            identifier: self.identifier.clone(),
            message,
        };

        let identifier: ComponentIdentifier = self
            .identifier
            .parse()
            .map_err(|e: InvalidIdentifier| invalid(e.to_string()))?;
        let type_definition = match (&self.type_name, &self.type_attribute) {
            (Some(type_name), None) => TypeDefinition::Fixed(TypeRef::new(type_name.as_str())),
            (None, Some(attribute)) => TypeDefinition::FromConfigAttribute(attribute.clone()),
            _ => return Err(invalid("exactly one of 'type' or 'type_attribute' is required".to_string())),
        };

        Ok((
            identifier,
            BuildingDefinition {
                registration_name: self.registration_name.clone(),
                named: self.named,
                type_definition,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    pub runtime_mode: bool,
    pub resolve_schema_defaults: bool,
    /// Directory serving `file::` lookups and properties files
    pub resources_dir: Option<PathBuf>,
    pub deployment_properties: IndexMap<String, String>,
    pub definitions: Vec<DefinitionSettings>,
    /// Type names the `class` attribute may refer to
    pub known_types: Vec<String>,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            runtime_mode: true,
            resolve_schema_defaults: true,
            resources_dir: None,
            deployment_properties: IndexMap::new(),
            definitions: Vec::new(),
            known_types: Vec::new(),
        }
    }
}

impl BuilderSettings {
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".config").join("appmodel").join("settings.toml")
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn building_definitions(&self) -> Result<StaticBuildingDefinitionRegistry, SettingsError> {
        let mut registry = StaticBuildingDefinitionRegistry::new();
        for entry in &self.definitions {
            let (identifier, definition) = entry.to_definition()?;
            registry.register(identifier, definition);
        }
        Ok(registry)
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            resolve_schema_defaults: self.resolve_schema_defaults,
        }
    }

    /// Configure `builder` with everything these settings describe
    pub fn apply(&self, builder: ApplicationModelBuilder) -> Result<ApplicationModelBuilder, SettingsError> {
        let mut builder = builder
            .with_runtime_mode(self.runtime_mode)
            .with_reader_options(self.reader_options())
            .with_deployment_properties(self.deployment_properties.clone());

        if !self.definitions.is_empty() {
            builder = builder.with_building_definitions(Arc::new(self.building_definitions()?));
        }
        if !self.known_types.is_empty() {
            builder = builder.with_type_loader(Arc::new(KnownTypes::new(self.known_types.iter().cloned())));
        }
        if let Some(dir) = &self.resources_dir {
            builder = builder.with_resources(Arc::new(DirectoryResourceProvider::new(dir)));
        }
        Ok(builder)
    }
}
