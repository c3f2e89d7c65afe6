//! Assembly of the layered resolver chain
//!
//! Lowest to highest precedence: environment, global properties, in-config
//! providers, parent artifact, external files, deployment overrides. Each layer
//! wraps the previous one.

use super::factory::{ConfigurationParameters, ProviderFactoryRegistry};
use super::provider::{
    CompositePropertiesProvider, ConfigurationPropertyProvider, EnvironmentPropertiesProvider,
    FilePropertiesProvider, GlobalPropertiesProvider, MapPropertiesProvider, ParentArtifactProvider,
};
use super::resolver::{ConfigurationProperties, PropertyResolver};
use super::resource::ResourceProvider;
use crate::models::{ConfigFile, ConfigLine, SourceLocation};
use crate::{ModelError, Result};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Everything the chain is assembled from
pub struct PropertyChainInputs<'a> {
    pub config_files: &'a [ConfigFile],
    pub environment: Arc<EnvironmentPropertiesProvider>,
    pub parent: Option<Arc<dyn ConfigurationProperties>>,
    pub deployment_properties: &'a IndexMap<String, String>,
    pub factories: &'a ProviderFactoryRegistry,
    pub resources: Arc<dyn ResourceProvider>,
}

pub fn build_resolver_chain(inputs: PropertyChainInputs<'_>) -> Result<Arc<PropertyResolver>> {
    let environment = Arc::new(PropertyResolver::new(inputs.environment.clone()));

    let global_provider = GlobalPropertiesProvider::from_config_files(inputs.config_files)?;
    debug!(count = global_provider.len(), "Collected global properties");
    let local = Arc::new(PropertyResolver::wrap(environment, Arc::new(global_provider)));

    let mut top = local.clone();

    let custom = discover_config_providers(
        inputs.config_files,
        &local,
        inputs.factories,
        inputs.resources.as_ref(),
    )?;
    if !custom.is_empty() {
        debug!(count = custom.len(), "Registered in-config property providers");
        top = Arc::new(PropertyResolver::wrap(
            top,
            Arc::new(CompositePropertiesProvider::new(custom)),
        ));
    }

    if let Some(parent) = inputs.parent {
        top = Arc::new(PropertyResolver::wrap(top, Arc::new(ParentArtifactProvider::new(parent))));
    }

    top = Arc::new(PropertyResolver::wrap(
        top,
        Arc::new(FilePropertiesProvider::new(inputs.resources.clone(), "External files")),
    ));

    if !inputs.deployment_properties.is_empty() {
        top = Arc::new(PropertyResolver::wrap(
            top,
            Arc::new(MapPropertiesProvider::new(
                "Deployment properties",
                inputs
                    .deployment_properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            )),
        ));
    }

    Ok(top)
}

/// Create a provider for every top-level declaration a factory is registered for
///
/// Parameters are resolved with `local` (environment and global properties only).
pub fn discover_config_providers(
    config_files: &[ConfigFile],
    local: &PropertyResolver,
    factories: &ProviderFactoryRegistry,
    resources: &dyn ResourceProvider,
) -> Result<Vec<Arc<dyn ConfigurationPropertyProvider>>> {
    let mut providers = Vec::new();
    if factories.is_empty() {
        return Ok(providers);
    }

    for config_file in config_files {
        let Some(root) = config_file.root_line() else {
            continue;
        };

        for line in &root.children {
            let identifier = line.component_identifier();
            let Some(factory) = factories.get(&identifier) else {
                continue;
            };

            let location = SourceLocation::new(config_file.file_name.as_str(), line.line_number);
            let parameters = resolve_configuration_parameters(line, local, &location)?;
            let provider = factory
                .create_provider(&parameters, resources)
                .map_err(|e| ModelError::ProviderFailure {
                    component: identifier.clone(),
                    message: format!("{:#} ({})", e, location),
                })?;
            debug!(component = %identifier, at = %location, provider = provider.description(), "Created property provider");
            providers.push(provider);
        }
    }

    Ok(providers)
}

fn resolve_configuration_parameters(
    line: &ConfigLine,
    resolver: &PropertyResolver,
    location: &SourceLocation,
) -> Result<ConfigurationParameters> {
    let mut parameters = ConfigurationParameters::new();
    for (name, attribute) in &line.attributes {
        let value = resolver
            .resolve_value(&attribute.value)
            .map_err(|e| ModelError::unresolved(e, Some(location)))?;
        parameters = parameters.with_simple_parameter(name.as_str(), value);
    }
    for child in &line.children {
        let child_location = SourceLocation::new(location.file_name.as_str(), child.line_number);
        parameters = parameters.with_complex_parameter(
            child.component_identifier(),
            resolve_configuration_parameters(child, resolver, &child_location)?,
        );
    }
    Ok(parameters)
}
