//! Configuration property resolution

pub mod chain;
pub mod factory;
pub mod provider;
pub mod resolver;
pub mod resource;

pub use chain::{build_resolver_chain, PropertyChainInputs};
pub use factory::{
    ConfigurationParameters, ConfigurationPropertiesProviderFactory, PropertiesFileProviderFactory,
    ProviderFactoryRegistry,
};
pub use provider::{
    CompositePropertiesProvider, ConfigurationProperty, ConfigurationPropertyProvider,
    EnvironmentPropertiesProvider, FilePropertiesProvider, GlobalPropertiesProvider,
    MapPropertiesProvider, ParentArtifactProvider, FILE_KEY_PREFIX,
};
pub use resolver::{ConfigurationProperties, PropertyError, PropertyResolver};
pub use resource::{InMemoryResources, ResourceProvider};
