//! Application model construction pipeline
//!
//! [`ApplicationModelBuilder`] gathers every input up front and
//! [`ApplicationModelBuilder::build`] runs the stages in order: property chain,
//! tree reading and merging, mutation passes, indexing, validation, optional
//! module expansion and finally type and kind resolution. Any failure discards
//! the partially built model.

use super::indexer::ComponentIndex;
use super::mutation;
use super::reader::{ComponentModelReader, ComponentTreeBuilder, ReaderOptions};
use super::types::{self, CoreKindResolver};
use super::validator::{self, ModelValidator};
use crate::models::{
    well_known, ArtifactDeclaration, BuildingDefinitionRegistry, ComponentIdentifier, ComponentKindResolver,
    ComponentModel, ComponentTree, ConfigFile, ExtensionDescriptor, ModuleExpander, NodeId, TypeLoader,
};
use crate::properties::{
    build_resolver_chain, ConfigurationProperties, ConfigurationPropertiesProviderFactory,
    EnvironmentPropertiesProvider, InMemoryResources, PropertyChainInputs, PropertyResolver,
    ProviderFactoryRegistry, ResourceProvider,
};
use crate::Result;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Collects the inputs of an [`ApplicationModel`]
pub struct ApplicationModelBuilder {
    config_files: Vec<ConfigFile>,
    declaration: Option<ArtifactDeclaration>,
    extensions: Vec<ExtensionDescriptor>,
    deployment_properties: IndexMap<String, String>,
    parent_properties: Option<Arc<dyn ConfigurationProperties>>,
    building_definitions: Option<Arc<dyn BuildingDefinitionRegistry>>,
    provider_factories: ProviderFactoryRegistry,
    resources: Arc<dyn ResourceProvider>,
    environment: Option<Arc<EnvironmentPropertiesProvider>>,
    runtime_mode: bool,
    reader_options: ReaderOptions,
    module_expander: Option<Arc<dyn ModuleExpander>>,
    kind_resolver: Option<Arc<dyn ComponentKindResolver>>,
    type_loader: Option<Arc<dyn TypeLoader>>,
}

impl Default for ApplicationModelBuilder {
    fn default() -> Self {
        Self {
            config_files: Vec::new(),
            declaration: None,
            extensions: Vec::new(),
            deployment_properties: IndexMap::new(),
            parent_properties: None,
            building_definitions: None,
            provider_factories: ProviderFactoryRegistry::with_defaults(),
            resources: Arc::new(InMemoryResources::new()),
            environment: None,
            runtime_mode: true,
            reader_options: ReaderOptions::default(),
            module_expander: None,
            kind_resolver: Some(Arc::new(CoreKindResolver)),
            type_loader: None,
        }
    }
}

impl ApplicationModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_file(mut self, config_file: ConfigFile) -> Self {
        self.config_files.push(config_file);
        self
    }

    pub fn with_config_files(mut self, config_files: impl IntoIterator<Item = ConfigFile>) -> Self {
        self.config_files.extend(config_files);
        self
    }

    /// Declarative global elements, appended after file content
    pub fn with_declaration(mut self, declaration: ArtifactDeclaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = ExtensionDescriptor>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    pub fn with_deployment_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.deployment_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_deployment_properties(mut self, properties: IndexMap<String, String>) -> Self {
        self.deployment_properties.extend(properties);
        self
    }

    /// Properties inherited from an enclosing artifact such as a domain
    pub fn with_parent_properties(mut self, parent: Arc<dyn ConfigurationProperties>) -> Self {
        self.parent_properties = Some(parent);
        self
    }

    pub fn with_building_definitions(mut self, definitions: Arc<dyn BuildingDefinitionRegistry>) -> Self {
        self.building_definitions = Some(definitions);
        self
    }

    /// Replace the provider factories, including the built-in one
    pub fn with_provider_factories(mut self, factories: ProviderFactoryRegistry) -> Self {
        self.provider_factories = factories;
        self
    }

    pub fn register_provider_factory(
        &mut self,
        factory: Arc<dyn ConfigurationPropertiesProviderFactory>,
    ) -> Result<()> {
        self.provider_factories.register(factory)
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = resources;
        self
    }

    /// Use a fixed environment instead of the process environment
    pub fn with_environment<K, V>(mut self, variables: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = Some(Arc::new(EnvironmentPropertiesProvider::from_map(variables)));
        self
    }

    /// Outside runtime mode, module expansion is skipped
    pub fn with_runtime_mode(mut self, runtime_mode: bool) -> Self {
        self.runtime_mode = runtime_mode;
        self
    }

    pub fn with_reader_options(mut self, options: ReaderOptions) -> Self {
        self.reader_options = options;
        self
    }

    pub fn with_module_expander(mut self, expander: Arc<dyn ModuleExpander>) -> Self {
        self.module_expander = Some(expander);
        self
    }

    /// `None` disables kind resolution
    pub fn with_kind_resolver(mut self, resolver: Option<Arc<dyn ComponentKindResolver>>) -> Self {
        self.kind_resolver = resolver;
        self
    }

    pub fn with_type_loader(mut self, loader: Arc<dyn TypeLoader>) -> Self {
        self.type_loader = Some(loader);
        self
    }

    #[instrument(skip_all, fields(files = self.config_files.len()))]
    pub fn build(self) -> Result<ApplicationModel> {
        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(EnvironmentPropertiesProvider::from_process()));

        let properties = crate::trace_performance!("property_chain", {
            build_resolver_chain(PropertyChainInputs {
                config_files: &self.config_files,
                environment,
                parent: self.parent_properties,
                deployment_properties: &self.deployment_properties,
                factories: &self.provider_factories,
                resources: self.resources,
            })
        })?;
        debug!(chain = ?properties.describe_chain(), "Property resolver chain ready");

        let (tree, root) = crate::trace_performance!("read_component_tree", {
            let reader = ComponentModelReader::new(&properties, self.reader_options);
            let mut tree_builder = ComponentTreeBuilder::new();
            for config_file in &self.config_files {
                tree_builder.add_config_file(&reader, config_file)?;
            }
            if let Some(declaration) = &self.declaration {
                tree_builder.add_declaration(declaration);
            }
            tree_builder.finish()
        });

        let mut model = ApplicationModel {
            tree,
            root,
            index: ComponentIndex::default(),
            properties,
            extensions: self.extensions,
        };

        let definitions = self.building_definitions.as_deref();
        crate::trace_performance!("mutation_passes", {
            if let Some(root) = model.root {
                if let Some(definitions) = definitions {
                    mutation::apply_registration_names(&mut model.tree, root, definitions);
                }
                mutation::create_effective_model(&mut model.tree, root);
            }
            model.reindex();
        });
        model.validate(definitions)?;

        if self.runtime_mode {
            if let Some(expander) = &self.module_expander {
                model.expand_modules(expander.as_ref())?;
            }
        }

        if let Some(root) = model.root {
            crate::trace_performance!("type_resolution", {
                if let Some(definitions) = definitions {
                    types::resolve_component_types(&mut model.tree, root, definitions, self.type_loader.as_deref())?;
                }
                if let Some(resolver) = &self.kind_resolver {
                    types::resolve_component_kinds(&mut model.tree, root, resolver.as_ref(), &model.extensions);
                }
            });
        }

        info!(
            components = model.component_ids().count(),
            top_level = model.top_level_ids().count(),
            "Application model built"
        );
        Ok(model)
    }
}

/// The merged, validated component tree of one application
#[derive(Debug)]
pub struct ApplicationModel {
    tree: ComponentTree,
    root: Option<NodeId>,
    index: ComponentIndex,
    properties: Arc<PropertyResolver>,
    extensions: Vec<ExtensionDescriptor>,
}

impl ApplicationModel {
    pub fn builder() -> ApplicationModelBuilder {
        ApplicationModelBuilder::new()
    }

    /// Root document, or `None` when no input was supplied
    pub fn root(&self) -> Option<&ComponentModel> {
        self.root.map(|id| &self.tree[id])
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn component(&self, id: NodeId) -> &ComponentModel {
        &self.tree[id]
    }

    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    pub fn extensions(&self) -> &[ExtensionDescriptor] {
        &self.extensions
    }

    /// Whether the root is a full document rather than a declared fragment
    pub fn is_configuration_document(&self) -> bool {
        self.root
            .is_some_and(|root| validator::is_configuration_document(&self.tree, root))
    }

    /// Named component anywhere in the tree; top-level declarations win
    pub fn find_named_element(&self, name: &str) -> Option<&ComponentModel> {
        self.index.find_named_element(name).map(|id| &self.tree[id])
    }

    pub fn find_top_level_named_component(&self, name: &str) -> Option<&ComponentModel> {
        self.index
            .find_top_level_named_component(name)
            .map(|id| &self.tree[id])
    }

    /// First top-level declaration with `identifier`
    pub fn find_component_definition(&self, identifier: &ComponentIdentifier) -> Option<&ComponentModel> {
        self.top_level_components()
            .find(|model| model.identifier() == identifier)
    }

    /// Pre-order ids of the whole tree, parents before children
    pub fn component_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root
            .into_iter()
            .flat_map(move |root| self.tree.descendants(root))
    }

    /// Ids of the root's direct children in declaration order
    pub fn top_level_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root
            .into_iter()
            .flat_map(move |root| self.tree.children(root).iter().copied())
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentModel> + '_ {
        self.component_ids().map(move |id| &self.tree[id])
    }

    pub fn top_level_components(&self) -> impl Iterator<Item = &ComponentModel> + '_ {
        self.top_level_ids().map(move |id| &self.tree[id])
    }

    pub fn flows(&self) -> impl Iterator<Item = &ComponentModel> + '_ {
        let flow = well_known::flow();
        self.top_level_components()
            .filter(move |model| model.identifier() == &flow)
    }

    /// The resolver chain the model was read with, for ad-hoc resolution
    pub fn configuration_properties(&self) -> Arc<PropertyResolver> {
        self.properties.clone()
    }

    /// Rebuild the name index from the current tree
    pub fn reindex(&mut self) {
        self.index = ComponentIndex::build(&self.tree, self.root);
    }

    /// Let `expander` rewrite the tree, then reindex
    pub fn expand_modules(&mut self, expander: &dyn ModuleExpander) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        expander.expand(&mut self.tree, root, &self.extensions)?;
        self.reindex();
        debug!(named = self.index.named_count(), "Reindexed after module expansion");
        Ok(())
    }

    fn validate(&self, definitions: Option<&dyn BuildingDefinitionRegistry>) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        if !validator::is_configuration_document(&self.tree, root) {
            warn!(root = %self.tree[root].identifier(), "Skipping validation of configuration fragment");
            return Ok(());
        }
        ModelValidator::new(&self.tree, root, &self.index, definitions).validate()
    }
}
