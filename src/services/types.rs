//! Runtime type and kind assignment
//!
//! Both passes run after validation and write each node at most once.

use crate::models::{
    well_known, BuildingDefinitionRegistry, ComponentKind, ComponentKindResolver, ComponentModel,
    ComponentTree, ExtensionDescriptor, NodeId, TypeDefinitionVisitor, TypeLoader, TypeRef,
    CLASS_ATTRIBUTE,
};
use crate::{ModelError, Result};
use tracing::debug;

/// Works out the type a building definition assigns to one component
pub struct ObjectTypeVisitor<'a> {
    model: &'a ComponentModel,
    loader: Option<&'a dyn TypeLoader>,
    resolved: Option<TypeRef>,
    failure: Option<ModelError>,
}

impl<'a> ObjectTypeVisitor<'a> {
    pub fn new(model: &'a ComponentModel, loader: Option<&'a dyn TypeLoader>) -> Self {
        Self {
            model,
            loader,
            resolved: None,
            failure: None,
        }
    }

    /// The resolved type, if the definition produced one
    pub fn finish(self) -> Result<Option<TypeRef>> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.resolved),
        }
    }

    fn load(&mut self, class_name: &str) {
        let Some(loader) = self.loader else {
            debug!(class = class_name, component = %self.model.identifier(), "No type loader configured");
            return;
        };
        match loader.load(class_name) {
            Some(type_ref) => self.resolved = Some(type_ref),
            None => {
                self.failure = Some(ModelError::TypeResolutionFailure {
                    class_name: class_name.to_string(),
                    component: self.model.identifier().clone(),
                    location: self.model.source_location().cloned(),
                })
            }
        }
    }
}

impl TypeDefinitionVisitor for ObjectTypeVisitor<'_> {
    fn on_type(&mut self, type_ref: &TypeRef) {
        self.resolved = Some(type_ref.clone());
    }

    fn on_config_attribute(&mut self, attribute_name: &str) {
        if let Some(class_name) = self.model.parameter(attribute_name) {
            self.load(class_name);
        }
    }
}

/// Assign a type to every node with a building definition
///
/// Nodes without a definition fall back to their `class` attribute.
pub fn resolve_component_types(
    tree: &mut ComponentTree,
    root: NodeId,
    definitions: &dyn BuildingDefinitionRegistry,
    loader: Option<&dyn TypeLoader>,
) -> Result<usize> {
    let mut assignments = Vec::new();
    for id in tree.descendants(root) {
        let model = &tree[id];
        let mut visitor = ObjectTypeVisitor::new(model, loader);
        match definitions.building_definition(model.identifier()) {
            Some(definition) => definition.type_definition.visit(&mut visitor),
            None => visitor.on_config_attribute(CLASS_ATTRIBUTE),
        }
        if let Some(type_ref) = visitor.finish()? {
            assignments.push((id, type_ref));
        }
    }

    let resolved = assignments.len();
    for (id, type_ref) in assignments {
        tree[id].set_type(type_ref);
    }
    debug!(resolved, "Resolved component types");
    Ok(resolved)
}

/// Classify every node with `resolver`
pub fn resolve_component_kinds(
    tree: &mut ComponentTree,
    root: NodeId,
    resolver: &dyn ComponentKindResolver,
    extensions: &[ExtensionDescriptor],
) -> usize {
    let kinds: Vec<(NodeId, ComponentKind)> = tree
        .descendants(root)
        .map(|id| (id, resolver.resolve_kind(&tree[id], extensions)))
        .filter(|(_, kind)| *kind != ComponentKind::Unknown)
        .collect();

    let classified = kinds.len();
    for (id, kind) in kinds {
        tree[id].set_resolved_kind(kind);
    }
    debug!(classified, "Resolved component kinds");
    classified
}

/// Kind resolution for core components plus extension-declared ones
///
/// Extensions list their component names under `sources`, `operations`,
/// `routers` and `scopes` in their metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreKindResolver;

impl CoreKindResolver {
    fn core_kind(name: &str) -> ComponentKind {
        match name {
            "flow" | "sub-flow" => ComponentKind::Flow,
            "scheduler" => ComponentKind::Source,
            "error-handler" => ComponentKind::ErrorHandler,
            "on-error" | "on-error-continue" | "on-error-propagate" => ComponentKind::OnError,
            "choice" | "scatter-gather" | "first-successful" | "round-robin" => ComponentKind::Router,
            "when" | "otherwise" | "route" => ComponentKind::Route,
            "foreach" | "parallel-foreach" | "try" | "until-successful" | "async" => ComponentKind::Scope,
            "flow-ref" | "logger" | "set-payload" | "set-variable" | "remove-variable" | "raise-error" => {
                ComponentKind::Operation
            }
            _ => ComponentKind::Unknown,
        }
    }

    fn extension_kind(model: &ComponentModel, extensions: &[ExtensionDescriptor]) -> ComponentKind {
        const GROUPS: [(&str, ComponentKind); 4] = [
            ("sources", ComponentKind::Source),
            ("operations", ComponentKind::Operation),
            ("routers", ComponentKind::Router),
            ("scopes", ComponentKind::Scope),
        ];

        let identifier = model.identifier();
        let Some(extension) = extensions
            .iter()
            .find(|e| e.namespace == identifier.namespace())
        else {
            return ComponentKind::Unknown;
        };

        GROUPS
            .iter()
            .find(|(group, _)| {
                extension.metadata[*group]
                    .as_array()
                    .is_some_and(|names| names.iter().any(|n| n.as_str() == Some(identifier.name())))
            })
            .map_or(ComponentKind::Unknown, |(_, kind)| *kind)
    }
}

impl ComponentKindResolver for CoreKindResolver {
    fn resolve_kind(&self, model: &ComponentModel, extensions: &[ExtensionDescriptor]) -> ComponentKind {
        let identifier = model.identifier();
        if identifier.namespace() == well_known::flow().namespace() {
            Self::core_kind(identifier.name())
        } else {
            Self::extension_kind(model, extensions)
        }
    }
}
