//! Interfaces to the collaborators that live outside the model core
//!
//! The building-definition registry, the type loader, the kind resolver and the
//! module expander are supplied by the host. Extension descriptors are opaque to
//! the core and only passed through.

use super::component::{ComponentKind, ComponentModel, NodeId, TypeRef};
use super::identifier::ComponentIdentifier;
use super::tree::ComponentTree;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How the runtime type of a component is determined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDefinition {
    /// Always the given type
    Fixed(TypeRef),
    /// Type named by the value of a component attribute
    FromConfigAttribute(String),
}

/// Callbacks for each [`TypeDefinition`] shape
pub trait TypeDefinitionVisitor {
    fn on_type(&mut self, type_ref: &TypeRef);
    fn on_config_attribute(&mut self, attribute_name: &str);
}

impl TypeDefinition {
    pub fn visit(&self, visitor: &mut dyn TypeDefinitionVisitor) {
        match self {
            TypeDefinition::Fixed(type_ref) => visitor.on_type(type_ref),
            TypeDefinition::FromConfigAttribute(attribute) => visitor.on_config_attribute(attribute),
        }
    }
}

/// What the object-assembly stage knows about a component identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDefinition {
    /// Process-wide registration name; set for singletons
    pub registration_name: Option<String>,
    /// Whether a top-level declaration must carry a name
    pub named: bool,
    pub type_definition: TypeDefinition,
}

impl BuildingDefinition {
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            registration_name: None,
            named: false,
            type_definition: TypeDefinition::Fixed(TypeRef::new(type_name)),
        }
    }

    pub fn named(mut self) -> Self {
        self.named = true;
        self
    }

    pub fn registered_as(mut self, registration_name: impl Into<String>) -> Self {
        self.registration_name = Some(registration_name.into());
        self
    }
}

pub trait BuildingDefinitionRegistry: Send + Sync {
    fn building_definition(&self, identifier: &ComponentIdentifier) -> Option<BuildingDefinition>;
}

/// Registry backed by a map, populated by the host up front
#[derive(Debug, Clone, Default)]
pub struct StaticBuildingDefinitionRegistry {
    definitions: HashMap<ComponentIdentifier, BuildingDefinition>,
}

impl StaticBuildingDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: ComponentIdentifier, definition: BuildingDefinition) {
        self.definitions.insert(identifier, definition);
    }

    pub fn with(mut self, identifier: ComponentIdentifier, definition: BuildingDefinition) -> Self {
        self.register(identifier, definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl BuildingDefinitionRegistry for StaticBuildingDefinitionRegistry {
    fn building_definition(&self, identifier: &ComponentIdentifier) -> Option<BuildingDefinition> {
        self.definitions.get(identifier).cloned()
    }
}

/// Looks up implementation types named in `class` attributes
pub trait TypeLoader: Send + Sync {
    fn load(&self, class_name: &str) -> Option<TypeRef>;
}

/// Type loader over a fixed set of known type names
#[derive(Debug, Clone, Default)]
pub struct KnownTypes {
    names: HashSet<String>,
}

impl KnownTypes {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl TypeLoader for KnownTypes {
    fn load(&self, class_name: &str) -> Option<TypeRef> {
        self.names
            .contains(class_name)
            .then(|| TypeRef::new(class_name))
    }
}

/// Opaque description of an extension available to the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Classifies a component into its runtime role
pub trait ComponentKindResolver: Send + Sync {
    fn resolve_kind(&self, model: &ComponentModel, extensions: &[ExtensionDescriptor]) -> ComponentKind;
}

/// Rewrites reusable module references into inlined subtrees
pub trait ModuleExpander: Send + Sync {
    fn expand(
        &self,
        tree: &mut ComponentTree,
        root: NodeId,
        extensions: &[ExtensionDescriptor],
    ) -> crate::Result<()>;
}
