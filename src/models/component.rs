//! Component model nodes
//!
//! A [`ComponentModel`] is one declaration of the configuration tree. Nodes live
//! in a [`ComponentTree`](super::tree::ComponentTree) arena and refer to their
//! children and parent by [`NodeId`].

use super::identifier::{ComponentIdentifier, NAME_ATTRIBUTE};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of a node inside its tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// File and line a declaration was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file_name: String,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file_name: impl Into<String>, line: usize) -> Self {
        Self {
            file_name: file_name.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name, self.line)
    }
}

/// Role of a component in the runtime, assigned after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComponentKind {
    #[default]
    Unknown,
    Flow,
    Source,
    Operation,
    Router,
    Route,
    Scope,
    Chain,
    ErrorHandler,
    OnError,
}

/// Reference to the runtime type a component will be assembled into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parameter value and whether it came from a schema default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub value: String,
    #[serde(default)]
    pub from_schema: bool,
}

/// One node of the configuration tree
#[derive(Debug, Clone, Serialize)]
pub struct ComponentModel {
    pub(crate) id: NodeId,
    identifier: ComponentIdentifier,
    parameters: IndexMap<String, Parameter>,
    text_content: Option<String>,
    pub(crate) inner_components: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    is_root: bool,
    source_location: Option<SourceLocation>,
    resolved_kind: ComponentKind,
    type_ref: Option<TypeRef>,
}

impl ComponentModel {
    /// Create a detached node; it gets its id when inserted into a tree
    pub fn new(identifier: ComponentIdentifier) -> Self {
        Self {
            id: NodeId(usize::MAX),
            identifier,
            parameters: IndexMap::new(),
            text_content: None,
            inner_components: Vec::new(),
            parent: None,
            is_root: false,
            source_location: None,
            resolved_kind: ComponentKind::Unknown,
            type_ref: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value, false);
        self
    }

    pub fn with_schema_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value, true);
        self
    }

    pub fn with_text_content(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.source_location = Some(location);
        self
    }

    pub fn mark_as_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>, from_schema: bool) {
        self.parameters.insert(
            name.into(),
            Parameter {
                value: value.into(),
                from_schema,
            },
        );
    }

    /// Overwrite (or add) a parameter as if it were explicitly declared
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.add_parameter(name, value, false);
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identifier(&self) -> &ComponentIdentifier {
        &self.identifier
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(|p| p.value.as_str())
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_parameter_from_schema(&self, name: &str) -> bool {
        self.parameters.get(name).map(|p| p.from_schema).unwrap_or(false)
    }

    /// Value of the `name` parameter, if declared
    pub fn name_attribute(&self) -> Option<&str> {
        self.parameter(NAME_ATTRIBUTE)
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text_content.as_deref()
    }

    pub fn inner_components(&self) -> &[NodeId] {
        &self.inner_components
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn source_location(&self) -> Option<&SourceLocation> {
        self.source_location.as_ref()
    }

    pub fn config_file_name(&self) -> Option<&str> {
        self.source_location.as_ref().map(|l| l.file_name.as_str())
    }

    pub fn line_number(&self) -> Option<usize> {
        self.source_location.as_ref().map(|l| l.line)
    }

    pub fn resolved_kind(&self) -> ComponentKind {
        self.resolved_kind
    }

    pub fn set_resolved_kind(&mut self, kind: ComponentKind) {
        self.resolved_kind = kind;
    }

    pub fn type_ref(&self) -> Option<&TypeRef> {
        self.type_ref.as_ref()
    }

    pub fn set_type(&mut self, type_ref: TypeRef) {
        self.type_ref = Some(type_ref);
    }

    /// Identifier plus location, for diagnostics
    pub fn describe(&self) -> String {
        match &self.source_location {
            Some(location) => format!("{} ({})", self.identifier, location),
            None => self.identifier.to_string(),
        }
    }
}
