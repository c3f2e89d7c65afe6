//! Conversion of raw line records into the component tree
//!
//! The first file's document root becomes the tree root; roots of later files
//! are merged into it so split configurations form one logical application.
//! Global elements of a declarative object graph are appended after file content.

use crate::models::{
    well_known, ArtifactDeclaration, ComponentModel, ComponentTree, ConfigFile, ConfigLine,
    ElementDeclaration, NodeId, SourceLocation,
};
use crate::properties::PropertyResolver;
use crate::{ModelError, Result};
use tracing::{debug, warn};

/// Options controlling how attribute values are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// When false, values filled in from schema defaults are kept verbatim
    pub resolve_schema_defaults: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            resolve_schema_defaults: true,
        }
    }
}

/// Reads line records, resolving placeholders as values are read
pub struct ComponentModelReader<'a> {
    resolver: &'a PropertyResolver,
    options: ReaderOptions,
}

impl<'a> ComponentModelReader<'a> {
    pub fn new(resolver: &'a PropertyResolver, options: ReaderOptions) -> Self {
        Self { resolver, options }
    }

    /// Read a document root and its whole subtree into `tree`
    pub fn read_document(&self, tree: &mut ComponentTree, line: &ConfigLine, file_name: &str) -> Result<NodeId> {
        self.read_line(tree, line, file_name, 0)
    }

    fn read_line(&self, tree: &mut ComponentTree, line: &ConfigLine, file_name: &str, depth: usize) -> Result<NodeId> {
        let location = SourceLocation::new(file_name, line.line_number);
        let mut model = ComponentModel::new(line.component_identifier()).with_location(location.clone());
        if depth == 1 {
            model = model.mark_as_root();
        }

        for (name, attribute) in &line.attributes {
            let value = if attribute.from_schema && !self.options.resolve_schema_defaults {
                attribute.value.clone()
            } else {
                self.resolve(&attribute.value, &location)?
            };
            model.add_parameter(name.as_str(), value, attribute.from_schema);
        }

        if let Some(text) = &line.text_content {
            model = model.with_text_content(self.resolve(text, &location)?);
        }

        let id = tree.insert(model);
        for child in &line.children {
            let child_id = self.read_line(tree, child, file_name, depth + 1)?;
            tree.append_child(id, child_id);
        }
        Ok(id)
    }

    fn resolve(&self, raw: &str, location: &SourceLocation) -> Result<String> {
        self.resolver
            .resolve_value(raw)
            .map_err(|e| ModelError::unresolved(e, Some(location)))
    }
}

/// Accumulates documents into one tree with a single root
#[derive(Debug, Default)]
pub struct ComponentTreeBuilder {
    tree: ComponentTree,
    root: Option<NodeId>,
}

impl ComponentTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_config_file(&mut self, reader: &ComponentModelReader<'_>, config_file: &ConfigFile) -> Result<()> {
        let Some(root_line) = config_file.root_line() else {
            warn!(file = %config_file.file_name, "Configuration file has no content, skipping");
            return Ok(());
        };

        let document = reader.read_document(&mut self.tree, root_line, &config_file.file_name)?;
        debug!(
            file = %config_file.file_name,
            children = self.tree.children(document).len(),
            "Read configuration file"
        );

        match self.root {
            None => self.root = Some(document),
            Some(root) => self.merge_into_root(root, document),
        }
        Ok(())
    }

    /// Move `other`'s children under `root`; root parameters are first-wins
    fn merge_into_root(&mut self, root: NodeId, other: NodeId) {
        if self.tree[root].identifier() != self.tree[other].identifier() {
            warn!(
                root = %self.tree[root].identifier(),
                merged = %self.tree[other].identifier(),
                "Merging documents with different root elements"
            );
        }

        let inherited: Vec<_> = self.tree[other]
            .parameters()
            .filter(|(name, _)| !self.tree[root].has_parameter(name))
            .map(|(name, parameter)| (name.to_string(), parameter.clone()))
            .collect();
        for (name, parameter) in inherited {
            self.tree[root].add_parameter(name, parameter.value, parameter.from_schema);
        }

        let children = self.tree.children(other).to_vec();
        for child in children {
            self.tree.append_child(root, child);
        }
    }

    /// Append the global elements of a declaration as top-level components
    pub fn add_declaration(&mut self, declaration: &ArtifactDeclaration) {
        if declaration.global_elements.is_empty() {
            return;
        }

        let root = match self.root {
            Some(root) => root,
            None => {
                let root = self
                    .tree
                    .insert(ComponentModel::new(well_known::declaration_root()));
                self.root = Some(root);
                root
            }
        };

        for element in &declaration.global_elements {
            let id = self.convert_element(element, true);
            self.tree.append_child(root, id);
        }
        debug!(count = declaration.global_elements.len(), "Converted declared global elements");
    }

    fn convert_element(&mut self, element: &ElementDeclaration, is_root: bool) -> NodeId {
        let mut model = ComponentModel::new(element.identifier.clone());
        if is_root {
            model = model.mark_as_root();
        }
        for (name, value) in &element.parameters {
            model.add_parameter(name.as_str(), value.as_str(), false);
        }
        if let Some(value) = &element.value {
            model = model.with_text_content(value.as_str());
        }

        let id = self.tree.insert(model);
        for nested in &element.nested {
            let child = self.convert_element(nested, false);
            self.tree.append_child(id, child);
        }
        id
    }

    pub fn finish(self) -> (ComponentTree, Option<NodeId>) {
        (self.tree, self.root)
    }
}
