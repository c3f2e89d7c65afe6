//! Raw input records
//!
//! Parsing configuration text is done upstream; the builder consumes the
//! resulting per-file line records and, optionally, a declarative object graph.

use super::identifier::{ComponentIdentifier, CORE_NAMESPACE};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One configuration file: its name and its top-level line records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub file_name: String,
    pub config_lines: Vec<ConfigLine>,
}

impl ConfigFile {
    pub fn new(file_name: impl Into<String>, root: ConfigLine) -> Self {
        Self {
            file_name: file_name.into(),
            config_lines: vec![root],
        }
    }

    /// The document root record, if the file has any content
    pub fn root_line(&self) -> Option<&ConfigLine> {
        self.config_lines.first()
    }
}

/// A raw attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAttribute")]
pub struct ConfigAttribute {
    pub value: String,
    /// True when the value was filled in from a schema default
    pub from_schema: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAttribute {
    Plain(String),
    Detailed {
        value: String,
        #[serde(default)]
        from_schema: bool,
    },
}

impl From<RawAttribute> for ConfigAttribute {
    fn from(raw: RawAttribute) -> Self {
        match raw {
            RawAttribute::Plain(value) => ConfigAttribute {
                value,
                from_schema: false,
            },
            RawAttribute::Detailed { value, from_schema } => ConfigAttribute { value, from_schema },
        }
    }
}

fn default_namespace() -> String {
    CORE_NAMESPACE.to_string()
}

/// One element record as produced by the upstream parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLine {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub identifier: String,
    #[serde(default)]
    pub attributes: IndexMap<String, ConfigAttribute>,
    #[serde(default)]
    pub children: Vec<ConfigLine>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub line_number: usize,
}

impl ConfigLine {
    pub fn new(namespace: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            identifier: identifier.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            text_content: None,
            line_number: 0,
        }
    }

    pub fn core(identifier: impl Into<String>) -> Self {
        Self::new(CORE_NAMESPACE, identifier)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(
            name.into(),
            ConfigAttribute {
                value: value.into(),
                from_schema: false,
            },
        );
        self
    }

    pub fn schema_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(
            name.into(),
            ConfigAttribute {
                value: value.into(),
                from_schema: true,
            },
        );
        self
    }

    pub fn child(mut self, child: ConfigLine) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn line(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn component_identifier(&self) -> ComponentIdentifier {
        ComponentIdentifier::new(self.namespace.clone(), self.identifier.clone())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|a| a.value.as_str())
    }
}

/// Declarative object graph, the alternate input channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactDeclaration {
    #[serde(default)]
    pub global_elements: Vec<ElementDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDeclaration {
    pub identifier: ComponentIdentifier,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    #[serde(default)]
    pub nested: Vec<ElementDeclaration>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ElementDeclaration {
    pub fn new(identifier: ComponentIdentifier) -> Self {
        Self {
            identifier,
            parameters: IndexMap::new(),
            nested: Vec::new(),
            value: None,
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn nest(mut self, child: ElementDeclaration) -> Self {
        self.nested.push(child);
        self
    }
}
