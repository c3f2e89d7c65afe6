//! Component identifiers and the well-known identifiers of the core language

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace prefix of the core configuration language
pub const CORE_NAMESPACE: &str = "core";
/// Namespace of test-suite lifecycle elements
pub const TEST_NAMESPACE: &str = "test";

pub const NAME_ATTRIBUTE: &str = "name";
pub const REFERENCE_ATTRIBUTE: &str = "ref";
pub const VALUE_ATTRIBUTE: &str = "value";
pub const CLASS_ATTRIBUTE: &str = "class";
pub const WHEN_ATTRIBUTE: &str = "when";
pub const TYPE_ATTRIBUTE: &str = "type";
pub const SOURCE_TYPE_ATTRIBUTE: &str = "sourceType";
pub const MAX_REDELIVERY_ATTEMPTS_ATTRIBUTE: &str = "maxRedeliveryAttempts";

pub const EXCEPTION_STRATEGY_SUFFIX: &str = "exception-strategy";
/// Source type of an error mapping that matches any error
pub const ANY_ERROR_TYPE: &str = "ANY";
/// Prefix of a runtime expression, e.g. `#[vars.target]`
pub const EXPRESSION_PREFIX: &str = "#[";

/// Immutable (namespace, name) pair tagging a component kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentIdentifier {
    namespace: String,
    name: String,
}

impl ComponentIdentifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identifier in the core namespace
    pub fn core(name: impl Into<String>) -> Self {
        Self::new(CORE_NAMESPACE, name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_core(&self, name: &str) -> bool {
        self.namespace == CORE_NAMESPACE && self.name == name
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Text that is not `namespace:name` or a bare `name`
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid component identifier: {0}")]
pub struct InvalidIdentifier(pub String);

impl FromStr for ComponentIdentifier {
    type Err = InvalidIdentifier;

    /// Parses `namespace:name`; a bare `name` lands in the core namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            None if !s.is_empty() => Ok(Self::core(s)),
            _ => Err(InvalidIdentifier(s.to_string())),
        }
    }
}

/// Identifiers the builder and validator give special meaning to
pub mod well_known {
    use super::{ComponentIdentifier, CORE_NAMESPACE, TEST_NAMESPACE};

    pub fn application() -> ComponentIdentifier {
        ComponentIdentifier::core("application")
    }

    pub fn domain() -> ComponentIdentifier {
        ComponentIdentifier::core("domain")
    }

    /// Synthetic root holding global elements that came from a declaration
    pub fn declaration_root() -> ComponentIdentifier {
        ComponentIdentifier::core("declaration")
    }

    pub fn flow() -> ComponentIdentifier {
        ComponentIdentifier::core("flow")
    }

    pub fn sub_flow() -> ComponentIdentifier {
        ComponentIdentifier::core("sub-flow")
    }

    pub fn flow_ref() -> ComponentIdentifier {
        ComponentIdentifier::core("flow-ref")
    }

    pub fn error_handler() -> ComponentIdentifier {
        ComponentIdentifier::core("error-handler")
    }

    pub fn on_error() -> ComponentIdentifier {
        ComponentIdentifier::core("on-error")
    }

    pub fn on_error_continue() -> ComponentIdentifier {
        ComponentIdentifier::core("on-error-continue")
    }

    pub fn on_error_propagate() -> ComponentIdentifier {
        ComponentIdentifier::core("on-error-propagate")
    }

    pub fn error_mapping() -> ComponentIdentifier {
        ComponentIdentifier::core("error-mapping")
    }

    pub fn redelivery_policy() -> ComponentIdentifier {
        ComponentIdentifier::core("redelivery-policy")
    }

    pub fn global_property() -> ComponentIdentifier {
        ComponentIdentifier::core("global-property")
    }

    pub fn configuration_properties() -> ComponentIdentifier {
        ComponentIdentifier::core("configuration-properties")
    }

    /// Document roots that carry full configuration semantics
    pub fn document_roots() -> [ComponentIdentifier; 2] {
        [application(), domain()]
    }

    /// Lifecycle hooks that may appear at most once per file
    pub fn single_per_file() -> [ComponentIdentifier; 4] {
        [
            ComponentIdentifier::new(TEST_NAMESPACE, "before-suite"),
            ComponentIdentifier::new(TEST_NAMESPACE, "after-suite"),
            ComponentIdentifier::new(TEST_NAMESPACE, "before-test"),
            ComponentIdentifier::new(TEST_NAMESPACE, "after-test"),
        ]
    }

    /// Legacy elements whose `name` attribute has no global meaning
    pub fn ignored_for_name_uniqueness() -> Vec<ComponentIdentifier> {
        const CORE: &[&str] = &[
            "flow-ref",
            "alias",
            "password-encryption-strategy",
            "custom-security-provider",
            "custom-encryption-strategy",
            "secret-key-encryption-strategy",
            "import",
            "string-to-byte-array-transformer",
            "append-string-transformer",
            "security-manager",
        ];
        const OTHERS: &[(&str, &str)] = &[
            ("test", "queue"),
            ("test", "invocation-counter"),
            ("ss", "user"),
            ("core-ss", "delegate-security-provider"),
            ("core-ss", "security-manager"),
            ("xml", "xslt-transformer"),
            ("xml", "alias"),
            ("pgp", "security-provider"),
            ("pgp", "keybased-encryption-strategy"),
            ("xsl", "param"),
            ("xsl", "attribute"),
            ("xsl", "element"),
            ("transports", "inbound-endpoint"),
            ("transports", "outbound-endpoint"),
            ("jms", "inbound-endpoint"),
            ("vm", "inbound-endpoint"),
            ("http-transport", "inbound-endpoint"),
            ("http-transport", "set-cookie"),
            ("http-transport", "header"),
            ("batch", "step"),
            ("batch", "execute"),
            ("weave", "reader-property"),
        ];

        CORE.iter()
            .map(|name| ComponentIdentifier::new(CORE_NAMESPACE, *name))
            .chain(
                OTHERS
                    .iter()
                    .map(|(namespace, name)| ComponentIdentifier::new(*namespace, *name)),
            )
            .collect()
    }
}
