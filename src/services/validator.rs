//! Structural validation of a built application model
//!
//! Rules run in a fixed order and the first violation aborts validation. Each
//! rule either scans the whole tree or only the top-level declarations.

use super::indexer::ComponentIndex;
use crate::models::{
    well_known, BuildingDefinitionRegistry, ComponentIdentifier, ComponentModel, ComponentTree, NodeId,
    ANY_ERROR_TYPE, EXCEPTION_STRATEGY_SUFFIX, EXPRESSION_PREFIX, MAX_REDELIVERY_ATTEMPTS_ATTRIBUTE,
    REFERENCE_ATTRIBUTE, SOURCE_TYPE_ATTRIBUTE, TYPE_ATTRIBUTE, WHEN_ATTRIBUTE,
};
use crate::{ModelError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, trace};

/// Characters that may not appear in a global element name
pub const RESERVED_NAME_CHARACTERS: &[char] = &['/', '\\', '[', ']', '{', '}', '#', ':'];

type RuleCheck = fn(&ModelValidator<'_>) -> Result<()>;

#[derive(Clone, Copy)]
pub struct ValidationRule {
    pub name: &'static str,
    pub description: &'static str,
    check: RuleCheck,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// The tree is validated only when its root is a full configuration document
pub fn is_configuration_document(tree: &ComponentTree, root: NodeId) -> bool {
    well_known::document_roots().contains(tree[root].identifier())
}

pub struct ModelValidator<'a> {
    tree: &'a ComponentTree,
    root: NodeId,
    index: &'a ComponentIndex,
    definitions: Option<&'a dyn BuildingDefinitionRegistry>,
    ignored_names: HashSet<ComponentIdentifier>,
    rules: Vec<ValidationRule>,
}

impl<'a> ModelValidator<'a> {
    pub fn new(
        tree: &'a ComponentTree,
        root: NodeId,
        index: &'a ComponentIndex,
        definitions: Option<&'a dyn BuildingDefinitionRegistry>,
    ) -> Self {
        Self {
            tree,
            root,
            index,
            definitions,
            ignored_names: well_known::ignored_for_name_uniqueness().into_iter().collect(),
            rules: Self::default_rules(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        crate::trace_performance!("validation", {
            for rule in &self.rules {
                trace!(rule = rule.name, "Running validation rule");
                (rule.check)(self)?;
            }
        });
        debug!(rules = self.rules.len(), "Application model passed validation");
        Ok(())
    }

    /// Run a single rule by name; unknown names are a no-op
    pub fn check(&self, rule_name: &str) -> Result<()> {
        match self.get_rule(rule_name) {
            Some(rule) => (rule.check)(self),
            None => Ok(()),
        }
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn get_rule(&self, name: &str) -> Option<&ValidationRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    fn default_rules() -> Vec<ValidationRule> {
        vec![
            ValidationRule {
                name: "singletons_are_not_repeated",
                description: "Components registered under a process-wide name appear only once",
                check: check_singletons_are_not_repeated,
            },
            ValidationRule {
                name: "names_are_not_repeated",
                description: "Global element names are unique",
                check: check_names_are_not_repeated,
            },
            ValidationRule {
                name: "names_have_valid_characters",
                description: "Global element names avoid reserved characters",
                check: check_names_have_valid_characters,
            },
            ValidationRule {
                name: "flow_refs_point_to_existing_flows",
                description: "Every flow-ref targets an existing global element",
                check: check_flow_refs_point_to_existing_flows,
            },
            ValidationRule {
                name: "error_mappings",
                description: "Catch-all error mapping is unique and last; source types do not repeat",
                check: check_error_mappings,
            },
            ValidationRule {
                name: "exception_strategy_when_attribute",
                description: "Only handlers inside an error-handler may declare 'when'",
                check: check_exception_strategy_when_attribute,
            },
            ValidationRule {
                name: "error_handler_structure",
                description: "Error handlers are either references or well-formed handler lists",
                check: check_error_handler_structure,
            },
            ValidationRule {
                name: "parameter_and_child_exclusive",
                description: "A parameter and its equivalent child element are not both present",
                check: check_parameter_and_child_exclusive,
            },
            ValidationRule {
                name: "named_top_level_elements",
                description: "Top-level elements that must be named carry a name",
                check: check_named_top_level_elements,
            },
            ValidationRule {
                name: "single_elements_per_file",
                description: "Lifecycle hooks appear at most once per file",
                check: check_single_elements_per_file,
            },
        ]
    }

    fn model(&self, id: NodeId) -> &'a ComponentModel {
        let tree: &'a ComponentTree = self.tree;
        &tree[id]
    }

    fn top_level(&self) -> impl Iterator<Item = &'a ComponentModel> + '_ {
        self.tree.children(self.root).iter().map(|id| self.model(*id))
    }

    fn all(&self) -> impl Iterator<Item = &'a ComponentModel> + '_ {
        self.tree.descendants(self.root).map(|id| self.model(id))
    }

    fn children(&self, model: &ComponentModel) -> impl Iterator<Item = &'a ComponentModel> + '_ {
        self.tree.children(model.id()).iter().map(|id| self.model(*id))
    }
}

fn check_singletons_are_not_repeated(v: &ModelValidator<'_>) -> Result<()> {
    let Some(definitions) = v.definitions else {
        return Ok(());
    };

    let mut seen: HashMap<String, &ComponentModel> = HashMap::new();
    for model in v.top_level() {
        let Some(registration_name) = definitions
            .building_definition(model.identifier())
            .and_then(|definition| definition.registration_name)
        else {
            continue;
        };

        if let Some(first) = seen.get(&registration_name) {
            let message = match (first.source_location(), model.source_location()) {
                (Some(a), Some(b)) => format!(
                    "The configuration element [{}] can only appear once, but was present in both [{}] and [{}]",
                    model.identifier(),
                    a,
                    b
                ),
                _ => format!(
                    "The configuration element [{}] can only appear once, but was present multiple times",
                    model.identifier()
                ),
            };
            return Err(ModelError::DuplicateDeclaration {
                name: registration_name,
                message,
                location: model.source_location().cloned(),
            });
        }
        seen.insert(registration_name, model);
    }
    Ok(())
}

fn check_names_are_not_repeated(v: &ModelValidator<'_>) -> Result<()> {
    let mut seen: HashMap<&str, &ComponentModel> = HashMap::new();
    for model in v.top_level() {
        if v.ignored_names.contains(model.identifier()) {
            continue;
        }
        let Some(name) = model.name_attribute() else {
            continue;
        };

        if let Some(first) = seen.insert(name, model) {
            return Err(ModelError::DuplicateDeclaration {
                name: name.to_string(),
                message: format!(
                    "Two configuration elements have been defined with the same global name. Global name [{}] must be unique. Clashing components are {} and {}",
                    name,
                    first.describe(),
                    model.describe()
                ),
                location: model.source_location().cloned(),
            });
        }
    }
    Ok(())
}

fn check_names_have_valid_characters(v: &ModelValidator<'_>) -> Result<()> {
    for model in v.top_level() {
        let Some(name) = model.name_attribute() else {
            continue;
        };
        let invalid: Vec<String> = name
            .chars()
            .filter(|c| RESERVED_NAME_CHARACTERS.contains(c))
            .map(String::from)
            .collect();
        if !invalid.is_empty() {
            return Err(ModelError::structural(
                format!(
                    "Invalid global element name '{}'. Problematic characters are {}",
                    name,
                    invalid.join(", ")
                ),
                model.source_location(),
            ));
        }
    }
    Ok(())
}

fn check_flow_refs_point_to_existing_flows(v: &ModelValidator<'_>) -> Result<()> {
    let flow_ref = well_known::flow_ref();
    for model in v.all().filter(|m| m.identifier() == &flow_ref) {
        let Some(target) = model.name_attribute() else {
            continue;
        };
        if target.starts_with(EXPRESSION_PREFIX) {
            continue;
        }
        if v.index.find_top_level_named_component(target).is_none() {
            return Err(ModelError::MalformedReference {
                target: target.to_string(),
                message: format!("flow-ref is pointing to {} which does not exist", target),
                location: model.source_location().cloned(),
            });
        }
    }
    Ok(())
}

fn is_catch_all_mapping(mapping: &ComponentModel) -> bool {
    mapping
        .parameter(SOURCE_TYPE_ATTRIBUTE)
        .map_or(true, |source| source.trim().is_empty() || source == ANY_ERROR_TYPE)
}

fn check_error_mappings(v: &ModelValidator<'_>) -> Result<()> {
    let error_mapping = well_known::error_mapping();
    for model in v.all() {
        let mappings: Vec<&ComponentModel> = v
            .children(model)
            .filter(|child| child.identifier() == &error_mapping)
            .collect();
        let Some(last) = mappings.last() else {
            continue;
        };

        let catch_all = mappings.iter().filter(|m| is_catch_all_mapping(m)).count();
        if catch_all > 1 {
            return Err(ModelError::structural(
                "Only one mapping for 'ANY' or an empty source type is allowed.",
                model.source_location(),
            ));
        }
        if catch_all == 1 && !is_catch_all_mapping(last) {
            return Err(ModelError::structural(
                "Only the last error mapping can have 'ANY' or an empty source type.",
                model.source_location(),
            ));
        }

        let mut seen = HashSet::new();
        let repeated: Vec<&str> = mappings
            .iter()
            .filter(|m| !is_catch_all_mapping(m))
            .filter_map(|m| m.parameter(SOURCE_TYPE_ATTRIBUTE))
            .filter(|source| !seen.insert(*source))
            .collect();
        if !repeated.is_empty() {
            return Err(ModelError::structural(
                format!(
                    "Repeated source types are not allowed. Offending types are '{}'.",
                    repeated.join("', '")
                ),
                model.source_location(),
            ));
        }
    }
    Ok(())
}

fn check_exception_strategy_when_attribute(v: &ModelValidator<'_>) -> Result<()> {
    let error_handler = well_known::error_handler();
    for model in v.all() {
        if !model.identifier().name().ends_with(EXCEPTION_STRATEGY_SUFFIX) || !model.has_parameter(WHEN_ATTRIBUTE) {
            continue;
        }
        let Some(parent) = model.parent() else {
            continue;
        };
        if parent != v.root && v.model(parent).identifier() != &error_handler {
            return Err(ModelError::structural(
                "Only handlers within an error-handler can have when attribute specified",
                model.source_location(),
            ));
        }
    }
    Ok(())
}

/// Follow a `core:on-error ref="..."` to the global handler it names
fn resolve_on_error<'a>(v: &ModelValidator<'a>, handler: &'a ComponentModel) -> Result<&'a ComponentModel> {
    if handler.identifier() != &well_known::on_error() {
        return Ok(handler);
    }
    let Some(reference) = handler.parameter(REFERENCE_ATTRIBUTE) else {
        return Ok(handler);
    };
    v.index
        .find_top_level_named_component(reference)
        .map(|id| v.model(id))
        .ok_or_else(|| ModelError::MalformedReference {
            target: reference.to_string(),
            message: format!("Could not find on-error reference named '{}'", reference),
            location: handler.source_location().cloned(),
        })
}

fn check_error_handler_structure(v: &ModelValidator<'_>) -> Result<()> {
    let error_handler = well_known::error_handler();
    for model in v.all().filter(|m| m.identifier() == &error_handler) {
        let handlers: Vec<&ComponentModel> = v.children(model).collect();

        if model.has_parameter(REFERENCE_ATTRIBUTE) && !handlers.is_empty() {
            return Err(ModelError::structural(
                "A reference error-handler cannot have on-errors.",
                model.source_location(),
            ));
        }

        if let Some((_, leading)) = handlers.split_last() {
            for &handler in leading {
                let handler = resolve_on_error(v, handler)?;
                if !handler.has_parameter(WHEN_ATTRIBUTE) && !handler.has_parameter(TYPE_ATTRIBUTE) {
                    return Err(ModelError::structural(
                        "Every handler (except for the last one) within an 'error-handler' must specify a 'when' or 'type' attribute.",
                        handler.source_location().or(model.source_location()),
                    ));
                }
            }
        }

        let redelivering = handlers
            .iter()
            .filter(|h| h.has_parameter(MAX_REDELIVERY_ATTEMPTS_ATTRIBUTE))
            .count();
        if redelivering > 1 {
            return Err(ModelError::structural(
                "Only one on-error-propagate within a error-handler can handle message redelivery. Remove one of the maxRedeliveryAttempts attributes",
                model.source_location(),
            ));
        }
    }
    Ok(())
}

fn check_parameter_and_child_exclusive(v: &ModelValidator<'_>) -> Result<()> {
    for model in v.all() {
        if model.inner_components().is_empty() {
            continue;
        }
        for (parameter, _) in model.parameters().filter(|(name, _)| !model.is_parameter_from_schema(name)) {
            let candidates = [hyphenize(&pluralize(parameter)), hyphenize(parameter)];
            if let Some(child) = v
                .children(model)
                .find(|child| candidates.iter().any(|c| c == child.identifier().name()))
            {
                return Err(ModelError::structural(
                    format!(
                        "Component {} has a child element {} which is used for the same purpose of the configuration parameter {}. Only one must be used.",
                        model.identifier(),
                        child.identifier().name(),
                        parameter
                    ),
                    model.source_location(),
                ));
            }
        }
    }
    Ok(())
}

fn check_named_top_level_elements(v: &ModelValidator<'_>) -> Result<()> {
    let Some(definitions) = v.definitions else {
        return Ok(());
    };
    for model in v.top_level() {
        let named = definitions
            .building_definition(model.identifier())
            .is_some_and(|definition| definition.named);
        if named && model.name_attribute().map_or(true, |name| name.trim().is_empty()) {
            return Err(ModelError::structural(
                format!("Global element {} does not provide a name attribute.", model.identifier()),
                model.source_location(),
            ));
        }
    }
    Ok(())
}

fn check_single_elements_per_file(v: &ModelValidator<'_>) -> Result<()> {
    let single = well_known::single_per_file();
    let mut seen: HashMap<(&ComponentIdentifier, Option<&str>), &ComponentModel> = HashMap::new();
    for model in v.all().filter(|m| single.contains(m.identifier())) {
        let file = model.config_file_name();
        let Some(first) = seen.insert((model.identifier(), file), model) else {
            continue;
        };
        let lines = match (first.source_location(), model.source_location()) {
            (Some(a), Some(b)) => format!(" (lines {} and {})", a.line, b.line),
            _ => String::new(),
        };
        return Err(ModelError::DuplicateDeclaration {
            name: model.identifier().to_string(),
            message: format!(
                "The configuration element [{}] can only appear once per file, but was present multiple times in [{}]{}",
                model.identifier(),
                file.unwrap_or("unknown"),
                lines
            ),
            location: model.source_location().cloned(),
        });
    }
    Ok(())
}

/// `maxRetries` -> `max-retries`
fn hyphenize(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for c in name.chars() {
        if c.is_uppercase() {
            if previous.is_some_and(|p| p != '-' && !p.is_uppercase()) {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
        previous = Some(c);
    }
    result
}

fn pluralize(word: &str) -> String {
    const SIBILANT: &[&str] = &["s", "x", "z", "ch", "sh"];
    if SIBILANT.iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{}es", word);
    }
    let mut chars = word.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{}s", word)
}
