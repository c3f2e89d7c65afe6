//! Contract tests for structural validation of built models

use crate::common::*;
use appmodel::models::{
    well_known, BuildingDefinition, BuildingDefinitionRegistry, ComponentIdentifier,
};
use appmodel::services::{ModelValidator, RESERVED_NAME_CHARACTERS};
use appmodel::{ConfigLine, ErrorKind, ModelError};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Registry {}

    impl BuildingDefinitionRegistry for Registry {
        fn building_definition(&self, identifier: &ComponentIdentifier) -> Option<BuildingDefinition>;
    }
}

fn error_mapping(source_type: Option<&str>, target: &str) -> ConfigLine {
    let mapping = ConfigLine::core("error-mapping").attr("targetType", target);
    match source_type {
        Some(source) => mapping.attr("sourceType", source),
        None => mapping,
    }
}

fn request_with_mappings(mappings: Vec<ConfigLine>) -> ConfigLine {
    let request = ConfigLine::new("http", "request").attr("url", "http://localhost").line(3);
    let main = mappings
        .into_iter()
        .fold(request, |request, mapping| request.child(mapping));
    flow("main").line(2).child(main)
}

fn build(children: Vec<ConfigLine>) -> appmodel::Result<appmodel::ApplicationModel> {
    builder().with_config_file(application("app.xml", children)).build()
}

#[test]
fn test_default_rules_run_in_order() {
    let model = build(vec![flow("main")]).unwrap();
    let root = model.root_id().unwrap();
    let validator = ModelValidator::new(model.tree(), root, model.index(), None);

    let names: Vec<&str> = validator.rules().iter().map(|r| r.name).collect();
    assert_eq!(names.len(), 10);
    assert_eq!(names.first(), Some(&"singletons_are_not_repeated"));
    assert_eq!(names.last(), Some(&"single_elements_per_file"));
    assert!(validator.get_rule("flow_refs_point_to_existing_flows").is_some());
    validator.check("names_are_not_repeated").unwrap();
}

#[test]
fn test_first_violation_aborts_validation() {
    let err = build(vec![
        flow("main"),
        flow("main"),
        flow("other").child(flow_ref("nowhere")),
    ])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
}

#[test]
fn test_catch_all_mapping_must_be_last() {
    let err = build(vec![request_with_mappings(vec![
        error_mapping(Some("ANY"), "APP:ANY"),
        error_mapping(Some("HTTP:TIMEOUT"), "APP:TIMEOUT"),
    ])])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(err
        .to_string()
        .contains("Only the last error mapping can have 'ANY' or an empty source type."));
    assert!(err.to_string().contains("app.xml:3"));

    build(vec![request_with_mappings(vec![
        error_mapping(Some("HTTP:TIMEOUT"), "APP:TIMEOUT"),
        error_mapping(None, "APP:ANY"),
    ])])
    .unwrap();
}

#[test]
fn test_single_catch_all_and_no_repeated_sources() {
    let err = build(vec![request_with_mappings(vec![
        error_mapping(None, "APP:A"),
        error_mapping(Some("ANY"), "APP:B"),
    ])])
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("Only one mapping for 'ANY' or an empty source type is allowed."));

    let err = build(vec![request_with_mappings(vec![
        error_mapping(Some("HTTP:TIMEOUT"), "APP:A"),
        error_mapping(Some("HTTP:TIMEOUT"), "APP:B"),
    ])])
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("Repeated source types are not allowed. Offending types are 'HTTP:TIMEOUT'."));
}

#[test]
fn test_flow_ref_must_target_existing_element() {
    let err = build(vec![flow("main").child(flow_ref("billing").line(4))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedReference);
    match &err {
        ModelError::MalformedReference { target, location, .. } => {
            assert_eq!(target, "billing");
            assert_eq!(location.as_ref().map(|l| l.line), Some(4));
        }
        other => panic!("Unexpected error: {:?}", other),
    }
    assert!(err
        .to_string()
        .contains("flow-ref is pointing to billing which does not exist"));

    build(vec![
        flow("main").child(flow_ref("billing")),
        ConfigLine::core("sub-flow").attr("name", "billing"),
    ])
    .unwrap();
}

#[test]
fn test_flow_ref_expressions_are_not_checked() {
    build(vec![flow("main").child(flow_ref("#[vars.target]"))]).unwrap();
}

#[test]
fn test_parameter_and_child_are_exclusive() {
    let request = ConfigLine::new("http", "request")
        .attr("retryCount", "3")
        .child(ConfigLine::new("http", "retry-count").text("5"));
    let err = build(vec![flow("main").child(request)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(err.to_string().contains(
        "Component http:request has a child element retry-count which is used for the same purpose of the configuration parameter retryCount"
    ));

    let headers = ConfigLine::new("http", "request")
        .attr("header", "x")
        .child(ConfigLine::new("http", "headers"));
    let err = build(vec![flow("main").child(headers)]).unwrap_err();
    assert!(err.to_string().contains("child element headers"));
}

#[test]
fn test_reserved_characters_in_names() {
    for reserved in RESERVED_NAME_CHARACTERS {
        let name = format!("bad{}name", reserved);
        let err = build(vec![flow(&name)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation, "{}", name);
        assert!(err.to_string().contains("Invalid global element name"));
    }
    build(vec![flow("good-name_1.v2")]).unwrap();
}

#[test]
fn test_when_attribute_outside_error_handler() {
    let strategy = ConfigLine::core("catch-exception-strategy").attr("when", "#[true]");
    let err = build(vec![flow("main").child(strategy.clone())]).unwrap_err();
    assert!(err
        .to_string()
        .contains("Only handlers within an error-handler can have when attribute specified"));

    let handler = ConfigLine::core("error-handler")
        .child(strategy)
        .child(ConfigLine::core("on-error-propagate"));
    build(vec![flow("main").child(handler)]).unwrap();
}

#[test]
fn test_error_handler_structure() {
    let reference = ConfigLine::core("error-handler")
        .attr("ref", "shared")
        .child(ConfigLine::core("on-error-continue"));
    let err = build(vec![flow("main").child(reference)]).unwrap_err();
    assert!(err
        .to_string()
        .contains("A reference error-handler cannot have on-errors."));

    let unguarded = ConfigLine::core("error-handler")
        .child(ConfigLine::core("on-error-continue"))
        .child(ConfigLine::core("on-error-propagate"));
    let err = build(vec![flow("main").child(unguarded)]).unwrap_err();
    assert!(err
        .to_string()
        .contains("Every handler (except for the last one) within an 'error-handler' must specify a 'when' or 'type' attribute."));

    let redelivering = ConfigLine::core("error-handler")
        .child(
            ConfigLine::core("on-error-propagate")
                .attr("type", "HTTP:CONNECTIVITY")
                .attr("maxRedeliveryAttempts", "3"),
        )
        .child(ConfigLine::core("on-error-propagate").attr("maxRedeliveryAttempts", "5"));
    let err = build(vec![flow("main").child(redelivering)]).unwrap_err();
    assert!(err.to_string().contains("Only one on-error-propagate"));
}

#[test]
fn test_on_error_references_resolve_to_global_handlers() {
    let shared = ConfigLine::core("on-error-continue")
        .attr("name", "shared")
        .attr("type", "ANY");
    let handler = ConfigLine::core("error-handler")
        .child(ConfigLine::core("on-error").attr("ref", "shared"))
        .child(ConfigLine::core("on-error-propagate"));
    build(vec![shared, flow("main").child(handler)]).unwrap();

    let dangling = ConfigLine::core("error-handler")
        .child(ConfigLine::core("on-error").attr("ref", "missing"))
        .child(ConfigLine::core("on-error-propagate"));
    let err = build(vec![flow("main").child(dangling)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedReference);
    assert!(err
        .to_string()
        .contains("Could not find on-error reference named 'missing'"));
}

#[test]
fn test_lifecycle_hooks_once_per_file() {
    let hook = || ConfigLine::new("test", "before-suite");

    let err = build(vec![hook(), hook()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert!(err.to_string().contains("can only appear once per file"));

    builder()
        .with_config_file(application("a.xml", vec![hook()]))
        .with_config_file(application("b.xml", vec![hook()]))
        .build()
        .unwrap();
}

#[test]
fn test_singletons_use_registration_names() {
    let mut registry = MockRegistry::new();
    registry
        .expect_building_definition()
        .returning(|identifier| {
            (identifier == &ComponentIdentifier::core("configuration"))
                .then(|| BuildingDefinition::of_type("Configuration").registered_as("_appConfiguration"))
        });
    let registry: Arc<dyn BuildingDefinitionRegistry> = Arc::new(registry);

    let err = builder()
        .with_config_file(application("a.xml", vec![ConfigLine::core("configuration").line(2)]))
        .with_config_file(application("b.xml", vec![ConfigLine::core("configuration").line(2)]))
        .with_building_definitions(registry.clone())
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    assert!(err
        .to_string()
        .contains("The configuration element [core:configuration] can only appear once"));

    let model = builder()
        .with_config_file(application("a.xml", vec![ConfigLine::core("configuration")]))
        .with_building_definitions(registry)
        .build()
        .unwrap();
    let configuration = model
        .find_component_definition(&ComponentIdentifier::core("configuration"))
        .unwrap();
    assert_eq!(configuration.name_attribute(), Some("_appConfiguration"));
    assert!(model.find_top_level_named_component("_appConfiguration").is_some());
}

#[test]
fn test_named_definitions_require_names() {
    let mut registry = MockRegistry::new();
    registry
        .expect_building_definition()
        .returning(|identifier| {
            (identifier == &well_known::flow()).then(|| BuildingDefinition::of_type("Flow").named())
        });

    let err = builder()
        .with_config_file(application("app.xml", vec![ConfigLine::core("flow").line(2)]))
        .with_building_definitions(Arc::new(registry))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(err
        .to_string()
        .contains("Global element core:flow does not provide a name attribute."));
}

#[test]
fn test_three_mappings_with_catch_all_first_or_last() {
    let err = build(vec![request_with_mappings(vec![
        error_mapping(None, "APP:ANY"),
        error_mapping(Some("HTTP:TIMEOUT"), "APP:TIMEOUT"),
        error_mapping(Some("HTTP:CONNECTIVITY"), "APP:CONNECTIVITY"),
    ])])
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);

    build(vec![request_with_mappings(vec![
        error_mapping(Some("HTTP:TIMEOUT"), "APP:TIMEOUT"),
        error_mapping(Some("HTTP:CONNECTIVITY"), "APP:CONNECTIVITY"),
        error_mapping(None, "APP:ANY"),
    ])])
    .unwrap();
}

#[test]
fn test_flow_ref_to_nonexistent_flow_cites_name() {
    let err = build(vec![flow("main").child(flow_ref("nonexistent-flow"))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedReference);
    assert!(err.to_string().contains("nonexistent-flow"));
}
