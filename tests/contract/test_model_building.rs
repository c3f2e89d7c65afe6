//! Contract tests for assembling the merged component tree

use crate::common::*;
use appmodel::models::{
    well_known, ArtifactDeclaration, ComponentIdentifier, ComponentKind, ComponentModel, ComponentTree,
    ElementDeclaration, ExtensionDescriptor, ModuleExpander, NodeId,
};
use appmodel::{ConfigLine, ErrorKind, ModelError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn top_level_names(model: &appmodel::ApplicationModel) -> Vec<String> {
    model
        .top_level_components()
        .filter_map(|c| c.name_attribute())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_files_merge_in_input_order() {
    let model = builder()
        .with_config_file(application("a.xml", vec![flow("a1").line(2), flow("a2").line(3)]))
        .with_config_file(application("b.xml", vec![flow("b1").line(2)]))
        .build()
        .unwrap();

    assert_eq!(top_level_names(&model), vec!["a1", "a2", "b1"]);
    let b1 = model.find_top_level_named_component("b1").unwrap();
    assert_eq!(b1.config_file_name(), Some("b.xml"));
    assert!(b1.is_root());
}

#[test]
fn test_root_only_file_merges_with_populated_file() {
    let model = builder()
        .with_config_file(application("a.xml", vec![]))
        .with_config_file(application("b.xml", vec![flow("b1"), flow("b2")]))
        .build()
        .unwrap();

    assert_eq!(top_level_names(&model), vec!["b1", "b2"]);
    let root = model.root_id().unwrap();
    for id in model.top_level_ids() {
        assert_eq!(model.tree().parent(id), Some(root));
    }
}

#[test]
fn test_root_parameters_keep_first_value() {
    let first = appmodel::ConfigFile::new(
        "a.xml",
        ConfigLine::core("application").attr("defaultErrorHandler", "first").line(1),
    );
    let second = appmodel::ConfigFile::new(
        "b.xml",
        ConfigLine::core("application")
            .attr("defaultErrorHandler", "second")
            .attr("version", "2")
            .line(1),
    );

    let model = builder()
        .with_config_files(vec![first, second])
        .build()
        .unwrap();
    let root = model.root().unwrap();
    assert_eq!(root.parameter("defaultErrorHandler"), Some("first"));
    assert_eq!(root.parameter("version"), Some("2"));
}

#[test]
fn test_duplicate_names_across_files_are_rejected() {
    let err = builder()
        .with_config_file(application("a.xml", vec![flow("main").line(2)]))
        .with_config_file(application("b.xml", vec![flow("main").line(5)]))
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateDeclaration);
    let message = err.to_string();
    assert!(message.contains("Global name [main] must be unique"));
    assert!(message.contains("a.xml:2"));
    assert!(message.contains("b.xml:5"));
}

#[test]
fn test_declaration_elements_follow_file_content() {
    let declaration = ArtifactDeclaration {
        global_elements: vec![ElementDeclaration::new(ComponentIdentifier::new("http", "listener-config"))
            .parameter("name", "declared")
            .nest(ElementDeclaration::new(ComponentIdentifier::new("http", "connection")).parameter("port", "8081"))],
    };

    let model = builder()
        .with_config_file(application("app.xml", vec![flow("main").line(2)]))
        .with_declaration(declaration)
        .build()
        .unwrap();

    assert_eq!(top_level_names(&model), vec!["main", "declared"]);
    let declared = model.find_top_level_named_component("declared").unwrap();
    assert!(declared.is_root());
    assert_eq!(declared.inner_components().len(), 1);
    assert_eq!(model.component(declared.inner_components()[0]).parameter("port"), Some("8081"));
}

#[test]
fn test_declaration_only_model_skips_validation() {
    let declaration = ArtifactDeclaration {
        global_elements: vec![
            ElementDeclaration::new(well_known::flow()).parameter("name", "twice"),
            ElementDeclaration::new(well_known::flow()).parameter("name", "twice"),
        ],
    };

    let model = builder().with_declaration(declaration).build().unwrap();
    assert_eq!(model.root().unwrap().identifier(), &well_known::declaration_root());
    assert!(!model.is_configuration_document());
    assert_eq!(model.top_level_ids().count(), 2);
}

#[test]
fn test_fragment_documents_are_not_validated() {
    let model = builder()
        .with_config_file(document(
            "fragment.xml",
            "config",
            vec![flow("dup").line(2), flow("dup").line(3), flow_ref("nowhere").line(4)],
        ))
        .build()
        .unwrap();

    assert!(!model.is_configuration_document());
    assert_eq!(model.top_level_ids().count(), 3);
}

#[test]
fn test_source_redelivery_policy_moves_to_flow() {
    let source = ConfigLine::new("http", "listener")
        .attr("path", "/orders")
        .child(ConfigLine::core("redelivery-policy").attr("maxRedeliveryCount", "3"));
    let main = flow("main").child(source).child(logger("received"));

    let model = builder()
        .with_config_file(application("app.xml", vec![main]))
        .build()
        .unwrap();

    let flow = model.find_top_level_named_component("main").unwrap();
    let children: Vec<&ComponentIdentifier> = flow
        .inner_components()
        .iter()
        .map(|id| model.component(*id).identifier())
        .collect();
    assert_eq!(
        children,
        vec![
            &ComponentIdentifier::new("http", "listener"),
            &well_known::redelivery_policy(),
            &ComponentIdentifier::core("logger"),
        ]
    );

    let listener = model.component(flow.inner_components()[0]);
    assert!(listener.inner_components().is_empty());
    let policy = flow.inner_components()[1];
    assert_eq!(model.tree().parent(policy), Some(flow.id()));
}

#[test]
fn test_kinds_are_assigned_after_build() {
    let http = ExtensionDescriptor {
        name: "HTTP".to_string(),
        namespace: "http".to_string(),
        metadata: json!({ "sources": ["listener"], "operations": ["request"] }),
    };
    let main = flow("main")
        .child(ConfigLine::new("http", "listener").attr("path", "/"))
        .child(ConfigLine::new("http", "request").attr("url", "http://localhost"))
        .child(logger("done"));

    let model = builder()
        .with_config_file(application("app.xml", vec![main]))
        .with_extensions(vec![http])
        .build()
        .unwrap();

    let flow = model.find_top_level_named_component("main").unwrap();
    assert_eq!(flow.resolved_kind(), ComponentKind::Flow);
    let kinds: Vec<ComponentKind> = flow
        .inner_components()
        .iter()
        .map(|id| model.component(*id).resolved_kind())
        .collect();
    assert_eq!(
        kinds,
        vec![ComponentKind::Source, ComponentKind::Operation, ComponentKind::Operation]
    );
    assert_eq!(model.root().unwrap().resolved_kind(), ComponentKind::Unknown);
}

#[test]
fn test_kind_resolution_can_be_disabled() {
    let model = builder()
        .with_config_file(application("app.xml", vec![flow("main")]))
        .with_kind_resolver(None)
        .build()
        .unwrap();

    let flow = model.find_top_level_named_component("main").unwrap();
    assert_eq!(flow.resolved_kind(), ComponentKind::Unknown);
}

/// Inlines one flow named `expanded` and counts invocations
#[derive(Default)]
struct InliningExpander {
    calls: AtomicUsize,
}

impl ModuleExpander for InliningExpander {
    fn expand(&self, tree: &mut ComponentTree, root: NodeId, _extensions: &[ExtensionDescriptor]) -> appmodel::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = tree.insert(
            ComponentModel::new(well_known::flow())
                .with_parameter("name", "expanded")
                .mark_as_root(),
        );
        tree.append_child(root, id);
        Ok(())
    }
}

struct FailingExpander;

impl ModuleExpander for FailingExpander {
    fn expand(&self, _tree: &mut ComponentTree, _root: NodeId, _extensions: &[ExtensionDescriptor]) -> appmodel::Result<()> {
        Err(ModelError::Expansion("module 'billing' not found".to_string()))
    }
}

#[test]
fn test_module_expansion_runs_in_runtime_mode_and_reindexes() {
    let expander = Arc::new(InliningExpander::default());
    let model = builder()
        .with_config_file(application("app.xml", vec![flow("main")]))
        .with_module_expander(expander.clone())
        .build()
        .unwrap();

    assert_eq!(expander.calls.load(Ordering::SeqCst), 1);
    assert!(model.find_top_level_named_component("expanded").is_some());
    assert_eq!(model.index().top_level_count(), 2);
}

#[test]
fn test_module_expansion_is_skipped_outside_runtime_mode() {
    let expander = Arc::new(InliningExpander::default());
    let model = builder()
        .with_config_file(application("app.xml", vec![flow("main")]))
        .with_module_expander(expander.clone())
        .with_runtime_mode(false)
        .build()
        .unwrap();

    assert_eq!(expander.calls.load(Ordering::SeqCst), 0);
    assert!(model.find_top_level_named_component("expanded").is_none());
}

#[test]
fn test_module_expansion_failure_is_reported() {
    let err = builder()
        .with_config_file(application("app.xml", vec![flow("main")]))
        .with_module_expander(Arc::new(FailingExpander))
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Expansion);
    assert!(err.to_string().contains("module 'billing' not found"));
}

#[test]
fn test_named_lookup_prefers_top_level() {
    let main = flow("main").child(ConfigLine::core("set-variable").attr("name", "inner"));
    let model = builder()
        .with_config_file(application("app.xml", vec![main, flow("other")]))
        .build()
        .unwrap();

    assert_eq!(
        model.find_named_element("inner").unwrap().identifier(),
        &ComponentIdentifier::core("set-variable")
    );
    assert!(model.find_top_level_named_component("inner").is_none());
    assert_eq!(
        model
            .find_component_definition(&well_known::flow())
            .and_then(|c| c.name_attribute()),
        Some("main")
    );
    assert_eq!(model.flows().count(), 2);
}
