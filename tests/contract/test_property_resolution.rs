//! Contract tests for placeholder resolution through the provider chain

use crate::common::*;
use appmodel::properties::{
    ConfigurationProperties, InMemoryResources, MapPropertiesProvider, PropertiesFileProviderFactory,
    PropertyResolver,
};
use appmodel::services::ReaderOptions;
use appmodel::{ConfigLine, ErrorKind, ModelError, PropertyError};
use std::sync::Arc;

fn domain_properties(values: &[(&str, &str)]) -> Arc<PropertyResolver> {
    let values: Vec<(String, String)> = values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(PropertyResolver::new(Arc::new(MapPropertiesProvider::new("domain", values))))
}

#[test]
fn test_layer_precedence() {
    let resources = InMemoryResources::new().with("app.properties", "c=file\nd=file\ne=file\n");
    let file = application(
        "app.xml",
        vec![
            global_property("b", "global").line(2),
            global_property("c", "global").line(3),
            global_property("d", "global").line(4),
            global_property("e", "global").line(5),
            ConfigLine::core("configuration-properties")
                .attr("file", "app.properties")
                .line(6),
        ],
    );

    let model = appmodel::ApplicationModel::builder()
        .with_environment(["a", "b", "c", "d", "e"].map(|k| (k, "env")))
        .with_config_file(file)
        .with_resources(Arc::new(resources))
        .with_parent_properties(domain_properties(&[("d", "parent"), ("e", "parent")]))
        .with_deployment_property("e", "deployment")
        .build()
        .unwrap();

    let properties = model.configuration_properties();
    let resolved = properties.resolve_value("${a} ${b} ${c} ${d} ${e}").unwrap();
    assert_eq!(resolved, "env global file parent deployment");
    assert_eq!(
        properties.describe_chain(),
        vec![
            "Deployment properties",
            "External files",
            "Parent artifact properties",
            "Configuration properties providers",
            "Global properties",
            "Environment properties",
        ]
    );
}

#[test]
fn test_deployment_layer_is_absent_without_overrides() {
    let model = builder()
        .with_config_file(application("app.xml", vec![flow("main")]))
        .build()
        .unwrap();

    let chain = model.configuration_properties().describe_chain();
    assert_eq!(chain.first().map(String::as_str), Some("External files"));
    assert!(!chain.iter().any(|d| d == "Deployment properties"));
    assert!(!chain.iter().any(|d| d == "Parent artifact properties"));
}

#[test]
fn test_component_attributes_are_resolved() {
    let main = flow("main").child(logger("${greeting}, ${user.name}!").line(4));
    let model = builder()
        .with_config_file(application(
            "app.xml",
            vec![
                global_property("greeting", "Hello").line(2),
                global_property("user.name", "${user.first} ${user.last}").line(3),
                global_property("user.first", "Ada").line(4),
                global_property("user.last", "Lovelace").line(5),
                main.line(6),
            ],
        ))
        .build()
        .unwrap();

    let flow = model.find_top_level_named_component("main").unwrap();
    let logger = model.component(flow.inner_components()[0]);
    assert_eq!(logger.parameter("message"), Some("Hello, Ada Lovelace!"));
}

#[test]
fn test_deployment_property_overrides_global_property() {
    let main = flow("main").child(ConfigLine::new("http", "request").attr("port", "${http.port}"));
    let model = builder()
        .with_config_file(application(
            "app.xml",
            vec![global_property("http.port", "8081"), main],
        ))
        .with_deployment_property("http.port", "9090")
        .build()
        .unwrap();

    let flow = model.find_top_level_named_component("main").unwrap();
    assert_eq!(model.component(flow.inner_components()[0]).parameter("port"), Some("9090"));
}

#[test]
fn test_file_placeholder_reads_resource() {
    let resources = InMemoryResources::new().with("banner.txt", "Welcome");
    let model = builder()
        .with_config_file(application(
            "app.xml",
            vec![flow("main").child(logger("${file::banner.txt}"))],
        ))
        .with_resources(Arc::new(resources))
        .build()
        .unwrap();

    let flow = model.find_top_level_named_component("main").unwrap();
    assert_eq!(model.component(flow.inner_components()[0]).parameter("message"), Some("Welcome"));
}

#[test]
fn test_missing_property_reports_location() {
    let err = builder()
        .with_config_file(application(
            "app.xml",
            vec![flow("main").line(2).child(logger("${missing.key}").line(3))],
        ))
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnresolvedProperty);
    match &err {
        ModelError::UnresolvedProperty { cause, location } => {
            assert_eq!(
                cause,
                &PropertyError::Missing {
                    key: "missing.key".to_string()
                }
            );
            assert_eq!(location.as_ref().map(|l| l.line), Some(3));
        }
        other => panic!("Unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("at app.xml:3"));
}

#[test]
fn test_cyclic_properties_are_detected() {
    let err = builder()
        .with_config_file(application(
            "app.xml",
            vec![
                global_property("a", "${b}"),
                global_property("b", "x-${a}"),
                flow("main").child(logger("${a}")),
            ],
        ))
        .build()
        .unwrap_err();

    match err {
        ModelError::UnresolvedProperty {
            cause: PropertyError::Cycle { chain },
            ..
        } => {
            assert_eq!(chain.len(), 3);
            assert_eq!(chain.first(), chain.last());
            assert!(chain.contains(&"a".to_string()) && chain.contains(&"b".to_string()));
        }
        other => panic!("Expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_schema_defaults_can_bypass_resolution() {
    let file = application(
        "app.xml",
        vec![flow("main").child(ConfigLine::core("logger").schema_attr("category", "${unset}"))],
    );

    let err = builder().with_config_file(file.clone()).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedProperty);

    let model = builder()
        .with_config_file(file)
        .with_reader_options(ReaderOptions {
            resolve_schema_defaults: false,
        })
        .build()
        .unwrap();
    let flow = model.find_top_level_named_component("main").unwrap();
    let logger = model.component(flow.inner_components()[0]);
    assert_eq!(logger.parameter("category"), Some("${unset}"));
    assert!(logger.is_parameter_from_schema("category"));
}

#[test]
fn test_application_inherits_domain_properties() {
    let domain_model = builder()
        .with_config_file(domain(
            "domain.xml",
            vec![global_property("shared.host", "db.internal")],
        ))
        .build()
        .unwrap();
    assert_eq!(
        domain_model.configuration_properties().resolve_property("shared.host").as_deref(),
        Some("db.internal")
    );

    let app = builder()
        .with_config_file(application(
            "app.xml",
            vec![flow("main").child(ConfigLine::new("db", "select").attr("host", "${shared.host}"))],
        ))
        .with_parent_properties(domain_model.configuration_properties())
        .build()
        .unwrap();

    let flow = app.find_top_level_named_component("main").unwrap();
    assert_eq!(app.component(flow.inner_components()[0]).parameter("host"), Some("db.internal"));
}

#[test]
fn test_properties_file_parameters_use_global_properties() {
    let resources = InMemoryResources::new().with("conf/dev.properties", "db.user=admin\n");
    let model = builder()
        .with_config_file(application(
            "app.xml",
            vec![
                global_property("env", "dev"),
                ConfigLine::core("configuration-properties").attr("file", "conf/${env}.properties"),
            ],
        ))
        .with_resources(Arc::new(resources))
        .build()
        .unwrap();

    assert_eq!(
        model.configuration_properties().resolve_key("db.user").unwrap(),
        "admin"
    );
}

#[test]
fn test_missing_properties_file_is_a_provider_failure() {
    let err = builder()
        .with_config_file(application(
            "app.xml",
            vec![ConfigLine::core("configuration-properties")
                .attr("file", "absent.properties")
                .line(7)],
        ))
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderFailure);
    let message = err.to_string();
    assert!(message.contains("absent.properties"));
    assert!(message.contains("app.xml:7"));
}

#[test]
fn test_duplicate_provider_factory_is_rejected() {
    let mut builder = builder();
    let err = builder
        .register_provider_factory(Arc::new(PropertiesFileProviderFactory))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderFailure);
    assert!(err
        .to_string()
        .contains("Multiple configuration providers for component: core:configuration-properties"));
}

#[test]
fn test_file_placeholder_with_invalid_utf8_is_unresolved() {
    let resources = InMemoryResources::new().with("banner.bin", vec![0xffu8, 0xfe]);
    let err = builder()
        .with_config_file(application(
            "app.xml",
            vec![flow("main").child(logger("${file::banner.bin}").line(3))],
        ))
        .with_resources(Arc::new(resources))
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnresolvedProperty);
    match err {
        ModelError::UnresolvedProperty { cause, .. } => assert_eq!(
            cause,
            PropertyError::Missing {
                key: "file::banner.bin".to_string()
            }
        ),
        other => panic!("Unexpected error: {:?}", other),
    }
}
