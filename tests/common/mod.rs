//! Shared fixtures for building configuration documents

#![allow(dead_code)]

use appmodel::{ApplicationModel, ApplicationModelBuilder, ConfigFile, ConfigLine};

/// An application document named `file_name` with the given top-level lines
pub fn application(file_name: &str, children: Vec<ConfigLine>) -> ConfigFile {
    document(file_name, "application", children)
}

pub fn domain(file_name: &str, children: Vec<ConfigLine>) -> ConfigFile {
    document(file_name, "domain", children)
}

pub fn document(file_name: &str, root: &str, children: Vec<ConfigLine>) -> ConfigFile {
    let root = children
        .into_iter()
        .fold(ConfigLine::core(root).line(1), |root, child| root.child(child));
    ConfigFile::new(file_name, root)
}

pub fn flow(name: &str) -> ConfigLine {
    ConfigLine::core("flow").attr("name", name)
}

pub fn flow_ref(target: &str) -> ConfigLine {
    ConfigLine::core("flow-ref").attr("name", target)
}

pub fn logger(message: &str) -> ConfigLine {
    ConfigLine::core("logger").attr("message", message)
}

pub fn global_property(name: &str, value: &str) -> ConfigLine {
    ConfigLine::core("global-property")
        .attr("name", name)
        .attr("value", value)
}

/// Builder isolated from the process environment
pub fn builder() -> ApplicationModelBuilder {
    ApplicationModel::builder().with_environment(Vec::<(String, String)>::new())
}

/// Value of `parameter` on the top-level component called `name`
pub fn top_level_parameter(model: &ApplicationModel, name: &str, parameter: &str) -> Option<String> {
    model
        .find_top_level_named_component(name)
        .and_then(|component| component.parameter(parameter))
        .map(str::to_string)
}
