//! Command-line interface for AppModel
//!
//! Builds an application model from pre-parsed documents on disk and reports
//! validation results, the component tree, property resolution and lookups.

use crate::config::{load_config_files, BuilderSettings};
use crate::logging::{init_logging, LogConfig};
use crate::services::ApplicationModel;
use crate::ModelError;
use anyhow::{anyhow, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

/// AppModel command-line interface
#[derive(Parser, Debug)]
#[command(name = "appmodel")]
#[command(about = "Build and validate declarative application configuration models")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct AppModelCli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Logging preset; defaults to `APPMODEL_LOG_PROFILE` and `APPMODEL_LOG_*`
    #[arg(long, global = true, value_parser = ["default", "development", "production"])]
    pub log_profile: Option<String>,

    /// Builder settings file
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl AppModelCli {
    pub fn log_config(&self) -> LogConfig {
        self.log_profile
            .as_deref()
            .and_then(LogConfig::profile)
            .unwrap_or_else(LogConfig::from_env)
            .with_verbosity(self.verbose)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the model and report whether it is valid
    Validate(InputArgs),

    /// Print the merged component tree
    Tree(InputArgs),

    /// Resolve placeholder text through the model's property chain
    Resolve {
        #[command(flatten)]
        input: InputArgs,

        /// Text containing ${key} placeholders
        #[arg(short, long)]
        text: String,
    },

    /// Look up a component by name
    Find {
        #[command(flatten)]
        input: InputArgs,

        /// Component name
        #[arg(short, long)]
        name: String,

        /// Only consider top-level declarations
        #[arg(long)]
        top_level: bool,
    },
}

/// Documents to build from, plus ad-hoc deployment properties
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Configuration documents (.json or .toml line records), in merge order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Deployment property override, may be repeated
    #[arg(short = 'D', long = "property", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub properties: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", raw))
}

/// CLI command executor
pub struct CliExecutor {
    settings: BuilderSettings,
    json_output: bool,
}

impl CliExecutor {
    pub fn new(settings: BuilderSettings, json_output: bool) -> Self {
        Self {
            settings,
            json_output,
        }
    }

    pub fn execute(&self, command: Commands, out: &mut dyn Write) -> anyhow::Result<()> {
        match command {
            Commands::Validate(input) => self.execute_validate(&input, out),
            Commands::Tree(input) => self.execute_tree(&input, out),
            Commands::Resolve { input, text } => self.execute_resolve(&input, &text, out),
            Commands::Find {
                input,
                name,
                top_level,
            } => self.execute_find(&input, &name, top_level, out),
        }
    }

    fn build_model(&self, input: &InputArgs) -> anyhow::Result<ApplicationModel> {
        let files = load_config_files(&input.files)?;
        let builder = self
            .settings
            .apply(ApplicationModel::builder().with_config_files(files))?;
        let builder = input
            .properties
            .iter()
            .fold(builder, |builder, (key, value)| builder.with_deployment_property(key, value));

        let model = builder.build()?;
        debug!(files = input.files.len(), "Model built from command-line input");
        Ok(model)
    }

    fn execute_validate(&self, input: &InputArgs, out: &mut dyn Write) -> anyhow::Result<()> {
        let model = self.build_model(input)?;
        let components = model.component_ids().count();
        let top_level = model.top_level_ids().count();
        info!(components, top_level, "Configuration is valid");

        if self.json_output {
            let report = json!({
                "valid": true,
                "components": components,
                "top_level": top_level,
                "validated": model.is_configuration_document(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        } else {
            writeln!(
                out,
                "Configuration is valid: {} components, {} top-level",
                components, top_level
            )?;
            if !model.is_configuration_document() {
                writeln!(out, "  (fragment: structural validation skipped)")?;
            }
        }
        Ok(())
    }

    fn execute_tree(&self, input: &InputArgs, out: &mut dyn Write) -> anyhow::Result<()> {
        let model = self.build_model(input)?;
        let tree = model.tree();

        if self.json_output {
            let nodes: Vec<_> = model
                .component_ids()
                .map(|id| {
                    let component = &tree[id];
                    json!({
                        "id": id.index(),
                        "depth": tree.depth(id),
                        "identifier": component.identifier().to_string(),
                        "name": component.name_attribute(),
                        "location": component.source_location().map(|l| l.to_string()),
                        "kind": component.resolved_kind(),
                        "type": component.type_ref().map(|t| t.name()),
                    })
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&nodes)?)?;
            return Ok(());
        }

        for id in model.component_ids() {
            let component = &tree[id];
            let mut line = format!("{}{}", "  ".repeat(tree.depth(id)), component.identifier());
            if let Some(name) = component.name_attribute() {
                line.push_str(&format!(" name={}", name));
            }
            if let Some(location) = component.source_location() {
                line.push_str(&format!(" ({})", location));
            }
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    fn execute_resolve(&self, input: &InputArgs, text: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let model = self.build_model(input)?;
        let resolved = model
            .configuration_properties()
            .resolve_value(text)
            .with_context(|| format!("Failed to resolve '{}'", text))?;

        if self.json_output {
            writeln!(out, "{}", json!({ "text": text, "resolved": resolved }))?;
        } else {
            writeln!(out, "{}", resolved)?;
        }
        Ok(())
    }

    fn execute_find(&self, input: &InputArgs, name: &str, top_level: bool, out: &mut dyn Write) -> anyhow::Result<()> {
        let model = self.build_model(input)?;
        let found = if top_level {
            model.find_top_level_named_component(name)
        } else {
            model.find_named_element(name)
        };
        let component = found.ok_or_else(|| anyhow!("No component named '{}'", name))?;

        if self.json_output {
            let parameters: serde_json::Map<String, serde_json::Value> = component
                .parameters()
                .map(|(key, parameter)| (key.to_string(), json!(parameter.value)))
                .collect();
            let report = json!({
                "identifier": component.identifier().to_string(),
                "location": component.source_location().map(|l| l.to_string()),
                "top_level": component.is_root(),
                "parameters": parameters,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        } else {
            writeln!(out, "{}", component.describe())?;
            for (key, parameter) in component.parameters() {
                writeln!(out, "  {} = {}", key, parameter.value)?;
            }
        }
        Ok(())
    }
}

/// Parse arguments, run the command and map the outcome to an exit code
pub fn run_cli() -> ExitCode {
    let cli = AppModelCli::parse();

    if let Err(e) = init_logging(&cli.log_config()) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    let result = BuilderSettings::load(&cli.settings.clone().unwrap_or_else(BuilderSettings::default_path))
        .context("Failed to load builder settings")
        .and_then(|settings| {
            let executor = CliExecutor::new(settings, cli.json);
            let stdout = std::io::stdout();
            executor.execute(cli.command, &mut stdout.lock())
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &anyhow::Error, json_output: bool) {
    let kind = error
        .downcast_ref::<ModelError>()
        .map(|e| format!("{:?}", e.kind()));

    if json_output {
        let report = json!({
            "error": true,
            "kind": kind,
            "message": format!("{:#}", error),
        });
        println!("{}", report);
    } else {
        eprintln!("Error: {:#}", error);
    }
}
