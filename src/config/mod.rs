//! Host-side configuration: builder settings and document loading

pub mod loader;
pub mod settings;

pub use loader::{load_config_file, load_config_files, DirectoryResourceProvider, LoadError};
pub use settings::{BuilderSettings, DefinitionSettings, SettingsError};
