//! Reading pre-parsed configuration documents and resources from disk

use crate::models::ConfigFile;
use crate::properties::ResourceProvider;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unsupported document format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Load one document of line records from a `.json` or `.toml` file
///
/// A missing `file_name` in the document defaults to the file's own name.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config_file: ConfigFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Some("toml") => toml::from_str(&content).map_err(|source| LoadError::Toml {
            path: path.to_path_buf(),
            source,
        })?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    if config_file.file_name.is_empty() {
        config_file.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    debug!(path = %path.display(), lines = config_file.config_lines.len(), "Loaded configuration document");
    Ok(config_file)
}

pub fn load_config_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ConfigFile>, LoadError> {
    paths.iter().map(|p| load_config_file(p.as_ref())).collect()
}

/// Resources read from files below a base directory
#[derive(Debug, Clone)]
pub struct DirectoryResourceProvider {
    base: PathBuf,
}

impl DirectoryResourceProvider {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl ResourceProvider for DirectoryResourceProvider {
    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        let relative = Path::new(name);
        if relative.is_absolute() || relative.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            debug!(resource = name, "Refusing resource outside the resources directory");
            return None;
        }
        fs::read(self.base.join(relative)).ok()
    }
}
