//! Access to pre-read resources by name

use std::collections::HashMap;

/// Supplies resource bytes by name; `None` when the resource does not exist
pub trait ResourceProvider: Send + Sync {
    fn resource(&self, name: &str) -> Option<Vec<u8>>;
}

/// Resources held in memory, keyed by name
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    resources: HashMap<String, Vec<u8>>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.insert(name.into(), content.into());
    }

    pub fn with(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }
}

impl ResourceProvider for InMemoryResources {
    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        self.resources.get(name).cloned()
    }
}
