//! Data model for configuration trees

pub mod component;
pub mod config_line;
pub mod definitions;
pub mod identifier;
pub mod tree;

pub use component::*;
pub use config_line::*;
pub use definitions::*;
pub use identifier::*;
pub use tree::*;
