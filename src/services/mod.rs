//! Model construction services

pub mod application_model;
pub mod indexer;
pub mod mutation;
pub mod reader;
pub mod types;
pub mod validator;

pub use application_model::{ApplicationModel, ApplicationModelBuilder};
pub use indexer::ComponentIndex;
pub use reader::{ComponentModelReader, ComponentTreeBuilder, ReaderOptions};
pub use types::{CoreKindResolver, ObjectTypeVisitor};
pub use validator::{ModelValidator, ValidationRule, RESERVED_NAME_CHARACTERS};
