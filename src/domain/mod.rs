//! Domain layer: the ABL registry model and its mutation engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod mutation;
pub mod registry;

pub use entities::*;
pub use error::DomainError;
pub use mutation::{Addition, Removal};
pub use registry::{CollectionRegistry, IndexIssue, Registry, RepositoryRegistry, Schema};
