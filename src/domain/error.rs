//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::Schema;

/// Domain errors represent violated registry preconditions.
/// None of them leave the registry modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("repository not found in the ABL: {0}")]
    RepositoryNotFound(String),

    #[error("{commit_sha} of {repository} could not be found in the ABL")]
    VersionNotFound {
        repository: String,
        commit_sha: String,
    },

    #[error("{slug} {commit_sha} of {repository} could not be found in the ABL")]
    BookNotFound {
        repository: String,
        commit_sha: String,
        slug: String,
    },

    #[error("{slug} {commit_sha} of {repository} already exists in the ABL")]
    BookAlreadyExists {
        repository: String,
        commit_sha: String,
        slug: String,
    },

    #[error("repository already exists in the ABL: {0}")]
    RepositoryAlreadyExists(String),

    #[error("collection not found in the ABL: {0}")]
    CollectionNotFound(String),

    #[error("{content_version} of {collection_id} could not be found in the ABL")]
    CollectionVersionNotFound {
        collection_id: String,
        content_version: String,
    },

    #[error("{content_version} of {collection_id} already exists in the ABL")]
    CollectionVersionAlreadyExists {
        collection_id: String,
        content_version: String,
    },

    #[error("operation needs a {expected} registry, but the ABL uses the {found} schema")]
    WrongSchema { expected: Schema, found: Schema },
}

impl DomainError {
    /// Referenced repository, version, book, collection or approval is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::RepositoryNotFound(_)
                | DomainError::VersionNotFound { .. }
                | DomainError::BookNotFound { .. }
                | DomainError::CollectionNotFound(_)
                | DomainError::CollectionVersionNotFound { .. }
        )
    }

    /// The add target is already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            DomainError::BookAlreadyExists { .. }
                | DomainError::RepositoryAlreadyExists(_)
                | DomainError::CollectionVersionAlreadyExists { .. }
        )
    }
}
