//! Mutation engine: add/remove operations over the registry
//!
//! Every operation resolves all of its preconditions before touching the registry,
//! so a failed call leaves the document exactly as it was. The flat index is
//! updated in the same call as the tree edit it mirrors.

use tracing::{debug, warn};

use crate::domain::entities::{
    ApprovedBook, Book, CollectionApproval, IndexEntry, Release, Repository,
    RepositoryApproval, Version,
};
use crate::domain::error::DomainError;
use crate::domain::registry::{
    book_not_found, version_not_found, CollectionRegistry, Registry, RepositoryRegistry,
};

/// Outcome of a successful book-version removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub book: Book,
    /// The version had no books left and was dropped from its repository
    pub version_dropped: bool,
}

/// Outcome of a successful book-version addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addition {
    /// A new version had to be created to hold the book
    pub version_created: bool,
}

impl RepositoryRegistry {
    /// Remove one approved book from a version, dropping the version if it becomes empty.
    pub fn remove_book_version(
        &mut self,
        repository: &str,
        commit_sha: &str,
        slug: &str,
    ) -> Result<Removal, DomainError> {
        debug!("remove_book_version: {} {} of {}", slug, commit_sha, repository);
        let repo = self.repository_mut(repository)?;
        let v = repo
            .version_position(commit_sha)
            .ok_or_else(|| version_not_found(repository, commit_sha))?;
        let b = repo.versions[v]
            .book_position(slug)
            .ok_or_else(|| book_not_found(repository, commit_sha, slug))?;

        let book = repo.versions[v].commit_metadata.books.remove(b);
        let version_dropped = repo.versions[v].is_vacuous();
        if version_dropped {
            repo.versions.remove(v);
            debug!("remove_book_version: dropped empty version {}", commit_sha);
        }

        match self
            .index
            .iter()
            .position(|e| e.matches_book(repository, commit_sha, slug))
        {
            Some(i) => {
                self.index.remove(i);
            }
            None => warn!(
                "no index entry for {} {} of {}, index was already out of sync",
                slug, commit_sha, repository
            ),
        }

        Ok(Removal {
            book,
            version_dropped,
        })
    }

    /// Approve `book` in version `commit_sha` of an existing repository.
    ///
    /// If the repository has no such version yet, one is created from `release`.
    pub fn add_book_version(
        &mut self,
        repository: &str,
        commit_sha: &str,
        book: Book,
        release: &Release,
    ) -> Result<Addition, DomainError> {
        debug!("add_book_version: {} {} of {}", book.slug, commit_sha, repository);
        let repo = self.repository_mut(repository)?;
        let existing = repo.version_position(commit_sha);

        if let Some(v) = existing {
            if repo.versions[v].book_position(&book.slug).is_some() {
                return Err(DomainError::BookAlreadyExists {
                    repository: repository.to_string(),
                    commit_sha: commit_sha.to_string(),
                    slug: book.slug,
                });
            }
        }

        let slug = book.slug.clone();
        let (min_code_version, version_created) = match existing {
            Some(v) => {
                repo.versions[v].commit_metadata.books.push(book);
                (repo.versions[v].min_code_version.clone(), false)
            }
            None => {
                repo.versions.push(Version::new(commit_sha, release, vec![book]));
                (release.min_code_version.clone(), true)
            }
        };

        self.index.push(IndexEntry::Book(RepositoryApproval {
            repository_name: repository.to_string(),
            slug,
            commit_sha: commit_sha.to_string(),
            min_code_version,
        }));

        Ok(Addition { version_created })
    }

    /// Insert an empty repository so versions and books can be added to it.
    pub fn add_new_repository(
        &mut self,
        name: &str,
        platforms: &[String],
    ) -> Result<&Repository, DomainError> {
        debug!("add_new_repository: {} {:?}", name, platforms);
        if self.find_repository(name).is_ok() {
            return Err(DomainError::RepositoryAlreadyExists(name.to_string()));
        }
        self.entries.push(ApprovedBook::Repository(Repository::new(
            name,
            platforms.iter().cloned(),
        )));
        self.find_repository(name)
    }

    /// Replace the book approvals of the flat index with the ones derived from the tree.
    ///
    /// Collection entries stay in front, in their original order. Returns the number
    /// of book approvals that changed position, appeared or vanished.
    pub fn reindex(&mut self) -> usize {
        let derived = self.derive_index();
        let current: Vec<&RepositoryApproval> = self.book_index().collect();
        let unchanged = current
            .iter()
            .zip(derived.iter())
            .filter(|(a, b)| **a == *b)
            .count();
        let changed = current.len().max(derived.len()) - unchanged;

        self.index.retain(|e| !e.is_book());
        self.index.extend(derived.into_iter().map(IndexEntry::Book));
        changed
    }
}

impl CollectionRegistry {
    /// Approve a new content version of a listed collection.
    pub fn add_collection_version(
        &mut self,
        collection_id: &str,
        content_version: &str,
        min_code_version: &str,
    ) -> Result<(), DomainError> {
        debug!("add_collection_version: {} {}", collection_id, content_version);
        self.find_collection(collection_id)?;
        if self.approval_position(collection_id, content_version).is_ok() {
            return Err(DomainError::CollectionVersionAlreadyExists {
                collection_id: collection_id.to_string(),
                content_version: content_version.to_string(),
            });
        }
        self.approvals.push(CollectionApproval {
            collection_id: collection_id.to_string(),
            content_version: content_version.to_string(),
            min_code_version: min_code_version.to_string(),
        });
        Ok(())
    }

    /// Withdraw an approved content version.
    pub fn remove_collection_version(
        &mut self,
        collection_id: &str,
        content_version: &str,
    ) -> Result<CollectionApproval, DomainError> {
        debug!("remove_collection_version: {} {}", collection_id, content_version);
        let i = self.approval_position(collection_id, content_version)?;
        Ok(self.approvals.remove(i))
    }
}

impl Registry {
    pub fn remove_book_version(
        &mut self,
        repository: &str,
        commit_sha: &str,
        slug: &str,
    ) -> Result<Removal, DomainError> {
        self.repositories_mut()?
            .remove_book_version(repository, commit_sha, slug)
    }

    pub fn add_book_version(
        &mut self,
        repository: &str,
        commit_sha: &str,
        book: Book,
        release: &Release,
    ) -> Result<Addition, DomainError> {
        self.repositories_mut()?
            .add_book_version(repository, commit_sha, book, release)
    }

    pub fn add_new_repository(&mut self, name: &str, platforms: &[String]) -> Result<(), DomainError> {
        self.repositories_mut()?
            .add_new_repository(name, platforms)
            .map(|_| ())
    }

    pub fn add_collection_version(
        &mut self,
        collection_id: &str,
        content_version: &str,
        min_code_version: &str,
    ) -> Result<(), DomainError> {
        self.collections_mut()?
            .add_collection_version(collection_id, content_version, min_code_version)
    }

    pub fn remove_collection_version(
        &mut self,
        collection_id: &str,
        content_version: &str,
    ) -> Result<CollectionApproval, DomainError> {
        self.collections_mut()?
            .remove_collection_version(collection_id, content_version)
    }

    pub fn reindex(&mut self) -> Result<usize, DomainError> {
        Ok(self.repositories_mut()?.reindex())
    }
}
