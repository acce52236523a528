//! Registry model: the parsed ABL document and its read accessors
//!
//! Structural change lives in [`crate::domain::mutation`]; this module only looks things up.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::entities::{
    ApprovedBook, Book, Collection, CollectionApproval, IndexEntry, Repository,
    RepositoryApproval, Version,
};
use crate::domain::error::DomainError;

/// Shape of an ABL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `approved_books` lists collections, `approved_versions` their approved versions
    Collections,
    /// `approved_books` lists repositories with nested versions and books
    Repositories,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Collections => write!(f, "collection"),
            Schema::Repositories => write!(f, "repository"),
        }
    }
}

/// The Approved Book List in either of its two schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Registry {
    Repositories(RepositoryRegistry),
    Collections(CollectionRegistry),
}

/// Repository schema: repository → version → book, plus one index entry per book-version.
///
/// Collection entries left over from the collection schema may sit in both lists.
/// They are preserved and counted but never edited or audited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRegistry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) api_version: Option<u32>,
    #[serde(default, rename = "approved_books")]
    pub(crate) entries: Vec<ApprovedBook>,
    #[serde(default, rename = "approved_versions")]
    pub(crate) index: Vec<IndexEntry>,
}

/// Collection schema: collections plus their approved versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionRegistry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) api_version: Option<u32>,
    #[serde(default, rename = "approved_books")]
    pub(crate) collections: Vec<Collection>,
    #[serde(default, rename = "approved_versions")]
    pub(crate) approvals: Vec<CollectionApproval>,
}

/// Disagreement between the nested tree and the flat index, or a structural leftover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexIssue {
    /// Book-version present in the tree without an index entry
    Missing(RepositoryApproval),
    /// Index entry without a matching book-version
    Stale(RepositoryApproval),
    /// Index entry listed more than once
    Duplicate(RepositoryApproval),
    /// Version without books
    VacuousVersion { repository: String, commit_sha: String },
    /// Approval for a collection not listed in `approved_books`
    Orphaned(CollectionApproval),
}

impl fmt::Display for IndexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexIssue::Missing(e) => write!(
                f,
                "missing index entry: {} {} of {}",
                e.slug, e.commit_sha, e.repository_name
            ),
            IndexIssue::Stale(e) => write!(
                f,
                "stale index entry: {} {} of {}",
                e.slug, e.commit_sha, e.repository_name
            ),
            IndexIssue::Duplicate(e) => write!(
                f,
                "duplicate index entry: {} {} of {}",
                e.slug, e.commit_sha, e.repository_name
            ),
            IndexIssue::VacuousVersion {
                repository,
                commit_sha,
            } => write!(f, "version without books: {} of {}", commit_sha, repository),
            IndexIssue::Orphaned(a) => write!(
                f,
                "approval for unlisted collection: {} {}",
                a.collection_id, a.content_version
            ),
        }
    }
}

impl Registry {
    pub fn schema(&self) -> Schema {
        match self {
            Registry::Repositories(_) => Schema::Repositories,
            Registry::Collections(_) => Schema::Collections,
        }
    }

    /// Size of the flat index.
    pub fn count(&self) -> usize {
        match self {
            Registry::Repositories(r) => r.count(),
            Registry::Collections(c) => c.count(),
        }
    }

    pub fn audit(&self) -> Vec<IndexIssue> {
        match self {
            Registry::Repositories(r) => r.audit(),
            Registry::Collections(c) => c.audit(),
        }
    }

    pub fn as_repositories(&self) -> Result<&RepositoryRegistry, DomainError> {
        match self {
            Registry::Repositories(r) => Ok(r),
            Registry::Collections(_) => Err(self.wrong_schema(Schema::Repositories)),
        }
    }

    pub fn as_collections(&self) -> Result<&CollectionRegistry, DomainError> {
        match self {
            Registry::Collections(c) => Ok(c),
            Registry::Repositories(_) => Err(self.wrong_schema(Schema::Collections)),
        }
    }

    pub(crate) fn repositories_mut(&mut self) -> Result<&mut RepositoryRegistry, DomainError> {
        let err = self.wrong_schema(Schema::Repositories);
        match self {
            Registry::Repositories(r) => Ok(r),
            Registry::Collections(_) => Err(err),
        }
    }

    pub(crate) fn collections_mut(&mut self) -> Result<&mut CollectionRegistry, DomainError> {
        let err = self.wrong_schema(Schema::Collections);
        match self {
            Registry::Collections(c) => Ok(c),
            Registry::Repositories(_) => Err(err),
        }
    }

    fn wrong_schema(&self, expected: Schema) -> DomainError {
        DomainError::WrongSchema {
            expected,
            found: self.schema(),
        }
    }
}

impl From<RepositoryRegistry> for Registry {
    fn from(r: RepositoryRegistry) -> Self {
        Registry::Repositories(r)
    }
}

impl From<CollectionRegistry> for Registry {
    fn from(c: CollectionRegistry) -> Self {
        Registry::Collections(c)
    }
}

/// Wire form used to pick the schema before decoding the entries.
#[derive(Deserialize)]
struct RawRegistry {
    #[serde(default)]
    api_version: Option<u32>,
    #[serde(default)]
    approved_books: Vec<Value>,
    #[serde(default)]
    approved_versions: Vec<Value>,
}

impl RawRegistry {
    fn schema(&self) -> Schema {
        let versioned = self.api_version.is_some_and(|v| v >= 2);
        let nested = self
            .approved_books
            .iter()
            .any(|b| b.get("repository_name").is_some());
        if versioned || nested {
            Schema::Repositories
        } else {
            Schema::Collections
        }
    }
}

impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawRegistry::deserialize(deserializer)?;
        let schema = raw.schema();
        let RawRegistry {
            api_version,
            approved_books,
            approved_versions,
        } = raw;
        let books = Value::Array(approved_books);
        let versions = Value::Array(approved_versions);

        match schema {
            Schema::Repositories => Ok(Registry::Repositories(RepositoryRegistry {
                api_version,
                entries: serde_json::from_value(books).map_err(serde::de::Error::custom)?,
                index: serde_json::from_value(versions).map_err(serde::de::Error::custom)?,
            })),
            Schema::Collections => Ok(Registry::Collections(CollectionRegistry {
                api_version,
                collections: serde_json::from_value(books).map_err(serde::de::Error::custom)?,
                approvals: serde_json::from_value(versions).map_err(serde::de::Error::custom)?,
            })),
        }
    }
}

impl RepositoryRegistry {
    /// Build a registry from a tree, deriving its flat index.
    pub fn new(api_version: Option<u32>, repositories: Vec<Repository>) -> Self {
        let mut registry = Self {
            api_version,
            entries: repositories.into_iter().map(ApprovedBook::Repository).collect(),
            index: Vec::new(),
        };
        registry.index = registry
            .derive_index()
            .into_iter()
            .map(IndexEntry::Book)
            .collect();
        registry
    }

    pub fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    /// Every `approved_books` entry in document order.
    pub fn approved_books(&self) -> &[ApprovedBook] {
        &self.entries
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.entries.iter().filter_map(ApprovedBook::as_repository)
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.entries.iter().filter_map(ApprovedBook::as_collection)
    }

    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    /// Book approvals of the flat index, skipping collection entries.
    pub fn book_index(&self) -> impl Iterator<Item = &RepositoryApproval> {
        self.index.iter().filter_map(IndexEntry::as_book)
    }

    /// Size of the flat index, collection entries included.
    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn find_repository(&self, name: &str) -> Result<&Repository, DomainError> {
        self.repositories()
            .find(|r| r.name == name)
            .ok_or_else(|| DomainError::RepositoryNotFound(name.to_string()))
    }

    pub fn find_version(&self, repository: &str, commit_sha: &str) -> Result<&Version, DomainError> {
        let repo = self.find_repository(repository)?;
        repo.versions
            .iter()
            .find(|v| v.commit_sha == commit_sha)
            .ok_or_else(|| version_not_found(repository, commit_sha))
    }

    pub fn find_book(
        &self,
        repository: &str,
        commit_sha: &str,
        slug: &str,
    ) -> Result<&Book, DomainError> {
        self.find_version(repository, commit_sha)?
            .books()
            .iter()
            .find(|b| b.slug == slug)
            .ok_or_else(|| book_not_found(repository, commit_sha, slug))
    }

    pub(crate) fn repository_mut(&mut self, name: &str) -> Result<&mut Repository, DomainError> {
        self.entries
            .iter_mut()
            .filter_map(ApprovedBook::as_repository_mut)
            .find(|r| r.name == name)
            .ok_or_else(|| DomainError::RepositoryNotFound(name.to_string()))
    }

    /// The book approvals implied by the tree, in tree order.
    pub fn derive_index(&self) -> Vec<RepositoryApproval> {
        self.repositories()
            .flat_map(|repo| {
                repo.versions.iter().flat_map(move |version| {
                    version.books().iter().map(move |book| RepositoryApproval {
                        repository_name: repo.name.clone(),
                        slug: book.slug.clone(),
                        commit_sha: version.commit_sha.clone(),
                        min_code_version: version.min_code_version.clone(),
                    })
                })
            })
            .collect()
    }

    pub fn audit(&self) -> Vec<IndexIssue> {
        let mut issues = Vec::new();

        for repo in self.repositories() {
            for version in repo.versions.iter().filter(|v| v.is_vacuous()) {
                issues.push(IndexIssue::VacuousVersion {
                    repository: repo.name.clone(),
                    commit_sha: version.commit_sha.clone(),
                });
            }
        }

        let derived = self.derive_index();
        let expected: HashSet<&RepositoryApproval> = derived.iter().collect();
        let mut seen: BTreeMap<&RepositoryApproval, usize> = BTreeMap::new();
        for entry in self.book_index() {
            *seen.entry(entry).or_default() += 1;
        }
        for (entry, n) in &seen {
            if !expected.contains(entry) {
                issues.push(IndexIssue::Stale((*entry).clone()));
            }
            if *n > 1 {
                issues.push(IndexIssue::Duplicate((*entry).clone()));
            }
        }
        for entry in &derived {
            if !seen.contains_key(entry) {
                issues.push(IndexIssue::Missing(entry.clone()));
            }
        }
        issues
    }
}

pub(crate) fn version_not_found(repository: &str, commit_sha: &str) -> DomainError {
    DomainError::VersionNotFound {
        repository: repository.to_string(),
        commit_sha: commit_sha.to_string(),
    }
}

pub(crate) fn book_not_found(repository: &str, commit_sha: &str, slug: &str) -> DomainError {
    DomainError::BookNotFound {
        repository: repository.to_string(),
        commit_sha: commit_sha.to_string(),
        slug: slug.to_string(),
    }
}

impl CollectionRegistry {
    pub fn new(
        api_version: Option<u32>,
        collections: Vec<Collection>,
        approvals: Vec<CollectionApproval>,
    ) -> Self {
        Self {
            api_version,
            collections,
            approvals,
        }
    }

    pub fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn approvals(&self) -> &[CollectionApproval] {
        &self.approvals
    }

    pub fn count(&self) -> usize {
        self.approvals.len()
    }

    pub fn find_collection(&self, collection_id: &str) -> Result<&Collection, DomainError> {
        self.collections
            .iter()
            .find(|c| c.collection_id == collection_id)
            .ok_or_else(|| DomainError::CollectionNotFound(collection_id.to_string()))
    }

    pub fn find_collection_version(
        &self,
        collection_id: &str,
        content_version: &str,
    ) -> Result<&CollectionApproval, DomainError> {
        self.approval_position(collection_id, content_version)
            .map(|i| &self.approvals[i])
    }

    pub(crate) fn approval_position(
        &self,
        collection_id: &str,
        content_version: &str,
    ) -> Result<usize, DomainError> {
        self.approvals
            .iter()
            .position(|a| a.matches(collection_id, content_version))
            .ok_or_else(|| DomainError::CollectionVersionNotFound {
                collection_id: collection_id.to_string(),
                content_version: content_version.to_string(),
            })
    }

    pub fn audit(&self) -> Vec<IndexIssue> {
        let listed: HashSet<&str> = self
            .collections
            .iter()
            .map(|c| c.collection_id.as_str())
            .collect();
        self.approvals
            .iter()
            .filter(|a| !listed.contains(a.collection_id.as_str()))
            .cloned()
            .map(IndexIssue::Orphaned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOSITORY_DOC: &str = r#"{
      "api_version": 2,
      "approved_books": [
        {
          "repository_name": "osbooks-physics",
          "platforms": ["REX"],
          "versions": [
            {
              "min_code_version": "20210224.204120",
              "edition": 1,
              "commit_sha": "abc123",
              "commit_metadata": {
                "committed_at": "2021-06-09T17:23:49+00:00",
                "books": [
                  {"style": "physics", "uuid": "cce64fde-f448-43b8-ae88-27705cceb0da", "slug": "physics"}
                ]
              }
            }
          ]
        }
      ],
      "approved_versions": [
        {"repository_name": "osbooks-physics", "slug": "physics", "commit_sha": "abc123", "min_code_version": "20210224.204120"}
      ]
    }"#;

    const COLLECTION_DOC: &str = r#"{
      "approved_books": [
        {"collection_id": "col11406", "server": "cnx.org", "style": "physics"}
      ],
      "approved_versions": [
        {"collection_id": "col11406", "content_version": "1.20.15", "min_code_version": "20200923.171926"},
        {"collection_id": "col99999", "content_version": "1.1", "min_code_version": "20200923.171926"}
      ]
    }"#;

    #[test]
    fn given_api_version_2_when_decoding_then_selects_repository_schema() {
        let registry: Registry = serde_json::from_str(REPOSITORY_DOC).unwrap();
        assert_eq!(registry.schema(), Schema::Repositories);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn given_repository_names_without_api_version_when_decoding_then_sniffs_repository_schema() {
        let doc = REPOSITORY_DOC.replace("\"api_version\": 2,", "");
        let registry: Registry = serde_json::from_str(&doc).unwrap();
        assert_eq!(registry.schema(), Schema::Repositories);
        assert_eq!(registry.as_repositories().unwrap().api_version(), None);
    }

    #[test]
    fn given_collection_document_when_decoding_then_selects_collection_schema() {
        let registry: Registry = serde_json::from_str(COLLECTION_DOC).unwrap();
        assert_eq!(registry.schema(), Schema::Collections);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn given_empty_document_when_decoding_then_defaults_to_empty_collection_registry() {
        let registry: Registry = serde_json::from_str("{}").unwrap();
        assert_eq!(registry.schema(), Schema::Collections);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn given_registry_when_finding_then_resolves_each_level() {
        let registry: Registry = serde_json::from_str(REPOSITORY_DOC).unwrap();
        let repos = registry.as_repositories().unwrap();

        let version = repos.find_version("osbooks-physics", "abc123").unwrap();
        assert_eq!(version.min_code_version, "20210224.204120");
        let book = repos.find_book("osbooks-physics", "abc123", "physics").unwrap();
        assert_eq!(book.style, "physics");

        assert!(matches!(
            repos.find_version("osbooks-physics", "fff"),
            Err(DomainError::VersionNotFound { .. })
        ));
        assert!(matches!(
            repos.find_book("osbooks-physics", "abc123", "nope"),
            Err(DomainError::BookNotFound { .. })
        ));
        assert!(matches!(
            repos.find_version("nope", "abc123"),
            Err(DomainError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn given_collection_registry_when_asking_for_repositories_then_wrong_schema() {
        let registry: Registry = serde_json::from_str(COLLECTION_DOC).unwrap();
        assert_eq!(
            registry.as_repositories().unwrap_err(),
            DomainError::WrongSchema {
                expected: Schema::Repositories,
                found: Schema::Collections
            }
        );
    }

    #[test]
    fn given_consistent_registry_when_auditing_then_reports_nothing() {
        let registry: Registry = serde_json::from_str(REPOSITORY_DOC).unwrap();
        assert!(registry.audit().is_empty());
    }

    #[test]
    fn given_drifted_index_when_auditing_then_reports_missing_stale_and_duplicate() {
        let mut registry: RepositoryRegistry = match serde_json::from_str(REPOSITORY_DOC).unwrap() {
            Registry::Repositories(r) => r,
            Registry::Collections(_) => unreachable!(),
        };
        let mut stale = registry.book_index().next().unwrap().clone();
        stale.slug = "gone".into();
        registry.index = vec![IndexEntry::Book(stale.clone()), IndexEntry::Book(stale.clone())];

        let issues = registry.audit();
        assert!(issues.contains(&IndexIssue::Stale(stale.clone())));
        assert!(issues.contains(&IndexIssue::Duplicate(stale)));
        assert!(issues
            .iter()
            .any(|i| matches!(i, IndexIssue::Missing(e) if e.slug == "physics")));
    }

    const MIXED_DOC: &str = r#"{
      "api_version": 2,
      "approved_books": [
        {"collection_id": "col11406", "server": "cnx.org", "style": "physics", "tutor_only": false},
        {
          "repository_name": "osbooks-physics",
          "platforms": ["REX"],
          "versions": [
            {
              "min_code_version": "20210224.204120",
              "edition": 1,
              "commit_sha": "abc123",
              "commit_metadata": {
                "committed_at": "2021-06-09T17:23:49Z",
                "books": [{"style": "physics", "uuid": "u-1", "slug": "physics"}]
              }
            }
          ]
        }
      ],
      "approved_versions": [
        {"collection_id": "col11406", "content_version": "1.20.15", "min_code_version": "20200923.171926"},
        {"repository_name": "osbooks-physics", "slug": "physics", "commit_sha": "abc123", "min_code_version": "20210224.204120"}
      ]
    }"#;

    #[test]
    fn given_collection_entries_in_repository_schema_when_decoding_then_keeps_and_counts_them() {
        let registry: Registry = serde_json::from_str(MIXED_DOC).unwrap();

        assert_eq!(registry.schema(), Schema::Repositories);
        assert_eq!(registry.count(), 2);
        let repos = registry.as_repositories().unwrap();
        assert_eq!(repos.approved_books().len(), 2);
        assert_eq!(repos.collections().next().unwrap().collection_id, "col11406");
        assert!(repos.find_book("osbooks-physics", "abc123", "physics").is_ok());
        assert_eq!(repos.book_index().count(), 1);
    }

    #[test]
    fn given_collection_entries_in_repository_schema_when_auditing_then_not_reported() {
        let registry: Registry = serde_json::from_str(MIXED_DOC).unwrap();
        assert!(registry.audit().is_empty());
    }

    #[test]
    fn given_only_collection_approvals_with_api_version_2_when_decoding_then_succeeds() {
        let doc = r#"{
          "api_version": 2,
          "approved_books": [{"collection_id": "col11406", "server": "cnx.org"}],
          "approved_versions": [
            {"collection_id": "col11406", "content_version": "1.20.15", "min_code_version": "20200923.171926"}
          ]
        }"#;
        let registry: Registry = serde_json::from_str(doc).unwrap();
        assert_eq!(registry.schema(), Schema::Repositories);
        assert_eq!(registry.count(), 1);
        assert!(registry.audit().is_empty());
    }

    #[test]
    fn given_unlisted_collection_approval_when_auditing_then_reports_orphan() {
        let registry: Registry = serde_json::from_str(COLLECTION_DOC).unwrap();
        let issues = registry.audit();
        assert_eq!(issues.len(), 1);
        assert!(matches!(&issues[0], IndexIssue::Orphaned(a) if a.collection_id == "col99999"));
    }
}
