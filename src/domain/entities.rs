//! Domain entities: core data structures of the Approved Book List

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One approved content unit within a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Rendering style tag
    pub style: String,
    pub uuid: String,
    /// Unique within a version's books
    pub slug: String,
}

impl Book {
    pub fn new(style: impl Into<String>, uuid: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            uuid: uuid.into(),
            slug: slug.into(),
        }
    }
}

/// Commit details of a version, nested as in the published document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetadata {
    pub committed_at: DateTime<Utc>,
    #[serde(default)]
    pub books: Vec<Book>,
}

/// One released snapshot of a repository.
///
/// A version without books is vacuous and gets dropped by the mutation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Minimum platform version required to render this snapshot
    pub min_code_version: String,
    pub edition: u32,
    pub commit_sha: String,
    pub commit_metadata: CommitMetadata,
}

impl Version {
    /// Create a version carrying `release` metadata and the given books.
    pub fn new(commit_sha: impl Into<String>, release: &Release, books: Vec<Book>) -> Self {
        Self {
            min_code_version: release.min_code_version.clone(),
            edition: release.edition,
            commit_sha: commit_sha.into(),
            commit_metadata: CommitMetadata {
                committed_at: release.committed_at,
                books,
            },
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.commit_metadata.books
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.commit_metadata.committed_at
    }

    pub fn is_vacuous(&self) -> bool {
        self.commit_metadata.books.is_empty()
    }

    pub(crate) fn book_position(&self, slug: &str) -> Option<usize> {
        self.books().iter().position(|b| b.slug == slug)
    }
}

/// Metadata used when an add has to create a version that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub min_code_version: String,
    pub edition: u32,
    pub committed_at: DateTime<Utc>,
}

/// One content source, e.g. a book repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "repository_name")]
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl Repository {
    /// Create an empty repository; duplicate platform tags are dropped, order kept.
    pub fn new<I, S>(name: impl Into<String>, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            platforms: platforms.into_iter().map(Into::into).unique().collect(),
            versions: Vec::new(),
        }
    }

    pub(crate) fn version_position(&self, commit_sha: &str) -> Option<usize> {
        self.versions.iter().position(|v| v.commit_sha == commit_sha)
    }
}

/// Flat index entry of the repository schema: one per approved book-version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryApproval {
    pub repository_name: String,
    pub slug: String,
    pub commit_sha: String,
    pub min_code_version: String,
}

impl RepositoryApproval {
    pub fn matches(&self, repository: &str, commit_sha: &str, slug: &str) -> bool {
        self.repository_name == repository && self.commit_sha == commit_sha && self.slug == slug
    }
}

/// Collection listed in the collection schema.
///
/// Only `collection_id` is interpreted; every other field is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub collection_id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Collection {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            details: Map::new(),
        }
    }
}

/// Approved version of a collection (collection schema flat index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionApproval {
    pub collection_id: String,
    pub content_version: String,
    pub min_code_version: String,
}

impl CollectionApproval {
    pub fn matches(&self, collection_id: &str, content_version: &str) -> bool {
        self.collection_id == collection_id && self.content_version == content_version
    }
}

/// Entry of the repository schema's `approved_books`.
///
/// Published documents still carry collection entries next to repositories.
/// They are kept verbatim and never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApprovedBook {
    Repository(Repository),
    Collection(Collection),
}

impl ApprovedBook {
    pub fn as_repository(&self) -> Option<&Repository> {
        match self {
            ApprovedBook::Repository(r) => Some(r),
            ApprovedBook::Collection(_) => None,
        }
    }

    pub fn as_repository_mut(&mut self) -> Option<&mut Repository> {
        match self {
            ApprovedBook::Repository(r) => Some(r),
            ApprovedBook::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            ApprovedBook::Collection(c) => Some(c),
            ApprovedBook::Repository(_) => None,
        }
    }
}

/// Entry of the repository schema's `approved_versions`: a book approval, or a
/// collection approval carried over from the collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexEntry {
    Book(RepositoryApproval),
    Collection(CollectionApproval),
}

impl IndexEntry {
    pub fn as_book(&self) -> Option<&RepositoryApproval> {
        match self {
            IndexEntry::Book(a) => Some(a),
            IndexEntry::Collection(_) => None,
        }
    }

    pub fn is_book(&self) -> bool {
        self.as_book().is_some()
    }

    pub fn matches_book(&self, repository: &str, commit_sha: &str, slug: &str) -> bool {
        self.as_book()
            .is_some_and(|a| a.matches(repository, commit_sha, slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_duplicate_platforms_when_creating_repository_then_keeps_first_occurrence() {
        let repo = Repository::new("osbooks-physics", ["REX", "CNX", "REX"]);
        assert_eq!(repo.platforms, vec!["REX".to_string(), "CNX".to_string()]);
        assert!(repo.versions.is_empty());
    }

    #[test]
    fn given_version_json_when_deserializing_then_reads_nested_commit_metadata() {
        let json = r#"{
            "min_code_version": "20210224.204120",
            "edition": 2,
            "commit_sha": "7d5ba2c",
            "commit_metadata": {
                "committed_at": "2021-06-09T17:23:49+00:00",
                "books": [{"style": "dummy", "uuid": "u", "slug": "ch01"}]
            }
        }"#;
        let version: Version = serde_json::from_str(json).unwrap();
        assert_eq!(version.commit_sha, "7d5ba2c");
        assert_eq!(version.edition, 2);
        assert_eq!(version.books().len(), 1);
        assert!(!version.is_vacuous());
    }

    #[test]
    fn given_collection_with_extra_fields_when_roundtripping_then_preserves_them() {
        let json = r#"{"collection_id":"col11406","server":"cnx.org","style":"physics","tutor_only":false}"#;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.collection_id, "col11406");
        assert_eq!(collection.details.len(), 3);

        let back: Collection = serde_json::from_str(&serde_json::to_string(&collection).unwrap()).unwrap();
        assert_eq!(back, collection);
    }

    #[test]
    fn given_mixed_approved_books_when_deserializing_then_keeps_both_shapes() {
        let json = r#"[
            {"repository_name": "osbooks-physics", "platforms": ["REX"], "versions": []},
            {"collection_id": "col11406", "server": "cnx.org", "style": "physics"}
        ]"#;
        let entries: Vec<ApprovedBook> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].as_repository().unwrap().name, "osbooks-physics");
        assert_eq!(entries[1].as_collection().unwrap().collection_id, "col11406");
    }

    #[test]
    fn given_collection_approval_when_deserializing_index_entry_then_not_a_book() {
        let json = r#"{"collection_id": "col11406", "content_version": "1.20.15", "min_code_version": "20200923.171926"}"#;
        let entry: IndexEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.is_book());
        assert!(!entry.matches_book("osbooks-physics", "1.20.15", "col11406"));
    }
}
