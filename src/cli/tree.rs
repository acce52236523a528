//! Tree rendering of the ABL

use termtree::Tree;

use crate::domain::{ApprovedBook, Registry};

/// Render repositories → versions → books, or collections → approved versions.
pub fn render(registry: &Registry) -> Tree<String> {
    let root = format!("ABL ({} book versions)", registry.count());
    match registry {
        Registry::Repositories(abl) => {
            let entries = abl.approved_books().iter().map(|entry| {
                let repo = match entry {
                    ApprovedBook::Repository(repo) => repo,
                    ApprovedBook::Collection(c) => {
                        return Tree::new(format!("{} (collection)", c.collection_id));
                    }
                };
                let label = if repo.platforms.is_empty() {
                    repo.name.clone()
                } else {
                    format!("{} [{}]", repo.name, repo.platforms.join(", "))
                };
                let versions = repo.versions.iter().map(|v| {
                    let label = format!(
                        "{} (edition {}, min code {}, {})",
                        v.commit_sha,
                        v.edition,
                        v.min_code_version,
                        v.committed_at().format("%Y-%m-%d")
                    );
                    let books = v
                        .books()
                        .iter()
                        .map(|b| Tree::new(format!("{} ({}, {})", b.slug, b.style, b.uuid)));
                    Tree::new(label).with_leaves(books)
                });
                Tree::new(label).with_leaves(versions)
            });
            Tree::new(root).with_leaves(entries)
        }
        Registry::Collections(abl) => {
            let collections = abl.collections().iter().map(|c| {
                let approvals = abl
                    .approvals()
                    .iter()
                    .filter(|a| a.collection_id == c.collection_id)
                    .map(|a| {
                        Tree::new(format!(
                            "{} (min code {})",
                            a.content_version, a.min_code_version
                        ))
                    });
                Tree::new(c.collection_id.clone()).with_leaves(approvals)
            });
            Tree::new(root).with_leaves(collections)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{Book, Collection, Release, Repository, RepositoryRegistry, Version};

    #[test]
    fn given_repository_registry_when_rendering_then_nests_books_under_versions() {
        let release = Release {
            min_code_version: "20210224.204120".into(),
            edition: 2,
            committed_at: Utc.with_ymd_and_hms(2021, 6, 9, 0, 0, 0).unwrap(),
        };
        let mut repo = Repository::new("osbooks-physics", ["REX"]);
        repo.versions.push(Version::new(
            "abc123",
            &release,
            vec![Book::new("physics", "u-1", "physics")],
        ));
        let registry = Registry::from(RepositoryRegistry::new(Some(2), vec![repo]));

        let rendered = render(&registry).to_string();

        assert!(rendered.starts_with("ABL (1 book versions)"));
        assert!(rendered.contains("osbooks-physics [REX]"));
        assert!(rendered.contains("abc123 (edition 2, min code 20210224.204120, 2021-06-09)"));
        assert!(rendered.contains("physics (physics, u-1)"));
    }

    #[test]
    fn given_collection_entry_in_repository_registry_when_rendering_then_listed() {
        let mut abl = RepositoryRegistry::new(Some(2), vec![Repository::new("osbooks-physics", ["REX"])]);
        abl.entries.push(ApprovedBook::Collection(Collection::new("col11406")));

        let rendered = render(&Registry::from(abl)).to_string();

        assert!(rendered.contains("col11406 (collection)"));
        assert!(rendered.contains("osbooks-physics [REX]"));
    }
}
