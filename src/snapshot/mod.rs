//! Build-time post snapshot
//!
//! `folio build` ingests the content directory once and writes every post
//! that passed validation to a JSON file. A server started without
//! `--live` serves from this file instead of the filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::PostEntry;

/// Snapshot load/save failures
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot not found at {0}; run `folio build` first")]
    Missing(PathBuf),

    #[error("snapshot at {path} has format version {found}, expected {expected}; run `folio build` again")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("snapshot at {0} contains no posts")]
    Empty(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Every successfully parsed post at build time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub posts: Vec<PostEntry>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Snapshot {
    /// Current snapshot format version
    pub const VERSION: u32 = 1;

    pub fn new(posts: Vec<PostEntry>) -> Self {
        let mut snapshot = Self {
            version: Self::VERSION,
            generated_at: Utc::now(),
            posts,
            index: HashMap::new(),
        };
        snapshot.reindex();
        snapshot
    }

    fn reindex(&mut self) {
        self.index = self
            .posts
            .iter()
            .enumerate()
            .map(|(i, post)| (post.slug.clone(), i))
            .collect();
    }

    /// Look a post up by slug
    pub fn get(&self, slug: &str) -> Option<&PostEntry> {
        self.index.get(slug).map(|&i| &self.posts[i])
    }

    /// Load a snapshot from disk
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|source| SnapshotError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if snapshot.version != Self::VERSION {
            return Err(SnapshotError::VersionMismatch {
                path: path.to_path_buf(),
                found: snapshot.version,
                expected: Self::VERSION,
            });
        }

        if snapshot.posts.is_empty() {
            return Err(SnapshotError::Empty(path.to_path_buf()));
        }

        snapshot.reindex();
        tracing::debug!(
            "Loaded snapshot with {} posts from {:?} (generated {})",
            snapshot.posts.len(),
            path,
            snapshot.generated_at
        );

        Ok(snapshot)
    }

    /// Save the snapshot, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Access, PostFrontmatter};
    use crate::helpers::parse_iso8601;

    fn entry(slug: &str, date: Option<&str>) -> PostEntry {
        PostEntry {
            slug: slug.to_string(),
            path: format!("posts/{}/index.md", slug),
            sha: "0".repeat(64),
            frontmatter: PostFrontmatter {
                title: format!("Post {}", slug),
                access: Access::Public,
                description: Some("d".to_string()),
                thumbnail: None,
                topics: Some(vec!["rust".to_string()]),
                date: date.and_then(parse_iso8601),
                password: None,
            },
            content: format!("# {}\n", slug),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".folio/posts.json");

        let snapshot = Snapshot::new(vec![
            entry("a", Some("2024-03-05T12:30:15+01:00")),
            entry("b", None),
        ]);
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded.posts, snapshot.posts);
        assert_eq!(loaded.get("a").unwrap().frontmatter.date, snapshot.posts[0].frontmatter.date);
        assert!(loaded.get("b").is_some());
        assert!(loaded.get("c").is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Snapshot::load(&dir.path().join("posts.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Missing(_)));
        assert!(err.to_string().contains("folio build"));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        let mut snapshot = Snapshot::new(vec![entry("a", None)]);
        snapshot.version = 99;
        snapshot.save(&path).unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::VersionMismatch { found: 99, .. }));
    }

    #[test]
    fn test_empty_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        Snapshot::new(Vec::new()).save(&path).unwrap();

        assert!(matches!(Snapshot::load(&path), Err(SnapshotError::Empty(_))));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Snapshot::load(&path), Err(SnapshotError::Json { .. })));
    }
}
