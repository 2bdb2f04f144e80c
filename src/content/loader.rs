//! Content loader - reads and validates posts from the posts directory

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use super::discovery::{self, DiscoveryError};
use super::frontmatter::ValidationError;
use super::parser::parse_post;
use super::post::PostEntry;
use crate::helpers::sha256_hex;

/// Why a single post could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),

    #[error("post not found: {path}")]
    NotFound { path: String },

    #[error("{path}: {source}")]
    Validation {
        path: String,
        #[source]
        source: ValidationError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("loading {slug} did not complete: {message}")]
    Task { slug: String, message: String },
}

impl EntryError {
    /// Validation problems are the author's to fix, the rest are operational
    pub fn log(&self, slug: &str) {
        match self {
            EntryError::Validation { path, source } => {
                let issues: Vec<String> = source.issues.iter().map(ToString::to_string).collect();
                tracing::warn!(
                    slug = %slug,
                    path = %path,
                    "Skipping post with invalid frontmatter: {}",
                    issues.join("; ")
                );
            }
            EntryError::InvalidSlug(_) => {
                tracing::warn!(slug = %slug, "{}", self);
            }
            EntryError::NotFound { .. } | EntryError::Io { .. } | EntryError::Task { .. } => {
                tracing::error!(slug = %slug, "{}", self);
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EntryError::Validation { .. })
    }
}

/// Ingestion failed as a whole
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("none of the {attempted} posts under {root} could be loaded")]
    NoValidPosts { root: PathBuf, attempted: usize },
}

/// Outcome of loading one slug during a full pass
pub type EntryOutcome = (String, Result<PostEntry, EntryError>);

/// Loads posts from `<posts_root>/<slug>/<entry_file>`
#[derive(Debug, Clone)]
pub struct ContentLoader {
    posts_root: PathBuf,
    /// Prefix of the logical `path` recorded on each entry
    logical_root: String,
    entry_file: String,
}

impl ContentLoader {
    /// Create a new content loader
    pub fn new<P: AsRef<Path>>(posts_root: P, logical_root: &str, entry_file: &str) -> Self {
        Self {
            posts_root: posts_root.as_ref().to_path_buf(),
            logical_root: logical_root.trim_matches('/').to_string(),
            entry_file: entry_file.to_string(),
        }
    }

    /// Sorted slugs of every post directory
    pub fn discover(&self) -> Result<Vec<String>, DiscoveryError> {
        discovery::discover_slugs(&self.posts_root, &self.entry_file)
    }

    fn logical_path(&self, slug: &str) -> String {
        if self.logical_root.is_empty() {
            format!("{}/{}", slug, self.entry_file)
        } else {
            format!("{}/{}/{}", self.logical_root, slug, self.entry_file)
        }
    }

    /// Load a single post
    pub async fn load_entry(&self, slug: &str) -> Result<PostEntry, EntryError> {
        let file = discovery::resolve_post_path(&self.posts_root, slug, &self.entry_file)
            .map_err(|_| EntryError::InvalidSlug(slug.to_string()))?;
        let slug = discovery::normalize_slug(slug)
            .map_err(|_| EntryError::InvalidSlug(slug.to_string()))?;
        let path = self.logical_path(&slug);

        let raw = match tokio::fs::read_to_string(&file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EntryError::NotFound { path });
            }
            Err(source) => return Err(EntryError::Io { path, source }),
        };

        let sha = sha256_hex(&raw);
        let parsed = parse_post(&raw).map_err(|source| EntryError::Validation {
            path: path.clone(),
            source,
        })?;

        Ok(PostEntry {
            slug,
            path,
            sha,
            frontmatter: parsed.frontmatter,
            content: parsed.content,
        })
    }

    /// Load every discovered post, one task per slug.
    ///
    /// All tasks run to completion; outcomes come back in slug order.
    pub async fn load_all(&self) -> Result<Vec<EntryOutcome>, DiscoveryError> {
        let slugs = self.discover()?;
        let outcomes = settle_all(slugs, |slug| {
            let loader = self.clone();
            async move { loader.load_entry(&slug).await }
        })
        .await;
        Ok(outcomes)
    }

    /// Load all posts, skipping (and logging) the ones that fail
    pub async fn load_posts(&self) -> Result<Vec<PostEntry>, LoadError> {
        let outcomes = self.load_all().await?;
        let attempted = outcomes.len();

        let mut posts = Vec::with_capacity(attempted);
        for (slug, outcome) in outcomes {
            match outcome {
                Ok(entry) => posts.push(entry),
                Err(e) => e.log(&slug),
            }
        }

        if posts.is_empty() {
            return Err(LoadError::NoValidPosts {
                root: self.posts_root.clone(),
                attempted,
            });
        }

        tracing::info!(
            "Loaded {} of {} posts from {:?}",
            posts.len(),
            attempted,
            self.posts_root
        );

        Ok(posts)
    }
}

/// Spawn `load` for every slug and wait for all of them.
///
/// Outcomes follow the order of `slugs`, not completion order.
async fn settle_all<T, F, Fut>(
    slugs: Vec<String>,
    load: F,
) -> Vec<(String, Result<T, EntryError>)>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, EntryError>> + Send + 'static,
{
    let handles: Vec<_> = slugs
        .into_iter()
        .map(|slug| {
            let handle = tokio::spawn(load(slug.clone()));
            (slug, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (slug, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(EntryError::Task {
                slug: slug.clone(),
                message: e.to_string(),
            }),
        };
        outcomes.push((slug, outcome));
    }
    outcomes
}
