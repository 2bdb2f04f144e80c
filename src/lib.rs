//! folio: a Markdown blog content service
//!
//! Posts live in `<content_dir>/<posts_dir>/<slug>/<entry_file>`, each with a
//! YAML front-matter block. This crate discovers and validates them, caches
//! the parsed records, and serves them with public, unlisted, private and
//! password-protected access tiers.

pub mod access;
pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod helpers;
pub mod repository;
pub mod server;
pub mod snapshot;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::access::AccessGate;
use crate::cache::MemoryCache;
use crate::content::ContentLoader;
use crate::repository::{PostRepository, PostSource};
use crate::snapshot::Snapshot;

/// The main Folio application
#[derive(Debug, Clone)]
pub struct Folio {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content repository checkout
    pub content_dir: PathBuf,
    /// Directory holding one subdirectory per post
    pub posts_root: PathBuf,
    /// Build-time snapshot file
    pub snapshot_path: PathBuf,
}

impl Folio {
    /// Create a new Folio instance from a directory.
    ///
    /// Reads `_config.yml` when present, then applies `FOLIO_*` overrides.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an already-built configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let content_dir = base_dir.join(&config.content_dir);
        let posts_root = content_dir.join(&config.posts_dir);
        let snapshot_path = base_dir.join(&config.snapshot_path);

        Self {
            config,
            base_dir,
            content_dir,
            posts_root,
            snapshot_path,
        }
    }

    /// Loader reading straight from the posts directory
    pub fn loader(&self) -> ContentLoader {
        ContentLoader::new(
            &self.posts_root,
            &self.config.posts_dir,
            &self.config.entry_file,
        )
    }

    /// Repository over the live filesystem
    pub fn live_repository(&self) -> PostRepository {
        self.repository(PostSource::Live(self.loader()))
    }

    /// Repository over the build-time snapshot
    pub fn snapshot_repository(&self) -> Result<PostRepository> {
        let snapshot = Snapshot::load(&self.snapshot_path)?;
        Ok(self.repository(PostSource::Snapshot(Arc::new(snapshot))))
    }

    fn repository(&self, source: PostSource) -> PostRepository {
        PostRepository::new(
            source,
            Arc::new(MemoryCache::new()),
            self.config.cache_ttl(),
        )
    }

    /// Gate for protected posts
    pub fn gate(&self) -> AccessGate {
        AccessGate::new(self.config.credential_max_age())
    }

    /// Ingest the content directory and write the snapshot
    pub async fn build(&self) -> Result<commands::build::BuildReport> {
        commands::build::run(self).await
    }

    /// Remove build artifacts
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_config() {
        let config = config::SiteConfig {
            content_dir: "blog-content".to_string(),
            posts_dir: "writing".to_string(),
            ..Default::default()
        };
        let folio = Folio::with_config("/srv/site", config);

        assert_eq!(folio.content_dir, PathBuf::from("/srv/site/blog-content"));
        assert_eq!(folio.posts_root, PathBuf::from("/srv/site/blog-content/writing"));
        assert_eq!(folio.snapshot_path, PathBuf::from("/srv/site/.folio/posts.json"));
    }

    #[test]
    fn test_absolute_content_dir_wins() {
        let config = config::SiteConfig {
            content_dir: "/data/content".to_string(),
            ..Default::default()
        };
        let folio = Folio::with_config("/srv/site", config);
        assert_eq!(folio.posts_root, PathBuf::from("/data/content/posts"));
    }
}
