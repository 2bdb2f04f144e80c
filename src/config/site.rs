//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `content_dir`
pub const ENV_CONTENT_DIR: &str = "FOLIO_CONTENT_DIR";
/// Environment variable overriding `posts_dir`
pub const ENV_POSTS_DIR: &str = "FOLIO_POSTS_DIR";
/// Environment variable overriding `snapshot_path`
pub const ENV_SNAPSHOT_PATH: &str = "FOLIO_SNAPSHOT_PATH";
/// Environment variable overriding `revalidate_token`
pub const ENV_REVALIDATE_TOKEN: &str = "FOLIO_REVALIDATE_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,

    // Directory
    /// Root of the checked-out content repository
    pub content_dir: String,
    /// Posts directory, relative to `content_dir`
    pub posts_dir: String,
    /// File name every post directory must contain
    pub entry_file: String,
    /// Where `build` writes the post snapshot
    pub snapshot_path: String,

    // Caching
    pub cache_ttl_secs: u64,

    // Protected posts
    pub credential_max_age_secs: u64,

    /// Shared secret for the revalidate endpoint; disabled when unset
    pub revalidate_token: Option<String>,

    // Date format used by the CLI listing
    pub date_format: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Folio".to_string(),
            description: String::new(),

            content_dir: "content".to_string(),
            posts_dir: "posts".to_string(),
            entry_file: "index.md".to_string(),
            snapshot_path: ".folio/posts.json".to_string(),

            cache_ttl_secs: 60 * 60,
            credential_max_age_secs: 12 * 60 * 60,
            revalidate_token: None,

            date_format: "YYYY-MM-DD".to_string(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = if content.trim().is_empty() {
            SiteConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// Apply `FOLIO_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_CONTENT_DIR) {
            tracing::debug!("{} overrides content_dir: {}", ENV_CONTENT_DIR, dir);
            self.content_dir = dir;
        }
        if let Some(dir) = get(ENV_POSTS_DIR) {
            tracing::debug!("{} overrides posts_dir: {}", ENV_POSTS_DIR, dir);
            self.posts_dir = dir;
        }
        if let Some(path) = get(ENV_SNAPSHOT_PATH) {
            self.snapshot_path = path;
        }
        if let Some(token) = get(ENV_REVALIDATE_TOKEN) {
            self.revalidate_token = Some(token);
        }
    }

    /// Time-to-live for cached list and post reads
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Absolute lifetime of a protected-post credential
    pub fn credential_max_age(&self) -> Duration {
        Duration::from_secs(self.credential_max_age_secs)
    }
}
