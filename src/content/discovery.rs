//! Content discovery - finds post directories under the posts root

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Errors raised while locating posts on disk
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("content directory not found: {0} (check content_dir / posts_dir)")]
    RootMissing(PathBuf),

    #[error("no posts found under {root}: expected {root}/<slug>/{entry_file}")]
    NoPosts { root: PathBuf, entry_file: String },

    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate a slug and return its normalized form.
///
/// Rejects empty names, hidden names (including `.` and `..`), and anything
/// containing a path separator or NUL. Discovery skips the same names.
pub fn normalize_slug(slug: &str) -> Result<String, DiscoveryError> {
    let trimmed = slug.trim();
    let invalid = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\', '\0']);

    if invalid {
        Err(DiscoveryError::InvalidSlug(slug.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

/// List every slug under `root` that has an `entry_file`, sorted.
pub fn discover_slugs(root: &Path, entry_file: &str) -> Result<Vec<String>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::RootMissing(root.to_path_buf()));
    }

    let mut slugs = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!("Skipping non UTF-8 directory name {:?}", entry.path());
            continue;
        };

        if name.starts_with('.') {
            continue;
        }

        let slug = match normalize_slug(name) {
            Ok(slug) if slug == name => slug,
            _ => {
                tracing::warn!("Skipping directory with unusable slug {:?}", name);
                continue;
            }
        };

        if !entry.path().join(entry_file).is_file() {
            tracing::warn!(
                "Skipping {:?}: no {} inside {:?}",
                slug,
                entry_file,
                entry.path()
            );
            continue;
        }

        slugs.push(slug);
    }

    if slugs.is_empty() {
        return Err(DiscoveryError::NoPosts {
            root: root.to_path_buf(),
            entry_file: entry_file.to_string(),
        });
    }

    slugs.sort();
    tracing::debug!("Discovered {} post directories in {:?}", slugs.len(), root);

    Ok(slugs)
}

/// Resolve the entry file of `slug`, refusing anything that escapes `root`.
pub fn resolve_post_path(
    root: &Path,
    slug: &str,
    entry_file: &str,
) -> Result<PathBuf, DiscoveryError> {
    let invalid = || DiscoveryError::InvalidSlug(slug.to_string());

    let slug = normalize_slug(slug)?;
    let root_norm = normalize_lexically(root);
    let candidate = normalize_lexically(&root.join(&slug).join(entry_file));

    if !candidate.starts_with(&root_norm) || candidate == root_norm {
        return Err(invalid());
    }

    // Symlinks can still point outside; compare real paths when they exist
    if let (Ok(real_root), Ok(real_candidate)) = (root.canonicalize(), candidate.canonicalize()) {
        if !real_candidate.starts_with(&real_root) {
            return Err(invalid());
        }
    }

    Ok(candidate)
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
