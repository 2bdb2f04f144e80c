//! Post models

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::frontmatter::{Access, PostFrontmatter};

/// A fully parsed post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostEntry {
    /// Directory name, unique per post
    pub slug: String,

    /// Logical location, e.g. `posts/hello/index.md`
    pub path: String,

    /// SHA-256 of the raw source, used as a change fingerprint
    pub sha: String,

    /// Validated front-matter
    pub frontmatter: PostFrontmatter,

    /// Markdown body, unrendered
    pub content: String,
}

impl PostEntry {
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            slug: self.slug.clone(),
            path: self.path.clone(),
            sha: self.sha.clone(),
            frontmatter: self.frontmatter.clone(),
        }
    }

    pub fn access(&self) -> Access {
        self.frontmatter.access
    }
}

/// A post without its body, as returned by list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    pub path: String,
    pub sha: String,
    pub frontmatter: PostFrontmatter,
}

impl PostSummary {
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.frontmatter.date
    }

    /// Same summary with the password stripped
    pub fn redacted(&self) -> Self {
        Self {
            frontmatter: self.frontmatter.redacted(),
            ..self.clone()
        }
    }
}

/// Newest first; undated posts sort after every dated one
pub fn by_date_desc(a: &PostSummary, b: &PostSummary) -> Ordering {
    match (a.date(), b.date()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Public posts only, newest first
pub fn public_posts(posts: &[PostSummary]) -> Vec<PostSummary> {
    let mut public: Vec<_> = posts
        .iter()
        .filter(|post| post.frontmatter.access == Access::Public)
        .cloned()
        .collect();
    // stable, so undated posts keep their input order
    public.sort_by(by_date_desc);
    public
}
