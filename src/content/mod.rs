//! Content module - discovery, parsing and validation of posts

pub mod discovery;
mod frontmatter;
pub mod loader;
mod parser;
mod post;

pub use discovery::{discover_slugs, normalize_slug, resolve_post_path, DiscoveryError};
pub use frontmatter::{
    validate_frontmatter, Access, PostFrontmatter, ValidationError, ValidationIssue,
};
pub use loader::{ContentLoader, EntryError, LoadError};
pub use parser::{parse_post, split_frontmatter, ParsedPost};
pub use post::{by_date_desc, public_posts, PostEntry, PostSummary};
