//! Post repository - cached list and lookup over a post source

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{self, Cached, TagCache, LIST_KEY, POSTS_TAG};
use crate::content::{
    normalize_slug, public_posts, ContentLoader, EntryError, LoadError, PostEntry, PostSummary,
};
use crate::snapshot::Snapshot;

/// Where posts come from
#[derive(Debug, Clone)]
pub enum PostSource {
    /// Read the content directory on every cache miss
    Live(ContentLoader),
    /// Serve the pre-built snapshot
    Snapshot(Arc<Snapshot>),
}

/// Listing failed as a whole
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result of looking a post up by slug
#[derive(Debug, Clone)]
pub enum PostLookup {
    Found(Arc<PostEntry>),
    NotFound,
}

impl PostLookup {
    pub fn found(self) -> Option<Arc<PostEntry>> {
        match self {
            PostLookup::Found(entry) => Some(entry),
            PostLookup::NotFound => None,
        }
    }
}

/// Cached access to posts
#[derive(Clone)]
pub struct PostRepository {
    source: PostSource,
    cache: Arc<dyn TagCache>,
    ttl: Duration,
}

impl PostRepository {
    pub fn new(source: PostSource, cache: Arc<dyn TagCache>, ttl: Duration) -> Self {
        Self { source, cache, ttl }
    }

    /// Every post that parsed successfully, in slug order
    pub async fn list_posts(&self) -> Result<Arc<Vec<PostSummary>>, RepositoryError> {
        if let Some(Cached::List(posts)) = self.cache.get(LIST_KEY) {
            tracing::debug!("Cache hit: {}", LIST_KEY);
            return Ok(posts);
        }

        let posts: Vec<PostSummary> = match &self.source {
            PostSource::Live(loader) => loader
                .load_posts()
                .await?
                .iter()
                .map(PostEntry::summary)
                .collect(),
            PostSource::Snapshot(snapshot) => {
                snapshot.posts.iter().map(PostEntry::summary).collect()
            }
        };

        let posts = Arc::new(posts);
        self.cache.set(
            LIST_KEY,
            Cached::List(Arc::clone(&posts)),
            &[POSTS_TAG.to_string()],
            self.ttl,
        );

        Ok(posts)
    }

    /// Public posts, newest first, undated last
    pub async fn list_public_posts(&self) -> Result<Vec<PostSummary>, RepositoryError> {
        let posts = self.list_posts().await?;
        Ok(public_posts(&posts))
    }

    /// Look a post up, keeping the reason when it is not available
    pub async fn lookup_post(&self, slug: &str) -> Result<Arc<PostEntry>, EntryError> {
        let slug = normalize_slug(slug).map_err(|_| EntryError::InvalidSlug(slug.to_string()))?;
        let key = cache::post_key(&slug);
        if let Some(Cached::Post(entry)) = self.cache.get(&key) {
            tracing::debug!("Cache hit: {}", key);
            return Ok(entry);
        }

        let entry = match &self.source {
            PostSource::Live(loader) => Arc::new(loader.load_entry(&slug).await?),
            PostSource::Snapshot(snapshot) => match snapshot.get(&slug) {
                Some(entry) => Arc::new(entry.clone()),
                None => return Err(EntryError::NotFound { path: slug }),
            },
        };

        let tags = [POSTS_TAG.to_string(), cache::post_tag(&entry.slug)];
        self.cache
            .set(&key, Cached::Post(Arc::clone(&entry)), &tags, self.ttl);

        Ok(entry)
    }

    /// Look a post up; every failure reads as not found to the caller
    pub async fn get_post_by_slug(&self, slug: &str) -> PostLookup {
        match self.lookup_post(slug).await {
            Ok(entry) => PostLookup::Found(entry),
            Err(e) => {
                e.log(slug);
                PostLookup::NotFound
            }
        }
    }

    /// Evict cached reads carrying `tag`
    pub fn invalidate(&self, tag: &str) -> usize {
        let removed = self.cache.invalidate(tag);
        tracing::info!("Revalidated {:?} ({} cache entries)", tag, removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::content::Access;
    use std::fs;
    use std::path::Path;

    fn write_post(root: &Path, slug: &str, source: &str) {
        let dir = root.join(slug);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.md"), source).unwrap();
    }

    fn live_repo(root: &Path) -> (PostRepository, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let repo = PostRepository::new(
            PostSource::Live(ContentLoader::new(root, "posts", "index.md")),
            cache.clone(),
            Duration::from_secs(3600),
        );
        (repo, cache)
    }

    fn seed(root: &Path) {
        write_post(root, "jan", "---\ntitle: Jan\naccess: public\ndate: 2024-01-01\n---\njan\n");
        write_post(root, "jun", "---\ntitle: Jun\naccess: public\ndate: 2024-06-01\n---\njun\n");
        write_post(root, "dec", "---\ntitle: Dec\naccess: private\ndate: 2024-12-01\n---\ndec\n");
        write_post(root, "undated", "---\ntitle: Undated\naccess: public\n---\nundated\n");
    }

    #[tokio::test]
    async fn test_list_public_posts() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (repo, _) = live_repo(dir.path());

        let slugs: Vec<_> = repo
            .list_public_posts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["jun", "jan", "undated"]);
    }

    #[tokio::test]
    async fn test_list_posts_tolerates_invalid_post() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "---\ntitle: A\n---\n");
        write_post(dir.path(), "b", "---\ndescription: no title\n---\n");
        write_post(dir.path(), "c", "---\ntitle: C\n---\n");
        let (repo, _) = live_repo(dir.path());

        let posts = repo.list_posts().await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_list_is_cached_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (repo, _) = live_repo(dir.path());

        assert_eq!(repo.list_posts().await.unwrap().len(), 4);

        write_post(dir.path(), "new", "---\ntitle: New\n---\n");
        assert_eq!(repo.list_posts().await.unwrap().len(), 4);

        assert_eq!(repo.invalidate(POSTS_TAG), 1);
        assert_eq!(repo.list_posts().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_get_post_by_slug() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (repo, _) = live_repo(dir.path());

        let entry = repo.get_post_by_slug("jun").await.found().unwrap();
        assert_eq!(entry.frontmatter.title, "Jun");
        assert_eq!(entry.content, "jun\n");
        assert_eq!(entry.access(), Access::Public);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_both_read_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        write_post(dir.path(), "broken", "---\naccess: nope\n---\n");
        let (repo, _) = live_repo(dir.path());

        assert!(matches!(repo.get_post_by_slug("ghost").await, PostLookup::NotFound));
        assert!(matches!(repo.get_post_by_slug("broken").await, PostLookup::NotFound));
        assert!(matches!(
            repo.get_post_by_slug("../../etc/passwd").await,
            PostLookup::NotFound
        ));

        // the detailed form still tells them apart
        assert!(repo.lookup_post("broken").await.unwrap_err().is_validation());
        assert!(matches!(
            repo.lookup_post("ghost").await,
            Err(EntryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_slug_tag_evicts_one_post_only() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (repo, cache) = live_repo(dir.path());

        repo.list_posts().await.unwrap();
        repo.get_post_by_slug("jan").await;
        repo.get_post_by_slug("jun").await;
        assert_eq!(cache.len(), 3);

        write_post(dir.path(), "jan", "---\ntitle: Jan v2\naccess: public\n---\n");
        assert_eq!(repo.invalidate(&cache::post_tag("jan")), 1);
        assert_eq!(cache.len(), 2);

        let jan = repo.get_post_by_slug("jan").await.found().unwrap();
        assert_eq!(jan.frontmatter.title, "Jan v2");
    }

    #[tokio::test]
    async fn test_hidden_directory_is_not_served() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a", "---\ntitle: A\naccess: public\n---\na\n");
        write_post(dir.path(), ".drafts", "---\ntitle: Draft\naccess: public\n---\nwip\n");
        let (repo, cache) = live_repo(dir.path());

        let posts = repo.list_posts().await.unwrap();
        let listed: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(listed, vec!["a"]);

        assert!(matches!(repo.get_post_by_slug(".drafts").await, PostLookup::NotFound));
        assert!(matches!(
            repo.lookup_post(".drafts").await,
            Err(EntryError::InvalidSlug(_))
        ));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_padded_slug_shares_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (repo, cache) = live_repo(dir.path());

        repo.list_posts().await.unwrap();
        let padded = repo.get_post_by_slug(" jan ").await.found().unwrap();
        let plain = repo.get_post_by_slug("jan").await.found().unwrap();

        assert_eq!(padded.slug, "jan");
        assert!(Arc::ptr_eq(&padded, &plain));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let (repo, cache) = live_repo(dir.path());

        assert!(matches!(repo.get_post_by_slug("later").await, PostLookup::NotFound));
        assert!(cache.is_empty());

        write_post(dir.path(), "later", "---\ntitle: Later\n---\n");
        assert!(repo.get_post_by_slug("later").await.found().is_some());
    }

    #[tokio::test]
    async fn test_snapshot_source() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let posts = ContentLoader::new(dir.path(), "posts", "index.md")
            .load_posts()
            .await
            .unwrap();
        let snapshot = Arc::new(Snapshot::new(posts));

        let repo = PostRepository::new(
            PostSource::Snapshot(snapshot),
            Arc::new(MemoryCache::new()),
            Duration::from_secs(60),
        );

        let slugs: Vec<_> = repo
            .list_public_posts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["jun", "jan", "undated"]);
        assert!(repo.get_post_by_slug("dec").await.found().is_some());
        assert!(matches!(repo.get_post_by_slug("nope").await, PostLookup::NotFound));
    }

    #[tokio::test]
    async fn test_empty_content_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "bad", "nothing here\n");
        let (repo, _) = live_repo(dir.path());

        assert!(repo.list_posts().await.is_err());
    }
}
