//! Tagged, time-limited cache for post reads
//!
//! Entries are stored under a key and labelled with one or more tags.
//! Evicting a tag drops every entry carrying it, so `posts` clears the
//! whole content cache while `post-<slug>` clears a single post.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::content::{PostEntry, PostSummary};

/// Tag carried by every cached read
pub const POSTS_TAG: &str = "posts";

/// Cache key for the full post list
pub const LIST_KEY: &str = "posts:list";

/// Tag scoped to one post
pub fn post_tag(slug: &str) -> String {
    format!("post-{}", slug)
}

/// Cache key for one post
pub fn post_key(slug: &str) -> String {
    format!("post:{}", slug)
}

/// Values the repository memoizes
#[derive(Debug, Clone)]
pub enum Cached {
    List(Arc<Vec<PostSummary>>),
    Post(Arc<PostEntry>),
}

/// Storage used by the repository; swap in a stub for tests
pub trait TagCache: Send + Sync {
    /// Live value for `key`, if any
    fn get(&self, key: &str) -> Option<Cached>;

    /// Store `value` under `key`, labelled with `tags`, for `ttl`
    fn set(&self, key: &str, value: Cached, tags: &[String], ttl: Duration);

    /// Drop every entry carrying `tag`; returns how many were removed
    fn invalidate(&self, tag: &str) -> usize;
}

#[derive(Debug)]
struct Slot {
    value: Cached,
    tags: Vec<String>,
    expires_at: Instant,
}

/// In-process [`TagCache`]
#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // a panic elsewhere cannot leave a slot half-written
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TagCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Cached> {
        let mut slots = self.slots();
        let expired = match slots.get(key) {
            None => return None,
            Some(slot) => Instant::now() >= slot.expires_at,
        };

        if expired {
            slots.remove(key);
            tracing::debug!("Cache entry expired: {}", key);
            return None;
        }

        slots.get(key).map(|slot| slot.value.clone())
    }

    fn set(&self, key: &str, value: Cached, tags: &[String], ttl: Duration) {
        let slot = Slot {
            value,
            tags: tags.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.slots().insert(key.to_string(), slot);
    }

    fn invalidate(&self, tag: &str) -> usize {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|_, slot| !slot.tags.iter().any(|t| t == tag));
        let removed = before - slots.len();
        tracing::debug!("Invalidated tag {:?}: {} entries", tag, removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Cached {
        Cached::List(Arc::new(Vec::new()))
    }

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_get_and_set() {
        let cache = MemoryCache::new();
        assert!(cache.get(LIST_KEY).is_none());

        cache.set(LIST_KEY, list(), &tags(&[POSTS_TAG]), Duration::from_secs(60));
        assert!(matches!(cache.get(LIST_KEY), Some(Cached::List(_))));
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = MemoryCache::new();
        cache.set(LIST_KEY, list(), &tags(&[POSTS_TAG]), Duration::ZERO);

        assert!(cache.get(LIST_KEY).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_slug_tag_only_clears_that_post() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set(LIST_KEY, list(), &tags(&[POSTS_TAG]), ttl);
        cache.set(&post_key("a"), list(), &[POSTS_TAG.to_string(), post_tag("a")], ttl);
        cache.set(&post_key("b"), list(), &[POSTS_TAG.to_string(), post_tag("b")], ttl);

        assert_eq!(cache.invalidate(&post_tag("a")), 1);
        assert!(cache.get(&post_key("a")).is_none());
        assert!(cache.get(&post_key("b")).is_some());
        assert!(cache.get(LIST_KEY).is_some());
    }

    #[test]
    fn test_posts_tag_clears_everything() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set(LIST_KEY, list(), &tags(&[POSTS_TAG]), ttl);
        cache.set(&post_key("a"), list(), &[POSTS_TAG.to_string(), post_tag("a")], ttl);

        assert_eq!(cache.invalidate(POSTS_TAG), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_tag_is_a_no_op() {
        let cache = MemoryCache::new();
        cache.set(LIST_KEY, list(), &tags(&[POSTS_TAG]), Duration::from_secs(60));
        assert_eq!(cache.invalidate("post-nope"), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_and_tags() {
        assert_eq!(post_tag("hello"), "post-hello");
        assert_eq!(post_key("hello"), "post:hello");
    }
}
