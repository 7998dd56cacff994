//! In-process key-value cache with optional expiry.
//!
//! Values are JSON documents; object-valued entries additionally support
//! reading, writing and deleting one element at a time, which is how the
//! per-user aggregates (post counts, vote budgets, unread indicators) are
//! stored without rewriting the whole map on every change.

use crate::utils::now_unix;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Well-known cache keys shared between the services that write them and
/// the read paths that serve them.
pub mod keys {
    pub const FORUM_THREADS_COUNT: &str = "forum.threadscount";
    pub const FORUM_POSTS_COUNT: &str = "forum.postscount";
    pub const USER_POSTS_COUNT: &str = "user.postscount";
    pub const USER_NEW_MESSAGES: &str = "user.newmessages";

    pub fn user_votes(user_id: i64) -> String {
        format!("user.votes.{user_id}")
    }
}

struct Entry {
    value: Value,
    expires_at: Option<i64>,
}

#[derive(Default)]
pub struct ForumCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ForumCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, now_unix())
    }

    pub fn set(&self, key: &str, value: Value, ttl_secs: Option<i64>) {
        let expires_at = ttl_secs.map(|ttl| now_unix() + ttl);
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(key.to_string(), Entry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.remove(key);
    }

    pub fn get_element(&self, key: &str, field: &str) -> Option<Value> {
        self.get(key)
            .and_then(|value| value.get(field).cloned())
    }

    /// Writes one field of an object-valued entry, creating the entry if it
    /// does not exist. The entry's expiry is left as it was.
    pub fn set_element(&self, key: &str, field: &str, value: Value) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Object(Default::default()),
            expires_at: None,
        });
        if let Value::Object(map) = &mut entry.value {
            map.insert(field.to_string(), value);
        }
    }

    pub fn delete_element(&self, key: &str, field: &str) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        if let Some(entry) = entries.get_mut(key) {
            if let Value::Object(map) = &mut entry.value {
                map.remove(field);
            }
        }
    }

    fn get_at(&self, key: &str, now: i64) -> Option<Value> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|deadline| deadline <= now),
            None => return None,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_key_roundtrip_and_delete() {
        let cache = ForumCache::new();
        cache.set("forum.threadscount", json!(42), None);
        assert_eq!(cache.get("forum.threadscount"), Some(json!(42)));
        cache.delete("forum.threadscount");
        assert_eq!(cache.get("forum.threadscount"), None);
    }

    #[test]
    fn entries_expire_after_their_ttl() {
        let cache = ForumCache::new();
        cache.set("user.votes.7", json!({"count": 3}), Some(3600));
        let now = now_unix();
        assert!(cache.get_at("user.votes.7", now + 3599).is_some());
        assert!(cache.get_at("user.votes.7", now + 3600).is_none());
        // the expired entry is gone, not just hidden
        assert!(cache.get_at("user.votes.7", now).is_none());
    }

    #[test]
    fn element_operations_edit_in_place() {
        let cache = ForumCache::new();
        cache.set_element("user.postscount", "11", json!(5));
        cache.set_element("user.postscount", "12", json!(9));
        assert_eq!(cache.get_element("user.postscount", "11"), Some(json!(5)));
        cache.set_element("user.postscount", "11", json!(6));
        assert_eq!(cache.get_element("user.postscount", "11"), Some(json!(6)));
        cache.delete_element("user.postscount", "11");
        assert_eq!(cache.get_element("user.postscount", "11"), None);
        assert_eq!(cache.get_element("user.postscount", "12"), Some(json!(9)));
    }

    #[test]
    fn set_element_keeps_the_existing_expiry() {
        let cache = ForumCache::new();
        cache.set("user.votes.3", json!({"count": 1, "expire": 0}), Some(60));
        cache.set_element("user.votes.3", "count", json!(2));
        let now = now_unix();
        assert!(cache.get_at("user.votes.3", now + 61).is_none());
    }
}
