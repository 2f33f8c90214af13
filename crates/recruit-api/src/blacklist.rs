//! Refresh token blacklist.
//!
//! Holds the `jti` of every refresh token that was rotated away or logged
//! out. An entry only has to outlive the token it names: once `expires_at`
//! has passed the signature check rejects the token anyway, so expired
//! entries are purged periodically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory blacklist mapping token id to token expiry.
#[derive(Debug, Default)]
pub struct TokenBlacklist {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blacklist `jti`.
    ///
    /// Returns `false` if it was already blacklisted. Check and insert happen
    /// under one write lock, so of two concurrent callers presenting the same
    /// token exactly one gets `true`.
    pub async fn insert(&self, jti: &str, user_id: i64, expires_at: DateTime<Utc>) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(jti) {
            return false;
        }
        entries.insert(jti.to_string(), expires_at);
        debug!(jti, user_id, "Blacklisted refresh token");
        true
    }

    pub async fn contains(&self, jti: &str) -> bool {
        self.entries.read().await.contains_key(jti)
    }

    /// Drop entries whose token has expired. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now()).await
    }

    async fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Purged expired blacklist entries");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_is_single_use() {
        let blacklist = TokenBlacklist::new();
        let exp = Utc::now() + chrono::Duration::hours(1);
        assert!(blacklist.insert("jti-1", 1, exp).await);
        assert!(!blacklist.insert("jti-1", 1, exp).await);
        assert!(blacklist.contains("jti-1").await);
        assert!(!blacklist.contains("jti-2").await);
    }

    #[tokio::test]
    async fn test_concurrent_insert_has_one_winner() {
        let blacklist = Arc::new(TokenBlacklist::new());
        let exp = Utc::now() + chrono::Duration::hours(1);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let blacklist = Arc::clone(&blacklist);
            handles.push(tokio::spawn(async move { blacklist.insert("shared", 7, exp).await }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let blacklist = TokenBlacklist::new();
        let now = Utc::now();
        blacklist.insert("old", 1, now - chrono::Duration::seconds(1)).await;
        blacklist.insert("fresh", 1, now + chrono::Duration::hours(1)).await;
        blacklist.insert("other-user", 2, now + chrono::Duration::hours(1)).await;

        assert_eq!(blacklist.purge_expired_at(now).await, 1);
        assert_eq!(blacklist.len().await, 2);
        assert!(!blacklist.contains("old").await);
        assert!(blacklist.contains("other-user").await);
        assert!(!blacklist.is_empty().await);
    }
}
