//! Credential store.
//!
//! Holds at most one [`TokenPair`] for a session. Every write bumps a
//! generation counter so a caller can tell whether the pair changed since it
//! last looked.

use recruit_models::TokenPair;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Slot {
    pair: Option<TokenPair>,
    generation: u64,
}

/// Consistent view of the store at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub pair: Option<TokenPair>,
    pub generation: u64,
}

/// Shared, session-scoped token storage.
#[derive(Default)]
pub struct CredentialStore {
    slot: RwLock<Slot>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored pair.
    pub async fn set(&self, pair: TokenPair) {
        let mut slot = self.slot.write().await;
        slot.pair = Some(pair);
        slot.generation += 1;
        debug!(generation = slot.generation, "Stored token pair");
    }

    /// Replace the stored pair only if nothing was written since `expected`.
    pub async fn set_if_generation(&self, expected: u64, pair: TokenPair) -> bool {
        let mut slot = self.slot.write().await;
        if slot.generation != expected {
            debug!(
                expected,
                current = slot.generation,
                "Token pair changed underneath, not storing"
            );
            return false;
        }
        slot.pair = Some(pair);
        slot.generation += 1;
        debug!(generation = slot.generation, "Stored token pair");
        true
    }

    pub async fn get(&self) -> Option<TokenPair> {
        self.slot.read().await.pair.clone()
    }

    /// Remove the stored pair.
    pub async fn clear(&self) {
        self.take().await;
    }

    /// Remove the stored pair and hand it to the caller.
    pub async fn take(&self) -> Option<TokenPair> {
        let mut slot = self.slot.write().await;
        let pair = slot.pair.take();
        if pair.is_some() {
            slot.generation += 1;
            debug!(generation = slot.generation, "Cleared token pair");
        }
        pair
    }

    /// Remove the stored pair only if nothing was written since `expected`.
    pub async fn clear_if_generation(&self, expected: u64) -> bool {
        let mut slot = self.slot.write().await;
        if slot.generation != expected || slot.pair.is_none() {
            return false;
        }
        slot.pair = None;
        slot.generation += 1;
        debug!(generation = slot.generation, "Cleared token pair");
        true
    }

    pub async fn snapshot(&self) -> Snapshot {
        let slot = self.slot.read().await;
        Snapshot {
            pair: slot.pair.clone(),
            generation: slot.generation,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.slot.read().await.pair.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recruit_models::TokenLifetimes;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::received_now(access, refresh, &TokenLifetimes::default())
    }

    #[tokio::test]
    async fn test_set_get_clear() {
        let store = CredentialStore::new();
        assert!(store.get().await.is_none());
        assert!(!store.is_authenticated().await);

        store.set(pair("a1", "r1")).await;
        assert_eq!(store.get().await.unwrap().access_token, "a1");

        store.set(pair("a2", "r2")).await;
        let current = store.get().await.unwrap();
        assert_eq!(current.access_token, "a2");
        assert_eq!(current.refresh_token, "r2");

        store.clear().await;
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn test_generation_tracks_writes() {
        let store = CredentialStore::new();
        assert_eq!(store.snapshot().await.generation, 0);

        store.set(pair("a1", "r1")).await;
        store.set(pair("a2", "r2")).await;
        assert_eq!(store.snapshot().await.generation, 2);

        store.clear().await;
        assert_eq!(store.snapshot().await.generation, 3);
        // Clearing an empty store changes nothing
        store.clear().await;
        assert_eq!(store.snapshot().await.generation, 3);
    }

    #[test]
    fn test_default_store_is_empty() {
        let store = CredentialStore::default();
        let snapshot = tokio_test::block_on(store.snapshot());
        assert!(snapshot.pair.is_none());
        assert_eq!(snapshot.generation, 0);
    }

    #[tokio::test]
    async fn test_conditional_set_rejects_stale_generation() {
        let store = CredentialStore::new();
        store.set(pair("a1", "r1")).await;
        let seen = store.snapshot().await.generation;

        // A logout lands between the read and the write
        store.clear().await;
        assert!(!store.set_if_generation(seen, pair("a2", "r2")).await);
        assert!(store.get().await.is_none());

        let current = store.snapshot().await.generation;
        assert!(store.set_if_generation(current, pair("a3", "r3")).await);
        assert_eq!(store.get().await.unwrap().access_token, "a3");
    }

    #[tokio::test]
    async fn test_conditional_clear_keeps_newer_pair() {
        let store = CredentialStore::new();
        store.set(pair("a1", "r1")).await;
        let seen = store.snapshot().await.generation;

        store.set(pair("b1", "s1")).await;
        assert!(!store.clear_if_generation(seen).await);
        assert_eq!(store.get().await.unwrap().access_token, "b1");

        let current = store.snapshot().await.generation;
        assert!(store.clear_if_generation(current).await);
        assert!(!store.clear_if_generation(current + 1).await);
    }

    #[tokio::test]
    async fn test_take_returns_pair_once() {
        let store = CredentialStore::new();
        store.set(pair("a1", "r1")).await;
        assert_eq!(store.take().await.unwrap().refresh_token, "r1");
        assert!(store.take().await.is_none());
        assert_eq!(store.snapshot().await.generation, 2);
    }
}
