//! Background purge of expired blacklist entries.
//!
//! A blacklisted token past its `exp` is rejected by signature validation
//! already, so its entry can go.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::blacklist::TokenBlacklist;
use crate::metrics;

/// Blacklist janitor service.
pub struct BlacklistJanitor {
    blacklist: Arc<TokenBlacklist>,
    period: Duration,
}

impl BlacklistJanitor {
    pub fn new(blacklist: Arc<TokenBlacklist>, period: Duration) -> Self {
        Self { blacklist, period }
    }

    /// Start the background purge loop.
    ///
    /// Runs indefinitely; spawn it as a background task.
    pub async fn run(&self) {
        if self.period.is_zero() {
            info!("Blacklist purge is disabled");
            return;
        }

        info!("Starting blacklist janitor (interval: {:?})", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.purge_once().await;
        }
    }

    /// Run a single purge cycle. Returns the number of entries removed.
    pub async fn purge_once(&self) -> usize {
        let removed = self.blacklist.purge_expired().await;
        let remaining = self.blacklist.len().await;
        metrics::record_blacklist_purge(removed, remaining);
        debug!(removed, remaining, "Blacklist purge cycle complete");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_purge_once_drops_expired_only() {
        let blacklist = Arc::new(TokenBlacklist::new());
        blacklist
            .insert("gone", 1, Utc::now() - chrono::Duration::seconds(5))
            .await;
        blacklist
            .insert("kept", 1, Utc::now() + chrono::Duration::hours(1))
            .await;

        let janitor = BlacklistJanitor::new(Arc::clone(&blacklist), Duration::from_secs(60));
        assert_eq!(janitor.purge_once().await, 1);
        assert!(blacklist.contains("kept").await);
        assert_eq!(janitor.purge_once().await, 0);
    }

    #[tokio::test]
    async fn test_zero_period_returns_immediately() {
        let janitor = BlacklistJanitor::new(Arc::new(TokenBlacklist::new()), Duration::ZERO);
        tokio::time::timeout(Duration::from_secs(1), janitor.run())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_purges_on_interval() {
        let blacklist = Arc::new(TokenBlacklist::new());
        blacklist
            .insert("gone", 1, Utc::now() - chrono::Duration::seconds(5))
            .await;

        let janitor = BlacklistJanitor::new(Arc::clone(&blacklist), Duration::from_secs(30));
        let handle = tokio::spawn(async move { janitor.run().await });

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(blacklist.is_empty().await);
        handle.abort();
    }
}
