//! Request pipeline.
//!
//! Every API call goes through a fixed decorator stack:
//!
//! ```text
//! RefreshOnUnauthorized( AttachBearer( transport ) )
//! ```
//!
//! [`AttachBearer`] stamps the current access token on the request.
//! [`RefreshOnUnauthorized`] reacts to a 401 by refreshing the token pair
//! once and replaying the request once through the inner stack, so the
//! replay picks up the new access token.
//!
//! Concurrent 401s share one refresh. Refreshes are serialized behind a
//! mutex, and each request remembers the store generation its bearer token
//! came from: a waiter that finds the generation moved on retries with the
//! pair some other task already obtained instead of spending a second
//! refresh. Store writes after a refresh are conditional on that generation,
//! so a logout that lands mid-refresh is never undone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recruit_models::{TokenLifetimes, TokenPair};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::issuer::TokenIssuer;
use crate::store::CredentialStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Detail used when the session cannot be recovered.
pub const SESSION_EXPIRED: &str = "Session expired, please log in again";

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Refreshed,
    SignedOut,
    /// Refresh failed or was impossible; the store has been cleared.
    Expired,
}

/// Per-request retry bookkeeping.
///
/// `retried` flips once the request has been replayed after a refresh; a
/// replayed request is never replayed again.
#[derive(Debug, Clone)]
pub struct RefreshAttempt {
    pub original_request: ApiRequest,
    pub retried: bool,
}

impl RefreshAttempt {
    pub fn new(original_request: ApiRequest) -> Self {
        Self {
            original_request,
            retried: false,
        }
    }
}

/// Sets `Authorization: Bearer <access>` from the credential store.
pub struct AttachBearer<T> {
    inner: T,
    store: Arc<CredentialStore>,
}

impl<T: Transport> AttachBearer<T> {
    pub fn new(inner: T, store: Arc<CredentialStore>) -> Self {
        Self { inner, store }
    }

    /// Send with the current access token and report the store generation
    /// that token was read at.
    pub async fn send_tracked(&self, mut request: ApiRequest) -> ClientResult<(u64, ApiResponse)> {
        let snapshot = self.store.snapshot().await;
        if let Some(pair) = snapshot.pair {
            request.bearer = Some(pair.access_token);
        }
        let response = self.inner.send(request).await?;
        Ok((snapshot.generation, response))
    }
}

#[async_trait]
impl<T: Transport> Transport for AttachBearer<T> {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let (_, response) = self.send_tracked(request).await?;
        Ok(response)
    }
}

/// Refreshes the token pair once on 401 and replays the request once.
pub struct RefreshOnUnauthorized<T> {
    inner: AttachBearer<T>,
    store: Arc<CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
    events: broadcast::Sender<SessionEvent>,
    refresh_lock: Mutex<()>,
    refresh_timeout: Duration,
    lifetimes: TokenLifetimes,
}

/// What a 401'd request should do next.
enum Recovery {
    /// A fresh pair is in the store; replay.
    Retry,
    /// The session is over.
    Failed(ClientError),
}

impl<T: Transport> RefreshOnUnauthorized<T> {
    pub fn new(
        transport: T,
        store: Arc<CredentialStore>,
        issuer: Arc<dyn TokenIssuer>,
        events: broadcast::Sender<SessionEvent>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: AttachBearer::new(transport, Arc::clone(&store)),
            store,
            issuer,
            events,
            refresh_lock: Mutex::new(()),
            refresh_timeout: config.refresh_timeout,
            lifetimes: config.lifetimes,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Clear the store if it still holds the pair seen at `generation`.
    async fn expire(&self, generation: u64) {
        if self.store.clear_if_generation(generation).await {
            self.emit(SessionEvent::Expired);
        }
    }

    /// Get the store into a state worth retrying with, or give up.
    ///
    /// `sent_generation` is the store generation the failed request's bearer
    /// token was read at.
    async fn recover(&self, sent_generation: u64, detail: String) -> Recovery {
        let _guard = self.refresh_lock.lock().await;

        let snapshot = self.store.snapshot().await;
        let Some(pair) = snapshot.pair else {
            // Logged out, or another task's refresh already failed
            return Recovery::Failed(ClientError::unauthenticated(detail));
        };

        if snapshot.generation != sent_generation {
            debug!(
                sent_generation,
                current_generation = snapshot.generation,
                "Token pair already replaced, retrying without refresh"
            );
            return Recovery::Retry;
        }

        if !pair.has_refresh_token() || pair.is_refresh_expired() {
            debug!("No usable refresh token, ending session");
            self.expire(snapshot.generation).await;
            return Recovery::Failed(ClientError::unauthenticated(detail));
        }

        match tokio::time::timeout(
            self.refresh_timeout,
            self.issuer.refresh(&pair.refresh_token),
        )
        .await
        {
            Ok(Ok(rotated)) => {
                let rotated =
                    TokenPair::received_now(rotated.access, rotated.refresh, &self.lifetimes);
                if !self
                    .store
                    .set_if_generation(snapshot.generation, rotated.clone())
                    .await
                {
                    warn!("Session changed during token refresh, discarding rotated pair");
                    self.revoke(rotated).await;
                    return Recovery::Failed(ClientError::unauthenticated(detail));
                }
                self.emit(SessionEvent::Refreshed);
                info!("Refreshed access token");
                Recovery::Retry
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.expire(snapshot.generation).await;
                Recovery::Failed(match e {
                    ClientError::Unauthenticated { code, .. } => ClientError::Unauthenticated {
                        detail: SESSION_EXPIRED.to_string(),
                        code,
                    },
                    _ => ClientError::unauthenticated(SESSION_EXPIRED),
                })
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.refresh_timeout.as_millis() as u64,
                    "Token refresh timed out, clearing session"
                );
                self.expire(snapshot.generation).await;
                Recovery::Failed(ClientError::unauthenticated(SESSION_EXPIRED))
            }
        }
    }

    /// End the session.
    ///
    /// The store is emptied under the refresh lock, so a refresh already in
    /// flight completes first and its rotated pair is the one revoked.
    pub async fn sign_out(&self) {
        let pair = {
            let _guard = self.refresh_lock.lock().await;
            self.store.take().await
        };
        if let Some(pair) = pair {
            self.revoke(pair).await;
        }
        self.emit(SessionEvent::SignedOut);
    }

    /// Blacklist the refresh token of `pair` server-side. Best effort.
    ///
    /// Logout needs a live bearer. With a stale access token the pair is
    /// rotated first: rotation blacklists the old refresh token and the new
    /// access token authorizes revoking the new one.
    async fn revoke(&self, pair: TokenPair) {
        if !pair.has_refresh_token() {
            return;
        }

        if !pair.is_access_expired() {
            match self
                .issuer
                .logout(&pair.access_token, &pair.refresh_token)
                .await
            {
                Ok(()) => {
                    debug!("Refresh token revoked");
                    return;
                }
                Err(e) if e.is_unauthenticated() => {
                    debug!("Access token refused at logout, rotating to revoke");
                }
                Err(e) => {
                    warn!(error = %e, "Server-side logout failed");
                    return;
                }
            }
        }

        match tokio::time::timeout(
            self.refresh_timeout,
            self.issuer.refresh(&pair.refresh_token),
        )
        .await
        {
            Ok(Ok(rotated)) => match self.issuer.logout(&rotated.access, &rotated.refresh).await {
                Ok(()) => debug!("Refresh token revoked after rotation"),
                Err(e) => warn!(error = %e, "Server-side logout failed after rotation"),
            },
            Ok(Err(e)) => debug!(error = %e, "Refresh token already unusable"),
            Err(_) => warn!("Timed out revoking refresh token"),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for RefreshOnUnauthorized<T> {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let mut attempt = RefreshAttempt::new(request);
        let (mut generation, mut response) = self
            .inner
            .send_tracked(attempt.original_request.clone())
            .await?;

        while response.is_unauthorized() && !attempt.retried {
            let detail = response
                .detail()
                .unwrap_or_else(|| "Authentication credentials were not provided.".to_string());

            if let Recovery::Failed(err) = self.recover(generation, detail).await {
                return Err(err);
            }

            attempt.retried = true;
            debug!(path = %attempt.original_request.path, "Retrying request with refreshed token");
            (generation, response) = self
                .inner
                .send_tracked(attempt.original_request.clone())
                .await?;
        }

        // A replayed request's outcome goes back as is, whatever its status
        Ok(response)
    }
}

/// The standard stack.
pub type Pipeline<T> = RefreshOnUnauthorized<T>;

/// Assemble the pipeline around `transport`.
pub fn build<T: Transport>(
    transport: T,
    store: Arc<CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
    events: broadcast::Sender<SessionEvent>,
    config: &ClientConfig,
) -> Pipeline<T> {
    RefreshOnUnauthorized::new(transport, store, issuer, events, config)
}
