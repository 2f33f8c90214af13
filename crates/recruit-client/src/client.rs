//! Typed API client.

use std::sync::Arc;

use recruit_models::{
    AuthResponse, LoginRequest, ProfileResponse, ProfileUpdate, RegisterRequest, TokenLifetimes,
    TokenPair, UserSummary,
};
use tokio::sync::broadcast;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::issuer::{HttpTokenIssuer, TokenIssuer};
use crate::pipeline::{self, Pipeline, SessionEvent};
use crate::store::CredentialStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

pub const PROFILE_PATH: &str = "/profile/";
pub const USER_INFO_PATH: &str = "/user-info/";

const EVENT_CAPACITY: usize = 32;

/// Client for the recruitment API.
///
/// Owns one session: a [`CredentialStore`] shared by every request made
/// through this client.
pub struct RecruitClient {
    store: Arc<CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
    pipeline: Pipeline<Arc<dyn Transport>>,
    lifetimes: TokenLifetimes,
    events: broadcast::Sender<SessionEvent>,
}

impl RecruitClient {
    /// Create a client talking HTTP to `config.base_url`.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        let issuer = Arc::new(HttpTokenIssuer::new(Arc::clone(&transport)));
        Ok(Self::with_parts(
            config,
            transport,
            issuer,
            Arc::new(CredentialStore::new()),
        ))
    }

    /// Create a client from environment configuration.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    /// Assemble a client from explicit parts.
    pub fn with_parts(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        issuer: Arc<dyn TokenIssuer>,
        store: Arc<CredentialStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let pipeline = pipeline::build(
            transport,
            Arc::clone(&store),
            Arc::clone(&issuer),
            events.clone(),
            config,
        );

        Self {
            store,
            issuer,
            pipeline,
            lifetimes: config.lifetimes,
            events,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.is_authenticated().await
    }

    async fn start_session(&self, response: AuthResponse) -> UserSummary {
        self.store
            .set(TokenPair::received_now(
                response.access,
                response.refresh,
                &self.lifetimes,
            ))
            .await;
        let _ = self.events.send(SessionEvent::SignedIn);
        response.user
    }

    /// Log in and start a session.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<UserSummary> {
        let response = self.issuer.login(&LoginRequest::new(username, password)).await?;
        let user = self.start_session(response).await;
        info!(user_id = user.id, "Logged in");
        Ok(user)
    }

    /// Register and start a session for the new account.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<UserSummary> {
        let response = self.issuer.register(request).await?;
        let user = self.start_session(response).await;
        info!(user_id = user.id, "Registered");
        Ok(user)
    }

    /// End the session.
    ///
    /// The server is asked to blacklist the refresh token, rotating first
    /// if the access token has gone stale. The local pair is discarded
    /// whatever the outcome.
    pub async fn logout(&self) {
        self.pipeline.sign_out().await;
        info!("Logged out");
    }

    /// Send an arbitrary request through the pipeline.
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.pipeline.send(request).await
    }

    pub async fn profile(&self) -> ClientResult<ProfileResponse> {
        self.execute(ApiRequest::get(PROFILE_PATH)).await?.into_result()
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<ProfileResponse> {
        self.execute(ApiRequest::patch(PROFILE_PATH).json(update)?)
            .await?
            .into_result()
    }

    pub async fn user_info(&self) -> ClientResult<ProfileResponse> {
        self.execute(ApiRequest::get(USER_INFO_PATH)).await?.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::issuer::MockTokenIssuer;
    use crate::transport::MockTransport;
    use recruit_models::FieldErrors;
    use reqwest::StatusCode;

    fn auth_response() -> AuthResponse {
        AuthResponse {
            message: "Login successful".to_string(),
            user: UserSummary {
                id: 7,
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            },
            access: "a1".to_string(),
            refresh: "r1".to_string(),
        }
    }

    fn client(transport: MockTransport, issuer: MockTokenIssuer) -> RecruitClient {
        RecruitClient::with_parts(
            &ClientConfig::default(),
            Arc::new(transport),
            Arc::new(issuer),
            Arc::new(CredentialStore::new()),
        )
    }

    #[tokio::test]
    async fn test_login_stores_pair_and_signals() {
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_login().times(1).returning(|_| Ok(auth_response()));

        let client = client(MockTransport::new(), issuer);
        let mut events = client.subscribe();

        let user = client.login("ada", "pw").await.unwrap();
        assert_eq!(user.id, 7);
        assert!(client.is_authenticated().await);

        let pair = client.store().get().await.unwrap();
        assert_eq!(pair.access_token, "a1");
        assert_eq!(pair.refresh_token, "r1");
        assert!(pair.refresh_expiry > pair.access_expiry);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_store_empty() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_login()
            .returning(|_| Err(ClientError::Validation(FieldErrors::non_field("Invalid credentials"))));

        let client = client(MockTransport::new(), issuer);
        assert!(matches!(
            client.login("ada", "bad").await,
            Err(ClientError::Validation(_))
        ));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_login().returning(|_| Ok(auth_response()));
        issuer
            .expect_logout()
            .times(1)
            .returning(|_, _| Err(ClientError::config("unreachable")));

        let client = client(MockTransport::new(), issuer);
        client.login("ada", "pw").await.unwrap();
        let mut events = client.subscribe();

        client.logout().await;
        assert!(!client.is_authenticated().await);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_profile_goes_through_pipeline() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|request| {
            assert_eq!(request.path, PROFILE_PATH);
            assert_eq!(request.bearer.as_deref(), Some("a1"));
            Ok(ApiResponse::new(
                StatusCode::OK,
                serde_json::json!({
                    "user_id": 7, "username": "ada", "email": "ada@example.com",
                    "first_name": "Ada", "last_name": "Lovelace", "full_name": "Ada Lovelace",
                    "phone_number": null, "date_of_birth": null, "location": null,
                    "bio": null, "skills": "math", "skills_list": ["math"],
                    "experience_years": 3, "linkedin_url": null, "github_url": null,
                    "is_recruiter": false, "company": null,
                    "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z",
                })
                .to_string(),
            ))
        });
        let mut issuer = MockTokenIssuer::new();
        issuer.expect_login().returning(|_| Ok(auth_response()));

        let client = client(transport, issuer);
        client.login("ada", "pw").await.unwrap();

        let profile = client.profile().await.unwrap();
        assert_eq!(profile.full_name, "Ada Lovelace");
        assert_eq!(profile.skills_list, vec!["math".to_string()]);
    }
}
