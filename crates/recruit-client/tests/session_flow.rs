//! End-to-end session tests against a live API server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use recruit_api::{create_router, ApiConfig, AppState, JwtConfig};
use recruit_client::{
    ClientConfig, ClientError, CredentialStore, HttpTokenIssuer, HttpTransport, RecruitClient,
    SessionEvent, TokenIssuer, Transport,
};
use recruit_models::{ProfileUpdate, RegisterRequest, TokenLifetimes, TokenPair};
use tokio::net::TcpListener;

const ACCESS_TTL: Duration = Duration::from_secs(1);

async fn spawn_server() -> String {
    let config = ApiConfig {
        rate_limit_rps: 1000,
        ..ApiConfig::default()
    };
    let jwt = JwtConfig {
        access_ttl: ACCESS_TTL,
        ..JwtConfig::default()
    };
    let app = create_router(AppState::in_memory(config, &jwt), None);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{}", addr)
}

fn client_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(base_url).unwrap();
    config.lifetimes = TokenLifetimes {
        access: ACCESS_TTL,
        ..TokenLifetimes::default()
    };
    config
}

fn registration(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        password: "analytical-engine".to_string(),
        password_confirm: "analytical-engine".to_string(),
    }
}

struct Session {
    client: RecruitClient,
    issuer: Arc<HttpTokenIssuer>,
}

fn session(base_url: &str) -> Session {
    let config = client_config(base_url);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config).unwrap());
    let issuer = Arc::new(HttpTokenIssuer::new(Arc::clone(&transport)));
    let client = RecruitClient::with_parts(
        &config,
        transport,
        issuer.clone(),
        Arc::new(CredentialStore::new()),
    );
    Session { client, issuer }
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_transparently() {
    let base_url = spawn_server().await;
    let Session { client, issuer } = session(&base_url);

    let user = client.register(&registration("ada")).await.unwrap();
    assert_eq!(user.username, "ada");

    let profile = client.profile().await.unwrap();
    assert_eq!(profile.user_id, user.id);
    assert_eq!(profile.full_name, "Ada Lovelace");

    let before = client.store().get().await.unwrap();
    let mut events = client.subscribe();

    tokio::time::sleep(ACCESS_TTL + Duration::from_millis(1100)).await;

    let profile = client.profile().await.unwrap();
    assert_eq!(profile.user_id, user.id);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);

    let after = client.store().get().await.unwrap();
    assert_ne!(after.access_token, before.access_token);
    assert_ne!(after.refresh_token, before.refresh_token);

    // The rotated-out refresh token is now blacklisted.
    let err = issuer.refresh(&before.refresh_token).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert_eq!(err.code(), Some("token_not_valid"));
}

#[tokio::test]
async fn test_login_update_profile_and_logout() {
    let base_url = spawn_server().await;
    let Session { client, issuer } = session(&base_url);

    client.register(&registration("grace")).await.unwrap();
    client.logout().await;
    assert!(!client.is_authenticated().await);

    let user = client.login("grace", "analytical-engine").await.unwrap();
    assert_eq!(user.username, "grace");

    let update = ProfileUpdate {
        bio: Some(Some("Compiler pioneer".to_string())),
        skills: Some(Some("cobol, compilers".to_string())),
        ..ProfileUpdate::default()
    };
    let profile = client.update_profile(&update).await.unwrap();
    assert_eq!(profile.bio.as_deref(), Some("Compiler pioneer"));
    assert_eq!(profile.skills_list, vec!["cobol", "compilers"]);

    let info = client.user_info().await.unwrap();
    assert_eq!(info.bio.as_deref(), Some("Compiler pioneer"));

    let refresh_token = client.store().get().await.unwrap().refresh_token;
    client.logout().await;
    assert!(!client.is_authenticated().await);

    let err = issuer.refresh(&refresh_token).await.unwrap_err();
    assert_eq!(err.code(), Some("token_not_valid"));
}

#[tokio::test]
async fn test_logout_after_access_expiry_still_revokes_refresh_token() {
    let base_url = spawn_server().await;
    let Session { client, issuer } = session(&base_url);

    client.register(&registration("barbara")).await.unwrap();
    let refresh_token = client.store().get().await.unwrap().refresh_token;

    tokio::time::sleep(ACCESS_TTL + Duration::from_millis(1100)).await;

    client.logout().await;
    assert!(!client.is_authenticated().await);

    let err = issuer.refresh(&refresh_token).await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert_eq!(err.code(), Some("token_not_valid"));
}

#[tokio::test]
async fn test_wrong_password_is_a_validation_error() {
    let base_url = spawn_server().await;
    let Session { client, .. } = session(&base_url);

    client.register(&registration("linus")).await.unwrap();
    client.logout().await;

    let err = client.login("linus", "wrong").await.unwrap_err();
    match err {
        ClientError::Validation(errors) => assert!(errors.contains("non_field_errors")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(!client.is_authenticated().await);
}

#[tokio::test]
async fn test_unrecoverable_session_is_cleared() {
    let base_url = spawn_server().await;
    let Session { client, .. } = session(&base_url);
    let mut events = client.subscribe();

    client
        .store()
        .set(TokenPair::received_now(
            "not-a-jwt",
            "also-not-a-jwt",
            &TokenLifetimes::default(),
        ))
        .await;

    let err = client.profile().await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert_eq!(err.code(), Some("token_not_valid"));
    assert!(!client.is_authenticated().await);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
}

#[tokio::test]
async fn test_anonymous_request_is_not_refreshed() {
    let base_url = spawn_server().await;
    let Session { client, .. } = session(&base_url);
    let mut events = client.subscribe();

    let err = client.profile().await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert!(events.try_recv().is_err());
}
