//! Request/response types and the transport seam.
//!
//! Requests carry their body as a JSON value so they can be replayed after a
//! token refresh.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// An outbound API call.
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/profile/`
    pub path: String,
    pub body: Option<Value>,
    /// Access token to send as `Authorization: Bearer ...`
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_body", &self.body.is_some())
            .field("has_bearer", &self.bearer.is_some())
            .finish()
    }
}

/// A fully-read API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body regardless of status.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Decode a success body, or map the failure onto [`ClientError`].
    pub fn into_result<T: DeserializeOwned>(self) -> ClientResult<T> {
        if self.status.is_success() {
            self.json()
        } else {
            Err(ClientError::from_response(&self))
        }
    }

    /// `Ok(())` for any success status.
    pub fn ensure_success(self) -> ClientResult<()> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(ClientError::from_response(&self))
        }
    }

    /// `detail` field of an error body, if any.
    pub fn detail(&self) -> Option<String> {
        self.json::<Value>()
            .ok()
            .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
    }
}

/// Sends one request and returns the response, whatever its status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        (**self).send(request).await
    }
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("recruit-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.config.endpoint(&request.path)?;

        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "API request completed"
        );

        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_transport_sends_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/profile/"))
            .and(header("Authorization", "Bearer a1"))
            .and(body_json(json!({"bio": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&ClientConfig::new(&server.uri()).unwrap()).unwrap();
        let response = transport
            .send(
                ApiRequest::patch("/profile/")
                    .json(&json!({"bio": "hi"}))
                    .unwrap()
                    .bearer("a1"),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json::<Value>().unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_non_success_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "nope"})),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&ClientConfig::new(&server.uri()).unwrap()).unwrap();
        let response = transport.send(ApiRequest::get("/profile/")).await.unwrap();
        assert!(response.is_unauthorized());
        assert_eq!(response.detail().as_deref(), Some("nope"));
        assert!(response.into_result::<Value>().unwrap_err().is_unauthenticated());
    }

    #[test]
    fn test_request_debug_hides_bearer() {
        let request = ApiRequest::get("/profile/").bearer("secret-token");
        assert!(!format!("{:?}", request).contains("secret-token"));
    }
}
