//! HTTP adapter shared by every backend call.
//!
//! Each request carries `Authorization: Bearer <token>` when a token is
//! stored. A 401 from any endpoint removes the rejected token, notifies the
//! registered listeners and sends the UI to the login view, whatever the
//! call site was doing.

use crate::error::{ApiError, ApiResult};
use crate::models::ErrorBody;
use crate::navigation::{Navigator, LOGIN_PATH};
use client_storage::TokenStore;
use parking_lot::Mutex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Emitted to listeners when the backend answers 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    /// Request path that was rejected
    pub path: String,
    /// Whether the rejected token was still the stored one and got removed
    pub token_cleared: bool,
}

/// Listener invoked synchronously on every 401.
pub type UnauthorizedCallback = Box<dyn Fn(&UnauthorizedEvent) + Send + Sync>;

/// Which token a request should carry.
#[derive(Debug, Clone, Copy)]
enum Credentials<'a> {
    Stored,
    Explicit(&'a str),
}

/// Backend HTTP client. Cloning shares the connection pool, token store
/// and listeners.
#[derive(Clone)]
pub struct HttpClient {
    http_client: reqwest::Client,
    base_url: Url,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    unauthorized_callbacks: Arc<Mutex<Vec<UnauthorizedCallback>>>,
}

impl HttpClient {
    /// Create a client with the default request timeout.
    pub fn new(
        base_url: Url,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        Self::with_timeout(base_url, tokens, navigator, DEFAULT_TIMEOUT)
    }

    /// Create a client.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `http://localhost:8080/api`
    /// * `tokens` - Where the session token lives
    /// * `navigator` - Receives the login redirect on 401
    /// * `timeout` - Per-request timeout
    pub fn with_timeout(
        mut base_url: Url,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            tokens,
            navigator,
            unauthorized_callbacks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Register a listener for 401 answers.
    pub fn on_unauthorized(&self, callback: UnauthorizedCallback) {
        self.unauthorized_callbacks.lock().push(callback);
    }

    /// Resolve an API path against the base URL.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `GET` a JSON resource using the stored token.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self
            .send::<()>(Method::GET, path, None, Credentials::Stored)
            .await?;
        Ok(response.json().await?)
    }

    /// `POST` a JSON body and decode the JSON answer.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::POST, path, Some(body), Credentials::Stored)
            .await?;
        Ok(response.json().await?)
    }

    /// `PUT` a JSON body and decode the JSON answer.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::PUT, path, Some(body), Credentials::Stored)
            .await?;
        Ok(response.json().await?)
    }

    /// `PUT` a JSON body, ignoring whatever the server answers with.
    pub async fn put_discarding<B>(&self, path: &str, body: &B) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Some(body), Credentials::Stored)
            .await?;
        Ok(())
    }

    /// `POST` with no body, authenticated with the given token instead of
    /// the stored one.
    pub async fn post_with_token(&self, path: &str, token: &str) -> ApiResult<()> {
        self.send::<()>(Method::POST, path, None, Credentials::Explicit(token))
            .await?;
        Ok(())
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credentials: Credentials<'_>,
    ) -> ApiResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let token = match credentials {
            Credentials::Stored => self.tokens.get()?,
            Credentials::Explicit(token) => {
                Some(token.to_string()).filter(|token| !token.is_empty())
            }
        };

        tracing::debug!(
            method = %method,
            path,
            authenticated = token.is_some(),
            "Sending request"
        );

        let mut request = self.http_client.request(method, url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = parsed
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(path, token.as_deref());
            return Err(ApiError::Unauthorized { message });
        }

        tracing::warn!(
            status = %status,
            path,
            body_summary = %summarize_response_body(&text),
            "Request failed"
        );
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
            field_errors: parsed.errors.unwrap_or_default(),
        })
    }

    fn handle_unauthorized(&self, path: &str, sent_token: Option<&str>) {
        let token_cleared = match sent_token {
            Some(token) => self.tokens.clear_if_matches(token).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to remove rejected token");
                false
            }),
            None => false,
        };

        tracing::warn!(path, token_cleared, "Backend rejected credentials, signing out");

        let event = UnauthorizedEvent {
            path: path.to_string(),
            token_cleared,
        };
        for callback in self.unauthorized_callbacks.lock().iter() {
            callback(&event);
        }

        self.navigator.replace(LOGIN_PATH);
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{NavigationMode, RecordingNavigator};
    use crate::testing::{Reply, StubServer};
    use client_storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client_for(server: &StubServer) -> (HttpClient, TokenStore, Arc<RecordingNavigator>) {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let navigator = Arc::new(RecordingNavigator::new());
        let client = HttpClient::new(server.base_url(), tokens.clone(), navigator.clone()).unwrap();
        (client, tokens, navigator)
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let client = HttpClient::new(
            Url::parse("http://localhost:8080/api").unwrap(),
            tokens,
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/");
        assert_eq!(
            client.url("/users/profile").unwrap().as_str(),
            "http://localhost:8080/api/users/profile"
        );
        assert_eq!(
            client.url("auth/login").unwrap().as_str(),
            "http://localhost:8080/api/auth/login"
        );
    }

    #[tokio::test]
    async fn test_attaches_bearer_when_token_stored() {
        let server = StubServer::start(vec![Reply::json(200, r#"{"ok":true}"#)]).await;
        let (client, tokens, _) = client_for(&server);
        tokens.set("tok-1").unwrap();

        let value: serde_json::Value = client.get_json("/users/profile").await.unwrap();
        assert_eq!(value["ok"], true);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/users/profile");
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok-1"));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let server = StubServer::start(vec![Reply::json(200, "{}")]).await;
        let (client, _, _) = client_for(&server);

        let _: serde_json::Value = client.get_json("/users/profile").await.unwrap();
        assert_eq!(server.requests()[0].header("authorization"), None);
    }

    #[tokio::test]
    async fn test_explicit_token_overrides_stored() {
        let server = StubServer::start(vec![Reply::empty(204)]).await;
        let (client, tokens, _) = client_for(&server);
        tokens.set("stored").unwrap();

        client.post_with_token("/auth/logout", "explicit").await.unwrap();
        assert_eq!(
            server.requests()[0].header("authorization"),
            Some("Bearer explicit")
        );
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token_and_redirects() {
        let server = StubServer::start(vec![Reply::json(401, r#"{"message":"Token expired"}"#)]).await;
        let (client, tokens, navigator) = client_for(&server);
        tokens.set("tok-1").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.on_unauthorized(Box::new(move |event| sink.lock().push(event.clone())));

        let err = client
            .get_json::<serde_json::Value>("/users/profile")
            .await
            .unwrap_err();

        match err {
            ApiError::Unauthorized { message } => assert_eq!(message, "Token expired"),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
        assert_eq!(tokens.get().unwrap(), None);
        assert_eq!(
            seen.lock().clone(),
            vec![UnauthorizedEvent {
                path: "/users/profile".to_string(),
                token_cleared: true,
            }]
        );
        assert_eq!(
            navigator.history(),
            vec![(LOGIN_PATH.to_string(), NavigationMode::Replace)]
        );
    }

    #[tokio::test]
    async fn test_unauthorized_for_stale_token_keeps_newer_one() {
        let server = StubServer::start(vec![Reply::json(401, "{}")]).await;
        let (client, tokens, navigator) = client_for(&server);
        tokens.set("tok-2").unwrap();

        let err = client.post_with_token("/auth/logout", "tok-1").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(tokens.get().unwrap().as_deref(), Some("tok-2"));
        assert_eq!(navigator.last_path().as_deref(), Some(LOGIN_PATH));
    }

    #[tokio::test]
    async fn test_every_listener_is_notified() {
        let server = StubServer::start(vec![Reply::json(401, "")]).await;
        let (client, _, _) = client_for(&server);

        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let calls = calls.clone();
            client.on_unauthorized(Box::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let err = client.get_json::<serde_json::Value>("/posts").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { ref message } if message == "Unauthorized"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_validation_errors_are_surfaced() {
        let server = StubServer::start(vec![Reply::json(
            400,
            r#"{"message":"Validation failed","errors":{"username":"already taken"}}"#,
        )])
        .await;
        let (client, _, navigator) = client_for(&server);

        let err = client
            .post_json::<_, serde_json::Value>("/auth/register", &serde_json::json!({}))
            .await
            .unwrap_err();

        match &err {
            ApiError::Status {
                status,
                message,
                field_errors,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(message, "Validation failed");
                assert_eq!(field_errors["username"], "already taken");
            }
            other => panic!("expected Status, got {other:?}"),
        }
        assert!(!err.is_transient());
        assert!(navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_without_body_uses_reason() {
        let server = StubServer::start(vec![Reply::text(503, "upstream down")]).await;
        let (client, _, _) = client_for(&server);

        let err = client.get_json::<serde_json::Value>("/users/profile").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let client = HttpClient::new(
            Url::parse(&format!("http://{addr}/api")).unwrap(),
            tokens,
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap();

        let err = client.get_json::<serde_json::Value>("/users/profile").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
