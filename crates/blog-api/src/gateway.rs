//! Remote authentication endpoints.

use crate::client::HttpClient;
use crate::error::ApiResult;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User};
use async_trait::async_trait;

/// Backend operations the session layer depends on.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a token and profile.
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse>;

    /// Create an account and sign it in.
    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse>;

    /// Tell the backend a token is no longer in use.
    ///
    /// The token is passed explicitly because local state may already have
    /// dropped it by the time this runs.
    async fn logout(&self, token: &str) -> ApiResult<()>;

    /// Profile of whoever the stored token belongs to.
    async fn current_user(&self) -> ApiResult<User>;
}

/// [`AuthGateway`] backed by the blog REST API.
#[derive(Debug, Clone)]
pub struct RemoteAuthGateway {
    http: HttpClient,
}

impl RemoteAuthGateway {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthGateway for RemoteAuthGateway {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
        tracing::debug!(username_or_email = %request.username_or_email, "Logging in");
        self.http.post_json("/auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        tracing::debug!(username = %request.username, "Registering account");
        self.http.post_json("/auth/register", request).await
    }

    async fn logout(&self, token: &str) -> ApiResult<()> {
        self.http.post_with_token("/auth/logout", token).await
    }

    async fn current_user(&self) -> ApiResult<User> {
        let user: User = self.http.get_json("/users/profile").await?;
        tracing::debug!(user_id = %user.id, "Fetched current user");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::navigation::RecordingNavigator;
    use crate::testing::{Reply, StubServer};
    use client_storage::{MemoryStorage, TokenStore};
    use std::sync::Arc;

    const ALICE: &str = r#"{"id":"1","username":"alice","email":"alice@example.com","fullName":"Alice"}"#;

    fn gateway_for(server: &StubServer) -> (RemoteAuthGateway, TokenStore) {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let http = HttpClient::new(
            server.base_url(),
            tokens.clone(),
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap();
        (RemoteAuthGateway::new(http), tokens)
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = StubServer::start(vec![Reply::json(
            200,
            format!(r#"{{"token":"tok-1","user":{ALICE}}}"#),
        )])
        .await;
        let (gateway, _) = gateway_for(&server);

        let response = gateway
            .login(&LoginRequest {
                username_or_email: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.token, "tok-1");
        assert_eq!(response.user.username, "alice");

        let request = &server.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/auth/login");
        assert_eq!(
            request.json_body(),
            serde_json::json!({"usernameOrEmail": "alice", "password": "secret"})
        );
    }

    #[tokio::test]
    async fn test_register_posts_account() {
        let server = StubServer::start(vec![Reply::json(
            201,
            format!(r#"{{"token":"tok-9","user":{ALICE}}}"#),
        )])
        .await;
        let (gateway, _) = gateway_for(&server);

        let response = gateway
            .register(&RegisterRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
                full_name: "Alice".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.token, "tok-9");

        let request = &server.requests()[0];
        assert_eq!(request.path, "/api/auth/register");
        assert_eq!(request.json_body()["fullName"], "Alice");
    }

    #[tokio::test]
    async fn test_logout_sends_given_token() {
        let server = StubServer::start(vec![Reply::empty(200)]).await;
        let (gateway, tokens) = gateway_for(&server);
        assert!(tokens.get().unwrap().is_none());

        gateway.logout("tok-1").await.unwrap();

        let request = &server.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/auth/logout");
        assert_eq!(request.header("authorization"), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn test_current_user_uses_stored_token() {
        let server = StubServer::start(vec![Reply::json(200, ALICE)]).await;
        let (gateway, tokens) = gateway_for(&server);
        tokens.set("tok-1").unwrap();

        let user = gateway.current_user().await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(server.requests()[0].path, "/api/users/profile");
        assert_eq!(
            server.requests()[0].header("authorization"),
            Some("Bearer tok-1")
        );
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() {
        let server = StubServer::start(vec![Reply::json(
            401,
            r#"{"message":"Invalid username or password"}"#,
        )])
        .await;
        let (gateway, _) = gateway_for(&server);

        let err = gateway
            .login(&LoginRequest {
                username_or_email: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, ApiError::Unauthorized { ref message } if message == "Invalid username or password")
        );
    }
}
