//! Profile management endpoints.

use crate::client::HttpClient;
use crate::error::ApiResult;
use crate::models::{PasswordChange, ProfileUpdate, User};

/// Calls under `/users` that change the signed-in account.
///
/// The session keeps its own copy of the profile, so callers should refresh
/// the session after a successful update.
#[derive(Debug, Clone)]
pub struct ProfileService {
    http: HttpClient,
}

impl ProfileService {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Update profile fields. Fields left as `None` are not sent.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let user: User = self.http.put_json("/users/profile", update).await?;
        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    pub async fn update_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let body = PasswordChange {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.http.put_discarding("/users/password", &body).await?;
        tracing::info!("Password changed");
        Ok(())
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

    fn service_for(server: &StubServer) -> ProfileService {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        tokens.set("tok-1").unwrap();
        let http = HttpClient::new(
            server.base_url(),
            tokens,
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap();
        ProfileService::new(http)
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_set_fields() {
        let server = StubServer::start(vec![Reply::json(
            200,
            r#"{"id":"1","username":"alice","email":"alice@example.com","fullName":"Alice","bio":"Writer"}"#,
        )])
        .await;
        let service = service_for(&server);

        let user = service
            .update_profile(&ProfileUpdate {
                bio: Some("Writer".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(user.bio.as_deref(), Some("Writer"));

        let request = &server.requests()[0];
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/api/users/profile");
        assert_eq!(request.json_body(), serde_json::json!({"bio": "Writer"}));
        assert_eq!(request.header("authorization"), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn test_update_profile_response_with_null_fields() {
        let server = StubServer::start(vec![Reply::json(
            200,
            r#"{"id":"1","username":"alice","email":"alice@example.com","fullName":null,"bio":"Writer","avatarUrl":null}"#,
        )])
        .await;
        let service = service_for(&server);

        let user = service
            .update_profile(&ProfileUpdate {
                bio: Some("Writer".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.full_name, None);
        assert_eq!(user.bio.as_deref(), Some("Writer"));
        assert_eq!(user.avatar_url, None);
    }

    #[tokio::test]
    async fn test_update_password_body() {
        let server = StubServer::start(vec![Reply::text(200, "Password updated")]).await;
        let service = service_for(&server);

        service.update_password("old", "new").await.unwrap();

        let request = &server.requests()[0];
        assert_eq!(request.path, "/api/users/password");
        assert_eq!(
            request.json_body(),
            serde_json::json!({"currentPassword": "old", "newPassword": "new"})
        );
    }

    #[tokio::test]
    async fn test_wrong_current_password_is_reported() {
        let server = StubServer::start(vec![Reply::json(
            400,
            r#"{"message":"Current password is incorrect"}"#,
        )])
        .await;
        let service = service_for(&server);

        let err = service.update_password("bad", "new").await.unwrap_err();
        match err {
            ApiError::Status { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Current password is incorrect");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }
}
