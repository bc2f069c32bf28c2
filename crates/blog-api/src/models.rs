//! Wire types for the blog backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The signed-in user's profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned user ID
    pub id: String,
    /// Unique handle
    pub username: String,
    /// Contact email
    pub email: String,
    /// Display name. The backend sends `null` once a profile update omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Free-form biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// New account details for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Token plus profile returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Partial profile update for `PUT /users/profile`. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
    }
}

/// Body for `PUT /users/password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Error body the backend sends with non-2xx answers.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_camel_case() {
        let json = r#"{
            "id": "u-1",
            "username": "alice",
            "email": "alice@example.com",
            "fullName": "Alice Liddell",
            "avatarUrl": "https://cdn.example.com/a.png"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.full_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(user.bio, None);
        assert_eq!(user.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_user_accepts_null_optional_fields() {
        let json = r#"{"id":"u-1","username":"alice","email":"alice@example.com","fullName":null,"bio":null,"avatarUrl":null}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.full_name, None);
        assert_eq!(user.bio, None);
        assert_eq!(user.avatar_url, None);

        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("fullName").is_none());
    }

    #[test]
    fn test_login_request_wire_names() {
        let request = LoginRequest {
            username_or_email: "alice".to_string(),
            password: "pw".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["usernameOrEmail"], "alice");
        assert_eq!(value["password"], "pw");
    }

    #[test]
    fn test_profile_update_omits_unset_fields() {
        let update = ProfileUpdate {
            bio: Some("hello".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({ "bio": "hello" }));
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_error_body_tolerates_missing_fields() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message.is_none());
        assert!(body.errors.is_none());

        let body: ErrorBody = serde_json::from_str(
            r#"{"message":"Validation failed","errors":{"email":"invalid"}}"#,
        )
        .unwrap();
        assert_eq!(body.message.as_deref(), Some("Validation failed"));
        assert_eq!(body.errors.unwrap()["email"], "invalid");
    }
}
