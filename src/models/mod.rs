use serde::{Deserialize, Serialize};

/// Authenticated user as returned by the auth endpoint.
///
/// Only id and email are relied on; provider-specific profile fields live in
/// `user_metadata`, kept flexible to avoid breaking when the provider's
/// payload evolves.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct AuthUser {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Best-effort display name: OAuth profile name, then email, then id.
    pub fn display_name(&self) -> String {
        for key in ["full_name", "name"] {
            if let Some(name) = self.user_metadata.get(key).and_then(|v| v.as_str()) {
                if !name.trim().is_empty() {
                    return name.to_string();
                }
            }
        }

        if let Some(email) = &self.email {
            if !email.trim().is_empty() {
                return email.clone();
            }
        }

        self.id.clone()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Bookmark {
    pub id: i64,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub created_at: String,
}

/// Insert payload. The backend generates id and created_at.
#[derive(Serialize, Clone, Debug)]
pub(crate) struct NewBookmark {
    pub url: String,
    pub title: String,
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_deserialize_full_profile() {
        let json = r#"{
            "id": "4f2c-uuid",
            "email": "ada@example.com",
            "user_metadata": {"full_name": "Ada Lovelace", "avatar_url": "https://example.com/a.png"}
        }"#;
        let user: AuthUser = serde_json::from_str(json).expect("user should parse");
        assert_eq!(user.id, "4f2c-uuid");
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_auth_user_tolerates_missing_metadata() {
        let json = r#"{"id": "4f2c-uuid", "email": "ada@example.com"}"#;
        let user: AuthUser = serde_json::from_str(json).expect("user should parse");
        assert_eq!(user.display_name(), "ada@example.com");
    }

    #[test]
    fn test_auth_user_display_name_falls_back_to_id() {
        let json = r#"{"id": "4f2c-uuid"}"#;
        let user: AuthUser = serde_json::from_str(json).expect("user should parse");
        assert_eq!(user.display_name(), "4f2c-uuid");
    }

    #[test]
    fn test_bookmark_deserialize() {
        let json = r#"{
            "id": 1,
            "user_id": "4f2c-uuid",
            "url": "https://example.com",
            "title": "Example",
            "created_at": "2026-08-01T12:00:00+00:00"
        }"#;
        let b: Bookmark = serde_json::from_str(json).expect("bookmark should parse");
        assert_eq!(b.id, 1);
        assert_eq!(b.title, "Example");
    }

    #[test]
    fn test_new_bookmark_serializes_owner() {
        let req = NewBookmark {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            user_id: "4f2c-uuid".to_string(),
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v["user_id"], "4f2c-uuid");
        assert_eq!(v["url"], "https://example.com");
    }
}
