use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    #[serde(rename = "buchhalter")]
    Accountant,
    #[serde(rename = "telefonist")]
    Telephonist,
    Uploader,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "Admin"),
            UserRole::Manager => write!(f, "Manager"),
            UserRole::Accountant => write!(f, "Accountant"),
            UserRole::Telephonist => write!(f, "Telephonist"),
            UserRole::Uploader => write!(f, "Uploader"),
            UserRole::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Response from `GET /auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub role: UserRole,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Response from `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    // Refresh tokens are issued but never used client-side
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_type: String,
}

/// The backend emits naive timestamps for rows written by SQLite; treat
/// those as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_user_profile_naive_timestamp() {
        let json = r#"{"username": "ben", "email": "ben@example.com", "id": 7, "is_active": true, "role": "buchhalter", "created_at": "2024-03-05T14:22:01.123456"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.role, UserRole::Accountant);
        assert_eq!(user.created_at.hour(), 14);
    }

    #[test]
    fn test_parse_user_profile_offset_timestamp() {
        let json = r#"{"username": "ana", "email": "ana@example.com", "id": 1, "is_active": false, "role": "admin", "created_at": "2024-03-05T14:22:01+02:00"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.created_at.hour(), 12);
    }

    #[test]
    fn test_unknown_role() {
        let json = r#"{"username": "x", "email": "x@example.com", "id": 2, "is_active": true, "role": "intern", "created_at": "2024-03-05T14:22:01"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, UserRole::Unknown);
    }

    #[test]
    fn test_parse_token_response() {
        let json = r#"{"access_token": "abc", "refresh_token": "def", "token_type": "bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.token_type, "bearer");

        let json = r#"{"access_token": "abc", "token_type": "bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.refresh_token.is_none());
    }
}
