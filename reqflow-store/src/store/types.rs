use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Cookie,
    OAuth2,
    Custom,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Cookie => "cookie",
            SessionKind::OAuth2 => "oauth2",
            SessionKind::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserSession {
    pub id: String,
    pub title: String,
    pub kind: SessionKind,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserSession {
    pub fn new(id: impl Into<String>, kind: SessionKind, details: JsonValue) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            kind,
            details,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}
