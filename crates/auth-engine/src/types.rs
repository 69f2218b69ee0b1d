//! Provider payloads and session-change events.
//!
//! `User` and `Session` are opaque: only the fields the portal reads are
//! typed, everything else is carried through `extra` untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Profile object returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Email-like label for views: the email, else the id.
    pub fn display_email(&self) -> &str {
        self.email
            .as_deref()
            .filter(|email| !email.is_empty())
            .unwrap_or(&self.id)
    }

    /// Name given at signup, if the provider kept it in the user metadata.
    pub fn display_name(&self) -> Option<&str> {
        let metadata = self.extra.get("user_metadata")?;
        ["name", "full_name"]
            .iter()
            .find_map(|key| metadata.get(key).and_then(|v| v.as_str()))
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Token bundle issued by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub user: User,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// Fill in `expires_at` from `expires_in` when the provider omitted it.
    pub fn with_computed_expiry(mut self) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    /// Expiry as a timestamp, if known.
    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// True when the session expires within `margin` from now.
    ///
    /// A session without a known expiry never needs refreshing.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let margin = i64::try_from(margin.as_secs()).unwrap_or(i64::MAX);
                expires_at.saturating_sub(margin) <= Utc::now().timestamp()
            }
            None => false,
        }
    }

    /// Sessions are compared by the access token they carry.
    pub fn same_identity(&self, other: &Session) -> bool {
        self.access_token == other.access_token
    }
}

/// Signup answers with a session when the deployment auto-confirms, and
/// with the bare user when a confirmation email is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(User),
}

impl SignUpResponse {
    /// Split into the created user and the optional session.
    pub fn into_parts(self) -> (User, Option<Session>) {
        match self {
            SignUpResponse::Session(session) => {
                let session = session.with_computed_expiry();
                (session.user.clone(), Some(session))
            }
            SignUpResponse::User(user) => (user, None),
        }
    }
}

/// Kind of session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session change published by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStateChange {
    /// Monotonic per service, starting at 1.
    pub seq: u64,
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_json() -> serde_json::Value {
        json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 4_102_444_800i64,
            "provider_token": "kept",
            "user": {
                "id": "user-1",
                "email": "user@example.com",
                "aud": "authenticated",
                "user_metadata": { "name": "Ada" }
            }
        })
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let session: Session = serde_json::from_value(session_json()).unwrap();
        assert_eq!(session.extra.get("provider_token"), Some(&json!("kept")));
        assert_eq!(session.user.extra.get("aud"), Some(&json!("authenticated")));

        let back = serde_json::to_value(&session).unwrap();
        assert_eq!(back, session_json());
    }

    #[test]
    fn test_user_display_helpers() {
        let session: Session = serde_json::from_value(session_json()).unwrap();
        assert_eq!(session.user.display_email(), "user@example.com");
        assert_eq!(session.user.display_name(), Some("Ada"));

        let anonymous: User = serde_json::from_value(json!({ "id": "user-2" })).unwrap();
        assert_eq!(anonymous.display_email(), "user-2");
        assert_eq!(anonymous.display_name(), None);
    }

    #[test]
    fn test_signup_response_variants() {
        let with_session: SignUpResponse = serde_json::from_value(session_json()).unwrap();
        let (user, session) = with_session.into_parts();
        assert_eq!(user.id, "user-1");
        assert!(session.is_some());

        let pending: SignUpResponse = serde_json::from_value(json!({
            "id": "user-3",
            "email": "new@example.com",
            "confirmation_sent_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let (user, session) = pending.into_parts();
        assert_eq!(user.email.as_deref(), Some("new@example.com"));
        assert!(session.is_none());
    }

    #[test]
    fn test_expiry_checks() {
        let mut session: Session = serde_json::from_value(session_json()).unwrap();
        assert!(!session.expires_within(Duration::from_secs(90)));

        session.expires_at = Some(Utc::now().timestamp() + 30);
        assert!(session.expires_within(Duration::from_secs(90)));
        assert!(!session.expires_within(Duration::from_secs(5)));

        session.expires_at = None;
        assert!(!session.expires_within(Duration::from_secs(90)));
    }

    #[test]
    fn test_computed_expiry() {
        let mut session: Session = serde_json::from_value(session_json()).unwrap();
        session.expires_at = None;
        let before = Utc::now().timestamp();
        let session = session.with_computed_expiry();
        let expires_at = session.expires_at.unwrap();
        assert!(expires_at >= before + 3600);
        assert!(session.expires_at_datetime().is_some());
    }

    #[test]
    fn test_event_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuthChangeEvent::TokenRefreshed).unwrap(),
            "\"TOKEN_REFRESHED\""
        );
        assert_eq!(
            serde_json::to_string(&AuthChangeEvent::InitialSession).unwrap(),
            "\"INITIAL_SESSION\""
        );
    }
}
