//! Remote auth collaborator contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Profile of the signed-in user.
///
/// Always replaced wholesale by a fresh lookup; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend account identifier.
    #[serde(rename = "$id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Account email address.
    pub email: String,
    /// Generated avatar image URL.
    #[serde(rename = "avatar")]
    pub avatar_url: String,
}

impl UserProfile {
    /// Create a profile.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// A profile without an id does not identify anyone.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Auth backend error.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Backend request failed: {0}")]
    Request(String),
}

/// Trait for the remote service that owns sessions.
///
/// Implement this to connect the session layer to a real account API.
/// All three operations are suspension points; nothing else in the
/// layer awaits.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Run whatever handshake establishes a session.
    ///
    /// # Returns
    /// Whether a session now exists.
    async fn initiate_login(&self) -> Result<bool, AuthError>;

    /// End the current session.
    ///
    /// # Returns
    /// Whether the session was ended.
    async fn terminate_session(&self) -> Result<bool, AuthError>;

    /// Look up the signed-in user, `None` when there is no valid session.
    async fn fetch_current_user(&self) -> Result<Option<UserProfile>, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_wire_names() {
        let profile = UserProfile::new("u1", "Ann", "a@x.com", "http://avatars/ann");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["$id"], "u1");
        assert_eq!(json["avatar"], "http://avatars/ann");

        let parsed: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_blank_id_is_unidentified() {
        assert!(!UserProfile::new("  ", "Ann", "a@x.com", "").is_identified());
        assert!(UserProfile::new("u1", "Ann", "a@x.com", "").is_identified());
    }
}
