//! OAuth2 token flow through an external browser.

use async_trait::async_trait;
use url::Url;

use crate::error::AppwriteError;

/// How the browser auth session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// The browser was redirected to the callback; carries the full URL.
    Success { url: String },
    /// The user closed the browser.
    Cancel,
    /// The session was dismissed by the system.
    Dismiss,
}

/// Trait for opening an in-app browser auth session.
///
/// Implement this trait with the platform's auth-session API. It must open
/// `auth_url` and resolve once the browser navigates to `redirect_uri` or
/// is closed.
#[async_trait]
pub trait AuthBrowser: Send + Sync {
    async fn open_auth_session(
        &self,
        auth_url: &Url,
        redirect_uri: &str,
    ) -> Result<BrowserOutcome, AppwriteError>;
}

/// Credentials carried by the OAuth callback deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    pub user_id: String,
    pub secret: String,
}

impl OAuthCallback {
    /// Extract `userId` and `secret` from the callback URL.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or either parameter is missing or empty.
    pub fn parse(callback_url: &str) -> Result<Self, AppwriteError> {
        let url = Url::parse(callback_url)?;

        let param = |name: &'static str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
                .ok_or(AppwriteError::MissingCallbackParam(name))
        };

        Ok(Self {
            secret: param("secret")?,
            user_id: param("userId")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback() {
        let callback =
            OAuthCallback::parse("appwrite-callback-estate://?secret=s3cr3t&userId=u1").unwrap();
        assert_eq!(callback.user_id, "u1");
        assert_eq!(callback.secret, "s3cr3t");
    }

    #[test]
    fn test_parse_decodes_values() {
        let callback = OAuthCallback::parse("exp://host/--/?userId=u%201&secret=a%2Bb").unwrap();
        assert_eq!(callback.user_id, "u 1");
        assert_eq!(callback.secret, "a+b");
    }

    #[test]
    fn test_parse_requires_both_params() {
        let err = OAuthCallback::parse("appwrite-callback-estate://?userId=u1").unwrap_err();
        assert!(matches!(err, AppwriteError::MissingCallbackParam("secret")));

        let err =
            OAuthCallback::parse("appwrite-callback-estate://?secret=s3&userId=").unwrap_err();
        assert!(matches!(err, AppwriteError::MissingCallbackParam("userId")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            OAuthCallback::parse("not a url"),
            Err(AppwriteError::Url(_))
        ));
    }
}
