//! Sign-in and sign-out actions triggered by the user.
//!
//! Both call the backend first and only refetch the session when the
//! backend reports success. Failures are alerted with a generic message
//! and leave the session untouched.

use estate_core::AuthError;
use thiserror::Error;

use crate::provider::{AuthSession, AuthSessionProvider};

pub const LOGIN_FAILED_MESSAGE: &str = "Failed to login";
pub const LOGOUT_FAILED_MESSAGE: &str = "An error occurred while logging out";
pub const LOGOUT_SUCCEEDED_MESSAGE: &str = "You have been logged out successfully";

/// Action error.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Login was not completed")]
    LoginRejected,
    #[error("Login failed: {0}")]
    Login(#[source] AuthError),
    #[error("Logout was not completed")]
    LogoutRejected,
    #[error("Logout failed: {0}")]
    Logout(#[source] AuthError),
}

/// Sign in through the backend, then refresh the session.
///
/// # Errors
/// Returns error if the backend did not establish a session.
pub async fn sign_in(provider: &AuthSessionProvider) -> Result<AuthSession, ActionError> {
    let outcome = match provider.backend().initiate_login().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ActionError::LoginRejected),
        Err(e) => Err(ActionError::Login(e)),
    };

    if let Err(e) = outcome {
        tracing::warn!("sign-in failed: {e}");
        provider.notifier().alert("Error", LOGIN_FAILED_MESSAGE);
        return Err(e);
    }

    provider.refetch().await;
    Ok(provider.session())
}

/// End the backend session, then refresh the session.
///
/// # Errors
/// Returns error if the backend did not end the session.
pub async fn sign_out(provider: &AuthSessionProvider) -> Result<AuthSession, ActionError> {
    let outcome = match provider.backend().terminate_session().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ActionError::LogoutRejected),
        Err(e) => Err(ActionError::Logout(e)),
    };

    if let Err(e) = outcome {
        tracing::warn!("sign-out failed: {e}");
        provider.notifier().alert("Error", LOGOUT_FAILED_MESSAGE);
        return Err(e);
    }

    provider.notifier().alert("Success", LOGOUT_SUCCEEDED_MESSAGE);
    provider.refetch().await;
    Ok(provider.session())
}
