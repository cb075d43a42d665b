//! Route gates driven by the session.

use serde::Serialize;

use crate::provider::AuthSession;

pub const HOME_PATH: &str = "/";
pub const SIGN_IN_PATH: &str = "/sign-in";

/// Decision for the protected part of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootRoute {
    /// Still checking; show a spinner.
    Loading,
    /// Nobody is signed in.
    RedirectToSignIn,
    /// Render the protected screens.
    Render,
}

impl RootRoute {
    #[must_use]
    pub const fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::RedirectToSignIn => Some(SIGN_IN_PATH),
            Self::Loading | Self::Render => None,
        }
    }
}

/// Decision for the sign-in screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInRoute {
    /// Already signed in; go home.
    RedirectHome,
    ShowSignIn,
}

impl SignInRoute {
    #[must_use]
    pub const fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::RedirectHome => Some(HOME_PATH),
            Self::ShowSignIn => None,
        }
    }
}

/// Gate for the protected root layout.
#[must_use]
pub const fn root_gate(session: &AuthSession) -> RootRoute {
    if session.loading {
        RootRoute::Loading
    } else if !session.is_logged_in {
        RootRoute::RedirectToSignIn
    } else {
        RootRoute::Render
    }
}

/// Gate for the sign-in screen.
#[must_use]
pub const fn sign_in_gate(session: &AuthSession) -> SignInRoute {
    if !session.loading && session.is_logged_in {
        SignInRoute::RedirectHome
    } else {
        SignInRoute::ShowSignIn
    }
}

#[cfg(test)]
mod tests {
    use estate_core::UserProfile;

    use super::*;

    fn session(loading: bool, signed_in: bool) -> AuthSession {
        let user = signed_in.then(|| UserProfile::new("u1", "Ann", "a@x.com", ""));
        AuthSession {
            is_logged_in: user.is_some(),
            user,
            loading,
        }
    }

    #[test]
    fn test_root_gate() {
        assert_eq!(root_gate(&session(true, false)), RootRoute::Loading);
        assert_eq!(root_gate(&session(true, true)), RootRoute::Loading);
        assert_eq!(root_gate(&session(false, false)), RootRoute::RedirectToSignIn);
        assert_eq!(root_gate(&session(false, true)), RootRoute::Render);
        assert_eq!(RootRoute::RedirectToSignIn.redirect_target(), Some(SIGN_IN_PATH));
    }

    #[test]
    fn test_sign_in_gate() {
        assert_eq!(sign_in_gate(&session(false, true)), SignInRoute::RedirectHome);
        assert_eq!(sign_in_gate(&session(true, true)), SignInRoute::ShowSignIn);
        assert_eq!(sign_in_gate(&session(false, false)), SignInRoute::ShowSignIn);
        assert_eq!(SignInRoute::RedirectHome.redirect_target(), Some(HOME_PATH));
    }

    #[test]
    fn test_route_serialization() {
        let json = serde_json::to_string(&RootRoute::RedirectToSignIn).unwrap();
        assert_eq!(json, "\"redirect_to_sign_in\"");
    }
}
