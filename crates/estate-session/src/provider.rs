//! Process-wide auth session provider.
//!
//! One [`AuthSessionProvider`] is mounted near the root of the app. It owns
//! a single user-lookup resource and answers "who is signed in". Pass it
//! down explicitly, or run a subtree inside [`AuthSessionProvider::scope`]
//! and look it up with [`use_auth_session`].

use std::{future::Future, sync::Arc, time::Duration};

use estate_core::{
    AsyncResource, AuthBackend, Notifier, ProducerError, Refetch, ResourceOptions, ResourceState,
    UserProfile,
};
use futures::{StreamExt, stream::BoxStream};
use serde::Serialize;
use thiserror::Error;

tokio::task_local! {
    static AUTH_SESSION: AuthSessionProvider;
}

type UserLookup = AsyncResource<Option<UserProfile>, ()>;

/// Context lookup error.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("use_auth_session must be used within an AuthSessionProvider scope")]
    OutsideProvider,
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// A lookup is in flight.
    Checking,
    /// A user is signed in.
    Authenticated,
    /// No user, either because there is no session or the lookup failed.
    Unauthenticated,
}

/// Read view of the session, derived fresh on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub is_logged_in: bool,
    pub user: Option<UserProfile>,
    pub loading: bool,
}

impl AuthSession {
    fn from_state(state: &ResourceState<Option<UserProfile>>) -> Self {
        let user = state.data.clone().flatten();
        Self {
            is_logged_in: user.is_some(),
            user,
            loading: state.loading,
        }
    }

    #[must_use]
    pub const fn status(&self) -> AuthStatus {
        if self.loading {
            AuthStatus::Checking
        } else if self.is_logged_in {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }
}

/// Global auth session state, backed by one user-lookup resource.
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Clone)]
pub struct AuthSessionProvider {
    backend: Arc<dyn AuthBackend>,
    notifier: Arc<dyn Notifier>,
    lookup: UserLookup,
}

impl AuthSessionProvider {
    /// Mount the provider and start looking up the current user.
    ///
    /// A failure of this first lookup is recorded but not alerted; the app
    /// treats it the same as having no session.
    #[must_use]
    pub fn mount(backend: Arc<dyn AuthBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self::mount_with_options(backend, notifier, ResourceOptions::new())
    }

    /// Like [`Self::mount`], failing lookups that take longer than `timeout`.
    #[must_use]
    pub fn mount_with_timeout(
        backend: Arc<dyn AuthBackend>,
        notifier: Arc<dyn Notifier>,
        timeout: Duration,
    ) -> Self {
        Self::mount_with_options(backend, notifier, ResourceOptions::new().with_timeout(timeout))
    }

    fn mount_with_options(
        backend: Arc<dyn AuthBackend>,
        notifier: Arc<dyn Notifier>,
        options: ResourceOptions,
    ) -> Self {
        let lookup_backend = Arc::clone(&backend);
        let lookup = AsyncResource::new(
            move |(): ()| {
                let backend = Arc::clone(&lookup_backend);
                async move {
                    backend
                        .fetch_current_user()
                        .await
                        .map(|user| user.filter(UserProfile::is_identified))
                        .map_err(ProducerError::other)
                }
            },
            (),
            options.skip_initial(false).quiet_initial(true),
            Arc::clone(&notifier),
        );
        tracing::debug!("auth session provider mounted");

        Self {
            backend,
            notifier,
            lookup,
        }
    }

    /// Run `fut` with this provider reachable through [`use_auth_session`].
    ///
    /// Tasks spawned from inside `fut` do not inherit the scope.
    pub async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        AUTH_SESSION.scope(self.clone(), fut).await
    }

    #[must_use]
    pub fn session(&self) -> AuthSession {
        AuthSession::from_state(&self.lookup.state())
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user().is_some()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.lookup.data().flatten()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.lookup.loading()
    }

    /// Message of the last failed lookup.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lookup.error()
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.session().status()
    }

    /// Look up the current user again.
    pub fn refetch(&self) -> Refetch {
        self.lookup.refetch(())
    }

    /// Wait for the in-flight lookup, if any, and return the resulting session.
    pub async fn settled(&self) -> AuthSession {
        AuthSession::from_state(&self.lookup.settled().await)
    }

    /// Stream of sessions: the current one, then one per change.
    #[must_use]
    pub fn sessions(&self) -> BoxStream<'static, AuthSession> {
        self.lookup
            .changes()
            .map(|state| AuthSession::from_state(&state))
            .boxed()
    }

    pub(crate) fn backend(&self) -> &dyn AuthBackend {
        self.backend.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}

/// Get the provider of the enclosing [`AuthSessionProvider::scope`].
///
/// # Errors
/// Returns [`ContextError::OutsideProvider`] when called outside any scope.
pub fn use_auth_session() -> Result<AuthSessionProvider, ContextError> {
    AUTH_SESSION
        .try_with(Clone::clone)
        .map_err(|_| ContextError::OutsideProvider)
}
