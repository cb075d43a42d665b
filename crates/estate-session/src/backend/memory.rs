//! In-memory auth backend.

use std::sync::{
    RwLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use estate_core::{AuthBackend, AuthError, UserProfile};
use uuid::Uuid;

/// A session created by a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySession {
    pub id: Uuid,
}

/// In-memory auth backend with a single account.
///
/// Useful for development and tests. Failures can be switched on to
/// exercise the error paths; nothing survives a restart.
pub struct MemoryBackend {
    account: UserProfile,
    session: RwLock<Option<MemorySession>>,
    reject_logins: AtomicBool,
    reject_logouts: AtomicBool,
    lookup_failure: RwLock<Option<String>>,
    lookups: AtomicUsize,
}

impl MemoryBackend {
    /// Create a backend for `account` with no active session.
    #[must_use]
    pub fn new(account: UserProfile) -> Self {
        Self {
            account,
            session: RwLock::new(None),
            reject_logins: AtomicBool::new(false),
            reject_logouts: AtomicBool::new(false),
            lookup_failure: RwLock::new(None),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Create a backend for `account` that already has a session.
    #[must_use]
    pub fn signed_in(account: UserProfile) -> Self {
        let backend = Self::new(account);
        if let Ok(mut session) = backend.session.write() {
            *session = Some(new_session());
        }
        backend
    }

    /// Make logins report that no session was created.
    pub fn reject_logins(&self, reject: bool) {
        self.reject_logins.store(reject, Ordering::SeqCst);
    }

    /// Make logouts fail with a request error.
    pub fn reject_logouts(&self, reject: bool) {
        self.reject_logouts.store(reject, Ordering::SeqCst);
    }

    /// Make user lookups fail with `message`, or succeed again with `None`.
    pub fn fail_lookups(&self, message: Option<&str>) {
        if let Ok(mut failure) = self.lookup_failure.write() {
            *failure = message.map(str::to_owned);
        }
    }

    /// The active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<MemorySession> {
        self.session.read().ok().and_then(|session| *session)
    }

    /// Number of user lookups served so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

fn new_session() -> MemorySession {
    MemorySession { id: Uuid::new_v4() }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn initiate_login(&self) -> Result<bool, AuthError> {
        if self.reject_logins.load(Ordering::SeqCst) {
            tracing::debug!("login rejected");
            return Ok(false);
        }

        let session = new_session();
        *self
            .session
            .write()
            .map_err(|e| AuthError::Request(e.to_string()))? = Some(session);
        tracing::debug!(session_id = %session.id, "session created");

        Ok(true)
    }

    async fn terminate_session(&self) -> Result<bool, AuthError> {
        if self.reject_logouts.load(Ordering::SeqCst) {
            return Err(AuthError::Request("logout rejected".to_owned()));
        }

        let ended = self
            .session
            .write()
            .map_err(|e| AuthError::Request(e.to_string()))?
            .take();

        Ok(ended.is_some())
    }

    async fn fetch_current_user(&self) -> Result<Option<UserProfile>, AuthError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self
            .lookup_failure
            .read()
            .map_err(|e| AuthError::Request(e.to_string()))?
            .clone()
        {
            return Err(AuthError::Request(message));
        }

        let has_session = self
            .session
            .read()
            .map_err(|e| AuthError::Request(e.to_string()))?
            .is_some();

        Ok(has_session.then(|| self.account.clone()))
    }
}
