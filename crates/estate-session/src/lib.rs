//! Global auth session for the listing client.
//!
//! Provides:
//! - `AuthSessionProvider` - Process-wide "who is signed in" state
//! - `sign_in` / `sign_out` - User-triggered session actions
//! - Route gates for the protected root and the sign-in screen
//! - Backend implementations (memory)

pub mod actions;
pub mod backend;
pub mod provider;
pub mod routes;

pub use actions::{ActionError, sign_in, sign_out};
pub use provider::{AuthSession, AuthSessionProvider, AuthStatus, ContextError, use_auth_session};
pub use routes::{RootRoute, SignInRoute, root_gate, sign_in_gate};
