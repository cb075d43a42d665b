//! Appwrite account API backend.
//!
//! Provides:
//! - `AppwriteBackend` - `AuthBackend` over the Appwrite REST API
//! - `AuthBrowser` - Seam for the platform's in-app browser auth session
//! - `AppwriteConfig` - Project settings, loadable from the environment

pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod protocol;

pub use client::AppwriteBackend;
pub use config::{AppwriteConfig, ConfigError, OAuthProvider};
pub use error::AppwriteError;
pub use oauth::{AuthBrowser, BrowserOutcome, OAuthCallback};
