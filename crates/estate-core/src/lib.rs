//! Core abstractions for the listing client's session layer.
//!
//! This crate provides the fundamental building blocks:
//! - `AsyncResource` - One async value with loading/error state and refetch
//! - `Notifier` - Blocking user notifications
//! - `AuthBackend` - Remote session service contract

pub mod notify;
pub mod resource;
pub mod traits;

pub use notify::{Alert, Notifier, RecordingNotifier, TracingNotifier};
pub use resource::{AsyncResource, Producer, ProducerError, Refetch, ResourceOptions, ResourceState};
pub use traits::{AuthBackend, AuthError, UserProfile};
