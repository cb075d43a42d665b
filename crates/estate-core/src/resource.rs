//! Async resource: one producer, observable state, manual refetch.
//!
//! A resource starts one fetch at construction (unless skipped) and
//! re-runs the producer whenever [`AsyncResource::refetch`] is called.
//! Old data stays visible while a new attempt is loading. Failures,
//! producer panics included, are stored as messages and reported through
//! a [`Notifier`], never returned to the caller.

use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use futures::{FutureExt, StreamExt, stream::BoxStream};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;

use crate::notify::Notifier;

/// Message stored when a failure has no text of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

const ALERT_TITLE: &str = "Error";

/// Producer failure.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("{0}")]
    Message(String),
    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProducerError {
    /// Wrap any error.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }

    /// Failure carrying the message of a panic payload, if it has one.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        Self::Message(message)
    }

    /// Human-readable text for the error state.
    #[must_use]
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_owned()
        } else {
            message
        }
    }
}

impl From<String> for ProducerError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for ProducerError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

/// Asynchronous source of a resource value.
///
/// Closures of the form `Fn(P) -> impl Future<Output = Result<T, ProducerError>>`
/// implement this trait.
#[async_trait]
pub trait Producer<T, P>: Send + Sync {
    /// Produce a fresh value for `params`.
    async fn produce(&self, params: P) -> Result<T, ProducerError>;
}

#[async_trait]
impl<T, P, F, Fut> Producer<T, P> for F
where
    T: Send + 'static,
    P: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ProducerError>> + Send + 'static,
{
    async fn produce(&self, params: P) -> Result<T, ProducerError> {
        (self)(params).await
    }
}

/// Observable state of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState<T> {
    /// Last successfully produced value.
    pub data: Option<T>,
    /// An attempt is in flight.
    pub loading: bool,
    /// Message of the last failed attempt, cleared when a new one starts.
    pub error: Option<String>,
}

impl<T> ResourceState<T> {
    const fn initial(loading: bool) -> Self {
        Self {
            data: None,
            loading,
            error: None,
        }
    }
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self::initial(false)
    }
}

/// Construction options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceOptions {
    /// Do not fetch at construction.
    pub skip_initial: bool,
    /// Store a failure of the construction-time fetch without alerting.
    pub quiet_initial: bool,
    /// Fail an attempt that takes longer than this.
    pub timeout: Option<Duration>,
}

impl ResourceOptions {
    /// Default options: fetch at construction, alert on every failure, no timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skip_initial: false,
            quiet_initial: false,
            timeout: None,
        }
    }

    #[must_use]
    pub const fn skip_initial(mut self, skip: bool) -> Self {
        self.skip_initial = skip;
        self
    }

    #[must_use]
    pub const fn quiet_initial(mut self, quiet: bool) -> Self {
        self.quiet_initial = quiet;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alerting {
    Loud,
    Quiet,
}

enum Commit {
    Succeeded,
    Failed(String),
    Superseded,
}

struct Shared<T> {
    state: watch::Sender<ResourceState<T>>,
    latest: AtomicU64,
}

impl<T> Shared<T> {
    fn begin(&self) -> u64 {
        let attempt = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        tracing::debug!(attempt, "fetch attempt started");
        attempt
    }

    /// Only the most recently started attempt may write.
    fn commit(&self, attempt: u64, outcome: Result<T, ProducerError>) -> Commit {
        let mut commit = Commit::Superseded;
        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != attempt {
                return false;
            }
            state.loading = false;
            match outcome {
                Ok(value) => {
                    state.data = Some(value);
                    commit = Commit::Succeeded;
                }
                Err(err) => {
                    let message = err.user_message();
                    state.error = Some(message.clone());
                    commit = Commit::Failed(message);
                }
            }
            true
        });
        commit
    }
}

/// Handle to a single asynchronous value.
///
/// Cloning yields another handle to the same state. Attempts still in
/// flight when the last handle is dropped are discarded on completion.
pub struct AsyncResource<T, P> {
    shared: Arc<Shared<T>>,
    producer: Arc<dyn Producer<T, P>>,
    notifier: Arc<dyn Notifier>,
    timeout: Option<Duration>,
}

impl<T, P> Clone for AsyncResource<T, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            producer: Arc::clone(&self.producer),
            notifier: Arc::clone(&self.notifier),
            timeout: self.timeout,
        }
    }
}

impl<T, P> AsyncResource<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Send + 'static,
{
    /// Create a resource and, unless `options.skip_initial`, start fetching
    /// with `initial_params`.
    ///
    /// Must be called within a tokio runtime.
    pub fn new<F>(
        producer: F,
        initial_params: P,
        options: ResourceOptions,
        notifier: Arc<dyn Notifier>,
    ) -> Self
    where
        F: Producer<T, P> + 'static,
    {
        let (state, _) = watch::channel(ResourceState::initial(!options.skip_initial));
        let resource = Self {
            shared: Arc::new(Shared {
                state,
                latest: AtomicU64::new(0),
            }),
            producer: Arc::new(producer),
            notifier,
            timeout: options.timeout,
        };

        if !options.skip_initial {
            let alerting = if options.quiet_initial {
                Alerting::Quiet
            } else {
                Alerting::Loud
            };
            drop(resource.start(initial_params, alerting));
        }

        resource
    }

    /// Re-run the producer with `params`.
    ///
    /// `loading` and `error` are updated before this returns. The attempt
    /// runs whether or not the returned future is awaited; awaiting it
    /// resolves once the attempt has settled.
    pub fn refetch(&self, params: P) -> Refetch {
        self.start(params, Alerting::Loud)
    }

    fn start(&self, params: P, alerting: Alerting) -> Refetch {
        let attempt = self.shared.begin();
        let producer = Arc::clone(&self.producer);
        let notifier = Arc::clone(&self.notifier);
        let shared = Arc::downgrade(&self.shared);
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let outcome =
                AssertUnwindSafe(produce_with_timeout(producer.as_ref(), params, timeout))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(ProducerError::from_panic(payload.as_ref())));

            let Some(shared) = shared.upgrade() else {
                tracing::debug!(attempt, "resource dropped, discarding result");
                return;
            };

            match shared.commit(attempt, outcome) {
                Commit::Succeeded => tracing::debug!(attempt, "fetch attempt succeeded"),
                Commit::Failed(message) => {
                    tracing::warn!(attempt, "fetch attempt failed: {message}");
                    if alerting == Alerting::Loud {
                        notifier.alert(ALERT_TITLE, &message);
                    }
                }
                Commit::Superseded => {
                    tracing::debug!(attempt, "fetch attempt superseded, discarding result");
                }
            }
        });

        Refetch { attempt, handle }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ResourceState<T> {
        self.shared.state.borrow().clone()
    }

    #[must_use]
    pub fn data(&self) -> Option<T> {
        self.shared.state.borrow().data.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.shared.state.borrow().error.clone()
    }

    /// Get a receiver for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.shared.state.subscribe()
    }

    /// Stream that yields the current state, then every change.
    #[must_use]
    pub fn changes(&self) -> BoxStream<'static, ResourceState<T>> {
        WatchStream::new(self.subscribe()).boxed()
    }

    /// Wait until no attempt is in flight and return that state.
    pub async fn settled(&self) -> ResourceState<T> {
        let mut rx = self.subscribe();
        if let Ok(state) = rx.wait_for(|state| !state.loading).await {
            return state.clone();
        }
        self.state()
    }
}

async fn produce_with_timeout<T, P>(
    producer: &dyn Producer<T, P>,
    params: P,
    timeout: Option<Duration>,
) -> Result<T, ProducerError>
where
    T: Send + 'static,
    P: Send + 'static,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, producer.produce(params))
            .await
            .unwrap_or(Err(ProducerError::TimedOut(limit))),
        None => producer.produce(params).await,
    }
}

/// A started fetch attempt; resolves when it has settled.
pub struct Refetch {
    attempt: u64,
    handle: JoinHandle<()>,
}

impl Refetch {
    /// Sequence number of this attempt.
    #[must_use]
    pub const fn attempt(&self) -> u64 {
        self.attempt
    }
}

impl Future for Refetch {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match Pin::new(&mut this.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => Poll::Ready(()),
            Poll::Ready(Err(err)) => {
                tracing::error!(attempt = this.attempt, "fetch attempt aborted: {err}");
                Poll::Ready(())
            }
        }
    }
}
