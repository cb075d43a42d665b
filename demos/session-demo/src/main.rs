//! Walk through the sign-in / sign-out flow from a terminal.
//!
//! Run with: cargo run -p session-demo
//!
//! With `APPWRITE_ENDPOINT` and `APPWRITE_PROJECT_ID` set, the demo talks to
//! that project: it prints the OAuth URL and reads the callback URL you land
//! on from stdin. Otherwise it uses an in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use estate_appwrite::{AppwriteBackend, AppwriteConfig, AppwriteError, AuthBrowser, BrowserOutcome};
use estate_core::{AuthBackend, Notifier, TracingNotifier, UserProfile};
use estate_session::{
    AuthSessionProvider, backend::MemoryBackend, root_gate, sign_in, sign_in_gate, sign_out,
    use_auth_session,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Browser stand-in: the user opens the URL and pastes the callback back.
struct TerminalBrowser;

#[async_trait]
impl AuthBrowser for TerminalBrowser {
    async fn open_auth_session(
        &self,
        auth_url: &Url,
        redirect_uri: &str,
    ) -> Result<BrowserOutcome, AppwriteError> {
        tracing::info!(
            "open {auth_url} and paste the {redirect_uri} URL you are sent to (empty line cancels)"
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await {
            Ok(Some(line)) if !line.trim().is_empty() => Ok(BrowserOutcome::Success {
                url: line.trim().to_owned(),
            }),
            Ok(_) => Ok(BrowserOutcome::Cancel),
            Err(e) => Err(AppwriteError::Browser(e.to_string())),
        }
    }
}

fn select_backend() -> anyhow::Result<Arc<dyn AuthBackend>> {
    match AppwriteConfig::from_env() {
        Ok(config) => {
            tracing::info!(
                endpoint = %config.endpoint,
                project = %config.project_id,
                "using Appwrite backend"
            );
            Ok(Arc::new(AppwriteBackend::new(config, Arc::new(TerminalBrowser))?))
        }
        Err(e) => {
            tracing::info!("{e}; using in-memory backend");
            Ok(Arc::new(MemoryBackend::new(UserProfile::new(
                "demo-user",
                "Ann Lee",
                "ann@example.com",
                "https://example.com/avatars/initials?name=Ann+Lee",
            ))))
        }
    }
}

fn report(provider: &AuthSessionProvider) {
    let session = provider.session();
    tracing::info!(
        status = ?session.status(),
        root = ?root_gate(&session),
        sign_in = ?sign_in_gate(&session),
        user = session.user.as_ref().map_or("-", |user| user.name.as_str()),
        "session"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let provider = AuthSessionProvider::mount(select_backend()?, notifier);
    report(&provider);

    provider
        .scope(async {
            let provider = use_auth_session()?;
            provider.settled().await;
            report(&provider);

            if !provider.is_logged_in() {
                if let Err(e) = sign_in(&provider).await {
                    tracing::warn!("{e}");
                }
                report(&provider);
            }

            if provider.is_logged_in() {
                if let Err(e) = sign_out(&provider).await {
                    tracing::warn!("{e}");
                }
                report(&provider);
            }

            Ok::<_, anyhow::Error>(())
        })
        .await
}
