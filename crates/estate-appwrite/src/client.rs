//! Appwrite account API client.

use std::sync::Arc;

use async_trait::async_trait;
use estate_core::{AuthBackend, AuthError, UserProfile};
use reqwest::{
    Response, StatusCode,
    header::{HeaderMap, HeaderValue},
};
use url::Url;

use crate::{
    config::AppwriteConfig,
    error::AppwriteError,
    oauth::{AuthBrowser, BrowserOutcome, OAuthCallback},
    protocol::{AccountResponse, CreateSessionRequest, ErrorResponse, SessionResponse},
};

const PROJECT_HEADER: &str = "x-appwrite-project";

/// Auth backend talking to an Appwrite project.
///
/// Sessions are carried by the cookie the server sets on session creation;
/// the client keeps it for later requests.
pub struct AppwriteBackend {
    config: AppwriteConfig,
    http: reqwest::Client,
    browser: Arc<dyn AuthBrowser>,
}

impl AppwriteBackend {
    /// Create a backend for `config` that opens OAuth flows with `browser`.
    ///
    /// # Errors
    /// Returns error if the project id is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(
        config: AppwriteConfig,
        browser: Arc<dyn AuthBrowser>,
    ) -> Result<Self, AppwriteError> {
        let mut headers = HeaderMap::new();
        headers.insert(PROJECT_HEADER, HeaderValue::from_str(&config.project_id)?);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .user_agent(format!(
                "{} estate-appwrite/{}",
                config.platform,
                env!("CARGO_PKG_VERSION")
            ));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
            browser,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &AppwriteConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> Result<Url, AppwriteError> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))?)
    }

    /// URL that starts the OAuth2 token flow in a browser.
    ///
    /// # Errors
    /// Returns error if the endpoint is not a valid URL.
    pub fn oauth_url(&self) -> Result<Url, AppwriteError> {
        let redirect_uri = self.config.redirect_uri();
        let mut url = self.api_url(&format!(
            "account/tokens/oauth2/{}",
            self.config.oauth_provider.as_str()
        ))?;
        url.query_pairs_mut()
            .append_pair("project", &self.config.project_id)
            .append_pair("success", &redirect_uri)
            .append_pair("failure", &redirect_uri);
        Ok(url)
    }

    /// Image URL of an avatar built from the initials of `name`.
    ///
    /// # Errors
    /// Returns error if the endpoint is not a valid URL.
    pub fn avatar_initials_url(&self, name: &str) -> Result<Url, AppwriteError> {
        let mut url = self.api_url("avatars/initials")?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.config.project_id);
        Ok(url)
    }

    /// Run the browser flow and create a session from its callback.
    ///
    /// # Errors
    /// Returns error if the browser flow is not completed or session creation fails.
    pub async fn login(&self) -> Result<SessionResponse, AppwriteError> {
        let auth_url = self.oauth_url()?;
        let redirect_uri = self.config.redirect_uri();

        let callback_url = match self.browser.open_auth_session(&auth_url, &redirect_uri).await? {
            BrowserOutcome::Success { url } => url,
            BrowserOutcome::Cancel => return Err(AppwriteError::NotCompleted("cancelled")),
            BrowserOutcome::Dismiss => return Err(AppwriteError::NotCompleted("dismissed")),
        };
        let callback = OAuthCallback::parse(&callback_url)?;

        let response = self
            .http
            .post(self.api_url("account/sessions/token")?)
            .json(&CreateSessionRequest {
                user_id: &callback.user_id,
                secret: &callback.secret,
            })
            .send()
            .await?;
        let session: SessionResponse = check(response).await?.json().await?;
        tracing::info!(session_id = %session.id, user_id = %session.user_id, "session created");

        Ok(session)
    }

    /// Delete the current session.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn logout(&self) -> Result<(), AppwriteError> {
        let response = self
            .http
            .delete(self.api_url("account/sessions/current")?)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Fetch the signed-in account, `None` when it has no id.
    ///
    /// # Errors
    /// Returns error if the request fails, including when there is no session.
    pub async fn current_account(&self) -> Result<Option<UserProfile>, AppwriteError> {
        let response = self.http.get(self.api_url("account")?).send().await?;
        let account: AccountResponse = check(response).await?.json().await?;

        if account.id.is_empty() {
            return Ok(None);
        }

        let avatar_url = self.avatar_initials_url(&account.name)?;
        Ok(Some(UserProfile::new(
            account.id,
            account.name,
            account.email,
            avatar_url,
        )))
    }
}

async fn check(response: Response) -> Result<Response, AppwriteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.message)
        .unwrap_or(body);

    Err(AppwriteError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Failures are logged and reported as "no session", never raised.
#[async_trait]
impl AuthBackend for AppwriteBackend {
    async fn initiate_login(&self) -> Result<bool, AuthError> {
        match self.login().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::error!("login failed: {e}");
                Ok(false)
            }
        }
    }

    async fn terminate_session(&self) -> Result<bool, AuthError> {
        match self.logout().await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!("logout failed: {e}");
                Ok(false)
            }
        }
    }

    async fn fetch_current_user(&self) -> Result<Option<UserProfile>, AuthError> {
        match self.current_account().await {
            Ok(user) => Ok(user),
            Err(AppwriteError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                tracing::debug!("no active session");
                Ok(None)
            }
            Err(e) => {
                tracing::error!("current user lookup failed: {e}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
    };

    use super::*;

    struct ScriptedBrowser(BrowserOutcome);

    #[async_trait]
    impl AuthBrowser for ScriptedBrowser {
        async fn open_auth_session(
            &self,
            _auth_url: &Url,
            _redirect_uri: &str,
        ) -> Result<BrowserOutcome, AppwriteError> {
            Ok(self.0.clone())
        }
    }

    fn backend(endpoint: &str, outcome: BrowserOutcome) -> AppwriteBackend {
        AppwriteBackend::new(
            AppwriteConfig::new(endpoint, "estate"),
            Arc::new(ScriptedBrowser(outcome)),
        )
        .unwrap()
    }

    /// Serve one request with a canned response; yields the request head.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            loop {
                let Ok(n) = socket.read(&mut buf).await else {
                    return;
                };
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (format!("http://{addr}/v1"), rx)
    }

    #[test]
    fn test_oauth_url() {
        let backend = backend("https://cloud.appwrite.io/v1/", BrowserOutcome::Cancel);
        let url = backend.oauth_url().unwrap();

        assert_eq!(url.path(), "/v1/account/tokens/oauth2/google");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("project".to_owned(), "estate".to_owned())));
        assert!(query.contains(&("success".to_owned(), "appwrite-callback-estate://".to_owned())));
    }

    #[test]
    fn test_avatar_initials_url() {
        let backend = backend("https://cloud.appwrite.io/v1", BrowserOutcome::Cancel);
        let url = backend.avatar_initials_url("Ann Lee").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cloud.appwrite.io/v1/avatars/initials?name=Ann+Lee&project=estate"
        );
    }

    #[tokio::test]
    async fn test_cancelled_browser_is_not_a_login() {
        let backend = backend("http://127.0.0.1:9/v1", BrowserOutcome::Cancel);
        assert!(!backend.initiate_login().await.unwrap());
    }

    #[tokio::test]
    async fn test_callback_without_secret_is_not_a_login() {
        let backend = backend(
            "http://127.0.0.1:9/v1",
            BrowserOutcome::Success {
                url: "appwrite-callback-estate://?userId=u1".to_owned(),
            },
        );
        assert!(matches!(
            backend.login().await,
            Err(AppwriteError::MissingCallbackParam("secret"))
        ));
    }

    #[tokio::test]
    async fn test_login_creates_session_from_callback() {
        let (endpoint, request) =
            serve_once("201 Created", r#"{"$id":"sess1","userId":"u1"}"#).await;
        let backend = backend(
            &endpoint,
            BrowserOutcome::Success {
                url: "appwrite-callback-estate://?secret=s3&userId=u1".to_owned(),
            },
        );

        assert!(backend.initiate_login().await.unwrap());

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /v1/account/sessions/token"));
        assert!(request.to_ascii_lowercase().contains("x-appwrite-project: estate"));
        assert!(request.contains(r#""userId":"u1""#));
    }

    #[tokio::test]
    async fn test_current_user_builds_avatar() {
        let (endpoint, _request) =
            serve_once("200 OK", r#"{"$id":"u1","name":"Ann","email":"a@x.com"}"#).await;
        let backend = backend(&endpoint, BrowserOutcome::Cancel);

        let user = backend.fetch_current_user().await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(
            user.avatar_url,
            format!("{endpoint}/avatars/initials?name=Ann&project=estate")
        );
    }

    #[tokio::test]
    async fn test_unauthorized_lookup_is_no_user() {
        let (endpoint, _request) = serve_once(
            "401 Unauthorized",
            r#"{"message":"User (role: guests) missing scope (account)","code":401,"type":"general_unauthorized_scope"}"#,
        )
        .await;
        let backend = backend(&endpoint, BrowserOutcome::Cancel);

        assert!(backend.fetch_current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_lookup_keeps_server_message() {
        let (endpoint, _request) = serve_once(
            "401 Unauthorized",
            r#"{"message":"missing scope","code":401,"type":"general_unauthorized_scope"}"#,
        )
        .await;
        let backend = backend(&endpoint, BrowserOutcome::Cancel);

        let err = backend.current_account().await.unwrap_err();
        assert!(matches!(
            err,
            AppwriteError::Status { status: 401, ref message } if message == "missing scope"
        ));
    }

    #[tokio::test]
    async fn test_logout_deletes_current_session() {
        let (endpoint, request) = serve_once("204 No Content", "").await;
        let backend = backend(&endpoint, BrowserOutcome::Cancel);

        assert!(backend.terminate_session().await.unwrap());
        assert!(request.await.unwrap().starts_with("DELETE /v1/account/sessions/current"));
    }
}
