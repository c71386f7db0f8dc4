//! HTTP client for the idea-evaluation backend.
//!
//! Every call goes through [`ApiClient::perform`], which attaches the session
//! token, bounds the call by a timeout, honours an optional cancellation
//! token, and classifies failures into [`ClientError`]. A 401 response
//! expires the session as a side effect. There are no implicit retries.

mod error;
pub mod validate;

pub use error::ClientError;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::models::*;
use crate::session::{IdentityProvider, SessionContext};

use error::detail_from_body;

/// Default budget for a single call. Generation endpoints are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the backend API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    session: Arc<SessionContext>,
    cancel: Option<CancellationToken>,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionContext>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            session,
            cancel: None,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config, session: Arc<SessionContext>) -> Self {
        Self::new(&config.api_url, session).with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A handle whose calls abort as soon as `token` is cancelled.
    pub fn cancellable(&self, token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
            ..self.clone()
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with the bearer token when one is stored.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Issue one JSON call with the client's default timeout.
    pub async fn perform<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.perform_with_timeout(method, path, body, self.timeout)
            .await
    }

    /// Issue one JSON call, racing it against `timeout` and the handle's
    /// cancellation token. Losing the race drops the in-flight request.
    pub async fn perform_with_timeout<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        timeout: Duration,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut req = self.request(method.clone(), path);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.execute(&method, path, req, timeout).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        req: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ClientError> {
        tracing::debug!(%method, path, "Sending request");

        let call = async {
            let response = req.send().await?;
            self.handle_response(response).await
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            result = call => result,
            _ = tokio::time::sleep(timeout) => Err(ClientError::Timeout(timeout)),
            _ = cancelled => Err(ClientError::Cancelled),
        };

        match &result {
            Ok(_) => tracing::debug!(%method, path, "Request succeeded"),
            Err(ClientError::Cancelled) => tracing::debug!(%method, path, "Request cancelled"),
            Err(e) => tracing::warn!(%method, path, "Request failed: {}", e),
        }
        result
    }

    /// Decode a success body, or classify the failure.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            // Bodyless success decodes as JSON null.
            let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            return serde_json::from_slice(bytes).map_err(|e| ClientError::Decode(e.to_string()));
        }

        if status == StatusCode::UNAUTHORIZED {
            self.session.expire();
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::http(status, detail_from_body(status, &body)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.perform::<T, ()>(Method::GET, path, None).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.perform(Method::POST, path, Some(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.perform::<T, ()>(Method::POST, path, None).await
    }

    /// Call `path` with `query` appended as URL-encoded parameters.
    async fn perform_query<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut req = self.request(method.clone(), path).query(query);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.execute(&method, path, req, self.timeout).await
    }

    /// `POST path?idea_id=...`, the shape of every generate endpoint.
    async fn generate_for<T, B>(
        &self,
        path: &str,
        idea_id: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.perform_query(Method::POST, path, &[("idea_id", idea_id)], body)
            .await
    }

    // ============================================================
    // Auth
    // ============================================================

    pub async fn signup(&self, input: &SignupInput) -> Result<MessageResponse, ClientError> {
        validate::signup(input)?;
        self.post("/auth/signup", input).await
    }

    /// Exchange credentials for a token. Persisting it is the session's job.
    pub async fn login(&self, input: &LoginInput) -> Result<AuthResponse, ClientError> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(ClientError::validation("Email and password are required."));
        }
        self.post("/auth/login", input).await
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.get("/auth/me").await
    }

    pub async fn dashboard(&self) -> Result<Dashboard, ClientError> {
        self.get("/auth/dashboard").await
    }

    /// Confirm an account with the token from the verification email.
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse, ClientError> {
        if token.trim().is_empty() {
            return Err(ClientError::validation("Verification token is required."));
        }
        self.perform_query::<_, ()>(
            Method::GET,
            "/auth/verify-email",
            &[("token", token.trim())],
            None,
        )
        .await
    }

    /// Whether the backend offers Google sign-in.
    pub async fn google_auth_status(&self) -> Result<GoogleAuthStatus, ClientError> {
        self.get("/auth/google/status").await
    }

    // ============================================================
    // Ideas and validation
    // ============================================================

    pub async fn submit_idea(&self, input: &CreateIdeaInput) -> Result<IdeaCreated, ClientError> {
        validate::idea(input)?;
        self.post("/ideas/", input).await
    }

    pub async fn evaluation(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.get(&idea_path("/ideas", idea_id, "/evaluation")).await
    }

    pub async fn evaluate(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.post_empty(&idea_path("/ideas", idea_id, "/evaluate"))
            .await
    }

    // ============================================================
    // Reports
    // ============================================================

    pub async fn market_research(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.get(&idea_path("/market-research/idea", idea_id, ""))
            .await
    }

    pub async fn generate_market_research(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.generate_for::<_, ()>("/market-research/generate", idea_id, None)
            .await
    }

    pub async fn pitch_deck(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.get(&idea_path("/pitch-deck/idea", idea_id, "")).await
    }

    pub async fn generate_pitch_deck(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.generate_for::<_, ()>("/pitch-deck/generate", idea_id, None)
            .await
    }

    pub async fn mvp(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.get(&idea_path("/mvp/idea", idea_id, "")).await
    }

    pub async fn generate_mvp(&self, idea_id: &str) -> Result<Value, ClientError> {
        self.generate_for::<_, ()>("/mvp/generate", idea_id, None)
            .await
    }

    pub async fn legal_documents(&self, idea_id: &str) -> Result<LegalDocumentList, ClientError> {
        self.get(&idea_path("/legal/idea", idea_id, "")).await
    }

    pub async fn generate_legal(
        &self,
        idea_id: &str,
        input: &GenerateLegalInput,
    ) -> Result<Value, ClientError> {
        self.generate_for("/legal/generate", idea_id, Some(input))
            .await
    }

    // ============================================================
    // Chat
    // ============================================================

    pub async fn chat_status(&self, idea_id: &str) -> Result<ChatStatus, ClientError> {
        self.get(&idea_path("/chat", idea_id, "/status")).await
    }

    pub async fn ask(&self, idea_id: &str, question: &str) -> Result<ChatAnswer, ClientError> {
        validate::question(question)?;
        let body = AskInput {
            question: question.trim().to_string(),
        };
        self.post(&idea_path("/chat", idea_id, "/ask"), &body)
            .await
    }
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn current_user(&self) -> Result<User, ClientError> {
        self.me().await
    }
}

/// `{prefix}/{idea_id}{suffix}` with the id URL-encoded as one path segment.
fn idea_path(prefix: &str, idea_id: &str, suffix: &str) -> String {
    format!("{}/{}{}", prefix, urlencoding::encode(idea_id), suffix)
}
