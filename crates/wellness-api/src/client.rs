// HTTP client for the portal backend.
//
// The backend surface is split into three traits (auth, chat, admin) so
// each client-side component depends only on the calls it makes and can be
// tested against a small mock. `HttpPortalApi` implements all three over
// reqwest and shares one bearer token between them.

use std::sync::RwLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use wellness_core::config::ApiConfig;
use wellness_core::models::{
    Ack, Analytics, ChatFeedback, ChatHistoryResponse, ChatMessagesResponse, ChatSummary,
    FeedbackEntry, KeywordEntry, KeywordUpdate, LoginRequest, LoginResponse, Message, NewKeyword,
    PatientRecord, PatientUpdate, SearchResponse, SendRequest, SendResponse, SignupRequest,
    SignupResponse, TextFeedbackEntry, TextFeedbackRequest,
};

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Sign-in, registration, and the bearer token used by every other call.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Install (or clear) the token attached to subsequent requests.
    fn set_token(&self, token: Option<String>);

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError>;

    async fn signup(&self, req: &SignupRequest) -> Result<SignupResponse, ApiError>;
}

/// Conversation endpoints used by the chat session controller.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn chat_history(&self, user_id: &str) -> Result<Vec<ChatSummary>, ApiError>;

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, ApiError>;

    async fn send_message(&self, req: &SendRequest) -> Result<SendResponse, ApiError>;

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ApiError>;

    async fn search_chats(&self, user_id: &str, query: &str)
        -> Result<Vec<ChatSummary>, ApiError>;

    async fn submit_chat_feedback(&self, feedback: &ChatFeedback) -> Result<(), ApiError>;

    async fn submit_text_feedback(&self, feedback: &TextFeedbackRequest) -> Result<(), ApiError>;
}

/// Admin panel endpoints.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn analytics(&self) -> Result<Analytics, ApiError>;

    async fn chat_feedback(&self) -> Result<Vec<FeedbackEntry>, ApiError>;

    async fn text_feedbacks(&self) -> Result<Vec<TextFeedbackEntry>, ApiError>;

    async fn keywords(&self) -> Result<Vec<KeywordEntry>, ApiError>;

    async fn add_keyword(&self, keyword: &NewKeyword) -> Result<Ack, ApiError>;

    async fn update_keyword(&self, id: &str, update: &KeywordUpdate) -> Result<Ack, ApiError>;

    async fn delete_keyword(&self, id: &str) -> Result<(), ApiError>;

    async fn pending_users(&self) -> Result<Vec<PatientRecord>, ApiError>;

    async fn approve_user(&self, id: &str) -> Result<(), ApiError>;

    async fn reject_user(&self, id: &str) -> Result<(), ApiError>;

    async fn patients(&self) -> Result<Vec<PatientRecord>, ApiError>;

    async fn update_patient(&self, id: &str, update: &PatientUpdate) -> Result<(), ApiError>;

    async fn delete_patient(&self, id: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// HttpPortalApi
// ---------------------------------------------------------------------------

/// reqwest-backed implementation of the portal API.
pub struct HttpPortalApi {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl HttpPortalApi {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API base URL {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL {base_url} cannot carry a path");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// `{base}/api/{segments...}` with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match self.current_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send the request and return the body of a success response.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::Transport)?;
        if status.is_success() {
            Ok(body)
        } else {
            debug!("backend returned {}: {}", status, body);
            Err(ApiError::from_status(status.as_u16(), &body))
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.execute(builder).await?;
        decode(&body)
    }

    async fn fetch_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.fetch(self.request(method, segments).json(body)).await
    }

    async fn call(&self, method: Method, segments: &[&str]) -> Result<(), ApiError> {
        self.execute(self.request(method, segments)).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl AuthApi for HttpPortalApi {
    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.fetch_json(Method::POST, &["login"], req).await
    }

    async fn signup(&self, req: &SignupRequest) -> Result<SignupResponse, ApiError> {
        self.fetch_json(Method::POST, &["signup"], req).await
    }
}

#[async_trait]
impl ChatApi for HttpPortalApi {
    async fn chat_history(&self, user_id: &str) -> Result<Vec<ChatSummary>, ApiError> {
        let builder = self
            .request(Method::GET, &["chat", "history"])
            .query(&[("user_id", user_id)]);
        let resp: ChatHistoryResponse = self.fetch(builder).await?;
        Ok(resp.chats)
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>, ApiError> {
        let resp: ChatMessagesResponse = self
            .fetch(self.request(Method::GET, &["chat", chat_id]))
            .await?;
        Ok(resp.messages)
    }

    async fn send_message(&self, req: &SendRequest) -> Result<SendResponse, ApiError> {
        self.fetch_json(Method::POST, &["chat", "send"], req).await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, &["chat", chat_id]).await
    }

    async fn search_chats(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<Vec<ChatSummary>, ApiError> {
        let builder = self
            .request(Method::GET, &["chat", "search"])
            .query(&[("user_id", user_id), ("q", query)]);
        let resp: SearchResponse = self.fetch(builder).await?;
        Ok(resp.results)
    }

    async fn submit_chat_feedback(&self, feedback: &ChatFeedback) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &["chat", "feedback"])
            .json(feedback);
        self.execute(builder).await.map(|_| ())
    }

    async fn submit_text_feedback(&self, feedback: &TextFeedbackRequest) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, &["feedback"]).json(feedback);
        self.execute(builder).await.map(|_| ())
    }
}

#[async_trait]
impl AdminApi for HttpPortalApi {
    async fn analytics(&self) -> Result<Analytics, ApiError> {
        self.fetch(self.request(Method::GET, &["admin", "analytics"]))
            .await
    }

    async fn chat_feedback(&self) -> Result<Vec<FeedbackEntry>, ApiError> {
        self.fetch(self.request(Method::GET, &["admin", "feedback"]))
            .await
    }

    async fn text_feedbacks(&self) -> Result<Vec<TextFeedbackEntry>, ApiError> {
        self.fetch(self.request(Method::GET, &["admin", "text_feedbacks"]))
            .await
    }

    async fn keywords(&self) -> Result<Vec<KeywordEntry>, ApiError> {
        self.fetch(self.request(Method::GET, &["admin", "keywords"]))
            .await
    }

    async fn add_keyword(&self, keyword: &NewKeyword) -> Result<Ack, ApiError> {
        self.fetch_json(Method::POST, &["admin", "keywords"], keyword)
            .await
    }

    async fn update_keyword(&self, id: &str, update: &KeywordUpdate) -> Result<Ack, ApiError> {
        self.fetch_json(Method::PUT, &["admin", "keywords", id], update)
            .await
    }

    async fn delete_keyword(&self, id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, &["admin", "keywords", id]).await
    }

    async fn pending_users(&self) -> Result<Vec<PatientRecord>, ApiError> {
        self.fetch(self.request(Method::GET, &["admin", "users", "pending"]))
            .await
    }

    async fn approve_user(&self, id: &str) -> Result<(), ApiError> {
        self.call(Method::PUT, &["admin", "users", "approve", id])
            .await
    }

    async fn reject_user(&self, id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, &["admin", "users", "reject", id])
            .await
    }

    async fn patients(&self) -> Result<Vec<PatientRecord>, ApiError> {
        self.fetch(self.request(Method::GET, &["admin", "patients"]))
            .await
    }

    async fn update_patient(&self, id: &str, update: &PatientUpdate) -> Result<(), ApiError> {
        let builder = self
            .request(Method::PUT, &["admin", "patients", id])
            .json(update);
        self.execute(builder).await.map(|_| ())
    }

    async fn delete_patient(&self, id: &str) -> Result<(), ApiError> {
        self.call(Method::DELETE, &["admin", "patients", id]).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
