// src/client.rs

//! Typed HTTP client for the quiz endpoints consumed by a quiz session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    models::{
        question::PublicQuestion,
        quiz::Quiz,
        result::{QuizResult, SubmitQuizRequest, SubmitQuizResponse},
    },
    session::gateway::{QuizSource, SubmissionGateway},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },
}

/// Error body produced by the backend's `AppError`.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attaches a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Maps non-2xx responses to `ClientError::Server`, decoding the body otherwise.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn fetch_quiz(&self, quiz_id: i64) -> Result<Quiz, ClientError> {
        let request = self.http.get(self.url(&format!("/api/quizzes/{}", quiz_id)));
        Self::decode(self.authorized(request).send().await?).await
    }

    /// Questions in server order; may contain repeated ids.
    pub async fn fetch_questions(&self, quiz_id: i64) -> Result<Vec<PublicQuestion>, ClientError> {
        let request = self
            .http
            .get(self.url(&format!("/api/quizzes/{}/questions", quiz_id)));
        Self::decode(self.authorized(request).send().await?).await
    }

    pub async fn submit(
        &self,
        quiz_id: i64,
        request: &SubmitQuizRequest,
    ) -> Result<SubmitQuizResponse, ClientError> {
        let builder = self
            .http
            .post(self.url(&format!("/api/quizzes/{}/submit", quiz_id)))
            .json(request);
        Self::decode(self.authorized(builder).send().await?).await
    }

    pub async fn fetch_result(&self, result_id: i64) -> Result<QuizResult, ClientError> {
        let request = self.http.get(self.url(&format!("/api/results/{}", result_id)));
        Self::decode(self.authorized(request).send().await?).await
    }
}

#[async_trait]
impl QuizSource for ApiClient {
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<Quiz, ClientError> {
        ApiClient::fetch_quiz(self, quiz_id).await
    }

    async fn fetch_questions(&self, quiz_id: i64) -> Result<Vec<PublicQuestion>, ClientError> {
        ApiClient::fetch_questions(self, quiz_id).await
    }
}

#[async_trait]
impl SubmissionGateway for ApiClient {
    async fn submit(
        &self,
        quiz_id: i64,
        request: &SubmitQuizRequest,
    ) -> Result<SubmitQuizResponse, ClientError> {
        ApiClient::submit(self, quiz_id, request).await
    }
}
