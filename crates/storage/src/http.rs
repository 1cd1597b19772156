use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::Clock;
use quiz_core::model::{
    Category, CategoryId, OptionDraft, OptionId, OptionRecord, QuestionDraft, QuestionId,
    QuestionRecord, Quiz, QuizDraft, QuizId, QuizResult, SubmitRequest, sort_by_order,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheConfig, CachedQuizRepository};
use crate::repository::{
    QuizAdminRepository, QuizRepository, RepositoryError, ResultSubmitter, Storage,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1/quiz";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base url cannot carry path segments: {0}")]
    CannotBeABase(String),
}

/// Where the quiz backend lives and how to authenticate against it.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl ClientConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` does not parse or cannot hold a path.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            raw: base_url.to_string(),
            source,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase(base_url.to_string()));
        }
        let token = token.filter(|token| !token.trim().is_empty());
        Ok(Self { base_url, token })
    }

    /// Reads `QUIZ_API_BASE_URL` and `QUIZ_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configured base url is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("QUIZ_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::new(&base_url, env::var("QUIZ_API_TOKEN").ok())
    }

    /// Joins path segments onto the base url, percent-encoding each one.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// REST adapter for the quiz backend.
#[derive(Clone)]
pub struct HttpQuizClient {
    client: Client,
    config: ClientConfig,
}

impl HttpQuizClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.config.endpoint(segments);
        debug!(%method, %url, "quiz api request");
        let builder = self.client.request(method, url);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, RepositoryError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, url = %response.url(), "quiz api request failed");
            return Err(match status.as_u16() {
                404 => RepositoryError::NotFound,
                code => RepositoryError::HttpStatus(code),
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RepositoryError> {
        let body = Self::send(builder).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, RepositoryError> {
        self.fetch(self.request(Method::GET, segments)).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), RepositoryError> {
        Self::send(self.request(Method::DELETE, segments)).await?;
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for HttpQuizClient {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        self.get(&["categories"]).await
    }

    async fn list_quizzes_for_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Quiz>, RepositoryError> {
        self.get(&["quiz", "category", &category_id.to_string()]).await
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuestionRecord>, RepositoryError> {
        let mut records: Vec<QuestionRecord> = self
            .get(&["quiz-questions", "quiz", &quiz_id.to_string()])
            .await?;
        sort_by_order(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl ResultSubmitter for HttpQuizClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<QuizResult, RepositoryError> {
        let builder = self
            .request(Method::POST, &["quiz-results", "submit"])
            .json(request);
        self.fetch(builder).await
    }
}

#[async_trait]
impl QuizAdminRepository for HttpQuizClient {
    async fn create_quiz(&self, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
        self.fetch(self.request(Method::POST, &["quiz"]).json(draft))
            .await
    }

    async fn update_quiz(&self, id: QuizId, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
        let id = id.to_string();
        self.fetch(self.request(Method::PUT, &["quiz", &id]).json(draft))
            .await
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), RepositoryError> {
        self.delete(&["quiz", &id.to_string()]).await
    }

    async fn create_question(
        &self,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError> {
        self.fetch(self.request(Method::POST, &["quiz-questions"]).json(draft))
            .await
    }

    async fn update_question(
        &self,
        id: QuestionId,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError> {
        let id = id.to_string();
        self.fetch(self.request(Method::PUT, &["quiz-questions", &id]).json(draft))
            .await
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), RepositoryError> {
        self.delete(&["quiz-questions", &id.to_string()]).await
    }

    async fn create_option(&self, draft: &OptionDraft) -> Result<OptionRecord, RepositoryError> {
        self.fetch(self.request(Method::POST, &["quiz-options"]).json(draft))
            .await
    }

    async fn update_option(
        &self,
        id: OptionId,
        draft: &OptionDraft,
    ) -> Result<OptionRecord, RepositoryError> {
        let id = id.to_string();
        self.fetch(self.request(Method::PUT, &["quiz-options", &id]).json(draft))
            .await
    }

    async fn delete_option(&self, id: OptionId) -> Result<(), RepositoryError> {
        self.delete(&["quiz-options", &id.to_string()]).await
    }
}

impl Storage {
    /// Build a `Storage` backed by the REST api, with catalog reads and admin
    /// mutations routed through the response cache.
    #[must_use]
    pub fn http(config: ClientConfig, clock: Clock, cache: CacheConfig) -> Self {
        let client = Arc::new(HttpQuizClient::new(config));
        let cached = Arc::new(CachedQuizRepository::new(Arc::clone(&client), clock, cache));
        let quizzes: Arc<dyn QuizRepository> = cached.clone();
        let admin: Arc<dyn QuizAdminRepository> = cached;
        let results: Arc<dyn ResultSubmitter> = client;
        Self {
            quizzes,
            results,
            admin,
        }
    }
}
