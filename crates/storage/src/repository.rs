use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::{
    Category, CategoryId, OptionDraft, OptionId, OptionRecord, QuestionDraft, QuestionId,
    QuestionRecord, Quiz, QuizDraft, QuizId, QuizResult, QuizType, ResultId, SubmitRequest,
    sort_by_order,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by repository adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,

    #[error("request failed with status {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return RepositoryError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => RepositoryError::HttpStatus(status.as_u16()),
            None => RepositoryError::Network(err.to_string()),
        }
    }
}

/// Read-side contract for the quiz catalog.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// List every quiz category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on non-2xx responses or connectivity failures.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// List the quizzes filed under a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on non-2xx responses or connectivity failures.
    async fn list_quizzes_for_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Quiz>, RepositoryError>;

    /// List a quiz's questions with their options, ordered by `order_number`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on non-2xx responses or connectivity failures.
    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuestionRecord>, RepositoryError>;
}

/// Posts a finished answer map to the scoring endpoint.
#[async_trait]
pub trait ResultSubmitter: Send + Sync {
    /// # Errors
    ///
    /// Returns `RepositoryError` if the scoring call fails.
    async fn submit(&self, request: &SubmitRequest) -> Result<QuizResult, RepositoryError>;
}

/// Admin mutations of the quiz catalog.
#[async_trait]
pub trait QuizAdminRepository: Send + Sync {
    async fn create_quiz(&self, draft: &QuizDraft) -> Result<Quiz, RepositoryError>;
    async fn update_quiz(&self, id: QuizId, draft: &QuizDraft) -> Result<Quiz, RepositoryError>;
    async fn delete_quiz(&self, id: QuizId) -> Result<(), RepositoryError>;

    async fn create_question(
        &self,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError>;
    async fn update_question(
        &self,
        id: QuestionId,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError>;
    async fn delete_question(&self, id: QuestionId) -> Result<(), RepositoryError>;

    async fn create_option(&self, draft: &OptionDraft) -> Result<OptionRecord, RepositoryError>;
    async fn update_option(
        &self,
        id: OptionId,
        draft: &OptionDraft,
    ) -> Result<OptionRecord, RepositoryError>;
    async fn delete_option(&self, id: OptionId) -> Result<(), RepositoryError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Endpoints of the in-memory backend, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Categories,
    Quizzes,
    Questions,
    Submit,
    Admin,
}

#[derive(Default)]
struct MemoryState {
    categories: Vec<Category>,
    quizzes: Vec<Quiz>,
    questions: HashMap<QuizId, Vec<QuestionRecord>>,
    submissions: Vec<SubmitRequest>,
    calls: HashMap<Endpoint, usize>,
    failing: HashMap<Endpoint, u16>,
    next_id: u64,
}

impl MemoryState {
    fn hit(&mut self, endpoint: Endpoint) -> Result<(), RepositoryError> {
        *self.calls.entry(endpoint).or_default() += 1;
        match self.failing.get(&endpoint) {
            Some(status) => Err(RepositoryError::HttpStatus(*status)),
            None => Ok(()),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn question_mut(&mut self, id: QuestionId) -> Option<&mut QuestionRecord> {
        self.questions
            .values_mut()
            .flat_map(|records| records.iter_mut())
            .find(|record| record.id == id)
    }

    fn quiz_type_of(&self, quiz_id: QuizId) -> QuizType {
        let is_disc = self
            .questions
            .get(&quiz_id)
            .is_some_and(|records| records.iter().any(QuestionRecord::is_disc));
        if is_disc { QuizType::Disc } else { QuizType::Mbti }
    }
}

/// In-memory quiz backend for tests and offline runs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                next_id: 1_000,
                ..MemoryState::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::Network(e.to_string()))
    }

    fn lock_or_recover(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn insert_category(&self, category: Category) {
        self.lock_or_recover().categories.push(category);
    }

    pub fn insert_quiz(&self, quiz: Quiz) {
        self.lock_or_recover().quizzes.push(quiz);
    }

    pub fn insert_questions(&self, quiz_id: QuizId, records: Vec<QuestionRecord>) {
        self.lock_or_recover().questions.insert(quiz_id, records);
    }

    /// Make every call to `endpoint` fail with the given HTTP status.
    pub fn fail(&self, endpoint: Endpoint, status: u16) {
        self.lock_or_recover().failing.insert(endpoint, status);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.lock_or_recover().failing.remove(&endpoint);
    }

    /// Number of calls made to `endpoint`, failed ones included.
    #[must_use]
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock_or_recover()
            .calls
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// Submission payloads received so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.lock_or_recover().submissions.clone()
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Categories)?;
        Ok(guard.categories.clone())
    }

    async fn list_quizzes_for_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Quiz>, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Quizzes)?;
        Ok(guard
            .quizzes
            .iter()
            .filter(|quiz| quiz.category_id == Some(category_id))
            .cloned()
            .collect())
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuestionRecord>, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Questions)?;
        let mut records = guard.questions.get(&quiz_id).cloned().unwrap_or_default();
        sort_by_order(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl ResultSubmitter for InMemoryRepository {
    async fn submit(&self, request: &SubmitRequest) -> Result<QuizResult, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Submit)?;
        guard.submissions.push(request.clone());
        let id = guard.allocate_id();
        Ok(QuizResult {
            id: ResultId::new(id),
            personality_code: "UNSCORED".into(),
            description: format!("{} answers recorded", request.answers.len()),
            scores: None,
            submitted_at: Utc::now(),
            quiz_type: guard.quiz_type_of(request.quiz_id),
        })
    }
}

#[async_trait]
impl QuizAdminRepository for InMemoryRepository {
    async fn create_quiz(&self, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let quiz = Quiz {
            id: QuizId::new(guard.allocate_id()),
            title: draft.title.clone(),
            description: draft.description.clone(),
            category_id: Some(draft.category_id),
            time_limit: draft.time_limit,
        };
        guard.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn update_quiz(&self, id: QuizId, draft: &QuizDraft) -> Result<Quiz, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let quiz = guard
            .quizzes
            .iter_mut()
            .find(|quiz| quiz.id == id)
            .ok_or(RepositoryError::NotFound)?;
        quiz.title = draft.title.clone();
        quiz.description = draft.description.clone();
        quiz.category_id = Some(draft.category_id);
        quiz.time_limit = draft.time_limit;
        Ok(quiz.clone())
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let before = guard.quizzes.len();
        guard.quizzes.retain(|quiz| quiz.id != id);
        if guard.quizzes.len() == before {
            return Err(RepositoryError::NotFound);
        }
        guard.questions.remove(&id);
        Ok(())
    }

    async fn create_question(
        &self,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let record = QuestionRecord {
            id: QuestionId::new(guard.allocate_id()),
            content: draft.content.clone(),
            order_number: draft.order_number,
            dimension: draft.dimension.clone(),
            quiz_id: draft.quiz_id,
            options: Vec::new(),
        };
        guard
            .questions
            .entry(draft.quiz_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_question(
        &self,
        id: QuestionId,
        draft: &QuestionDraft,
    ) -> Result<QuestionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let record = guard.question_mut(id).ok_or(RepositoryError::NotFound)?;
        let from = record.quiz_id;
        record.content = draft.content.clone();
        record.order_number = draft.order_number;
        record.dimension = draft.dimension.clone();
        record.quiz_id = draft.quiz_id;
        let updated = record.clone();

        if from != draft.quiz_id {
            if let Some(records) = guard.questions.get_mut(&from) {
                records.retain(|record| record.id != id);
            }
            guard
                .questions
                .entry(draft.quiz_id)
                .or_default()
                .push(updated.clone());
        }
        Ok(updated)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let mut removed = false;
        for records in guard.questions.values_mut() {
            let before = records.len();
            records.retain(|record| record.id != id);
            removed |= records.len() != before;
        }
        if removed { Ok(()) } else { Err(RepositoryError::NotFound) }
    }

    async fn create_option(&self, draft: &OptionDraft) -> Result<OptionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let id = OptionId::new(guard.allocate_id());
        let record = guard
            .question_mut(draft.question_id)
            .ok_or(RepositoryError::NotFound)?;
        let option = OptionRecord {
            id,
            option_text: draft.option_text.clone(),
            target_trait: draft.target_trait,
            score_value: draft.score_value,
            question_id: draft.question_id,
        };
        record.options.push(option.clone());
        Ok(option)
    }

    async fn update_option(
        &self,
        id: OptionId,
        draft: &OptionDraft,
    ) -> Result<OptionRecord, RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let record = guard
            .question_mut(draft.question_id)
            .ok_or(RepositoryError::NotFound)?;
        let option = record
            .options
            .iter_mut()
            .find(|option| option.id == id)
            .ok_or(RepositoryError::NotFound)?;
        option.option_text = draft.option_text.clone();
        option.target_trait = draft.target_trait;
        option.score_value = draft.score_value;
        Ok(option.clone())
    }

    async fn delete_option(&self, id: OptionId) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.hit(Endpoint::Admin)?;
        let mut removed = false;
        for record in guard.questions.values_mut().flat_map(|records| records.iter_mut()) {
            let before = record.options.len();
            record.options.retain(|option| option.id != id);
            removed |= record.options.len() != before;
        }
        if removed { Ok(()) } else { Err(RepositoryError::NotFound) }
    }
}

/// Aggregates the quiz contracts behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub results: Arc<dyn ResultSubmitter>,
    pub admin: Arc<dyn QuizAdminRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Share one backend value across all three contracts.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: QuizRepository + ResultSubmitter + QuizAdminRepository + Clone + 'static,
    {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(backend.clone());
        let results: Arc<dyn ResultSubmitter> = Arc::new(backend.clone());
        let admin: Arc<dyn QuizAdminRepository> = Arc::new(backend);
        Self {
            quizzes,
            results,
            admin,
        }
    }
}
