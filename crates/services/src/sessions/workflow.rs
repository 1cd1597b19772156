use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use quiz_core::Clock;
use quiz_core::model::{QuizResult, QuizType};
use storage::{QuizRepository, ResultSubmitter, Storage};
use tracing::{info, warn};

use super::queries::QuizQueries;
use super::service::QuizSession;
use crate::error::SessionError;

/// Holds the in-flight flag for as long as a start or submit call runs.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates quiz start and submission against the repositories.
///
/// Only one `start` or `submit` may be outstanding at a time; a second call fails
/// with `SessionError::Busy` instead of issuing a duplicate request.
#[derive(Clone)]
pub struct QuizSessionLoop {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    results: Arc<dyn ResultSubmitter>,
    in_flight: Arc<AtomicBool>,
}

impl QuizSessionLoop {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        results: Arc<dyn ResultSubmitter>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            results,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.results),
        )
    }

    /// True while a start or submit call is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Load the quiz for `quiz_type` and open a fresh session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if no category, quiz or usable question set
    /// exists, `SessionError::Network` if the repository fails, and
    /// `SessionError::Busy` if another call is in flight.
    pub async fn start(&self, quiz_type: QuizType) -> Result<QuizSession, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let (quiz, records) = QuizQueries::load_for_type(quiz_type, self.quizzes.as_ref())
            .await
            .inspect_err(|err| warn!(%quiz_type, error = %err, "quiz load failed"))?;
        let session = QuizSession::from_records(quiz_type, quiz, &records, self.clock.now())?;
        info!(
            %quiz_type,
            quiz_id = %session.quiz().id,
            questions = session.questions().len(),
            "quiz session started"
        );
        Ok(session)
    }

    /// Submit a complete session for scoring.
    ///
    /// On success the session moves to its result phase. On failure the session
    /// is left untouched so the caller can retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` if the session is incomplete (the
    /// submitter is not called), `SessionError::Submission` if the scoring call
    /// fails, `SessionError::Completed` if already submitted, and
    /// `SessionError::Busy` if another call is in flight.
    pub async fn submit(&self, session: &mut QuizSession) -> Result<QuizResult, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let request = session.build_submission()?;
        let result = self
            .results
            .submit(&request)
            .await
            .map_err(|err| {
                warn!(quiz_id = %request.quiz_id, error = %err, "quiz submission failed");
                SessionError::Submission(err)
            })?;
        info!(
            quiz_id = %request.quiz_id,
            result_id = %result.id,
            code = %result.personality_code,
            "quiz submitted"
        );
        session.complete(result.clone());
        Ok(result)
    }
}
