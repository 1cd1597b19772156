//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CategoryId, DiscTrait, QuestionError, QuestionId, QuizId, QuizType};
use storage::RepositoryError;

/// Why a quiz attempt could not be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no category found for {quiz_type} quizzes")]
    NoCategory { quiz_type: QuizType },
    #[error("category {category_id} has no quizzes")]
    NoQuiz { category_id: CategoryId },
    #[error("quiz {quiz_id} has no questions")]
    NoQuestions { quiz_id: QuizId },
    #[error("question {question_id} does not belong in a {expected} quiz")]
    KindMismatch {
        question_id: QuestionId,
        expected: QuizType,
    },
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Why an answer or submission was refused locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{} question(s) still unanswered", .missing.len())]
    Incomplete { missing: Vec<QuestionId> },
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("a {given} answer cannot be recorded in a {expected} quiz")]
    AnswerKind { expected: QuizType, given: QuizType },
    #[error("question {question_id} offers no {disc_trait} option")]
    TraitNotOffered {
        question_id: QuestionId,
        disc_trait: DiscTrait,
    },
    #[error("answer to question {0} matches none of its options")]
    UnmatchedOption(QuestionId),
}

/// Errors emitted by quiz session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("quiz data could not be fetched: {0}")]
    Network(#[source] RepositoryError),
    #[error("submission failed: {0}")]
    Submission(#[source] RepositoryError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no quiz has been started")]
    NotStarted,
    #[error("another quiz request is still in flight")]
    Busy,
    #[error("quiz attempt already completed")]
    Completed,
}

impl SessionError {
    /// True when the caller should send the user back to quiz selection.
    #[must_use]
    pub fn is_terminal_load_failure(&self) -> bool {
        matches!(self, SessionError::Load(_) | SessionError::Network(_))
    }
}
