use quiz_core::model::{QuestionRecord, Quiz, QuizType};
use storage::QuizRepository;
use tracing::debug;

use crate::error::{LoadError, SessionError};

/// Repository-backed lookups that resolve a quiz type to its question set.
pub(crate) struct QuizQueries;

impl QuizQueries {
    /// Walk category → quiz → questions for `quiz_type`.
    ///
    /// The first category whose name contains the type name wins, then the first
    /// quiz filed under it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when no category or quiz matches and
    /// `SessionError::Network` when the repository fails.
    pub async fn load_for_type(
        quiz_type: QuizType,
        quizzes: &dyn QuizRepository,
    ) -> Result<(Quiz, Vec<QuestionRecord>), SessionError> {
        let categories = quizzes
            .list_categories()
            .await
            .map_err(SessionError::Network)?;
        let category = categories
            .into_iter()
            .find(|category| quiz_type.matches_category(&category.name))
            .ok_or(LoadError::NoCategory { quiz_type })?;
        debug!(category_id = %category.id, name = %category.name, "resolved quiz category");

        let quiz = quizzes
            .list_quizzes_for_category(category.id)
            .await
            .map_err(SessionError::Network)?
            .into_iter()
            .next()
            .ok_or(LoadError::NoQuiz {
                category_id: category.id,
            })?;

        let records = quizzes
            .list_questions(quiz.id)
            .await
            .map_err(SessionError::Network)?;
        debug!(quiz_id = %quiz.id, questions = records.len(), "loaded question records");

        Ok((quiz, records))
    }
}
