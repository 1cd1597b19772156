use quiz_core::model::{Question, QuizResult, QuizType};

use super::service::{QuizPhase, QuizSession};
use super::workflow::QuizSessionLoop;
use crate::error::SessionError;

/// One user's walk through `Intro -> Quiz -> Result`.
///
/// Starting again (including with a different quiz type) replaces the previous
/// session and its answers once the new quiz loads. A failed load leaves the
/// attempt in `Intro`.
#[derive(Debug, Default)]
pub struct QuizAttempt {
    session: Option<QuizSession>,
}

impl QuizAttempt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.session
            .as_ref()
            .map_or(QuizPhase::Intro, QuizSession::phase)
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut QuizSession> {
        self.session.as_mut()
    }

    /// Questions of the active session, empty in `Intro`.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.session
            .as_ref()
            .map(QuizSession::questions)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.session.as_ref().and_then(QuizSession::result)
    }

    /// # Errors
    ///
    /// Propagates [`QuizSessionLoop::start`] errors. A failed load drops the
    /// attempt back to `Intro`; a `Busy` refusal leaves the current session as is.
    pub async fn start(
        &mut self,
        runner: &QuizSessionLoop,
        quiz_type: QuizType,
    ) -> Result<&mut QuizSession, SessionError> {
        match runner.start(quiz_type).await {
            Ok(session) => Ok(self.session.insert(session)),
            Err(SessionError::Busy) => Err(SessionError::Busy),
            Err(err) => {
                self.session = None;
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` when called from `Intro`, otherwise
    /// propagates [`QuizSessionLoop::submit`] errors with answers intact.
    pub async fn submit(&mut self, runner: &QuizSessionLoop) -> Result<QuizResult, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotStarted)?;
        runner.submit(session).await
    }

    /// Return to `Intro`, forgetting the current session.
    pub fn reset(&mut self) {
        self.session = None;
    }
}
