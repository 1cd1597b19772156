use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, AnswerInput, DiscAnswer, DiscSlot, DiscTrait, Question, QuestionId, QuestionRecord,
    Quiz, QuizResult, QuizType, SubmitRequest,
};

use super::progress::SessionProgress;
use crate::error::{LoadError, SessionError, ValidationError};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where an attempt stands: `Intro --start--> Quiz --submit--> Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Intro,
    Quiz,
    Result,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one quiz attempt.
///
/// Answers are keyed by backend question id, so lookups survive reordering of
/// `questions`. Navigation is never gated; only submission requires every
/// question to be answered.
pub struct QuizSession {
    quiz_type: QuizType,
    quiz: Quiz,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, Answer>,
    current: usize,
    started_at: DateTime<Utc>,
    result: Option<QuizResult>,
}

impl QuizSession {
    /// Create a session over already-transformed questions.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NoQuestions` for an empty question list and
    /// `LoadError::KindMismatch` if a question does not fit `quiz_type`.
    pub fn new(
        quiz_type: QuizType,
        quiz: Quiz,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(LoadError::NoQuestions { quiz_id: quiz.id }.into());
        }
        if let Some(stray) = questions.iter().find(|q| q.quiz_type() != quiz_type) {
            return Err(LoadError::KindMismatch {
                question_id: stray.id(),
                expected: quiz_type,
            }
            .into());
        }

        Ok(Self {
            quiz_type,
            quiz,
            questions,
            answers: HashMap::new(),
            current: 0,
            started_at,
            result: None,
        })
    }

    /// Transform backend records and create a session over them.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if a record cannot be transformed or the set is unusable.
    pub fn from_records(
        quiz_type: QuizType,
        quiz: Quiz,
        records: &[QuestionRecord],
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let questions = records
            .iter()
            .map(Question::from_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(LoadError::from)?;
        Self::new(quiz_type, quiz, questions, started_at)
    }

    #[must_use]
    pub fn quiz_type(&self) -> QuizType {
        self.quiz_type
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        if self.result.is_some() {
            QuizPhase::Result
        } else {
            QuizPhase::Quiz
        }
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Fold one interaction into the answer map.
    ///
    /// A choice replaces the stored MBTI text. A DISC selection toggles the trait
    /// in its slot and evicts it from the opposite slot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the attempt has a result, and
    /// `ValidationError` for an unknown question, an answer of the wrong kind,
    /// or a DISC trait the set has no option for.
    /// The answer map is unchanged on error.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        input: AnswerInput,
    ) -> Result<&Answer, SessionError> {
        if self.result.is_some() {
            return Err(SessionError::Completed);
        }
        let question = self
            .questions
            .iter()
            .find(|q| q.id() == question_id)
            .ok_or(ValidationError::UnknownQuestion(question_id))?;
        if input.quiz_type() != self.quiz_type {
            return Err(ValidationError::AnswerKind {
                expected: self.quiz_type,
                given: input.quiz_type(),
            }
            .into());
        }
        if let (Question::Disc(set), AnswerInput::Disc { disc_trait, .. }) = (question, &input) {
            if set.option_by_trait(*disc_trait).is_none() {
                return Err(ValidationError::TraitNotOffered {
                    question_id,
                    disc_trait: *disc_trait,
                }
                .into());
            }
        }

        let answer = match input {
            AnswerInput::Choice(text) => {
                self.answers.insert(question_id, Answer::Mbti(text));
                &self.answers[&question_id]
            }
            AnswerInput::Disc { disc_trait, slot } => {
                let entry = self
                    .answers
                    .entry(question_id)
                    .or_insert_with(|| Answer::Disc(DiscAnswer::default()));
                if let Answer::Disc(pair) = entry {
                    pair.select(disc_trait, slot);
                }
                &*entry
            }
        };
        Ok(answer)
    }

    /// # Errors
    ///
    /// See [`QuizSession::record_answer`].
    pub fn record_choice(
        &mut self,
        question_id: QuestionId,
        text: impl Into<String>,
    ) -> Result<&Answer, SessionError> {
        self.record_answer(question_id, AnswerInput::Choice(text.into()))
    }

    /// # Errors
    ///
    /// See [`QuizSession::record_answer`].
    pub fn record_disc(
        &mut self,
        question_id: QuestionId,
        disc_trait: DiscTrait,
        slot: DiscSlot,
    ) -> Result<&Answer, SessionError> {
        self.record_answer(question_id, AnswerInput::Disc { disc_trait, slot })
    }

    /// Forget the stored answer for a question. Returns the removed answer.
    pub fn clear_answer(&mut self, question_id: QuestionId) -> Option<Answer> {
        if self.result.is_some() {
            return None;
        }
        self.answers.remove(&question_id)
    }

    fn is_question_answered(&self, question_id: QuestionId) -> bool {
        self.answers
            .get(&question_id)
            .is_some_and(|answer| answer.quiz_type() == self.quiz_type && answer.is_complete())
    }

    /// Whether the question at `index` holds a complete answer. Out of range is `false`.
    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.questions
            .get(index)
            .is_some_and(|q| self.is_question_answered(q.id()))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.questions
            .iter()
            .all(|q| self.is_question_answered(q.id()))
    }

    /// Ids of questions without a complete answer, in question order.
    #[must_use]
    pub fn unanswered(&self) -> Vec<QuestionId> {
        self.questions
            .iter()
            .map(Question::id)
            .filter(|id| !self.is_question_answered(*id))
            .collect()
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Jump to `index`, clamped to the last question. Returns the new index.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.current = index.min(self.questions.len().saturating_sub(1));
        self.current
    }

    /// Advance one question. Returns false when already on the last one.
    pub fn next(&mut self) -> bool {
        if self.current + 1 >= self.questions.len() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Step back one question. Returns false when already on the first one.
    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = total - self.unanswered().len();
        SessionProgress {
            total,
            answered,
            remaining: total - answered,
            current_index: self.current,
            is_complete: answered == total,
        }
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Map every answer to the option id the scoring endpoint expects.
    ///
    /// MBTI answers resolve by option text. DISC answers resolve through the
    /// `most` trait only; `least` stays local.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after a successful submit,
    /// `ValidationError::Incomplete` listing unanswered questions, or
    /// `ValidationError::UnmatchedOption` if an answer names no known option.
    pub fn build_submission(&self) -> Result<SubmitRequest, SessionError> {
        if self.result.is_some() {
            return Err(SessionError::Completed);
        }
        let missing = self.unanswered();
        if !missing.is_empty() {
            return Err(ValidationError::Incomplete { missing }.into());
        }

        let mut answers = BTreeMap::new();
        for question in &self.questions {
            let id = question.id();
            let option_id = match (question, self.answers.get(&id)) {
                (Question::Mbti(q), Some(Answer::Mbti(text))) => {
                    q.option_by_text(text).map(|option| option.id)
                }
                (Question::Disc(q), Some(Answer::Disc(pair))) => pair
                    .most()
                    .and_then(|most| q.option_by_trait(most))
                    .map(|option| option.id),
                _ => None,
            }
            .ok_or(ValidationError::UnmatchedOption(id))?;
            answers.insert(id, option_id);
        }

        Ok(SubmitRequest {
            quiz_id: self.quiz.id,
            answers,
        })
    }

    pub(crate) fn complete(&mut self, result: QuizResult) {
        self.result = Some(result);
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_type", &self.quiz_type)
            .field("quiz_id", &self.quiz.id)
            .field("questions_len", &self.questions.len())
            .field("answers_len", &self.answers.len())
            .field("current", &self.current)
            .field("started_at", &self.started_at)
            .field("has_result", &self.result.is_some())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
