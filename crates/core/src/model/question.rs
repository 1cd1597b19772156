use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};
use crate::model::record::QuestionRecord;
use crate::model::taxonomy::{DiscTrait, MbtiPair, QuizType};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while turning a backend record into a presentation question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {question_id} has unknown dimension {dimension:?}")]
    UnknownDimension {
        question_id: QuestionId,
        dimension: String,
    },

    #[error("DISC option {option_id} of question {question_id} has no target trait")]
    MissingTrait {
        question_id: QuestionId,
        option_id: OptionId,
    },
}

//
// ─── PRESENTATION SHAPES ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MbtiOption {
    pub id: OptionId,
    pub text: String,
    pub value: i8,
}

/// Single-choice question on one MBTI axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MbtiQuestion {
    pub id: QuestionId,
    pub content: String,
    pub dimension_pair: MbtiPair,
    pub options: Vec<MbtiOption>,
}

impl MbtiQuestion {
    /// Finds the option whose text equals the stored answer.
    #[must_use]
    pub fn option_by_text(&self, text: &str) -> Option<&MbtiOption> {
        self.options.iter().find(|option| option.text == text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscOption {
    pub id: OptionId,
    #[serde(rename = "trait")]
    pub disc_trait: DiscTrait,
    pub text: String,
}

/// Forced-choice item set: pick one trait as most, another as least.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscQuestionSet {
    pub id: QuestionId,
    pub content: String,
    pub options: Vec<DiscOption>,
}

impl DiscQuestionSet {
    #[must_use]
    pub fn option_by_trait(&self, disc_trait: DiscTrait) -> Option<&DiscOption> {
        self.options
            .iter()
            .find(|option| option.disc_trait == disc_trait)
    }
}

/// A question as shown to the quiz taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum Question {
    Mbti(MbtiQuestion),
    Disc(DiscQuestionSet),
}

impl Question {
    /// Builds the presentation shape for a record.
    ///
    /// A `"DISC"` dimension yields a [`DiscQuestionSet`]; any other value must be a
    /// single MBTI letter and yields an [`MbtiQuestion`] on the matching axis.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownDimension` for an unrecognized dimension and
    /// `QuestionError::MissingTrait` for a DISC option without a target trait.
    pub fn from_record(record: &QuestionRecord) -> Result<Self, QuestionError> {
        if record.is_disc() {
            let options = record
                .options
                .iter()
                .map(|option| {
                    let disc_trait =
                        option.target_trait.ok_or(QuestionError::MissingTrait {
                            question_id: record.id,
                            option_id: option.id,
                        })?;
                    Ok(DiscOption {
                        id: option.id,
                        disc_trait,
                        text: option.option_text.clone(),
                    })
                })
                .collect::<Result<Vec<_>, QuestionError>>()?;
            return Ok(Question::Disc(DiscQuestionSet {
                id: record.id,
                content: record.content.clone(),
                options,
            }));
        }

        let dimension_pair = single_letter(&record.dimension)
            .and_then(MbtiPair::from_letter)
            .ok_or_else(|| QuestionError::UnknownDimension {
                question_id: record.id,
                dimension: record.dimension.clone(),
            })?;

        Ok(Question::Mbti(MbtiQuestion {
            id: record.id,
            content: record.content.clone(),
            dimension_pair,
            options: record
                .options
                .iter()
                .map(|option| MbtiOption {
                    id: option.id,
                    text: option.option_text.clone(),
                    value: option.score_value.value(),
                })
                .collect(),
        }))
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        match self {
            Question::Mbti(q) => q.id,
            Question::Disc(q) => q.id,
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Question::Mbti(q) => &q.content,
            Question::Disc(q) => &q.content,
        }
    }

    #[must_use]
    pub fn quiz_type(&self) -> QuizType {
        match self {
            Question::Mbti(_) => QuizType::Mbti,
            Question::Disc(_) => QuizType::Disc,
        }
    }
}

fn single_letter(dimension: &str) -> Option<char> {
    let mut chars = dimension.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Some(letter),
        _ => None,
    }
}
