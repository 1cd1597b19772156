use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, OptionId, QuestionId, QuizId};
use crate::model::taxonomy::DiscTrait;

/// Backend `dimension` value marking a DISC item set.
pub const DISC_DIMENSION: &str = "DISC";

//
// ─── SCORE VALUE ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("score value must be one of -1, 0, 1, 2 (got {0})")]
pub struct InvalidScoreValue(pub i64);

/// Weight the scoring backend attaches to an option, restricted to {-1, 0, 1, 2}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ScoreValue(i8);

impl ScoreValue {
    #[must_use]
    pub fn value(self) -> i8 {
        self.0
    }
}

impl TryFrom<i64> for ScoreValue {
    type Error = InvalidScoreValue;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1..=2 => i8::try_from(value)
                .map(Self)
                .map_err(|_| InvalidScoreValue(value)),
            _ => Err(InvalidScoreValue(value)),
        }
    }
}

impl From<ScoreValue> for i64 {
    fn from(value: ScoreValue) -> Self {
        i64::from(value.0)
    }
}

//
// ─── CATALOG RECORDS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Minutes, when the backend sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

//
// ─── QUESTION RECORDS ──────────────────────────────────────────────────────────
//

/// Raw option row as served by the question endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRecord {
    pub id: OptionId,
    pub option_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_trait: Option<DiscTrait>,
    #[serde(default)]
    pub score_value: ScoreValue,
    pub question_id: QuestionId,
}

/// Raw question row with its nested options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub content: String,
    pub order_number: i32,
    pub dimension: String,
    pub quiz_id: QuizId,
    #[serde(default)]
    pub options: Vec<OptionRecord>,
}

impl QuestionRecord {
    #[must_use]
    pub fn is_disc(&self) -> bool {
        self.dimension.trim().eq_ignore_ascii_case(DISC_DIMENSION)
    }
}

/// Sorts question records by `order_number`, keeping backend order for ties.
pub fn sort_by_order(records: &mut [QuestionRecord]) {
    records.sort_by_key(|record| record.order_number);
}

//
// ─── ADMIN DRAFTS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category_id: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub content: String,
    pub order_number: i32,
    pub dimension: String,
    pub quiz_id: QuizId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDraft {
    pub option_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_trait: Option<DiscTrait>,
    pub score_value: ScoreValue,
    pub question_id: QuestionId,
}
