use serde::{Deserialize, Serialize};

use crate::model::taxonomy::{DiscSlot, DiscTrait, QuizType};

/// Most/least pair for a DISC item set.
///
/// A trait never occupies both slots at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscAnswer {
    most: Option<DiscTrait>,
    least: Option<DiscTrait>,
}

impl DiscAnswer {
    #[must_use]
    pub fn most(&self) -> Option<DiscTrait> {
        self.most
    }

    #[must_use]
    pub fn least(&self) -> Option<DiscTrait> {
        self.least
    }

    #[must_use]
    pub fn get(&self, slot: DiscSlot) -> Option<DiscTrait> {
        match slot {
            DiscSlot::Most => self.most,
            DiscSlot::Least => self.least,
        }
    }

    fn slot_mut(&mut self, slot: DiscSlot) -> &mut Option<DiscTrait> {
        match slot {
            DiscSlot::Most => &mut self.most,
            DiscSlot::Least => &mut self.least,
        }
    }

    /// Places `disc_trait` in `slot`.
    ///
    /// Selecting the trait already held by `slot` clears it. Otherwise the trait is
    /// first removed from the opposite slot, then assigned.
    pub fn select(&mut self, disc_trait: DiscTrait, slot: DiscSlot) {
        if self.get(slot) == Some(disc_trait) {
            *self.slot_mut(slot) = None;
            return;
        }
        let opposite = self.slot_mut(slot.opposite());
        if *opposite == Some(disc_trait) {
            *opposite = None;
        }
        *self.slot_mut(slot) = Some(disc_trait);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.most.is_some() && self.least.is_some()
    }
}

/// Stored answer for one question, keyed elsewhere by question id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "UPPERCASE")]
pub enum Answer {
    /// Text of the chosen option.
    Mbti(String),
    Disc(DiscAnswer),
}

impl Answer {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            Answer::Mbti(text) => !text.is_empty(),
            Answer::Disc(pair) => pair.is_complete(),
        }
    }

    #[must_use]
    pub fn quiz_type(&self) -> QuizType {
        match self {
            Answer::Mbti(_) => QuizType::Mbti,
            Answer::Disc(_) => QuizType::Disc,
        }
    }
}

/// A single user interaction to fold into the answer map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    Choice(String),
    Disc { disc_trait: DiscTrait, slot: DiscSlot },
}

impl AnswerInput {
    #[must_use]
    pub fn quiz_type(&self) -> QuizType {
        match self {
            AnswerInput::Choice(_) => QuizType::Mbti,
            AnswerInput::Disc { .. } => QuizType::Disc,
        }
    }
}
