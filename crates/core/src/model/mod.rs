mod answer;
mod ids;
mod question;
mod record;
mod result;
mod taxonomy;

pub use ids::{CategoryId, OptionId, ParseIdError, QuestionId, QuizId, ResultId};

pub use answer::{Answer, AnswerInput, DiscAnswer};
pub use question::{DiscOption, DiscQuestionSet, MbtiOption, MbtiQuestion, Question, QuestionError};
pub use record::{
    Category, DISC_DIMENSION, InvalidScoreValue, OptionDraft, OptionRecord, QuestionDraft,
    QuestionRecord, Quiz, QuizDraft, ScoreValue, sort_by_order,
};
pub use result::{QuizResult, SubmitRequest};
pub use taxonomy::{DiscSlot, DiscTrait, MbtiPair, QuizType, TaxonomyError};
