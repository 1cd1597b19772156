mod attempt;
mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the quiz session subsystem.
pub use crate::error::SessionError;
pub use attempt::QuizAttempt;
pub use progress::SessionProgress;
pub use service::{QuizPhase, QuizSession};
pub use workflow::QuizSessionLoop;
