mod service;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::QuizError;
pub use service::{QuizSession, SubmissionReceipt, TickOutcome};
pub use timer::{CountdownTimer, TimerTick, TimerTicks};
pub use view::{PageView, QuestionView, ResultView, format_remaining};
pub use workflow::QuizService;
