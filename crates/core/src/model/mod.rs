mod attempt;
mod candidate;
mod ids;
mod question;
mod result;
mod settings;

pub use ids::{ClassId, IdError, MAX_CLASS, MIN_CLASS, ResultId, RollNumber};

pub use attempt::{Attempt, AttemptError, AttemptStatus, PageActions, TickState};
pub use candidate::{Candidate, CandidateDraft, CandidateError};
pub use question::{Question, QuestionDraft, QuestionError, QuestionSet};
pub use result::{ResultRecord, StoredResult};
pub use settings::{
    DEFAULT_PAGE_SIZE, DEFAULT_TIME_LIMIT_SECS, QuizSettings, RollNumberRule, SettingsError,
};
