use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use thiserror::Error;

use crate::model::settings::QuizSettings;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("cannot {operation} while the attempt is {status}")]
    InvalidState {
        status: AttemptStatus,
        operation: &'static str,
    },

    #[error("please answer all questions on page {} before continuing", .page + 1)]
    IncompletePage { page: usize, unanswered: Vec<usize> },

    #[error("question {index} is not available on a page shown so far")]
    QuestionUnavailable { index: usize },

    #[error("already on the last page; submit instead")]
    NoNextPage,

    #[error("this quiz has no timer")]
    TimerDisabled,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an attempt.
///
/// `InProgress → Submitting → {Completed | InProgress | Aborted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptStatus {
    InProgress,
    Submitting,
    Completed,
    Aborted,
}

impl AttemptStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InProgress => "in progress",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// What a countdown tick did to the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    /// Seconds still left after this tick.
    Running(u32),
    /// This tick consumed the last second; the caller must submit now.
    Expired,
    /// The tick arrived after submission began or after expiry and was dropped.
    Ignored,
}

/// Actions a page offers to the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageActions {
    pub back: bool,
    pub next: bool,
    pub submit: bool,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// Mutable state of one candidate's run through a question set.
///
/// Holds answers by global question index, the visible page, the optional
/// countdown, and the lifecycle status. Knows nothing about stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    answers: BTreeMap<usize, String>,
    page_index: usize,
    furthest_page: usize,
    page_size: usize,
    question_count: usize,
    remaining_secs: Option<u32>,
    expired: bool,
    status: AttemptStatus,
}

impl Attempt {
    #[must_use]
    pub fn new(question_count: usize, settings: &QuizSettings) -> Self {
        Self {
            answers: BTreeMap::new(),
            page_index: 0,
            furthest_page: 0,
            page_size: settings.page_size().max(1),
            question_count,
            remaining_secs: settings
                .enable_timer()
                .then_some(settings.time_limit_secs()),
            expired: false,
            status: AttemptStatus::InProgress,
        }
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.question_count.div_ceil(self.page_size)
    }

    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.page_index + 1 >= self.page_count()
    }

    /// Global question indices shown on the current page.
    #[must_use]
    pub fn current_page_range(&self) -> Range<usize> {
        self.page_range(self.page_index)
    }

    fn page_range(&self, page: usize) -> Range<usize> {
        let start = page.saturating_mul(self.page_size).min(self.question_count);
        let end = start.saturating_add(self.page_size).min(self.question_count);
        start..end
    }

    /// Indices on the current page that have no answer yet.
    #[must_use]
    pub fn unanswered_on_current_page(&self) -> Vec<usize> {
        self.current_page_range()
            .filter(|idx| !self.answers.contains_key(idx))
            .collect()
    }

    /// Back/next/submit availability; submit replaces next on the last page.
    #[must_use]
    pub fn actions(&self) -> PageActions {
        let open = self.status == AttemptStatus::InProgress;
        let last = self.is_last_page();
        PageActions {
            back: open && self.page_index > 0,
            next: open && !last,
            submit: open && last,
        }
    }

    fn require_in_progress(&self, operation: &'static str) -> Result<(), AttemptError> {
        if self.status == AttemptStatus::InProgress {
            Ok(())
        } else {
            Err(AttemptError::InvalidState {
                status: self.status,
                operation,
            })
        }
    }

    /// Select `option` for question `index`, replacing any earlier choice.
    ///
    /// The option is stored as given; it is not checked against the declared
    /// options.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidState` outside `InProgress`, and
    /// `AttemptError::QuestionUnavailable` for an index past the question set
    /// or on a page not yet shown.
    pub fn record_answer(
        &mut self,
        index: usize,
        option: impl Into<String>,
    ) -> Result<(), AttemptError> {
        self.require_in_progress("record an answer")?;
        if index >= self.question_count || index / self.page_size > self.furthest_page {
            return Err(AttemptError::QuestionUnavailable { index });
        }
        self.answers.insert(index, option.into());
        Ok(())
    }

    /// Move to the next page once every question on this page is answered.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::IncompletePage` (page unchanged) if any question
    /// on the page lacks an answer, `AttemptError::NoNextPage` on the last
    /// page, or `AttemptError::InvalidState` outside `InProgress`.
    pub fn advance_page(&mut self) -> Result<usize, AttemptError> {
        self.require_in_progress("go to the next page")?;
        let unanswered = self.unanswered_on_current_page();
        if !unanswered.is_empty() {
            return Err(AttemptError::IncompletePage {
                page: self.page_index,
                unanswered,
            });
        }
        if self.is_last_page() {
            return Err(AttemptError::NoNextPage);
        }
        self.page_index += 1;
        self.furthest_page = self.furthest_page.max(self.page_index);
        Ok(self.page_index)
    }

    /// Move back one page; stays on the first page. Answers are kept.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidState` outside `InProgress`.
    pub fn retreat_page(&mut self) -> Result<usize, AttemptError> {
        self.require_in_progress("go to the previous page")?;
        self.page_index = self.page_index.saturating_sub(1);
        Ok(self.page_index)
    }

    /// Consume one second of the countdown.
    ///
    /// Returns `TickState::Expired` exactly once, on the tick that reaches
    /// zero. Ticks once submission has begun, or after expiry, are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::TimerDisabled` for untimed attempts.
    pub fn tick(&mut self) -> Result<TickState, AttemptError> {
        let Some(remaining) = self.remaining_secs else {
            return Err(AttemptError::TimerDisabled);
        };
        if self.expired || self.status != AttemptStatus::InProgress {
            return Ok(TickState::Ignored);
        }
        let remaining = remaining.saturating_sub(1);
        self.remaining_secs = Some(remaining);
        if remaining == 0 {
            self.expired = true;
            return Ok(TickState::Expired);
        }
        Ok(TickState::Running(remaining))
    }

    /// True once the countdown has run out.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Enter `Submitting`. Refuses a second submission while one is in flight.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidState` unless the attempt is `InProgress`.
    pub fn begin_submit(&mut self) -> Result<(), AttemptError> {
        self.require_in_progress("submit")?;
        self.status = AttemptStatus::Submitting;
        Ok(())
    }

    /// Submission stored: `Submitting → Completed`.
    pub fn mark_completed(&mut self) {
        debug_assert_eq!(self.status, AttemptStatus::Submitting);
        self.status = AttemptStatus::Completed;
    }

    /// A result already exists: `Submitting → Aborted`.
    pub fn mark_aborted(&mut self) {
        debug_assert_eq!(self.status, AttemptStatus::Submitting);
        self.status = AttemptStatus::Aborted;
    }

    /// Store unreachable: `Submitting → InProgress` so the candidate can retry.
    pub fn resume_after_failure(&mut self) {
        debug_assert_eq!(self.status, AttemptStatus::Submitting);
        self.status = AttemptStatus::InProgress;
    }
}
