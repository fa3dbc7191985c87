use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{
    Attempt, AttemptStatus, Candidate, PageActions, QuestionSet, QuizSettings, ResultId,
    ResultRecord, TickState,
};
use storage::repository::{CandidateStore, ResultStore};

use super::timer::{CountdownTimer, TimerTicks};
use super::view::{PageView, QuestionView, ResultView};
use crate::error::QuizError;

const TICK_PERIOD: Duration = Duration::from_secs(1);

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub id: ResultId,
    pub record: ResultRecord,
}

/// Effect of one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u32),
    /// Time ran out and the attempt was submitted.
    Submitted(SubmissionReceipt),
    Ignored,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One candidate's quiz attempt wired to its stores.
///
/// Pages through the question set, collects answers, optionally counts down,
/// and submits at most once per `(class, roll number)` as seen by the store.
pub struct QuizSession {
    candidate: Candidate,
    questions: QuestionSet,
    settings: QuizSettings,
    attempt: Attempt,
    results: Arc<dyn ResultStore>,
    candidates: Arc<dyn CandidateStore>,
    clock: Clock,
    timer: Option<CountdownTimer>,
    receipt: Option<SubmissionReceipt>,
}

impl QuizSession {
    #[must_use]
    pub fn new(
        candidate: Candidate,
        questions: QuestionSet,
        settings: QuizSettings,
        results: Arc<dyn ResultStore>,
        candidates: Arc<dyn CandidateStore>,
        clock: Clock,
    ) -> Self {
        let attempt = Attempt::new(questions.len(), &settings);
        Self {
            candidate,
            questions,
            settings,
            attempt,
            results,
            candidates,
            clock,
            timer: None,
            receipt: None,
        }
    }

    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.attempt.status()
    }

    #[must_use]
    pub fn page_index(&self) -> usize {
        self.attempt.page_index()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.attempt.page_count()
    }

    #[must_use]
    pub fn actions(&self) -> PageActions {
        self.attempt.actions()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.attempt.remaining_secs()
    }

    #[must_use]
    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    /// True while a countdown task is scheduled.
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Current page, ready to render.
    #[must_use]
    pub fn page_view(&self) -> PageView<'_> {
        let questions = self
            .attempt
            .current_page_range()
            .filter_map(|index| {
                self.questions.get(index).map(|q| QuestionView {
                    index,
                    text: q.text(),
                    options: q.options(),
                    selected: self.attempt.answer(index),
                })
            })
            .collect();
        PageView {
            page_index: self.attempt.page_index(),
            page_count: self.attempt.page_count(),
            questions,
            actions: self.attempt.actions(),
            remaining_secs: self.attempt.remaining_secs(),
        }
    }

    /// Result screen data once the attempt is completed.
    #[must_use]
    pub fn result_view(&self) -> Option<ResultView> {
        self.receipt.as_ref().map(|receipt| ResultView {
            name: receipt.record.name.clone(),
            class_id: receipt.record.class_id,
            roll_number: receipt.record.roll_number.clone(),
            score: receipt.record.score,
            total: self.questions.len(),
        })
    }

    /// Select `option` for question `index`. Re-selecting overwrites.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Attempt` if the session is not in progress or the
    /// question is not on a page shown so far.
    pub fn record_answer(
        &mut self,
        index: usize,
        option: impl Into<String>,
    ) -> Result<(), QuizError> {
        Ok(self.attempt.record_answer(index, option)?)
    }

    /// Select the option at `option_index` of question `index`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Attempt` with `QuestionUnavailable` if either index
    /// is out of range, or any error of [`Self::record_answer`].
    pub fn choose_option(&mut self, index: usize, option_index: usize) -> Result<(), QuizError> {
        let option = self
            .questions
            .get(index)
            .and_then(|q| q.options().get(option_index))
            .cloned()
            .ok_or(quiz_core::model::AttemptError::QuestionUnavailable { index })?;
        self.record_answer(index, option)
    }

    /// # Errors
    ///
    /// Returns `QuizError::Attempt` with `IncompletePage` when the current page
    /// has unanswered questions (page unchanged), `NoNextPage` on the last
    /// page, or `InvalidState` outside `InProgress`.
    pub fn advance_page(&mut self) -> Result<usize, QuizError> {
        Ok(self.attempt.advance_page()?)
    }

    /// # Errors
    ///
    /// Returns `QuizError::Attempt` with `InvalidState` outside `InProgress`.
    pub fn retreat_page(&mut self) -> Result<usize, QuizError> {
        Ok(self.attempt.retreat_page()?)
    }

    /// Start the countdown task and hand back its tick channel.
    ///
    /// Feed every received tick to [`Self::tick`]. Returns `None` for untimed
    /// sessions, once submission has begun, or after the time has run out.
    /// Calling it again replaces the previous task, resuming from the seconds
    /// left.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn arm_timer(&mut self) -> Option<TimerTicks> {
        let remaining = self.attempt.remaining_secs()?;
        if remaining == 0
            || self.attempt.is_expired()
            || self.attempt.status() != AttemptStatus::InProgress
        {
            return None;
        }
        let (timer, ticks) = CountdownTimer::spawn(TICK_PERIOD, remaining);
        self.timer = Some(timer);
        Some(ticks)
    }

    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Consume one second. When the countdown reaches zero the attempt is
    /// submitted, exactly once, whatever the page state.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Attempt` with `TimerDisabled` for untimed sessions,
    /// or any error of [`Self::submit`] from the automatic submission.
    pub async fn tick(&mut self) -> Result<TickOutcome, QuizError> {
        match self.attempt.tick()? {
            TickState::Running(secs) => Ok(TickOutcome::Running(secs)),
            TickState::Ignored => Ok(TickOutcome::Ignored),
            TickState::Expired => {
                tracing::info!(
                    class = %self.candidate.class_id(),
                    roll = %self.candidate.roll_number(),
                    "time is up, submitting automatically"
                );
                self.submit().await.map(TickOutcome::Submitted)
            }
        }
    }

    /// Score the attempt and store it unless a result already exists.
    ///
    /// The countdown is torn down before anything else. Unanswered questions
    /// count as incorrect.
    ///
    /// # Errors
    ///
    /// - `QuizError::Attempt` with `InvalidState` unless in progress (this
    ///   includes a submission already in flight).
    /// - `QuizError::AlreadySubmitted` if the store holds a result for this
    ///   class and roll number; the attempt becomes `Aborted`.
    /// - `QuizError::SubmissionFailed` if the store cannot be read or written;
    ///   the attempt returns to `InProgress` for a retry.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, QuizError> {
        self.attempt.begin_submit()?;
        self.disarm_timer();

        let class_id = self.candidate.class_id();
        let roll_number = self.candidate.roll_number().clone();
        let score = self.questions.score(self.attempt.answers());
        tracing::info!(class = %class_id, roll = %roll_number, score, "submitting quiz");

        match self.results.find_result(class_id, &roll_number).await {
            Ok(None) => {}
            Ok(Some(existing)) => {
                tracing::warn!(
                    class = %class_id,
                    roll = %roll_number,
                    existing = %existing.id,
                    "result already stored, not submitting again"
                );
                self.attempt.mark_aborted();
                return Err(QuizError::AlreadySubmitted {
                    class_id,
                    roll_number,
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "duplicate check failed");
                self.attempt.resume_after_failure();
                return Err(QuizError::SubmissionFailed(err));
            }
        }

        let submitted_at = self
            .settings
            .record_timestamp()
            .then(|| self.clock.now());
        let record = ResultRecord::for_candidate(&self.candidate, score, submitted_at);
        let id = match self.results.append_result(&record).await {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(error = %err, "writing result failed");
                self.attempt.resume_after_failure();
                return Err(QuizError::SubmissionFailed(err));
            }
        };

        // The result is stored; a stale local entry only means the next
        // attempt is refused as a duplicate.
        if let Err(err) = self.candidates.clear_candidate().await {
            tracing::warn!(error = %err, "could not clear stored candidate");
        }

        self.attempt.mark_completed();
        tracing::info!(%id, class = %class_id, score, "quiz submitted");
        let receipt = SubmissionReceipt { id, record };
        self.receipt = Some(receipt.clone());
        Ok(receipt)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("candidate", &self.candidate)
            .field("questions_len", &self.questions.len())
            .field("settings", &self.settings)
            .field("attempt", &self.attempt)
            .field("timer_running", &self.timer_running())
            .field("receipt", &self.receipt)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{
        AttemptError, CandidateDraft, ClassId, Question, RollNumber, RollNumberRule,
        StoredResult,
    };
    use quiz_core::time::{fixed_clock, fixed_now};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::{InMemoryRepository, StorageError};

    fn candidate() -> Candidate {
        CandidateDraft::new("Nisha", "12345678", "4")
            .validate(&RollNumberRule::any())
            .unwrap()
    }

    fn two_questions() -> QuestionSet {
        QuestionSet::new(vec![
            Question::new("2+2?", vec!["3".into(), "4".into()], "4").unwrap(),
            Question::new(
                "Capital of France?",
                vec!["Paris".into(), "Rome".into()],
                "Paris",
            )
            .unwrap(),
        ])
        .unwrap()
    }

    fn numbered(n: usize) -> QuestionSet {
        QuestionSet::new(
            (0..n)
                .map(|i| {
                    Question::new(format!("Q{i}"), vec!["right".into(), "wrong".into()], "right")
                        .unwrap()
                })
                .collect(),
        )
        .unwrap()
    }

    fn session_with(
        questions: QuestionSet,
        settings: QuizSettings,
        repo: &InMemoryRepository,
    ) -> QuizSession {
        QuizSession::new(
            candidate(),
            questions,
            settings,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            fixed_clock(),
        )
    }

    /// Results store that fails a configurable number of calls before
    /// delegating to memory.
    #[derive(Default)]
    struct FlakyResults {
        inner: InMemoryRepository,
        fail_finds: AtomicUsize,
        fail_appends: AtomicUsize,
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl ResultStore for FlakyResults {
        async fn find_result(
            &self,
            class: ClassId,
            roll: &RollNumber,
        ) -> Result<Option<StoredResult>, StorageError> {
            if take_failure(&self.fail_finds) {
                return Err(StorageError::Connection("offline".into()));
            }
            self.inner.find_result(class, roll).await
        }

        async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError> {
            if take_failure(&self.fail_appends) {
                return Err(StorageError::Connection("offline".into()));
            }
            self.inner.append_result(record).await
        }

        async fn list_results(&self, class: ClassId) -> Result<Vec<StoredResult>, StorageError> {
            self.inner.list_results(class).await
        }
    }

    #[tokio::test]
    async fn scores_the_documented_example() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(two_questions(), QuizSettings::default(), &repo);
        session.record_answer(0, "4").unwrap();
        session.record_answer(1, "Rome").unwrap();

        let receipt = session.submit().await.unwrap();
        assert_eq!(receipt.record.score, 1);
        assert_eq!(session.status(), AttemptStatus::Completed);

        let view = session.result_view().unwrap();
        assert_eq!(view.score, 1);
        assert_eq!(view.total, 2);
        assert_eq!(view.name, "Nisha");
    }

    #[tokio::test]
    async fn unanswered_questions_score_zero() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(3), QuizSettings::default(), &repo);
        let receipt = session.submit().await.unwrap();
        assert_eq!(receipt.record.score, 0);
    }

    #[tokio::test]
    async fn submission_clears_candidate_and_records_timestamp() {
        let repo = InMemoryRepository::new();
        repo.save_candidate(&candidate()).await.unwrap();
        let settings = QuizSettings::default().with_record_timestamp(true);
        let mut session = session_with(two_questions(), settings, &repo);

        let receipt = session.submit().await.unwrap();
        assert_eq!(receipt.record.submitted_at, Some(fixed_now()));
        assert!(repo.load_candidate().await.unwrap().is_none());

        let stored = repo.list_results(ClassId::new(4).unwrap()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, receipt.id);
    }

    #[tokio::test]
    async fn timestamp_follows_the_session_clock() {
        let repo = InMemoryRepository::new();
        let settings = QuizSettings::default().with_record_timestamp(true);
        let mut clock = fixed_clock();
        let mut early = QuizSession::new(
            candidate(),
            two_questions(),
            settings,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            clock,
        );
        clock.advance(chrono::Duration::minutes(5));
        let other = CandidateDraft::new("Ravi", "87654321", "4")
            .validate(&RollNumberRule::any())
            .unwrap();
        let mut late = QuizSession::new(
            other,
            two_questions(),
            settings,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            clock,
        );

        let first = early.submit().await.unwrap();
        let second = late.submit().await.unwrap();
        assert_eq!(first.record.submitted_at, Some(fixed_now()));
        assert_eq!(
            second.record.submitted_at,
            Some(fixed_now() + chrono::Duration::minutes(5))
        );
    }

    #[tokio::test]
    async fn timestamp_omitted_by_default() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(two_questions(), QuizSettings::default(), &repo);
        let receipt = session.submit().await.unwrap();
        assert_eq!(receipt.record.submitted_at, None);
    }

    #[tokio::test]
    async fn duplicate_aborts_without_writing() {
        let repo = InMemoryRepository::new();
        repo.save_candidate(&candidate()).await.unwrap();
        repo.append_result(&ResultRecord::for_candidate(&candidate(), 2, None))
            .await
            .unwrap();

        let mut session = session_with(two_questions(), QuizSettings::default(), &repo);
        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, QuizError::AlreadySubmitted { .. }));
        assert!(err.returns_to_intake());
        assert_eq!(session.status(), AttemptStatus::Aborted);

        let stored = repo.list_results(ClassId::new(4).unwrap()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].record.score, 2);
        // Candidate stays; only a successful submit clears it.
        assert!(repo.load_candidate().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_submit_on_same_session_is_rejected() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(two_questions(), QuizSettings::default(), &repo);
        session.submit().await.unwrap();
        let err = session.submit().await.unwrap_err();
        assert!(matches!(
            err,
            QuizError::Attempt(AttemptError::InvalidState {
                status: AttemptStatus::Completed,
                ..
            })
        ));
        let stored = repo.list_results(ClassId::new(4).unwrap()).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn failed_duplicate_check_returns_to_in_progress() {
        let results = Arc::new(FlakyResults::default());
        results.fail_finds.store(1, Ordering::SeqCst);
        let local = InMemoryRepository::new();
        local.save_candidate(&candidate()).await.unwrap();

        let mut session = QuizSession::new(
            candidate(),
            two_questions(),
            QuizSettings::default(),
            results.clone(),
            Arc::new(local.clone()),
            fixed_clock(),
        );
        session.record_answer(0, "4").unwrap();

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, QuizError::SubmissionFailed(_)));
        assert!(err.is_recoverable());
        assert_eq!(session.status(), AttemptStatus::InProgress);
        assert!(local.load_candidate().await.unwrap().is_some());

        // Answers survive and the retry goes through.
        session.record_answer(1, "Paris").unwrap();
        let receipt = session.submit().await.unwrap();
        assert_eq!(receipt.record.score, 2);
        assert!(local.load_candidate().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_write_returns_to_in_progress() {
        let results = Arc::new(FlakyResults::default());
        results.fail_appends.store(1, Ordering::SeqCst);
        let local = InMemoryRepository::new();
        let mut session = QuizSession::new(
            candidate(),
            two_questions(),
            QuizSettings::default(),
            results.clone(),
            Arc::new(local),
            fixed_clock(),
        );

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, QuizError::SubmissionFailed(_)));
        assert_eq!(session.status(), AttemptStatus::InProgress);
        assert!(
            results
                .list_results(ClassId::new(4).unwrap())
                .await
                .unwrap()
                .is_empty()
        );

        session.submit().await.unwrap();
        assert_eq!(
            results
                .list_results(ClassId::new(4).unwrap())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn page_view_reflects_answers_and_actions() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(7), QuizSettings::default(), &repo);
        session.choose_option(1, 0).unwrap();

        let view = session.page_view();
        assert_eq!(view.questions.len(), 5);
        assert_eq!(view.questions[1].selected, Some("right"));
        assert_eq!(view.questions[1].number(), 2);
        assert_eq!(view.progress_label(), "Page 1 of 2");
        assert!(view.actions.next);
        assert!(!view.actions.submit);

        assert!(matches!(
            session.choose_option(0, 5),
            Err(QuizError::Attempt(AttemptError::QuestionUnavailable {
                index: 0
            }))
        ));
    }

    #[tokio::test]
    async fn navigation_rejected_after_completion() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(7), QuizSettings::default(), &repo);
        session.submit().await.unwrap();
        assert!(matches!(
            session.record_answer(0, "right"),
            Err(QuizError::Attempt(AttemptError::InvalidState { .. }))
        ));
        assert!(matches!(
            session.advance_page(),
            Err(QuizError::Attempt(AttemptError::InvalidState { .. }))
        ));
        assert!(matches!(
            session.retreat_page(),
            Err(QuizError::Attempt(AttemptError::InvalidState { .. }))
        ));
    }

    #[tokio::test]
    async fn expiry_submits_exactly_once() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(7), QuizSettings::timed(100).unwrap(), &repo);
        session.record_answer(0, "right").unwrap();

        let mut submissions = 0;
        for _ in 0..100 {
            if let TickOutcome::Submitted(receipt) = session.tick().await.unwrap() {
                submissions += 1;
                assert_eq!(receipt.record.score, 1);
            }
        }
        assert_eq!(submissions, 1);
        assert_eq!(session.status(), AttemptStatus::Completed);
        assert_eq!(session.remaining_secs(), Some(0));

        // Late ticks change nothing.
        assert_eq!(session.tick().await.unwrap(), TickOutcome::Ignored);
        let stored = repo.list_results(ClassId::new(4).unwrap()).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn expiry_with_existing_result_aborts() {
        let repo = InMemoryRepository::new();
        repo.append_result(&ResultRecord::for_candidate(&candidate(), 0, None))
            .await
            .unwrap();
        let mut session = session_with(numbered(3), QuizSettings::timed(2).unwrap(), &repo);
        assert_eq!(session.tick().await.unwrap(), TickOutcome::Running(1));
        let err = session.tick().await.unwrap_err();
        assert!(matches!(err, QuizError::AlreadySubmitted { .. }));
        assert_eq!(session.status(), AttemptStatus::Aborted);
        assert_eq!(session.tick().await.unwrap(), TickOutcome::Ignored);
    }

    #[tokio::test]
    async fn ticks_after_manual_submit_are_ignored() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(3), QuizSettings::timed(5).unwrap(), &repo);
        session.tick().await.unwrap();
        session.submit().await.unwrap();
        assert_eq!(session.tick().await.unwrap(), TickOutcome::Ignored);
        assert_eq!(session.remaining_secs(), Some(4));
    }

    #[tokio::test]
    async fn untimed_session_has_no_timer() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(3), QuizSettings::default(), &repo);
        assert!(session.arm_timer().is_none());
        assert!(matches!(
            session.tick().await,
            Err(QuizError::Attempt(AttemptError::TimerDisabled))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_tears_down_the_timer() {
        let repo = InMemoryRepository::new();
        let mut session = session_with(numbered(3), QuizSettings::timed(30).unwrap(), &repo);
        let mut ticks = session.arm_timer().expect("timed session");
        assert!(session.timer_running());

        ticks.recv().await.unwrap();
        session.tick().await.unwrap();
        session.submit().await.unwrap();
        assert!(!session.timer_running());
        assert!(session.arm_timer().is_none());

        while ticks.recv().await.is_some() {
            assert_eq!(session.tick().await.unwrap(), TickOutcome::Ignored);
        }
        assert_eq!(session.remaining_secs(), Some(29));
    }
}
