//! Line-oriented terminal front end: intake form, paged quiz, result screen
//! and the admin listing.

use std::io;

use quiz_core::model::{CandidateDraft, ClassId, MAX_CLASS, MIN_CLASS};
use services::sessions::{TimerTick, format_remaining};
use services::{
    AdminError, AdminService, AppServices, IntakeError, IntakeService, QuizError, QuizSession,
    TickOutcome, TimerTicks,
};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConsoleError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Admin(#[from] AdminError),
}

/// How a quiz screen was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuizExit {
    Finished,
    BackToIntake,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Answer { question: usize, option: usize },
    Next,
    Back,
    Submit,
    Show,
    Quit,
    Unknown,
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "n" | "next" => return Self::Next,
            "b" | "back" => return Self::Back,
            "s" | "submit" => return Self::Submit,
            "" | "p" | "page" => return Self::Show,
            "q" | "quit" => return Self::Quit,
            _ => {}
        }
        let mut parts = line.split_whitespace();
        let parsed = (
            parts.next().and_then(|p| p.parse::<usize>().ok()),
            parts.next().and_then(|p| p.parse::<usize>().ok()),
            parts.next(),
        );
        match parsed {
            (Some(question), Some(option), None) if question > 0 && option > 0 => Self::Answer {
                question: question - 1,
                option: option - 1,
            },
            _ => Self::Unknown,
        }
    }
}

async fn next_tick(ticks: &mut Option<TimerTicks>) -> Option<TimerTick> {
    match ticks {
        Some(ticks) => ticks.recv().await,
        None => std::future::pending().await,
    }
}

pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    async fn say(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    async fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        self.out.write_all(label.as_bytes()).await?;
        self.out.flush().await?;
        self.lines.next_line().await
    }

    /// Intake → quiz → result. Returns when a result is shown or input ends.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError` for terminal I/O failures and errors the
    /// candidate cannot recover from.
    pub async fn take(&mut self, services: &AppServices) -> Result<(), ConsoleError> {
        let intake = services.intake();
        let quiz = services.quiz();
        loop {
            if !self.intake(&intake).await? {
                return Ok(());
            }
            let mut session = match quiz.start_session().await {
                Ok(session) => session,
                Err(err) if err.returns_to_intake() => {
                    self.say(&err.to_string()).await?;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            match self.quiz(&mut session).await? {
                QuizExit::Finished => {
                    self.show_result(&session).await?;
                    return Ok(());
                }
                QuizExit::BackToIntake => {}
                QuizExit::Quit => return Ok(()),
            }
        }
    }

    /// Returns `false` when input ends before the form is complete.
    async fn intake(&mut self, intake: &IntakeService) -> Result<bool, ConsoleError> {
        let roll_hint = intake.rule().describe();
        loop {
            self.say("\nEnter your details to start the quiz.").await?;
            let Some(name) = self.ask("Name: ").await? else {
                return Ok(false);
            };
            let Some(roll) = self.ask(&format!("Roll number ({roll_hint}): ")).await? else {
                return Ok(false);
            };
            let Some(class) = self
                .ask(&format!("Class ({MIN_CLASS}-{MAX_CLASS}): "))
                .await?
            else {
                return Ok(false);
            };

            match intake.submit(CandidateDraft::new(name, roll, class)).await {
                Ok(_) => return Ok(true),
                Err(IntakeError::Invalid(err)) => self.say(&err.to_string()).await?,
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn quiz(&mut self, session: &mut QuizSession) -> Result<QuizExit, ConsoleError> {
        let mut ticks = session.arm_timer();
        self.show_page(session).await?;

        loop {
            tokio::select! {
                line = self.lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(QuizExit::Quit);
                    };
                    if let Some(exit) = self.handle_input(session, &mut ticks, &line).await? {
                        return Ok(exit);
                    }
                }
                tick = next_tick(&mut ticks) => {
                    if tick.is_none() {
                        ticks = None;
                        continue;
                    }
                    match session.tick().await {
                        Ok(TickOutcome::Running(secs)) => {
                            if secs <= 10 || secs % 30 == 0 {
                                self.say(&format!("Time left: {}", format_remaining(secs))).await?;
                            }
                        }
                        Ok(TickOutcome::Submitted(_)) => {
                            self.say("Time is up. Your answers have been submitted.").await?;
                            return Ok(QuizExit::Finished);
                        }
                        Ok(TickOutcome::Ignored) => {}
                        Err(err) => {
                            if let Some(exit) = self.handle_quiz_error(session, &mut ticks, err).await? {
                                return Ok(exit);
                            }
                        }
                    }
                }
            }
        }
    }

    async fn handle_input(
        &mut self,
        session: &mut QuizSession,
        ticks: &mut Option<TimerTicks>,
        line: &str,
    ) -> Result<Option<QuizExit>, ConsoleError> {
        match Input::parse(line) {
            Input::Answer { question, option } => {
                match session.choose_option(question, option) {
                    Ok(()) => {}
                    Err(QuizError::Attempt(_)) => {
                        self.say("No such question or option on this page.").await?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Input::Next => match session.advance_page() {
                Ok(_) => self.show_page(session).await?,
                Err(err) if err.is_recoverable() => self.say(&err.to_string()).await?,
                Err(err) => return Err(err.into()),
            },
            Input::Back => {
                session.retreat_page()?;
                self.show_page(session).await?;
            }
            Input::Submit if !session.actions().submit && !session.attempt().is_expired() => {
                self.say("Submit is available on the last page.").await?;
            }
            Input::Submit => match session.submit().await {
                Ok(_) => return Ok(Some(QuizExit::Finished)),
                Err(err) => return self.handle_quiz_error(session, ticks, err).await,
            },
            Input::Show => self.show_page(session).await?,
            Input::Quit => return Ok(Some(QuizExit::Quit)),
            Input::Unknown => {
                self.say("Type `<question> <option>` to answer, or n, b, s, q.")
                    .await?;
            }
        }
        Ok(None)
    }

    async fn handle_quiz_error(
        &mut self,
        session: &mut QuizSession,
        ticks: &mut Option<TimerTicks>,
        err: QuizError,
    ) -> Result<Option<QuizExit>, ConsoleError> {
        if err.returns_to_intake() {
            self.say(&err.to_string()).await?;
            return Ok(Some(QuizExit::BackToIntake));
        }
        if let QuizError::SubmissionFailed(_) = err {
            self.say(&err.to_string()).await?;
            *ticks = session.arm_timer();
            if session.attempt().is_expired() {
                self.say("Time is up. Type s to submit again.").await?;
            }
            return Ok(None);
        }
        Err(err.into())
    }

    async fn show_page(&mut self, session: &QuizSession) -> io::Result<()> {
        let view = session.page_view();
        let mut text = format!("\n{}", view.progress_label());
        if let Some(secs) = view.remaining_secs {
            text.push_str(&format!("  (time left {})", format_remaining(secs)));
        }
        for question in &view.questions {
            text.push_str(&format!("\n{}. {}", question.number(), question.text));
            for (i, option) in question.options.iter().enumerate() {
                let mark = if question.selected == Some(option.as_str()) {
                    'x'
                } else {
                    ' '
                };
                text.push_str(&format!("\n   [{mark}] {}) {option}", i + 1));
            }
        }
        let mut actions = vec!["<question> <option> to answer"];
        if view.actions.back {
            actions.push("b back");
        }
        if view.actions.next {
            actions.push("n next");
        }
        if view.actions.submit {
            actions.push("s submit");
        }
        actions.push("q quit");
        text.push_str(&format!("\n{}", actions.join(" | ")));
        self.say(&text).await
    }

    async fn show_result(&mut self, session: &QuizSession) -> io::Result<()> {
        let Some(result) = session.result_view() else {
            return Ok(());
        };
        self.say(&format!(
            "\nQuiz submitted.\nName: {}\nClass: {}\nRoll number: {}\nScore: {} / {}",
            result.name, result.class_id, result.roll_number, result.score, result.total
        ))
        .await
    }

    /// Prompt for the admin key and print every result of `class`.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Admin` if the admin view is disabled, the key is
    /// wrong, or the results cannot be read.
    pub async fn admin(&mut self, admin: &AdminService, class: ClassId) -> Result<(), ConsoleError> {
        if !admin.is_enabled() {
            return Err(AdminError::Disabled.into());
        }
        let Some(key) = self.ask("Admin key: ").await? else {
            return Ok(());
        };
        let view = admin.login(&key)?;
        let results = view.class_results(class).await?;
        if results.is_empty() {
            self.say(&format!("No results for class {class}.")).await?;
            return Ok(());
        }

        let mut table = format!("{:<4} {:<24} {:<12} {:>5}  Submitted", "#", "Name", "Roll", "Score");
        for (i, stored) in results.iter().enumerate() {
            let record = &stored.record;
            let submitted = record
                .submitted_at
                .map_or_else(|| "-".to_owned(), |at| at.format("%Y-%m-%d %H:%M").to_string());
            table.push_str(&format!(
                "\n{:<4} {:<24} {:<12} {:>5}  {submitted}",
                i + 1,
                record.name,
                record.roll_number.as_str(),
                record.score
            ));
        }
        self.say(&table).await?;
        Ok(())
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quiz_core::QuestionBank;
    use quiz_core::model::{QuizSettings, RollNumberRule};
    use quiz_core::time::fixed_clock;
    use services::ServiceOptions;
    use storage::repository::{QuestionTable, Storage};
    use tokio::io::BufReader;

    const BANK: &str = r#"{
        "4": [
            { "question": "2+2?", "options": ["3", "4"], "answer": "4" },
            { "question": "Capital of France?", "options": ["Paris", "Rome"], "answer": "Paris" }
        ]
    }"#;

    fn app_services(storage: &Storage) -> AppServices {
        let questions: Arc<dyn QuestionTable> = Arc::new(QuestionBank::from_json_str(BANK).unwrap());
        AppServices::from_storage(
            storage,
            fixed_clock(),
            questions,
            ServiceOptions {
                settings: QuizSettings::default(),
                roll_rule: RollNumberRule::exact_digits(8),
                admin_key: Some("key".into()),
            },
        )
    }

    async fn run_take(storage: &Storage, input: &str) -> String {
        let mut console = Console::new(BufReader::new(input.as_bytes()), Vec::new());
        console.take(&app_services(storage)).await.unwrap();
        String::from_utf8(console.output().clone()).unwrap()
    }

    #[test]
    fn parses_inputs() {
        assert_eq!(
            Input::parse(" 3 2 "),
            Input::Answer {
                question: 2,
                option: 1
            }
        );
        assert_eq!(Input::parse("N"), Input::Next);
        assert_eq!(Input::parse(""), Input::Show);
        assert_eq!(Input::parse("0 1"), Input::Unknown);
        assert_eq!(Input::parse("1 2 3"), Input::Unknown);
        assert_eq!(Input::parse("hello"), Input::Unknown);
    }

    #[tokio::test]
    async fn scripted_quiz_prints_score() {
        let storage = Storage::in_memory();
        let out = run_take(&storage, "Nisha\n12345678\n4\n1 2\n2 2\ns\n").await;
        assert!(out.contains("Page 1 of 1"));
        assert!(out.contains("Score: 1 / 2"));
    }

    #[tokio::test]
    async fn invalid_intake_is_asked_again() {
        let storage = Storage::in_memory();
        let out = run_take(&storage, "Nisha\n12\n4\nNisha\n12345678\n4\ns\n").await;
        assert!(out.contains("exactly 8 digits"));
        assert!(out.contains("Score: 0 / 2"));
    }

    #[tokio::test]
    async fn repeat_candidate_returns_to_intake() {
        let storage = Storage::in_memory();
        run_take(&storage, "Nisha\n12345678\n4\ns\n").await;
        let out = run_take(&storage, "Nisha\n12345678\n4\ns\n").await;
        assert!(out.contains("has already taken"));
        assert!(!out.contains("Score:"));
    }

    #[tokio::test]
    async fn admin_lists_results() {
        let storage = Storage::in_memory();
        run_take(&storage, "Nisha\n12345678\n4\n1 2\ns\n").await;

        let services = app_services(&storage);
        let mut console = Console::new(BufReader::new("key\n".as_bytes()), Vec::new());
        console
            .admin(&services.admin(), ClassId::new(4).unwrap())
            .await
            .unwrap();
        let out = String::from_utf8(console.output().clone()).unwrap();
        assert!(out.contains("Nisha"));
        assert!(out.contains("12345678"));

        let mut console = Console::new(BufReader::new("wrong\n".as_bytes()), Vec::new());
        let err = console
            .admin(&services.admin(), ClassId::new(4).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Admin(AdminError::Unauthorized)));
    }
}
