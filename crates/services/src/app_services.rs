use std::sync::Arc;

use quiz_core::model::{QuizSettings, RollNumberRule};
use storage::repository::{QuestionTable, Storage};

use crate::Clock;
use crate::admin_service::AdminService;
use crate::error::AppServicesError;
use crate::intake_service::IntakeService;
use crate::sessions::QuizService;

/// Knobs shared by the app-facing services.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub settings: QuizSettings,
    pub roll_rule: RollNumberRule,
    pub admin_key: Option<String>,
}

/// Assembles app-facing services over one set of stores.
#[derive(Clone)]
pub struct AppServices {
    intake: Arc<IntakeService>,
    quiz: Arc<QuizService>,
    admin: Arc<AdminService>,
}

impl AppServices {
    /// Build services backed by `SQLite`: one database for results, another for
    /// the local candidate slot. Both URLs may point to the same file.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if either database cannot be opened.
    pub async fn new_sqlite(
        results_url: &str,
        local_url: &str,
        clock: Clock,
        questions: Arc<dyn QuestionTable>,
        options: ServiceOptions,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite_split(results_url, local_url).await?;
        Ok(Self::from_storage(&storage, clock, questions, options))
    }

    /// Wire services over an existing `Storage` aggregate.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        questions: Arc<dyn QuestionTable>,
        options: ServiceOptions,
    ) -> Self {
        let intake = Arc::new(IntakeService::new(
            options.roll_rule,
            Arc::clone(&storage.candidates),
        ));
        let quiz = Arc::new(QuizService::new(
            clock,
            options.settings,
            questions,
            Arc::clone(&storage.results),
            Arc::clone(&storage.candidates),
        ));
        let admin = Arc::new(AdminService::new(
            options.admin_key,
            Arc::clone(&storage.results),
        ));
        Self {
            intake,
            quiz,
            admin,
        }
    }

    #[must_use]
    pub fn intake(&self) -> Arc<IntakeService> {
        Arc::clone(&self.intake)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }
}
