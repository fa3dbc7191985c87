#![forbid(unsafe_code)]

pub mod admin_service;
pub mod app_services;
pub mod error;
pub mod intake_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use admin_service::{AdminService, AdminView};
pub use app_services::{AppServices, ServiceOptions};
pub use error::{AdminError, AppServicesError, IntakeError, QuizError};
pub use intake_service::IntakeService;
pub use sessions::{
    PageView, QuestionView, QuizService, QuizSession, ResultView, SubmissionReceipt, TickOutcome,
    TimerTicks,
};
