use std::fmt;
use std::path::Path;
use std::sync::Arc;

use quiz_core::QuestionBank;
use quiz_core::model::ClassId;
use services::{AppServices, Clock, ServiceOptions};
use storage::repository::QuestionTable;
use tokio::io::BufReader;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod console;

use config::{AppConfig, require_non_empty};
use console::Console;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingClass,
    InvalidClass { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingClass => write!(f, "admin requires --class <n>"),
            ArgsError::InvalidClass { raw } => write!(f, "invalid --class value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid database url: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take  [--results-db <sqlite_url>] [--local-db <sqlite_url>]");
    eprintln!("  cargo run -p app -- admin --class <n> [--results-db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  take is the default subcommand");
    eprintln!("  --results-db sqlite://quiz_results.sqlite3");
    eprintln!("  --local-db   sqlite://quiz_local.sqlite3");
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  QUIZ_RESULTS_DB_URL, QUIZ_LOCAL_DB_URL, QUIZ_QUESTIONS_FILE, QUIZ_ADMIN_KEY");
    eprintln!("  QUIZ_ENABLE_TIMER, QUIZ_TIME_LIMIT_SECS, QUIZ_PAGE_SIZE, QUIZ_RECORD_TIMESTAMP");
    eprintln!("  QUIZ_ROLL_MIN_LEN, QUIZ_ROLL_MAX_LEN, QUIZ_ROLL_DIGITS_ONLY");
    eprintln!("  RUST_LOG, QUIZ_LOG_DIR");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Admin,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    results_db: Option<String>,
    local_db: Option<String>,
    class: Option<ClassId>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--results-db" => {
                    let value = require_value(args, "--results-db")?;
                    parsed.results_db = Some(
                        require_non_empty("--results-db", value.clone())
                            .map_err(|_| ArgsError::InvalidDbUrl { raw: value })?,
                    );
                }
                "--local-db" if cmd == Command::Take => {
                    let value = require_value(args, "--local-db")?;
                    parsed.local_db = Some(
                        require_non_empty("--local-db", value.clone())
                            .map_err(|_| ArgsError::InvalidDbUrl { raw: value })?,
                    );
                }
                "--class" if cmd == Command::Admin => {
                    let value = require_value(args, "--class")?;
                    let class = value
                        .parse::<ClassId>()
                        .map_err(|_| ArgsError::InvalidClass { raw: value.clone() })?;
                    parsed.class = Some(class);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        if cmd == Command::Admin && parsed.class.is_none() {
            return Err(ArgsError::MissingClass);
        }
        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if is_in_memory(&raw) || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn is_in_memory(db_url: &str) -> bool {
    db_url == "sqlite::memory:" || db_url.contains("mode=memory")
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Route logs to a daily file so the interactive terminal stays clean.
fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quiz.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = log_fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();
    guard
}

fn load_questions(config: &AppConfig) -> Result<Arc<dyn QuestionTable>, Box<dyn std::error::Error>> {
    let bank = match &config.questions_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let bank = QuestionBank::from_json_str(&raw)?;
            tracing::info!(path = %path.display(), classes = bank.classes().len(), "loaded question file");
            bank
        }
        None => QuestionBank::builtin()?,
    };
    Ok(Arc::new(bank))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means the candidate flow.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = AppConfig::from_env()?;
    let _log_guard = init_logging(&config);

    let results_db = normalize_sqlite_url(parsed.results_db.unwrap_or_else(|| config.results_db_url.clone()));
    let local_db = normalize_sqlite_url(parsed.local_db.unwrap_or_else(|| config.local_db_url.clone()));

    // Open + migrate SQLite in the binary glue so core/services stay pure.
    prepare_sqlite_file(&results_db)?;
    prepare_sqlite_file(&local_db)?;

    let services = AppServices::new_sqlite(
        &results_db,
        &local_db,
        Clock::system(),
        load_questions(&config)?,
        ServiceOptions {
            settings: config.settings,
            roll_rule: config.roll_rule,
            admin_key: config.admin_key.clone(),
        },
    )
    .await?;
    tracing::info!(?cmd, %results_db, %local_db, "quiz app started");

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    match (cmd, parsed.class) {
        (Command::Admin, Some(class)) => console.admin(&services.admin(), class).await?,
        (Command::Admin, None) => return Err(ArgsError::MissingClass.into()),
        (Command::Take, _) => console.take(&services).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_owned());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn admin_requires_class() {
        assert!(matches!(parse(Command::Admin, &[]), Err(ArgsError::MissingClass)));
        assert!(matches!(
            parse(Command::Admin, &["--class", "12"]),
            Err(ArgsError::InvalidClass { .. })
        ));
        let args = parse(Command::Admin, &["--class", "4"]).unwrap();
        assert_eq!(args.class.map(|c| c.value()), Some(4));
    }

    #[test]
    fn take_accepts_database_overrides() {
        let args = parse(
            Command::Take,
            &["--results-db", "sqlite::memory:", "--local-db", "sqlite::memory:"],
        )
        .unwrap();
        assert_eq!(args.results_db.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(
            parse(Command::Take, &["--class", "4"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(Command::Take, &["--results-db"]),
            Err(ArgsError::MissingValue { .. })
        ));
    }

    #[test]
    fn in_memory_urls_are_left_alone() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert!(prepare_sqlite_file("sqlite:file:x?mode=memory&cache=shared").is_ok());
        assert!(normalize_sqlite_url("quiz.sqlite3".into()).starts_with("sqlite:///"));
    }
}
