use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::generation::assembler::{AssemblerSettings, GenerationMode};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub course_path: PathBuf,
    /// Where to write the course result JSON; stdout when unset.
    pub output_path: Option<PathBuf>,
    pub max_concurrent_lessons: usize,
    pub assembler: AssemblerSettings,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = AssemblerSettings::default();
        let mode = match std::env::var("GENERATION_MODE") {
            Ok(raw) => GenerationMode::from_str(&raw).map_err(|e| anyhow!(e))?,
            Err(_) => defaults.mode,
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            course_path: PathBuf::from(require_env("COURSE_PATH")?),
            output_path: std::env::var("OUTPUT_PATH").ok().map(PathBuf::from),
            max_concurrent_lessons: parse_env("MAX_CONCURRENT_LESSONS", 4)?,
            assembler: AssemblerSettings {
                max_attempts: parse_env("ORACLE_MAX_ATTEMPTS", defaults.max_attempts)?,
                backoff_base: Duration::from_millis(parse_env("ORACLE_BACKOFF_MS", 1000)?),
                call_timeout: Duration::from_secs(parse_env("ORACLE_CALL_TIMEOUT_SECS", 45)?),
                lesson_budget: Duration::from_secs(parse_env("LESSON_TIMEOUT_SECS", 120)?),
                points_per_increment: parse_env(
                    "POINTS_PER_INCREMENT",
                    defaults.points_per_increment,
                )?,
                mode,
            },
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional numeric variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
