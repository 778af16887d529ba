mod config;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod models;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::oracle::LlmOracle;
use crate::generation::orchestrator::CourseOrchestrator;
use crate::layout::LayoutMetrics;
use crate::llm_client::LlmClient;
use crate::models::course::CourseInput;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Lectern v{}", env!("CARGO_PKG_VERSION"));

    // Layout constants shared by estimator, builder and splitter
    let metrics = LayoutMetrics::default();
    metrics.validate()?;

    let course = CourseInput::from_path(&config.course_path)
        .with_context(|| format!("Failed to load course from {}", config.course_path.display()))?;
    info!(
        "Loaded course '{}' with {} lessons",
        course.title,
        course.lessons.len()
    );

    // Initialize LLM client; per-call timeout is enforced again by the assembler
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.assembler.call_timeout,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let orchestrator = CourseOrchestrator::new(
        Arc::new(LlmOracle::new(llm)),
        metrics,
        config.assembler,
        config.max_concurrent_lessons,
    );

    let result = orchestrator.run(course.lessons).await?;
    let json = serde_json::to_string_pretty(&result)?;

    match &config.output_path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} slides to {}", result.slides.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
