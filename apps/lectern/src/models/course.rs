use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::slide::{Slide, SlideWarning};

/// One titled group of slides inside a lesson. Its `points` are the source
/// material the oracle turns into content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSegment {
    pub heading: String,
    #[serde(default)]
    pub subheading: Option<String>,
    pub points: Vec<String>,
}

/// Input descriptor for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDescriptor {
    pub lesson_id: String,
    pub title: String,
    #[serde(default)]
    pub segments: Vec<LessonSegment>,
}

/// Course input file: an ordered list of lessons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInput {
    pub title: String,
    pub lessons: Vec<LessonDescriptor>,
}

impl CourseInput {
    /// Reads a course description from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let course: CourseInput = serde_json::from_str(&raw)?;
        if course.lessons.is_empty() {
            return Err(AppError::Validation(format!(
                "course '{}' has no lessons",
                course.title
            )));
        }
        Ok(course)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Every fragment was generated and packed.
    Complete,
    /// Generation stopped early; the slides committed so far are kept.
    Degraded,
    /// Generation stopped before any slide was committed.
    Failed,
}

/// Outcome of assembling one lesson. Produced only by the section assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonResult {
    pub lesson_id: String,
    pub slides: Vec<Slide>,
    pub status: LessonStatus,
    /// Oracle calls made for this lesson, retries included.
    pub attempts: u32,
    /// Parts the splitter could not bring under capacity.
    pub parts_over_capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LessonResult {
    pub fn warnings(&self) -> impl Iterator<Item = &SlideWarning> {
        self.slides.iter().flat_map(|s| s.warnings.iter())
    }
}

/// Per-lesson line of the course report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSummary {
    pub lesson_id: String,
    pub status: LessonStatus,
    pub attempts: u32,
    pub slide_count: usize,
    pub dense_slide_count: usize,
    pub warnings: Vec<SlideWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final deck plus completion report, handed to the downstream renderer.
///
/// Every slide in `slides` already satisfies the capacity invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub slides: Vec<Slide>,
    pub overflow_count: u32,
    pub lesson_statuses: HashMap<String, LessonStatus>,
    pub lessons: Vec<LessonSummary>,
}
