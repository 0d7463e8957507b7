// src/store/mod.rs
//! Analysis log persistence: one row per request, the report JSON, user feedback.

pub mod migration;
pub mod sqlite;

pub use sqlite::SqliteReportStore;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::types::{GrowthStage, Report};
use crate::error::{PlantCareError, Result};

/// How the plant did after the user followed the advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Improved,
    NoChange,
    Worsened,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 3] = [
        FeedbackType::Improved,
        FeedbackType::NoChange,
        FeedbackType::Worsened,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Improved => "improved",
            FeedbackType::NoChange => "no_change",
            FeedbackType::Worsened => "worsened",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = PlantCareError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                PlantCareError::DataIntegrity(format!(
                    "Unknown feedback type '{}' (expected improved, no_change or worsened)",
                    s
                ))
            })
    }
}

/// Row written before the pipeline runs
#[derive(Debug, Clone)]
pub struct NewAnalysisLog {
    pub species: String,
    pub growth_stage: GrowthStage,
    pub caption: String,
    pub user_description: String,
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub feedback_type: FeedbackType,
    pub comment: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub species: String,
    pub growth_stage: GrowthStage,
    pub user_description: String,
    pub created_at: DateTime<Utc>,
    pub feedback: Option<Feedback>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a log row and return its id
    async fn create_log(&self, log: &NewAnalysisLog) -> Result<i64>;

    /// Attach the serialized report to a log row
    async fn save_report(&self, id: i64, report: &Report) -> Result<()>;

    /// `NotFound` for unknown ids, `MissingReport` when no report was saved
    async fn load_report(&self, id: i64) -> Result<Report>;

    /// All log rows, newest first
    async fn history(&self) -> Result<Vec<HistoryEntry>>;

    async fn record_feedback(
        &self,
        id: i64,
        feedback_type: FeedbackType,
        comment: Option<String>,
    ) -> Result<()>;
}
