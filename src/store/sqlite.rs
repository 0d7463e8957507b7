// src/store/sqlite.rs
//! Implements ReportStore for SQLite.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::migration::run_migrations;
use super::{Feedback, FeedbackType, HistoryEntry, NewAnalysisLog, ReportStore};
use crate::analysis::types::{GrowthStage, Report};
use crate::error::{PlantCareError, Result};

pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    /// Open (creating if missing) the database at `database_url` and migrate it
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Each connection to an in-memory database is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Opened report store at {}", database_url);
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn create_log(&self, log: &NewAnalysisLog) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO plant_analysis_log (
                plant_name, growth_level, caption, user_description, image_ref, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&log.species)
        .bind(log.growth_stage.as_str())
        .bind(&log.caption)
        .bind(&log.user_description)
        .bind(&log.image_ref)
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.get("id");
        debug!("Created analysis log {} for {}", id, log.species);
        Ok(id)
    }

    async fn save_report(&self, id: i64, report: &Report) -> Result<()> {
        let json = serde_json::to_string(report)?;
        let result = sqlx::query("UPDATE plant_analysis_log SET analysis_result = ? WHERE id = ?")
            .bind(json)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PlantCareError::NotFound(id));
        }
        Ok(())
    }

    async fn load_report(&self, id: i64) -> Result<Report> {
        let row = sqlx::query("SELECT analysis_result FROM plant_analysis_log WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PlantCareError::NotFound(id))?;

        let json: Option<String> = row.get("analysis_result");
        let json = json.ok_or(PlantCareError::MissingReport(id))?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, plant_name, growth_level, user_description, created_at,
                   feedback_type, feedback_comment, feedback_at
            FROM plant_analysis_log
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let growth_level: String = row.get("growth_level");
            let created_at: NaiveDateTime = row.get("created_at");
            let feedback_type: Option<String> = row.get("feedback_type");
            let feedback_at: Option<NaiveDateTime> = row.get("feedback_at");

            let feedback = match (feedback_type, feedback_at) {
                (Some(kind), Some(at)) => Some(Feedback {
                    feedback_type: kind.parse()?,
                    comment: row.get("feedback_comment"),
                    recorded_at: Utc.from_utc_datetime(&at),
                }),
                _ => None,
            };

            entries.push(HistoryEntry {
                id: row.get("id"),
                species: row.get("plant_name"),
                growth_stage: growth_level.parse::<GrowthStage>()?,
                user_description: row.get("user_description"),
                created_at: Utc.from_utc_datetime(&created_at),
                feedback,
            });
        }
        Ok(entries)
    }

    async fn record_feedback(
        &self,
        id: i64,
        feedback_type: FeedbackType,
        comment: Option<String>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE plant_analysis_log
            SET feedback_type = ?, feedback_comment = ?, feedback_at = ?
            WHERE id = ?
            "#,
        )
        .bind(feedback_type.as_str())
        .bind(comment)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PlantCareError::NotFound(id));
        }
        info!("Recorded {} feedback for analysis {}", feedback_type, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(species: &str, description: &str) -> NewAnalysisLog {
        NewAnalysisLog {
            species: species.to_string(),
            growth_stage: GrowthStage::Medium,
            caption: "pale fronds".to_string(),
            user_description: description.to_string(),
            image_ref: None,
        }
    }

    #[tokio::test]
    async fn test_missing_report_vs_unknown_id() {
        let store = SqliteReportStore::connect("sqlite::memory:").await.unwrap();
        let id = store.create_log(&log("fern", "first")).await.unwrap();

        assert!(matches!(
            store.load_report(id).await,
            Err(PlantCareError::MissingReport(x)) if x == id
        ));
        assert!(matches!(
            store.load_report(id + 100).await,
            Err(PlantCareError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_feedback_on_unknown_id() {
        let store = SqliteReportStore::connect("sqlite::memory:").await.unwrap();
        assert!(matches!(
            store.record_feedback(42, FeedbackType::Improved, None).await,
            Err(PlantCareError::NotFound(42))
        ));
    }
}
