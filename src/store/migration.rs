// src/store/migration.rs
//! Ensures the plant_analysis_log table exists. Run on connect.

use sqlx::{Executor, SqlitePool};

use crate::error::Result;

const CREATE_ANALYSIS_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS plant_analysis_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plant_name TEXT NOT NULL,
    growth_level TEXT NOT NULL,
    caption TEXT NOT NULL,
    user_description TEXT NOT NULL,
    image_ref TEXT,
    analysis_result TEXT,
    feedback_type TEXT CHECK (feedback_type IN ('improved', 'no_change', 'worsened')),
    feedback_comment TEXT,
    feedback_at DATETIME,
    created_at DATETIME NOT NULL
);
"#;

const CREATE_ANALYSIS_LOG_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_plant_analysis_log_created
    ON plant_analysis_log(created_at DESC);
"#;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    pool.execute(CREATE_ANALYSIS_LOG).await?;
    pool.execute(CREATE_ANALYSIS_LOG_INDEX).await?;
    Ok(())
}
