// src/error.rs
// Error taxonomy shared by the pipeline, its collaborators and the report store

/// Errors surfaced by plant analysis.
///
/// `SearchFailed`, `DataIntegrity`, `EmbeddingFailed` and `AnalysisFailed` abort the
/// request. `AdviceFailed` is recovered inside the pipeline by a fallback narrative.
#[derive(Debug, thiserror::Error)]
pub enum PlantCareError {
    #[error("Vector search failed: {0}")]
    SearchFailed(String),

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Plant image analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Care advice generation failed: {0}")]
    AdviceFailed(String),

    #[error("Analysis log not found: {0}")]
    NotFound(i64),

    #[error("Analysis log {0} has no stored report")]
    MissingReport(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PlantCareError {
    /// Short machine-readable reason, stable across message wording changes
    pub fn reason(&self) -> &'static str {
        match self {
            PlantCareError::SearchFailed(_) => "search_failed",
            PlantCareError::DataIntegrity(_) => "data_integrity",
            PlantCareError::EmbeddingFailed(_) => "embedding_failed",
            PlantCareError::AnalysisFailed(_) => "analysis_failed",
            PlantCareError::AdviceFailed(_) => "advice_failed",
            PlantCareError::NotFound(_) => "not_found",
            PlantCareError::MissingReport(_) => "missing_report",
            PlantCareError::Storage(_) => "storage",
            PlantCareError::Serialization(_) => "serialization",
            PlantCareError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, PlantCareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_are_distinct_for_fatal_kinds() {
        let search = PlantCareError::SearchFailed("down".into());
        let embed = PlantCareError::EmbeddingFailed("quota".into());
        let vision = PlantCareError::AnalysisFailed("garbled".into());
        assert_ne!(search.reason(), embed.reason());
        assert_ne!(embed.reason(), vision.reason());
        assert!(search.to_string().contains("down"));
    }
}
