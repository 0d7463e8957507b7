// src/llm/mod.rs
//! Model collaborators: vision assessment, caption embedding and care advice.

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::analysis::types::{
    CareAdvice, GrowthStage, PlantObservation, RankedIssue, SensorComparison,
};
use crate::error::Result;

/// Turns a plant photo into species, growth stage and a caption
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Fails with `AnalysisFailed` on transport errors or malformed model output
    async fn analyze(&self, image: &[u8], mime_type: &str, user_text: &str)
    -> Result<PlantObservation>;
}

/// Embeds caption text into the index's vector space
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fails with `EmbeddingFailed`
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Input of the advice collaborator
#[derive(Debug, Clone)]
pub struct AdviceRequest {
    pub species: String,
    pub growth_stage: GrowthStage,
    pub caption: String,
    pub user_text: String,
    pub comparisons: Vec<SensorComparison>,
    pub top_issues: Vec<RankedIssue>,
}

/// Writes the narrative part of a report
#[async_trait]
pub trait CareAdvisor: Send + Sync {
    /// Fails with `AdviceFailed`; callers fall back to a fixed narrative
    async fn advise(&self, request: &AdviceRequest) -> Result<CareAdvice>;
}
