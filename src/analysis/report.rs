// src/analysis/report.rs
// Assembles the final care report

use crate::analysis::types::{
    CareAdvice, GrowthStage, MetricScore, PeerMatch, Report, SensorComparison,
};

/// Narrative used when the advice collaborator is unavailable
pub const FALLBACK_ANALYSIS: &str = "service temporarily unavailable";

/// Everything the composer needs for one report
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub species: String,
    pub growth_stage: GrowthStage,
    pub caption: String,
    pub similar: Vec<PeerMatch>,
    pub comparisons: Vec<SensorComparison>,
    pub metric_scores: Vec<MetricScore>,
    pub overall_score: u8,
    pub advice: Option<CareAdvice>,
}

#[derive(Debug, Clone)]
pub struct ReportComposer {
    similar_image_count: usize,
}

impl Default for ReportComposer {
    fn default() -> Self {
        Self {
            similar_image_count: 3,
        }
    }
}

impl ReportComposer {
    pub fn new(similar_image_count: usize) -> Self {
        Self {
            similar_image_count,
        }
    }

    pub fn compose(&self, parts: ReportParts) -> Report {
        let similar_images = parts
            .similar
            .into_iter()
            .take(self.similar_image_count)
            .map(|m| m.image_ref)
            .collect();

        let advice = parts.advice.unwrap_or_else(|| CareAdvice {
            analysis: FALLBACK_ANALYSIS.to_string(),
            keywords: Vec::new(),
            care_guide: Vec::new(),
        });

        Report {
            species: parts.species,
            growth_stage: parts.growth_stage,
            overall_score: parts.overall_score,
            metric_scores: parts.metric_scores,
            sensor_comparisons: parts.comparisons,
            caption: parts.caption,
            analysis: advice.analysis,
            keywords: advice.keywords,
            care_guide: advice.care_guide,
            similar_images,
        }
    }
}
