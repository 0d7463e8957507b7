// src/analysis/scoring.rs
// Per-channel health scores, overall score and top-issue ranking

use tracing::debug;

use crate::analysis::types::{
    GrowthStage, MetricScore, MetricStatus, RankedIssue, SensorComparison,
};
use crate::error::Result;

/// Base score contributed by the visually assessed growth stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageBaseScores {
    pub die: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for StageBaseScores {
    fn default() -> Self {
        Self {
            die: 30.0,
            low: 50.0,
            medium: 70.0,
            high: 90.0,
        }
    }
}

impl StageBaseScores {
    pub fn for_stage(&self, stage: GrowthStage) -> f64 {
        match stage {
            GrowthStage::Die => self.die,
            GrowthStage::Low => self.low,
            GrowthStage::Medium => self.medium,
            GrowthStage::High => self.high,
        }
    }
}

/// Tunable constants of the scoring formulas
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    /// Multiplier applied to relative deviation before subtracting from 100
    pub deviation_penalty: f64,
    /// Share of the overall score taken from the growth-stage base score
    pub stage_blend: f64,
    /// Channel scores at or above this are "adequate"
    pub adequate_threshold: u8,
    /// How many channels are handed to the advisor as top issues
    pub top_issue_count: usize,
    pub base_scores: StageBaseScores,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            deviation_penalty: 1.5,
            stage_blend: 0.7,
            adequate_threshold: 80,
            top_issue_count: 3,
            base_scores: StageBaseScores::default(),
        }
    }
}

/// Converts cohort comparisons into scores and ranked issues
#[derive(Debug, Clone, Default)]
pub struct DeviationScorer {
    weights: ScoringWeights,
}

impl DeviationScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Base score for a growth label; unknown labels are a `DataIntegrity` error
    pub fn base_score_for_label(&self, label: &str) -> Result<f64> {
        let stage: GrowthStage = label.parse()?;
        Ok(self.weights.base_scores.for_stage(stage))
    }

    /// Scores one channel.
    ///
    /// `current` is the similar-peer mean, `ideal` the better-cohort mean. Without a
    /// better cohort the ideal falls back to the current value, which yields a perfect
    /// score: no better peers means the plant is treated as already optimal.
    ///
    /// A channel with no similar peers has no data and is not scored.
    pub fn score_channel(&self, comparison: &SensorComparison) -> Option<MetricScore> {
        let current = comparison.similar_avg?;
        let ideal = comparison.better_avg.unwrap_or(current);
        let deviation = relative_deviation(current, ideal);

        let raw = 100.0 - deviation * 100.0 * self.weights.deviation_penalty;
        let score = raw.max(0.0).round().min(100.0) as u8;

        let status = if score >= self.weights.adequate_threshold {
            MetricStatus::Adequate
        } else if current < ideal {
            MetricStatus::Deficient
        } else {
            MetricStatus::Excessive
        };

        Some(MetricScore {
            channel: comparison.channel,
            score,
            status,
        })
    }

    /// Scores every channel that has data, in layout order
    pub fn score_channels(&self, comparisons: &[SensorComparison]) -> Vec<MetricScore> {
        comparisons
            .iter()
            .filter_map(|c| self.score_channel(c))
            .collect()
    }

    /// Blends the stage base score with the mean channel score.
    ///
    /// With no scored channels the mean is 0, so the result is the weighted base alone.
    pub fn overall_score(&self, stage: GrowthStage, scores: &[MetricScore]) -> u8 {
        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| f64::from(s.score)).sum::<f64>() / scores.len() as f64
        };
        self.blend(stage, mean)
    }

    fn blend(&self, stage: GrowthStage, mean_channel_score: f64) -> u8 {
        let alpha = self.weights.stage_blend;
        let base = self.weights.base_scores.for_stage(stage);
        let overall = base * alpha + mean_channel_score * (1.0 - alpha);
        overall.round().clamp(0.0, 100.0) as u8
    }

    /// Channels with the largest relative gap to the better cohort.
    ///
    /// Channels missing either mean are left out entirely. Ties keep layout order.
    pub fn top_issues(&self, comparisons: &[SensorComparison]) -> Vec<RankedIssue> {
        let mut ranked: Vec<RankedIssue> = comparisons
            .iter()
            .filter_map(|c| {
                let current = c.similar_avg?;
                let ideal = c.better_avg?;
                Some(RankedIssue {
                    channel: c.channel,
                    current,
                    ideal,
                    deviation: relative_deviation(current, ideal),
                })
            })
            .collect();

        // stable sort: equal deviations stay in layout order
        ranked.sort_by(|a, b| b.deviation.total_cmp(&a.deviation));
        ranked.truncate(self.weights.top_issue_count);

        debug!(
            "Top issues: {:?}",
            ranked.iter().map(|r| r.channel.as_str()).collect::<Vec<_>>()
        );
        ranked
    }
}

/// `|current - ideal| / |ideal|`, defined as 0 when the ideal is 0
pub fn relative_deviation(current: f64, ideal: f64) -> f64 {
    if ideal == 0.0 {
        0.0
    } else {
        (current - ideal).abs() / ideal.abs()
    }
}
