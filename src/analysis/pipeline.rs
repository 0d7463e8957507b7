// src/analysis/pipeline.rs
// One analysis request: peers -> cohorts -> means -> scores -> advice -> report

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::analysis::aggregator::SensorAggregator;
use crate::analysis::peer_groups::PeerGroupSelector;
use crate::analysis::report::{ReportComposer, ReportParts};
use crate::analysis::scoring::{DeviationScorer, ScoringWeights};
use crate::analysis::types::{ChannelLayout, QueryContext, Report, SensorVector};
use crate::error::{PlantCareError, Result};
use crate::index::PlantIndex;
use crate::llm::{AdviceRequest, CareAdvisor};

/// Values the pipeline is constructed with
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub layout: ChannelLayout,
    pub weights: ScoringWeights,
    /// Nearest neighbours fetched for the "similar" cohort
    pub similar_top_k: usize,
    /// Records fetched per better/worse cohort
    pub cohort_limit: usize,
    /// Similar-image references kept in the report
    pub similar_image_count: usize,
    /// Upper bound on each external call
    pub call_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            layout: ChannelLayout::default(),
            weights: ScoringWeights::default(),
            similar_top_k: 5,
            cohort_limit: 5,
            similar_image_count: 3,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Pipeline input for one request
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub query: QueryContext,
    pub caption: String,
    pub user_text: String,
}

pub struct AnalysisPipeline {
    index: Arc<dyn PlantIndex>,
    advisor: Arc<dyn CareAdvisor>,
    selector: PeerGroupSelector,
    aggregator: SensorAggregator,
    scorer: DeviationScorer,
    composer: ReportComposer,
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(
        index: Arc<dyn PlantIndex>,
        advisor: Arc<dyn CareAdvisor>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            selector: PeerGroupSelector::new(index.clone()),
            aggregator: SensorAggregator::new(config.layout.clone()),
            scorer: DeviationScorer::new(config.weights.clone()),
            composer: ReportComposer::new(config.similar_image_count),
            index,
            advisor,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn run(&self, request: &AnalysisRequest) -> Result<Report> {
        let query = &request.query;
        let timeout = self.config.call_timeout;
        info!(
            "Analyzing {} at stage {} (ordinal {})",
            query.species,
            query.growth_stage,
            query.growth_stage.ordinal()
        );

        // Similar peers and better/worse cohorts do not depend on each other
        let (similar, groups) = tokio::try_join!(
            bounded(
                timeout,
                "similarity search",
                self.index
                    .search_similar(&query.embedding, &query.species, self.config.similar_top_k),
                PlantCareError::SearchFailed,
            ),
            bounded(
                timeout,
                "cohort query",
                self.selector
                    .select(&query.species, query.growth_stage, self.config.cohort_limit),
                PlantCareError::SearchFailed,
            ),
        )?;
        debug!(
            "{} similar peers, {} better, {} worse",
            similar.len(),
            groups.better.len(),
            groups.worse.len()
        );

        let similar_vectors: Vec<SensorVector> =
            similar.iter().map(|m| m.sensors.clone()).collect();
        let similar_avg = self.aggregator.average(&similar_vectors)?;
        let better_avg = self.aggregator.average(&groups.better.vectors)?;
        let worse_avg = self.aggregator.average(&groups.worse.vectors)?;

        let comparisons = self.aggregator.compare(
            similar_avg.as_deref(),
            better_avg.as_deref(),
            worse_avg.as_deref(),
        );

        let metric_scores = self.scorer.score_channels(&comparisons);
        let overall_score = self.scorer.overall_score(query.growth_stage, &metric_scores);
        let top_issues = self.scorer.top_issues(&comparisons);
        info!(
            "Overall score {} for {} ({} ranked issues)",
            overall_score,
            query.species,
            top_issues.len()
        );

        let advice_request = AdviceRequest {
            species: query.species.clone(),
            growth_stage: query.growth_stage,
            caption: request.caption.clone(),
            user_text: request.user_text.clone(),
            comparisons: comparisons.clone(),
            top_issues,
        };
        let advice = match bounded(
            timeout,
            "care advice",
            self.advisor.advise(&advice_request),
            PlantCareError::AdviceFailed,
        )
        .await
        {
            Ok(advice) => Some(advice),
            Err(e) => {
                warn!("Care advice unavailable, using fallback narrative: {}", e);
                None
            }
        };

        Ok(self.composer.compose(ReportParts {
            species: query.species.clone(),
            growth_stage: query.growth_stage,
            caption: request.caption.clone(),
            similar,
            comparisons,
            metric_scores,
            overall_score,
            advice,
        }))
    }
}

/// Runs `call` with a deadline; expiry becomes the error produced by `on_timeout`
pub async fn bounded<T, F>(
    timeout: Duration,
    what: &str,
    call: F,
    on_timeout: fn(String) -> PlantCareError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!("{} timed out after {:?}", what, timeout))),
    }
}
