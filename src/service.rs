// src/service.rs
// Request orchestration: vision -> log -> embed -> pipeline -> persist

use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::pipeline::{AnalysisPipeline, AnalysisRequest, bounded};
use crate::analysis::types::{QueryContext, Report};
use crate::error::{PlantCareError, Result};
use crate::llm::{Embedder, VisionAnalyzer};
use crate::store::{FeedbackType, HistoryEntry, NewAnalysisLog, ReportStore};

/// Image submitted for analysis
#[derive(Debug, Clone)]
pub struct PlantImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// File name or URL kept with the log row
    pub image_ref: Option<String>,
}

/// Outcome of one analysis request
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub log_id: i64,
    pub report: Report,
}

/// Model collaborators needed only by `analyze`
struct Analyzer {
    vision: Arc<dyn VisionAnalyzer>,
    embedder: Arc<dyn Embedder>,
    pipeline: AnalysisPipeline,
}

pub struct PlantCareService {
    analyzer: Option<Analyzer>,
    store: Arc<dyn ReportStore>,
}

impl PlantCareService {
    pub fn new(
        vision: Arc<dyn VisionAnalyzer>,
        embedder: Arc<dyn Embedder>,
        pipeline: AnalysisPipeline,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            analyzer: Some(Analyzer {
                vision,
                embedder,
                pipeline,
            }),
            store,
        }
    }

    /// History, stored reports and feedback only; `analyze` fails with `Config`
    pub fn records_only(store: Arc<dyn ReportStore>) -> Self {
        Self {
            analyzer: None,
            store,
        }
    }

    /// Analyze a photo and persist the resulting report.
    ///
    /// The log row is written as soon as the vision step succeeds, so a failure later
    /// in the request leaves a row without a report.
    pub async fn analyze(&self, image: &PlantImage, description: &str) -> Result<AnalysisOutcome> {
        let Some(analyzer) = &self.analyzer else {
            return Err(PlantCareError::Config(
                "Service was built without model collaborators".to_string(),
            ));
        };
        let timeout = analyzer.pipeline.config().call_timeout;

        let observation = bounded(
            timeout,
            "vision analysis",
            analyzer.vision.analyze(&image.bytes, &image.mime_type, description),
            PlantCareError::AnalysisFailed,
        )
        .await?;
        info!(
            "Vision identified {} at stage {}",
            observation.species, observation.growth_stage
        );

        let log_id = self
            .store
            .create_log(&NewAnalysisLog {
                species: observation.species.clone(),
                growth_stage: observation.growth_stage,
                caption: observation.caption.clone(),
                user_description: description.to_string(),
                image_ref: image.image_ref.clone(),
            })
            .await?;

        let embedding = bounded(
            timeout,
            "caption embedding",
            analyzer.embedder.embed(&observation.caption),
            PlantCareError::EmbeddingFailed,
        )
        .await?;

        let request = AnalysisRequest {
            query: QueryContext {
                species: observation.species,
                growth_stage: observation.growth_stage,
                embedding,
            },
            caption: observation.caption,
            user_text: description.to_string(),
        };

        let report = match analyzer.pipeline.run(&request).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Analysis {} failed: {}", log_id, e);
                return Err(e);
            }
        };

        self.store.save_report(log_id, &report).await?;
        info!("Saved report for analysis {}", log_id);

        Ok(AnalysisOutcome { log_id, report })
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.store.history().await
    }

    pub async fn report(&self, id: i64) -> Result<Report> {
        self.store.load_report(id).await
    }

    pub async fn feedback(
        &self,
        id: i64,
        feedback_type: FeedbackType,
        comment: Option<String>,
    ) -> Result<()> {
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.store.record_feedback(id, feedback_type, comment).await
    }
}
