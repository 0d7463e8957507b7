// tests/pipeline_e2e.rs
// Full pipeline runs against the in-memory index and stub advisors

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use plantcare::analysis::pipeline::{AnalysisConfig, AnalysisPipeline, AnalysisRequest};
use plantcare::analysis::types::{
    CareAdvice, CareGuide, ChannelLayout, GrowthStage, MetricStatus, PeerMatch, PlantRecord,
    QueryContext, Report, SensorChannel, SensorVector,
};
use plantcare::analysis::FALLBACK_ANALYSIS;
use plantcare::error::{PlantCareError, Result};
use plantcare::index::{InMemoryPlantIndex, PlantIndex};
use plantcare::llm::{AdviceRequest, CareAdvisor};

// ============================================================================
// Stubs
// ============================================================================

struct FixedAdvisor;

#[async_trait]
impl CareAdvisor for FixedAdvisor {
    async fn advise(&self, request: &AdviceRequest) -> Result<CareAdvice> {
        Ok(CareAdvice {
            analysis: format!("{} needs more humidity.", request.species),
            keywords: vec!["dry air".to_string()],
            care_guide: request
                .top_issues
                .iter()
                .map(|issue| CareGuide {
                    issue: issue.channel.label().to_string(),
                    content: "Mist the leaves daily.".to_string(),
                })
                .collect(),
        })
    }
}

struct FailingAdvisor;

#[async_trait]
impl CareAdvisor for FailingAdvisor {
    async fn advise(&self, _request: &AdviceRequest) -> Result<CareAdvice> {
        Err(PlantCareError::AdviceFailed("model unavailable".to_string()))
    }
}

struct FailingIndex;

#[async_trait]
impl PlantIndex for FailingIndex {
    async fn search_similar(&self, _embedding: &[f32], _species: &str, _top_k: usize) -> Result<Vec<PeerMatch>> {
        Err(PlantCareError::SearchFailed("connection refused".to_string()))
    }

    async fn query_cohort(&self, _species: &str, _stages: &[GrowthStage], _limit: usize) -> Result<Vec<SensorVector>> {
        Err(PlantCareError::SearchFailed("connection refused".to_string()))
    }
}

struct SlowIndex;

#[async_trait]
impl PlantIndex for SlowIndex {
    async fn search_similar(&self, _embedding: &[f32], _species: &str, _top_k: usize) -> Result<Vec<PeerMatch>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }

    async fn query_cohort(&self, _species: &str, _stages: &[GrowthStage], _limit: usize) -> Result<Vec<SensorVector>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn record(stage: GrowthStage, humidity: f64, image: &str) -> PlantRecord {
    PlantRecord {
        species: "fern".to_string(),
        growth_stage: stage,
        sensors: vec![humidity],
        embedding: vec![1.0, 0.0, 0.0],
        image_ref: image.to_string(),
    }
}

fn humidity_config() -> AnalysisConfig {
    AnalysisConfig {
        layout: ChannelLayout::new(vec![SensorChannel::AirHumidity]).unwrap(),
        ..AnalysisConfig::default()
    }
}

/// Similar peers average 20, the better cohort 25, the worse cohort 15
fn fern_index() -> InMemoryPlantIndex {
    InMemoryPlantIndex::new(vec![
        record(GrowthStage::Medium, 18.0, "fern_m1.jpg"),
        record(GrowthStage::Medium, 22.0, "fern_m2.jpg"),
        record(GrowthStage::High, 25.0, "fern_h1.jpg"),
        record(GrowthStage::Low, 15.0, "fern_l1.jpg"),
    ])
}

fn fern_request() -> AnalysisRequest {
    AnalysisRequest {
        query: QueryContext {
            species: "fern".to_string(),
            growth_stage: GrowthStage::Medium,
            embedding: vec![1.0, 0.0, 0.0],
        },
        caption: "Fronds are pale and curling at the tips".to_string(),
        user_text: "Leaves look dry".to_string(),
    }
}

async fn run_with(
    index: Arc<dyn PlantIndex>,
    advisor: Arc<dyn CareAdvisor>,
    config: AnalysisConfig,
) -> Result<Report> {
    AnalysisPipeline::new(index, advisor, config)
        .run(&fern_request())
        .await
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_fern_medium_scores_deficient_humidity() {
    let report = run_with(Arc::new(fern_index()), Arc::new(FixedAdvisor), humidity_config())
        .await
        .unwrap();

    assert_eq!(report.species, "fern");
    assert_eq!(report.growth_stage, GrowthStage::Medium);
    assert_eq!(report.metric_scores.len(), 1);
    assert_eq!(report.metric_scores[0].channel, SensorChannel::AirHumidity);
    assert_eq!(report.metric_scores[0].score, 70);
    assert_eq!(report.metric_scores[0].status, MetricStatus::Deficient);
    assert_eq!(report.overall_score, 70);

    let comparison = &report.sensor_comparisons[0];
    assert_eq!(comparison.similar_avg, Some(20.0));
    assert_eq!(comparison.better_avg, Some(25.0));
    assert_eq!(comparison.worse_avg, Some(15.0));

    assert_eq!(report.analysis, "fern needs more humidity.");
    assert_eq!(report.care_guide.len(), 1);
    assert_eq!(report.care_guide[0].issue, "air humidity");
    assert_eq!(report.similar_images.len(), 3);
}

#[tokio::test]
async fn test_empty_better_cohort_is_treated_as_optimal() {
    let index = InMemoryPlantIndex::new(vec![
        record(GrowthStage::High, 40.0, "a.jpg"),
        record(GrowthStage::Medium, 30.0, "b.jpg"),
    ]);
    let mut request = fern_request();
    request.query.growth_stage = GrowthStage::High;

    let pipeline = AnalysisPipeline::new(Arc::new(index), Arc::new(FixedAdvisor), humidity_config());
    let report = pipeline.run(&request).await.unwrap();

    let comparison = &report.sensor_comparisons[0];
    assert_eq!(comparison.better_avg, None);
    assert_eq!(comparison.worse_avg, Some(30.0));
    assert_eq!(report.metric_scores[0].score, 100);
    assert_eq!(report.metric_scores[0].status, MetricStatus::Adequate);
    // no better peers: no ranked issues, so no care guide entries
    assert!(report.care_guide.is_empty());
    // 0.7 * 90 + 0.3 * 100
    assert_eq!(report.overall_score, 93);
}

#[tokio::test]
async fn test_unknown_species_yields_comparisons_without_data() {
    let mut request = fern_request();
    request.query.species = "peace lily".to_string();

    let pipeline = AnalysisPipeline::new(
        Arc::new(fern_index()),
        Arc::new(FixedAdvisor),
        AnalysisConfig::default(),
    );
    let report = pipeline.run(&request).await.unwrap();

    assert_eq!(report.sensor_comparisons.len(), SensorChannel::ALL.len());
    assert!(report.sensor_comparisons.iter().all(|c| c.similar_avg.is_none()));
    assert!(report.similar_images.is_empty());

    // no data means no channel scores, and the overall score is the weighted base alone
    assert!(report.metric_scores.is_empty());
    assert_eq!(report.overall_score, 49);
}

#[tokio::test]
async fn test_empty_index_scores_no_channels() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(InMemoryPlantIndex::default()),
        Arc::new(FixedAdvisor),
        AnalysisConfig::default(),
    );
    let report = pipeline.run(&fern_request()).await.unwrap();

    assert!(report.metric_scores.is_empty());
    assert_eq!(report.overall_score, 49);
    assert_eq!(report.sensor_comparisons.len(), SensorChannel::ALL.len());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["sensorAnalysis"][0]["similarAvg"].is_null());
}

#[tokio::test]
async fn test_advice_failure_falls_back_to_fixed_narrative() {
    let report = run_with(Arc::new(fern_index()), Arc::new(FailingAdvisor), humidity_config())
        .await
        .unwrap();

    assert_eq!(report.analysis, FALLBACK_ANALYSIS);
    assert!(report.keywords.is_empty());
    assert!(report.care_guide.is_empty());
    assert_eq!(report.overall_score, 70);
}

#[tokio::test]
async fn test_index_failure_is_search_failed() {
    let result = run_with(Arc::new(FailingIndex), Arc::new(FixedAdvisor), humidity_config()).await;
    assert!(matches!(result, Err(PlantCareError::SearchFailed(_))));
}

#[tokio::test]
async fn test_slow_index_times_out_as_search_failed() {
    let config = AnalysisConfig {
        call_timeout: Duration::from_millis(50),
        ..humidity_config()
    };
    let result = run_with(Arc::new(SlowIndex), Arc::new(FixedAdvisor), config).await;

    match result {
        Err(PlantCareError::SearchFailed(msg)) => assert!(msg.contains("timed out")),
        other => panic!("expected SearchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sensor_vector_length_mismatch_is_data_integrity() {
    let mut index = fern_index();
    index.insert(PlantRecord {
        sensors: vec![10.0, 20.0],
        ..record(GrowthStage::High, 0.0, "broken.jpg")
    });

    let result = run_with(Arc::new(index), Arc::new(FixedAdvisor), humidity_config()).await;
    assert!(matches!(result, Err(PlantCareError::DataIntegrity(_))));
}

#[tokio::test]
async fn test_report_json_round_trip() {
    let report = run_with(Arc::new(fern_index()), Arc::new(FixedAdvisor), humidity_config())
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["plantName"], "fern");
    assert_eq!(json["growthLevel"], "Medium");
    assert_eq!(json["overallScore"], 70);
    assert_eq!(json["metricScores"][0]["sensorName"], "AirHumidity");
    assert_eq!(json["metricScores"][0]["status"], "deficient");
    assert_eq!(json["sensorAnalysis"][0]["betterAvg"], 25.0);

    let back: Report = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}
