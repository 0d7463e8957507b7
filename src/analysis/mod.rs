// src/analysis/mod.rs
//! Peer-cohort analysis pipeline.

pub mod aggregator;
pub mod peer_groups;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod types;

pub use aggregator::SensorAggregator;
pub use peer_groups::{PeerGroupSelector, PeerGroups};
pub use pipeline::{AnalysisConfig, AnalysisPipeline, AnalysisRequest};
pub use report::{FALLBACK_ANALYSIS, ReportComposer, ReportParts};
pub use scoring::{DeviationScorer, ScoringWeights, StageBaseScores};
pub use types::*;
