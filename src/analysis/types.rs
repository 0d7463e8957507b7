// src/analysis/types.rs
// Typed records passed between pipeline stages

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{PlantCareError, Result};

/// Sensor readings for one record, aligned with a [`ChannelLayout`]
pub type SensorVector = Vec<f64>;

/// Ordinal health label attached to historical and query records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrowthStage {
    #[serde(rename = "DIE")]
    Die,
    Low,
    Medium,
    High,
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 4] = [
        GrowthStage::Die,
        GrowthStage::Low,
        GrowthStage::Medium,
        GrowthStage::High,
    ];

    /// Label as stored in the index payload
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthStage::Die => "DIE",
            GrowthStage::Low => "Low",
            GrowthStage::Medium => "Medium",
            GrowthStage::High => "High",
        }
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            GrowthStage::Die => 0,
            GrowthStage::Low => 1,
            GrowthStage::Medium => 2,
            GrowthStage::High => 3,
        }
    }

    /// Stages ranked strictly above this one
    pub fn above(&self) -> Vec<GrowthStage> {
        Self::ALL.into_iter().filter(|s| s > self).collect()
    }

    /// Stages ranked strictly below this one
    pub fn below(&self) -> Vec<GrowthStage> {
        Self::ALL.into_iter().filter(|s| s < self).collect()
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GrowthStage {
    type Err = PlantCareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "die" => Ok(GrowthStage::Die),
            "low" => Ok(GrowthStage::Low),
            "medium" => Ok(GrowthStage::Medium),
            "high" => Ok(GrowthStage::High),
            _ => Err(PlantCareError::DataIntegrity(format!(
                "Unknown growth stage: '{}'",
                s
            ))),
        }
    }
}

/// Named environmental sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorChannel {
    AirTemperature,
    AirHumidity,
    Co2,
    Quantum,
    HighSoilTemp,
    HighSoilHumi,
    LowSoilTemp,
    LowSoilHumi,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 8] = [
        SensorChannel::AirTemperature,
        SensorChannel::AirHumidity,
        SensorChannel::Co2,
        SensorChannel::Quantum,
        SensorChannel::HighSoilTemp,
        SensorChannel::HighSoilHumi,
        SensorChannel::LowSoilTemp,
        SensorChannel::LowSoilHumi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorChannel::AirTemperature => "AirTemperature",
            SensorChannel::AirHumidity => "AirHumidity",
            SensorChannel::Co2 => "Co2",
            SensorChannel::Quantum => "Quantum",
            SensorChannel::HighSoilTemp => "HighSoilTemp",
            SensorChannel::HighSoilHumi => "HighSoilHumi",
            SensorChannel::LowSoilTemp => "LowSoilTemp",
            SensorChannel::LowSoilHumi => "LowSoilHumi",
        }
    }

    /// Human-readable label used in prompts and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            SensorChannel::AirTemperature => "air temperature",
            SensorChannel::AirHumidity => "air humidity",
            SensorChannel::Co2 => "CO2",
            SensorChannel::Quantum => "light (quantum flux)",
            SensorChannel::HighSoilTemp => "upper soil temperature",
            SensorChannel::HighSoilHumi => "upper soil humidity",
            SensorChannel::LowSoilTemp => "lower soil temperature",
            SensorChannel::LowSoilHumi => "lower soil humidity",
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SensorChannel {
    type Err = PlantCareError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PlantCareError::Config(format!("Unknown sensor channel: '{}'", s)))
    }
}

/// Ordered channel list describing how stored sensor vectors are laid out.
///
/// Position `i` of every sensor vector is the reading for `channels()[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    channels: Vec<SensorChannel>,
}

impl ChannelLayout {
    pub fn new(channels: Vec<SensorChannel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(PlantCareError::Config(
                "Channel layout must name at least one channel".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for channel in &channels {
            if !seen.insert(*channel) {
                return Err(PlantCareError::Config(format!(
                    "Channel {} appears twice in layout",
                    channel
                )));
            }
        }
        Ok(Self { channels })
    }

    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Fails with `DataIntegrity` when a vector does not match this layout
    pub fn check(&self, vector: &[f64]) -> Result<()> {
        if vector.len() != self.channels.len() {
            return Err(PlantCareError::DataIntegrity(format!(
                "Sensor vector has {} values, layout expects {}",
                vector.len(),
                self.channels.len()
            )));
        }
        Ok(())
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self {
            channels: SensorChannel::ALL.to_vec(),
        }
    }
}

impl FromStr for ChannelLayout {
    type Err = PlantCareError;

    fn from_str(s: &str) -> Result<Self> {
        let channels = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(SensorChannel::from_str)
            .collect::<Result<Vec<_>>>()?;
        Self::new(channels)
    }
}

/// Historical record as stored in the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct PlantRecord {
    pub species: String,
    pub growth_stage: GrowthStage,
    pub sensors: SensorVector,
    pub embedding: Vec<f32>,
    pub image_ref: String,
}

/// One nearest-neighbour hit from a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct PeerMatch {
    pub sensors: SensorVector,
    pub image_ref: String,
    pub score: f32,
}

/// Per-request query derived from the vision model output
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub species: String,
    pub growth_stage: GrowthStage,
    pub embedding: Vec<f32>,
}

/// Output of the vision collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct PlantObservation {
    pub species: String,
    pub growth_stage: GrowthStage,
    pub caption: String,
}

/// Sensor vectors of one species over a set of growth stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cohort {
    pub stages: Vec<GrowthStage>,
    pub vectors: Vec<SensorVector>,
}

impl Cohort {
    pub fn empty(stages: Vec<GrowthStage>) -> Self {
        Self {
            stages,
            vectors: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }
}

/// Cohort means for one channel; `None` means the cohort had no records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorComparison {
    #[serde(rename = "sensorName")]
    pub channel: SensorChannel,
    pub similar_avg: Option<f64>,
    pub better_avg: Option<f64>,
    pub worse_avg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Adequate,
    Deficient,
    Excessive,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Adequate => "adequate",
            MetricStatus::Deficient => "deficient",
            MetricStatus::Excessive => "excessive",
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricScore {
    #[serde(rename = "sensorName")]
    pub channel: SensorChannel,
    pub score: u8,
    pub status: MetricStatus,
}

/// A channel selected for the advice prompt, with its relative deviation
#[derive(Debug, Clone, PartialEq)]
pub struct RankedIssue {
    pub channel: SensorChannel,
    pub current: f64,
    pub ideal: f64,
    pub deviation: f64,
}

impl RankedIssue {
    pub fn is_above_ideal(&self) -> bool {
        self.current > self.ideal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareGuide {
    pub issue: String,
    pub content: String,
}

/// Narrative produced by the advice collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareAdvice {
    pub analysis: String,
    pub keywords: Vec<String>,
    pub care_guide: Vec<CareGuide>,
}

/// Final care report for one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "plantName")]
    pub species: String,
    #[serde(rename = "growthLevel")]
    pub growth_stage: GrowthStage,
    pub overall_score: u8,
    pub metric_scores: Vec<MetricScore>,
    #[serde(rename = "sensorAnalysis")]
    pub sensor_comparisons: Vec<SensorComparison>,
    pub caption: String,
    pub analysis: String,
    pub keywords: Vec<String>,
    pub care_guide: Vec<CareGuide>,
    pub similar_images: Vec<String>,
}
