// src/config/mod.rs
// Load all values from the environment (.env supported), with defaults

use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::Level;

use crate::analysis::pipeline::AnalysisConfig;
use crate::analysis::scoring::{ScoringWeights, StageBaseScores};
use crate::analysis::types::ChannelLayout;
use crate::error::{PlantCareError, Result};
use crate::llm::gemini::{DEFAULT_BASE_URL, GeminiConfig};

pub const DEFAULT_SPECIES: &str = "보스턴고사리,스파티필럼";

#[derive(Debug, Clone)]
pub struct PlantCareConfig {
    // ── Gemini
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub gemini_embedding_model: String,
    pub embedding_dim: usize,

    // ── Qdrant
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub qdrant_vector_name: Option<String>,

    // ── Database
    pub database_url: String,

    // ── Analysis
    pub species: Vec<String>,
    pub sensor_channels: String,
    pub similar_top_k: usize,
    pub cohort_limit: usize,
    pub similar_images: usize,
    pub deviation_penalty: f64,
    pub stage_blend: f64,
    pub adequate_threshold: u8,
    pub top_issues: usize,
    pub request_timeout: u64,
    pub advice_language: String,

    // ── Logging
    pub log_level: String,
}

/// Parse `key` from `lookup`, falling back to `default` when unset or unparseable.
/// Trailing `# comments` and whitespace are ignored.
fn env_var_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        None => default,
    }
}

/// Optional string: unset and blank both mean `None`
fn env_var_opt<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PlantCareConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let species_raw: String = env_var_or(&lookup, "PLANTCARE_SPECIES", DEFAULT_SPECIES.to_string());
        let species = species_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            gemini_api_key: env_var_or(&lookup, "GEMINI_API_KEY", String::new()),
            gemini_base_url: env_var_or(&lookup, "GEMINI_BASE_URL", DEFAULT_BASE_URL.to_string()),
            gemini_model: env_var_or(&lookup, "GEMINI_MODEL", "gemini-2.5-flash".to_string()),
            gemini_embedding_model: env_var_or(&lookup, "GEMINI_EMBEDDING_MODEL", "gemini-embedding-001".to_string()),
            embedding_dim: env_var_or(&lookup, "PLANTCARE_EMBEDDING_DIM", 768),
            qdrant_url: env_var_or(&lookup, "QDRANT_URL", "http://localhost:6334".to_string()),
            qdrant_api_key: env_var_opt(&lookup, "QDRANT_API_KEY"),
            qdrant_collection: env_var_or(&lookup, "QDRANT_COLLECTION", "plant_data".to_string()),
            qdrant_vector_name: env_var_opt(&lookup, "QDRANT_VECTOR_NAME"),
            database_url: env_var_or(&lookup, "DATABASE_URL", "sqlite:./plantcare.db".to_string()),
            species,
            sensor_channels: env_var_or(&lookup, "PLANTCARE_SENSOR_CHANNELS", String::new()),
            similar_top_k: env_var_or(&lookup, "PLANTCARE_SIMILAR_TOP_K", 5),
            cohort_limit: env_var_or(&lookup, "PLANTCARE_COHORT_LIMIT", 5),
            similar_images: env_var_or(&lookup, "PLANTCARE_SIMILAR_IMAGES", 3),
            deviation_penalty: env_var_or(&lookup, "PLANTCARE_DEVIATION_PENALTY", 1.5),
            stage_blend: env_var_or(&lookup, "PLANTCARE_STAGE_BLEND", 0.7),
            adequate_threshold: env_var_or(&lookup, "PLANTCARE_ADEQUATE_THRESHOLD", 80),
            top_issues: env_var_or(&lookup, "PLANTCARE_TOP_ISSUES", 3),
            request_timeout: env_var_or(&lookup, "PLANTCARE_REQUEST_TIMEOUT", 60),
            advice_language: env_var_or(&lookup, "PLANTCARE_ADVICE_LANGUAGE", "Korean".to_string()),
            log_level: env_var_or(&lookup, "PLANTCARE_LOG_LEVEL", "info".to_string()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Channel layout; an empty setting means every known channel in canonical order
    pub fn channel_layout(&self) -> Result<ChannelLayout> {
        if self.sensor_channels.trim().is_empty() {
            Ok(ChannelLayout::default())
        } else {
            self.sensor_channels.parse()
        }
    }

    pub fn scoring_weights(&self) -> Result<ScoringWeights> {
        if !self.deviation_penalty.is_finite() || self.deviation_penalty < 0.0 {
            return Err(PlantCareError::Config(format!(
                "PLANTCARE_DEVIATION_PENALTY must be a non-negative number, got {}",
                self.deviation_penalty
            )));
        }
        if !(0.0..=1.0).contains(&self.stage_blend) {
            return Err(PlantCareError::Config(format!(
                "PLANTCARE_STAGE_BLEND must be within [0, 1], got {}",
                self.stage_blend
            )));
        }
        if self.adequate_threshold > 100 {
            return Err(PlantCareError::Config(format!(
                "PLANTCARE_ADEQUATE_THRESHOLD must be within [0, 100], got {}",
                self.adequate_threshold
            )));
        }

        Ok(ScoringWeights {
            deviation_penalty: self.deviation_penalty,
            stage_blend: self.stage_blend,
            adequate_threshold: self.adequate_threshold,
            top_issue_count: self.top_issues,
            base_scores: StageBaseScores::default(),
        })
    }

    pub fn to_analysis_config(&self) -> Result<AnalysisConfig> {
        if self.similar_top_k == 0 {
            return Err(PlantCareError::Config(
                "PLANTCARE_SIMILAR_TOP_K must be at least 1".to_string(),
            ));
        }
        if self.cohort_limit == 0 {
            return Err(PlantCareError::Config(
                "PLANTCARE_COHORT_LIMIT must be at least 1".to_string(),
            ));
        }
        Ok(AnalysisConfig {
            layout: self.channel_layout()?,
            weights: self.scoring_weights()?,
            similar_top_k: self.similar_top_k,
            cohort_limit: self.cohort_limit,
            similar_image_count: self.similar_images,
            call_timeout: self.request_timeout(),
        })
    }

    pub fn to_gemini_config(&self) -> Result<GeminiConfig> {
        if self.species.is_empty() {
            return Err(PlantCareError::Config(
                "PLANTCARE_SPECIES must name at least one species".to_string(),
            ));
        }
        Ok(GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_base_url.clone(),
            model: self.gemini_model.clone(),
            embedding_model: self.gemini_embedding_model.clone(),
            embedding_dim: self.embedding_dim,
            species: self.species.clone(),
            advice_language: self.advice_language.clone(),
            timeout: self.request_timeout(),
        })
    }

    pub fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

pub static CONFIG: Lazy<PlantCareConfig> = Lazy::new(PlantCareConfig::from_env);
