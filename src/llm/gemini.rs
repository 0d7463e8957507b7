//! Gemini REST client for plant vision, caption embeddings and care advice
//!
//! Uses the generateContent and embedContent endpoints. Model output is decoded
//! into typed structs at this boundary; anything that does not decode is an error
//! of the calling collaborator's kind.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompts::{advice_prompt, vision_prompt};
use super::{AdviceRequest, CareAdvisor, Embedder, VisionAnalyzer};
use crate::analysis::types::{CareAdvice, GrowthStage, PlantObservation};
use crate::error::{PlantCareError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Connection and model settings for [`GeminiClient`]
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model used for both vision and advice
    pub model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    /// Closed set of species names the vision model may answer with
    pub species: Vec<String>,
    pub advice_language: String,
    pub timeout: Duration,
}

pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PlantCareError::Config("GEMINI_API_KEY not set".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlantCareError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method,
            self.config.api_key
        )
    }

    /// POST a body and return the raw response text.
    ///
    /// Transport errors, timeouts and non-2xx statuses are mapped through `kind`.
    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        kind: fn(String) -> PlantCareError,
    ) -> Result<String> {
        let response = self.http.post(url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                kind(format!("Gemini request timed out after {:?}", self.config.timeout))
            } else {
                kind(format!("Gemini request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| kind(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(kind(format!("Gemini API error: {} - {}", status, text)));
        }
        Ok(text)
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        kind: fn(String) -> PlantCareError,
    ) -> Result<String> {
        let url = self.endpoint(&self.config.model, "generateContent");
        let body = self.post(&url, request, kind).await?;
        extract_text(&body).map_err(kind)
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiClient {
    async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
        user_text: &str,
    ) -> Result<PlantObservation> {
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            mime_type
        };

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: vision_prompt(&self.config.species, user_text),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };

        debug!("Sending {} byte {} image to Gemini", image.len(), mime_type);
        let text = self.generate(&request, PlantCareError::AnalysisFailed).await?;
        decode_observation(&text, &self.config.species)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.config.embedding_model),
            content: Content {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            },
            output_dimensionality: self.config.embedding_dim,
        };

        let url = self.endpoint(&self.config.embedding_model, "embedContent");
        let body = self
            .post(&url, &request, PlantCareError::EmbeddingFailed)
            .await?;
        decode_embedding(&body, self.config.embedding_dim)
    }
}

#[async_trait]
impl CareAdvisor for GeminiClient {
    async fn advise(&self, request: &AdviceRequest) -> Result<CareAdvice> {
        let prompt = advice_prompt(request, &self.config.advice_language);
        let api_request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text { text: prompt }],
            }],
            generation_config: None,
        };

        let text = self
            .generate(&api_request, PlantCareError::AdviceFailed)
            .await?;
        decode_advice(&text)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
    #[serde(rename = "outputDimensionality")]
    output_dimensionality: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObservation {
    plant_name: String,
    growth_level: String,
    caption: String,
}

// ============================================================================
// Decoding
// ============================================================================

/// Text of the first candidate, with all text parts concatenated
fn extract_text(body: &str) -> std::result::Result<String, String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| format!("Unparseable Gemini response: {}", e))?;

    if let Some(error) = response.error {
        return Err(format!("Gemini error: {}", error.message));
    }

    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err("Gemini response contained no text".to_string());
    }
    Ok(text)
}

/// Remove a surrounding Markdown code fence (```json ... ```)
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Decode the vision model's JSON into a typed observation
pub fn decode_observation(text: &str, species: &[String]) -> Result<PlantObservation> {
    let raw: RawObservation = serde_json::from_str(strip_code_fences(text)).map_err(|e| {
        PlantCareError::AnalysisFailed(format!("Malformed vision output: {}", e))
    })?;

    let name = raw.plant_name.trim();
    if !species.iter().any(|s| s == name) {
        return Err(PlantCareError::AnalysisFailed(format!(
            "Species '{}' is not one of {:?}",
            name, species
        )));
    }

    let growth_stage: GrowthStage = raw
        .growth_level
        .parse()
        .map_err(|e: PlantCareError| PlantCareError::AnalysisFailed(e.to_string()))?;

    if raw.caption.trim().is_empty() {
        return Err(PlantCareError::AnalysisFailed(
            "Vision output has an empty caption".to_string(),
        ));
    }

    Ok(PlantObservation {
        species: name.to_string(),
        growth_stage,
        caption: raw.caption.trim().to_string(),
    })
}

/// Decode the advice model's JSON
pub fn decode_advice(text: &str) -> Result<CareAdvice> {
    serde_json::from_str(strip_code_fences(text)).map_err(|e| {
        warn!("Advice output did not decode: {}", e);
        PlantCareError::AdviceFailed(format!("Malformed advice output: {}", e))
    })
}

/// Decode an embedContent response and check its dimension
pub fn decode_embedding(body: &str, expected_dim: usize) -> Result<Vec<f32>> {
    let response: EmbedResponse = serde_json::from_str(body).map_err(|e| {
        PlantCareError::EmbeddingFailed(format!("Unparseable embedding response: {}", e))
    })?;

    if let Some(error) = response.error {
        return Err(PlantCareError::EmbeddingFailed(format!(
            "Gemini API error: {}",
            error.message
        )));
    }

    let values = response
        .embedding
        .map(|e| e.values)
        .ok_or_else(|| PlantCareError::EmbeddingFailed("Invalid embedding response".to_string()))?;

    if values.len() != expected_dim {
        return Err(PlantCareError::EmbeddingFailed(format!(
            "Embedding has {} dimensions, expected {}",
            values.len(),
            expected_dim
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species() -> Vec<String> {
        vec!["fern".to_string(), "peace lily".to_string()]
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_decode_observation() {
        let text = r#"```json
{"plantName": "fern", "growthLevel": "Medium", "caption": "Fronds slightly pale"}
```"#;
        let obs = decode_observation(text, &species()).unwrap();
        assert_eq!(obs.species, "fern");
        assert_eq!(obs.growth_stage, GrowthStage::Medium);
        assert_eq!(obs.caption, "Fronds slightly pale");
    }

    #[test]
    fn test_decode_observation_rejects_unknown_species() {
        let text = r#"{"plantName": "cactus", "growthLevel": "High", "caption": "spiky"}"#;
        assert!(matches!(
            decode_observation(text, &species()),
            Err(PlantCareError::AnalysisFailed(_))
        ));
    }

    #[test]
    fn test_decode_observation_rejects_unknown_stage_and_missing_fields() {
        let text = r#"{"plantName": "fern", "growthLevel": "Thriving", "caption": "ok"}"#;
        assert!(matches!(
            decode_observation(text, &species()),
            Err(PlantCareError::AnalysisFailed(_))
        ));

        let text = r#"{"plantName": "fern", "caption": "ok"}"#;
        assert!(matches!(
            decode_observation(text, &species()),
            Err(PlantCareError::AnalysisFailed(_))
        ));
    }

    #[test]
    fn test_decode_advice() {
        let text = r#"{"analysis": "Too dry.", "keywords": ["dry"], "careGuide": [{"issue": "Water", "content": "Water weekly."}]}"#;
        let advice = decode_advice(text).unwrap();
        assert_eq!(advice.keywords, vec!["dry"]);
        assert_eq!(advice.care_guide[0].issue, "Water");

        assert!(matches!(
            decode_advice("not json"),
            Err(PlantCareError::AdviceFailed(_))
        ));
    }

    #[test]
    fn test_extract_text_joins_parts_and_reports_errors() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "{\"a\":1}");

        let body = r#"{"error": {"message": "API key not valid"}}"#;
        assert!(extract_text(body).unwrap_err().contains("API key not valid"));

        assert!(extract_text(r#"{"candidates": []}"#).is_err());
    }

    #[test]
    fn test_decode_embedding_checks_dimension() {
        let body = r#"{"embedding": {"values": [0.1, 0.2, 0.3]}}"#;
        assert_eq!(decode_embedding(body, 3).unwrap().len(), 3);
        assert!(matches!(
            decode_embedding(body, 4),
            Err(PlantCareError::EmbeddingFailed(_))
        ));
    }

    #[test]
    fn test_vision_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/png".to_string(),
                        data: BASE64.encode([1u8, 2, 3]),
                    },
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][0]["inline_data"]["data"], "AQID");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }
}
