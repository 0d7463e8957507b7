// src/index/qdrant.rs
// Qdrant-backed plant record index (similarity search + stage-filtered cohorts)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, Filter, ScrollPointsBuilder, SearchPointsBuilder, Value as QdrantValue,
    value::Kind,
};
use tracing::{debug, info};

use super::PlantIndex;
use crate::analysis::types::{GrowthStage, PeerMatch, SensorVector};
use crate::error::{PlantCareError, Result};

/// Payload keys written by the ingestion job
pub const FIELD_SPECIES: &str = "plant_name";
pub const FIELD_STAGE: &str = "growth_level";
pub const FIELD_IMAGE: &str = "image_name";
pub const FIELD_SENSORS: &str = "sensor_vector";

pub struct QdrantPlantIndex {
    qdrant: Qdrant,
    collection: String,
    vector_name: Option<String>,
}

impl QdrantPlantIndex {
    /// Connect to Qdrant; every request is bounded by `timeout`
    pub fn connect(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        vector_name: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let qdrant = Qdrant::from_url(url)
            .api_key(api_key)
            .timeout(timeout)
            .skip_compatibility_check()
            .build()
            .map_err(|e| PlantCareError::SearchFailed(format!("Failed to connect to Qdrant: {}", e)))?;

        info!("Connected to Qdrant at {} (collection {})", url, collection);
        Ok(Self {
            qdrant,
            collection: collection.to_string(),
            vector_name,
        })
    }

    fn species_condition(species: &str) -> Condition {
        Condition::matches(FIELD_SPECIES, species.to_string())
    }
}

#[async_trait]
impl PlantIndex for QdrantPlantIndex {
    async fn search_similar(
        &self,
        embedding: &[f32],
        species: &str,
        top_k: usize,
    ) -> Result<Vec<PeerMatch>> {
        let limit: u64 = query_limit(top_k)?;
        let mut search = SearchPointsBuilder::new(&self.collection, embedding.to_vec(), limit)
            .filter(Filter::must([Self::species_condition(species)]))
            .with_payload(true);

        if let Some(name) = &self.vector_name {
            search = search.vector_name(name.clone());
        }

        let response = self
            .qdrant
            .search_points(search)
            .await
            .map_err(|e| PlantCareError::SearchFailed(format!("Qdrant search error: {}", e)))?;

        debug!(
            "Qdrant returned {} similar {} records",
            response.result.len(),
            species
        );

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(PeerMatch {
                    sensors: payload_sensors(&point.payload)?,
                    image_ref: payload_str(&point.payload, FIELD_IMAGE)?,
                    score: point.score,
                })
            })
            .collect()
    }

    async fn query_cohort(
        &self,
        species: &str,
        stages: &[GrowthStage],
        limit: usize,
    ) -> Result<Vec<SensorVector>> {
        let labels: Vec<String> = stages.iter().map(|s| s.as_str().to_string()).collect();

        let scroll = ScrollPointsBuilder::new(&self.collection)
            .filter(Filter::must([
                Self::species_condition(species),
                Condition::matches(FIELD_STAGE, labels.clone()),
            ]))
            .limit(query_limit::<u32>(limit)?)
            .with_payload(true)
            .with_vectors(false);

        let response = self
            .qdrant
            .scroll(scroll)
            .await
            .map_err(|e| PlantCareError::SearchFailed(format!("Qdrant scroll error: {}", e)))?;

        debug!(
            "Qdrant cohort {} {:?}: {} records",
            species,
            labels,
            response.result.len()
        );

        response
            .result
            .iter()
            .map(|point| payload_sensors(&point.payload))
            .collect()
    }
}

/// Convert a requested record count to the width Qdrant's API takes
pub fn query_limit<T: TryFrom<usize>>(limit: usize) -> Result<T> {
    if limit == 0 {
        return Err(PlantCareError::Config(
            "Qdrant query limit must be at least 1".to_string(),
        ));
    }
    T::try_from(limit).map_err(|_| {
        PlantCareError::Config(format!("Qdrant query limit {} is out of range", limit))
    })
}

/// Read a required string field from a point payload
pub fn payload_str(payload: &HashMap<String, QdrantValue>, key: &str) -> Result<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Ok(s.clone()),
        _ => Err(PlantCareError::DataIntegrity(format!(
            "Point payload is missing string field '{}'",
            key
        ))),
    }
}

/// Read the numeric sensor list from a point payload
pub fn payload_sensors(payload: &HashMap<String, QdrantValue>) -> Result<SensorVector> {
    let list = match payload.get(FIELD_SENSORS).and_then(|v| v.kind.as_ref()) {
        Some(Kind::ListValue(list)) => list,
        _ => {
            return Err(PlantCareError::DataIntegrity(format!(
                "Point payload is missing list field '{}'",
                FIELD_SENSORS
            )));
        }
    };

    list.values
        .iter()
        .map(|value| match value.kind.as_ref() {
            Some(Kind::DoubleValue(d)) => Ok(*d),
            Some(Kind::IntegerValue(i)) => Ok(*i as f64),
            other => Err(PlantCareError::DataIntegrity(format!(
                "Non-numeric sensor value: {:?}",
                other
            ))),
        })
        .collect()
}
