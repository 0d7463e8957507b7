// src/index/memory.rs
// Brute-force cosine index held in memory (fixtures, tests, offline runs)

use async_trait::async_trait;

use super::{PlantIndex, cosine_similarity};
use crate::analysis::types::{GrowthStage, PeerMatch, PlantRecord, SensorVector};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPlantIndex {
    records: Vec<PlantRecord>,
}

impl InMemoryPlantIndex {
    pub fn new(records: Vec<PlantRecord>) -> Self {
        Self { records }
    }

    pub fn insert(&mut self, record: PlantRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PlantIndex for InMemoryPlantIndex {
    async fn search_similar(
        &self,
        embedding: &[f32],
        species: &str,
        top_k: usize,
    ) -> Result<Vec<PeerMatch>> {
        let mut matches: Vec<PeerMatch> = self
            .records
            .iter()
            .filter(|r| r.species == species)
            .map(|r| PeerMatch {
                sensors: r.sensors.clone(),
                image_ref: r.image_ref.clone(),
                score: cosine_similarity(embedding, &r.embedding),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn query_cohort(
        &self,
        species: &str,
        stages: &[GrowthStage],
        limit: usize,
    ) -> Result<Vec<SensorVector>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.species == species && stages.contains(&r.growth_stage))
            .take(limit)
            .map(|r| r.sensors.clone())
            .collect())
    }
}
