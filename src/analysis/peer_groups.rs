// src/analysis/peer_groups.rs
// Better/worse growth-stage cohorts for a query record

use std::sync::Arc;

use tracing::debug;

use crate::analysis::types::{Cohort, GrowthStage};
use crate::error::Result;
use crate::index::PlantIndex;

/// The two cohorts a query is compared against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerGroups {
    pub better: Cohort,
    pub worse: Cohort,
}

/// Queries the index for records of the same species on either side of a growth stage
pub struct PeerGroupSelector {
    index: Arc<dyn PlantIndex>,
}

impl PeerGroupSelector {
    pub fn new(index: Arc<dyn PlantIndex>) -> Self {
        Self { index }
    }

    /// Builds both cohorts concurrently.
    ///
    /// A stage at the top (or bottom) of the ordering has an empty better (or worse)
    /// cohort and the index is not queried for it.
    pub async fn select(
        &self,
        species: &str,
        stage: GrowthStage,
        limit: usize,
    ) -> Result<PeerGroups> {
        let (better, worse) = tokio::try_join!(
            self.cohort(species, stage.above(), limit),
            self.cohort(species, stage.below(), limit),
        )?;

        debug!(
            "Cohorts for {} at {}: {} better, {} worse",
            species,
            stage,
            better.len(),
            worse.len()
        );
        Ok(PeerGroups { better, worse })
    }

    async fn cohort(
        &self,
        species: &str,
        stages: Vec<GrowthStage>,
        limit: usize,
    ) -> Result<Cohort> {
        if stages.is_empty() {
            return Ok(Cohort::empty(stages));
        }
        let vectors = self.index.query_cohort(species, &stages, limit).await?;
        Ok(Cohort { stages, vectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::PlantRecord;
    use crate::index::InMemoryPlantIndex;

    fn record(species: &str, stage: GrowthStage, value: f64) -> PlantRecord {
        PlantRecord {
            species: species.to_string(),
            growth_stage: stage,
            sensors: vec![value],
            embedding: vec![1.0, 0.0],
            image_ref: format!("{}-{}.jpg", species, value),
        }
    }

    fn selector() -> PeerGroupSelector {
        let index = InMemoryPlantIndex::new(vec![
            record("fern", GrowthStage::High, 30.0),
            record("fern", GrowthStage::Medium, 20.0),
            record("fern", GrowthStage::Low, 10.0),
            record("fern", GrowthStage::Die, 5.0),
            record("lily", GrowthStage::High, 99.0),
        ]);
        PeerGroupSelector::new(Arc::new(index))
    }

    #[tokio::test]
    async fn test_partitions_by_stage_and_species() {
        let groups = selector().select("fern", GrowthStage::Medium, 5).await.unwrap();
        assert_eq!(groups.better.vectors, vec![vec![30.0]]);
        assert_eq!(groups.better.stages, vec![GrowthStage::High]);

        let mut worse: Vec<f64> = groups.worse.vectors.iter().map(|v| v[0]).collect();
        worse.sort_by(f64::total_cmp);
        assert_eq!(worse, vec![5.0, 10.0]);
    }

    #[tokio::test]
    async fn test_top_stage_has_no_better_cohort() {
        let groups = selector().select("fern", GrowthStage::High, 5).await.unwrap();
        assert!(groups.better.is_empty());
        assert!(groups.better.stages.is_empty());
        assert_eq!(groups.worse.len(), 3);
    }

    #[tokio::test]
    async fn test_bottom_stage_has_no_worse_cohort() {
        let groups = selector().select("fern", GrowthStage::Die, 5).await.unwrap();
        assert!(groups.worse.is_empty());
        assert_eq!(groups.better.len(), 3);
    }

    #[tokio::test]
    async fn test_limit_caps_cohort() {
        let groups = selector().select("fern", GrowthStage::Die, 2).await.unwrap();
        assert_eq!(groups.better.len(), 2);
    }
}
