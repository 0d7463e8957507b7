// src/index/mod.rs
//! Vector index over historical plant records.

pub mod memory;
pub mod qdrant;

pub use memory::InMemoryPlantIndex;
pub use qdrant::QdrantPlantIndex;

use async_trait::async_trait;

use crate::analysis::types::{GrowthStage, PeerMatch, SensorVector};
use crate::error::Result;

/// Read-only access to indexed plant records.
///
/// Implementations report an unreachable index or a failed query as
/// `SearchFailed`, and malformed stored records as `DataIntegrity`.
#[async_trait]
pub trait PlantIndex: Send + Sync {
    /// Nearest neighbours of `embedding` among records of `species`, best match first
    async fn search_similar(
        &self,
        embedding: &[f32],
        species: &str,
        top_k: usize,
    ) -> Result<Vec<PeerMatch>>;

    /// Sensor vectors of up to `limit` records of `species` whose stage is in `stages`
    async fn query_cohort(
        &self,
        species: &str,
        stages: &[GrowthStage],
        limit: usize,
    ) -> Result<Vec<SensorVector>>;
}

/// Calculate cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
