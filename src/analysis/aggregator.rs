// src/analysis/aggregator.rs
// Per-channel cohort means

use crate::analysis::types::{ChannelLayout, SensorComparison, SensorVector};
use crate::error::Result;

/// Computes elementwise means over cohort sensor vectors
#[derive(Debug, Clone)]
pub struct SensorAggregator {
    layout: ChannelLayout,
}

impl SensorAggregator {
    pub fn new(layout: ChannelLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// Mean vector of the cohort, or `None` when the cohort is empty.
    ///
    /// Every vector must match the layout length; a mismatch is a `DataIntegrity` error.
    pub fn average(&self, vectors: &[SensorVector]) -> Result<Option<SensorVector>> {
        if vectors.is_empty() {
            return Ok(None);
        }

        let mut sums = vec![0.0_f64; self.layout.len()];
        for vector in vectors {
            self.layout.check(vector)?;
            for (sum, value) in sums.iter_mut().zip(vector) {
                *sum += value;
            }
        }

        let count = vectors.len() as f64;
        Ok(Some(sums.into_iter().map(|sum| sum / count).collect()))
    }

    /// Zips the three cohort means into one comparison per layout channel.
    ///
    /// Means are rounded to two decimals, matching how the reference reports display them.
    pub fn compare(
        &self,
        similar: Option<&[f64]>,
        better: Option<&[f64]>,
        worse: Option<&[f64]>,
    ) -> Vec<SensorComparison> {
        self.layout
            .channels()
            .iter()
            .enumerate()
            .map(|(i, channel)| SensorComparison {
                channel: *channel,
                similar_avg: similar.and_then(|v| v.get(i)).copied().map(round2),
                better_avg: better.and_then(|v| v.get(i)).copied().map(round2),
                worse_avg: worse.and_then(|v| v.get(i)).copied().map(round2),
            })
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
