// Rolling z-score result for one metric on one tick

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub value: f64,
    pub mean: f64,
    pub stddev: f64,
    /// Signed; 0 when the window is flat.
    pub z_score: f64,
    pub flagged: bool,
}

/// Display-only reading of the z-score sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Spike,
    Drop,
    Flat,
}

impl AnomalyResult {
    pub fn direction(&self) -> Direction {
        if self.z_score > 0.0 {
            Direction::Spike
        } else if self.z_score < 0.0 {
            Direction::Drop
        } else {
            Direction::Flat
        }
    }
}
