//! Pile-up reweighting from a 1D weight histogram.

use std::fs;
use std::path::Path;

use haa_core::{Error, Result};
use serde::Deserialize;

/// Per-bin weights indexed by the true number of pile-up interactions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct PileupWeights {
    bin_edges: Vec<f64>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawWeights {
    bin_edges: Vec<f64>,
    values: Vec<f64>,
}

impl TryFrom<RawWeights> for PileupWeights {
    type Error = Error;

    fn try_from(raw: RawWeights) -> Result<Self> {
        Self::new(raw.bin_edges, raw.values)
    }
}

impl PileupWeights {
    /// Build from `n + 1` increasing edges and `n` values.
    pub fn new(bin_edges: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() || bin_edges.len() != values.len() + 1 {
            return Err(Error::Validation(format!(
                "pile-up weights need n+1 edges for n values, got {} edges and {} values",
                bin_edges.len(),
                values.len()
            )));
        }
        if bin_edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::Validation("pile-up bin edges must be strictly increasing".into()));
        }
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::Validation("pile-up weights must be finite and non-negative".into()));
        }
        Ok(Self { bin_edges, values })
    }

    /// Load the `{"bin_edges": [...], "values": [...]}` JSON layout.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let weights: Self = serde_json::from_str(&text)?;
        tracing::info!(path = %path.display(), bins = weights.values.len(), "loaded pile-up weights");
        Ok(weights)
    }

    /// Weight for `n_true`; values outside the range take the nearest edge bin.
    pub fn weight(&self, n_true: f64) -> f64 {
        if n_true.is_nan() {
            return 1.0;
        }
        let last = self.values.len() - 1;
        let bin = self.bin_edges.partition_point(|e| *e <= n_true).saturating_sub(1).min(last);
        self.values[bin]
    }
}
