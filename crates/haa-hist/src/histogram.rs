//! Binned 1D histogram with weighted fills and under/overflow tracking.

use serde::Serialize;

/// Bin edges plus optional per-bin labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    edges: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
}

impl Axis {
    /// `n_bins` equal-width bins on `[lo, hi)`.
    pub fn uniform(n_bins: usize, lo: f64, hi: f64) -> Self {
        let n = n_bins.max(1);
        let width = (hi - lo) / n as f64;
        let mut edges: Vec<f64> = (0..n).map(|i| lo + width * i as f64).collect();
        edges.push(hi);
        Self { edges, labels: Vec::new() }
    }

    /// Attach bin labels (one per bin).
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self.labels.resize(self.n_bins(), String::new());
        self
    }

    /// Number of bins (excluding under/overflow).
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Bin edges (length = n_bins + 1).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin labels (empty when unlabeled).
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Lower edge of the first bin.
    pub fn lo(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn hi(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Bin index for `val`, or `None` for underflow/overflow/NaN.
    pub fn find_bin(&self, val: f64) -> Option<usize> {
        if !(val >= self.lo() && val < self.hi()) {
            return None;
        }
        // first edge strictly above val, minus one
        let upper = self.edges.partition_point(|&e| e <= val);
        upper.checked_sub(1).filter(|&b| b < self.n_bins())
    }
}

/// Weighted 1D histogram.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram1D {
    /// Histogram title (ROOT `";x-axis;y-axis"` convention).
    pub title: String,
    /// Binning.
    pub axis: Axis,
    /// Sum of weights per bin.
    pub bin_content: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sumw2: Vec<f64>,
    /// Sum of weights below the first edge.
    pub underflow: f64,
    /// Sum of weights at or above the last edge.
    pub overflow: f64,
    /// Number of fill calls with a non-NaN value, in or out of range.
    pub entries: u64,
}

impl Histogram1D {
    /// Empty histogram with the given binning.
    pub fn new(title: impl Into<String>, axis: Axis) -> Self {
        let n = axis.n_bins();
        Self {
            title: title.into(),
            axis,
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Add `weight` at `val`. NaN values are ignored.
    pub fn fill(&mut self, val: f64, weight: f64) {
        if val.is_nan() {
            return;
        }
        self.entries += 1;
        match self.axis.find_bin(val) {
            Some(b) => {
                self.bin_content[b] += weight;
                self.sumw2[b] += weight * weight;
            }
            None if val < self.axis.lo() => self.underflow += weight,
            None => self.overflow += weight,
        }
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}
