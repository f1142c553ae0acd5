//! Histogram book: declared templates, lazily instantiated per category tag.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use haa_core::{Error, HistogramSink, Result};
use serde::Serialize;

use crate::histogram::{Axis, Histogram1D};

/// Collection of tagged histograms.
///
/// Each declared name acts as a template. Filling `(name, tag)` for the
/// first time clones the template; the filled copy is stored under the key
/// `"{tag}_{name}"`. Fills for undeclared names are dropped (one warning per
/// name), so the selection code can fill freely without knowing which
/// histograms a particular run declares.
#[derive(Debug, Default)]
pub struct HistogramBook {
    templates: BTreeMap<String, Histogram1D>,
    filled: BTreeMap<(String, String), Histogram1D>,
    warned: HashSet<String>,
}

#[derive(Serialize)]
struct HistogramRecord<'a> {
    key: String,
    name: &'a str,
    tag: &'a str,
    #[serde(flatten)]
    histogram: &'a Histogram1D,
}

#[derive(Serialize)]
struct BookDocument<'a, M: Serialize> {
    metadata: &'a M,
    histograms: Vec<HistogramRecord<'a>>,
}

impl HistogramBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a histogram template. Names must be unique.
    pub fn declare(&mut self, name: &str, title: &str, axis: Axis) -> Result<()> {
        if self.templates.contains_key(name) {
            return Err(Error::Validation(format!("histogram '{name}' declared twice")));
        }
        self.templates.insert(name.to_string(), Histogram1D::new(title, axis));
        Ok(())
    }

    /// Declared template names.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// The filled histogram for `(name, tag)`, if any fill happened.
    pub fn get(&self, name: &str, tag: &str) -> Option<&Histogram1D> {
        self.filled.get(&(name.to_string(), tag.to_string()))
    }

    /// Number of filled `(name, tag)` histograms.
    pub fn len(&self) -> usize {
        self.filled.len()
    }

    /// True when nothing has been filled yet.
    pub fn is_empty(&self) -> bool {
        self.filled.is_empty()
    }

    /// Persist every filled histogram plus run metadata as pretty JSON.
    pub fn write_json<M: Serialize>(&self, path: &Path, metadata: &M) -> Result<()> {
        let histograms = self
            .filled
            .iter()
            .map(|((name, tag), h)| HistogramRecord {
                key: format!("{tag}_{name}"),
                name,
                tag,
                histogram: h,
            })
            .collect();
        let doc = BookDocument { metadata, histograms };

        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &doc)?;
        w.write_all(b"\n")?;
        w.flush()?;
        tracing::info!(path = %path.display(), histograms = self.filled.len(), "histograms written");
        Ok(())
    }
}

impl HistogramSink for HistogramBook {
    fn fill(&mut self, name: &str, tag: &str, value: f64, weight: f64) {
        let Some(template) = self.templates.get(name) else {
            if self.warned.insert(name.to_string()) {
                tracing::warn!(histogram = name, "fill for undeclared histogram ignored");
            }
            return;
        };
        self.filled
            .entry((name.to_string(), tag.to_string()))
            .or_insert_with(|| template.clone())
            .fill(value, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> HistogramBook {
        let mut b = HistogramBook::new();
        b.declare("njets_raw", ";Jet multiplicity;Events", Axis::uniform(5, 0.0, 5.0)).unwrap();
        b.declare("dR", ";#Delta R;Events", Axis::uniform(100, 0.0, 5.0)).unwrap();
        b
    }

    #[test]
    fn fills_are_split_by_tag() {
        let mut b = book();
        b.fill("njets_raw", "nj", 2.0, 1.0);
        b.fill("njets_raw", "nj", 2.0, -1.0);
        b.fill("njets_raw", "nb", 1.0, 0.5);
        assert_eq!(b.len(), 2);
        let nj = b.get("njets_raw", "nj").unwrap();
        assert_eq!(nj.bin_content[2], 0.0);
        assert_eq!(nj.sumw2[2], 2.0);
        assert_eq!(nj.entries, 2);
        assert_eq!(b.get("njets_raw", "nb").unwrap().bin_content[1], 0.5);
        assert!(b.get("dR", "nj").is_none());
    }

    #[test]
    fn undeclared_fill_is_ignored() {
        let mut b = book();
        b.fill("pileup", "all", 20.0, 1.0);
        b.fill("pileup", "all", 21.0, 1.0);
        assert!(b.is_empty());
    }

    #[test]
    fn duplicate_declaration_rejected() {
        let mut b = book();
        assert!(b.declare("dR", "", Axis::uniform(1, 0.0, 1.0)).is_err());
    }

    #[test]
    fn overflow_sentinel_lands_in_overflow() {
        let mut b = book();
        b.fill("dR", "drmin_b1", 999.0, 1.0);
        let h = b.get("dR", "drmin_b1").unwrap();
        assert_eq!(h.overflow, 1.0);
        assert_eq!(h.integral(), 0.0);
    }

    #[test]
    fn write_json_roundtrip_keys() {
        let mut b = book();
        b.fill("njets_raw", "nj", 3.0, 1.0);
        b.fill("dR", "drmin_b1", 0.3, 1.0);

        let dir = std::env::temp_dir().join(format!("haa_hist_book_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("book.json");
        b.write_json(&path, &serde_json::json!({ "tag": "unit" })).unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["metadata"]["tag"], "unit");
        let keys: Vec<&str> =
            v["histograms"].as_array().unwrap().iter().map(|h| h["key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["drmin_b1_dR", "nj_njets_raw"]);
        assert_eq!(v["histograms"][1]["bin_content"][3], 1.0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
