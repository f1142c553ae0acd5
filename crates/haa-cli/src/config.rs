//! Run configuration.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// JSON-Lines event file.
    pub input: PathBuf,
    /// Output directory (created if missing).
    pub outdir: PathBuf,

    /// Input is simulation.
    #[serde(default)]
    pub is_mc: bool,

    /// Dataset tag, carried into the output metadata.
    #[serde(default)]
    pub tag: String,

    /// Cross section [pb], carried into the output metadata.
    #[serde(default = "default_xsec")]
    pub xsec: f64,

    /// Truth-filter mode; non-zero values suffix the output names with `_filt<mode>`.
    #[serde(default)]
    pub mctruthmode: i32,

    #[serde(default)]
    pub ev_start: i64,
    /// Negative means all entries.
    #[serde(default = "default_ev_end")]
    pub ev_end: i64,

    /// BTV-format CSV scale-factor table. Flat per-flavour factors when absent.
    #[serde(default)]
    pub btag_calibration: Option<PathBuf>,

    /// JSON pile-up weight histogram (`bin_edges`, `values`), simulation only.
    #[serde(default)]
    pub pileup_weights: Option<PathBuf>,

    #[serde(default)]
    pub verbose: bool,
}

fn default_xsec() -> f64 {
    1.0
}

fn default_ev_end() -> i64 {
    -1
}

pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let mut cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    cfg.resolve_relative_to(path.parent().unwrap_or(Path::new(".")));
    cfg.validate()?;
    Ok(cfg)
}

impl RunConfig {
    /// Relative paths in a config file are taken relative to that file.
    fn resolve_relative_to(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.input);
        fix(&mut self.outdir);
        if let Some(p) = self.btag_calibration.as_mut() {
            fix(p);
        }
        if let Some(p) = self.pileup_weights.as_mut() {
            fix(p);
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.xsec.is_finite() || self.xsec < 0.0 {
            bail!("xsec must be finite and non-negative, got {}", self.xsec);
        }
        if self.ev_start < 0 {
            bail!("ev_start must be non-negative, got {}", self.ev_start);
        }
        Ok(())
    }

    /// Output base name: input stem plus the truth-filter suffix.
    pub fn output_base(&self) -> String {
        let stem = self.input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
        if self.mctruthmode != 0 {
            format!("{stem}_filt{}", self.mctruthmode)
        } else {
            stem.to_string()
        }
    }

    pub fn histogram_path(&self) -> PathBuf {
        self.outdir.join(format!("{}.json", self.output_base()))
    }

    pub fn listing_path(&self) -> PathBuf {
        self.outdir.join(format!("{}_FinalList.txt", self.output_base()))
    }
}
