//! `haa4b run` / `haa4b validate`.

use anyhow::{Context, Result};
use haa_core::EventSource;
use haa_select::{
    Analysis, BTagCalibration, ConstantCalibration, CsvCalibration, ObjectSelector, PileupWeights,
    RunSummary, WorkingPoint, book_histograms, resolve_range,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::listing::EventListWriter;
use crate::reader::JsonLinesSource;

/// Metadata stored next to the histograms.
#[derive(Debug, Serialize)]
struct OutputMetadata<'a> {
    tag: &'a str,
    input: String,
    is_mc: bool,
    xsec: f64,
    mctruthmode: i32,
    btag_calibration: String,
    pileup_weights: Option<String>,
    summary: &'a RunSummary,
}

fn load_calibration(cfg: &RunConfig) -> Result<(Box<dyn BTagCalibration>, String)> {
    match &cfg.btag_calibration {
        Some(path) => {
            let calib = CsvCalibration::open(path, WorkingPoint::Loose)
                .with_context(|| format!("failed to load b-tag calibration {}", path.display()))?;
            Ok((Box::new(calib), path.display().to_string()))
        }
        None => Ok((Box::new(ConstantCalibration::default()), "constant".to_string())),
    }
}

fn load_pileup(cfg: &RunConfig) -> Result<Option<PileupWeights>> {
    match (&cfg.pileup_weights, cfg.is_mc) {
        (Some(path), true) => {
            let w = PileupWeights::from_path(path)
                .with_context(|| format!("failed to load pile-up weights {}", path.display()))?;
            Ok(Some(w))
        }
        (Some(_), false) => {
            tracing::warn!("pileup_weights given for data; not applied");
            Ok(None)
        }
        (None, _) => Ok(None),
    }
}

fn open_source(input: &Path) -> Result<JsonLinesSource> {
    JsonLinesSource::open(input).with_context(|| format!("failed to open input {}", input.display()))
}

/// Listing is written here and renamed once the run succeeds.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn discard_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial listing");
    }
}

pub fn cmd_run(mut cfg: RunConfig, start: Option<i64>, end: Option<i64>) -> Result<()> {
    if let Some(s) = start {
        cfg.ev_start = s;
    }
    if let Some(e) = end {
        cfg.ev_end = e;
    }
    tracing::info!(input = %cfg.input.display(), tag = %cfg.tag, mc = cfg.is_mc, "run start");

    let mut source = open_source(&cfg.input)?;
    let range = resolve_range(source.total_entries(), cfg.ev_start, cfg.ev_end)?;
    let (calibration, calibration_desc) = load_calibration(&cfg)?;

    let mut analysis = Analysis::new(ObjectSelector::new(calibration, cfg.is_mc));
    if let Some(w) = load_pileup(&cfg)? {
        analysis = analysis.with_pileup_weights(w);
    }

    std::fs::create_dir_all(&cfg.outdir)
        .with_context(|| format!("failed to create {}", cfg.outdir.display()))?;
    let listing_path = cfg.listing_path();
    let partial = partial_path(&listing_path);
    let mut listing = EventListWriter::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let mut book = book_histograms()?;

    let summary = match analysis.run(&mut source, range, &mut book, &mut listing) {
        Ok(s) => s,
        Err(e) => {
            drop(listing);
            discard_partial(&partial);
            return Err(e.into());
        }
    };
    let events = listing.written();
    listing.finish()?;

    let metadata = OutputMetadata {
        tag: &cfg.tag,
        input: cfg.input.display().to_string(),
        is_mc: cfg.is_mc,
        xsec: cfg.xsec,
        mctruthmode: cfg.mctruthmode,
        btag_calibration: calibration_desc,
        pileup_weights: cfg.pileup_weights.as_ref().map(|p| p.display().to_string()),
        summary: &summary,
    };
    let hist_path = cfg.histogram_path();
    if let Err(e) = book.write_json(&hist_path, &metadata) {
        discard_partial(&partial);
        return Err(e).with_context(|| format!("failed to write {}", hist_path.display()));
    }
    std::fs::rename(&partial, &listing_path)
        .with_context(|| format!("failed to move listing to {}", listing_path.display()))?;
    tracing::info!(path = %listing_path.display(), events, "listing written");

    let out = serde_json::json!({
        "histograms": hist_path,
        "listing": listing_path,
        "summary": summary,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn cmd_validate(cfg: RunConfig) -> Result<()> {
    let mut source = open_source(&cfg.input)?;
    let range = resolve_range(source.total_entries(), cfg.ev_start, cfg.ev_end)?;
    for index in range.clone() {
        source.get_entry(index).with_context(|| format!("entry {index}"))?;
    }
    let (_, calibration_desc) = load_calibration(&cfg)?;
    let pileup = load_pileup(&cfg)?;

    let out = serde_json::json!({
        "input": cfg.input,
        "entries": source.total_entries(),
        "range": [range.start, range.end],
        "btag_calibration": calibration_desc,
        "pileup_weights": pileup.is_some(),
        "histograms": cfg.histogram_path(),
        "listing": cfg.listing_path(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
