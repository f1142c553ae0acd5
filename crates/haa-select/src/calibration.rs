//! Scale-factor tables in the BTV CSV layout.
//!
//! ```text
//! CSVv2;OperatingPoint, measurementType, sysType, jetFlavor, etaMin, etaMax, ptMin, ptMax, discrMin, discrMax, formula
//! 0, comb, central, 0, 0, 2.4, 20, 30, 0, 1, "0.887973*((1.+(0.0523821*x))/(1.+(0.0460876*x)))"
//! ```
//!
//! Only rows of one operating point are kept, with the measurement type
//! chosen per flavour (`comb` for b and c jets, `incl` for light jets).
//! Lookups clamp pt into the tabulated range; out-of-range systematic
//! variants get their deviation from the central value doubled.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use haa_core::{Error, Result};
use serde::Deserialize;

use crate::btag::{BTagCalibration, JetFlavor, Variation, WorkingPoint};
use crate::formula::Formula;

const PT_EDGE_OFFSET: f64 = 1e-4;

/// Columns before the formula.
const FIXED_COLUMNS: usize = 10;

#[derive(Debug, Deserialize)]
struct CsvRow {
    op: u8,
    measurement: String,
    sys: String,
    flavor: u8,
    eta_min: f64,
    eta_max: f64,
    pt_min: f64,
    pt_max: f64,
    _discr_min: f64,
    _discr_max: f64,
}

#[derive(Debug, Clone)]
struct Row {
    eta_min: f64,
    eta_max: f64,
    pt_min: f64,
    pt_max: f64,
    formula: Formula,
}

impl Row {
    fn covers_eta(&self, eta: f64) -> bool {
        self.eta_min <= eta && eta < self.eta_max
    }
}

#[derive(Debug, Default, Clone)]
struct RowSet {
    rows: Vec<Row>,
    abs_eta: bool,
}

impl RowSet {
    fn finish(&mut self) {
        self.abs_eta = self.rows.iter().all(|r| r.eta_min >= 0.0);
    }

    fn eta_key(&self, eta: f64) -> f64 {
        if self.abs_eta { eta.abs() } else { eta }
    }

    fn pt_bounds(&self, eta: f64) -> Option<(f64, f64)> {
        self.rows.iter().filter(|r| r.covers_eta(eta)).fold(None, |acc, r| match acc {
            None => Some((r.pt_min, r.pt_max)),
            Some((lo, hi)) => Some((lo.min(r.pt_min), hi.max(r.pt_max))),
        })
    }

    fn eval(&self, eta: f64, pt: f64) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.covers_eta(eta) && r.pt_min < pt && pt <= r.pt_max)
            .map(|r| r.formula.eval(pt))
    }
}

/// Scale factors loaded from a BTV-format CSV table.
#[derive(Debug, Clone)]
pub struct CsvCalibration {
    working_point: WorkingPoint,
    sets: HashMap<(JetFlavor, Variation), RowSet>,
}

/// Measurement type used for each flavour.
pub fn measurement_for(flavor: JetFlavor) -> &'static str {
    match flavor {
        JetFlavor::B | JetFlavor::C => "comb",
        JetFlavor::Udsg => "incl",
    }
}

fn parse_variation(s: &str) -> Option<Variation> {
    match s {
        "central" => Some(Variation::Central),
        "up" => Some(Variation::Up),
        "down" => Some(Variation::Down),
        _ => None,
    }
}

fn parse_flavor(code: u8, line_no: u64) -> Result<JetFlavor> {
    match code {
        0 => Ok(JetFlavor::B),
        1 => Ok(JetFlavor::C),
        2 => Ok(JetFlavor::Udsg),
        other => Err(Error::Calibration(format!("line {line_no}: invalid jetFlavor '{other}'"))),
    }
}

/// Formula column, rejoined when unquoted commas split it.
fn formula_text(record: &StringRecord) -> String {
    let parts: Vec<&str> = record.iter().skip(FIXED_COLUMNS).collect();
    parts.join(",").trim_matches('"').to_string()
}

impl CsvCalibration {
    /// Load the rows of `working_point` from a CSV file.
    pub fn open(path: &Path, working_point: WorkingPoint) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Calibration(format!("cannot open calibration '{}': {e}", path.display()))
        })?;
        let cal = Self::from_reader(file, working_point)?;
        tracing::info!(
            path = %path.display(),
            working_point = ?working_point,
            rows = cal.n_rows(),
            "b-tag calibration loaded"
        );
        Ok(cal)
    }

    /// Load from any reader.
    pub fn from_reader<R: Read>(reader: R, working_point: WorkingPoint) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);
        let mut sets: HashMap<(JetFlavor, Variation), RowSet> = HashMap::new();

        for record in rdr.records() {
            let record =
                record.map_err(|e| Error::Calibration(format!("calibration CSV: {e}")))?;
            let line_no = record.position().map_or(0, |p| p.line());
            // header carries "<tagger>;" before the column names
            if record.iter().all(str::is_empty) || record.get(0).is_some_and(|f| f.contains(';')) {
                continue;
            }
            if record.len() <= FIXED_COLUMNS {
                return Err(Error::Calibration(format!(
                    "line {line_no}: expected 11 columns, got {}",
                    record.len()
                )));
            }

            let head: StringRecord = record.iter().take(FIXED_COLUMNS).collect();
            let row: CsvRow = head
                .deserialize(None)
                .map_err(|e| Error::Calibration(format!("line {line_no}: {e}")))?;
            if row.op != working_point.table_index() {
                continue;
            }
            let flavor = parse_flavor(row.flavor, line_no)?;
            if row.measurement != measurement_for(flavor) {
                continue;
            }
            // jes/lf/hf... shapes are not used
            let Some(variation) = parse_variation(&row.sys) else {
                continue;
            };

            let formula = Formula::compile(&formula_text(&record))
                .map_err(|e| Error::Calibration(format!("line {line_no}: {e}")))?;

            sets.entry((flavor, variation)).or_default().rows.push(Row {
                eta_min: row.eta_min,
                eta_max: row.eta_max,
                pt_min: row.pt_min,
                pt_max: row.pt_max,
                formula,
            });
        }

        sets.values_mut().for_each(RowSet::finish);

        for flavor in [JetFlavor::B, JetFlavor::C, JetFlavor::Udsg] {
            if !sets.contains_key(&(flavor, Variation::Central)) {
                tracing::warn!(
                    flavor = ?flavor,
                    working_point = ?working_point,
                    measurement = measurement_for(flavor),
                    "no central scale factors in calibration; jets of this flavour get SF = 0"
                );
            }
        }

        Ok(Self { working_point, sets })
    }

    /// Total number of retained rows.
    pub fn n_rows(&self) -> usize {
        self.sets.values().map(|s| s.rows.len()).sum()
    }

    fn raw(&self, flavor: JetFlavor, variation: Variation, eta: f64, pt: f64) -> Option<f64> {
        let set = self.sets.get(&(flavor, variation))?;
        set.eval(set.eta_key(eta), pt)
    }
}

impl BTagCalibration for CsvCalibration {
    fn evaluate(
        &self,
        working_point: WorkingPoint,
        variation: Variation,
        flavor: JetFlavor,
        eta: f64,
        pt: f64,
    ) -> f64 {
        if working_point != self.working_point {
            tracing::trace!(requested = ?working_point, loaded = ?self.working_point, "working point not loaded");
            return 0.0;
        }
        let Some(central) = self.sets.get(&(flavor, Variation::Central)) else {
            return 0.0;
        };
        let eta_key = central.eta_key(eta);
        let Some((lo, hi)) = central.pt_bounds(eta_key) else {
            return 0.0;
        };

        let (pt_eval, out_of_bounds) = if pt <= lo {
            (lo + PT_EDGE_OFFSET, true)
        } else if pt > hi {
            (hi - PT_EDGE_OFFSET, true)
        } else {
            (pt, false)
        };

        let sf = self.raw(flavor, Variation::Central, eta, pt_eval).unwrap_or(0.0);
        if variation == Variation::Central {
            return sf;
        }
        let sf_var = self.raw(flavor, variation, eta, pt_eval).unwrap_or(0.0);
        if out_of_bounds { sf + 2.0 * (sf_var - sf) } else { sf_var }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: &str = r#"CSVv2;OperatingPoint, measurementType, sysType, jetFlavor, etaMin, etaMax, ptMin, ptMax, discrMin, discrMax, formula
0, comb, central, 0, 0, 2.4, 20, 100, 0, 1, "0.9"
0, comb, central, 0, 0, 2.4, 100, 1000, 0, 1, "0.8+0.0001*x"
0, comb, up, 0, 0, 2.4, 20, 100, 0, 1, "0.95"
0, comb, up, 0, 0, 2.4, 100, 1000, 0, 1, "0.85+0.0001*x"
0, comb, down, 0, 0, 2.4, 20, 1000, 0, 1, "0.85"
0, comb, up_jes, 0, 0, 2.4, 20, 1000, 0, 1, "2.0"
0, mujets, central, 0, 0, 2.4, 20, 1000, 0, 1, "5.0"
0, comb, central, 1, 0, 2.4, 20, 1000, 0, 1, "0.91"
0, incl, central, 2, 0, 2.4, 20, 1000, 0, 1, "1.05*max(1, x/x)"
1, comb, central, 0, 0, 2.4, 20, 1000, 0, 1, "0.5"
"#;

    fn load() -> CsvCalibration {
        CsvCalibration::from_reader(TABLE.as_bytes(), WorkingPoint::Loose).unwrap()
    }

    fn central(cal: &CsvCalibration, flavor: JetFlavor, eta: f64, pt: f64) -> f64 {
        cal.evaluate(WorkingPoint::Loose, Variation::Central, flavor, eta, pt)
    }

    #[test]
    fn keeps_only_requested_rows() {
        let cal = load();
        // b: 2 central + 2 up + 1 down, c: 1, udsg: 1
        assert_eq!(cal.n_rows(), 7);
    }

    #[test]
    fn in_range_lookup_uses_abs_eta() {
        let cal = load();
        assert_relative_eq!(central(&cal, JetFlavor::B, -1.2, 50.0), 0.9);
        assert_relative_eq!(central(&cal, JetFlavor::B, 1.2, 200.0), 0.82);
        assert_relative_eq!(central(&cal, JetFlavor::C, 0.3, 60.0), 0.91);
        assert_relative_eq!(central(&cal, JetFlavor::Udsg, 2.0, 60.0), 1.05);
    }

    #[test]
    fn pt_clamped_to_table_range() {
        let cal = load();
        assert_relative_eq!(central(&cal, JetFlavor::B, 0.5, 5.0), 0.9);
        assert_relative_eq!(central(&cal, JetFlavor::B, 0.5, 5000.0), 0.8 + 0.0001 * (1000.0 - 1e-4));
    }

    #[test]
    fn out_of_range_variation_doubled() {
        let cal = load();
        let up_in = cal.evaluate(WorkingPoint::Loose, Variation::Up, JetFlavor::B, 0.5, 50.0);
        assert_relative_eq!(up_in, 0.95);
        let up_out = cal.evaluate(WorkingPoint::Loose, Variation::Up, JetFlavor::B, 0.5, 10.0);
        assert_relative_eq!(up_out, 0.9 + 2.0 * 0.05, epsilon = 1e-12);
        let down_out = cal.evaluate(WorkingPoint::Loose, Variation::Down, JetFlavor::B, 0.5, 10.0);
        assert_relative_eq!(down_out, 0.9 - 2.0 * 0.05, epsilon = 1e-12);
    }

    #[test]
    fn missing_coverage_gives_zero() {
        let cal = load();
        assert_eq!(central(&cal, JetFlavor::B, 2.6, 50.0), 0.0);
        assert_eq!(cal.evaluate(WorkingPoint::Medium, Variation::Central, JetFlavor::B, 0.5, 50.0), 0.0);
        assert_eq!(cal.evaluate(WorkingPoint::Loose, Variation::Up, JetFlavor::C, 0.5, 50.0), 0.0);
    }

    #[test]
    fn malformed_rows_rejected() {
        let short = "0, comb, central, 0, 0, 2.4\n";
        assert!(CsvCalibration::from_reader(short.as_bytes(), WorkingPoint::Loose).is_err());
        let bad_formula = "0, comb, central, 0, 0, 2.4, 20, 30, 0, 1, \"0.9*y\"\n";
        assert!(CsvCalibration::from_reader(bad_formula.as_bytes(), WorkingPoint::Loose).is_err());
        let bad_flavor = "0, comb, central, 7, 0, 2.4, 20, 30, 0, 1, \"0.9\"\n";
        assert!(CsvCalibration::from_reader(bad_flavor.as_bytes(), WorkingPoint::Loose).is_err());
    }

    #[test]
    fn formula_with_commas_survives_split() {
        let cal = load();
        // "1.05*max(1, x/x)" contains a comma inside the formula column
        assert_relative_eq!(central(&cal, JetFlavor::Udsg, 0.1, 500.0), 1.05);

        let tight = "0,comb,central,0,0,2.4,20,1000,0,1,\"max(0.5, min(0.9, x))\"\n";
        let cal = CsvCalibration::from_reader(tight.as_bytes(), WorkingPoint::Loose).unwrap();
        assert_relative_eq!(central(&cal, JetFlavor::B, 0.1, 50.0), 0.9);
    }

    #[test]
    fn crlf_comments_and_blank_lines() {
        let text = "CSVv2;OperatingPoint, measurementType, sysType, jetFlavor, etaMin, etaMax, ptMin, ptMax, discrMin, discrMax, formula\r\n\
                    # loose b jets\r\n\
                    \r\n\
                    0, comb, central, 0, -2.4, 2.4, 20, 1000, 0, 1, \"0.93\"\r\n";
        let cal = CsvCalibration::from_reader(text.as_bytes(), WorkingPoint::Loose).unwrap();
        assert_eq!(cal.n_rows(), 1);
        assert_relative_eq!(central(&cal, JetFlavor::B, -1.0, 50.0), 0.93);
    }

    #[test]
    fn bad_numbers_report_line() {
        let text = "0, comb, central, 0, 0, 2.4, 20, 1000, 0, 1, \"0.9\"\n0, comb, central, 0, 0, abc, 20, 1000, 0, 1, \"0.9\"\n";
        let err = CsvCalibration::from_reader(text.as_bytes(), WorkingPoint::Loose).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
