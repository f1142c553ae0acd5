//! b-tagging working points, calibration interface and scale-factor application.
//!
//! Simulated jets are re-tagged so that, on average, the tagged fraction
//! reproduces data: with a scale factor below one, tagged jets are demoted
//! with probability `1 - SF`; above one, untagged jets are promoted with
//! probability `(1 - SF) / (1 - 1/ε)`, ε being the simulated tagging
//! efficiency for the jet's flavour. The random draw is seeded from the
//! event number and the jet index so reruns are bit-reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Tagger working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkingPoint {
    /// Loose
    Loose,
    /// Medium
    Medium,
    /// Tight
    Tight,
}

impl WorkingPoint {
    /// All working points, loosest first.
    pub const ALL: [WorkingPoint; 3] =
        [WorkingPoint::Loose, WorkingPoint::Medium, WorkingPoint::Tight];

    /// CSVv2 discriminator threshold for narrow jets (80X Moriond17).
    pub const fn csv_threshold(self) -> f64 {
        match self {
            WorkingPoint::Loose => 0.5426,
            WorkingPoint::Medium => 0.800,
            WorkingPoint::Tight => 0.935,
        }
    }

    /// Double-b discriminator threshold for large-radius jets.
    pub const fn double_b_threshold(self) -> f64 {
        match self {
            WorkingPoint::Loose => 0.3,
            WorkingPoint::Medium => 0.6,
            WorkingPoint::Tight => 0.9,
        }
    }

    /// `OperatingPoint` column value in calibration tables.
    pub const fn table_index(self) -> u8 {
        match self {
            WorkingPoint::Loose => 0,
            WorkingPoint::Medium => 1,
            WorkingPoint::Tight => 2,
        }
    }

    /// Raw CSVv2 decision (`discriminator > threshold`).
    pub fn passes_csv(self, discriminator: f64) -> bool {
        discriminator > self.csv_threshold()
    }
}

/// Jet flavour classes used by the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetFlavor {
    /// b jets (|hadron flavour| == 5)
    B,
    /// c jets (|hadron flavour| == 4)
    C,
    /// light-flavour and gluon jets
    Udsg,
}

impl JetFlavor {
    /// Classify from the signed hadron-flavour id.
    pub fn from_hadron_flavor(id: i32) -> Self {
        match id.abs() {
            5 => JetFlavor::B,
            4 => JetFlavor::C,
            _ => JetFlavor::Udsg,
        }
    }

    /// `jetFlavor` column value in calibration tables.
    pub const fn table_index(self) -> u8 {
        match self {
            JetFlavor::B => 0,
            JetFlavor::C => 1,
            JetFlavor::Udsg => 2,
        }
    }
}

/// Systematic variant of a scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variation {
    /// Nominal value
    Central,
    /// +1σ
    Up,
    /// -1σ
    Down,
}

impl Variation {
    /// Name used in the `sysType` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Variation::Central => "central",
            Variation::Up => "up",
            Variation::Down => "down",
        }
    }
}

/// Source of data/simulation tagging scale factors.
pub trait BTagCalibration {
    /// Scale factor for a jet of `flavor` at `(eta, pt)`.
    fn evaluate(
        &self,
        working_point: WorkingPoint,
        variation: Variation,
        flavor: JetFlavor,
        eta: f64,
        pt: f64,
    ) -> f64;
}

/// Flat per-flavour scale factors, independent of kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCalibration {
    /// b-jet scale factor.
    pub sf_b: f64,
    /// c-jet scale factor.
    pub sf_c: f64,
    /// light-jet scale factor.
    pub sf_light: f64,
    /// Absolute uncertainty on `sf_b` and `sf_c`.
    pub unc_b: f64,
    /// Absolute uncertainty on `sf_light`.
    pub unc_light: f64,
}

impl Default for ConstantCalibration {
    fn default() -> Self {
        Self { sf_b: 0.99, sf_c: 0.99, sf_light: 1.05, unc_b: 0.015, unc_light: 0.12 }
    }
}

impl ConstantCalibration {
    /// Every flavour gets the same scale factor and no uncertainty.
    pub fn uniform(sf: f64) -> Self {
        Self { sf_b: sf, sf_c: sf, sf_light: sf, unc_b: 0.0, unc_light: 0.0 }
    }
}

impl BTagCalibration for ConstantCalibration {
    fn evaluate(&self, _wp: WorkingPoint, v: Variation, flavor: JetFlavor, _: f64, _: f64) -> f64 {
        let (sf, unc) = match flavor {
            JetFlavor::B => (self.sf_b, self.unc_b),
            JetFlavor::C => (self.sf_c, self.unc_b),
            JetFlavor::Udsg => (self.sf_light, self.unc_light),
        };
        match v {
            Variation::Central => sf,
            Variation::Up => sf + unc,
            Variation::Down => sf - unc,
        }
    }
}

impl<T: BTagCalibration + ?Sized> BTagCalibration for &T {
    fn evaluate(&self, wp: WorkingPoint, v: Variation, f: JetFlavor, eta: f64, pt: f64) -> f64 {
        (**self).evaluate(wp, v, f, eta, pt)
    }
}

impl<T: BTagCalibration + ?Sized> BTagCalibration for Box<T> {
    fn evaluate(&self, wp: WorkingPoint, v: Variation, f: JetFlavor, eta: f64, pt: f64) -> f64 {
        (**self).evaluate(wp, v, f, eta, pt)
    }
}

/// Simulated tagging efficiencies per flavour class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagEfficiencies {
    /// Efficiency used for b and c jets.
    pub heavy: f64,
    /// Efficiency used for light jets.
    pub light: f64,
}

impl Default for TagEfficiencies {
    fn default() -> Self {
        Self { heavy: 0.68, light: 0.13 }
    }
}

impl TagEfficiencies {
    /// Efficiency for `flavor` (c jets share the b efficiency).
    pub fn for_flavor(&self, flavor: JetFlavor) -> f64 {
        match flavor {
            JetFlavor::B | JetFlavor::C => self.heavy,
            JetFlavor::Udsg => self.light,
        }
    }
}

/// Per-jet seed: `event * 10 + jet_index * 10000` (wrapping).
pub fn jet_seed(event: u64, jet_index: usize) -> u64 {
    event.wrapping_mul(10).wrapping_add((jet_index as u64).wrapping_mul(10_000))
}

/// Stochastically correct a tag decision with a data/simulation scale factor.
///
/// A scale factor of exactly one returns `tagged` unchanged without drawing.
pub fn modify_tag_with_sf(tagged: bool, scale_factor: f64, efficiency: f64, seed: u64) -> bool {
    if scale_factor == 1.0 {
        return tagged;
    }
    let coin: f64 = StdRng::seed_from_u64(seed).random();
    if scale_factor > 1.0 {
        if !tagged {
            let promote = (1.0 - scale_factor) / (1.0 - 1.0 / efficiency);
            return coin < promote;
        }
        tagged
    } else {
        tagged && coin <= scale_factor
    }
}
