//! Per-event physics-object records.
//!
//! These mirror the flat ntuple content one collision event carries after
//! the external reader has materialized it. The selection code never
//! mutates them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kinematics::{Momentum, P4};

/// Truth mother id marking objects from the signal decay chain (pseudoscalar `a`).
pub const SIGNAL_MOTHER_ID: i32 = 36;

/// Charged-lepton flavour, decoded from the absolute PDG id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeptonFlavor {
    /// |id| == 11
    Electron,
    /// |id| == 13
    Muon,
}

impl LeptonFlavor {
    /// Decode a signed PDG id. Anything but electrons and muons maps to `None`.
    pub fn from_pdg_id(id: i32) -> Option<Self> {
        match id.abs() {
            11 => Some(Self::Electron),
            13 => Some(Self::Muon),
            _ => None,
        }
    }
}

/// Reconstructed lepton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lepton {
    /// Four-momentum.
    #[serde(flatten)]
    pub p4: P4,
    /// Signed PDG id (sign encodes charge).
    pub id: i32,
    /// Muon identification flag.
    #[serde(default)]
    pub pass_id_mu: bool,
    /// Muon isolation flag.
    #[serde(default)]
    pub pass_iso_mu: bool,
    /// Electron identification flag.
    #[serde(default)]
    pub pass_id_el: bool,
    /// Electron isolation flag.
    #[serde(default)]
    pub pass_iso_el: bool,
}

impl Lepton {
    /// Flavour of this lepton, if it is an electron or a muon.
    pub fn flavor(&self) -> Option<LeptonFlavor> {
        LeptonFlavor::from_pdg_id(self.id)
    }
}

impl Momentum for Lepton {
    fn p4(&self) -> &P4 {
        &self.p4
    }
}

/// Narrow-radius (AK4) jet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    /// Four-momentum.
    #[serde(flatten)]
    pub p4: P4,
    /// Loose PF jet identification.
    #[serde(default)]
    pub pass_loose_id: bool,
    /// CSVv2 b-tag discriminator.
    #[serde(default)]
    pub csv: f64,
    /// Hadron flavour (5 = b, 4 = c, otherwise light). Zero on data.
    #[serde(default)]
    pub hadron_flavor: i32,
    /// Truth mother id (simulation only).
    #[serde(default)]
    pub mother_id: i32,
}

impl Jet {
    /// True when the jet is truth-matched to the signal decay chain.
    pub fn is_signal_truth(&self) -> bool {
        self.mother_id == SIGNAL_MOTHER_ID
    }
}

impl Momentum for Jet {
    fn p4(&self) -> &P4 {
        &self.p4
    }
}

/// Large-radius (AK8) jet with its soft-drop subjets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatJet {
    /// Four-momentum.
    #[serde(flatten)]
    pub p4: P4,
    /// Double-b discriminator.
    #[serde(default)]
    pub double_b: f64,
    /// Subjets, in reconstruction order.
    #[serde(default)]
    pub subjets: Vec<P4>,
    /// Truth mother id (simulation only).
    #[serde(default)]
    pub mother_id: i32,
}

impl FatJet {
    /// True when the fat jet is truth-matched to the signal decay chain.
    pub fn is_signal_truth(&self) -> bool {
        self.mother_id == SIGNAL_MOTHER_ID
    }
}

impl Momentum for FatJet {
    fn p4(&self) -> &P4 {
        &self.p4
    }
}

/// Missing transverse energy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Met {
    /// Magnitude [GeV].
    pub pt: f64,
    /// Azimuth [rad].
    pub phi: f64,
}

/// Trigger decision bitmask as written by the ntuplizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerBits(pub u32);

impl TriggerBits {
    fn bit(self, n: u32) -> bool {
        (self.0 >> n) & 0x1 == 1
    }

    /// Double-muon trigger fired.
    pub fn double_mu(self) -> bool {
        self.bit(0)
    }

    /// Single-muon trigger fired.
    pub fn single_mu(self) -> bool {
        self.bit(1)
    }

    /// Double-electron trigger fired.
    pub fn double_e(self) -> bool {
        self.bit(2)
    }

    /// Single-electron trigger fired.
    pub fn single_e(self) -> bool {
        self.bit(4)
    }

    /// Electron-muon trigger fired.
    pub fn e_mu(self) -> bool {
        self.bit(5)
    }
}

/// `(run, lumi, event)` triple identifying one collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    /// Run number.
    pub run: u32,
    /// Luminosity block.
    pub lumi: u32,
    /// Event number.
    pub event: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.run, self.lumi, self.event)
    }
}

/// One materialized event record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    /// Run number.
    pub run: u32,
    /// Luminosity block.
    pub lumi: u32,
    /// Event number.
    pub event: u64,
    /// Generator weight (only the sign is used).
    #[serde(default = "default_gen_weight")]
    pub gen_weight: f64,
    /// Trigger bitmask.
    #[serde(default)]
    pub trigger_bits: TriggerBits,
    /// True number of pile-up interactions (simulation only).
    #[serde(default)]
    pub n_true_pu: f64,
    /// Number of reconstructed primary vertices.
    #[serde(default)]
    pub n_vtx: u32,
    /// Raw leptons.
    #[serde(default)]
    pub leptons: Vec<Lepton>,
    /// Raw narrow jets (already energy-corrected upstream).
    #[serde(default)]
    pub jets: Vec<Jet>,
    /// Raw large-radius jets.
    #[serde(default)]
    pub fat_jets: Vec<FatJet>,
    /// Missing transverse energy.
    #[serde(default)]
    pub met: Met,
}

fn default_gen_weight() -> f64 {
    1.0
}

impl Event {
    /// The `(run, lumi, event)` identifier.
    pub fn id(&self) -> EventId {
        EventId { run: self.run, lumi: self.lumi, event: self.event }
    }
}
