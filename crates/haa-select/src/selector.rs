//! Object selection: good leptons, good narrow jets with b-tag subsets,
//! double-b-tagged large-radius jets.

use haa_core::{FatJet, Jet, Lepton, LeptonFlavor, Momentum, P4, sort_by_pt_desc};

use crate::btag::{
    BTagCalibration, JetFlavor, TagEfficiencies, Variation, WorkingPoint, jet_seed,
    modify_tag_with_sf,
};
use crate::matching::min_delta_r;

/// Kinematic and quality thresholds of the object selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCuts {
    /// Minimum lepton pt [GeV].
    pub lepton_min_pt: f64,
    /// Maximum muon |η|.
    pub muon_max_abs_eta: f64,
    /// Maximum electron |η|.
    pub electron_max_abs_eta: f64,
    /// Excluded electron barrel/endcap transition, open interval on |η|.
    pub electron_gap: (f64, f64),
    /// Minimum narrow-jet pt [GeV].
    pub jet_min_pt: f64,
    /// Maximum narrow-jet |η|.
    pub jet_max_abs_eta: f64,
    /// Jets closer than this to a good lepton are dropped.
    pub jet_lepton_min_dr: f64,
    /// Threshold for the "jets above 30 GeV" count.
    pub jet_count_pt: f64,
    /// b-tag fiducial region: pt above this...
    pub btag_min_pt: f64,
    /// ...and |η| below this.
    pub btag_max_abs_eta: f64,
    /// Minimum fat-jet pt [GeV].
    pub fat_jet_min_pt: f64,
    /// Maximum fat-jet |η|.
    pub fat_jet_max_abs_eta: f64,
    /// Double-b working point a fat jet must pass.
    pub double_b_working_point: WorkingPoint,
}

impl Default for SelectionCuts {
    fn default() -> Self {
        Self {
            lepton_min_pt: 25.0,
            muon_max_abs_eta: 2.4,
            electron_max_abs_eta: 2.5,
            electron_gap: (1.442, 1.556),
            jet_min_pt: 20.0,
            jet_max_abs_eta: 4.7,
            jet_lepton_min_dr: 0.4,
            jet_count_pt: 30.0,
            btag_min_pt: 20.0,
            btag_max_abs_eta: 2.4,
            fat_jet_min_pt: 20.0,
            fat_jet_max_abs_eta: 2.4,
            double_b_working_point: WorkingPoint::Loose,
        }
    }
}

/// A lepton that passed the tight selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodLepton {
    /// Signed PDG id.
    pub id: i32,
    /// Electron or muon.
    pub flavor: LeptonFlavor,
    /// Four-momentum.
    pub p4: P4,
}

impl Momentum for GoodLepton {
    fn p4(&self) -> &P4 {
        &self.p4
    }
}

/// Selected objects plus, on simulation, the truth-matched subset.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    /// Every selected object.
    pub reco: Vec<T>,
    /// Selected objects matched to the signal decay chain (simulation only).
    pub truth: Option<Vec<T>>,
}

impl<T> Selection<T> {
    /// Empty selection, tracking truth when `with_truth`.
    pub fn new(with_truth: bool) -> Self {
        Self { reco: Vec::new(), truth: with_truth.then(Vec::new) }
    }

    /// Number of selected objects.
    pub fn len(&self) -> usize {
        self.reco.len()
    }

    /// True when nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.reco.is_empty()
    }
}

impl<T: Clone> Selection<T> {
    /// Append `obj`; also to the truth list when `is_truth` and truth is tracked.
    pub fn push(&mut self, obj: T, is_truth: bool) {
        if is_truth && let Some(truth) = self.truth.as_mut() {
            truth.push(obj.clone());
        }
        self.reco.push(obj);
    }
}

impl<T: Momentum> Selection<T> {
    /// Sort both halves by descending pt.
    pub fn sort_by_pt(&mut self) {
        sort_by_pt_desc(&mut self.reco);
        if let Some(truth) = self.truth.as_mut() {
            sort_by_pt_desc(truth);
        }
    }
}

/// Raw discriminator tag counts in the b-tag fiducial region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagCounts {
    /// Jets above the Loose threshold.
    pub loose: usize,
    /// Jets above the Medium threshold.
    pub medium: usize,
    /// Jets above the Tight threshold.
    pub tight: usize,
}

impl TagCounts {
    fn add(&mut self, discriminator: f64) {
        self.loose += usize::from(WorkingPoint::Loose.passes_csv(discriminator));
        self.medium += usize::from(WorkingPoint::Medium.passes_csv(discriminator));
        self.tight += usize::from(WorkingPoint::Tight.passes_csv(discriminator));
    }
}

/// Output of [`ObjectSelector::select_good_jets`].
#[derive(Debug, Clone, PartialEq)]
pub struct JetSelection {
    /// Jets passing kinematics, loose ID and lepton cleaning.
    pub good: Selection<Jet>,
    /// Good jets above the counting threshold (30 GeV).
    pub n_above_30: usize,
    /// Loose-tagged jets (scale-factor corrected on simulation).
    pub b_loose: Selection<Jet>,
    /// Raw discriminator counts per working point.
    pub tag_counts: TagCounts,
}

/// Applies the object selection for one dataset.
///
/// The calibration source is injected at construction; on data
/// (`is_mc == false`) it is never consulted.
#[derive(Debug, Clone)]
pub struct ObjectSelector<C> {
    calibration: C,
    efficiencies: TagEfficiencies,
    cuts: SelectionCuts,
    is_mc: bool,
}

impl<C: BTagCalibration> ObjectSelector<C> {
    /// Selector with default cuts and efficiencies.
    pub fn new(calibration: C, is_mc: bool) -> Self {
        Self {
            calibration,
            efficiencies: TagEfficiencies::default(),
            cuts: SelectionCuts::default(),
            is_mc,
        }
    }

    /// Override the selection thresholds.
    pub fn with_cuts(mut self, cuts: SelectionCuts) -> Self {
        self.cuts = cuts;
        self
    }

    /// Override the simulated tagging efficiencies.
    pub fn with_efficiencies(mut self, efficiencies: TagEfficiencies) -> Self {
        self.efficiencies = efficiencies;
        self
    }

    /// Active cuts.
    pub fn cuts(&self) -> &SelectionCuts {
        &self.cuts
    }

    /// Whether the selector runs on simulation.
    pub fn is_mc(&self) -> bool {
        self.is_mc
    }

    /// Tight-ID, isolated electrons and muons above the pt threshold, in input order.
    pub fn select_good_leptons(&self, leptons: &[Lepton]) -> Vec<GoodLepton> {
        let c = &self.cuts;
        leptons
            .iter()
            .filter(|l| l.p4.pt >= c.lepton_min_pt)
            .filter_map(|l| {
                let abs_eta = l.p4.eta.abs();
                let flavor = l.flavor()?;
                let passes = match flavor {
                    LeptonFlavor::Muon => {
                        abs_eta <= c.muon_max_abs_eta && l.pass_id_mu && l.pass_iso_mu
                    }
                    LeptonFlavor::Electron => {
                        let in_gap = abs_eta > c.electron_gap.0 && abs_eta < c.electron_gap.1;
                        abs_eta <= c.electron_max_abs_eta
                            && !in_gap
                            && l.pass_id_el
                            && l.pass_iso_el
                    }
                };
                passes.then_some(GoodLepton { id: l.id, flavor, p4: l.p4 })
            })
            .collect()
    }

    /// Good narrow jets and their Loose b-tagged subset.
    ///
    /// `event` seeds the per-jet scale-factor draws on simulation; the seed
    /// uses each jet's index in `jets`.
    pub fn select_good_jets(&self, jets: &[Jet], leptons: &[GoodLepton], event: u64) -> JetSelection {
        let c = &self.cuts;
        let mut out = JetSelection {
            good: Selection::new(self.is_mc),
            n_above_30: 0,
            b_loose: Selection::new(self.is_mc),
            tag_counts: TagCounts::default(),
        };

        for (index, jet) in jets.iter().enumerate() {
            if jet.p4.pt < c.jet_min_pt || jet.p4.eta.abs() > c.jet_max_abs_eta {
                continue;
            }
            if !jet.pass_loose_id {
                continue;
            }
            if min_delta_r(jet, leptons).is_some_and(|dr| dr < c.jet_lepton_min_dr) {
                continue;
            }

            out.good.push(jet.clone(), jet.is_signal_truth());
            if jet.p4.pt > c.jet_count_pt {
                out.n_above_30 += 1;
            }

            if !(jet.p4.pt > c.btag_min_pt && jet.p4.eta.abs() < c.btag_max_abs_eta) {
                continue;
            }
            out.tag_counts.add(jet.csv);

            let mut tagged = WorkingPoint::Loose.passes_csv(jet.csv);
            if self.is_mc {
                tagged = self.corrected_tag(jet, tagged, jet_seed(event, index));
            }
            if tagged {
                out.b_loose.push(jet.clone(), jet.is_signal_truth());
            }
        }
        out
    }

    fn corrected_tag(&self, jet: &Jet, tagged: bool, seed: u64) -> bool {
        let flavor = JetFlavor::from_hadron_flavor(jet.hadron_flavor);
        let sf = self.calibration.evaluate(
            WorkingPoint::Loose,
            Variation::Central,
            flavor,
            jet.p4.eta,
            jet.p4.pt,
        );
        modify_tag_with_sf(tagged, sf, self.efficiencies.for_flavor(flavor), seed)
    }

    /// Fat jets in acceptance passing the double-b working point with at least one subjet.
    pub fn select_double_b_fat_jets(&self, fat_jets: &[FatJet]) -> Selection<FatJet> {
        let c = &self.cuts;
        let threshold = c.double_b_working_point.double_b_threshold();
        let mut out = Selection::new(self.is_mc);
        for (i, fj) in fat_jets.iter().enumerate() {
            if fj.p4.pt < c.fat_jet_min_pt || fj.p4.eta.abs() > c.fat_jet_max_abs_eta {
                continue;
            }
            for sj in &fj.subjets {
                tracing::trace!(fat_jet = i, pt = sj.pt, eta = sj.eta, phi = sj.phi, mass = sj.mass, "subjet");
            }
            if fj.double_b > threshold && !fj.subjets.is_empty() {
                out.push(fj.clone(), fj.is_signal_truth());
            }
        }
        out
    }
}
