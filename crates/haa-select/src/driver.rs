//! Per-event analysis and the event loop.
//!
//! [`Analysis`] runs the selection chain on each event and routes the
//! resulting quantities into a [`HistogramSink`]. Histogram names and tags
//! are built only here, from the typed [`HistName`], [`EventTag`],
//! [`Collection`] and [`Rank`] values.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use haa_core::{
    Error, Event, EventLog, EventSource, FatJet, HistogramSink, Jet, Momentum, Result,
};
use haa_hist::{Axis, HistogramBook};
use serde::Serialize;

use crate::btag::BTagCalibration;
use crate::category::{Channel, categorize};
use crate::cleaning::{clean_selection, separation};
use crate::dedup::DuplicateFilter;
use crate::pileup::PileupWeights;
use crate::selector::{GoodLepton, JetSelection, ObjectSelector, Selection};

/// Leading objects per collection that get their own histograms.
pub const MAX_RANK: usize = 4;

/// Number of progress reports over a run.
const PROGRESS_STEPS: usize = 50;

/// Histograms filled by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistName {
    /// True pile-up interactions (simulation only).
    Pileup,
    /// Reconstructed vertices, unweighted.
    NVtx,
    /// Reconstructed vertices, event weight applied.
    NVtxWeighted,
    /// Good-lepton multiplicity.
    NLeptons,
    /// Good-jet multiplicity.
    NJets,
    /// b-jet and fat-jet multiplicities.
    NBJets,
    /// Transverse momentum of leading objects.
    JetPt,
    /// Pseudorapidity of leading objects.
    JetEta,
    /// Minimum b-jet to fat-jet separations.
    DeltaR,
}

impl HistName {
    /// Every histogram, in declaration order.
    pub const ALL: [HistName; 9] = [
        HistName::DeltaR,
        HistName::JetPt,
        HistName::JetEta,
        HistName::NLeptons,
        HistName::NJets,
        HistName::NBJets,
        HistName::NVtx,
        HistName::NVtxWeighted,
        HistName::Pileup,
    ];

    /// Name in the histogram sink.
    pub const fn as_str(self) -> &'static str {
        match self {
            HistName::Pileup => "pileup",
            HistName::NVtx => "nvtx_raw",
            HistName::NVtxWeighted => "nvtxwgt_raw",
            HistName::NLeptons => "nleptons_raw",
            HistName::NJets => "njets_raw",
            HistName::NBJets => "nbjets_raw",
            HistName::JetPt => "jet_pt_raw",
            HistName::JetEta => "jet_eta_raw",
            HistName::DeltaR => "dR",
        }
    }

    fn title(self) -> &'static str {
        match self {
            HistName::Pileup => ";Pileup;Events",
            HistName::NVtx => ";Vertices;Events",
            HistName::NVtxWeighted => ";Vertices;Events",
            HistName::NLeptons => ";Lepton multiplicity;Events",
            HistName::NJets => ";Jet multiplicity (p_{T}>20 GeV);Events",
            HistName::NBJets => ";b-tag Jet multiplicity;Events",
            HistName::JetPt => ";Transverse momentum [GeV];Events",
            HistName::JetEta => ";Pseudo-rapidity;Events",
            HistName::DeltaR => ";#Delta R(SV,b);Events",
        }
    }

    fn axis(self) -> Axis {
        let multiplicity = || Axis::uniform(5, 0.0, 5.0).with_labels(["=0", "=1", "=2", "=3", "≥4"]);
        match self {
            HistName::Pileup => Axis::uniform(100, 0.0, 100.0),
            HistName::NVtx | HistName::NVtxWeighted => Axis::uniform(50, 0.0, 50.0),
            HistName::NLeptons => Axis::uniform(3, 2.0, 5.0).with_labels(["=2", "=3", "=4"]),
            HistName::NJets | HistName::NBJets => multiplicity(),
            HistName::JetPt => Axis::uniform(50, 0.0, 500.0),
            HistName::JetEta => Axis::uniform(52, -2.6, 2.6),
            HistName::DeltaR => Axis::uniform(100, 0.0, 5.0),
        }
    }
}

/// A book with every driver histogram declared.
pub fn book_histograms() -> Result<HistogramBook> {
    let mut book = HistogramBook::new();
    for h in HistName::ALL {
        book.declare(h.as_str(), h.title(), h.axis())?;
    }
    Ok(book)
}

/// Category of event-level fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    /// Inclusive.
    All,
    /// Lepton channel.
    Channel(Channel),
}

impl EventTag {
    /// Tag string in the sink.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventTag::All => "all",
            EventTag::Channel(c) => c.as_str(),
        }
    }
}

/// Object collections with multiplicity and leading-object histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Good narrow jets.
    Jets,
    /// Loose b-tagged jets.
    BJets,
    /// Double-b fat jets.
    FatJets,
    /// Loose b-jets after cross-cleaning.
    CleanedBJets,
}

impl Collection {
    const fn prefix(self) -> &'static str {
        match self {
            Collection::Jets => "nj",
            Collection::BJets => "nb",
            Collection::FatJets => "nfat",
            Collection::CleanedBJets => "nb_cleaned",
        }
    }

    const fn multiplicity_prefix(self) -> &'static str {
        match self {
            Collection::FatJets => "nfatJet",
            other => other.prefix(),
        }
    }

    const fn multiplicity_hist(self) -> HistName {
        match self {
            Collection::Jets => HistName::NJets,
            _ => HistName::NBJets,
        }
    }
}

/// Reference objects of the separation histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrTarget {
    FatJet,
    Subjet,
}

impl DrTarget {
    const fn prefix(self) -> &'static str {
        match self {
            DrTarget::FatJet => "drmin",
            DrTarget::Subjet => "drmin_sub",
        }
    }
}

/// 1-based position of a leading object, at most [`MAX_RANK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rank(u8);

impl Rank {
    /// Rank of the object at `index` in a pt-sorted list, `None` past [`MAX_RANK`].
    pub fn from_index(index: usize) -> Option<Self> {
        (index < MAX_RANK).then(|| Rank(index as u8 + 1))
    }

    /// 1-based value.
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// `<prefix>[_true][_b<k>]`
#[derive(Debug, Clone, Copy)]
struct ObjectTag {
    prefix: &'static str,
    truth: bool,
    rank: Option<Rank>,
}

impl fmt::Display for ObjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix)?;
        if self.truth {
            f.write_str("_true")?;
        }
        if let Some(r) = self.rank {
            write!(f, "_b{}", r.get())?;
        }
        Ok(())
    }
}

/// Everything the selection chain produces for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSelection {
    /// Good leptons in input order.
    pub leptons: Vec<GoodLepton>,
    /// Lepton channel, if any good lepton.
    pub channel: Option<Channel>,
    /// Good jets and b-tag subsets, pt-sorted.
    pub jets: JetSelection,
    /// Double-b fat jets, pt-sorted.
    pub fat_jets: Selection<FatJet>,
    /// Loose b-jets surviving cross-cleaning, pt-sorted.
    pub cleaned_b: Selection<Jet>,
}

/// Result of [`Analysis::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Already seen (data only); nothing was filled.
    Duplicate,
    /// Histograms filled.
    Accepted(Option<Channel>),
}

/// Counters returned by [`Analysis::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// First entry of the range.
    pub first: usize,
    /// One past the last entry of the range.
    pub end: usize,
    /// Events filled into histograms.
    pub processed: u64,
    /// Skipped duplicates.
    pub duplicates: u64,
    /// Events written to the listing.
    pub selected: u64,
    /// Selected events per channel, zero for channels never seen.
    pub per_channel: BTreeMap<&'static str, u64>,
}

/// Resolve a configured `[start, end)` range against `total` entries.
///
/// A negative `end`, or one beyond `total`, means all entries.
pub fn resolve_range(total: usize, start: i64, end: i64) -> Result<Range<usize>> {
    let start = usize::try_from(start)
        .map_err(|_| Error::Validation(format!("negative first event {start}")))?;
    let end = usize::try_from(end).map_or(total, |e| e.min(total));
    if start > end {
        return Err(Error::Validation(format!(
            "first event {start} is beyond the last event {end}"
        )));
    }
    Ok(start..end)
}

/// Selection chain and histogram routing for one dataset.
#[derive(Debug)]
pub struct Analysis<C> {
    selector: ObjectSelector<C>,
    duplicates: DuplicateFilter,
    pileup: Option<PileupWeights>,
}

impl<C: BTagCalibration> Analysis<C> {
    /// Wrap a configured selector.
    pub fn new(selector: ObjectSelector<C>) -> Self {
        Self { selector, duplicates: DuplicateFilter::new(), pileup: None }
    }

    /// Apply pile-up weights to simulated events.
    pub fn with_pileup_weights(mut self, weights: PileupWeights) -> Self {
        self.pileup = Some(weights);
        self
    }

    /// Whether the dataset is simulation.
    pub fn is_mc(&self) -> bool {
        self.selector.is_mc()
    }

    /// Generator-weight sign times the pile-up weight; always 1 on data.
    pub fn event_weight(&self, ev: &Event) -> f64 {
        if !self.is_mc() {
            return 1.0;
        }
        let sign = if ev.gen_weight < 0.0 { -1.0 } else { 1.0 };
        sign * self.pileup.as_ref().map_or(1.0, |w| w.weight(ev.n_true_pu))
    }

    /// Run object selection, sorting and cross-cleaning on one event.
    pub fn select(&self, ev: &Event) -> EventSelection {
        let leptons = self.selector.select_good_leptons(&ev.leptons);
        let channel = categorize(&leptons);

        let mut jets = self.selector.select_good_jets(&ev.jets, &leptons, ev.event);
        jets.good.sort_by_pt();
        jets.b_loose.sort_by_pt();
        let mut fat_jets = self.selector.select_double_b_fat_jets(&ev.fat_jets);
        fat_jets.sort_by_pt();

        let cleaned_b = clean_selection(&jets.b_loose, &fat_jets);
        EventSelection { leptons, channel, jets, fat_jets, cleaned_b }
    }

    /// Filter, select and fill one event.
    pub fn process<H: HistogramSink + ?Sized>(&mut self, ev: &Event, sink: &mut H) -> Outcome {
        if !self.is_mc() && self.duplicates.check(ev.id()) {
            tracing::info!(run = ev.run, lumi = ev.lumi, event = ev.event, "duplicate event skipped");
            return Outcome::Duplicate;
        }

        let weight = self.event_weight(ev);
        if self.is_mc() {
            sink.fill(HistName::Pileup.as_str(), EventTag::All.as_str(), ev.n_true_pu, 1.0);
        }

        let sel = self.select(ev);
        tracing::debug!(
            leptons = sel.leptons.len(),
            jets = sel.jets.good.len(),
            jets_30 = sel.jets.n_above_30,
            csv_l = sel.jets.tag_counts.loose,
            csv_m = sel.jets.tag_counts.medium,
            csv_t = sel.jets.tag_counts.tight,
            b_loose = sel.jets.b_loose.len(),
            fat_jets = sel.fat_jets.len(),
            cleaned = sel.cleaned_b.len(),
            channel = sel.channel.map_or("none", Channel::as_str),
            "event selected objects"
        );
        fill_event(sink, ev, &sel, weight);
        Outcome::Accepted(sel.channel)
    }

    /// Process entries `range` of `source`, logging events that have a channel.
    pub fn run<S, H, L>(
        &mut self,
        source: &mut S,
        range: Range<usize>,
        sink: &mut H,
        log: &mut L,
    ) -> Result<RunSummary>
    where
        S: EventSource + ?Sized,
        H: HistogramSink + ?Sized,
        L: EventLog + ?Sized,
    {
        let mut summary = RunSummary {
            first: range.start,
            end: range.end,
            per_channel: Channel::ALL.iter().map(|c| (c.as_str(), 0)).collect(),
            ..Default::default()
        };
        let span = range.len();
        let step = (span / PROGRESS_STEPS).max(1);
        tracing::info!(first = range.start, end = range.end, mc = self.is_mc(), "event loop start");

        for index in range.clone() {
            let done = index - range.start;
            if done % step == 0 {
                tracing::info!(entry = index, progress = %format!("{:.0}%", 100.0 * done as f64 / span as f64), "processing");
            }
            let ev = source.get_entry(index)?;
            tracing::debug!(entry = index, run = ev.run, lumi = ev.lumi, event = ev.event, "event");

            match self.process(&ev, sink) {
                Outcome::Duplicate => summary.duplicates += 1,
                Outcome::Accepted(channel) => {
                    summary.processed += 1;
                    if let Some(c) = channel {
                        log.record(ev.id())?;
                        summary.selected += 1;
                        *summary.per_channel.entry(c.as_str()).or_default() += 1;
                    }
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            duplicates = summary.duplicates,
            selected = summary.selected,
            "event loop done"
        );
        Ok(summary)
    }
}

fn fill_event<H: HistogramSink + ?Sized>(sink: &mut H, ev: &Event, sel: &EventSelection, weight: f64) {
    let n_vtx = f64::from(ev.n_vtx);
    let n_leptons = sel.leptons.len();
    let tags = [Some(EventTag::All), sel.channel.map(EventTag::Channel)];
    for tag in tags.into_iter().flatten() {
        let tag = tag.as_str();
        sink.fill(HistName::NVtx.as_str(), tag, n_vtx, 1.0);
        sink.fill(HistName::NVtxWeighted.as_str(), tag, n_vtx, weight);
        // axis starts at two leptons
        if n_leptons >= 2 {
            sink.fill(HistName::NLeptons.as_str(), tag, n_leptons as f64, weight);
        }
    }

    fill_selection(sink, Collection::Jets, &sel.jets.good, weight);
    fill_selection(sink, Collection::BJets, &sel.jets.b_loose, weight);
    fill_selection(sink, Collection::FatJets, &sel.fat_jets, weight);
    fill_selection(sink, Collection::CleanedBJets, &sel.cleaned_b, weight);

    fill_separations(sink, &sel.jets.b_loose.reco, &sel.fat_jets.reco, false, weight);
    if let (Some(b), Some(fat)) = (&sel.jets.b_loose.truth, &sel.fat_jets.truth) {
        fill_separations(sink, b, fat, true, weight);
    }
}

fn fill_selection<T, H>(sink: &mut H, coll: Collection, sel: &Selection<T>, weight: f64)
where
    T: Momentum,
    H: HistogramSink + ?Sized,
{
    fill_collection(sink, coll, &sel.reco, false, weight);
    if let Some(truth) = &sel.truth {
        fill_collection(sink, coll, truth, true, weight);
    }
}

fn fill_collection<T, H>(sink: &mut H, coll: Collection, objects: &[T], truth: bool, weight: f64)
where
    T: Momentum,
    H: HistogramSink + ?Sized,
{
    let tag = ObjectTag { prefix: coll.multiplicity_prefix(), truth, rank: None };
    sink.fill(coll.multiplicity_hist().as_str(), &tag.to_string(), objects.len() as f64, weight);

    for (i, obj) in objects.iter().enumerate() {
        let Some(rank) = Rank::from_index(i) else { break };
        let tag = ObjectTag { prefix: coll.prefix(), truth, rank: Some(rank) }.to_string();
        sink.fill(HistName::JetPt.as_str(), &tag, obj.pt(), weight);
        sink.fill(HistName::JetEta.as_str(), &tag, obj.eta(), weight);
    }
}

fn fill_separations<H: HistogramSink + ?Sized>(
    sink: &mut H,
    b_jets: &[Jet],
    fat_jets: &[FatJet],
    truth: bool,
    weight: f64,
) {
    for (i, b) in b_jets.iter().enumerate() {
        let Some(rank) = Rank::from_index(i) else { break };
        let s = separation(b, fat_jets);
        for (target, dr) in [(DrTarget::FatJet, s.to_fat_jet), (DrTarget::Subjet, s.to_subjet)] {
            let tag = ObjectTag { prefix: target.prefix(), truth, rank: Some(rank) };
            sink.fill(HistName::DeltaR.as_str(), &tag.to_string(), dr, weight);
        }
    }
}
