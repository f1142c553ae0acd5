//! # haa-select
//!
//! Event selection for the h → aa → 4b search in leptonic final states.
//!
//! The chain run per event by [`driver::Analysis`]:
//!
//! 1. duplicate filtering on data ([`dedup`]),
//! 2. good-lepton, good-jet and double-b fat-jet selection ([`selector`]),
//!    with simulated Loose b-tags corrected by data/simulation scale factors
//!    ([`btag`], [`calibration`]),
//! 3. removal of b-jets overlapping fat-jet subjets ([`cleaning`]),
//! 4. lepton-channel categorization ([`category`]),
//! 5. histogram fills keyed by channel, collection and object rank.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod btag;
pub mod calibration;
pub mod category;
pub mod cleaning;
pub mod dedup;
pub mod driver;
pub mod formula;
pub mod matching;
pub mod pileup;
pub mod selector;

pub use btag::{BTagCalibration, ConstantCalibration, JetFlavor, TagEfficiencies, Variation, WorkingPoint};
pub use calibration::CsvCalibration;
pub use category::{Channel, categorize};
pub use cleaning::clean_overlaps;
pub use dedup::DuplicateFilter;
pub use driver::{Analysis, EventSelection, Outcome, RunSummary, book_histograms, resolve_range};
pub use pileup::PileupWeights;
pub use selector::{GoodLepton, JetSelection, ObjectSelector, Selection, SelectionCuts, TagCounts};
