//! # haa-core
//!
//! Shared building blocks for the haa4b event selection:
//!
//! - [`P4`] four-momenta and the [`Momentum`] accessor trait
//! - physics-object records ([`Lepton`], [`Jet`], [`FatJet`], [`Event`])
//! - the [`Error`] / [`Result`] types used by every library crate
//! - boundary traits for the event reader, histogram sink and event listing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod kinematics;
pub mod objects;
pub mod traits;

pub use error::{Error, Result};
pub use kinematics::{Momentum, P4, sort_by_pt_desc};
pub use objects::{
    Event, EventId, FatJet, Jet, Lepton, LeptonFlavor, Met, SIGNAL_MOTHER_ID, TriggerBits,
};
pub use traits::{EventLog, EventSource, HistogramSink};
