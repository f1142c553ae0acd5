//! # haa-hist
//!
//! Weighted 1D histograms keyed by `(name, category tag)`.
//!
//! Histograms are declared once with their binning; the first fill under a
//! new tag instantiates a fresh copy of the declared template. The whole
//! book is persisted as JSON at the end of a run.
//!
//! ```
//! use haa_core::HistogramSink;
//! use haa_hist::{Axis, HistogramBook};
//!
//! let mut book = HistogramBook::new();
//! book.declare("jet_pt_raw", ";jet p_{T};Events", Axis::uniform(50, 0.0, 500.0)).unwrap();
//! book.fill("jet_pt_raw", "nb_b1", 73.0, 1.0);
//! assert_eq!(book.get("jet_pt_raw", "nb_b1").unwrap().entries, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod book;
pub mod histogram;

pub use book::HistogramBook;
pub use histogram::{Axis, Histogram1D};
