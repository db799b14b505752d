//! sonatadata: tabular datasets from the annotated Mozart piano sonatas.
//!
//! Loads the per-movement note, harmony, cadence and measure tables, unfolds
//! repeats into play order, joins the annotation kinds into one table, and
//! checks the harmony labels embedded in converted MusicXML scores.
//!
//! # Example
//! ```no_run
//! use sonatadata::{unfold_sequence, Catalog};
//!
//! let catalog = Catalog::default();
//! let selection = catalog.select(Some(&[1][..]), None);
//! println!("{} movements", selection.len());
//!
//! // 1 2 3 |1. 4 :| 2. 5
//! let measures = vec![(1, vec![2]), (2, vec![3]), (3, vec![4, 5]), (4, vec![1]), (5, vec![])];
//! assert_eq!(unfold_sequence(&measures).unwrap(), vec![1, 2, 3, 4, 1, 2, 3, 5]);
//! ```

pub mod annotations;
pub mod catalog;
pub mod error;
pub mod format;
pub mod join;
pub mod model;
pub mod mxl;
pub mod qa;
pub mod tsv;
pub mod unfold;

pub use catalog::{Catalog, CatalogEntry};
pub use error::DataError;
pub use format::{run, FormatOptions, Outcome};
pub use join::join;
pub use model::{Fraction, Kind, Mc, Row, Table, Value};
pub use unfold::{unfold_sequence, MeasureGraph, Successors, Unfolding};
