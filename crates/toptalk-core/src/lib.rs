//! toptalk-core: the I/O-free half of the toptalk pipeline.
//!
//! # Architecture
//!
//! ```text
//! WindowClock ──► WindowTracker ──► Extraction ──► RecordParser ──► Enrichment ──► Publisher
//!  (window)        (tracker)        (feeds)         (parser)          (feeds)        (feeds)
//! ```
//!
//! Everything in this crate is pure: the clock takes "now" as an argument,
//! the tracker is plain state, and the parser works on `&str`. The adapters
//! that talk to processes and stores live in `toptalk-feeds`.

pub mod config;
pub mod error;
pub mod parser;
pub mod tracker;
pub mod types;
pub mod window;

pub use error::{Error, NotReady, Result};
pub use tracker::WindowTracker;
pub use types::{
    Decoration, DetailRecord, EnrichedRecord, LogLocation, TopTalkerRecord, Window, WindowId,
};
pub use window::{Clock, SystemClock, WindowClock};
