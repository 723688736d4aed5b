//! toptalk: per-window top-talker extraction, enrichment and publishing.
//!
//! A long-running daemon that follows two rotating logs sliced into 5-minute
//! windows. For each new window it ranks the busiest addresses, pulls their
//! detail lines, decorates each line from a lookup store and pushes the result
//! onto a per-window list in the queue store.
//!
//! # Architecture
//!
//! ```text
//! toptalk-core                     toptalk-feeds                      toptalk
//! ─────────────                    ─────────────                      ───────
//! WindowClock, WindowTracker  ──►  ExtractionAdapter ──► Enrichment ──► Pipeline
//! RecordParser, Config             ResilientPublisher ◄── QueueStore
//! ```

pub mod logging;
pub mod pipeline;

pub use pipeline::{CycleOutcome, CycleReport, Pipeline, PipelineSettings};
