//! Core types for toptalk-core.
//!
//! This module defines the data structures that flow down the pipeline:
//! the [`WindowId`] naming a 5-minute slice, the [`LogLocation`] of each log
//! kind, the two extraction records, and the [`EnrichedRecord`] that is
//! finally serialised for publishing.

use std::fmt;
use std::path::PathBuf;

use crate::parser::truncate_at_where_clause;

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Canonical identifier of a 5-minute window, rendered as `YYYYMMDDHHmm`.
///
/// Only [`WindowClock`](crate::window::WindowClock) mints these, and only for
/// instants whose minute is a multiple of 5. Equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(String);

impl WindowId {
    pub(crate) fn new(rendered: String) -> Self {
        Self(rendered)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory + file name of one log kind for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocation {
    pub dir: PathBuf,
    pub file_name: String,
}

impl LogLocation {
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Full path handed to the extraction commands.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl fmt::Display for LogLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Everything the pipeline needs to know about one derived window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub id: WindowId,
    /// Request log (stage 1 input).
    pub coarse: LogLocation,
    /// Access log (stage 2 input), named with the skewed clock.
    pub detail: LogLocation,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One line of stage-1 output: `"<count> <address>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTalkerRecord {
    pub count: u64,
    pub address: String,
}

/// One line of stage-2 output: `"<addr> [<timestamp>] <url> ..."`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    /// The line exactly as emitted (minus the line terminator).
    pub raw: String,
    pub address: String,
    /// Second and third fields joined, e.g. `[08/Jan/2014:11:11:22 +0800]`.
    pub timestamp: String,
    /// Fourth whitespace-delimited field.
    pub url: String,
}

/// Auxiliary text attached to a record by an enrichment lookup.
///
/// Kept structured until [`EnrichedRecord::payload`] renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoration {
    /// A matching rule from the relational store. Rendered up to its `where` clause.
    Rule(String),
    /// Members of the URL's set in the lookup namespace. Rendered `;`-joined.
    Members(Vec<String>),
}

impl Decoration {
    pub fn render(&self) -> String {
        match self {
            Decoration::Rule(rule) => truncate_at_where_clause(rule).to_string(),
            Decoration::Members(members) => members.join(";"),
        }
    }
}

/// A detail line joined with its stage-1 rank and any decorations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub talker: TopTalkerRecord,
    pub detail: DetailRecord,
    pub decorations: Vec<Decoration>,
}

impl EnrichedRecord {
    /// The single text line pushed to the queue store:
    /// `"<count> <raw detail line>[ <decoration>...]"`.
    pub fn payload(&self) -> String {
        let mut out = format!("{} {}", self.talker.count, self.detail.raw);
        for rendered in self.decorations.iter().map(Decoration::render) {
            if !rendered.is_empty() {
                out.push(' ');
                out.push_str(&rendered);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
