//! Test builders: a settable clock and a pipeline wired to fakes.
//!
//! These are for readability in harnesses, not production use; they panic on
//! bad input rather than returning `Result`.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use toptalk::{Pipeline, PipelineSettings};
use toptalk_core::{Clock, WindowClock};
use toptalk_feeds::{CommandSpec, EnrichmentLookup, ExtractionAdapter, ResilientPublisher};

use super::fake_store::FakeQueueStore;
use super::fixtures::{cat_top_talkers, grep_detail_search, LogTree};

// ---------------------------------------------------------------------------
// FixedClock
// ---------------------------------------------------------------------------

/// A clock that reads whatever the test last set.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn set(&mut self, now: NaiveDateTime) {
        self.0 = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Local instant on a calendar day, e.g. `at(2014, 1, 6, 9, 20, 0)`.
pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, mm, ss))
        .expect("valid instant")
}

// ---------------------------------------------------------------------------
// PipelineBuilder
// ---------------------------------------------------------------------------

pub type TestPipeline = Pipeline<FakeQueueStore, FixedClock>;

/// Pipeline over a [`LogTree`] with zero pauses and fixture commands.
pub struct PipelineBuilder {
    now: NaiveDateTime,
    store: FakeQueueStore,
    enrichment: EnrichmentLookup,
    top_talkers: CommandSpec,
    detail_search: CommandSpec,
    top_n: usize,
    url_count: usize,
    record_rankings: bool,
    first_line_timeout: Duration,
    release_grace: Duration,
}

impl PipelineBuilder {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now,
            store: FakeQueueStore::new(),
            enrichment: EnrichmentLookup::Disabled,
            top_talkers: cat_top_talkers(),
            detail_search: grep_detail_search(),
            top_n: 10,
            url_count: 5,
            record_rankings: true,
            first_line_timeout: Duration::from_secs(5),
            release_grace: Duration::from_secs(5),
        }
    }

    pub fn store(mut self, store: FakeQueueStore) -> Self {
        self.store = store;
        self
    }

    pub fn enrichment(mut self, enrichment: EnrichmentLookup) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn top_talkers(mut self, command: CommandSpec) -> Self {
        self.top_talkers = command;
        self
    }

    pub fn detail_search(mut self, command: CommandSpec) -> Self {
        self.detail_search = command;
        self
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn url_count(mut self, n: usize) -> Self {
        self.url_count = n;
        self
    }

    pub fn record_rankings(mut self, on: bool) -> Self {
        self.record_rankings = on;
        self
    }

    /// Shorten how long a silent command is waited on, and then reaped.
    pub fn stall_after(mut self, first_line: Duration, grace: Duration) -> Self {
        self.first_line_timeout = first_line;
        self.release_grace = grace;
        self
    }

    pub fn build(self, tree: &LogTree) -> TestPipeline {
        let settings = PipelineSettings {
            top_n: self.top_n,
            url_count: self.url_count,
            ranking_prefix: "ipset".into(),
            detail_prefix: "iplist".into(),
            record_rankings: self.record_rankings,
            poll: Duration::from_secs(5),
            settle: Duration::ZERO,
            cycle: Duration::from_secs(250),
        };
        let extractor = ExtractionAdapter::new(self.top_talkers, self.detail_search)
            .with_first_line_timeout(self.first_line_timeout)
            .with_release_grace(self.release_grace);
        let publisher = ResilientPublisher::new(self.store).with_retry_interval(Duration::ZERO);
        Pipeline::new(
            FixedClock(self.now),
            WindowClock::new(tree.request_root(), tree.detail_root()),
            extractor,
            self.enrichment,
            publisher,
            settings,
        )
    }
}
